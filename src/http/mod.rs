//! Per-request contexts: lazy request parsing and deferred response writing.

mod request;
mod response;

pub use request::{HttpRequest, RequestContext};
pub use response::{HttpResponse, ResponseContext};

pub(crate) use request::decoded_path;
pub(crate) use response::json_error;
