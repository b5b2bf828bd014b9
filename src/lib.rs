//! # Gap - Declarative Request/Response Binding
//!
//! Gap turns plain async functions into HTTP endpoints. The function's input
//! and output structures say, field by field, where each value comes from in
//! the request and where it goes in the response; the engine validates the
//! function's shape and compiles those declarations once, at registration.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         App (route table)                           │
//! │              method + exact path  ──▶  Endpoint                     │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                   │
//!                                   ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                             Endpoint                                │
//! │                                                                     │
//! │   RequestContext ──▶ bound function ──▶ ResponseContext             │
//! │   header, query,     Input -> Output    header, json,               │
//! │   path, json, body   or error           status, body                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gap::prelude::*;
//!
//! #[derive(Input)]
//! struct HelloRequest {
//!     #[request("json,name")]
//!     name: String,
//! }
//!
//! #[derive(Output)]
//! struct HelloResponse {
//!     #[response("json,message")]
//!     message: String,
//! }
//!
//! async fn hello(input: HelloRequest) -> Result<HelloResponse, String> {
//!     Ok(HelloResponse {
//!         message: format!("hello {}", input.name),
//!     })
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut app = App::new();
//!     app.post("/hello", hello)?;
//!     app.run().await
//! }
//! ```
//!
//! ## Admissible functions
//!
//! A bound function takes zero or one [`Input`] structure and returns one of:
//!
//! - nothing (`()`): 200 with an empty body
//! - an [`Output`] structure
//! - `Result<(), E>` where `E` is [`IntoFailure`]
//! - `Result<O, E>` with an [`Output`] and an [`IntoFailure`]
//!
//! Anything else is refused with [`ConfigurationError::InvalidInterface`]
//! before the endpoint is registered.

extern crate self as gap;

pub mod binding;
pub mod error;
pub mod function;
pub mod http;
pub mod runtime;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::binding::Json;
    pub use crate::error::{ConfigurationError, RequestError, Unhandled};
    pub use crate::function::{raise, Endpoint};
    pub use crate::{Input, IntoFailure, Output};
    pub use crate::http::{HttpRequest, HttpResponse};
    pub use crate::runtime::{App, ServerConfig};
    pub use hyper::Method;
}

// Re-export for convenience
pub use binding::{BindError, Json};
pub use error::{ConfigurationError, RequestError, Unhandled};
pub use function::{raise, Endpoint, Handler, Input, IntoFailure, Output, Returns};
pub use gap_macro::{Input, IntoFailure, Output};
pub use http::{HttpRequest, HttpResponse, RequestContext, ResponseContext};
pub use runtime::{App, ServerConfig};
