//! Bound functions: their declared shape, the traits that describe their
//! structures, and the endpoint that runs them.

pub mod endpoint;
pub mod handler;
pub mod signature;

pub use endpoint::{Endpoint, FailurePlan};
pub use handler::{
    raise, Failure, FailureKind, Handler, Input, IntoFailure, Output, Returned, Returns,
};
pub use signature::{CallShape, Signature, Slot, Validated};
