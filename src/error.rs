//! Error types raised while registering endpoints and while serving requests.

use crate::binding::BindError;
use crate::IntoFailure;
use std::fmt;

/// Registration-time failure: the function or one of its structures cannot be
/// compiled into an endpoint.
///
/// These never reach a live request. The `Display` output is the stable
/// message; the offending field, if any, is available through [`field`].
///
/// [`field`]: ConfigurationError::field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The function's parameter or return shape is not admissible.
    InvalidInterface,
    /// An input field has no `request` tag or one that does not parse.
    InvalidRequestTag { field: &'static str },
    /// An output or error field has no `response` tag or one that does not parse.
    InvalidResponseTag { field: &'static str },
}

impl ConfigurationError {
    /// Name of the field that failed to compile.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ConfigurationError::InvalidInterface => None,
            ConfigurationError::InvalidRequestTag { field }
            | ConfigurationError::InvalidResponseTag { field } => Some(field),
        }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::InvalidInterface => write!(f, "invalid endpoint interface"),
            ConfigurationError::InvalidRequestTag { .. } => {
                write!(f, "missing or invalid request tag on input field")
            }
            ConfigurationError::InvalidResponseTag { .. } => {
                write!(f, "missing or invalid response tag on output field")
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// A request the endpoint refuses before (or instead of) calling the function.
///
/// Written to the wire like any structured failure: `status` becomes the
/// response status and `message` the `"error"` JSON field.
#[derive(Debug, Clone, PartialEq, Eq, IntoFailure)]
pub struct RequestError {
    #[response("status")]
    pub status: u16,
    #[response("json,error")]
    pub message: String,
}

impl RequestError {
    /// Create a request error with a specific status.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Create a 400 request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// The body could not be parsed as a JSON object.
    pub fn invalid_json() -> Self {
        Self::bad_request("invalid json")
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

impl std::error::Error for RequestError {}

impl From<BindError> for RequestError {
    fn from(err: BindError) -> Self {
        RequestError::bad_request(err.to_string())
    }
}

/// A failure the endpoint could not classify into a response.
///
/// Handed to the route table, which owns the translation into a generic
/// 500 response.
#[derive(Debug)]
pub enum Unhandled {
    /// The bound function panicked with something that is not a structured error.
    Panic(String),
    /// A returned value could not be written to the response.
    Output(BindError),
}

impl fmt::Display for Unhandled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unhandled::Panic(message) => write!(f, "{}", message),
            Unhandled::Output(err) => write!(f, "failed to write response: {}", err),
        }
    }
}

impl std::error::Error for Unhandled {}

impl From<BindError> for Unhandled {
    fn from(err: BindError) -> Self {
        Unhandled::Output(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{Failure, FailureKind};

    #[test]
    fn test_configuration_error_messages() {
        assert_eq!(
            ConfigurationError::InvalidInterface.to_string(),
            "invalid endpoint interface"
        );
        let err = ConfigurationError::InvalidRequestTag { field: "name" };
        assert_eq!(err.to_string(), "missing or invalid request tag on input field");
        assert_eq!(err.field(), Some("name"));
        let err = ConfigurationError::InvalidResponseTag { field: "body" };
        assert_eq!(err.to_string(), "missing or invalid response tag on output field");
    }

    #[test]
    fn test_request_error_is_structured() {
        match RequestError::kind() {
            FailureKind::Structured(fields) => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].tag, Some("status"));
                assert_eq!(fields[1].tag, Some("json,error"));
            }
            FailureKind::Message => panic!("request errors must carry response tags"),
        }
        match RequestError::invalid_json().into_failure() {
            Failure::Structured(Ok(emits)) => assert_eq!(emits.len(), 2),
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[test]
    fn test_bind_error_becomes_bad_request() {
        let err = RequestError::from(BindError::new("expected u32").in_field("limit"));
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "invalid value for field `limit`: expected u32");
    }
}
