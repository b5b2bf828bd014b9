//! Input bindings: where each field of the input structure is read from.

use crate::binding::tag::split_tag;
use crate::binding::{Bound, FieldSchema};
use crate::error::{ConfigurationError, RequestError};
use crate::http::RequestContext;

/// Request source of one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputBinding {
    /// `header,<key>`: first value of a request header, case-insensitive.
    Header(String),
    /// `query,<key>`: first value of a query string parameter.
    Query(String),
    /// `path`: the whole request path.
    Path,
    /// `json,<key>`: a top-level member of the JSON object body.
    Json(String),
    /// `body`: the raw request body.
    Body,
}

impl InputBinding {
    /// Compile the `request` tag of one input field.
    pub fn compile(field: &FieldSchema) -> Result<Self, ConfigurationError> {
        let invalid = || ConfigurationError::InvalidRequestTag { field: field.name };
        let tag = field.tag.ok_or_else(invalid)?;

        match split_tag(tag).as_slice() {
            ["header", key] if !key.is_empty() => Ok(InputBinding::Header(key.to_string())),
            ["query", key] if !key.is_empty() => Ok(InputBinding::Query(key.to_string())),
            ["json", key] if !key.is_empty() => Ok(InputBinding::Json(key.to_string())),
            ["path"] => Ok(InputBinding::Path),
            ["body"] => Ok(InputBinding::Body),
            _ => Err(invalid()),
        }
    }

    /// Read this binding's source from the request.
    ///
    /// Only a `json` binding can fail, when the body is not a JSON object.
    pub fn read(&self, request: &mut RequestContext) -> Result<Bound, RequestError> {
        Ok(match self {
            InputBinding::Header(key) => Bound::Text(request.header(key)),
            InputBinding::Query(key) => Bound::Text(request.query(key)),
            InputBinding::Path => Bound::Text(Some(request.path().to_string())),
            InputBinding::Json(key) => Bound::Json(request.json(key)?),
            InputBinding::Body => Bound::Body(request.body()),
        })
    }
}
