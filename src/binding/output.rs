//! Output bindings: which response channel each output field is written to.

use crate::binding::tag::split_tag;
use crate::binding::{BindError, Emit, FieldSchema};
use crate::error::ConfigurationError;
use crate::http::ResponseContext;
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use serde_json::Value;

/// Response channel of one output (or structured error) field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputBinding {
    /// `header,<name>`: appended as a response header.
    Header(HeaderName),
    /// `json,<key>`: a member of the flat JSON object body.
    Json(String),
    /// `status`: the response status code.
    Status,
    /// `body`: the raw response body, replacing the JSON object.
    Body,
}

impl OutputBinding {
    /// Compile the `response` tag of one output field.
    pub fn compile(field: &FieldSchema) -> Result<Self, ConfigurationError> {
        let invalid = || ConfigurationError::InvalidResponseTag { field: field.name };
        let tag = field.tag.ok_or_else(invalid)?;

        match split_tag(tag).as_slice() {
            ["header", key] if !key.is_empty() => HeaderName::from_bytes(key.as_bytes())
                .map(OutputBinding::Header)
                .map_err(|_| invalid()),
            ["json", key] if !key.is_empty() => Ok(OutputBinding::Json(key.to_string())),
            ["status"] => Ok(OutputBinding::Status),
            ["body"] => Ok(OutputBinding::Body),
            _ => Err(invalid()),
        }
    }

    /// Write one field's value to the response.
    ///
    /// `null` leaves headers, status and body untouched; in the JSON object it
    /// is written as is.
    pub fn write(&self, emit: Emit, response: &mut ResponseContext) -> Result<(), BindError> {
        match (self, emit) {
            (OutputBinding::Json(key), Emit::Value(value)) => {
                response.set_json(key.clone(), value);
                Ok(())
            }
            (OutputBinding::Json(_), Emit::Body(_)) => Err(BindError::new(
                "raw bytes cannot be written to a json field",
            )),
            (_, Emit::Value(Value::Null)) => Ok(()),
            (OutputBinding::Header(name), Emit::Value(value)) => {
                let text = header_text(value)?;
                let value = HeaderValue::from_str(&text)
                    .map_err(|_| BindError::new("header value contains invalid characters"))?;
                response.set_header(name.clone(), value);
                Ok(())
            }
            (OutputBinding::Header(name), Emit::Body(bytes)) => {
                let value = HeaderValue::from_bytes(&bytes)
                    .map_err(|_| BindError::new("header value contains invalid characters"))?;
                response.set_header(name.clone(), value);
                Ok(())
            }
            (OutputBinding::Status, Emit::Value(value)) => {
                let status = value
                    .as_u64()
                    .and_then(|code| u16::try_from(code).ok())
                    .and_then(|code| StatusCode::from_u16(code).ok())
                    .ok_or_else(|| BindError::new(format!("{} is not a valid status code", value)))?;
                response.set_status(status);
                Ok(())
            }
            (OutputBinding::Status, Emit::Body(_)) => {
                Err(BindError::new("status must be an integer status code"))
            }
            (OutputBinding::Body, Emit::Body(bytes)) => {
                response.set_body(bytes);
                Ok(())
            }
            (OutputBinding::Body, Emit::Value(Value::String(text))) => {
                response.set_body(text);
                Ok(())
            }
            (OutputBinding::Body, Emit::Value(_)) => {
                Err(BindError::new("body must be bytes or a string"))
            }
        }
    }
}

fn header_text(value: Value) -> Result<String, BindError> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(BindError::new(
            "header value must be a string, number or boolean",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use serde_json::json;

    fn compile(tag: Option<&'static str>) -> Result<OutputBinding, ConfigurationError> {
        OutputBinding::compile(&FieldSchema::new("field", tag))
    }

    fn body_of(response: ResponseContext) -> (u16, hyper::HeaderMap, Bytes) {
        let response = response.send();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = tokio_test::block_on(response.into_body().collect())
            .unwrap()
            .to_bytes();
        (status, headers, body)
    }

    #[test]
    fn test_compile_every_channel() {
        assert_eq!(
            compile(Some("header,Cache-Control")).unwrap(),
            OutputBinding::Header(HeaderName::from_static("cache-control"))
        );
        assert_eq!(
            compile(Some("json,message")).unwrap(),
            OutputBinding::Json("message".to_string())
        );
        assert_eq!(compile(Some("status")).unwrap(), OutputBinding::Status);
        assert_eq!(compile(Some("body")).unwrap(), OutputBinding::Body);
        assert_eq!(
            compile(Some("header, content-type ")).unwrap(),
            OutputBinding::Header(HeaderName::from_static("content-type"))
        );
    }

    #[test]
    fn test_compile_rejects_invalid_tags() {
        for tag in [
            None,
            Some("query,page"),
            Some("path"),
            Some("status,code"),
            Some("json"),
            Some("header"),
            Some("header,not a header"),
        ] {
            let err = compile(tag).unwrap_err();
            assert_eq!(err.to_string(), "missing or invalid response tag on output field");
            assert_eq!(err.field(), Some("field"));
        }
    }

    #[test]
    fn test_write_header_and_json() {
        let mut response = ResponseContext::new();
        compile(Some("header,x-count"))
            .unwrap()
            .write(Emit::Value(json!(3)), &mut response)
            .unwrap();
        compile(Some("json,title"))
            .unwrap()
            .write(Emit::Value(json!("lorem")), &mut response)
            .unwrap();
        compile(Some("json,missing"))
            .unwrap()
            .write(Emit::Value(Value::Null), &mut response)
            .unwrap();

        let (status, headers, body) = body_of(response);
        assert_eq!(status, 200);
        assert_eq!(headers.get("x-count").unwrap(), "3");
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({"title": "lorem", "missing": null}));
    }

    #[test]
    fn test_write_status_and_body() {
        let mut response = ResponseContext::new();
        OutputBinding::Status
            .write(Emit::Value(json!(201)), &mut response)
            .unwrap();
        OutputBinding::Body
            .write(Emit::Body(Bytes::from_static(b"lorem ipsum")), &mut response)
            .unwrap();

        let (status, _, body) = body_of(response);
        assert_eq!(status, 201);
        assert_eq!(body, Bytes::from_static(b"lorem ipsum"));
    }

    #[test]
    fn test_null_leaves_channels_untouched() {
        let mut response = ResponseContext::new();
        OutputBinding::Status
            .write(Emit::Value(Value::Null), &mut response)
            .unwrap();
        OutputBinding::Header(HeaderName::from_static("etag"))
            .write(Emit::Value(Value::Null), &mut response)
            .unwrap();
        let (status, headers, body) = body_of(response);
        assert_eq!(status, 200);
        assert!(headers.get("etag").is_none());
        assert!(body.is_empty());
    }

    #[test]
    fn test_write_rejects_mismatched_values() {
        let mut response = ResponseContext::new();
        assert!(OutputBinding::Status
            .write(Emit::Value(json!("created")), &mut response)
            .is_err());
        for code in [json!(70000), json!(1000), json!(42), json!(-1)] {
            let err = OutputBinding::Status
                .write(Emit::Value(code.clone()), &mut response)
                .unwrap_err();
            assert_eq!(err.reason(), format!("{} is not a valid status code", code));
        }
        assert_eq!(response.status(), StatusCode::OK);
        assert!(OutputBinding::Body
            .write(Emit::Value(json!({"a": 1})), &mut response)
            .is_err());
        assert!(OutputBinding::Header(HeaderName::from_static("x-list"))
            .write(Emit::Value(json!([1, 2])), &mut response)
            .is_err());
        assert!(OutputBinding::Header(HeaderName::from_static("x-line"))
            .write(Emit::Value(json!("a\nb")), &mut response)
            .is_err());
        assert!(OutputBinding::Json("raw".into())
            .write(Emit::Body(Bytes::new()), &mut response)
            .is_err());
    }
}
