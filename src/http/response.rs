//! Response context accumulating bound output before it is sent.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde_json::{Map, Value};

/// The response type produced by endpoints and the route table.
pub type HttpResponse = Response<Full<Bytes>>;

/// Collects header writes, JSON members, a status and an optional raw body
/// for one call, and serializes them once on [`send`].
///
/// [`send`]: ResponseContext::send
#[derive(Debug, Clone)]
pub struct ResponseContext {
    status: StatusCode,
    headers: HeaderMap,
    json: Map<String, Value>,
    body: Option<Bytes>,
}

impl ResponseContext {
    /// Create a context with the default 200 status.
    pub fn new() -> Self {
        Self::with_status(StatusCode::OK)
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            json: Map::new(),
            body: None,
        }
    }

    /// Append a header; repeated names keep every value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    /// Set one member of the JSON object body.
    pub fn set_json(&mut self, key: impl Into<String>, value: Value) {
        self.json.insert(key.into(), value);
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Set a raw body, which replaces the JSON object on the wire.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Finalize the response.
    ///
    /// A raw body wins over the JSON object. A non-empty JSON object is
    /// serialized with `Content-Type: application/json` unless a header binding
    /// already chose a content type; an empty one yields an empty body.
    pub fn send(self) -> HttpResponse {
        let mut headers = self.headers;
        let payload = match self.body {
            Some(body) => body,
            None if self.json.is_empty() => Bytes::new(),
            None => {
                headers
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static("application/json"));
                Bytes::from(Value::Object(self.json).to_string())
            }
        };

        let mut response = Response::new(Full::new(payload));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A `{"error": message}` response, used for route table answers.
pub(crate) fn json_error(status: StatusCode, message: &str) -> HttpResponse {
    let mut response = ResponseContext::with_status(status);
    response.set_json("error", Value::String(message.to_string()));
    response.send()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    fn body_text(response: HttpResponse) -> String {
        let body = tokio_test::block_on(response.into_body().collect())
            .unwrap()
            .to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[test]
    fn test_default_response_is_empty_200() {
        let response = ResponseContext::new().send();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(body_text(response), "");
    }

    #[test]
    fn test_json_members_are_merged() {
        let mut context = ResponseContext::new();
        context.set_json("title", json!("lorem ipsum"));
        context.set_json("public", json!(true));
        let response = context.send();
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        let body: Value = serde_json::from_str(&body_text(response)).unwrap();
        assert_eq!(body, json!({"title": "lorem ipsum", "public": true}));
    }

    #[test]
    fn test_raw_body_replaces_json() {
        let mut context = ResponseContext::new();
        context.set_json("ignored", json!(1));
        context.set_body("lorem ipsum");
        let response = context.send();
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(body_text(response), "lorem ipsum");
    }

    #[test]
    fn test_header_binding_keeps_its_content_type() {
        let mut context = ResponseContext::new();
        context.set_header(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        context.set_json("message", json!("hi"));
        let response = context.send();
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_headers_are_a_multimap() {
        let mut context = ResponseContext::new();
        let name = HeaderName::from_static("set-cookie");
        context.set_header(name.clone(), HeaderValue::from_static("a=1"));
        context.set_header(name.clone(), HeaderValue::from_static("b=2"));
        let response = context.send();
        assert_eq!(response.headers().get_all(name).iter().count(), 2);
    }

    #[test]
    fn test_status_override() {
        let mut context = ResponseContext::new();
        context.set_status(StatusCode::CREATED);
        assert_eq!(context.status(), StatusCode::CREATED);
        assert_eq!(context.send().status(), StatusCode::CREATED);

        let context = ResponseContext::with_status(StatusCode::BAD_REQUEST);
        assert_eq!(context.send().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_json_error() {
        let response = json_error(StatusCode::NOT_FOUND, "not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response), r#"{"error":"not found"}"#);
    }
}
