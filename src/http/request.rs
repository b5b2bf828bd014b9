//! Request context with lazily parsed query string and JSON body.

use crate::error::RequestError;
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// An HTTP request whose body has already been collected.
pub type HttpRequest = hyper::Request<Bytes>;

/// Percent-decoded request path, cached in the request extensions.
#[derive(Debug, Clone)]
struct DecodedPath(String);

/// The percent-decoded path of `request`, decoded on first call.
///
/// Invalid escapes are kept as is and invalid UTF-8 is replaced.
pub(crate) fn decoded_path(request: &mut HttpRequest) -> String {
    if let Some(DecodedPath(path)) = request.extensions().get::<DecodedPath>() {
        return path.clone();
    }
    let path = percent_decode_str(request.uri().path())
        .decode_utf8_lossy()
        .into_owned();
    request.extensions_mut().insert(DecodedPath(path.clone()));
    path
}

/// Wraps one incoming request for the duration of a single call.
///
/// The query string and the JSON body are parsed on first use and cached, so
/// any number of bindings can read from them while each is parsed at most once.
#[derive(Debug)]
pub struct RequestContext {
    request: HttpRequest,
    path: String,
    query: Option<HashMap<String, String>>,
    json: Option<Result<Map<String, Value>, RequestError>>,
    #[cfg(test)]
    query_parses: usize,
    #[cfg(test)]
    json_parses: usize,
}

impl RequestContext {
    pub fn new(mut request: HttpRequest) -> Self {
        let path = decoded_path(&mut request);
        Self {
            request,
            path,
            query: None,
            json: None,
            #[cfg(test)]
            query_parses: 0,
            #[cfg(test)]
            json_parses: 0,
        }
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, key: &str) -> Option<String> {
        self.request
            .headers()
            .get(key)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
    }

    /// First value of a query string parameter.
    pub fn query(&mut self, key: &str) -> Option<String> {
        self.query_map().get(key).cloned()
    }

    /// The decoded query string, parsed on first call.
    pub fn query_map(&mut self) -> &HashMap<String, String> {
        let parsed = match self.query.take() {
            Some(cached) => cached,
            None => {
                #[cfg(test)]
                {
                    self.query_parses += 1;
                }
                parse_query(self.request.uri().query())
            }
        };
        self.query.insert(parsed)
    }

    /// A top-level member of the JSON body.
    ///
    /// Fails with `invalid json` when the body is not a JSON object; the
    /// failure is cached like a successful parse.
    pub fn json(&mut self, key: &str) -> Result<Option<Value>, RequestError> {
        Ok(self.json_map()?.get(key).cloned())
    }

    /// The JSON object body, parsed on first call.
    pub fn json_map(&mut self) -> Result<&Map<String, Value>, RequestError> {
        let parsed = match self.json.take() {
            Some(cached) => cached,
            None => {
                #[cfg(test)]
                {
                    self.json_parses += 1;
                }
                serde_json::from_slice(self.request.body()).map_err(|_| RequestError::invalid_json())
            }
        };
        match self.json.insert(parsed) {
            Ok(map) => Ok(map),
            Err(err) => Err(err.clone()),
        }
    }

    /// The percent-decoded request path, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw request body.
    pub fn body(&self) -> Bytes {
        self.request.body().clone()
    }
}

/// Decode an `application/x-www-form-urlencoded` query, keeping the first
/// value of repeated keys.
fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    let pairs: Vec<(String, String)> = match raw.map(serde_urlencoded::from_str::<Vec<(String, String)>>) {
        Some(Ok(pairs)) => pairs,
        Some(Err(err)) => {
            debug!("Ignoring malformed query string: {}", err);
            Vec::new()
        }
        None => Vec::new(),
    };

    let mut query = HashMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        query.entry(key).or_insert(value);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(uri: &str, body: &'static [u8]) -> RequestContext {
        RequestContext::new(
            hyper::Request::builder()
                .method("POST")
                .uri(uri)
                .header("Authorization", "token")
                .header("Content-Type", "application/json")
                .body(Bytes::from_static(body))
                .unwrap(),
        )
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let context = request("/hello", b"");
        assert_eq!(context.header("authorization"), Some("token".to_string()));
        assert_eq!(context.header("CONTENT-TYPE"), Some("application/json".to_string()));
        assert_eq!(context.header("x-missing"), None);
    }

    #[test]
    fn test_query_is_parsed_once() {
        let mut context = request("/hello?limit=10&page=2&page=3", b"");
        assert_eq!(context.query("limit"), Some("10".to_string()));
        assert_eq!(context.query("page"), Some("2".to_string()));
        assert_eq!(context.query("missing"), None);
        assert_eq!(context.query_parses, 1);
    }

    #[test]
    fn test_query_decoding() {
        let mut context = request("/search?q=hello+world&tag=a%26b", b"");
        assert_eq!(context.query("q"), Some("hello world".to_string()));
        assert_eq!(context.query("tag"), Some("a&b".to_string()));

        let mut context = request("/search", b"");
        assert!(context.query_map().is_empty());
    }

    #[test]
    fn test_query_parsing_is_lenient() {
        assert!(parse_query(Some("")).is_empty());

        let query = parse_query(Some("flag&=orphan&bad=%zz&ok=1"));
        assert_eq!(query.get("flag"), Some(&String::new()));
        assert_eq!(query.get("bad"), Some(&"%zz".to_string()));
        assert_eq!(query.get("ok"), Some(&"1".to_string()));
    }

    #[test]
    fn test_json_is_parsed_once() {
        let mut context = request("/hello", br#"{"title": "lorem ipsum", "public": true}"#);
        assert_eq!(context.json("title").unwrap(), Some(json!("lorem ipsum")));
        assert_eq!(context.json("public").unwrap(), Some(json!(true)));
        assert_eq!(context.json("missing").unwrap(), None);
        assert_eq!(context.json_parses, 1);

        let first = context.json_map().unwrap().clone();
        let second = context.json_map().unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(context.json_parses, 1);
    }

    #[test]
    fn test_invalid_json_is_cached() {
        let mut context = request("/hello", b"{\"name\": ");
        assert_eq!(context.json("name").unwrap_err(), RequestError::invalid_json());
        assert_eq!(context.json("other").unwrap_err().message, "invalid json");
        assert_eq!(context.json_parses, 1);
    }

    #[test]
    fn test_json_requires_an_object() {
        let bodies: [&'static [u8]; 4] = [b"", b"[1, 2]", b"null", b"\"text\""];
        for body in bodies {
            let mut context = RequestContext::new(
                hyper::Request::builder()
                    .uri("/")
                    .body(Bytes::from_static(body))
                    .unwrap(),
            );
            assert_eq!(context.json("any").unwrap_err(), RequestError::invalid_json());
        }
    }

    #[test]
    fn test_path_and_body_are_raw() {
        let context = request("/hello/world?q=query", b"lorem ipsum");
        assert_eq!(context.path(), "/hello/world");
        assert_eq!(context.body(), Bytes::from_static(b"lorem ipsum"));
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let context = request("/a%20b/caf%C3%A9?q=x%20y", b"");
        assert_eq!(context.path(), "/a b/café");

        let context = request("/a+b/50%25", b"");
        assert_eq!(context.path(), "/a+b/50%");
    }

    #[test]
    fn test_decoded_path_is_cached_on_the_request() {
        let mut request = hyper::Request::builder()
            .uri("/x%20y")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(decoded_path(&mut request), "/x y");
        assert!(request.extensions().get::<DecodedPath>().is_some());
        assert_eq!(RequestContext::new(request).path(), "/x y");
    }
}
