//! Transport-independent view of an inbound request.

use axum::body::Bytes;
use axum::extract::Query;
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, Uri};
use serde_json::Value;

/// Fields a client may send in a JSON body.
///
/// Non-string fields are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientPayload {
    pub auth_token: Option<String>,
    pub record_id: Option<String>,
    pub data: Option<String>,
}

impl ClientPayload {
    fn from_json(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            auth_token: field("auth_token"),
            record_id: field("record_id"),
            data: field("data"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    oversized_body: bool,
}

impl ApiRequest {
    pub fn new(method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> Self {
        let query = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();
        Self {
            method,
            path: uri.path().to_string(),
            query,
            headers,
            body,
            oversized_body: false,
        }
    }

    /// Mark the body as dropped by the transport for exceeding its size cap.
    pub fn with_oversized_body(mut self) -> Self {
        self.oversized_body = true;
        self
    }

    pub fn has_oversized_body(&self) -> bool {
        self.oversized_body
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.header(AUTHORIZATION.as_str())
    }

    /// Declared body length, if the client sent one.
    pub fn content_length(&self) -> Option<usize> {
        self.header(CONTENT_LENGTH.as_str())
            .and_then(|value| value.parse().ok())
    }

    fn content_type_contains(&self, needle: &str) -> bool {
        self.header(CONTENT_TYPE.as_str())
            .is_some_and(|content_type| content_type.contains(needle))
    }

    /// Body decoded as JSON, only when the content type says so.
    ///
    /// A missing, undecodable or malformed body all yield `None`.
    pub fn json_payload(&self) -> Option<ClientPayload> {
        if !self.content_type_contains("json") {
            return None;
        }
        serde_json::from_slice::<Value>(&self.body)
            .ok()
            .map(|value| ClientPayload::from_json(&value))
    }

    /// Raw body as text, only for `text/*`-ish content types.
    pub fn text_body(&self) -> Option<&str> {
        if !self.content_type_contains("text") {
            return None;
        }
        std::str::from_utf8(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, content_type: Option<&str>, body: &'static str) -> ApiRequest {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, content_type.parse().unwrap());
        }
        ApiRequest::new(
            Method::POST,
            &uri.parse().unwrap(),
            headers,
            Bytes::from_static(body.as_bytes()),
        )
    }

    #[test]
    fn test_query_takes_first_value_and_decodes() {
        let req = request("/crud?record_id=a%20b&record_id=other", None, "");

        assert_eq!(req.path, "/crud");
        assert_eq!(req.query("record_id"), Some("a b"));
        assert_eq!(req.query("missing"), None);
    }

    #[test]
    fn test_json_payload_requires_json_content_type() {
        let body = r#"{"record_id":"k","data":"v","auth_token":"t"}"#;

        let parsed = request("/", Some("application/json"), body).json_payload().unwrap();
        assert_eq!(parsed.record_id.as_deref(), Some("k"));
        assert_eq!(parsed.data.as_deref(), Some("v"));
        assert_eq!(parsed.auth_token.as_deref(), Some("t"));

        assert!(request("/", Some("text/plain"), body).json_payload().is_none());
        assert!(request("/", None, body).json_payload().is_none());
    }

    #[test]
    fn test_malformed_json_is_no_payload() {
        let req = request("/", Some("application/json"), "{not json");

        assert!(req.json_payload().is_none());
    }

    #[test]
    fn test_non_string_fields_are_absent() {
        let req = request("/", Some("application/json"), r#"{"record_id":42,"data":["x"]}"#);

        assert_eq!(req.json_payload(), Some(ClientPayload::default()));
    }

    #[test]
    fn test_text_body_only_for_text_content() {
        assert_eq!(
            request("/", Some("text/plain; charset=utf-8"), "hello").text_body(),
            Some("hello")
        );
        assert_eq!(request("/", Some("application/json"), "hello").text_body(), None);
    }

    #[test]
    fn test_oversized_body_flag_and_content_length() {
        let mut req = request("/", Some("text/plain"), "");
        assert!(!req.has_oversized_body());
        assert_eq!(req.content_length(), None);

        req.headers.insert(CONTENT_LENGTH, "4096".parse().unwrap());
        let req = req.with_oversized_body();

        assert!(req.has_oversized_body());
        assert_eq!(req.content_length(), Some(4096));
        assert_eq!(req.text_body(), Some(""));
    }
}
