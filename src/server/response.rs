use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use serde_json::Value;
use smallvec::SmallVec;
use std::sync::Arc;

/// Response headers; most responses carry only a handful.
pub type HeaderVec = SmallVec<[(Arc<str>, String); 8]>;

/// Reason phrase for the status codes this crate produces.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown"),
    }
}

/// Outbound response produced by a handler or the error translator.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderVec,
    /// JSON body; `None` means an empty body
    pub body: Option<Value>,
}

impl Response {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut resp = Self::new(status);
        resp.set_header("content-type", "application/json".to_string());
        resp.body = Some(body);
        resp
    }

    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    #[must_use]
    pub fn created(body: Value) -> Self {
        Self::json(201, body)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204)
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value.into());
        self
    }

    /// Replace any header with the same (case-insensitive) name.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialized body; string bodies are written raw.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            None => Vec::new(),
            Some(Value::String(s)) if self.get_header("content-type") != Some("application/json") => {
                s.clone().into_bytes()
            }
            Some(other) => serde_json::to_vec(other).unwrap_or_default(),
        }
    }

    /// Convert into an `http::Response`.
    pub fn into_http(self) -> Result<http::Response<Vec<u8>>, http::Error> {
        let body = self.body_bytes();
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        builder.body(body)
    }
}
