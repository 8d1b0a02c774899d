use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::debug;

/// Ordered name/value pairs; duplicates are kept.
pub type FieldVec = SmallVec<[(String, String); 16]>;

/// Inbound request as the router sees it.
///
/// Host adapters fill in the five facets the binder reads from: path and
/// query, headers, body bytes (JSON or form encoded), and the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path without the query string, still percent-encoded
    pub path: String,
    /// Decoded query pairs in arrival order
    pub query: FieldVec,
    /// Header pairs in arrival order; names keep their original case
    pub headers: FieldVec,
    pub body: Vec<u8>,
    /// Environment variables visible to `environ` parameters
    pub environ: HashMap<String, String>,
}

impl Request {
    /// Build a request for `target`, which may carry a query string.
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query_params(query)),
            None => (target, FieldVec::new()),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            headers: FieldVec::new(),
            body: Vec::new(),
            environ: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    #[must_use]
    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `body` as the JSON payload and set `Content-Type`.
    #[must_use]
    pub fn with_json(self, body: &Value) -> Self {
        self.with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    /// Encode `fields` as an `application/x-www-form-urlencoded` payload.
    #[must_use]
    pub fn with_form(self, fields: &[(&str, &str)]) -> Self {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in fields {
            serializer.append_pair(k, v);
        }
        self.with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(serializer.finish())
    }

    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environ.insert(name.into(), value.into());
        self
    }

    /// Expose the current process environment; explicit `with_env` entries win.
    #[must_use]
    pub fn with_process_env(mut self) -> Self {
        for (k, v) in std::env::vars() {
            self.environ.entry(k).or_insert(v);
        }
        self
    }

    /// Adapt an `http::Request`.
    ///
    /// The environment is the process environment, plus `REMOTE_ADDR` when
    /// the request carries a `SocketAddr` extension.
    #[must_use]
    pub fn from_http(req: http::Request<Vec<u8>>) -> Self {
        let (parts, body) = req.into_parts();
        let target = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());
        let mut out = Self::new(parts.method, &target).with_body(body);
        for (name, value) in &parts.headers {
            out.headers.push((
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ));
        }
        if let Some(addr) = parts.extensions.get::<std::net::SocketAddr>() {
            out.environ.insert("REMOTE_ADDR".to_string(), addr.ip().to_string());
        }
        debug!(method = %out.method, path = %out.path, "Adapted http::Request");
        out.with_process_env()
    }

    /// Query value by name; the last occurrence wins.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Header value by case-insensitive name; the first occurrence wins.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
    }

    /// Parse the body as JSON. `None` when the body is empty.
    pub fn json_body(&self) -> Option<Result<Value, serde_json::Error>> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        Some(serde_json::from_slice(&self.body))
    }

    /// Decoded form fields; empty unless the body is form encoded.
    #[must_use]
    pub fn form_fields(&self) -> FieldVec {
        match self.content_type() {
            Some(ct) if ct.eq_ignore_ascii_case("application/x-www-form-urlencoded") => {
                url::form_urlencoded::parse(&self.body)
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            }
            _ => FieldVec::new(),
        }
    }

    #[must_use]
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.environ.get(name).map(String::as_str)
    }
}

/// Decode a raw query string (without the leading `?`).
#[must_use]
pub fn parse_query_params(query: &str) -> FieldVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
