use super::backend::AuthBackend;
use super::token::{parse_ttl, TokenService};
use super::{AuthMode, DEFAULT_API_URL};
use crate::error::{HandlerError, HttpError};
use crate::logging::{redact, RedactionLevel};
use crate::params::BoundCall;
use crate::registry::{Handler, HandlerResult};
use crate::server::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// operationId the bundled auth spec routes `POST /tokens` to.
pub const TOKEN_OPERATION_ID: &str = "specrouter.auth.controller:token_controller.post";

const UNAUTHORIZED_MESSAGE: &str = "Invalid or missing credentials";

/// Issues tokens for `POST /tokens`.
///
/// Reads the bound parameters `request` (optional `{ttl}` body),
/// `authorization` (header), and `remote_user` / `remote_addr` /
/// `x-forwarded-for`.
pub struct TokenController {
    mode: AuthMode,
    backend: Option<Arc<dyn AuthBackend>>,
    tokens: Arc<dyn TokenService>,
    api_url: String,
    redaction: RedactionLevel,
}

impl TokenController {
    /// Authenticate Basic credentials against `backend`.
    #[must_use]
    pub fn standalone(backend: Arc<dyn AuthBackend>, tokens: Arc<dyn TokenService>) -> Self {
        Self {
            mode: AuthMode::Standalone,
            backend: Some(backend),
            tokens,
            api_url: DEFAULT_API_URL.to_string(),
            redaction: RedactionLevel::Credentials,
        }
    }

    /// Trust the identity a fronting proxy put in `REMOTE_USER`.
    #[must_use]
    pub fn proxy(tokens: Arc<dyn TokenService>) -> Self {
        Self {
            mode: AuthMode::Proxy,
            backend: None,
            tokens,
            api_url: DEFAULT_API_URL.to_string(),
            redaction: RedactionLevel::Credentials,
        }
    }

    /// API location sent in `X-API-URL` on success.
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    #[must_use]
    pub fn with_redaction(mut self, level: RedactionLevel) -> Self {
        self.redaction = level;
        self
    }

    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn post(&self, call: &BoundCall) -> HandlerResult {
        match self.mode {
            AuthMode::Proxy => self.handle_proxy_auth(call),
            AuthMode::Standalone => self.handle_standalone_auth(call),
        }
    }

    fn handle_proxy_auth(&self, call: &BoundCall) -> HandlerResult {
        let remote_addr = call
            .get_str("x-forwarded-for")
            .or_else(|| call.get_str("remote_addr"))
            .unwrap_or_default();

        match call.get_str("remote_user").filter(|u| !u.is_empty()) {
            Some(user) => self.issue(user, call),
            None => {
                info!(
                    target: "audit",
                    remote_addr = %remote_addr,
                    request_id = %call.request_id(),
                    "Access denied to anonymous user."
                );
                Err(unauthorized())
            }
        }
    }

    fn handle_standalone_auth(&self, call: &BoundCall) -> HandlerResult {
        let backend_name = self.backend.as_ref().map_or("none", |b| b.name());
        let remote_addr = call.get_str("remote_addr").unwrap_or_default();
        let deny = |reason: &str| {
            info!(
                target: "audit",
                auth_backend = %backend_name,
                remote_addr = %remote_addr,
                request_id = %call.request_id(),
                "{reason}"
            );
            unauthorized()
        };

        let Some(authorization) = call.get_str("authorization").filter(|a| !a.is_empty()) else {
            return Err(deny("Authorization header not provided"));
        };
        let Some((auth_type, auth_value)) = authorization.trim().split_once(' ') else {
            return Err(deny("Invalid authorization header"));
        };
        if !auth_type.eq_ignore_ascii_case("basic") {
            return Err(deny(&format!("Unsupported authorization type: {auth_type}")));
        }
        let Ok(decoded) = STANDARD.decode(auth_value.trim()) else {
            return Err(deny("Invalid authorization header"));
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return Err(deny("Invalid authorization header"));
        };
        let parts: Vec<&str> = decoded.split(':').collect();
        let [username, password] = parts.as_slice() else {
            return Err(deny("Invalid authorization header"));
        };

        let Some(backend) = &self.backend else {
            warn!("Standalone auth mode without a backend");
            return Err(deny("No authentication backend configured"));
        };
        if backend.authenticate(username, password) {
            return self.issue(username, call);
        }

        info!(
            target: "audit",
            auth_backend = %backend_name,
            remote_addr = %remote_addr,
            username = %username,
            authorization = %redact(self.redaction, "authorization", authorization),
            "Invalid credentials provided"
        );
        Err(unauthorized())
    }

    fn issue(&self, username: &str, call: &BoundCall) -> HandlerResult {
        let body = call.get("request").unwrap_or(&Value::Null);
        let ttl = parse_ttl(body).map_err(|e| HttpError::bad_request(e.to_string()))?;
        let token = self
            .tokens
            .create_token(username, ttl)
            .map_err(|e| HttpError::bad_request(e.to_string()))?;

        info!(
            target: "audit",
            user = %token.user,
            ttl = token.ttl,
            token = %redact(self.redaction, "token", &token.token),
            "Access granted"
        );

        let body = serde_json::to_value(&token).map_err(|e| HandlerError::Internal(e.into()))?;
        Ok(Some(
            Response::created(body).with_header("X-API-URL", self.api_url.as_str()),
        ))
    }
}

impl Handler for TokenController {
    fn call(&self, call: BoundCall) -> HandlerResult {
        self.post(&call)
    }
}

fn unauthorized() -> HandlerError {
    HttpError::unauthorized(UNAUTHORIZED_MESSAGE).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{InMemoryTokenService, StaticBackend};
    use crate::ids::RequestId;
    use serde_json::json;

    fn standalone() -> TokenController {
        TokenController::standalone(
            Arc::new(StaticBackend::new().with_user("user", "pass")),
            Arc::new(InMemoryTokenService::new(3600, 86400)),
        )
        .with_api_url("http://127.0.0.1:9101")
    }

    fn call() -> BoundCall {
        BoundCall::new(TOKEN_OPERATION_ID, RequestId::new()).with("request", Value::Null)
    }

    fn status(result: HandlerResult) -> u16 {
        match result {
            Ok(Some(resp)) => resp.status,
            Ok(None) => 204,
            Err(HandlerError::Http(e)) => e.status,
            Err(HandlerError::Internal(_)) => 500,
        }
    }

    #[test]
    fn test_basic_credentials_issue_token() {
        let resp = standalone()
            .post(&call().with("authorization", json!("Basic dXNlcjpwYXNz")))
            .unwrap()
            .unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(resp.get_header("x-api-url"), Some("http://127.0.0.1:9101"));
        let body = resp.body.unwrap();
        assert_eq!(body["user"], "user");
        assert_eq!(body["ttl"], 3600);
    }

    #[test]
    fn test_rejections_are_401() {
        let controller = standalone();
        for header in [
            Value::Null,
            json!(""),
            json!("Bearer dXNlcjpwYXNz"),
            json!("Basic !!!not-base64"),
            json!("Basic dXNlcg=="),           // "user"
            json!("Basic dXNlcjpwYXNzOmV4dHJh"), // "user:pass:extra"
            json!("Basic dXNlcjp3cm9uZw=="),   // "user:wrong"
            json!("Basic"),
        ] {
            let result = controller.post(&call().with("authorization", header.clone()));
            assert_eq!(status(result), 401, "header {header}");
        }
    }

    #[test]
    fn test_unauthorized_message() {
        let err = standalone().post(&call()).unwrap_err();
        match err {
            HandlerError::Http(e) => assert_eq!(e.message, "Invalid or missing credentials"),
            HandlerError::Internal(e) => panic!("unexpected {e}"),
        }
    }

    #[test]
    fn test_ttl_from_body() {
        let controller = standalone();
        let ok = controller
            .post(
                &call()
                    .with("authorization", json!("Basic dXNlcjpwYXNz"))
                    .with("request", json!({"ttl": 60})),
            )
            .unwrap()
            .unwrap();
        assert_eq!(ok.body.unwrap()["ttl"], 60);

        let too_large = controller.post(
            &call()
                .with("authorization", json!("Basic dXNlcjpwYXNz"))
                .with("request", json!({"ttl": 999_999})),
        );
        assert_eq!(status(too_large), 400);
    }

    #[test]
    fn test_proxy_mode() {
        let controller = TokenController::proxy(Arc::new(InMemoryTokenService::new(60, 60)));
        assert_eq!(controller.mode(), AuthMode::Proxy);
        let resp = controller
            .post(&call().with("remote_user", json!("alice")))
            .unwrap()
            .unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(resp.get_header("x-api-url"), Some(DEFAULT_API_URL));
        assert_eq!(status(controller.post(&call().with("remote_user", Value::Null))), 401);
    }
}
