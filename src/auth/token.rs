use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use ulid::Ulid;

/// An issued access token, as returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub user: String,
    pub token: String,
    /// Lifetime in seconds
    pub ttl: u64,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The requested TTL is not a positive integer
    InvalidTtl(String),
    TtlTooLarge { requested: u64, max: u64 },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::InvalidTtl(raw) => write!(f, "TTL must be a positive integer, got {raw}"),
            TokenError::TtlTooLarge { requested, max } => write!(
                f,
                "TTL specified {requested} is greater than max allowed {max}."
            ),
        }
    }
}

impl std::error::Error for TokenError {}

/// Read the optional `ttl` field of a token request body.
pub fn parse_ttl(body: &Value) -> Result<Option<u64>, TokenError> {
    match body.get("ttl") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(ttl) if ttl > 0 => Ok(Some(ttl)),
            _ => Err(TokenError::InvalidTtl(n.to_string())),
        },
        Some(other) => Err(TokenError::InvalidTtl(other.to_string())),
    }
}

/// Mints tokens for authenticated users.
pub trait TokenService: Send + Sync {
    /// Issue a token for `username`; `ttl` of `None` means the default.
    fn create_token(&self, username: &str, ttl: Option<u64>) -> Result<Token, TokenError>;
}

/// Issues ULID tokens with a default and maximum lifetime.
///
/// Tokens are not persisted; only a count of issued tokens is kept.
#[derive(Debug)]
pub struct InMemoryTokenService {
    default_ttl: u64,
    max_ttl: u64,
    issued: AtomicU64,
}

impl InMemoryTokenService {
    #[must_use]
    pub fn new(default_ttl: u64, max_ttl: u64) -> Self {
        Self {
            default_ttl,
            max_ttl: max_ttl.max(default_ttl),
            issued: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::Relaxed)
    }
}

impl TokenService for InMemoryTokenService {
    fn create_token(&self, username: &str, ttl: Option<u64>) -> Result<Token, TokenError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl > self.max_ttl {
            return Err(TokenError::TtlTooLarge {
                requested: ttl,
                max: self.max_ttl,
            });
        }
        let expiry = i64::try_from(ttl)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .ok_or_else(|| TokenError::InvalidTtl(ttl.to_string()))?;
        self.issued.fetch_add(1, Ordering::Relaxed);
        Ok(Token {
            id: Ulid::new().to_string(),
            user: username.to_string(),
            token: Ulid::new().to_string().to_lowercase(),
            ttl,
            expiry,
            metadata: Map::new(),
        })
    }
}
