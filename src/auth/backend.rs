use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Verifies a username/password pair.
pub trait AuthBackend: Send + Sync {
    /// Short name used in audit log lines.
    fn name(&self) -> &str;

    fn authenticate(&self, username: &str, password: &str) -> bool;
}

/// Fixed set of users held in memory.
///
/// Passwords are kept as SHA-256 digests and compared without early exit.
#[derive(Clone, Default)]
pub struct StaticBackend {
    users: HashMap<String, Vec<u8>>,
}

impl StaticBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(mut self, username: &str, password: &str) -> Self {
        self.insert(username, password);
        self
    }

    pub fn insert(&mut self, username: &str, password: &str) {
        self.users.insert(username.to_string(), digest(password));
    }

    /// Parse `user:password` lines. Blank lines and `#` comments are skipped;
    /// the password is everything after the first colon.
    pub fn parse_htpasswd(text: &str) -> Result<Self> {
        let mut backend = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((user, password)) = line.split_once(':') else {
                bail!("line {}: expected 'user:password'", lineno + 1);
            };
            if user.is_empty() {
                bail!("line {}: empty username", lineno + 1);
            }
            backend.insert(user, password);
        }
        Ok(backend)
    }

    pub fn from_htpasswd_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read users file '{}'", path.display()))?;
        Self::parse_htpasswd(&text).with_context(|| format!("invalid users file '{}'", path.display()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl AuthBackend for StaticBackend {
    fn name(&self) -> &str {
        "static"
    }

    fn authenticate(&self, username: &str, password: &str) -> bool {
        let Some(expected) = self.users.get(username) else {
            return false;
        };
        let given = digest(password);
        expected.as_slice().ct_eq(given.as_slice()).into()
    }
}

impl fmt::Debug for StaticBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut users: Vec<&str> = self.users.keys().map(String::as_str).collect();
        users.sort_unstable();
        f.debug_struct("StaticBackend").field("users", &users).finish()
    }
}

fn digest(password: &str) -> Vec<u8> {
    Sha256::digest(password.as_bytes()).to_vec()
}
