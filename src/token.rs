//! Per-backend access tokens
//!
//! Before writing into a backend the facade makes sure the backend carries an
//! opaque token, creating one on first touch. The token marks the backend as
//! initialized by this application and is never rotated.
//!
//! This is advisory bookkeeping, not an authorization boundary: anything with
//! the same access to the backend can read, replace or delete the token.

use uuid::Uuid;

use crate::error::BackendError;
use crate::storage::Backend;

/// Default key holding the token
pub const DEFAULT_TOKEN_KEY: &str = "folio_access_token";

/// Issues and reads the per-backend token
#[derive(Debug, Clone)]
pub struct AccessTokenGuard {
    key: String,
}

impl Default for AccessTokenGuard {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_KEY)
    }
}

impl AccessTokenGuard {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// Key the token is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the token without creating one
    pub fn get_token(&self, backend: &dyn Backend) -> Result<Option<String>, BackendError> {
        Ok(backend.get_item(&self.key)?.filter(|t| !t.is_empty()))
    }

    /// Return the existing token, writing a fresh one if absent
    pub fn ensure_token(&self, backend: &dyn Backend) -> Result<String, BackendError> {
        if let Some(token) = self.get_token(backend)? {
            return Ok(token);
        }

        let token = generate_token();
        backend.set_item(&self.key, &token)?;
        tracing::debug!(key = %self.key, "Issued new access token");
        Ok(token)
    }
}

/// 16 random bytes, hex-encoded
fn generate_token() -> String {
    hex::encode(Uuid::new_v4().as_bytes())
}
