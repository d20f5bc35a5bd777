//! Token bookkeeping for the signed-in user.
//!
//! Tokens are issued elsewhere; the session only stores and forgets them
//! under the configured keys.

use std::sync::Arc;

use tracing::info;

use crate::config::AuthConfig;
use crate::ports::{StorageError, TokenStorage};

pub struct AuthSession {
    tokens: Arc<dyn TokenStorage>,
    token_key: String,
    refresh_key: String,
}

impl AuthSession {
    pub fn new(config: &AuthConfig, tokens: Arc<dyn TokenStorage>) -> Self {
        Self {
            tokens,
            token_key: config.jwt_storage_key.clone(),
            refresh_key: config.refresh_token_key.clone(),
        }
    }

    /// Store the bearer token and, if given, the refresh token.
    pub fn login(&self, token: &str, refresh: Option<&str>) -> Result<(), StorageError> {
        self.tokens.set(&self.token_key, token)?;
        match refresh {
            Some(refresh) => self.tokens.set(&self.refresh_key, refresh)?,
            None => self.tokens.remove(&self.refresh_key)?,
        }
        info!(key = %self.token_key, "session token stored");
        Ok(())
    }

    /// Forget both tokens. Succeeds when nothing was stored.
    pub fn logout(&self) -> Result<(), StorageError> {
        self.tokens.remove(&self.token_key)?;
        self.tokens.remove(&self.refresh_key)?;
        info!("session tokens removed");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens
            .get(&self.token_key)
            .is_some_and(|token| !token.is_empty())
    }

    pub fn token(&self) -> Option<String> {
        self.tokens.get(&self.token_key)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.tokens.get(&self.refresh_key)
    }
}
