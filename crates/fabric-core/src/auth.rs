//! Token acquisition seam
//!
//! Authentication is owned by the host; the core only asks for a bearer token.

use crate::error::{FabricError, Result};
use async_trait::async_trait;

/// Opaque source of bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// Fixed token, typically read from `FABRIC_TOKEN`
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Read the token from `FABRIC_TOKEN`
    pub fn from_env() -> Result<Self> {
        match std::env::var("FABRIC_TOKEN") {
            Ok(token) if !token.is_empty() => Ok(Self::new(token)),
            _ => Err(FabricError::config("FABRIC_TOKEN is not set")),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
