//! Secret retrieval

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VaultError {
    #[error("secret '{0}' not found")]
    NotFound(String),

    #[error("vault backend error: {0}")]
    Backend(String),
}

/// Named secret lookup
#[async_trait]
pub trait SecretVault: Send + Sync {
    async fn get(&self, name: &str) -> Result<String, VaultError>;
}

/// Vault backed by secrets supplied at startup
#[derive(Clone, Default)]
pub struct StaticVault {
    secrets: HashMap<String, String>,
}

impl StaticVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), secret.into());
        self
    }
}

impl fmt::Debug for StaticVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.secrets.keys().collect();
        names.sort();
        write!(f, "StaticVault({:?}: [REDACTED])", names)
    }
}

#[async_trait]
impl SecretVault for StaticVault {
    async fn get(&self, name: &str) -> Result<String, VaultError> {
        self.secrets
            .get(name)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(name.to_string()))
    }
}
