//! Credential source port
//!
//! Capability providers authenticate with an API key. A missing key is not an
//! error: the provider manager reports "waiting for credential" and retries
//! initialization on a later call.

use async_trait::async_trait;

/// Credentials available right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: Option<String>,
}

impl Credentials {
    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(key.into()),
        }
    }

    /// The key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Source of credentials, consulted before every authenticated call
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn load(&self) -> Credentials;
}

/// Fixed credentials, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Credentials);

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn load(&self) -> Credentials {
        self.0.clone()
    }
}
