//! Credential source backed by configuration and the environment.

use async_trait::async_trait;
use toolhost_application::ports::credentials::{CredentialSource, Credentials};

/// Environment variables consulted, in order, when the config has no key.
pub const API_KEY_ENV_VARS: [&str; 2] = ["TOOLHOST_API_KEY", "Z_AI_API_KEY"];

/// Reads the API key from config first, then the environment.
///
/// The environment is read on every [`load`](CredentialSource::load), so a key
/// exported after startup is picked up by the next provider call.
#[derive(Debug, Clone)]
pub struct ConfigCredentialSource {
    configured: Option<String>,
    env_vars: Vec<String>,
}

impl ConfigCredentialSource {
    pub fn new(configured: Option<String>) -> Self {
        Self {
            configured: configured.filter(|k| !k.trim().is_empty()),
            env_vars: API_KEY_ENV_VARS.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn with_env_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_vars = vars.into_iter().map(Into::into).collect();
        self
    }

    fn from_env(&self) -> Option<String> {
        self.env_vars
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
    }
}

#[async_trait]
impl CredentialSource for ConfigCredentialSource {
    async fn load(&self) -> Credentials {
        Credentials {
            api_key: self.configured.clone().or_else(|| self.from_env()),
        }
    }
}
