//! Raw TOML configuration data types
//!
//! These structs mirror the config file. Provider sections are overlays: any
//! field left out keeps the built-in default for that provider.
//!
//! ```toml
//! [credentials]
//! api_key = "..."
//!
//! [timeouts]
//! tool_call_secs = 90
//!
//! [subagent]
//! max_iterations = 20
//! mode = "plan"
//!
//! [providers.web-search]
//! url = "https://mcp.example.com/search"
//!
//! [providers.vision]
//! enabled = false
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use toolhost_application::config::ExecutionParams;
use toolhost_domain::providers::{ProviderConfig, ProviderName, TransportConfig};
use toolhost_domain::subagent::OperatingMode;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("timeouts.{0} cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("subagent.max_iterations cannot be 0")]
    ZeroIterations,

    #[error("subagent.model cannot be empty")]
    EmptyModel,

    #[error("{0}")]
    UnknownProvider(String),

    #[error("providers.{provider}.{field} does not apply to a {kind} provider")]
    WrongTransport {
        provider: ProviderName,
        field: &'static str,
        kind: &'static str,
    },

    #[error("providers.{provider}.{field} cannot be empty")]
    EmptyValue {
        provider: ProviderName,
        field: &'static str,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCredentialsConfig {
    pub api_key: Option<String>,
}

/// Timeouts in seconds; unset values keep the [`ExecutionParams`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTimeoutsConfig {
    pub health_check_secs: Option<u64>,
    pub tool_call_secs: Option<u64>,
    pub default_tool_secs: Option<u64>,
    pub human_sync_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSubagentConfig {
    pub max_iterations: Option<usize>,
    pub model: Option<String>,
    pub mode: OperatingMode,
}

/// Overrides for one provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    pub enabled: Option<bool>,
    // HTTP
    pub url: Option<String>,
    pub session_affinity: Option<bool>,
    // stdio
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: BTreeMap<String, String>,
    pub credential_env: Option<String>,
    pub min_runtime_major: Option<u32>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub credentials: FileCredentialsConfig,
    pub timeouts: FileTimeoutsConfig,
    pub subagent: FileSubagentConfig,
    /// Keyed by provider name (`web-search` and `web_search` both work)
    pub providers: BTreeMap<String, FileProviderConfig>,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let timeouts = [
            ("health_check_secs", self.timeouts.health_check_secs),
            ("tool_call_secs", self.timeouts.tool_call_secs),
            ("default_tool_secs", self.timeouts.default_tool_secs),
            ("human_sync_secs", self.timeouts.human_sync_secs),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, v)| *v == Some(0)) {
            return Err(ConfigValidationError::ZeroTimeout(name));
        }

        if self.subagent.max_iterations == Some(0) {
            return Err(ConfigValidationError::ZeroIterations);
        }
        if self
            .subagent
            .model
            .as_deref()
            .is_some_and(|m| m.trim().is_empty())
        {
            return Err(ConfigValidationError::EmptyModel);
        }

        self.provider_configs().map(|_| ())
    }

    /// Built-in provider configurations with the file's overrides applied.
    pub fn provider_configs(&self) -> Result<Vec<ProviderConfig>, ConfigValidationError> {
        let mut overrides = BTreeMap::new();
        for (key, section) in &self.providers {
            let name: ProviderName = key
                .parse()
                .map_err(ConfigValidationError::UnknownProvider)?;
            overrides.insert(name, section);
        }

        ProviderName::ALL
            .into_iter()
            .map(|name| {
                let mut config = ProviderConfig::default_for(name);
                if let Some(section) = overrides.get(&name) {
                    apply_overrides(&mut config, section)?;
                }
                Ok(config)
            })
            .collect()
    }

    /// Timeouts and subagent limits, defaults filled in.
    pub fn execution_params(&self) -> ExecutionParams {
        let mut params = ExecutionParams::default();
        let t = &self.timeouts;
        if let Some(secs) = t.health_check_secs {
            params = params.with_health_check_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = t.tool_call_secs {
            params = params.with_tool_call_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = t.default_tool_secs {
            params = params.with_default_tool_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = t.human_sync_secs {
            params = params.with_human_sync_timeout(Duration::from_secs(secs));
        }
        if let Some(max) = self.subagent.max_iterations {
            params = params.with_subagent_max_iterations(max);
        }
        if let Some(model) = &self.subagent.model {
            params = params.with_subagent_model(model.trim());
        }
        params
    }
}

fn apply_overrides(
    config: &mut ProviderConfig,
    section: &FileProviderConfig,
) -> Result<(), ConfigValidationError> {
    let provider = config.name;
    if let Some(enabled) = section.enabled {
        config.enabled = enabled;
    }

    let wrong = |field: &'static str, kind: &'static str| ConfigValidationError::WrongTransport {
        provider,
        field,
        kind,
    };
    let empty = |field: &'static str| ConfigValidationError::EmptyValue { provider, field };

    match &mut config.transport {
        TransportConfig::Http {
            url,
            session_affinity,
        } => {
            if section.command.is_some() {
                return Err(wrong("command", "http"));
            }
            if section.args.is_some() {
                return Err(wrong("args", "http"));
            }
            if let Some(new_url) = &section.url {
                if new_url.trim().is_empty() {
                    return Err(empty("url"));
                }
                *url = new_url.trim().to_string();
            }
            if let Some(affinity) = section.session_affinity {
                *session_affinity = affinity;
            }
        }
        TransportConfig::Stdio {
            command,
            args,
            env,
            credential_env,
            runtime,
        } => {
            if section.url.is_some() {
                return Err(wrong("url", "stdio"));
            }
            if section.session_affinity.is_some() {
                return Err(wrong("session_affinity", "stdio"));
            }
            if let Some(new_command) = &section.command {
                if new_command.trim().is_empty() {
                    return Err(empty("command"));
                }
                *command = new_command.clone();
            }
            if let Some(new_args) = &section.args {
                *args = new_args.clone();
            }
            env.extend(section.env.iter().map(|(k, v)| (k.clone(), v.clone())));
            if let Some(var) = &section.credential_env {
                if var.trim().is_empty() {
                    return Err(empty("credential_env"));
                }
                *credential_env = var.clone();
            }
            if let (Some(major), Some(requirement)) = (section.min_runtime_major, runtime.as_mut()) {
                requirement.min_major = major;
            }
        }
    }
    Ok(())
}
