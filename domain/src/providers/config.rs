//! Capability-provider configuration types.
//!
//! The provider set is fixed: one stdio provider (`vision`) and three HTTP
//! providers (`web-search`, `web-reader`, `zread`). Each has a built-in
//! default transport that configuration files may override.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of a configured capability provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderName {
    Vision,
    WebSearch,
    WebReader,
    Zread,
}

impl ProviderName {
    pub const ALL: [ProviderName; 4] = [
        ProviderName::Vision,
        ProviderName::WebSearch,
        ProviderName::WebReader,
        ProviderName::Zread,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Vision => "vision",
            ProviderName::WebSearch => "web-search",
            ProviderName::WebReader => "web-reader",
            ProviderName::Zread => "zread",
        }
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        ProviderName::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "Unknown provider '{}'. Available: vision, web-search, web-reader, zread",
                    s
                )
            })
    }
}

/// Runtime whose major version must meet a minimum (e.g. `node >= 18`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRequirement {
    pub program: String,
    pub min_major: u32,
}

/// Transport-specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    /// One process per call; a JSON-RPC request line on stdin, response on stdout
    Stdio {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        /// Environment variable that receives the API key
        credential_env: String,
        runtime: Option<RuntimeRequirement>,
    },
    /// JSON-RPC over HTTP POST, plain JSON or event-stream framed
    Http {
        url: String,
        /// Resend the server-issued session id and refresh it on expiry
        session_affinity: bool,
    },
}

impl TransportConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Stdio { .. } => "stdio",
            TransportConfig::Http { .. } => "http",
        }
    }
}

pub const DEFAULT_API_BASE: &str = "https://api.z.ai/api/mcp";

/// Static configuration of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: ProviderName,
    pub enabled: bool,
    pub transport: TransportConfig,
}

impl ProviderConfig {
    /// Built-in configuration for `name`.
    pub fn default_for(name: ProviderName) -> Self {
        let transport = match name {
            ProviderName::Vision => TransportConfig::Stdio {
                command: "npx".to_string(),
                args: vec!["-y".to_string(), "@z_ai/mcp-server".to_string()],
                env: BTreeMap::from([("Z_AI_MODE".to_string(), "ZAI".to_string())]),
                credential_env: "Z_AI_API_KEY".to_string(),
                runtime: Some(RuntimeRequirement {
                    program: "node".to_string(),
                    min_major: 18,
                }),
            },
            ProviderName::WebSearch => http(format!("{DEFAULT_API_BASE}/web_search_prime/mcp")),
            ProviderName::WebReader => http(format!("{DEFAULT_API_BASE}/web_reader/mcp")),
            ProviderName::Zread => http(format!("{DEFAULT_API_BASE}/zread/mcp")),
        };

        Self {
            name,
            enabled: true,
            transport,
        }
    }

    /// Built-in configuration for every provider, in [`ProviderName::ALL`] order.
    pub fn defaults() -> Vec<Self> {
        ProviderName::ALL.into_iter().map(Self::default_for).collect()
    }

    pub fn session_affinity(&self) -> bool {
        matches!(
            self.transport,
            TransportConfig::Http {
                session_affinity: true,
                ..
            }
        )
    }
}

fn http(url: String) -> TransportConfig {
    TransportConfig::Http {
        url,
        session_affinity: true,
    }
}
