//! Agent configuration, loaded from TOML.

use serde::Deserialize;

use diag_elm327::SessionConfig;

/// Top-level configuration for the diagnostic agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// How to reach the adapter.
    pub adapter: AdapterConfig,
    /// Session timing. Every field has a default.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Physical link to the ELM327 adapter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AdapterConfig {
    /// Wi-Fi adapters expose a raw TCP socket (usually port 35000).
    Tcp { address: String },
    /// USB or Bluetooth SPP adapters show up as a serial device.
    Serial {
        path: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
}

fn default_baud_rate() -> u32 {
    38400
}

impl AdapterConfig {
    /// Human-readable endpoint for logs.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Tcp { address } => format!("tcp://{address}"),
            Self::Serial { path, baud_rate } => format!("{path}@{baud_rate}"),
        }
    }
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
