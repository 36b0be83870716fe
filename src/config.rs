//! Ledger configuration, loadable from TOML

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_NETWORK_ID, MAX_SCRIPT_LENGTH};
use crate::error::{LedgerError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Network byte prefixed to public addresses
    #[serde(default = "default_network_id")]
    pub network_id: u8,

    /// Largest script body accepted on submission; never above the wire limit
    #[serde(default = "default_max_script_length")]
    pub max_script_length: usize,
}

fn default_network_id() -> u8 {
    DEFAULT_NETWORK_ID
}

fn default_max_script_length() -> usize {
    MAX_SCRIPT_LENGTH
}

impl LedgerConfig {
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LedgerError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: LedgerConfig = toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))?;
        if config.max_script_length > MAX_SCRIPT_LENGTH {
            return Err(LedgerError::Config(format!(
                "max_script_length {} exceeds {}",
                config.max_script_length, MAX_SCRIPT_LENGTH
            )));
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LedgerError::Config(e.to_string()))
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            network_id: default_network_id(),
            max_script_length: default_max_script_length(),
        }
    }
}
