//! Configuration for the bridge core
//!
//! Loads per-chain node settings from TOML files with environment variable
//! substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default probe interval when a chain does not override it
pub const DEFAULT_PROBE_INTERVAL_MS: u64 = 15_000;

/// Default maximum height gap before a node is treated as stale
pub const DEFAULT_MAX_HEIGHT_GAP: u64 = 100;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub chains: HashMap<String, ChainConfig>,
}

/// Per-chain node pool and wallet settings
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_urls: Vec<String>,
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    #[serde(default = "default_max_height_gap")]
    pub max_height_gap: u64,
    /// Hard per-chain ceiling on transaction gas limits, if any
    pub max_gas_limit: Option<u64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_probe_interval_ms() -> u64 {
    DEFAULT_PROBE_INTERVAL_MS
}

fn default_max_height_gap() -> u64 {
    DEFAULT_MAX_HEIGHT_GAP
}

fn default_enabled() -> bool {
    true
}

impl ChainConfig {
    /// Probe interval as a duration
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }
}

impl Settings {
    /// Load settings from the configuration file
    pub fn load() -> Result<Self> {
        let config_path = env::var("BRIDGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific path
    pub fn load_from(config_path: &PathBuf) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        for (name, chain) in &self.chains {
            if chain.enabled && chain.rpc_urls.is_empty() {
                anyhow::bail!("Chain {} has no RPC URLs configured", name);
            }
        }

        Ok(())
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        self.chains.iter().filter(|(_, c)| c.enabled).collect()
    }

    /// Get chain config by chain ID
    pub fn get_chain_by_id(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.values().find(|c| c.chain_id == chain_id)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_RPC_KEY", "abc123");
        let input = "rpc_urls = [\"https://rpc.example.com/${TEST_RPC_KEY}\"]";
        let result = substitute_env_vars(input);
        assert_eq!(result, "rpc_urls = [\"https://rpc.example.com/abc123\"]");
    }

    #[test]
    fn test_load_chain_settings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [chains.sepolia]
            chain_id = 11155111
            name = "sepolia"
            rpc_urls = ["https://rpc-a.example.com", "https://rpc-b.example.com"]
            max_height_gap = 5
            max_gas_limit = 8000000
            "#
        )
        .unwrap();

        let settings = Settings::load_from(&file.path().to_path_buf()).unwrap();
        let chain = settings.get_chain_by_id(11155111).unwrap();
        assert_eq!(chain.rpc_urls.len(), 2);
        assert_eq!(chain.max_height_gap, 5);
        assert_eq!(chain.max_gas_limit, Some(8_000_000));
        // Defaults apply for fields the file omits
        assert_eq!(chain.probe_interval_ms, DEFAULT_PROBE_INTERVAL_MS);
        assert!(chain.enabled);
    }

    #[test]
    fn test_rejects_chain_without_rpc_urls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [chains.empty]
            chain_id = 1
            name = "empty"
            rpc_urls = []
            "#
        )
        .unwrap();

        assert!(Settings::load_from(&file.path().to_path_buf()).is_err());
    }
}
