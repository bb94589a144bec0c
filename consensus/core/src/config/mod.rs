//! Network policy parameters of the consensus engine.

pub mod genesis;

use crate::constants::{DEFAULT_GHOSTDAG_K, SOMPI_PER_JIO};
use crate::KType;
use genesis::GenesisBlock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub ghostdag_k: KType,
    /// Depth of the finality point behind the virtual selected parent, in chain blocks
    pub finality_depth: u64,
    pub max_block_parents: usize,
    pub mergeset_size_limit: u64,
    /// Blue score distance after which coinbase outputs become spendable
    pub coinbase_maturity: u64,
    pub max_block_mass: u64,
    pub max_tx_inputs: usize,
    pub max_tx_outputs: usize,
    pub mass_per_tx_byte: u64,
    pub mass_per_script_pub_key_byte: u64,
    pub mass_per_sig_op: u64,
    pub past_median_time_window: usize,
    pub max_coinbase_payload_len: usize,
    pub base_subsidy: u64,
    pub skip_proof_of_work: bool,
    /// Threads verifying input scripts of a single transaction; 0 uses one per CPU
    pub script_verification_workers: usize,
    pub sig_cache_size: usize,
    pub notification_channel_capacity: usize,
    pub max_commit_retries: usize,
    /// Kept last: it serializes as a toml table
    pub genesis: GenesisBlock,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            ghostdag_k: DEFAULT_GHOSTDAG_K,
            finality_depth: 86_400,
            max_block_parents: 10,
            mergeset_size_limit: DEFAULT_GHOSTDAG_K as u64 * 10,
            coinbase_maturity: 100,
            max_block_mass: 500_000,
            max_tx_inputs: 1_000,
            max_tx_outputs: 1_000,
            mass_per_tx_byte: 1,
            mass_per_script_pub_key_byte: 10,
            mass_per_sig_op: 1_000,
            past_median_time_window: 11,
            max_coinbase_payload_len: 204,
            base_subsidy: 50 * SOMPI_PER_JIO,
            skip_proof_of_work: false,
            script_verification_workers: 0,
            sig_cache_size: 10_000,
            notification_channel_capacity: 1_024,
            max_commit_retries: 8,
            genesis: GenesisBlock::default(),
        }
    }
}

impl ConsensusConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ConsensusConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_block_parents == 0 {
            return Err(ConfigError::Invalid("max_block_parents must be positive".into()));
        }
        if self.past_median_time_window == 0 {
            return Err(ConfigError::Invalid("past_median_time_window must be positive".into()));
        }
        if self.mergeset_size_limit <= self.ghostdag_k as u64 {
            return Err(ConfigError::Invalid("mergeset_size_limit must exceed ghostdag_k".into()));
        }
        if self.max_commit_retries == 0 {
            return Err(ConfigError::Invalid("max_commit_retries must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ConsensusConfig::from_toml_str("ghostdag_k = 3\nfinality_depth = 20\nmergeset_size_limit = 30\n").unwrap();
        assert_eq!(config.ghostdag_k, 3);
        assert_eq!(config.finality_depth, 20);
        assert_eq!(config.past_median_time_window, 11);
        assert_eq!(config.genesis, GenesisBlock::default());
    }

    #[test]
    fn toml_round_trip() {
        let config = ConsensusConfig { skip_proof_of_work: true, coinbase_maturity: 7, ..Default::default() };
        let text = config.to_toml_string().unwrap();
        assert_eq!(ConsensusConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(ConsensusConfig::from_toml_str("max_block_parents = 0"), Err(ConfigError::Invalid(_))));
        assert!(matches!(ConsensusConfig::from_toml_str("ghostdag_k = \"x\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = ConsensusConfig::load(Path::new("/nonexistent/consensus.toml")).unwrap();
        assert_eq!(config, ConsensusConfig::default());
    }
}
