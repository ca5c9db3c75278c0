//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use stakechain_chain::ChainConfig;
use std::fs;
use std::path::Path;

mod block;
mod genesis;
mod simulate;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the genesis validator set and network parameters
    Genesis(genesis::GenesisArgs),
    /// Run an in-process chain with random activity
    Simulate(simulate::SimulateArgs),
    /// Browse persisted blocks
    Block(block::BlockArgs),
}

pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Genesis(args) => genesis::run(args),
        Commands::Simulate(args) => simulate::run(args),
        Commands::Block(args) => block::run(args),
    }
}

/// Load a JSON chain config; missing fields take their defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<ChainConfig> {
    let Some(path) = path else {
        return Ok(ChainConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "reward_interval": 5, "staking": { "min_delegation": 1 } }"#,
        )
        .unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.reward_interval, 5);
        assert_eq!(config.staking.min_delegation, 1);
        assert_eq!(config.staking.genesis_validators.len(), 3);
        assert_eq!(config.max_block_transactions, ChainConfig::default().max_block_transactions);
    }

    #[test]
    fn test_default_without_path() {
        assert_eq!(load_config(None).unwrap(), ChainConfig::default());
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        let err = load_config(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }
}
