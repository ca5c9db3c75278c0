//! Staking parameters and the genesis validator set.

use serde::{Deserialize, Serialize};
use stakechain_core::{tokens, Address, Amount, ValidatorId};

/// Seven days.
pub const DEFAULT_UNSTAKING_PERIOD_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// A validator present at chain bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisValidator {
    pub id: ValidatorId,
    /// Commission in basis points.
    pub commission_bps: u16,
    /// Stake self-delegated from the validator's reward address.
    pub initial_stake: Amount,
}

impl GenesisValidator {
    pub fn new(id: &str, commission_bps: u16, initial_stake: Amount) -> Self {
        Self {
            id: ValidatorId::new(id),
            commission_bps,
            initial_stake,
        }
    }

    /// Reward address derived from the id.
    pub fn reward_address(&self) -> Address {
        Address::derive(self.id.as_str())
    }
}

/// Network-wide staking parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Smallest amount accepted by a single `stake`.
    pub min_delegation: Amount,
    /// Upper bound on registered validators.
    pub max_validators: usize,
    /// Nominal annual reward rate in basis points. Reported in network stats.
    pub base_reward_rate_bps: u16,
    /// Cool-down between `unstake` and withdrawal.
    pub unstaking_period_ms: u64,
    /// Newly minted reward per distribution round.
    pub block_reward: Amount,
    pub genesis_validators: Vec<GenesisValidator>,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            min_delegation: tokens(100),
            max_validators: 21,
            base_reward_rate_bps: 500,
            unstaking_period_ms: DEFAULT_UNSTAKING_PERIOD_MS,
            block_reward: tokens(10),
            genesis_validators: vec![
                GenesisValidator::new("validator-1", 500, tokens(1_000_000)),
                GenesisValidator::new("validator-2", 400, tokens(1_000_000)),
                GenesisValidator::new("validator-3", 600, tokens(1_000_000)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_genesis_set() {
        let config = StakingConfig::default();
        let commissions: Vec<u16> = config
            .genesis_validators
            .iter()
            .map(|v| v.commission_bps)
            .collect();
        assert_eq!(commissions, vec![500, 400, 600]);
        assert!(config
            .genesis_validators
            .iter()
            .all(|v| v.initial_stake == tokens(1_000_000)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StakingConfig =
            serde_json::from_str(r#"{ "unstaking_period_ms": 1000 }"#).unwrap();
        assert_eq!(config.unstaking_period_ms, 1000);
        assert_eq!(config.min_delegation, tokens(100));
        assert_eq!(config.genesis_validators.len(), 3);
    }
}
