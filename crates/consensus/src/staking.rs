//! Delegation, unstaking cool-down and reward distribution.
//!
//! The engine owns the validator registry plus every delegation and pending withdrawal, and
//! mutates account balances through a borrowed [`Ledger`]. All operations validate first and
//! mutate second, so an `Err` never leaves partial state behind.
//!
//! Value accounting: `ledger.total_value() + pending_total()` only changes through
//! [`StakingEngine::distribute_staking_rewards`], which mints exactly the block reward.

use crate::config::StakingConfig;
use crate::registry::{RegistryError, ValidatorRegistry};
use serde::{Deserialize, Serialize};
use stakechain_core::{
    hash_tagged, merkle_root, mul_div, Address, Amount, Hash, Ledger, LedgerError, Validator,
    ValidatorId,
};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StakingError {
    #[error("unknown validator: {0}")]
    UnknownValidator(ValidatorId),

    #[error("validator {0} is not active")]
    ValidatorInactive(ValidatorId),

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("stake below minimum delegation (minimum {minimum}, got {got})")]
    BelowMinimumStake { minimum: Amount, got: Amount },

    #[error("insufficient balance (required {required}, available {available})")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("insufficient staked amount (required {required}, staked {staked})")]
    InsufficientStaked { required: Amount, staked: Amount },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("staking invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, StakingError>;

/// Stake one delegator has placed with one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: Address,
    pub validator: ValidatorId,
    pub staked_amount: Amount,
}

/// Funds waiting out the unstaking cool-down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUnstake {
    pub delegator: Address,
    pub validator: ValidatorId,
    pub amount: Amount,
    /// Millisecond timestamp from which the funds may be withdrawn.
    pub unlock_at: u64,
}

impl PendingUnstake {
    pub fn is_mature(&self, now: u64) -> bool {
        now >= self.unlock_at
    }
}

/// Everything the chain knows about one address's staking position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingInfo {
    pub address: Address,
    pub balance: Amount,
    pub staked: Amount,
    pub delegations: Vec<Delegation>,
    pub pending_unstakes: Vec<PendingUnstake>,
    /// Pending amount already past its unlock time.
    pub withdrawable: Amount,
}

/// Where one distribution round's reward went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDistribution {
    pub validator: ValidatorId,
    pub reward_address: Address,
    pub block_reward: Amount,
    pub commission: Amount,
    /// Rounding remainder of the pro-rata split, paid to the reward address.
    pub dust: Amount,
    pub delegator_rewards: Vec<(Address, Amount)>,
}

impl RewardDistribution {
    /// Total credited; always equals `block_reward`.
    pub fn minted(&self) -> Amount {
        self.delegator_rewards
            .iter()
            .fold(self.commission + self.dust, |acc, (_, r)| acc + r)
    }

    /// Reward credited to `address` as a delegator (commission and dust excluded).
    pub fn reward_for(&self, address: &Address) -> Amount {
        self.delegator_rewards
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, r)| *r)
            .sum()
    }
}

type DelegationKey = (Address, ValidatorId);

/// Staking state machine.
#[derive(Debug, Clone)]
pub struct StakingEngine {
    config: StakingConfig,
    registry: ValidatorRegistry,
    delegations: BTreeMap<DelegationKey, Delegation>,
    pending: BTreeMap<DelegationKey, PendingUnstake>,
    total_minted: u128,
}

impl StakingEngine {
    /// Empty engine; call [`Self::bootstrap_genesis`] to seed the configured validators.
    pub fn new(config: StakingConfig) -> Self {
        let registry = ValidatorRegistry::new(config.max_validators);
        Self {
            config,
            registry,
            delegations: BTreeMap::new(),
            pending: BTreeMap::new(),
            total_minted: 0,
        }
    }

    /// Register the genesis validators and record their initial stake as self-delegations
    /// from their reward addresses.
    ///
    /// The whole set is applied or none of it: an oversized set, a duplicate id or a clashing
    /// ledger account leaves the engine and `ledger` unchanged.
    pub fn bootstrap_genesis(&mut self, ledger: &mut Ledger) -> Result<()> {
        let mut registry = self.registry.clone();
        let mut delegations = self.delegations.clone();
        let mut staged = ledger.clone();

        for genesis in &self.config.genesis_validators {
            let reward_address = genesis.reward_address();
            let mut validator =
                Validator::new(genesis.id.clone(), reward_address, genesis.commission_bps);
            validator.total_stake = genesis.initial_stake;
            registry.register(validator)?;

            if genesis.initial_stake > 0 {
                staged.seed_staked(reward_address, genesis.initial_stake)?;
                delegations.insert(
                    (reward_address, genesis.id.clone()),
                    Delegation {
                        delegator: reward_address,
                        validator: genesis.id.clone(),
                        staked_amount: genesis.initial_stake,
                    },
                );
            }
        }

        self.registry = registry;
        self.delegations = delegations;
        *ledger = staged;
        for genesis in &self.config.genesis_validators {
            info!(validator = %genesis.id, stake = genesis.initial_stake, "genesis validator");
        }
        Ok(())
    }

    /// Get the staking configuration.
    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    /// Get the validator registry.
    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Total reward minted since genesis.
    pub fn total_minted(&self) -> u128 {
        self.total_minted
    }

    /// Register a validator with no stake; stake only arrives through [`Self::stake`].
    pub fn register_validator(
        &mut self,
        id: ValidatorId,
        reward_address: Address,
        commission_bps: u16,
    ) -> Result<&Validator> {
        self.registry
            .register(Validator::new(id.clone(), reward_address, commission_bps))?;
        self.existing_validator(&id)
    }

    /// Activate or deactivate a validator.
    pub fn set_validator_active(&mut self, id: &ValidatorId, active: bool) -> Result<()> {
        Ok(self.registry.set_active(id, active)?)
    }

    /// Record that `id` produced the block at `block_index`.
    pub fn update_validator_after_block(&mut self, id: &ValidatorId, block_index: u64) -> Result<&Validator> {
        Ok(self.registry.update_validator_after_block(id, block_index)?)
    }

    /// Lock `amount` of `delegator`'s balance with `validator_id`.
    pub fn stake(
        &mut self,
        ledger: &mut Ledger,
        delegator: Address,
        validator_id: &ValidatorId,
        amount: Amount,
    ) -> Result<&Delegation> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        let validator = self.existing_validator(validator_id)?;
        if !validator.active {
            return Err(StakingError::ValidatorInactive(validator_id.clone()));
        }
        if amount < self.config.min_delegation {
            return Err(StakingError::BelowMinimumStake {
                minimum: self.config.min_delegation,
                got: amount,
            });
        }
        let available = ledger.balance_of(&delegator);
        if available < amount {
            return Err(StakingError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        if validator.total_stake.checked_add(amount).is_none() {
            return Err(RegistryError::StakeOverflow(validator_id.clone()).into());
        }

        ledger.lock_stake(delegator, amount)?;
        self.registry.add_stake(validator_id, amount)?;
        let delegation = self
            .delegations
            .entry((delegator, validator_id.clone()))
            .or_insert_with(|| Delegation {
                delegator,
                validator: validator_id.clone(),
                staked_amount: 0,
            });
        delegation.staked_amount += amount;

        debug!(%delegator, validator = %validator_id, amount, "stake");
        Ok(&*delegation)
    }

    /// Withdraw `amount` from a delegation into a pending unstake that matures after the
    /// configured cool-down. A second unstake towards the same validator adds to the pending
    /// amount and restarts the cool-down.
    pub fn unstake(
        &mut self,
        ledger: &mut Ledger,
        delegator: Address,
        validator_id: &ValidatorId,
        amount: Amount,
        now: u64,
    ) -> Result<&PendingUnstake> {
        if amount == 0 {
            return Err(StakingError::InvalidAmount);
        }
        self.existing_validator(validator_id)?;
        let key = (delegator, validator_id.clone());
        let staked = self.delegations.get(&key).map_or(0, |d| d.staked_amount);
        if staked < amount {
            return Err(StakingError::InsufficientStaked {
                required: amount,
                staked,
            });
        }
        let already_pending = self.pending.get(&key).map_or(0, |p| p.amount);
        if already_pending.checked_add(amount).is_none() {
            return Err(LedgerError::Overflow(delegator).into());
        }

        ledger.release_stake(delegator, amount)?;
        self.registry.remove_stake(validator_id, amount)?;
        if let Some(delegation) = self.delegations.get_mut(&key) {
            delegation.staked_amount -= amount;
        }

        let unlock_at = now.saturating_add(self.config.unstaking_period_ms);
        let pending = self.pending.entry(key).or_insert_with(|| PendingUnstake {
            delegator,
            validator: validator_id.clone(),
            amount: 0,
            unlock_at,
        });
        pending.amount += amount;
        pending.unlock_at = unlock_at;

        debug!(%delegator, validator = %validator_id, amount, unlock_at, "unstake scheduled");
        Ok(&*pending)
    }

    /// Credit every matured pending unstake of `delegator` to its balance.
    ///
    /// Returns the amount released; 0 when nothing has matured. Repeated calls never pay twice.
    pub fn complete_unstaking(&mut self, ledger: &mut Ledger, delegator: Address, now: u64) -> Result<Amount> {
        let matured: Vec<DelegationKey> = self
            .pending
            .iter()
            .filter(|((addr, _), p)| *addr == delegator && p.is_mature(now))
            .map(|(key, _)| key.clone())
            .collect();
        if matured.is_empty() {
            return Ok(0);
        }

        let released = matured
            .iter()
            .try_fold(0 as Amount, |acc, key| acc.checked_add(self.pending[key].amount))
            .ok_or(LedgerError::Overflow(delegator))?;
        ledger.credit(delegator, released)?;
        for key in &matured {
            self.pending.remove(key);
        }

        debug!(%delegator, released, "unstaking completed");
        Ok(released)
    }

    /// Mint `block_reward` for `validator_id`: commission to the validator's reward address,
    /// the rest split over its delegations in proportion to stake. Credited as liquid balance.
    pub fn distribute_staking_rewards(
        &mut self,
        ledger: &mut Ledger,
        block_reward: Amount,
        validator_id: &ValidatorId,
    ) -> Result<RewardDistribution> {
        let validator = self.existing_validator(validator_id)?;
        let reward_address = validator.reward_address;
        let total_stake = validator.total_stake;
        let commission = validator.commission_on(block_reward);
        let remainder = block_reward - commission;

        let delegator_rewards: Vec<(Address, Amount)> = if total_stake == 0 {
            Vec::new()
        } else {
            self.delegations
                .values()
                .filter(|d| d.validator == *validator_id && d.staked_amount > 0)
                .map(|d| {
                    let share = mul_div(remainder, d.staked_amount as u128, total_stake as u128);
                    (d.delegator, share)
                })
                .filter(|(_, share)| *share > 0)
                .collect()
        };
        let distributed: Amount = delegator_rewards.iter().map(|(_, r)| *r).sum();
        let dust = remainder - distributed;

        // Aggregate per address so overflow is checked before anything is credited.
        let mut credits: BTreeMap<Address, Amount> = BTreeMap::new();
        *credits.entry(reward_address).or_default() += commission + dust;
        for (address, reward) in &delegator_rewards {
            *credits.entry(*address).or_default() += *reward;
        }
        for (address, amount) in &credits {
            if ledger.balance_of(address).checked_add(*amount).is_none() {
                return Err(LedgerError::Overflow(*address).into());
            }
        }
        for (address, amount) in credits {
            if amount > 0 {
                ledger.credit(address, amount)?;
            }
        }
        self.total_minted += block_reward as u128;

        info!(
            validator = %validator_id,
            block_reward,
            commission,
            delegators = delegator_rewards.len(),
            "distributed staking rewards"
        );
        Ok(RewardDistribution {
            validator: validator_id.clone(),
            reward_address,
            block_reward,
            commission,
            dust,
            delegator_rewards,
        })
    }

    /// Get the delegation of `delegator` to `validator_id`.
    pub fn delegation(&self, delegator: &Address, validator_id: &ValidatorId) -> Option<&Delegation> {
        self.delegations.get(&(*delegator, validator_id.clone()))
    }

    /// Delegations made by `delegator`.
    pub fn delegations_of(&self, delegator: &Address) -> Vec<&Delegation> {
        self.delegations
            .values()
            .filter(|d| d.delegator == *delegator)
            .collect()
    }

    /// Delegations held by `validator_id`.
    pub fn delegations_to(&self, validator_id: &ValidatorId) -> Vec<&Delegation> {
        self.delegations
            .values()
            .filter(|d| d.validator == *validator_id)
            .collect()
    }

    /// Pending unstakes of `delegator`.
    pub fn pending_unstakes_of(&self, delegator: &Address) -> Vec<&PendingUnstake> {
        self.pending
            .values()
            .filter(|p| p.delegator == *delegator)
            .collect()
    }

    /// Value held in pending unstakes across all delegators.
    pub fn pending_total(&self) -> u128 {
        self.pending.values().map(|p| p.amount as u128).sum()
    }

    /// Balance, stake and unstaking summary of `address` at `now`.
    pub fn get_staking_info(&self, ledger: &Ledger, address: &Address, now: u64) -> StakingInfo {
        let pending_unstakes: Vec<PendingUnstake> =
            self.pending_unstakes_of(address).into_iter().cloned().collect();
        let withdrawable = pending_unstakes
            .iter()
            .filter(|p| p.is_mature(now))
            .fold(0 as Amount, |acc, p| acc.saturating_add(p.amount));
        StakingInfo {
            address: *address,
            balance: ledger.balance_of(address),
            staked: ledger.staked_of(address),
            delegations: self.delegations_of(address).into_iter().cloned().collect(),
            pending_unstakes,
            withdrawable,
        }
    }

    /// Commitment over validators, delegations and pending unstakes.
    pub fn state_root(&self) -> Hash {
        let delegation_leaves: Vec<Hash> = self
            .delegations
            .values()
            .map(|d| {
                let encoded = bincode::serialize(d).expect("serialization should not fail");
                hash_tagged("stakechain/delegation", &[&encoded])
            })
            .collect();
        let pending_leaves: Vec<Hash> = self
            .pending
            .values()
            .map(|p| {
                let encoded = bincode::serialize(p).expect("serialization should not fail");
                hash_tagged("stakechain/pending", &[&encoded])
            })
            .collect();
        hash_tagged(
            "stakechain/staking",
            &[
                self.registry.state_root().as_ref(),
                merkle_root(&delegation_leaves).as_ref(),
                merkle_root(&pending_leaves).as_ref(),
            ],
        )
    }

    /// Cross-check validator totals against delegations and account stakes against delegations.
    pub fn check_invariants(&self, ledger: &Ledger) -> Result<()> {
        for validator in self.registry.validators() {
            let delegated: u128 = self
                .delegations_to(&validator.id)
                .iter()
                .map(|d| d.staked_amount as u128)
                .sum();
            if delegated != validator.total_stake as u128 {
                return Err(StakingError::InvariantViolation(format!(
                    "validator {} total stake {} != delegated {}",
                    validator.id, validator.total_stake, delegated
                )));
            }
        }

        let mut per_account: BTreeMap<Address, u128> = BTreeMap::new();
        for d in self.delegations.values() {
            *per_account.entry(d.delegator).or_default() += d.staked_amount as u128;
        }
        for account in ledger.accounts() {
            let delegated = per_account.get(&account.address).copied().unwrap_or(0);
            if delegated != account.staked as u128 {
                return Err(StakingError::InvariantViolation(format!(
                    "account {} staked {} != delegated {}",
                    account.address, account.staked, delegated
                )));
            }
        }
        Ok(())
    }

    fn existing_validator(&self, id: &ValidatorId) -> Result<&Validator> {
        self.registry
            .get_validator(id)
            .ok_or_else(|| StakingError::UnknownValidator(id.clone()))
    }
}
