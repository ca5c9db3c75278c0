//! Validator registry.
//!
//! Validators are kept in id order; every listing and the selection snapshot rely on it.

use crate::selection::{select_validator, SelectionError};
use stakechain_core::{hash_tagged, merkle_root, Amount, Hash, Validator, ValidatorId, BPS_DENOMINATOR};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown validator: {0}")]
    UnknownValidator(ValidatorId),

    #[error("validator already registered: {0}")]
    AlreadyRegistered(ValidatorId),

    #[error("validator set is full (max {0})")]
    SetFull(usize),

    #[error("commission of {0} bps exceeds 100%")]
    InvalidCommission(u16),

    #[error("validator id must not be empty")]
    EmptyId,

    #[error("stake accounting overflow for {0}")]
    StakeOverflow(ValidatorId),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Validator id → validator.
#[derive(Debug, Clone)]
pub struct ValidatorRegistry {
    validators: BTreeMap<ValidatorId, Validator>,
    max_validators: usize,
}

impl ValidatorRegistry {
    /// Create an empty registry holding at most `max_validators`.
    pub fn new(max_validators: usize) -> Self {
        Self {
            validators: BTreeMap::new(),
            max_validators,
        }
    }

    /// Add a validator.
    pub fn register(&mut self, validator: Validator) -> Result<()> {
        if validator.id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if validator.commission_bps > BPS_DENOMINATOR {
            return Err(RegistryError::InvalidCommission(validator.commission_bps));
        }
        if self.validators.contains_key(&validator.id) {
            return Err(RegistryError::AlreadyRegistered(validator.id));
        }
        if self.validators.len() >= self.max_validators {
            return Err(RegistryError::SetFull(self.max_validators));
        }
        debug!(validator = %validator.id, commission_bps = validator.commission_bps, "registered validator");
        self.validators.insert(validator.id.clone(), validator);
        Ok(())
    }

    /// Get a validator by id.
    pub fn get_validator(&self, id: &ValidatorId) -> Option<&Validator> {
        self.validators.get(id)
    }

    /// Check if a validator is registered.
    pub fn contains(&self, id: &ValidatorId) -> bool {
        self.validators.contains_key(id)
    }

    /// All validators in id order.
    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    /// Active validators in id order.
    pub fn get_active_validators(&self) -> Vec<&Validator> {
        self.validators.values().filter(|v| v.active).collect()
    }

    /// Number of registered validators.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Check if no validator is registered.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Capacity of the set.
    pub fn max_validators(&self) -> usize {
        self.max_validators
    }

    /// Number of active validators.
    pub fn active_count(&self) -> usize {
        self.validators.values().filter(|v| v.active).count()
    }

    /// Sum of every validator's stake.
    pub fn total_stake(&self) -> u128 {
        self.validators.values().map(|v| v.total_stake as u128).sum()
    }

    /// Sum of the active validators' stake.
    pub fn active_stake(&self) -> u128 {
        self.validators
            .values()
            .filter(|v| v.active)
            .map(|v| v.total_stake as u128)
            .sum()
    }

    /// Record that `id` produced the block at `block_index`.
    pub fn update_validator_after_block(&mut self, id: &ValidatorId, block_index: u64) -> Result<&Validator> {
        let validator = self.get_mut(id)?;
        validator.blocks_produced = validator.blocks_produced.saturating_add(1);
        validator.last_active_block = block_index;
        Ok(&*validator)
    }

    /// Activate or deactivate. Inactive validators keep their stake but are never selected.
    pub fn set_active(&mut self, id: &ValidatorId, active: bool) -> Result<()> {
        let validator = self.get_mut(id)?;
        if validator.active != active {
            validator.active = active;
            debug!(validator = %id, active, "validator status changed");
        }
        Ok(())
    }

    /// Stake-weighted pick among active validators.
    pub fn select_validator(&self, seed: u64) -> std::result::Result<&Validator, SelectionError> {
        select_validator(self.validators.values(), seed)
    }

    /// Merkle commitment over all validator records in id order.
    pub fn state_root(&self) -> Hash {
        let leaves: Vec<Hash> = self
            .validators
            .values()
            .map(|v| hash_tagged("stakechain/validator", &[&v.commitment_bytes()]))
            .collect();
        merkle_root(&leaves)
    }

    /// Raise a validator's stake, refusing overflow.
    pub(crate) fn add_stake(&mut self, id: &ValidatorId, amount: Amount) -> Result<()> {
        let validator = self.get_mut(id)?;
        validator.total_stake = validator
            .total_stake
            .checked_add(amount)
            .ok_or_else(|| RegistryError::StakeOverflow(id.clone()))?;
        Ok(())
    }

    /// Lower a validator's stake.
    pub(crate) fn remove_stake(&mut self, id: &ValidatorId, amount: Amount) -> Result<()> {
        let validator = self.get_mut(id)?;
        validator.total_stake = validator
            .total_stake
            .checked_sub(amount)
            .ok_or_else(|| RegistryError::StakeOverflow(id.clone()))?;
        Ok(())
    }

    fn get_mut(&mut self, id: &ValidatorId) -> Result<&mut Validator> {
        self.validators
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownValidator(id.clone()))
    }
}
