//! Validator identity and bookkeeping record.

use crate::amount::{mul_div, Amount};
use crate::crypto::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Human-readable validator identifier, e.g. `validator-1`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorId(String);

impl ValidatorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorId({})", self.0)
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ValidatorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A block-producing validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub id: ValidatorId,
    /// Account credited with commission (and the validator's own delegation rewards).
    pub reward_address: Address,
    /// Commission in basis points (500 = 5%).
    pub commission_bps: u16,
    /// Sum of all delegations to this validator.
    pub total_stake: Amount,
    pub active: bool,
    pub blocks_produced: u64,
    pub last_active_block: u64,
}

impl Validator {
    pub fn new(id: ValidatorId, reward_address: Address, commission_bps: u16) -> Self {
        Self {
            id,
            reward_address,
            commission_bps,
            total_stake: 0,
            active: true,
            blocks_produced: 0,
            last_active_block: 0,
        }
    }

    /// Commission as a fraction in `[0, 1]`, for display.
    pub fn commission_rate(&self) -> f64 {
        f64::from(self.commission_bps) / f64::from(BPS_DENOMINATOR)
    }

    /// Commission owed on `reward`, rounded down.
    pub fn commission_on(&self, reward: Amount) -> Amount {
        mul_div(
            reward,
            u128::from(self.commission_bps),
            u128::from(BPS_DENOMINATOR),
        )
    }

    /// Eligible for selection: active with non-zero weight.
    pub fn is_eligible(&self) -> bool {
        self.active && self.total_stake > 0
    }

    /// Canonical bytes committed to by the validator state root.
    pub fn commitment_bytes(&self) -> Vec<u8> {
        let id = self.id.as_str().as_bytes();
        let mut bytes = Vec::with_capacity(id.len() + 64);
        bytes.extend_from_slice(&(id.len() as u32).to_le_bytes());
        bytes.extend_from_slice(id);
        bytes.extend_from_slice(&self.reward_address.0);
        bytes.extend_from_slice(&self.commission_bps.to_le_bytes());
        bytes.extend_from_slice(&self.total_stake.to_le_bytes());
        bytes.push(u8::from(self.active));
        bytes.extend_from_slice(&self.blocks_produced.to_le_bytes());
        bytes.extend_from_slice(&self.last_active_block.to_le_bytes());
        bytes
    }
}
