//! Account state.

use crate::amount::Amount;
use crate::crypto::Address;
use serde::{Deserialize, Serialize};

/// A ledger account.
///
/// `balance` is spendable; `staked` is the sum of this account's live delegations.
/// Funds waiting out an unstaking cool-down are in neither field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    pub balance: Amount,
    pub staked: Amount,
}

impl Account {
    pub fn new(address: Address, balance: Amount) -> Self {
        Self {
            address,
            balance,
            staked: 0,
        }
    }

    /// Balance plus stake, widened so summing many accounts cannot overflow.
    pub fn total(&self) -> u128 {
        self.balance as u128 + self.staked as u128
    }

    pub fn has_balance(&self, amount: Amount) -> bool {
        self.balance >= amount
    }

    /// Canonical bytes committed to by the ledger state root.
    pub fn commitment_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(36);
        bytes.extend_from_slice(&self.address.0);
        bytes.extend_from_slice(&self.balance.to_le_bytes());
        bytes.extend_from_slice(&self.staked.to_le_bytes());
        bytes
    }
}
