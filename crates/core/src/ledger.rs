//! In-memory account store.
//!
//! Every mutating method is check-then-apply: on error nothing has changed.

use crate::account::Account;
use crate::amount::Amount;
use crate::crypto::Address;
use crate::hash::{hash_tagged, Hash};
use crate::merkle::merkle_root;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("account {0} already exists")]
    AccountExists(Address),

    #[error("insufficient balance for {address}: required {required}, available {available}")]
    InsufficientBalance {
        address: Address,
        required: Amount,
        available: Amount,
    },

    #[error("insufficient stake for {address}: required {required}, staked {staked}")]
    InsufficientStaked {
        address: Address,
        required: Amount,
        staked: Amount,
    },

    #[error("balance overflow for {0}")]
    Overflow(Address),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Address → account map with deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    accounts: BTreeMap<Address, Account>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if no account exists yet.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Insert a fresh account with `staked = 0`.
    pub fn create_account(&mut self, address: Address, balance: Amount) -> Result<&Account> {
        if self.accounts.contains_key(&address) {
            return Err(LedgerError::AccountExists(address));
        }
        Ok(self
            .accounts
            .entry(address)
            .or_insert_with(|| Account::new(address, balance)))
    }

    /// Get an account by address.
    pub fn get_account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Spendable balance; unknown addresses hold nothing.
    pub fn balance_of(&self, address: &Address) -> Amount {
        self.accounts.get(address).map_or(0, |a| a.balance)
    }

    /// Locked stake of an address.
    pub fn staked_of(&self, address: &Address) -> Amount {
        self.accounts.get(address).map_or(0, |a| a.staked)
    }

    /// All accounts in address order.
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Apply a signed delta to the balance and return the new balance.
    ///
    /// A result below zero is refused with `InsufficientBalance` and the balance is left
    /// untouched. An unknown address behaves as a zero-balance account and is created
    /// only if the delta is accepted.
    pub fn update_account_balance(&mut self, address: Address, delta: i128) -> Result<Amount> {
        let current = self.balance_of(&address);
        let next = (current as i128)
            .checked_add(delta)
            .ok_or(LedgerError::Overflow(address))?;
        if next < 0 {
            return Err(LedgerError::InsufficientBalance {
                address,
                required: delta.unsigned_abs().min(Amount::MAX as u128) as Amount,
                available: current,
            });
        }
        let next = Amount::try_from(next).map_err(|_| LedgerError::Overflow(address))?;
        self.entry(address).balance = next;
        Ok(next)
    }

    /// Add to the balance, creating the account if needed.
    pub fn credit(&mut self, address: Address, amount: Amount) -> Result<Amount> {
        let current = self.balance_of(&address);
        let next = current
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(address))?;
        self.entry(address).balance = next;
        Ok(next)
    }

    /// Remove from the balance.
    pub fn debit(&mut self, address: Address, amount: Amount) -> Result<Amount> {
        let available = self.balance_of(&address);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                address,
                required: amount,
                available,
            });
        }
        let account = self.entry(address);
        account.balance -= amount;
        Ok(account.balance)
    }

    /// Move `amount` from balance to staked.
    pub fn lock_stake(&mut self, address: Address, amount: Amount) -> Result<()> {
        let account = self
            .accounts
            .get(&address)
            .ok_or(LedgerError::InsufficientBalance {
                address,
                required: amount,
                available: 0,
            })?;
        if account.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                address,
                required: amount,
                available: account.balance,
            });
        }
        let staked = account
            .staked
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(address))?;
        let account = self.entry(address);
        account.balance -= amount;
        account.staked = staked;
        Ok(())
    }

    /// Remove `amount` from staked without crediting the balance.
    ///
    /// The caller owns the released funds until it credits them back (e.g. after a cool-down).
    pub fn release_stake(&mut self, address: Address, amount: Amount) -> Result<()> {
        let staked = self.staked_of(&address);
        if staked < amount {
            return Err(LedgerError::InsufficientStaked {
                address,
                required: amount,
                staked,
            });
        }
        self.entry(address).staked -= amount;
        Ok(())
    }

    /// Seed an account that starts with locked stake (genesis validators).
    pub fn seed_staked(&mut self, address: Address, amount: Amount) -> Result<()> {
        let staked = self.staked_of(&address);
        let next = staked
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(address))?;
        self.entry(address).staked = next;
        Ok(())
    }

    /// Sum of balance and staked across every account.
    pub fn total_value(&self) -> u128 {
        self.accounts.values().map(Account::total).sum()
    }

    /// Merkle commitment over all accounts in address order.
    pub fn state_root(&self) -> Hash {
        let leaves: Vec<Hash> = self
            .accounts
            .values()
            .map(|a| hash_tagged("stakechain/account", &[&a.commitment_bytes()]))
            .collect();
        merkle_root(&leaves)
    }

    fn entry(&mut self, address: Address) -> &mut Account {
        self.accounts
            .entry(address)
            .or_insert_with(|| Account::new(address, 0))
    }
}
