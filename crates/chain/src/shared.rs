//! Thread-safe handle to a [`Blockchain`].

use crate::blockchain::{Blockchain, NetworkStats, ProducedBlock, Result};
use parking_lot::{Mutex, MutexGuard};
use stakechain_consensus::{Delegation, PendingUnstake, StakingInfo};
use stakechain_core::{Address, Amount, Hash, PublicKey, Transaction, ValidatorId};
use std::sync::Arc;

/// Cloneable handle; every clone drives the same chain.
///
/// All ledger, registry and staking mutations go through one mutex, so each operation observes
/// and leaves a consistent state.
#[derive(Clone)]
pub struct SharedBlockchain {
    inner: Arc<Mutex<Blockchain>>,
}

impl SharedBlockchain {
    /// Wrap `chain` for shared use.
    pub fn new(chain: Blockchain) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chain)),
        }
    }

    /// Exclusive access for multi-step work.
    pub fn lock(&self) -> MutexGuard<'_, Blockchain> {
        self.inner.lock()
    }

    /// Run `f` with the lock held.
    pub fn with<R>(&self, f: impl FnOnce(&mut Blockchain) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn submit_transaction(&self, tx: Transaction, public_key: &PublicKey) -> Result<Hash> {
        self.inner.lock().submit_transaction(tx, public_key)
    }

    pub fn produce_block(&self) -> Result<ProducedBlock> {
        self.inner.lock().produce_block()
    }

    pub fn stake(&self, address: Address, validator: &ValidatorId, amount: Amount) -> Result<Delegation> {
        self.inner.lock().stake(address, validator, amount)
    }

    pub fn unstake(&self, address: Address, validator: &ValidatorId, amount: Amount) -> Result<PendingUnstake> {
        self.inner.lock().unstake(address, validator, amount)
    }

    pub fn complete_unstaking(&self, address: Address) -> Result<Amount> {
        self.inner.lock().complete_unstaking(address)
    }

    pub fn get_staking_info(&self, address: &Address) -> StakingInfo {
        self.inner.lock().get_staking_info(address)
    }

    pub fn get_network_stats(&self) -> NetworkStats {
        self.inner.lock().get_network_stats()
    }

    pub fn height(&self) -> u64 {
        self.inner.lock().height()
    }

    pub fn total_value(&self) -> u128 {
        self.inner.lock().total_value()
    }
}
