//! Pending transaction pool.
//!
//! Holds signature-checked transactions until a block picks them up. Block building takes the
//! highest fee first; ties fall back to submission order so selection is deterministic.

use serde::{Deserialize, Serialize};
use stakechain_core::{Address, Hash, Transaction};
use std::collections::{BTreeMap, HashMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("transaction {0} already in mempool")]
    DuplicateTransaction(Hash),

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),

    #[error("sender {0} has too many pending transactions")]
    SenderLimit(Address),

    #[error("transaction {0} not found in mempool")]
    TransactionNotFound(Hash),
}

pub type Result<T> = std::result::Result<T, MempoolError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    pub max_transactions: usize,
    pub max_per_account: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
            max_per_account: 100,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    tx: Transaction,
    /// Submission sequence number.
    seq: u64,
}

/// Transaction pool keyed by transaction id.
#[derive(Debug, Clone, Default)]
pub struct Mempool {
    config: MempoolConfig,
    transactions: HashMap<Hash, Entry>,
    by_sender: BTreeMap<Address, VecDeque<Hash>>,
    next_seq: u64,
}

impl Mempool {
    /// Create a mempool with default limits.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    /// Create a mempool with the given limits.
    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Number of pending transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the mempool is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check if a transaction is pending.
    pub fn contains(&self, id: &Hash) -> bool {
        self.transactions.contains_key(id)
    }

    /// Get a pending transaction by id.
    pub fn get(&self, id: &Hash) -> Option<&Transaction> {
        self.transactions.get(id).map(|e| &e.tx)
    }

    /// Queue a transaction. Callers validate format and signature first.
    pub fn add(&mut self, tx: Transaction) -> Result<()> {
        if self.contains(&tx.id) {
            return Err(MempoolError::DuplicateTransaction(tx.id));
        }
        if self.transactions.len() >= self.config.max_transactions {
            return Err(MempoolError::MempoolFull(self.config.max_transactions));
        }
        let pending = self.by_sender.get(&tx.from).map_or(0, VecDeque::len);
        if pending >= self.config.max_per_account {
            return Err(MempoolError::SenderLimit(tx.from));
        }

        self.by_sender.entry(tx.from).or_default().push_back(tx.id);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.transactions.insert(tx.id, Entry { tx, seq });
        Ok(())
    }

    /// Remove a transaction by id.
    pub fn remove(&mut self, id: &Hash) -> Result<Transaction> {
        let entry = self
            .transactions
            .remove(id)
            .ok_or(MempoolError::TransactionNotFound(*id))?;

        if let Some(queue) = self.by_sender.get_mut(&entry.tx.from) {
            queue.retain(|h| h != id);
            if queue.is_empty() {
                self.by_sender.remove(&entry.tx.from);
            }
        }
        Ok(entry.tx)
    }

    /// Drop every listed id that is still pending.
    pub fn remove_batch<'a>(&mut self, ids: impl IntoIterator<Item = &'a Hash>) {
        for id in ids {
            let _ = self.remove(id);
        }
    }

    /// Pending transactions of one sender in submission order.
    pub fn get_by_sender(&self, sender: &Address) -> Vec<&Transaction> {
        self.by_sender
            .get(sender)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Up to `limit` transactions, highest fee first, then oldest first.
    pub fn get_pending(&self, limit: usize) -> Vec<Transaction> {
        let mut entries: Vec<&Entry> = self.transactions.values().collect();
        entries.sort_by(|a, b| b.tx.fee.cmp(&a.tx.fee).then(a.seq.cmp(&b.seq)));
        entries
            .into_iter()
            .take(limit)
            .map(|e| e.tx.clone())
            .collect()
    }

    /// Drop every pending transaction.
    pub fn clear(&mut self) {
        self.transactions.clear();
        self.by_sender.clear();
    }

    /// Get mempool statistics.
    pub fn stats(&self) -> MempoolStats {
        MempoolStats {
            total_transactions: self.len(),
            unique_senders: self.by_sender.len(),
            capacity: self.config.max_transactions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolStats {
    pub total_transactions: usize,
    pub unique_senders: usize,
    pub capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakechain_core::{tokens, Keypair, Signer};

    fn transfer(keypair: &Keypair, amount: u64) -> Transaction {
        Transaction::transfer(keypair.address(), Address::derive("bob"), amount).signed(keypair)
    }

    #[test]
    fn test_add_and_get() {
        let mut mempool = Mempool::new();
        let kp = Keypair::from_label("alice");
        let tx = transfer(&kp, 1000);

        mempool.add(tx.clone()).unwrap();
        assert_eq!(mempool.len(), 1);
        assert!(mempool.contains(&tx.id));
        assert_eq!(mempool.get(&tx.id), Some(&tx));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut mempool = Mempool::new();
        let tx = transfer(&Keypair::from_label("alice"), 1000);
        mempool.add(tx.clone()).unwrap();
        assert_eq!(mempool.add(tx.clone()), Err(MempoolError::DuplicateTransaction(tx.id)));
    }

    #[test]
    fn test_identical_fields_are_distinct_transactions() {
        let mut mempool = Mempool::new();
        let kp = Keypair::from_label("alice");
        mempool.add(transfer(&kp, 1000)).unwrap();
        mempool.add(transfer(&kp, 1000)).unwrap();
        assert_eq!(mempool.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut mempool = Mempool::new();
        let kp = Keypair::from_label("alice");
        let tx = transfer(&kp, 1000);
        mempool.add(tx.clone()).unwrap();

        assert_eq!(mempool.remove(&tx.id).unwrap(), tx);
        assert!(mempool.is_empty());
        assert!(mempool.get_by_sender(&kp.address()).is_empty());
        assert_eq!(mempool.remove(&tx.id), Err(MempoolError::TransactionNotFound(tx.id)));
    }

    #[test]
    fn test_by_sender_keeps_submission_order() {
        let mut mempool = Mempool::new();
        let kp = Keypair::from_label("alice");
        let first = transfer(&kp, 1000);
        let second = transfer(&kp, 2000);
        mempool.add(first.clone()).unwrap();
        mempool.add(second.clone()).unwrap();

        let queued = mempool.get_by_sender(&kp.address());
        assert_eq!(queued, vec![&first, &second]);
    }

    #[test]
    fn test_pending_ordered_by_fee_then_age() {
        let mut mempool = Mempool::new();
        let kp = Keypair::from_label("alice");
        let small = transfer(&kp, tokens(1));
        let large = transfer(&kp, tokens(500));
        let small_again = transfer(&kp, tokens(1));
        mempool.add(small.clone()).unwrap();
        mempool.add(large.clone()).unwrap();
        mempool.add(small_again.clone()).unwrap();

        let ids: Vec<Hash> = mempool.get_pending(10).iter().map(|tx| tx.id).collect();
        assert_eq!(ids, vec![large.id, small.id, small_again.id]);
        assert_eq!(mempool.get_pending(1).len(), 1);
    }

    #[test]
    fn test_capacity_limits() {
        let mut mempool = Mempool::with_config(MempoolConfig {
            max_transactions: 2,
            max_per_account: 10,
        });
        let kp = Keypair::from_label("alice");
        mempool.add(transfer(&kp, 1)).unwrap();
        mempool.add(transfer(&kp, 2)).unwrap();
        assert_eq!(mempool.add(transfer(&kp, 3)), Err(MempoolError::MempoolFull(2)));

        let mut mempool = Mempool::with_config(MempoolConfig {
            max_transactions: 10,
            max_per_account: 1,
        });
        mempool.add(transfer(&kp, 1)).unwrap();
        assert_eq!(
            mempool.add(transfer(&kp, 2)),
            Err(MempoolError::SenderLimit(kp.address()))
        );
        mempool.add(transfer(&Keypair::from_label("carol"), 1)).unwrap();
    }

    #[test]
    fn test_remove_batch_and_stats() {
        let mut mempool = Mempool::new();
        let a = transfer(&Keypair::from_label("alice"), 1);
        let c = transfer(&Keypair::from_label("carol"), 1);
        mempool.add(a.clone()).unwrap();
        mempool.add(c.clone()).unwrap();

        let stats = mempool.stats();
        assert_eq!(stats.total_transactions, 2);
        assert_eq!(stats.unique_senders, 2);

        mempool.remove_batch([&a.id, &Hash::ZERO]);
        assert_eq!(mempool.len(), 1);
        mempool.clear();
        assert!(mempool.is_empty());
    }
}
