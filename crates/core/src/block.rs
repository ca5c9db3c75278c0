//! Blocks and block headers.

use crate::amount::Amount;
use crate::hash::{hash_tagged, Hash};
use crate::merkle::{merkle_root, MerkleProof, MerkleTree};
use crate::transaction::{now_millis, Transaction};
use crate::validator::ValidatorId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: Hash = Hash::ZERO;

/// Everything the block hash commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Production time in milliseconds.
    pub timestamp: u64,
    pub previous_hash: Hash,
    pub merkle_root: Hash,
    /// Ledger, validator and staking commitment after applying this block.
    pub state_root: Hash,
    /// Producer of the block.
    pub validator: ValidatorId,
    pub nonce: u64,
}

impl BlockHeader {
    /// Digest of the canonical header encoding.
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(self).expect("serialization should not fail");
        hash_tagged("stakechain/block", &[&encoded])
    }
}

/// A header, its transactions and the cached header hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
    pub hash: Hash,
}

impl Block {
    pub fn new(
        index: u64,
        previous_hash: Hash,
        transactions: Vec<Transaction>,
        state_root: Hash,
        validator: ValidatorId,
    ) -> Self {
        Self::with_timestamp(index, previous_hash, transactions, state_root, validator, now_millis())
    }

    pub fn with_timestamp(
        index: u64,
        previous_hash: Hash,
        transactions: Vec<Transaction>,
        state_root: Hash,
        validator: ValidatorId,
        timestamp: u64,
    ) -> Self {
        let header = BlockHeader {
            index,
            timestamp,
            previous_hash,
            merkle_root: Self::compute_merkle_root(&transactions),
            state_root,
            validator,
            nonce: 0,
        };
        let hash = header.hash();
        Self {
            header,
            transactions,
            hash,
        }
    }

    /// The empty block at index 0.
    pub fn genesis(validator: ValidatorId, state_root: Hash, timestamp: u64) -> Self {
        Self::with_timestamp(
            0,
            GENESIS_PREVIOUS_HASH,
            Vec::new(),
            state_root,
            validator,
            timestamp,
        )
    }

    pub fn compute_merkle_root(transactions: &[Transaction]) -> Hash {
        merkle_root(&Self::leaves(transactions))
    }

    fn leaves(transactions: &[Transaction]) -> Vec<Hash> {
        transactions.iter().map(Transaction::hash).collect()
    }

    /// Recompute the header hash. Pure.
    pub fn calculate_hash(&self) -> Hash {
        self.header.hash()
    }

    /// Change the nonce and refresh the cached hash.
    pub fn set_nonce(&mut self, nonce: u64) {
        self.header.nonce = nonce;
        self.hash = self.calculate_hash();
    }

    /// Get the block index.
    pub fn index(&self) -> u64 {
        self.header.index
    }

    pub fn is_genesis(&self) -> bool {
        self.header.index == 0
            && self.header.previous_hash == GENESIS_PREVIOUS_HASH
            && self.transactions.is_empty()
    }

    /// Number of transactions in the block.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Sum of the transaction fees.
    pub fn total_fees(&self) -> Amount {
        self.transactions
            .iter()
            .fold(0, |acc: Amount, tx| acc.saturating_add(tx.fee))
    }

    /// Check the header merkle root against the transactions.
    pub fn verify_merkle_root(&self) -> bool {
        Self::compute_merkle_root(&self.transactions) == self.header.merkle_root
    }

    /// Inclusion proof for the transaction at `position`.
    pub fn transaction_proof(&self, position: usize) -> Option<MerkleProof> {
        MerkleTree::new(&Self::leaves(&self.transactions)).proof(position)
    }

    pub fn has_duplicate_transactions(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.transactions.len());
        !self.transactions.iter().all(|tx| seen.insert(tx.id))
    }

    /// Self-contained validity: hash, merkle root, genesis shape and transaction format.
    ///
    /// Linkage to a parent is checked by the consensus block validator.
    pub fn is_valid(&self) -> bool {
        if self.hash != self.calculate_hash() || !self.verify_merkle_root() {
            return false;
        }
        if self.header.index == 0 {
            return self.is_genesis();
        }
        if self.header.previous_hash == GENESIS_PREVIOUS_HASH {
            return false;
        }
        !self.has_duplicate_transactions() && self.transactions.iter().all(Transaction::is_valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Address, Keypair, Signer};
    use crate::hash::hash;
    use crate::merkle::EMPTY_MERKLE_ROOT;

    fn producer() -> ValidatorId {
        ValidatorId::new("validator-1")
    }

    fn signed_transfer(amount: Amount) -> Transaction {
        let kp = Keypair::from_label("alice");
        Transaction::transfer(kp.address(), Address::derive("bob"), amount).signed(&kp)
    }

    #[test]
    fn test_genesis_is_valid() {
        let genesis = Block::genesis(producer(), hash(b"state"), 0);
        assert!(genesis.is_genesis());
        assert!(genesis.is_valid());
        assert_eq!(genesis.header.merkle_root, EMPTY_MERKLE_ROOT);
        assert_eq!(genesis.transaction_count(), 0);
        assert_eq!(genesis.total_fees(), 0);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let block = Block::new(1, hash(b"parent"), vec![signed_transfer(5)], Hash::ZERO, producer());
        assert_eq!(block.calculate_hash(), block.calculate_hash());
        assert_eq!(block.hash, block.calculate_hash());
    }

    #[test]
    fn test_nonce_changes_hash() {
        let mut block = Block::new(1, hash(b"parent"), vec![], Hash::ZERO, producer());
        let before = block.hash;
        block.set_nonce(7);
        assert_ne!(block.hash, before);
        assert!(block.is_valid());

        block.header.nonce = 8;
        assert!(!block.is_valid(), "stale cached hash must be rejected");
    }

    #[test]
    fn test_non_genesis_needs_real_parent() {
        let block = Block::new(3, GENESIS_PREVIOUS_HASH, vec![], Hash::ZERO, producer());
        assert!(!block.is_valid());
    }

    #[test]
    fn test_index_zero_with_transactions_is_invalid() {
        let block = Block::new(0, GENESIS_PREVIOUS_HASH, vec![signed_transfer(1)], Hash::ZERO, producer());
        assert!(!block.is_valid());
    }

    #[test]
    fn test_fees_and_counts() {
        let txs = vec![signed_transfer(10), signed_transfer(20)];
        let expected: Amount = txs.iter().map(|t| t.fee).sum();
        let block = Block::new(1, hash(b"p"), txs, Hash::ZERO, producer());
        assert_eq!(block.transaction_count(), 2);
        assert_eq!(block.total_fees(), expected);
    }

    #[test]
    fn test_tampered_transactions_fail_merkle_check() {
        let mut block = Block::new(1, hash(b"p"), vec![signed_transfer(10)], Hash::ZERO, producer());
        assert!(block.verify_merkle_root());
        block.transactions.push(signed_transfer(11));
        assert!(!block.verify_merkle_root());
        assert!(!block.is_valid());
    }

    #[test]
    fn test_duplicate_transactions_rejected() {
        let tx = signed_transfer(10);
        let block = Block::new(1, hash(b"p"), vec![tx.clone(), tx], Hash::ZERO, producer());
        assert!(block.has_duplicate_transactions());
        assert!(!block.is_valid());
    }

    #[test]
    fn test_transaction_proof() {
        let txs: Vec<_> = (1..=5).map(signed_transfer).collect();
        let block = Block::new(1, hash(b"p"), txs, Hash::ZERO, producer());
        let proof = block.transaction_proof(3).unwrap();
        assert_eq!(proof.leaf, block.transactions[3].hash());
        assert!(proof.verify(&block.header.merkle_root));
        assert!(block.transaction_proof(5).is_none());
    }
}
