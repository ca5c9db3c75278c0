//! Transaction and block validation rules.
//!
//! Stateless checks live here; balance and stake checks that need the ledger are repeated by the
//! executor when a transaction is applied.

use crate::registry::ValidatorRegistry;
use stakechain_core::{
    fee_for, Amount, Block, Hash, Transaction, TransactionError, TransactionKind, Verifier,
    ValidatorId, GENESIS_PREVIOUS_HASH,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("transaction amount must be positive")]
    ZeroAmount,

    #[error("malformed transaction: {0}")]
    MalformedTransaction(&'static str),

    #[error("transaction fee mismatch (expected {expected}, got {got})")]
    FeeMismatch { expected: Amount, got: Amount },

    #[error("transaction signature invalid: {0}")]
    InvalidSignature(#[from] TransactionError),

    #[error("insufficient balance (required {required}, available {available})")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("block index mismatch (expected {expected}, got {got})")]
    InvalidIndex { expected: u64, got: u64 },

    #[error("block previous hash mismatch")]
    InvalidPreviousHash,

    #[error("block merkle root verification failed")]
    InvalidMerkleRoot,

    #[error("block hash does not match header")]
    HashMismatch,

    #[error("duplicate transaction in block")]
    DuplicateTransaction,

    #[error("transaction {tx} already included in block {block}")]
    AlreadyIncluded { tx: Hash, block: u64 },

    #[error("genesis block must be empty and link to the zero hash")]
    MalformedGenesis,

    #[error("block producer {0} is not a registered validator")]
    UnknownProducer(ValidatorId),

    #[error("block producer {0} is not active")]
    InactiveProducer(ValidatorId),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Transaction validator.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Format checks: amount, fee schedule, addresses, id.
    ///
    /// Does not verify the signature; that needs the sender's public key.
    pub fn validate_transaction(tx: &Transaction) -> Result<()> {
        if tx.amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        if tx.from.is_zero() {
            return Err(ValidationError::MalformedTransaction("sender is the zero address"));
        }

        let expected = fee_for(&tx.kind, tx.amount);
        if tx.fee != expected {
            return Err(ValidationError::FeeMismatch {
                expected,
                got: tx.fee,
            });
        }

        match &tx.kind {
            TransactionKind::Transfer { to } if to.is_zero() => {
                return Err(ValidationError::MalformedTransaction("recipient is the zero address"));
            }
            TransactionKind::Transfer { to } if *to == tx.from => {
                return Err(ValidationError::MalformedTransaction("transfer to self"));
            }
            TransactionKind::Stake { validator } | TransactionKind::Unstake { validator }
                if validator.is_empty() =>
            {
                return Err(ValidationError::MalformedTransaction("empty validator id"));
            }
            _ => {}
        }

        if tx.id != tx.compute_id() {
            return Err(ValidationError::MalformedTransaction("id does not match payload"));
        }
        Ok(())
    }

    /// Validate transaction with signature verification.
    pub fn validate_with_signature(tx: &Transaction, verifier: &impl Verifier) -> Result<()> {
        tx.verify_signature(verifier)?;
        Self::validate_transaction(tx)
    }

    /// Check the sender can cover the transaction from its spendable balance.
    pub fn validate_against_state(tx: &Transaction, sender_balance: Amount) -> Result<()> {
        let required = tx.required_balance();
        if sender_balance < required {
            return Err(ValidationError::InsufficientBalance {
                required,
                available: sender_balance,
            });
        }
        Ok(())
    }

    /// Full transaction validation (signature + format + state checks).
    pub fn validate_full(tx: &Transaction, verifier: &impl Verifier, sender_balance: Amount) -> Result<()> {
        Self::validate_with_signature(tx, verifier)?;
        Self::validate_against_state(tx, sender_balance)
    }
}

/// Block validator.
pub struct BlockValidator;

impl BlockValidator {
    /// Validate block structure and contents.
    pub fn validate_block_structure(block: &Block) -> Result<()> {
        if block.hash != block.calculate_hash() {
            return Err(ValidationError::HashMismatch);
        }
        if !block.verify_merkle_root() {
            return Err(ValidationError::InvalidMerkleRoot);
        }

        if block.index() == 0 {
            if !block.is_genesis() {
                return Err(ValidationError::MalformedGenesis);
            }
            return Ok(());
        }
        if block.header.previous_hash == GENESIS_PREVIOUS_HASH {
            return Err(ValidationError::InvalidPreviousHash);
        }

        let mut seen = HashSet::with_capacity(block.transactions.len());
        for tx in &block.transactions {
            if !seen.insert(tx.id) {
                return Err(ValidationError::DuplicateTransaction);
            }
        }
        Ok(())
    }

    /// Validate block extends the parent correctly.
    pub fn validate_block_extends_parent(block: &Block, parent_hash: Hash, parent_index: u64) -> Result<()> {
        let expected = parent_index + 1;
        if block.header.index != expected {
            return Err(ValidationError::InvalidIndex {
                expected,
                got: block.header.index,
            });
        }
        if block.header.previous_hash != parent_hash {
            return Err(ValidationError::InvalidPreviousHash);
        }
        Ok(())
    }

    /// Validate every transaction's format (not signatures).
    pub fn validate_block_transactions(block: &Block) -> Result<()> {
        block
            .transactions
            .iter()
            .try_for_each(TransactionValidator::validate_transaction)
    }

    /// The producer must be a registered, active validator.
    pub fn validate_producer(block: &Block, registry: &ValidatorRegistry) -> Result<()> {
        let producer = &block.header.validator;
        match registry.get_validator(producer) {
            None => Err(ValidationError::UnknownProducer(producer.clone())),
            Some(v) if !v.active => Err(ValidationError::InactiveProducer(producer.clone())),
            Some(_) => Ok(()),
        }
    }

    /// No transaction of `block` may appear in another block of `included` (tx id to block index).
    pub fn validate_against_history(block: &Block, included: &HashMap<Hash, u64>) -> Result<()> {
        for tx in &block.transactions {
            match included.get(&tx.id) {
                Some(&index) if index != block.index() => {
                    return Err(ValidationError::AlreadyIncluded {
                        tx: tx.id,
                        block: index,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Full block validation (structure + parent + transactions).
    pub fn validate_full(block: &Block, parent_hash: Hash, parent_index: u64) -> Result<()> {
        Self::validate_block_structure(block)?;
        Self::validate_block_extends_parent(block, parent_hash, parent_index)?;
        Self::validate_block_transactions(block)
    }
}
