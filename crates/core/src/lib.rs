//! Core ledger primitives for stakechain.
//!
//! This crate provides the fundamental types used throughout the chain:
//! - Hashing and merkle commitments
//! - Addresses and Ed25519 signing capabilities
//! - Accounts and the in-memory ledger
//! - Validator records
//! - Transactions and blocks

pub mod account;
pub mod amount;
pub mod block;
pub mod crypto;
pub mod hash;
pub mod ledger;
pub mod merkle;
pub mod transaction;
pub mod validator;

// Re-export commonly used types at the crate root
pub use account::Account;
pub use amount::{format_amount, mul_div, tokens, Amount, UNIT};
pub use block::{Block, BlockHeader, GENESIS_PREVIOUS_HASH};
pub use crypto::{Address, CryptoError, Keypair, PublicKey, Signature, Signer, Verifier};
pub use hash::{hash, hash_concat, hash_tagged, Hash};
pub use ledger::{Ledger, LedgerError};
pub use merkle::{merkle_root, MerkleProof, MerkleTree, EMPTY_MERKLE_ROOT};
pub use transaction::{fee_for, now_millis, Transaction, TransactionError, TransactionKind};
pub use validator::{Validator, ValidatorId, BPS_DENOMINATOR};
