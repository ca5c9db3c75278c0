//! Persistent block storage for stakechain.
//!
//! Ledger, validator and staking state live in memory and are committed to through each block's
//! state root; this crate persists the blocks themselves so a chain can be inspected after the
//! process exits.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │        Blockchain (stakechain-chain)      │
//! └─────────────────────┬────────────────────┘
//!                       │
//! ┌─────────────────────▼────────────────────┐
//! │  ChainStore            Storage (DB)       │
//! │   - blocks by hash      - sled wrapper    │
//! │   - index → hash        - bincode codec   │
//! │   - tip / height        - atomic batches  │
//! └─────────────────────┬────────────────────┘
//!                       │
//! ┌─────────────────────▼────────────────────┐
//! │                 sled                      │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use stakechain_storage::{ChainStore, Storage};
//! use stakechain_core::{Block, Hash};
//!
//! let store = ChainStore::new(Storage::open("./stakechain_data").unwrap());
//! let genesis = Block::genesis("validator-1".into(), Hash::ZERO, 0);
//! store.init_genesis(&genesis).unwrap();
//! ```

pub mod chain;
pub mod db;

pub use chain::ChainStore;
pub use db::{BatchOp, Result, Storage, StorageError};
