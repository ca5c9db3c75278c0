//! Chain coordination for stakechain.
//!
//! This crate brings the components together:
//! - **Consensus**: stake-weighted producer selection and reward distribution
//! - **Mempool**: signature-checked transactions waiting for a block
//! - **Executor**: applies transactions to the ledger and staking engine
//! - **Storage**: optional sled persistence of produced blocks
//!
//! # Example
//!
//! ```rust
//! use stakechain_chain::{Blockchain, ChainConfig};
//! use stakechain_core::{tokens, Address, Keypair, Signer, Transaction};
//!
//! let mut chain = Blockchain::new(ChainConfig::default()).unwrap();
//! let alice = Keypair::from_label("alice");
//! chain.create_account(alice.address(), tokens(1_000)).unwrap();
//!
//! let tx = Transaction::stake(alice.address(), "validator-1".into(), tokens(500)).signed(&alice);
//! chain.submit_transaction(tx, &alice.public_key()).unwrap();
//!
//! let produced = chain.produce_block().unwrap();
//! assert_eq!(produced.block.transaction_count(), 1);
//! assert_eq!(chain.height(), 1);
//! ```

pub mod blockchain;
pub mod clock;
pub mod executor;
pub mod mempool;
pub mod shared;

// Re-export commonly used types
pub use blockchain::{Blockchain, ChainConfig, ChainError, NetworkStats, ProducedBlock, Result};
pub use clock::{Clock, ManualClock, SystemClock};
pub use executor::{BlockExecutionResult, ExecutionError, Executor, TransactionReceipt};
pub use mempool::{Mempool, MempoolConfig, MempoolError, MempoolStats};
pub use shared::SharedBlockchain;
