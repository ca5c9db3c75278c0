//! Delegated proof-of-stake consensus for stakechain.
//!
//! This crate provides:
//! - The validator registry and stake-weighted producer selection
//! - Delegation, the unstaking cool-down and reward distribution
//! - Transaction validation (format, fee schedule, signature, balance)
//! - Block validation (structure, merkle root, parent links, producer)
//!
//! # Example
//!
//! ```rust
//! use stakechain_consensus::{StakingConfig, StakingEngine};
//! use stakechain_core::{tokens, Address, Ledger};
//!
//! let mut ledger = Ledger::new();
//! let mut engine = StakingEngine::new(StakingConfig::default());
//! engine.bootstrap_genesis(&mut ledger).unwrap();
//!
//! let alice = Address::derive("alice");
//! ledger.create_account(alice, tokens(10_000)).unwrap();
//! engine.stake(&mut ledger, alice, &"validator-1".into(), tokens(5_000)).unwrap();
//!
//! let producer = engine.registry().select_validator(42).unwrap().id.clone();
//! let report = engine
//!     .distribute_staking_rewards(&mut ledger, tokens(100), &producer)
//!     .unwrap();
//! assert_eq!(report.minted(), tokens(100));
//! ```

pub mod config;
pub mod registry;
pub mod selection;
pub mod staking;
pub mod validation;

// Re-export commonly used types
pub use config::{GenesisValidator, StakingConfig, DEFAULT_UNSTAKING_PERIOD_MS};
pub use registry::{RegistryError, ValidatorRegistry};
pub use selection::{select_validator, SelectionError};
pub use staking::{
    Delegation, PendingUnstake, RewardDistribution, StakingEngine, StakingError, StakingInfo,
};
pub use validation::{BlockValidator, TransactionValidator, ValidationError};
