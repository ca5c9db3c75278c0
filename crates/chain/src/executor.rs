//! Transaction execution against the ledger and staking engine.
//!
//! A transaction either applies completely or leaves state untouched; failed transactions get a
//! receipt and are left out of the block.

use serde::{Deserialize, Serialize};
use stakechain_consensus::{StakingEngine, StakingError};
use stakechain_core::{Address, Amount, Hash, Ledger, LedgerError, Transaction, TransactionKind};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Why a transaction could not be applied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("insufficient balance (required {required}, available {available})")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("recipient balance would overflow")]
    RecipientOverflow,

    #[error("transaction already included in block {0}")]
    AlreadyIncluded(u64),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("staking error: {0}")]
    Staking(#[from] StakingError),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Outcome of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub tx_id: Hash,
    pub kind: String,
    pub success: bool,
    /// Fee charged; 0 when the transaction failed.
    pub fee_paid: Amount,
    pub error: Option<String>,
}

/// Outcome of running a batch of transactions.
#[derive(Debug, Clone, Default)]
pub struct BlockExecutionResult {
    /// Transactions that applied, in execution order.
    pub applied: Vec<Transaction>,
    pub receipts: Vec<TransactionReceipt>,
    /// Fees collected from applied transactions.
    pub total_fees: Amount,
}

impl BlockExecutionResult {
    pub fn failed_count(&self) -> usize {
        self.receipts.iter().filter(|r| !r.success).count()
    }
}

/// Applies transactions to borrowed state.
pub struct Executor<'a> {
    ledger: &'a mut Ledger,
    staking: &'a mut StakingEngine,
    /// Millisecond time used for unstaking unlock times.
    now: u64,
    /// Ids of transactions already in the chain, with their block index.
    included: Option<&'a HashMap<Hash, u64>>,
}

impl<'a> Executor<'a> {
    pub fn new(ledger: &'a mut Ledger, staking: &'a mut StakingEngine, now: u64) -> Self {
        Self {
            ledger,
            staking,
            now,
            included: None,
        }
    }

    /// Refuse transactions whose id is already in `included`.
    pub fn with_included(mut self, included: &'a HashMap<Hash, u64>) -> Self {
        self.included = Some(included);
        self
    }

    /// Apply one transaction and return the fee it paid.
    ///
    /// The fee is debited from the sender but not credited anywhere; the caller routes it.
    pub fn execute_transaction(&mut self, tx: &Transaction) -> Result<Amount> {
        if let Some(&block) = self.included.and_then(|included| included.get(&tx.id)) {
            return Err(ExecutionError::AlreadyIncluded(block));
        }
        let available = self.ledger.balance_of(&tx.from);
        let required = tx.required_balance();
        if available < required {
            return Err(ExecutionError::InsufficientBalance {
                required,
                available,
            });
        }

        match &tx.kind {
            TransactionKind::Transfer { to } => self.execute_transfer(tx.from, *to, tx.amount, tx.fee)?,
            TransactionKind::Stake { validator } => {
                self.staking.stake(self.ledger, tx.from, validator, tx.amount)?;
                self.ledger.debit(tx.from, tx.fee)?;
            }
            TransactionKind::Unstake { validator } => {
                self.staking
                    .unstake(self.ledger, tx.from, validator, tx.amount, self.now)?;
                self.ledger.debit(tx.from, tx.fee)?;
            }
        }
        Ok(tx.fee)
    }

    fn execute_transfer(&mut self, from: Address, to: Address, amount: Amount, fee: Amount) -> Result<()> {
        if self.ledger.balance_of(&to).checked_add(amount).is_none() {
            return Err(ExecutionError::RecipientOverflow);
        }
        self.ledger.debit(from, amount.saturating_add(fee))?;
        self.ledger.credit(to, amount)?;
        Ok(())
    }

    /// Run `transactions` in order, skipping the ones that fail.
    pub fn execute_transactions(&mut self, transactions: Vec<Transaction>) -> BlockExecutionResult {
        let mut result = BlockExecutionResult::default();
        for tx in transactions {
            let kind = tx.kind.label().to_string();
            match self.execute_transaction(&tx) {
                Ok(fee) => {
                    result.total_fees = result.total_fees.saturating_add(fee);
                    result.receipts.push(TransactionReceipt {
                        tx_id: tx.id,
                        kind,
                        success: true,
                        fee_paid: fee,
                        error: None,
                    });
                    result.applied.push(tx);
                }
                Err(err) => {
                    debug!(tx = %tx.id, error = %err, "transaction dropped");
                    result.receipts.push(TransactionReceipt {
                        tx_id: tx.id,
                        kind,
                        success: false,
                        fee_paid: 0,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        result
    }
}
