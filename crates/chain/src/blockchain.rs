//! Chain coordinator.
//!
//! Owns the ledger, the staking engine, the mempool and the block list, and turns pending
//! transactions into linked blocks produced by stake-weighted validators.

use crate::clock::{Clock, SystemClock};
use crate::executor::{BlockExecutionResult, ExecutionError, Executor, TransactionReceipt};
use crate::mempool::{Mempool, MempoolConfig, MempoolError};
use serde::{Deserialize, Serialize};
use stakechain_consensus::{
    BlockValidator, Delegation, PendingUnstake, RewardDistribution, SelectionError,
    StakingConfig, StakingEngine, StakingError, StakingInfo, TransactionValidator, ValidationError,
};
use stakechain_core::{
    hash_tagged, Account, Address, Amount, Block, Hash, Ledger, LedgerError, PublicKey,
    Transaction, Validator, ValidatorId,
};
use stakechain_storage::{ChainStore, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("staking error: {0}")]
    Staking(#[from] StakingError),

    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("mempool error: {0}")]
    Mempool(#[from] MempoolError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("persistent store already holds a chain")]
    StoreNotEmpty,

    #[error("block {0} not found")]
    BlockNotFound(u64),
}

pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub staking: StakingConfig,
    pub mempool: MempoolConfig,
    /// Most transactions taken from the mempool per block.
    pub max_block_transactions: usize,
    /// Rewards are distributed on blocks whose index is a multiple of this. 0 disables them.
    pub reward_interval: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            staking: StakingConfig::default(),
            mempool: MempoolConfig::default(),
            max_block_transactions: 500,
            reward_interval: 1,
        }
    }
}

/// Read-only snapshot of network parameters and totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub total_validators: usize,
    pub active_validators: usize,
    /// Sum of every validator's total stake.
    pub total_staked: u128,
    pub active_stake: u128,
    pub min_delegation: Amount,
    pub max_validators: usize,
    pub base_reward_rate_bps: u16,
    pub unstaking_period_ms: u64,
    pub height: u64,
    pub mempool_size: usize,
    pub total_minted: u128,
}

/// A freshly produced block with what happened while building it.
#[derive(Debug, Clone)]
pub struct ProducedBlock {
    pub block: Block,
    /// One receipt per mempool transaction tried, failures included.
    pub receipts: Vec<TransactionReceipt>,
    pub rewards: Option<RewardDistribution>,
}

/// Commitment over ledger and staking state.
fn combined_state_root(ledger: &Ledger, staking: &StakingEngine) -> Hash {
    hash_tagged(
        "stakechain/state",
        &[ledger.state_root().as_ref(), staking.state_root().as_ref()],
    )
}

pub struct Blockchain {
    config: ChainConfig,
    ledger: Ledger,
    staking: StakingEngine,
    mempool: Mempool,
    blocks: Vec<Block>,
    /// Id of every transaction in `blocks`, with the index of its block.
    included: HashMap<Hash, u64>,
    store: Option<ChainStore>,
    clock: Arc<dyn Clock>,
}

impl Blockchain {
    /// Bootstrap a chain on the system clock.
    pub fn new(config: ChainConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Bootstrap a chain: seed the genesis validators and build the genesis block.
    pub fn with_clock(config: ChainConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut ledger = Ledger::new();
        let mut staking = StakingEngine::new(config.staking.clone());
        staking.bootstrap_genesis(&mut ledger)?;

        let producer = staking.registry().select_validator(0)?.id.clone();
        let genesis = Block::genesis(
            producer,
            combined_state_root(&ledger, &staking),
            clock.now_millis(),
        );
        info!(
            hash = %genesis.hash,
            validators = staking.registry().len(),
            "genesis block created"
        );

        Ok(Self {
            mempool: Mempool::with_config(config.mempool.clone()),
            config,
            ledger,
            staking,
            blocks: vec![genesis],
            included: HashMap::new(),
            store: None,
            clock,
        })
    }

    /// Persist every block (existing and future) to `store`, which must be empty.
    pub fn attach_store(&mut self, store: ChainStore) -> Result<()> {
        if store.is_initialized()? {
            return Err(ChainError::StoreNotEmpty);
        }
        let (genesis, rest) = self.blocks.split_first().ok_or(ChainError::BlockNotFound(0))?;
        store.init_genesis(genesis)?;
        for block in rest {
            store.append_block(block)?;
        }
        self.store = Some(store);
        Ok(())
    }

    /// Get the chain configuration.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Get the account ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Get the staking engine.
    pub fn staking(&self) -> &StakingEngine {
        &self.staking
    }

    /// Get the mempool.
    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// Get the attached block store, if any.
    pub fn store(&self) -> Option<&ChainStore> {
        self.store.as_ref()
    }

    /// Current time from the chain clock, in milliseconds.
    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    // Accounts

    /// Create an account holding `balance`.
    pub fn create_account(&mut self, address: Address, balance: Amount) -> Result<Account> {
        let account = self.ledger.create_account(address, balance)?.clone();
        debug!(%address, balance, "account created");
        Ok(account)
    }

    /// Get an account by address.
    pub fn get_account(&self, address: &Address) -> Option<&Account> {
        self.ledger.get_account(address)
    }

    /// Apply a signed balance delta; see [`Ledger::update_account_balance`].
    pub fn update_account_balance(&mut self, address: Address, delta: i128) -> Result<Amount> {
        Ok(self.ledger.update_account_balance(address, delta)?)
    }

    // Staking

    /// Delegate `amount` to `validator` without a fee.
    pub fn stake(&mut self, address: Address, validator: &ValidatorId, amount: Amount) -> Result<Delegation> {
        Ok(self
            .staking
            .stake(&mut self.ledger, address, validator, amount)?
            .clone())
    }

    /// Start unstaking `amount` from `validator` at the current time.
    pub fn unstake(&mut self, address: Address, validator: &ValidatorId, amount: Amount) -> Result<PendingUnstake> {
        let now = self.now();
        Ok(self
            .staking
            .unstake(&mut self.ledger, address, validator, amount, now)?
            .clone())
    }

    /// Release every matured pending unstake of `address`.
    pub fn complete_unstaking(&mut self, address: Address) -> Result<Amount> {
        let now = self.now();
        Ok(self.staking.complete_unstaking(&mut self.ledger, address, now)?)
    }

    /// Staking summary of `address` at the current time.
    pub fn get_staking_info(&self, address: &Address) -> StakingInfo {
        self.staking.get_staking_info(&self.ledger, address, self.now())
    }

    /// Mint `block_reward` and split it among `validator`'s delegators.
    pub fn distribute_staking_rewards(
        &mut self,
        block_reward: Amount,
        validator: &ValidatorId,
    ) -> Result<RewardDistribution> {
        Ok(self
            .staking
            .distribute_staking_rewards(&mut self.ledger, block_reward, validator)?)
    }

    // Validators

    /// Register a validator with no stake yet.
    pub fn register_validator(
        &mut self,
        id: ValidatorId,
        reward_address: Address,
        commission_bps: u16,
    ) -> Result<Validator> {
        Ok(self
            .staking
            .register_validator(id, reward_address, commission_bps)?
            .clone())
    }

    /// Activate or deactivate a validator.
    pub fn set_validator_active(&mut self, id: &ValidatorId, active: bool) -> Result<()> {
        Ok(self.staking.set_validator_active(id, active)?)
    }

    /// Get a validator by id.
    pub fn get_validator(&self, id: &ValidatorId) -> Option<&Validator> {
        self.staking.registry().get_validator(id)
    }

    /// Active validators in id order.
    pub fn get_active_validators(&self) -> Vec<&Validator> {
        self.staking.registry().get_active_validators()
    }

    /// Stake-weighted producer for `seed`.
    pub fn select_validator(&self, seed: u64) -> Result<&Validator> {
        Ok(self.staking.registry().select_validator(seed)?)
    }

    /// Record that `id` produced the block at `block_index`.
    pub fn update_validator_after_block(&mut self, id: &ValidatorId, block_index: u64) -> Result<Validator> {
        Ok(self
            .staking
            .update_validator_after_block(id, block_index)?
            .clone())
    }

    /// Network parameters and totals.
    pub fn get_network_stats(&self) -> NetworkStats {
        let registry = self.staking.registry();
        let config = self.staking.config();
        NetworkStats {
            total_validators: registry.len(),
            active_validators: registry.active_count(),
            total_staked: registry.total_stake(),
            active_stake: registry.active_stake(),
            min_delegation: config.min_delegation,
            max_validators: registry.max_validators(),
            base_reward_rate_bps: config.base_reward_rate_bps,
            unstaking_period_ms: config.unstaking_period_ms,
            height: self.height(),
            mempool_size: self.mempool.len(),
            total_minted: self.staking.total_minted(),
        }
    }

    // Transactions and blocks

    /// Check format, signature and current balance, then queue the transaction.
    ///
    /// A transaction already in a block is refused with `AlreadyIncluded`.
    pub fn submit_transaction(&mut self, tx: Transaction, public_key: &PublicKey) -> Result<Hash> {
        if let Some(&block) = self.included.get(&tx.id) {
            return Err(ValidationError::AlreadyIncluded { tx: tx.id, block }.into());
        }
        TransactionValidator::validate_with_signature(&tx, public_key)?;
        TransactionValidator::validate_against_state(&tx, self.ledger.balance_of(&tx.from))?;
        let id = tx.id;
        debug!(tx = %id, kind = tx.kind.label(), from = %tx.from, "transaction queued");
        self.mempool.add(tx)?;
        Ok(id)
    }

    /// Produce the next block with a seed derived from the tip.
    pub fn produce_block(&mut self) -> Result<ProducedBlock> {
        let tip = self.latest_block();
        let next = tip.index() + 1;
        let seed = hash_tagged("stakechain/seed", &[tip.hash.as_ref(), &next.to_le_bytes()]).low_u64();
        self.produce_block_with_seed(seed)
    }

    /// Select a producer with `seed`, apply pending transactions and append the block.
    ///
    /// Transactions that fail are dropped from the block and the mempool. On error, chain state
    /// is unchanged.
    pub fn produce_block_with_seed(&mut self, seed: u64) -> Result<ProducedBlock> {
        let tip = self.latest_block();
        let index = tip.index() + 1;
        let previous_hash = tip.hash;
        let timestamp = self.now().max(tip.header.timestamp);

        let producer = self.staking.registry().select_validator(seed)?.clone();
        let candidates = self.mempool.get_pending(self.config.max_block_transactions);
        let attempted: Vec<Hash> = candidates.iter().map(|tx| tx.id).collect();

        // Work on copies so a failure part-way leaves the chain untouched.
        let mut ledger = self.ledger.clone();
        let mut staking = self.staking.clone();
        let BlockExecutionResult {
            applied,
            receipts,
            total_fees,
        } = Executor::new(&mut ledger, &mut staking, timestamp)
            .with_included(&self.included)
            .execute_transactions(candidates);

        if total_fees > 0 {
            ledger.credit(producer.reward_address, total_fees)?;
        }
        staking.update_validator_after_block(&producer.id, index)?;
        let rewards = if self.config.reward_interval > 0 && index % self.config.reward_interval == 0 {
            Some(staking.distribute_staking_rewards(
                &mut ledger,
                self.config.staking.block_reward,
                &producer.id,
            )?)
        } else {
            None
        };

        let block = Block::with_timestamp(
            index,
            previous_hash,
            applied,
            combined_state_root(&ledger, &staking),
            producer.id.clone(),
            timestamp,
        );
        BlockValidator::validate_full(&block, previous_hash, index - 1)?;
        BlockValidator::validate_producer(&block, staking.registry())?;
        BlockValidator::validate_against_history(&block, &self.included)?;
        if let Some(store) = &self.store {
            store.append_block(&block)?;
        }

        self.ledger = ledger;
        self.staking = staking;
        self.mempool.remove_batch(&attempted);
        self.included
            .extend(block.transactions.iter().map(|tx| (tx.id, index)));
        self.blocks.push(block.clone());

        let dropped = receipts.iter().filter(|r| !r.success).count();
        if dropped > 0 {
            warn!(index, dropped, "dropped failing transactions");
        }
        info!(
            index,
            hash = %block.hash,
            producer = %producer.id,
            transactions = block.transaction_count(),
            fees = total_fees,
            "block produced"
        );
        Ok(ProducedBlock {
            block,
            receipts,
            rewards,
        })
    }

    /// Check a block against its parent in this chain and against the current validator set.
    pub fn validate_block(&self, block: &Block) -> Result<()> {
        if block.index() == 0 {
            BlockValidator::validate_block_structure(block)?;
            return Ok(());
        }
        let parent_index = block.index() - 1;
        let parent = self
            .block_by_index(parent_index)
            .ok_or(ChainError::BlockNotFound(parent_index))?;
        BlockValidator::validate_full(block, parent.hash, parent.index())?;
        BlockValidator::validate_producer(block, self.staking.registry())?;
        BlockValidator::validate_against_history(block, &self.included)?;
        Ok(())
    }

    /// Structure and linkage of every stored block, and no transaction in two blocks.
    pub fn validate_chain(&self) -> Result<()> {
        let mut parent: Option<&Block> = None;
        let mut seen = HashMap::new();
        for block in &self.blocks {
            match parent {
                None => BlockValidator::validate_block_structure(block)?,
                Some(p) => BlockValidator::validate_full(block, p.hash, p.index())?,
            }
            BlockValidator::validate_against_history(block, &seen)?;
            seen.extend(block.transactions.iter().map(|tx| (tx.id, block.index())));
            parent = Some(block);
        }
        Ok(())
    }

    /// Get the tip block.
    pub fn latest_block(&self) -> &Block {
        // The genesis block is pushed on construction and blocks are never removed.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Get a block by index.
    pub fn block_by_index(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    /// All blocks from genesis to tip.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Index of the tip block.
    pub fn height(&self) -> u64 {
        self.latest_block().index()
    }

    /// Balances, stakes and pending unstakes across all accounts.
    pub fn total_value(&self) -> u128 {
        self.ledger.total_value() + self.staking.pending_total()
    }

    /// Commitment over ledger and staking state.
    pub fn state_root(&self) -> Hash {
        combined_state_root(&self.ledger, &self.staking)
    }

    /// Verify stake bookkeeping against the ledger.
    pub fn check_invariants(&self) -> Result<()> {
        Ok(self.staking.check_invariants(&self.ledger)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use stakechain_core::{tokens, Keypair, Signer};

    const START: u64 = 1_700_000_000_000;

    fn setup() -> (Blockchain, ManualClock, Keypair) {
        let clock = ManualClock::new(START);
        let mut chain = Blockchain::with_clock(ChainConfig::default(), Arc::new(clock.clone())).unwrap();
        let alice = Keypair::from_label("alice");
        chain.create_account(alice.address(), tokens(10_000)).unwrap();
        (chain, clock, alice)
    }

    #[test]
    fn test_genesis() {
        let (chain, _, _) = setup();
        assert_eq!(chain.height(), 0);
        let genesis = chain.latest_block();
        assert!(genesis.is_genesis());
        assert!(genesis.is_valid());
        assert_eq!(genesis.header.timestamp, START);
        chain.validate_block(genesis).unwrap();
        chain.check_invariants().unwrap();
    }

    #[test]
    fn test_submit_rejects_bad_signature() {
        let (mut chain, _, alice) = setup();
        let mallory = Keypair::from_label("mallory");
        let tx = Transaction::transfer(alice.address(), Address::derive("bob"), tokens(1)).signed(&mallory);
        assert!(matches!(
            chain.submit_transaction(tx, &alice.public_key()),
            Err(ChainError::Validation(ValidationError::InvalidSignature(_)))
        ));
        assert!(chain.mempool().is_empty());
    }

    #[test]
    fn test_submit_rejects_unfunded_sender() {
        let (mut chain, _, _) = setup();
        let carol = Keypair::from_label("carol");
        let tx = Transaction::transfer(carol.address(), Address::derive("bob"), tokens(1)).signed(&carol);
        assert!(matches!(
            chain.submit_transaction(tx, &carol.public_key()),
            Err(ChainError::Validation(ValidationError::InsufficientBalance { .. }))
        ));
    }

    #[test]
    fn test_produce_block_applies_transactions() {
        let (mut chain, clock, alice) = setup();
        let bob = Address::derive("bob");
        let tx = Transaction::transfer(alice.address(), bob, tokens(250)).signed(&alice);
        chain.submit_transaction(tx.clone(), &alice.public_key()).unwrap();
        clock.advance(5_000);

        let produced = chain.produce_block().unwrap();
        let block = &produced.block;
        assert_eq!(block.index(), 1);
        assert_eq!(block.header.previous_hash, chain.blocks()[0].hash);
        assert_eq!(block.header.timestamp, START + 5_000);
        assert_eq!(block.transactions, vec![tx.clone()]);
        assert_eq!(block.header.state_root, chain.state_root());
        assert!(block.is_valid());

        assert_eq!(chain.ledger().balance_of(&bob), tokens(250));
        assert!(chain.mempool().is_empty());

        let producer = chain.get_validator(&block.header.validator).unwrap();
        assert_eq!(producer.blocks_produced, 1);
        assert_eq!(producer.last_active_block, 1);
        assert!(produced.rewards.is_some());
        chain.check_invariants().unwrap();
    }

    #[test]
    fn test_failed_transactions_are_dropped() {
        let (mut chain, _, alice) = setup();
        let tx = Transaction::unstake(alice.address(), "validator-1".into(), tokens(5)).signed(&alice);
        chain.submit_transaction(tx.clone(), &alice.public_key()).unwrap();

        let produced = chain.produce_block().unwrap();
        assert!(produced.block.transactions.is_empty());
        assert_eq!(produced.receipts.len(), 1);
        assert!(!produced.receipts[0].success);
        assert!(chain.mempool().is_empty());
        assert_eq!(chain.ledger().balance_of(&alice.address()), tokens(10_000));
    }

    #[test]
    fn test_fees_go_to_producer() {
        let config = ChainConfig {
            reward_interval: 0,
            ..ChainConfig::default()
        };
        let mut chain = Blockchain::with_clock(config, Arc::new(ManualClock::new(START))).unwrap();
        let alice = Keypair::from_label("alice");
        chain.create_account(alice.address(), tokens(100)).unwrap();
        let tx = Transaction::transfer(alice.address(), Address::derive("bob"), tokens(10)).signed(&alice);
        chain.submit_transaction(tx.clone(), &alice.public_key()).unwrap();

        let before = chain.total_value();
        let produced = chain.produce_block().unwrap();
        let producer = chain.get_validator(&produced.block.header.validator).unwrap();
        assert_eq!(chain.ledger().balance_of(&producer.reward_address), tx.fee);
        assert!(produced.rewards.is_none());
        assert_eq!(chain.total_value(), before);
    }

    #[test]
    fn test_blocks_chain_together() {
        let (mut chain, clock, _) = setup();
        for _ in 0..5 {
            clock.advance(1_000);
            chain.produce_block().unwrap();
        }
        assert_eq!(chain.height(), 5);
        chain.validate_chain().unwrap();
        for block in &chain.blocks()[1..] {
            chain.validate_block(block).unwrap();
        }

        let mut forged = chain.latest_block().clone();
        forged.header.previous_hash = chain.blocks()[1].hash;
        forged.hash = forged.calculate_hash();
        assert!(matches!(
            chain.validate_block(&forged),
            Err(ChainError::Validation(ValidationError::InvalidPreviousHash))
        ));
    }

    #[test]
    fn test_validate_chain_rejects_replayed_transaction() {
        let (mut chain, clock, alice) = setup();
        let tx = Transaction::transfer(alice.address(), Address::derive("bob"), tokens(5)).signed(&alice);
        chain.submit_transaction(tx.clone(), &alice.public_key()).unwrap();
        clock.advance(1_000);
        chain.produce_block().unwrap();

        let tip = chain.latest_block().clone();
        let replay = Block::with_timestamp(
            tip.index() + 1,
            tip.hash,
            vec![tx.clone()],
            chain.state_root(),
            tip.header.validator.clone(),
            tip.header.timestamp,
        );
        assert!(matches!(
            chain.validate_block(&replay),
            Err(ChainError::Validation(ValidationError::AlreadyIncluded { block: 1, .. }))
        ));

        chain.blocks.push(replay);
        assert!(matches!(
            chain.validate_chain(),
            Err(ChainError::Validation(ValidationError::AlreadyIncluded { block: 1, .. }))
        ));
    }

    #[test]
    fn test_seeded_production_is_reproducible() {
        let build = || {
            let clock = ManualClock::new(START);
            let mut chain = Blockchain::with_clock(ChainConfig::default(), Arc::new(clock)).unwrap();
            (1..=10)
                .map(|seed| chain.produce_block_with_seed(seed).unwrap().block.header.validator)
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_no_eligible_validator() {
        let (mut chain, _, _) = setup();
        for id in ["validator-1", "validator-2", "validator-3"] {
            chain.set_validator_active(&id.into(), false).unwrap();
        }
        let height = chain.height();
        assert!(matches!(
            chain.produce_block(),
            Err(ChainError::Selection(SelectionError::NoActiveStake))
        ));
        assert_eq!(chain.height(), height);
    }

    #[test]
    fn test_network_stats() {
        let (mut chain, _, alice) = setup();
        chain.stake(alice.address(), &"validator-2".into(), tokens(1_000)).unwrap();
        chain.set_validator_active(&"validator-3".into(), false).unwrap();

        let stats = chain.get_network_stats();
        assert_eq!(stats.total_validators, 3);
        assert_eq!(stats.active_validators, 2);
        assert_eq!(stats.total_staked, tokens(3_001_000) as u128);
        assert_eq!(stats.active_stake, tokens(2_001_000) as u128);
        assert_eq!(stats.min_delegation, tokens(100));
        assert_eq!(stats.max_validators, 21);
        assert_eq!(stats.base_reward_rate_bps, 500);
        assert_eq!(stats.height, 0);
        assert_eq!(stats.total_minted, 0);
    }

    #[test]
    fn test_register_validator_and_stake() {
        let (mut chain, _, alice) = setup();
        let id = ValidatorId::new("validator-4");
        chain.register_validator(id.clone(), Address::derive("validator-4"), 250).unwrap();
        assert_eq!(chain.get_active_validators().len(), 4);

        chain.stake(alice.address(), &id, tokens(500)).unwrap();
        assert_eq!(chain.get_validator(&id).unwrap().total_stake, tokens(500));
        chain.check_invariants().unwrap();
    }

    #[test]
    fn test_attach_store_persists_blocks() {
        let (mut chain, _, _) = setup();
        chain.produce_block().unwrap();

        let store = ChainStore::new(stakechain_storage::Storage::open_temporary().unwrap());
        chain.attach_store(store.clone()).unwrap();
        chain.produce_block().unwrap();

        assert_eq!(store.get_height().unwrap(), 2);
        assert_eq!(store.get_latest_block().unwrap().as_ref(), Some(chain.latest_block()));

        let (mut other, _, _) = setup();
        assert!(matches!(other.attach_store(store), Err(ChainError::StoreNotEmpty)));
    }
}
