//! Persisted blocks and chain tip.

use crate::db::{Result, Storage, StorageError};
use stakechain_core::{Block, Hash};

const CHAIN_TIP_KEY: &[u8] = b"chain:tip";
const CHAIN_HEIGHT_KEY: &[u8] = b"chain:height";

/// Block store on top of [`Storage`].
///
/// Blocks are stored by hash, with a secondary `index → hash` pointer. The tip and height are
/// written in the same batch as the block so a crash never leaves them out of step.
#[derive(Clone, Debug)]
pub struct ChainStore {
    storage: Storage,
}

impl ChainStore {
    /// Create a chain store on top of `storage`.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Get the underlying storage.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Get a block by hash.
    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Option<Block>> {
        self.storage.get(Storage::block_hash_key(hash))
    }

    /// Get a block by index.
    pub fn get_block_by_index(&self, index: u64) -> Result<Option<Block>> {
        let hash: Option<Hash> = self.storage.get(Storage::block_index_key(index))?;
        match hash {
            Some(h) => self.get_block_by_hash(&h),
            None => Ok(None),
        }
    }

    /// Check if a block exists.
    pub fn has_block(&self, hash: &Hash) -> Result<bool> {
        self.storage.contains(Storage::block_hash_key(hash))
    }

    /// Get the hash of the latest block.
    pub fn get_tip(&self) -> Result<Option<Hash>> {
        self.storage.get(CHAIN_TIP_KEY)
    }

    /// Index of the tip block; 0 when empty.
    pub fn get_height(&self) -> Result<u64> {
        Ok(self.storage.get::<_, u64>(CHAIN_HEIGHT_KEY)?.unwrap_or(0))
    }

    /// Get the latest block.
    pub fn get_latest_block(&self) -> Result<Option<Block>> {
        match self.get_tip()? {
            Some(hash) => self.get_block_by_hash(&hash),
            None => Ok(None),
        }
    }

    /// Check if a genesis block is stored.
    pub fn is_initialized(&self) -> Result<bool> {
        Ok(self.get_tip()?.is_some())
    }

    /// Store the genesis block of an empty store.
    pub fn init_genesis(&self, genesis: &Block) -> Result<()> {
        if !genesis.is_genesis() {
            return Err(StorageError::InvalidGenesis(format!(
                "block {} is not a genesis block",
                genesis.index()
            )));
        }
        if self.is_initialized()? {
            return Err(StorageError::InvalidGenesis("chain already initialized".into()));
        }
        self.write_block(genesis)
    }

    /// Append a block that extends the stored tip.
    ///
    /// Only linkage is checked here; consensus validation happens before.
    pub fn append_block(&self, block: &Block) -> Result<()> {
        let tip = self
            .get_tip()?
            .ok_or_else(|| StorageError::InvalidGenesis("chain not initialized".into()))?;
        let expected = self.get_height()? + 1;
        if block.index() != expected {
            return Err(StorageError::IndexMismatch {
                expected,
                got: block.index(),
            });
        }
        if block.header.previous_hash != tip {
            return Err(StorageError::BrokenLink {
                expected: tip,
                got: block.header.previous_hash,
            });
        }
        self.write_block(block)
    }

    /// Blocks in `[from, to]`, stopping at the first gap.
    pub fn get_blocks_range(&self, from: u64, to: u64) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        for index in from..=to {
            match self.get_block_by_index(index)? {
                Some(block) => blocks.push(block),
                None => break,
            }
        }
        Ok(blocks)
    }

    /// The last `count` blocks, newest first.
    pub fn get_recent_blocks(&self, count: u64) -> Result<Vec<Block>> {
        if count == 0 || !self.is_initialized()? {
            return Ok(Vec::new());
        }
        let height = self.get_height()?;
        let from = height.saturating_sub(count - 1);
        let mut blocks = self.get_blocks_range(from, height)?;
        blocks.reverse();
        Ok(blocks)
    }

    fn write_block(&self, block: &Block) -> Result<()> {
        let ops = vec![
            Storage::insert_op(Storage::block_hash_key(&block.hash), block)?,
            Storage::insert_op(Storage::block_index_key(block.index()), &block.hash)?,
            Storage::insert_op(CHAIN_TIP_KEY.to_vec(), &block.hash)?,
            Storage::insert_op(CHAIN_HEIGHT_KEY.to_vec(), &block.index())?,
        ];
        self.storage.batch(ops)
    }
}
