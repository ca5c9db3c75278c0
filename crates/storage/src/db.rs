//! sled database wrapper with bincode helpers.

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use stakechain_core::Hash;
use std::path::Path;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("key not found: {0}")]
    NotFound(String),

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("block {got} does not extend the stored tip (expected index {expected})")]
    IndexMismatch { expected: u64, got: u64 },

    #[error("block previous hash {got} does not match stored tip {expected}")]
    BrokenLink { expected: Hash, got: Hash },
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Handle to a sled database. Cloning shares the same underlying tree.
#[derive(Clone, Debug)]
pub struct Storage {
    db: Db,
}

impl Storage {
    /// Open (or create) a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open an in-memory database that is discarded on drop.
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Serialize and store a value.
    pub fn put<K, V>(&self, key: K, value: &V) -> Result<()>
    where
        K: AsRef<[u8]>,
        V: Serialize,
    {
        let encoded = bincode::serialize(value)?;
        self.db.insert(key, encoded)?;
        Ok(())
    }

    /// Load and deserialize a value.
    pub fn get<K, V>(&self, key: K) -> Result<Option<V>>
    where
        K: AsRef<[u8]>,
        V: DeserializeOwned,
    {
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Like [`Storage::get`] but a missing key is an error.
    pub fn get_or_err<K, V>(&self, key: K) -> Result<V>
    where
        K: AsRef<[u8]>,
        V: DeserializeOwned,
    {
        let display = String::from_utf8_lossy(key.as_ref()).into_owned();
        self.get(key)?.ok_or(StorageError::NotFound(display))
    }

    /// Check if a key exists.
    pub fn contains<K: AsRef<[u8]>>(&self, key: K) -> Result<bool> {
        Ok(self.db.contains_key(key)?)
    }

    /// Apply several writes atomically.
    pub fn batch(&self, operations: Vec<BatchOp>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for op in operations {
            match op {
                BatchOp::Insert { key, value } => batch.insert(key, value),
                BatchOp::Remove { key } => batch.remove(key),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    /// Encode `value` into an insert op for [`Storage::batch`].
    pub fn insert_op<V: Serialize>(key: Vec<u8>, value: &V) -> Result<BatchOp> {
        Ok(BatchOp::Insert {
            key,
            value: bincode::serialize(value)?,
        })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// `block:index:{index}`
    pub fn block_index_key(index: u64) -> Vec<u8> {
        format!("block:index:{}", index).into_bytes()
    }

    /// `block:hash:` followed by the raw hash bytes.
    pub fn block_hash_key(hash: &Hash) -> Vec<u8> {
        let mut key = b"block:hash:".to_vec();
        key.extend_from_slice(&hash.0);
        key
    }
}

/// Batch operation for atomic updates.
pub enum BatchOp {
    Insert { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}
