//! Blake3 digests used for ids, block linkage and state commitments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw 256-bit digest.
pub type H256 = [u8; 32];

/// A 32-byte blake3 digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub H256);

impl Hash {
    /// The all-zero digest. Used as the genesis previous-hash sentinel and the empty merkle root.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: H256) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a 64-character hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut arr = [0u8; 32];
        hex::decode_to_slice(s, &mut arr)?;
        Ok(Self(arr))
    }

    /// Little-endian `u64` read from the first eight bytes.
    pub fn low_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(buf)
    }

    /// Little-endian `u128` read from the first sixteen bytes.
    pub fn low_u128(&self) -> u128 {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&self.0[..16]);
        u128::from_le_bytes(buf)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl From<H256> for Hash {
    fn from(bytes: H256) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Hash a byte slice.
pub fn hash(data: &[u8]) -> Hash {
    Hash(blake3::hash(data).into())
}

/// Hash the concatenation of several byte slices without allocating.
pub fn hash_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

/// Hash `parts` under a domain tag so digests of different object kinds never collide.
///
/// The tag is length-prefixed, so `("ab", "c")` and `("a", "bc")` hash differently.
pub fn hash_tagged(tag: &str, parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(tag.len() as u32).to_le_bytes());
    hasher.update(tag.as_bytes());
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash(b"stake"), hash(b"stake"));
        assert_ne!(hash(b"stake"), hash(b"unstake"));
    }

    #[test]
    fn test_hash_concat_matches_contiguous() {
        assert_eq!(hash_concat(&[b"val", b"idator"]), hash(b"validator"));
    }

    #[test]
    fn test_tagged_hash_separates_domains() {
        let a = hash_tagged("tx", &[b"payload"]);
        let b = hash_tagged("block", &[b"payload"]);
        assert_ne!(a, b);
        assert_ne!(a, hash(b"payload"));
    }

    #[test]
    fn test_from_hex_accepts_prefix() {
        let h = hash(b"ledger");
        assert_eq!(Hash::from_hex(&h.to_hex()).unwrap(), h);
        assert_eq!(Hash::from_hex(&format!("{}", h)).unwrap(), h);
        assert!(Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_low_words() {
        let mut bytes = [0u8; 32];
        bytes[0] = 7;
        bytes[8] = 1;
        let h = Hash(bytes);
        assert_eq!(h.low_u64(), 7);
        assert_eq!(h.low_u128(), 7 + (1u128 << 64));
        assert!(Hash::ZERO.is_zero());
    }
}
