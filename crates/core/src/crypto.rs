//! Addresses and Ed25519 signing capabilities.
//!
//! Signing and verification are split: a [`Signer`] holds the secret, a [`Verifier`] only
//! needs the public half, so anyone can check a transaction without being able to forge one.

use crate::hash::{hash_tagged, Hash};
use ed25519_dalek::{Signature as DalekSignature, SigningKey, VerifyingKey};
use ed25519_dalek::{Signer as _, Verifier as _};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Errors from key handling and signature checks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid address format")]
    InvalidAddress,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("signature verification failed")]
    VerificationFailed,
}

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Reserved, never a valid sender or recipient.
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Deterministic address for a named system participant (e.g. a genesis validator).
    pub fn derive(label: &str) -> Self {
        Self::truncate(&hash_tagged("stakechain/address", &[label.as_bytes()]))
    }

    fn truncate(digest: &Hash) -> Self {
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&digest.0[..20]);
        Self(addr)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut arr = [0u8; 20];
        hex::decode_to_slice(s, &mut arr).map_err(|_| CryptoError::InvalidAddress)?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Placeholder carried by unsigned transactions.
    pub const EMPTY: Self = Self([0u8; 64]);

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", &self.to_hex()[..16])
    }
}

/// Capability to produce signatures for one address.
pub trait Signer {
    fn address(&self) -> Address;
    fn public_key(&self) -> PublicKey;
    fn sign_digest(&self, digest: &Hash) -> Signature;
}

/// Capability to check signatures produced by a [`Signer`].
pub trait Verifier {
    fn address(&self) -> Address;
    fn verify_digest(&self, digest: &Hash, signature: &Signature) -> Result<(), CryptoError>;
}

/// Ed25519 verifying key.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Address = first 20 bytes of the tagged digest of the key.
    pub fn to_address(&self) -> Address {
        Address::truncate(&hash_tagged("stakechain/pubkey", &[self.0.as_bytes()]))
    }
}

impl Verifier for PublicKey {
    fn address(&self) -> Address {
        self.to_address()
    }

    fn verify_digest(&self, digest: &Hash, signature: &Signature) -> Result<(), CryptoError> {
        let sig = DalekSignature::from_bytes(&signature.0);
        self.0
            .verify(digest.as_bytes(), &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0.as_bytes()[..8]))
    }
}

/// An Ed25519 keypair.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Reproducible keypair for simulations and fixtures. Never use for real funds.
    pub fn from_label(label: &str) -> Self {
        Self::from_secret(&hash_tagged("stakechain/devkey", &[label.as_bytes()]).0)
    }

    pub fn secret(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Signer for Keypair {
    fn address(&self) -> Address {
        self.public_key().to_address()
    }

    fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key())
    }

    fn sign_digest(&self, digest: &Hash) -> Signature {
        Signature(self.signing_key.sign(digest.as_bytes()).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &Signer::address(self))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;

    #[test]
    fn test_sign_and_verify() {
        let kp = Keypair::generate();
        let digest = hash(b"payload");
        let sig = kp.sign_digest(&digest);
        assert!(kp.public_key().verify_digest(&digest, &sig).is_ok());
        assert_eq!(
            kp.public_key().verify_digest(&hash(b"other"), &sig),
            Err(CryptoError::VerificationFailed)
        );
    }

    #[test]
    fn test_verifier_cannot_sign_for_other_key() {
        let alice = Keypair::generate();
        let mallory = Keypair::generate();
        let digest = hash(b"transfer");
        let forged = mallory.sign_digest(&digest);
        assert!(alice.public_key().verify_digest(&digest, &forged).is_err());
    }

    #[test]
    fn test_address_matches_public_key() {
        let kp = Keypair::from_label("alice");
        assert_eq!(Signer::address(&kp), kp.public_key().to_address());
        assert_eq!(
            Signer::address(&kp),
            Signer::address(&Keypair::from_label("alice"))
        );
        assert_ne!(
            Signer::address(&kp),
            Signer::address(&Keypair::from_label("bob"))
        );
    }

    #[test]
    fn test_derived_addresses() {
        assert_eq!(Address::derive("validator-1"), Address::derive("validator-1"));
        assert_ne!(Address::derive("validator-1"), Address::derive("validator-2"));
        assert!(!Address::derive("validator-1").is_zero());
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::derive("carol");
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
        assert_eq!(Address::from_hex("0x1234"), Err(CryptoError::InvalidAddress));
    }

    #[test]
    fn test_public_key_bytes_roundtrip() {
        let kp = Keypair::generate();
        let pk = PublicKey::from_bytes(&kp.public_key().to_bytes()).unwrap();
        assert_eq!(pk, kp.public_key());
    }

    #[test]
    fn test_secret_reconstructs_keypair() {
        let kp = Keypair::generate();
        let restored = Keypair::from_secret(&kp.secret());
        assert_eq!(restored.public_key(), kp.public_key());
    }
}
