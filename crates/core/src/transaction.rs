//! Transactions: value transfers and staking instructions.

use crate::amount::{Amount, UNIT};
use crate::crypto::{Address, CryptoError, Signature, Signer, Verifier};
use crate::hash::{hash, hash_tagged, Hash};
use crate::validator::ValidatorId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction is not signed")]
    MissingSignature,

    #[error("signer {signer} does not match sender {from}")]
    SenderMismatch { signer: Address, from: Address },

    #[error("signature verification failed")]
    VerificationFailed(#[from] CryptoError),
}

/// What a transaction does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Transfer { to: Address },
    Stake { validator: ValidatorId },
    Unstake { validator: ValidatorId },
}

impl TransactionKind {
    /// Flat part of the fee, in micro-units.
    pub fn base_fee(&self) -> Amount {
        match self {
            Self::Transfer { .. } => UNIT / 1_000,
            Self::Stake { .. } | Self::Unstake { .. } => UNIT / 500,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "transfer",
            Self::Stake { .. } => "stake",
            Self::Unstake { .. } => "unstake",
        }
    }
}

/// Fee for moving `amount` with `kind`: the base fee plus one basis point of the amount.
pub fn fee_for(kind: &TransactionKind, amount: Amount) -> Amount {
    kind.base_fee().saturating_add(amount / 10_000)
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A signed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Digest of the unsigned payload.
    pub id: Hash,
    pub from: Address,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub fee: Amount,
    /// Creation time in milliseconds.
    pub timestamp: u64,
    /// Random bytes that make ids of otherwise identical transactions distinct.
    pub salt: [u8; 16],
    pub signature: Signature,
}

/// The signed part of a transaction, in canonical field order.
#[derive(Serialize)]
struct UnsignedPayload<'a> {
    from: &'a Address,
    kind: &'a TransactionKind,
    amount: Amount,
    fee: Amount,
    timestamp: u64,
    salt: &'a [u8; 16],
}

impl Transaction {
    /// Build an unsigned transaction stamped with the current time.
    pub fn new(from: Address, kind: TransactionKind, amount: Amount) -> Self {
        Self::with_timestamp(from, kind, amount, now_millis())
    }

    pub fn with_timestamp(from: Address, kind: TransactionKind, amount: Amount, timestamp: u64) -> Self {
        let fee = fee_for(&kind, amount);
        let mut tx = Self {
            id: Hash::ZERO,
            from,
            kind,
            amount,
            fee,
            timestamp,
            salt: rand::random(),
            signature: Signature::EMPTY,
        };
        tx.id = tx.compute_id();
        tx
    }

    pub fn transfer(from: Address, to: Address, amount: Amount) -> Self {
        Self::new(from, TransactionKind::Transfer { to }, amount)
    }

    pub fn stake(from: Address, validator: ValidatorId, amount: Amount) -> Self {
        Self::new(from, TransactionKind::Stake { validator }, amount)
    }

    pub fn unstake(from: Address, validator: ValidatorId, amount: Amount) -> Self {
        Self::new(from, TransactionKind::Unstake { validator }, amount)
    }

    /// Canonical bincode encoding of the unsigned payload.
    pub fn canonical_payload(&self) -> Vec<u8> {
        let payload = UnsignedPayload {
            from: &self.from,
            kind: &self.kind,
            amount: self.amount,
            fee: self.fee,
            timestamp: self.timestamp,
            salt: &self.salt,
        };
        bincode::serialize(&payload).expect("serialization should not fail")
    }

    /// Recompute the id from the payload.
    pub fn compute_id(&self) -> Hash {
        hash_tagged("stakechain/tx", &[&self.canonical_payload()])
    }

    /// Digest of the full transaction, signature included. Used as the merkle leaf.
    pub fn hash(&self) -> Hash {
        let encoded = bincode::serialize(self).expect("serialization should not fail");
        hash(&encoded)
    }

    pub fn recipient(&self) -> Option<&Address> {
        match &self.kind {
            TransactionKind::Transfer { to } => Some(to),
            _ => None,
        }
    }

    pub fn validator(&self) -> Option<&ValidatorId> {
        match &self.kind {
            TransactionKind::Stake { validator } | TransactionKind::Unstake { validator } => {
                Some(validator)
            }
            TransactionKind::Transfer { .. } => None,
        }
    }

    /// Balance the sender must hold for this transaction to apply.
    pub fn required_balance(&self) -> Amount {
        match self.kind {
            TransactionKind::Transfer { .. } | TransactionKind::Stake { .. } => {
                self.amount.saturating_add(self.fee)
            }
            TransactionKind::Unstake { .. } => self.fee,
        }
    }

    /// Structural validity. Does not look at the signature or at any balance.
    pub fn is_valid(&self) -> bool {
        if self.amount == 0 || self.from.is_zero() {
            return false;
        }
        if self.fee == 0 || self.fee != fee_for(&self.kind, self.amount) {
            return false;
        }
        let kind_ok = match &self.kind {
            TransactionKind::Transfer { to } => !to.is_zero() && *to != self.from,
            TransactionKind::Stake { validator } | TransactionKind::Unstake { validator } => {
                !validator.is_empty()
            }
        };
        kind_ok && self.id == self.compute_id()
    }

    pub fn sign(&mut self, signer: &impl Signer) {
        self.signature = signer.sign_digest(&self.id);
    }

    pub fn signed(mut self, signer: &impl Signer) -> Self {
        self.sign(signer);
        self
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Check the signature against `verifier`, which must own the sender address.
    pub fn verify_signature(&self, verifier: &impl Verifier) -> Result<(), TransactionError> {
        if !self.is_signed() {
            return Err(TransactionError::MissingSignature);
        }
        let signer = verifier.address();
        if signer != self.from {
            return Err(TransactionError::SenderMismatch {
                signer,
                from: self.from,
            });
        }
        verifier.verify_digest(&self.compute_id(), &self.signature)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::tokens;
    use crate::crypto::Keypair;

    fn bob() -> Address {
        Address::derive("bob")
    }

    #[test]
    fn test_positive_amounts_are_valid() {
        let from = Address::derive("alice");
        for amount in [1, 999, tokens(5)] {
            assert!(Transaction::transfer(from, bob(), amount).is_valid());
            assert!(Transaction::stake(from, "validator-1".into(), amount).is_valid());
            assert!(Transaction::unstake(from, "validator-2".into(), amount).is_valid());
        }
    }

    #[test]
    fn test_zero_amount_is_invalid() {
        let from = Address::derive("alice");
        assert!(!Transaction::transfer(from, bob(), 0).is_valid());
        assert!(!Transaction::stake(from, "validator-1".into(), 0).is_valid());
    }

    #[test]
    fn test_malformed_fields_are_invalid() {
        let from = Address::derive("alice");
        assert!(!Transaction::transfer(Address::ZERO, bob(), 10).is_valid());
        assert!(!Transaction::transfer(from, Address::ZERO, 10).is_valid());
        assert!(!Transaction::transfer(from, from, 10).is_valid());
        assert!(!Transaction::stake(from, "".into(), 10).is_valid());

        let mut tampered = Transaction::transfer(from, bob(), 10);
        tampered.amount = 11;
        assert!(!tampered.is_valid());

        let mut cheap = Transaction::transfer(from, bob(), 10);
        cheap.fee = 0;
        assert!(!cheap.is_valid());
    }

    #[test]
    fn test_identical_fields_get_distinct_ids() {
        let from = Address::derive("alice");
        let a = Transaction::with_timestamp(from, TransactionKind::Transfer { to: bob() }, 5, 42);
        let b = Transaction::with_timestamp(from, TransactionKind::Transfer { to: bob() }, 5, 42);
        assert_ne!(a.id, b.id);
        assert!(a.is_valid() && b.is_valid());
    }

    #[test]
    fn test_fee_is_positive_and_grows_with_amount() {
        let transfer = TransactionKind::Transfer { to: bob() };
        let stake = TransactionKind::Stake { validator: "validator-1".into() };
        assert_eq!(fee_for(&transfer, 1), 1_000);
        assert_eq!(fee_for(&stake, 1), 2_000);
        assert_eq!(fee_for(&transfer, tokens(100)), 1_000 + 10_000);
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = Keypair::generate();
        let tx = Transaction::transfer(Signer::address(&kp), bob(), 10).signed(&kp);
        assert!(tx.verify_signature(&kp.public_key()).is_ok());
    }

    #[test]
    fn test_unsigned_is_rejected() {
        let kp = Keypair::generate();
        let tx = Transaction::transfer(Signer::address(&kp), bob(), 10);
        assert_eq!(
            tx.verify_signature(&kp.public_key()),
            Err(TransactionError::MissingSignature)
        );
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let alice = Keypair::generate();
        let mallory = Keypair::generate();
        let mut tx = Transaction::transfer(Signer::address(&alice), bob(), 10);
        tx.sign(&mallory);

        assert!(matches!(
            tx.verify_signature(&mallory.public_key()),
            Err(TransactionError::SenderMismatch { .. })
        ));
        assert!(matches!(
            tx.verify_signature(&alice.public_key()),
            Err(TransactionError::VerificationFailed(_))
        ));
    }

    #[test]
    fn test_tampering_breaks_signature() {
        let kp = Keypair::generate();
        let mut tx = Transaction::transfer(Signer::address(&kp), bob(), 10).signed(&kp);
        tx.amount = 1_000;
        assert!(tx.verify_signature(&kp.public_key()).is_err());
    }

    #[test]
    fn test_hash_covers_signature() {
        let kp = Keypair::generate();
        let unsigned = Transaction::transfer(Signer::address(&kp), bob(), 10);
        let signed = unsigned.clone().signed(&kp);
        assert_eq!(unsigned.id, signed.id);
        assert_ne!(unsigned.hash(), signed.hash());
    }

    #[test]
    fn test_required_balance() {
        let from = Address::derive("alice");
        let t = Transaction::transfer(from, bob(), tokens(1));
        assert_eq!(t.required_balance(), tokens(1) + t.fee);
        let u = Transaction::unstake(from, "validator-1".into(), tokens(1));
        assert_eq!(u.required_balance(), u.fee);
        assert_eq!(u.validator().map(ValidatorId::as_str), Some("validator-1"));
        assert_eq!(t.recipient(), Some(&bob()));
    }
}
