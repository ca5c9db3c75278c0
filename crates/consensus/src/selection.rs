//! Stake-weighted block producer selection.
//!
//! Eligible validators (active, non-zero stake) are laid out in id order as consecutive
//! intervals of width `total_stake`. A draw in `[0, total)` is derived from a blake3 digest of
//! the seed and the full `(id, stake)` snapshot, so any implementation holding the same state
//! and seed picks the same producer.

use stakechain_core::{hash_tagged, Validator};
use thiserror::Error;

const SELECTION_TAG: &str = "stakechain/select";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no active validator holds stake")]
    NoActiveStake,
}

/// Deterministic draw in `[0, total)` for `seed` over `eligible`.
fn draw(seed: u64, eligible: &[&Validator], total: u128) -> u128 {
    let mut transcript = Vec::with_capacity(12 + eligible.len() * 32);
    transcript.extend_from_slice(&seed.to_le_bytes());
    transcript.extend_from_slice(&(eligible.len() as u32).to_le_bytes());
    for v in eligible {
        let id = v.id.as_str().as_bytes();
        transcript.extend_from_slice(&(id.len() as u32).to_le_bytes());
        transcript.extend_from_slice(id);
        transcript.extend_from_slice(&v.total_stake.to_le_bytes());
    }
    hash_tagged(SELECTION_TAG, &[&transcript]).low_u128() % total
}

/// Pick one validator from `candidates` with probability proportional to its stake.
///
/// `candidates` must be in a stable order (the registry yields id order). Inactive and
/// zero-stake validators are skipped.
pub fn select_validator<'a>(
    candidates: impl IntoIterator<Item = &'a Validator>,
    seed: u64,
) -> Result<&'a Validator, SelectionError> {
    let eligible: Vec<&Validator> = candidates.into_iter().filter(|v| v.is_eligible()).collect();
    let total: u128 = eligible.iter().map(|v| v.total_stake as u128).sum();
    if total == 0 {
        return Err(SelectionError::NoActiveStake);
    }

    let point = draw(seed, &eligible, total);
    let mut upper = 0u128;
    for v in eligible.iter().copied() {
        upper += v.total_stake as u128;
        if point < upper {
            return Ok(v);
        }
    }
    // point < total == final upper bound
    Err(SelectionError::NoActiveStake)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stakechain_core::{Address, Amount, ValidatorId};

    fn validator(id: &str, stake: Amount) -> Validator {
        let mut v = Validator::new(ValidatorId::new(id), Address::derive(id), 500);
        v.total_stake = stake;
        v
    }

    #[test]
    fn test_same_inputs_same_choice() {
        let set = vec![validator("a", 10), validator("b", 20), validator("c", 30)];
        for seed in 0..50 {
            let first = select_validator(&set, seed).unwrap();
            let second = select_validator(&set, seed).unwrap();
            assert_eq!(first.id, second.id);
        }
    }

    #[test]
    fn test_empty_or_unstaked_set() {
        let none: Vec<Validator> = Vec::new();
        assert_eq!(select_validator(&none, 1).unwrap_err(), SelectionError::NoActiveStake);

        let mut inactive = validator("a", 10);
        inactive.active = false;
        let set = vec![inactive, validator("b", 0)];
        assert_eq!(select_validator(&set, 1).unwrap_err(), SelectionError::NoActiveStake);
    }

    #[test]
    fn test_only_eligible_validator_always_wins() {
        let mut inactive = validator("a", 1_000);
        inactive.active = false;
        let set = vec![inactive, validator("b", 1), validator("c", 0)];
        for seed in 0..100 {
            assert_eq!(select_validator(&set, seed).unwrap().id.as_str(), "b");
        }
    }

    #[test]
    fn test_frequency_tracks_stake() {
        let set = vec![validator("small", 100), validator("large", 300)];
        let rounds = 4_000u64;
        let large = (0..rounds)
            .filter(|&seed| select_validator(&set, seed).unwrap().id.as_str() == "large")
            .count() as f64;
        let share = large / rounds as f64;
        assert!((0.70..0.80).contains(&share), "large share was {share}");
    }

    #[test]
    fn test_snapshot_changes_draw() {
        let a = vec![validator("a", 50), validator("b", 50)];
        let b = vec![validator("a", 51), validator("b", 49)];
        let differs = (0..64).any(|seed| {
            draw(seed, &a.iter().collect::<Vec<_>>(), 100)
                != draw(seed, &b.iter().collect::<Vec<_>>(), 100)
        });
        assert!(differs);
    }
}
