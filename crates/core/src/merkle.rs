//! Binary merkle commitments over ordered transaction digests.
//!
//! Levels are built by hashing adjacent pairs; an odd trailing node is paired with itself.
//! Interior nodes carry a `node` domain tag so a leaf can never be confused with a subtree.

use crate::hash::{hash_tagged, Hash};
use serde::{Deserialize, Serialize};

/// Root of an empty transaction list.
pub const EMPTY_MERKLE_ROOT: Hash = Hash::ZERO;

const NODE_TAG: &str = "stakechain/merkle-node";

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    hash_tagged(NODE_TAG, &[left.as_ref(), right.as_ref()])
}

fn parent_level(level: &[Hash]) -> Vec<Hash> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [single] => hash_pair(single, single),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// Compute the merkle root of an ordered list of leaf digests.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    match leaves {
        [] => EMPTY_MERKLE_ROOT,
        [only] => *only,
        _ => {
            let mut level = parent_level(leaves);
            while level.len() > 1 {
                level = parent_level(&level);
            }
            level[0]
        }
    }
}

/// Which side of the running digest a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Inclusion proof for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf: Hash,
    pub index: usize,
    pub path: Vec<(Side, Hash)>,
}

impl MerkleProof {
    /// Fold the path and compare against `root`.
    pub fn verify(&self, root: &Hash) -> bool {
        let computed = self
            .path
            .iter()
            .fold(self.leaf, |acc, (side, sibling)| match side {
                Side::Left => hash_pair(sibling, &acc),
                Side::Right => hash_pair(&acc, sibling),
            });
        computed == *root
    }
}

/// Every level of the tree, leaves first, kept for proof generation.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

impl MerkleTree {
    pub fn new(leaves: &[Hash]) -> Self {
        let mut levels = vec![leaves.to_vec()];
        while levels[levels.len() - 1].len() > 1 {
            let next = parent_level(&levels[levels.len() - 1]);
            levels.push(next);
        }
        Self { levels }
    }

    pub fn root(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(EMPTY_MERKLE_ROOT)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Build the inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = *self.levels[0].get(index)?;
        let mut path = Vec::with_capacity(self.levels.len());
        let mut idx = index;

        for level in &self.levels[..self.levels.len() - 1] {
            let entry = if idx % 2 == 0 {
                // Odd tail: the node is its own sibling.
                (Side::Right, *level.get(idx + 1).unwrap_or(&level[idx]))
            } else {
                (Side::Left, level[idx - 1])
            };
            path.push(entry);
            idx /= 2;
        }

        Some(MerkleProof { leaf, index, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;

    fn leaves(n: usize) -> Vec<Hash> {
        (0..n).map(|i| hash(&(i as u64).to_le_bytes())).collect()
    }

    #[test]
    fn test_empty_root_is_fixed() {
        assert_eq!(merkle_root(&[]), EMPTY_MERKLE_ROOT);
        assert_eq!(MerkleTree::new(&[]).root(), EMPTY_MERKLE_ROOT);
    }

    #[test]
    fn test_single_leaf_is_root() {
        let l = leaves(1);
        assert_eq!(merkle_root(&l), l[0]);
    }

    #[test]
    fn test_pair_uses_node_tag() {
        let l = leaves(2);
        assert_eq!(merkle_root(&l), hash_pair(&l[0], &l[1]));
    }

    #[test]
    fn test_different_sets_differ() {
        let a = leaves(3);
        let mut b = a.clone();
        b[2] = hash(b"other");
        assert_ne!(merkle_root(&a), merkle_root(&b));

        let mut reordered = a.clone();
        reordered.swap(0, 1);
        assert_ne!(merkle_root(&a), merkle_root(&reordered));
    }

    #[test]
    fn test_tree_matches_function() {
        for n in 1..12 {
            let l = leaves(n);
            assert_eq!(MerkleTree::new(&l).root(), merkle_root(&l), "n = {n}");
        }
    }

    #[test]
    fn test_every_proof_verifies() {
        for n in [1usize, 2, 5, 8] {
            let l = leaves(n);
            let tree = MerkleTree::new(&l);
            let root = tree.root();
            for i in 0..n {
                let proof = tree.proof(i).unwrap();
                assert!(proof.verify(&root), "leaf {i} of {n}");
            }
            assert!(tree.proof(n).is_none());
        }
    }

    #[test]
    fn test_proof_rejects_wrong_root() {
        let tree = MerkleTree::new(&leaves(4));
        let proof = tree.proof(1).unwrap();
        assert!(!proof.verify(&hash(b"forged")));
    }
}
