//! Merkle inclusion paths.

use ark_crypto_primitives::sponge::{poseidon::PoseidonConfig, Absorb};
use ark_ff::PrimeField;

use super::TreeError;
use crate::hash::hash_two;

/// Sibling hashes and direction bits from a leaf up to the root.
///
/// `directions[d]` is `true` when the node at level `d` is a right child,
/// i.e. the sibling goes on the left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath<F> {
    siblings: Vec<F>,
    directions: Vec<bool>,
}

impl<F: PrimeField + Absorb> MerklePath<F> {
    pub fn new(siblings: Vec<F>, directions: Vec<bool>) -> Result<Self, TreeError> {
        if siblings.len() != directions.len() {
            return Err(TreeError::MalformedPath {
                siblings: siblings.len(),
                directions: directions.len(),
            });
        }
        Ok(Self {
            siblings,
            directions,
        })
    }

    pub fn siblings(&self) -> &[F] {
        &self.siblings
    }

    pub fn directions(&self) -> &[bool] {
        &self.directions
    }

    /// Direction bits as 0/1, lowest level first.
    pub fn direction_bits(&self) -> Vec<u8> {
        self.directions.iter().map(|&bit| u8::from(bit)).collect()
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// The leaf index encoded by the direction bits (LSB first).
    pub fn leaf_index(&self) -> u64 {
        self.directions
            .iter()
            .rev()
            .fold(0u64, |index, &bit| (index << 1) | u64::from(bit))
    }

    /// Fold `leaf` with the siblings to recompute a root.
    pub fn compute_root(&self, config: &PoseidonConfig<F>, leaf: F) -> F {
        self.siblings
            .iter()
            .zip(&self.directions)
            .fold(leaf, |current, (&sibling, &is_right)| {
                if is_right {
                    hash_two(config, sibling, current)
                } else {
                    hash_two(config, current, sibling)
                }
            })
    }

    pub fn verify(&self, config: &PoseidonConfig<F>, leaf: F, root: F) -> bool {
        self.compute_root(config, leaf) == root
    }
}
