//! Level-arena Merkle tree with O(depth) single-leaf updates.

use std::fmt;
use std::sync::Arc;

use ark_crypto_primitives::sponge::{poseidon::PoseidonConfig, Absorb};
use ark_ff::PrimeField;

use super::{EmptyTree, MerklePath, TreeError};
use crate::hash::hash_two;

/// Result of a single-leaf update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafUpdate<F> {
    pub root: F,
    pub path: MerklePath<F>,
}

/// Fixed-depth binary Merkle tree.
///
/// `levels[0]` holds the 2^D leaves and `levels[D]` the root. The arena is
/// shared copy-on-write: cloning (see [`MerkleTree::snapshot`]) is O(1), and
/// the first write after a clone copies the arena once, never rehashing it.
#[derive(Clone)]
pub struct MerkleTree<F: PrimeField> {
    depth: usize,
    levels: Arc<Vec<Vec<F>>>,
    config: Arc<PoseidonConfig<F>>,
}

impl<F: PrimeField + Absorb> MerkleTree<F> {
    /// Start a tree from the precomputed empty arena.
    pub fn from_empty(empty: &EmptyTree<F>) -> Self {
        Self {
            depth: empty.depth(),
            levels: empty.shared_levels(),
            config: Arc::clone(empty.config()),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of leaves, 2^D.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    pub fn config(&self) -> &Arc<PoseidonConfig<F>> {
        &self.config
    }

    pub fn root(&self) -> F {
        self.levels[self.depth][0]
    }

    fn check_index(&self, index: u64) -> Result<usize, TreeError> {
        if index >= self.capacity() {
            return Err(TreeError::IndexOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }
        Ok(index as usize)
    }

    pub fn leaf(&self, index: u64) -> Result<F, TreeError> {
        let index = self.check_index(index)?;
        Ok(self.levels[0][index])
    }

    /// Siblings and direction bits for `index` in the current state.
    pub fn path(&self, index: u64) -> Result<MerklePath<F>, TreeError> {
        let mut current = self.check_index(index)?;
        let mut siblings = Vec::with_capacity(self.depth);
        let mut directions = Vec::with_capacity(self.depth);

        for level in &self.levels[..self.depth] {
            siblings.push(level[current ^ 1]);
            directions.push(current & 1 == 1);
            current >>= 1;
        }

        MerklePath::new(siblings, directions)
    }

    /// Replace leaf `index` and recompute exactly its D ancestors.
    pub fn update_leaf(&mut self, index: u64, value: F) -> Result<LeafUpdate<F>, TreeError> {
        let mut current = self.check_index(index)?;
        let levels = Arc::make_mut(&mut self.levels);

        levels[0][current] = value;
        for d in 0..self.depth {
            let node = levels[d][current];
            let sibling = levels[d][current ^ 1];
            let parent = if current & 1 == 0 {
                hash_two(&self.config, node, sibling)
            } else {
                hash_two(&self.config, sibling, node)
            };
            current >>= 1;
            levels[d + 1][current] = parent;
        }

        Ok(LeafUpdate {
            root: self.root(),
            path: self.path(index)?,
        })
    }

    /// Immutable view of the current state for readers such as provers.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}

impl<F: PrimeField> fmt::Debug for MerkleTree<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTree")
            .field("depth", &self.depth)
            .field("root", &self.levels[self.depth][0])
            .finish()
    }
}
