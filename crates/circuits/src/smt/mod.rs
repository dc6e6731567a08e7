//! Fixed-depth Merkle tree of commitments.
//!
//! This module provides:
//! - A level-arena tree with O(depth) single-leaf updates and cheap snapshots
//! - The precomputed all-empty tree artifact every fresh tree starts from
//! - Merkle paths and the in-circuit gadgets that fold them into a root

mod empty;
mod error;
mod gadgets;
mod proof;
mod tree;

pub use empty::EmptyTree;
pub use error::TreeError;
pub use gadgets::{compute_root_from_path, verify_membership, MerklePathVar};
pub use proof::MerklePath;
pub use tree::{LeafUpdate, MerkleTree};

/// Depth used by deployed ledgers (2^20 leaves).
pub const DEFAULT_DEPTH: usize = 20;

/// Largest depth the engine accepts; leaf indices must fit in a `u64`
/// and the arena in memory.
pub const MAX_DEPTH: usize = 32;
