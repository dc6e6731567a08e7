//! Circuits and state for a shielded balance ledger.
//!
//! This crate provides:
//! - Poseidon hashing, note commitments and spend nullifiers
//! - A fixed-depth Merkle tree of commitments and its precomputed empty state
//! - `DepositCircuit`: Prove a valid deposit into a fresh leaf
//! - `WithdrawalCircuit`: Prove a valid withdrawal from a note in the tree
//! - `SwapCircuit`: Prove a withdrawal and a deposit chained through one root
//! - Client-side planners assembling transitions from a working tree

pub mod commitment;
pub mod deposit;
pub mod encoding;
pub mod hash;
pub mod leg;
pub mod range_check;
pub mod smt;
pub mod swap;
pub mod transition;
pub mod withdrawal;


pub use commitment::{commit, nullifier, spend_nullifier, Note, BOOTSTRAP_NULLIFIER};
pub use deposit::DepositCircuit;
pub use encoding::{parse_field, to_decimal, to_hex, CodecError};
pub use hash::{empty_leaf, poseidon_config, poseidon_hash};
pub use smt::{EmptyTree, LeafUpdate, MerklePath, MerkleTree, TreeError, DEFAULT_DEPTH};
pub use swap::SwapCircuit;
pub use transition::{
    plan_deposit, plan_swap, plan_withdrawal, LegPublicInputs, LegRequest, LegTransition,
    LegWitness, SwapPublicInputs, SwapTransition, Transition, TransitionError, TransitionKind,
};
pub use withdrawal::WithdrawalCircuit;

use ark_bn254::Fr;

/// Common type aliases
pub type ConstraintF = Fr;
