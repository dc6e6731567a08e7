//! Proof generation for shielded ledger transitions.
//!
//! - [`setup`]: Groth16 key generation and key persistence
//! - [`prove`]: Satisfiability-checked proving for each circuit
//! - [`verify`]: Verification against ordered public signals
//! - [`system`]: The [`ProofSystem`] capability used by the ledger

use std::path::PathBuf;

use ark_relations::r1cs::SynthesisError;
use shielded_circuits::TransitionKind;
use thiserror::Error;

pub mod prove;
pub mod setup;
pub mod system;
pub mod verify;

pub use prove::ProofResult;
pub use setup::{CircuitKeys, KeyPair};
pub use system::{Groth16ProofSystem, MockProof, MockProofSystem, ProofSystem};
pub use verify::VerifyError;

/// Errors during setup, proving and key handling
#[derive(Error, Debug)]
pub enum ProverError {
    #[error("{kind} predicate is unsatisfiable (first failing constraint: {constraint})")]
    PredicateUnsatisfiable {
        kind: TransitionKind,
        constraint: String,
    },

    #[error("circuit synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("witness depth {actual} does not match key depth {expected}")]
    DepthMismatch { expected: usize, actual: usize },

    #[error("circuit keys not found in {0}")]
    KeysMissing(PathBuf),

    #[error("circuit keys are incompatible: {0}")]
    IncompatibleKeys(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] ark_serialize::SerializationError),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Verify(#[from] VerifyError),
}
