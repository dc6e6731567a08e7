//! Reference ledger for shielded transitions.
//!
//! The ledger owns the canonical commitment tree, the set of spent
//! nullifiers and the next free leaf index. A submission is admitted only if
//! its old root is the current root, its nullifiers are unspent, its proof
//! verifies, and inserting its commitments reproduces the proven root.

use ark_bn254::Fr;
use shielded_circuits::{to_decimal, TransitionKind, TreeError};
use shielded_prover::ProverError;
use thiserror::Error;

mod ledger;
mod submission;

pub use ledger::{Ledger, LedgerEvent, Receipt};
pub use submission::{SignalView, Submission};

/// Reasons a submission is rejected
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("stale root: ledger is at {current}, submission starts from {submitted}")]
    StaleRoot { current: String, submitted: String },

    #[error("nullifier {0} has already been spent")]
    NullifierAlreadySpent(String),

    #[error("{0} proof did not verify")]
    ProofInvalid(TransitionKind),

    #[error("inserting the submitted commitments gives root {computed}, proof claims {claimed}")]
    RootMismatch { claimed: String, computed: String },

    #[error("tree is full ({capacity} leaves)")]
    TreeFull { capacity: u64 },

    #[error("malformed submission: {0}")]
    MalformedSubmission(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Prover(#[from] ProverError),
}

impl LedgerError {
    pub(crate) fn stale_root(current: Fr, submitted: Fr) -> Self {
        Self::StaleRoot {
            current: to_decimal(&current),
            submitted: to_decimal(&submitted),
        }
    }

    pub(crate) fn root_mismatch(claimed: Fr, computed: Fr) -> Self {
        Self::RootMismatch {
            claimed: to_decimal(&claimed),
            computed: to_decimal(&computed),
        }
    }
}
