use std::path::PathBuf;

use thiserror::Error;

use crate::encoding::CodecError;

/// Errors raised by the Merkle tree engine and its artifact loader.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("leaf index {index} out of range for a tree with {capacity} leaves")]
    IndexOutOfRange { index: u64, capacity: u64 },

    #[error("unsupported tree depth {0}")]
    UnsupportedDepth(usize),

    #[error("malformed path: {siblings} siblings but {directions} direction bits")]
    MalformedPath { siblings: usize, directions: usize },

    #[error("precomputed empty tree not found at {0}")]
    ArtifactMissing(PathBuf),

    #[error("precomputed empty tree is inconsistent: {0}")]
    ArtifactMismatch(String),

    #[error("malformed field element in artifact: {0}")]
    Codec(#[from] CodecError),

    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
}
