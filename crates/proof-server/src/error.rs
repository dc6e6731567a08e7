//! Mapping from domain errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shielded_circuits::{CodecError, TransitionError, TreeError};
use shielded_ledger::LedgerError;
use shielded_prover::ProverError;
use thiserror::Error;

/// Application error type that maps to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// The request conflicts with ledger state (stale root, spent nullifier)
    #[error("{0}")]
    Conflict(String),
    /// Well-formed but cannot be proven or does not verify
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CodecError> for ApiError {
    fn from(e: CodecError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<TreeError> for ApiError {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::IndexOutOfRange { .. } => Self::NotFound(e.to_string()),
            TreeError::MalformedPath { .. } | TreeError::Codec(_) => {
                Self::BadRequest(e.to_string())
            }
            _ => Self::Internal(e.to_string()),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Tree(tree) => tree.into(),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<ProverError> for ApiError {
    fn from(e: ProverError) -> Self {
        match e {
            ProverError::PredicateUnsatisfiable { .. } => Self::Unprocessable(e.to_string()),
            ProverError::Hex(_) | ProverError::Serialization(_) | ProverError::Verify(_) => {
                Self::BadRequest(e.to_string())
            }
            _ => Self::Internal(e.to_string()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::StaleRoot { .. }
            | LedgerError::NullifierAlreadySpent(_)
            | LedgerError::TreeFull { .. } => Self::Conflict(e.to_string()),
            LedgerError::ProofInvalid(_) | LedgerError::RootMismatch { .. } => {
                Self::Unprocessable(e.to_string())
            }
            LedgerError::MalformedSubmission(_) => Self::BadRequest(e.to_string()),
            LedgerError::Tree(tree) => tree.into(),
            LedgerError::Prover(prover) => prover.into(),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("proving task failed: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
