//! API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use shielded_prover::ProofSystem;

use crate::handlers::{self, SharedState};

/// Create API routes
pub fn api_routes<P: ProofSystem + 'static>() -> Router<SharedState<P>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Ledger state
        .route("/api/tree", get(handlers::get_tree::<P>))
        .route("/api/tree/path/:index", get(handlers::get_path::<P>))
        // Proof generation endpoints
        .route("/api/prove/deposit", post(handlers::prove_deposit::<P>))
        .route("/api/prove/withdrawal", post(handlers::prove_withdrawal::<P>))
        .route("/api/prove/swap", post(handlers::prove_swap::<P>))
        // Ledger updates
        .route("/api/submit", post(handlers::submit::<P>))
        // Utility endpoints
        .route("/api/commitment", post(handlers::create_commitment::<P>))
        .route("/api/randomness", post(handlers::generate_randomness))
}
