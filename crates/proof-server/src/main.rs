//! HTTP API server for shielded ledger proving and submission.

use std::sync::Arc;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use axum::Router;
use shielded_circuits::{poseidon_config, EmptyTree, TreeError};
use shielded_ledger::Ledger;
use shielded_prover::setup::{setup_all_circuits, CircuitKeys};
use shielded_prover::{Groth16ProofSystem, MockProofSystem, ProofSystem, ProverError};
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod routes;

use config::{ConfigError, ProverKind, ServerConfig};
use handlers::SharedState;

/// Application state shared across handlers
pub struct AppState<P: ProofSystem> {
    pub ledger: Ledger<Arc<P>>,
    /// Same instance the ledger verifies with; used for proving off-lock
    pub prover: Arc<P>,
    pub config: Arc<PoseidonConfig<Fr>>,
}

impl<P: ProofSystem> AppState<P> {
    pub fn new(empty: &EmptyTree<Fr>, prover: P) -> Self {
        let prover = Arc::new(prover);
        Self {
            ledger: Ledger::new(empty, prover.clone()),
            prover,
            config: empty.config().clone(),
        }
    }
}

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Prover(#[from] ProverError),
    #[error("circuit keys in {dir} are for depth {keys}, server configured for {configured}")]
    KeyDepth {
        dir: String,
        keys: usize,
        configured: usize,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Build the router for a given state.
pub fn app<P: ProofSystem + 'static>(state: SharedState<P>) -> Router {
    Router::new()
        .merge(routes::api_routes::<P>())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

fn load_or_setup_keys(config: &ServerConfig) -> Result<CircuitKeys, StartupError> {
    let keys_dir = config.keys_dir.as_path();
    let keys = if keys_dir.exists() {
        tracing::info!("Loading existing circuit keys from {:?}", keys_dir);
        CircuitKeys::load_from_directory(keys_dir)?
    } else {
        tracing::info!("Running trusted setup (this may take a while)...");
        let keys = setup_all_circuits(config.tree_depth)?;
        keys.save_to_directory(keys_dir)?;
        tracing::info!("Circuit keys saved to {:?}", keys_dir);
        keys
    };

    if keys.depth != config.tree_depth {
        return Err(StartupError::KeyDepth {
            dir: keys_dir.display().to_string(),
            keys: keys.depth,
            configured: config.tree_depth,
        });
    }
    Ok(keys)
}

async fn serve<P: ProofSystem + 'static>(
    config: &ServerConfig,
    empty: &EmptyTree<Fr>,
    prover: P,
) -> Result<(), StartupError> {
    let state = Arc::new(RwLock::new(AppState::new(empty, prover)));

    tracing::info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting shielded ledger server...");
    let config = ServerConfig::from_env()?;
    let poseidon = Arc::new(poseidon_config::<Fr>());

    let empty = match EmptyTree::load(poseidon.clone(), config.tree_depth, &config.tree_artifact) {
        Ok(empty) => empty,
        Err(e @ TreeError::ArtifactMissing(_)) => {
            tracing::error!(
                "{e}; generate it with `precompute-tree --depth {} --out {}`",
                config.tree_depth,
                config.tree_artifact.display()
            );
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(root = %shielded_circuits::to_decimal(&empty.root()), "empty tree ready");

    match config.prover {
        ProverKind::Groth16 => {
            let keys = tokio::task::block_in_place(|| load_or_setup_keys(&config))?;
            let prover = Groth16ProofSystem::new(Arc::new(keys), poseidon);
            serve(&config, &empty, prover).await
        }
        ProverKind::Mock => {
            tracing::warn!("Using the mock proof system; proofs are not zero-knowledge");
            serve(&config, &empty, MockProofSystem::new(poseidon)).await
        }
    }
}
