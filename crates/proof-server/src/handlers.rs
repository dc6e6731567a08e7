//! Request handlers and their JSON bodies.
//!
//! Field elements travel as decimal strings (hex with `0x` is accepted on
//! input), amounts and balances as decimal `u128` strings, proofs as hex.

use std::sync::Arc;

use ark_bn254::Fr;
use ark_ff::UniformRand;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use shielded_circuits::{
    commit, parse_field, plan_deposit, plan_swap, plan_withdrawal, to_decimal, LegRequest,
    MerkleTree, Note, Transition, TransitionKind,
};
use shielded_ledger::{Receipt, Submission};
use shielded_prover::ProofSystem;
use tokio::sync::RwLock;

use crate::error::ApiError;
use crate::AppState;

pub type SharedState<P> = Arc<RwLock<AppState<P>>>;

fn parse_amount(value: &str, field: &str) -> Result<u128, ApiError> {
    value
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid {field} {value:?}: {e}")))
}

fn decimals(values: &[Fr]) -> Vec<String> {
    values.iter().map(to_decimal).collect()
}

fn parse_fields(values: &[String]) -> Result<Vec<Fr>, ApiError> {
    Ok(values
        .iter()
        .map(|value| parse_field(value))
        .collect::<Result<Vec<Fr>, _>>()?)
}

// ── Request / response bodies ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteDto {
    pub currency: String,
    pub balance: String,
    pub randomness: String,
}

impl NoteDto {
    fn to_note(&self) -> Result<Note<Fr>, ApiError> {
        Ok(Note::new(
            parse_field(&self.currency)?,
            parse_amount(&self.balance, "balance")?,
            parse_field(&self.randomness)?,
        ))
    }
}

impl From<&Note<Fr>> for NoteDto {
    fn from(note: &Note<Fr>) -> Self {
        Self {
            currency: to_decimal(&note.currency),
            balance: note.balance.to_string(),
            randomness: to_decimal(&note.randomness),
        }
    }
}

/// One leg as requested by a client. The fresh leaf is assigned by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct LegRequestDto {
    pub secret: String,
    pub note: NoteDto,
    #[serde(default)]
    pub note_index: Option<u64>,
    pub amount: String,
    pub new_randomness: String,
}

impl LegRequestDto {
    fn to_request(&self, leaf_index: u64) -> Result<LegRequest<Fr>, ApiError> {
        Ok(LegRequest {
            secret: parse_field(&self.secret)?,
            note: self.note.to_note()?,
            note_index: self.note_index,
            amount: parse_amount(&self.amount, "amount")?,
            new_randomness: parse_field(&self.new_randomness)?,
            leaf_index,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SwapRequestDto {
    pub withdrawal: LegRequestDto,
    pub deposit: LegRequestDto,
}

/// A proof ready for `/api/submit`, plus the notes the client must keep.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProveResponse {
    pub kind: TransitionKind,
    pub proof: String,
    pub public_inputs: Vec<String>,
    pub commitments: Vec<String>,
    pub leaf_indices: Vec<u64>,
    pub new_notes: Vec<NoteDto>,
}

impl ProveResponse {
    fn new(transition: &Transition<Fr>, proof: String) -> Self {
        let (leaf_indices, commitments): (Vec<u64>, Vec<Fr>) =
            transition.new_commitments().into_iter().unzip();
        let new_notes = match transition {
            Transition::Deposit(leg) | Transition::Withdrawal(leg) => {
                vec![NoteDto::from(&leg.new_note)]
            }
            Transition::Swap(swap) => vec![
                NoteDto::from(&swap.withdrawal.new_note),
                NoteDto::from(&swap.deposit.new_note),
            ],
        };

        Self {
            kind: transition.kind(),
            proof,
            public_inputs: decimals(&transition.public_signals()),
            commitments: decimals(&commitments),
            leaf_indices,
            new_notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub kind: TransitionKind,
    pub proof: String,
    pub public_inputs: Vec<String>,
    pub commitments: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiptResponse {
    pub kind: TransitionKind,
    pub old_root: String,
    pub new_root: String,
    pub leaf_indices: Vec<u64>,
    pub next_index: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TreeResponse {
    pub root: String,
    pub depth: usize,
    pub next_index: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PathResponse {
    pub index: u64,
    pub leaf: String,
    pub siblings: Vec<String>,
    /// 0 = left child, 1 = right child, leaf level first
    pub directions: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommitmentResponse {
    pub commitment: String,
}

// ── Handlers ──

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn get_tree<P: ProofSystem + 'static>(
    State(state): State<SharedState<P>>,
) -> Json<TreeResponse> {
    let state = state.read().await;
    Json(TreeResponse {
        root: to_decimal(&state.ledger.root()),
        depth: state.ledger.depth(),
        next_index: state.ledger.next_free_leaf_index(),
    })
}

pub async fn get_path<P: ProofSystem + 'static>(
    State(state): State<SharedState<P>>,
    Path(index): Path<u64>,
) -> Result<Json<PathResponse>, ApiError> {
    let state = state.read().await;
    let tree = state.ledger.tree();
    let path = tree.path(index)?;

    Ok(Json(PathResponse {
        index,
        leaf: to_decimal(&tree.leaf(index)?),
        siblings: decimals(path.siblings()),
        directions: path.direction_bits(),
    }))
}

/// Plan on a snapshot taken at the current free index, then prove off the
/// async runtime.
async fn plan_and_prove<P, F>(
    state: &SharedState<P>,
    plan: F,
) -> Result<Json<ProveResponse>, ApiError>
where
    P: ProofSystem + 'static,
    F: FnOnce(&mut MerkleTree<Fr>, u64) -> Result<Transition<Fr>, ApiError> + Send + 'static,
{
    let (mut tree, next_index, prover) = {
        let state = state.read().await;
        (
            state.ledger.snapshot(),
            state.ledger.next_free_leaf_index(),
            state.prover.clone(),
        )
    };

    let response = tokio::task::spawn_blocking(move || -> Result<ProveResponse, ApiError> {
        let transition = plan(&mut tree, next_index)?;
        let proof = prover.prove(&transition)?;
        let bytes = prover.encode_proof(&proof)?;
        Ok(ProveResponse::new(&transition, hex::encode(bytes)))
    })
    .await??;

    tracing::info!(kind = %response.kind, leaves = ?response.leaf_indices, "proof generated");
    Ok(Json(response))
}

pub async fn prove_deposit<P: ProofSystem + 'static>(
    State(state): State<SharedState<P>>,
    Json(req): Json<LegRequestDto>,
) -> Result<Json<ProveResponse>, ApiError> {
    plan_and_prove(&state, move |tree, next_index| {
        let leg = plan_deposit(tree, &req.to_request(next_index)?)?;
        Ok(Transition::Deposit(leg))
    })
    .await
}

pub async fn prove_withdrawal<P: ProofSystem + 'static>(
    State(state): State<SharedState<P>>,
    Json(req): Json<LegRequestDto>,
) -> Result<Json<ProveResponse>, ApiError> {
    plan_and_prove(&state, move |tree, next_index| {
        let leg = plan_withdrawal(tree, &req.to_request(next_index)?)?;
        Ok(Transition::Withdrawal(leg))
    })
    .await
}

pub async fn prove_swap<P: ProofSystem + 'static>(
    State(state): State<SharedState<P>>,
    Json(req): Json<SwapRequestDto>,
) -> Result<Json<ProveResponse>, ApiError> {
    plan_and_prove(&state, move |tree, next_index| {
        let withdrawal = req.withdrawal.to_request(next_index)?;
        let deposit = req.deposit.to_request(next_index + 1)?;
        Ok(Transition::Swap(plan_swap(tree, &withdrawal, &deposit)?))
    })
    .await
}

pub async fn submit<P: ProofSystem + 'static>(
    State(state): State<SharedState<P>>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let public_signals = parse_fields(&req.public_inputs)?;
    let commitments = parse_fields(&req.commitments)?;
    let proof_bytes = hex::decode(req.proof.trim_start_matches("0x"))
        .map_err(|e| ApiError::BadRequest(format!("invalid proof hex: {e}")))?;

    let mut state = state.write().await;
    let proof = state.prover.decode_proof(&proof_bytes)?;
    let Receipt {
        kind,
        old_root,
        new_root,
        leaf_indices,
        ..
    } = state.ledger.submit(Submission {
        kind: req.kind,
        proof,
        public_signals,
        commitments,
    })?;

    Ok(Json(ReceiptResponse {
        kind,
        old_root: to_decimal(&old_root),
        new_root: to_decimal(&new_root),
        leaf_indices,
        next_index: state.ledger.next_free_leaf_index(),
    }))
}

pub async fn create_commitment<P: ProofSystem + 'static>(
    State(state): State<SharedState<P>>,
    Json(note): Json<NoteDto>,
) -> Result<Json<CommitmentResponse>, ApiError> {
    let note = note.to_note()?;
    let config = state.read().await.config.clone();
    let commitment = commit(&config, note.currency, note.balance, note.randomness);

    Ok(Json(CommitmentResponse {
        commitment: to_decimal(&commitment),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RandomnessResponse {
    pub value: String,
}

/// Fresh randomness for note blinding or spend secrets.
pub async fn generate_randomness() -> Json<RandomnessResponse> {
    let value = Fr::rand(&mut rand::thread_rng());
    Json(RandomnessResponse {
        value: to_decimal(&value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use shielded_circuits::{poseidon_config, EmptyTree};
    use shielded_prover::MockProofSystem;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = Arc::new(poseidon_config::<Fr>());
        let empty = EmptyTree::build(config.clone(), 4).unwrap();
        let state = Arc::new(RwLock::new(AppState::new(
            &empty,
            MockProofSystem::new(config),
        )));
        crate::app(state)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn bootstrap_deposit(amount: &str) -> Value {
        json!({
            "secret": "7",
            "note": { "currency": "1", "balance": "0", "randomness": "0" },
            "amount": amount,
            "new_randomness": "11",
        })
    }

    fn submission(bundle: &Value) -> Value {
        json!({
            "kind": bundle["kind"],
            "proof": bundle["proof"],
            "public_inputs": bundle["public_inputs"],
            "commitments": bundle["commitments"],
        })
    }

    #[tokio::test]
    async fn test_health_and_empty_tree() {
        let app = test_app();

        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = call(&app, Method::GET, "/api/tree", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["depth"], 4);
        assert_eq!(body["next_index"], 0);
    }

    #[tokio::test]
    async fn test_deposit_then_withdraw() {
        let app = test_app();

        let (status, bundle) = call(
            &app,
            Method::POST,
            "/api/prove/deposit",
            Some(bootstrap_deposit("100")),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{bundle}");
        assert_eq!(bundle["kind"], "deposit");
        assert_eq!(bundle["leaf_indices"], json!([0]));
        assert_eq!(bundle["new_notes"][0]["balance"], "100");
        assert_eq!(bundle["public_inputs"].as_array().unwrap().len(), 5);

        let (status, receipt) = call(&app, Method::POST, "/api/submit", Some(submission(&bundle))).await;
        assert_eq!(status, StatusCode::OK, "{receipt}");
        assert_eq!(receipt["next_index"], 1);
        assert_eq!(receipt["new_root"], bundle["public_inputs"][3]);

        let (_, tree) = call(&app, Method::GET, "/api/tree", None).await;
        assert_eq!(tree["root"], receipt["new_root"]);

        let (status, path) = call(&app, Method::GET, "/api/tree/path/0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(path["leaf"], bundle["commitments"][0]);
        assert_eq!(path["siblings"].as_array().unwrap().len(), 4);

        let withdrawal = json!({
            "secret": "7",
            "note": { "currency": "1", "balance": "100", "randomness": "11" },
            "note_index": 0,
            "amount": "30",
            "new_randomness": "12",
        });
        let (status, bundle) = call(&app, Method::POST, "/api/prove/withdrawal", Some(withdrawal)).await;
        assert_eq!(status, StatusCode::OK, "{bundle}");
        assert_eq!(bundle["leaf_indices"], json!([1]));
        assert_eq!(bundle["new_notes"][0]["balance"], "70");

        let (status, receipt) = call(&app, Method::POST, "/api/submit", Some(submission(&bundle))).await;
        assert_eq!(status, StatusCode::OK, "{receipt}");
        assert_eq!(receipt["kind"], "withdrawal");
        assert_eq!(receipt["next_index"], 2);
    }

    #[tokio::test]
    async fn test_resubmission_is_rejected_as_stale() {
        let app = test_app();

        let (_, bundle) = call(
            &app,
            Method::POST,
            "/api/prove/deposit",
            Some(bootstrap_deposit("5")),
        )
        .await;
        let (status, _) = call(&app, Method::POST, "/api/submit", Some(submission(&bundle))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::POST, "/api/submit", Some(submission(&bundle))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_tampered_signals_are_unprocessable() {
        let app = test_app();

        let (_, bundle) = call(
            &app,
            Method::POST,
            "/api/prove/deposit",
            Some(bootstrap_deposit("5")),
        )
        .await;
        let mut tampered = submission(&bundle);
        tampered["public_inputs"][0] = json!("500");

        let (status, _) = call(&app, Method::POST, "/api/submit", Some(tampered)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, tree) = call(&app, Method::GET, "/api/tree", None).await;
        assert_eq!(tree["next_index"], 0);
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let app = test_app();

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/prove/deposit",
            Some(bootstrap_deposit("0")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/prove/deposit",
            Some(bootstrap_deposit("-3")),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let overdraw = json!({
            "secret": "7",
            "note": { "currency": "1", "balance": "10", "randomness": "11" },
            "note_index": 0,
            "amount": "30",
            "new_randomness": "12",
        });
        let (status, _) = call(&app, Method::POST, "/api/prove/withdrawal", Some(overdraw)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::GET, "/api/tree/path/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_commitment_matches_proved_note() {
        let app = test_app();

        let (_, bundle) = call(
            &app,
            Method::POST,
            "/api/prove/deposit",
            Some(bootstrap_deposit("100")),
        )
        .await;
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/commitment",
            Some(bundle["new_notes"][0].clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["commitment"], bundle["commitments"][0]);

        let (status, body) = call(&app, Method::POST, "/api/randomness", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["value"].is_string());
    }
}
