//! Proof generation for each circuit.
//!
//! Every circuit is first synthesized into a plain constraint system so an
//! invalid witness surfaces as [`ProverError::PredicateUnsatisfiable`] naming
//! the failing constraint, instead of a proof that silently fails to verify.

use std::sync::Arc;
use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_groth16::{Groth16, Proof, ProvingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::SeedableRng;
use rand::rngs::StdRng;
use shielded_circuits::{
    DepositCircuit, LegTransition, SwapCircuit, SwapTransition, TransitionKind,
    WithdrawalCircuit,
};

use crate::ProverError;

/// A proof together with the public signals it was generated for.
#[derive(Clone, Debug)]
pub struct ProofResult {
    pub proof: Proof<Bn254>,
    pub public_inputs: Vec<Fr>,
}

impl ProofResult {
    pub fn proof_bytes(&self) -> Result<Vec<u8>, ProverError> {
        encode_proof(&self.proof)
    }

    pub fn proof_hex(&self) -> Result<String, ProverError> {
        Ok(hex::encode(self.proof_bytes()?))
    }
}

pub fn encode_proof(proof: &Proof<Bn254>) -> Result<Vec<u8>, ProverError> {
    let mut bytes = Vec::new();
    proof.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

pub fn decode_proof(bytes: &[u8]) -> Result<Proof<Bn254>, ProverError> {
    Ok(Proof::deserialize_compressed(bytes)?)
}

/// Synthesize `circuit` and report the first unsatisfied constraint, if any.
pub fn check_satisfied<C>(kind: TransitionKind, circuit: C) -> Result<(), ProverError>
where
    C: ConstraintSynthesizer<Fr>,
{
    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit.generate_constraints(cs.clone())?;

    if cs.is_satisfied()? {
        return Ok(());
    }

    let constraint = cs
        .which_is_unsatisfied()?
        .unwrap_or_else(|| "unknown".to_string());
    tracing::debug!(%kind, %constraint, "witness does not satisfy circuit");
    Err(ProverError::PredicateUnsatisfiable { kind, constraint })
}

fn prove_circuit<C>(
    kind: TransitionKind,
    pk: &ProvingKey<Bn254>,
    circuit: C,
    public_inputs: Vec<Fr>,
) -> Result<ProofResult, ProverError>
where
    C: ConstraintSynthesizer<Fr> + Clone,
{
    check_satisfied(kind, circuit.clone())?;

    let start = Instant::now();
    let mut rng = StdRng::from_entropy();
    let proof = Groth16::<Bn254>::prove(pk, circuit, &mut rng)?;
    tracing::info!(%kind, elapsed = ?start.elapsed(), "proof generated");

    Ok(ProofResult {
        proof,
        public_inputs,
    })
}

/// Generate a deposit proof.
pub fn prove_deposit(
    pk: &ProvingKey<Bn254>,
    leg: &LegTransition<Fr>,
    config: Arc<PoseidonConfig<Fr>>,
) -> Result<ProofResult, ProverError> {
    let circuit = DepositCircuit::from_transition(leg, config);
    prove_circuit(
        TransitionKind::Deposit,
        pk,
        circuit,
        leg.public.to_public_signals(),
    )
}

/// Generate a withdrawal proof.
pub fn prove_withdrawal(
    pk: &ProvingKey<Bn254>,
    leg: &LegTransition<Fr>,
    config: Arc<PoseidonConfig<Fr>>,
) -> Result<ProofResult, ProverError> {
    let circuit = WithdrawalCircuit::from_transition(leg, config);
    prove_circuit(
        TransitionKind::Withdrawal,
        pk,
        circuit,
        leg.public.to_public_signals(),
    )
}

/// Generate a swap proof.
pub fn prove_swap(
    pk: &ProvingKey<Bn254>,
    swap: &SwapTransition<Fr>,
    config: Arc<PoseidonConfig<Fr>>,
) -> Result<ProofResult, ProverError> {
    let circuit = SwapCircuit::from_transition(swap, config);
    prove_circuit(
        TransitionKind::Swap,
        pk,
        circuit,
        swap.public.to_public_signals(),
    )
}
