//! Proof verification against ordered public signals.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, VerifyingKey};
use ark_snark::SNARK;
use shielded_circuits::TransitionKind;
use thiserror::Error;

/// Errors during verification
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Verification failed: {0}")]
    Verification(String),
    #[error("Invalid public inputs: {kind} expects {expected} signals, got {actual}")]
    InvalidInputs {
        kind: TransitionKind,
        expected: usize,
        actual: usize,
    },
}

/// Verify a proof of `kind` against raw public signals.
pub fn verify_signals(
    vk: &VerifyingKey<Bn254>,
    kind: TransitionKind,
    proof: &Proof<Bn254>,
    public_signals: &[Fr],
) -> Result<bool, VerifyError> {
    let expected = kind.num_public_inputs();
    if public_signals.len() != expected {
        return Err(VerifyError::InvalidInputs {
            kind,
            expected,
            actual: public_signals.len(),
        });
    }

    Groth16::<Bn254>::verify(vk, public_signals, proof)
        .map_err(|e| VerifyError::Verification(e.to_string()))
}
