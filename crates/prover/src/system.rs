//! The proof system as a capability: anything that can prove a transition and
//! verify a proof against public signals.

use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_groth16::Proof;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use shielded_circuits::{
    DepositCircuit, SwapCircuit, Transition, TransitionKind, WithdrawalCircuit,
};

use crate::prove::{
    check_satisfied, decode_proof, encode_proof, prove_deposit, prove_swap, prove_withdrawal,
};
use crate::setup::CircuitKeys;
use crate::verify::verify_signals;
use crate::ProverError;

/// Prove/verify capability consumed by the ledger and the proof server.
pub trait ProofSystem: Send + Sync {
    type Proof: Clone + Send + Sync + 'static;

    /// Produce a proof that `transition` satisfies its predicate.
    fn prove(&self, transition: &Transition<Fr>) -> Result<Self::Proof, ProverError>;

    /// Check `proof` against ordered public signals.
    fn verify(
        &self,
        kind: TransitionKind,
        proof: &Self::Proof,
        public_signals: &[Fr],
    ) -> Result<bool, ProverError>;

    fn encode_proof(&self, proof: &Self::Proof) -> Result<Vec<u8>, ProverError>;

    fn decode_proof(&self, bytes: &[u8]) -> Result<Self::Proof, ProverError>;
}

impl<P: ProofSystem + ?Sized> ProofSystem for Arc<P> {
    type Proof = P::Proof;

    fn prove(&self, transition: &Transition<Fr>) -> Result<Self::Proof, ProverError> {
        (**self).prove(transition)
    }

    fn verify(
        &self,
        kind: TransitionKind,
        proof: &Self::Proof,
        public_signals: &[Fr],
    ) -> Result<bool, ProverError> {
        (**self).verify(kind, proof, public_signals)
    }

    fn encode_proof(&self, proof: &Self::Proof) -> Result<Vec<u8>, ProverError> {
        (**self).encode_proof(proof)
    }

    fn decode_proof(&self, bytes: &[u8]) -> Result<Self::Proof, ProverError> {
        (**self).decode_proof(bytes)
    }
}

fn witness_depth(transition: &Transition<Fr>) -> usize {
    match transition {
        Transition::Deposit(leg) | Transition::Withdrawal(leg) => leg.witness.depth(),
        Transition::Swap(swap) => swap.withdrawal.witness.depth(),
    }
}

/// Groth16 over BN254 with circuit-specific keys.
#[derive(Clone)]
pub struct Groth16ProofSystem {
    keys: Arc<CircuitKeys>,
    config: Arc<PoseidonConfig<Fr>>,
}

impl Groth16ProofSystem {
    pub fn new(keys: Arc<CircuitKeys>, config: Arc<PoseidonConfig<Fr>>) -> Self {
        Self { keys, config }
    }

    pub fn keys(&self) -> &CircuitKeys {
        &self.keys
    }
}

impl ProofSystem for Groth16ProofSystem {
    type Proof = Proof<Bn254>;

    fn prove(&self, transition: &Transition<Fr>) -> Result<Self::Proof, ProverError> {
        let actual = witness_depth(transition);
        if actual != self.keys.depth {
            return Err(ProverError::DepthMismatch {
                expected: self.keys.depth,
                actual,
            });
        }

        let config = self.config.clone();
        let result = match transition {
            Transition::Deposit(leg) => prove_deposit(&self.keys.deposit.proving_key, leg, config),
            Transition::Withdrawal(leg) => {
                prove_withdrawal(&self.keys.withdrawal.proving_key, leg, config)
            }
            Transition::Swap(swap) => prove_swap(&self.keys.swap.proving_key, swap, config),
        }?;
        Ok(result.proof)
    }

    fn verify(
        &self,
        kind: TransitionKind,
        proof: &Self::Proof,
        public_signals: &[Fr],
    ) -> Result<bool, ProverError> {
        let vk = &self.keys.keypair(kind).verifying_key;
        Ok(verify_signals(vk, kind, proof, public_signals)?)
    }

    fn encode_proof(&self, proof: &Self::Proof) -> Result<Vec<u8>, ProverError> {
        encode_proof(proof)
    }

    fn decode_proof(&self, bytes: &[u8]) -> Result<Self::Proof, ProverError> {
        decode_proof(bytes)
    }
}

/// Proof produced by [`MockProofSystem`]: the signals it was checked against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockProof {
    pub kind: TransitionKind,
    pub public_signals: Vec<Fr>,
}

/// Checks constraint satisfaction but skips the SNARK; for tests and local
/// development without keys.
#[derive(Clone)]
pub struct MockProofSystem {
    config: Arc<PoseidonConfig<Fr>>,
}

impl MockProofSystem {
    pub fn new(config: Arc<PoseidonConfig<Fr>>) -> Self {
        tracing::info!("Using mock proof system (no SNARK proving)");
        Self { config }
    }
}

fn kind_tag(kind: TransitionKind) -> u8 {
    match kind {
        TransitionKind::Deposit => 0,
        TransitionKind::Withdrawal => 1,
        TransitionKind::Swap => 2,
    }
}

impl ProofSystem for MockProofSystem {
    type Proof = MockProof;

    fn prove(&self, transition: &Transition<Fr>) -> Result<Self::Proof, ProverError> {
        let kind = transition.kind();
        let config = self.config.clone();
        match transition {
            Transition::Deposit(leg) => {
                check_satisfied(kind, DepositCircuit::from_transition(leg, config))?
            }
            Transition::Withdrawal(leg) => {
                check_satisfied(kind, WithdrawalCircuit::from_transition(leg, config))?
            }
            Transition::Swap(swap) => {
                check_satisfied(kind, SwapCircuit::from_transition(swap, config))?
            }
        }

        Ok(MockProof {
            kind,
            public_signals: transition.public_signals(),
        })
    }

    fn verify(
        &self,
        kind: TransitionKind,
        proof: &Self::Proof,
        public_signals: &[Fr],
    ) -> Result<bool, ProverError> {
        Ok(proof.kind == kind && proof.public_signals == public_signals)
    }

    fn encode_proof(&self, proof: &Self::Proof) -> Result<Vec<u8>, ProverError> {
        let mut bytes = vec![kind_tag(proof.kind)];
        proof.public_signals.serialize_compressed(&mut bytes)?;
        Ok(bytes)
    }

    fn decode_proof(&self, bytes: &[u8]) -> Result<Self::Proof, ProverError> {
        let (tag, rest) = bytes
            .split_first()
            .ok_or(ark_serialize::SerializationError::InvalidData)?;
        let kind = TransitionKind::ALL
            .into_iter()
            .find(|kind| kind_tag(*kind) == *tag)
            .ok_or(ark_serialize::SerializationError::InvalidData)?;
        let public_signals = Vec::<Fr>::deserialize_compressed(rest)?;
        Ok(MockProof {
            kind,
            public_signals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_all_circuits;
    use shielded_circuits::{
        plan_deposit, poseidon_config, EmptyTree, LegRequest, MerkleTree, Note,
    };

    fn deposit_transition(depth: usize) -> Transition<Fr> {
        let config = Arc::new(poseidon_config::<Fr>());
        let mut tree = MerkleTree::from_empty(&EmptyTree::build(config, depth).unwrap());
        let leg = plan_deposit(
            &mut tree,
            &LegRequest {
                secret: Fr::from(1u64),
                note: Note::zero(Fr::from(1u64), Fr::from(2u64)),
                note_index: None,
                amount: 10,
                new_randomness: Fr::from(3u64),
                leaf_index: 0,
            },
        )
        .unwrap();
        Transition::Deposit(leg)
    }

    #[test]
    fn test_mock_prove_and_verify() {
        let system = MockProofSystem::new(Arc::new(poseidon_config::<Fr>()));
        let transition = deposit_transition(3);

        let proof = system.prove(&transition).unwrap();
        let signals = transition.public_signals();
        assert!(system.verify(TransitionKind::Deposit, &proof, &signals).unwrap());
        assert!(!system.verify(TransitionKind::Withdrawal, &proof, &signals).unwrap());

        let decoded = system.decode_proof(&system.encode_proof(&proof).unwrap()).unwrap();
        assert_eq!(decoded, proof);
    }

    #[test]
    fn test_mock_rejects_unsatisfiable() {
        let system = MockProofSystem::new(Arc::new(poseidon_config::<Fr>()));
        let mut transition = deposit_transition(3);
        if let Transition::Deposit(leg) = &mut transition {
            leg.public.amount += 1;
        }

        let err = system.prove(&transition).unwrap_err();
        assert!(matches!(err, ProverError::PredicateUnsatisfiable { .. }));
    }

    #[test]
    fn test_groth16_system() {
        let keys = Arc::new(setup_all_circuits(3).unwrap());
        let system = Groth16ProofSystem::new(keys, Arc::new(poseidon_config::<Fr>()));
        let transition = deposit_transition(3);

        let proof = system.prove(&transition).unwrap();
        let bytes = system.encode_proof(&proof).unwrap();
        let proof = system.decode_proof(&bytes).unwrap();
        assert!(system
            .verify(TransitionKind::Deposit, &proof, &transition.public_signals())
            .unwrap());

        let err = system.prove(&deposit_transition(2)).unwrap_err();
        assert!(matches!(
            err,
            ProverError::DepthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }
}
