//! DepositCircuit: proves a valid deposit into a fresh leaf.

use std::sync::Arc;

use ark_crypto_primitives::sponge::{poseidon::PoseidonConfig, Absorb};
use ark_ff::PrimeField;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::hash::PoseidonGadget;
use crate::leg::{enforce_deposit_leg, LegSignalsVar, LegWitnessVar};
use crate::transition::{LegPublicInputs, LegTransition, LegWitness};

/// Circuit that proves: "balance + amount now sits in a fresh leaf, and the
/// nullifier spends the previous note (or is the bootstrap constant)".
///
/// Public inputs, in order:
/// - amount: Amount being deposited (non-zero)
/// - currency: Currency of the note
/// - old_root: Tree root before the deposit
/// - new_root: Tree root after the new leaf is written
/// - nullifier: H(secret, old_leaf), or 0 for a first deposit
///
/// Private witnesses:
/// - secret: Spend secret of the note owner
/// - balance, old_randomness: Opening of the previous note
/// - new_randomness: Blinding of the new note
/// - old_path, new_path: Paths of the previous note and the fresh leaf
#[derive(Clone)]
pub struct DepositCircuit<F: PrimeField> {
    /// Public: Leg signals
    pub public: Option<LegPublicInputs<F>>,
    /// Private: Note opening and paths
    pub witness: Option<LegWitness<F>>,
    /// Tree depth; fixes the circuit shape
    pub depth: usize,

    /// Poseidon configuration
    pub poseidon_config: Arc<PoseidonConfig<F>>,
}

impl<F: PrimeField + Absorb> DepositCircuit<F> {
    /// Create a new circuit instance for proving.
    pub fn new(
        public: LegPublicInputs<F>,
        witness: LegWitness<F>,
        poseidon_config: Arc<PoseidonConfig<F>>,
    ) -> Self {
        Self {
            depth: witness.depth(),
            public: Some(public),
            witness: Some(witness),
            poseidon_config,
        }
    }

    pub fn from_transition(
        transition: &LegTransition<F>,
        poseidon_config: Arc<PoseidonConfig<F>>,
    ) -> Self {
        Self::new(
            transition.public,
            transition.witness.clone(),
            poseidon_config,
        )
    }

    /// Create an empty circuit for setup.
    pub fn empty(depth: usize, poseidon_config: Arc<PoseidonConfig<F>>) -> Self {
        Self {
            public: None,
            witness: None,
            depth,
            poseidon_config,
        }
    }
}

impl<F: PrimeField + Absorb> ConstraintSynthesizer<F> for DepositCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        // 1. Allocate public inputs
        let signals = LegSignalsVar::new_input(cs.clone(), self.public.as_ref())?;

        // 2. Allocate private witnesses
        let witness = LegWitnessVar::new_witness(cs.clone(), self.witness.as_ref(), self.depth)?;

        // 3. Deposit constraints
        let poseidon = PoseidonGadget::new(cs, (*self.poseidon_config).clone());
        enforce_deposit_leg(&poseidon, &signals, &witness)
    }
}
