//! SwapCircuit: a withdrawal leg and a deposit leg chained through a shared root.

use std::sync::Arc;

use ark_crypto_primitives::sponge::{poseidon::PoseidonConfig, Absorb};
use ark_ff::PrimeField;
use ark_r1cs_std::{alloc::AllocVar, fields::fp::FpVar};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::hash::PoseidonGadget;
use crate::leg::{enforce_deposit_leg, enforce_withdrawal_leg, LegSignalsVar, LegWitnessVar};
use crate::transition::{LegWitness, SwapPublicInputs, SwapTransition};

/// Circuit that proves: "withdrawing from a note of currency A moves the tree
/// from old_root to intermediate_root, and depositing into a note of currency B
/// moves it from intermediate_root to new_root".
///
/// The conversion rate between the two amounts is not constrained here.
///
/// Public inputs, in order:
/// - old_root, intermediate_root, new_root
/// - withdrawal amount, currency, nullifier
/// - deposit amount, currency, nullifier
#[derive(Clone)]
pub struct SwapCircuit<F: PrimeField> {
    /// Public: Roots and both legs' signals
    pub public: Option<SwapPublicInputs<F>>,
    /// Private: Withdrawal leg witness
    pub withdrawal: Option<LegWitness<F>>,
    /// Private: Deposit leg witness
    pub deposit: Option<LegWitness<F>>,
    /// Tree depth; fixes the circuit shape
    pub depth: usize,

    /// Poseidon configuration
    pub poseidon_config: Arc<PoseidonConfig<F>>,
}

impl<F: PrimeField + Absorb> SwapCircuit<F> {
    /// Create a new circuit instance for proving.
    pub fn new(
        public: SwapPublicInputs<F>,
        withdrawal: LegWitness<F>,
        deposit: LegWitness<F>,
        poseidon_config: Arc<PoseidonConfig<F>>,
    ) -> Self {
        Self {
            depth: withdrawal.depth(),
            public: Some(public),
            withdrawal: Some(withdrawal),
            deposit: Some(deposit),
            poseidon_config,
        }
    }

    pub fn from_transition(
        transition: &SwapTransition<F>,
        poseidon_config: Arc<PoseidonConfig<F>>,
    ) -> Self {
        Self::new(
            transition.public,
            transition.withdrawal.witness.clone(),
            transition.deposit.witness.clone(),
            poseidon_config,
        )
    }

    /// Create an empty circuit for setup.
    pub fn empty(depth: usize, poseidon_config: Arc<PoseidonConfig<F>>) -> Self {
        Self {
            public: None,
            withdrawal: None,
            deposit: None,
            depth,
            poseidon_config,
        }
    }
}

impl<F: PrimeField + Absorb> ConstraintSynthesizer<F> for SwapCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        // 1. Allocate the three roots once; the legs share intermediate_root
        let old_root = FpVar::new_input(cs.clone(), || {
            self.public
                .map(|p| p.old_root)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let intermediate_root = FpVar::new_input(cs.clone(), || {
            self.public
                .map(|p| p.intermediate_root)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let new_root = FpVar::new_input(cs.clone(), || {
            self.public
                .map(|p| p.new_root)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        // 2. Per-leg public signals
        let withdrawal_public = self.public.map(|p| p.withdrawal_leg());
        let deposit_public = self.public.map(|p| p.deposit_leg());
        let withdrawal_signals = LegSignalsVar::with_roots(
            cs.clone(),
            old_root,
            intermediate_root.clone(),
            withdrawal_public.as_ref(),
        )?;
        let deposit_signals = LegSignalsVar::with_roots(
            cs.clone(),
            intermediate_root,
            new_root,
            deposit_public.as_ref(),
        )?;

        // 3. Private witnesses
        let withdrawal =
            LegWitnessVar::new_witness(cs.clone(), self.withdrawal.as_ref(), self.depth)?;
        let deposit = LegWitnessVar::new_witness(cs.clone(), self.deposit.as_ref(), self.depth)?;

        // 4. Both legs must hold independently
        let poseidon = PoseidonGadget::new(cs, (*self.poseidon_config).clone());
        enforce_withdrawal_leg(&poseidon, &withdrawal_signals, &withdrawal)?;
        enforce_deposit_leg(&poseidon, &deposit_signals, &deposit)
    }
}
