//! Leg gadgets shared by the deposit, withdrawal and swap circuits.
//!
//! A leg moves one note from `old_root` to `new_root`: it proves knowledge of
//! the spent note, publishes its nullifier and writes the updated note into a
//! fresh, previously empty leaf.

use ark_crypto_primitives::sponge::Absorb;
use ark_ff::PrimeField;
use ark_r1cs_std::{
    alloc::AllocVar,
    fields::{fp::FpVar, FieldVar},
    prelude::*,
};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use crate::commitment::{commit_var, nullifier_var};
use crate::hash::PoseidonGadget;
use crate::range_check::{enforce_balance_range, enforce_geq, enforce_nonzero};
use crate::smt::{compute_root_from_path, verify_membership, MerklePathVar};
use crate::transition::{LegPublicInputs, LegWitness};

/// Public signals of one leg.
pub struct LegSignalsVar<F: PrimeField> {
    pub amount: FpVar<F>,
    pub currency: FpVar<F>,
    pub old_root: FpVar<F>,
    pub new_root: FpVar<F>,
    pub nullifier: FpVar<F>,
}

impl<F: PrimeField> LegSignalsVar<F> {
    /// Allocate all five signals as public inputs, in verifier order.
    pub fn new_input(
        cs: ConstraintSystemRef<F>,
        public: Option<&LegPublicInputs<F>>,
    ) -> Result<Self, SynthesisError> {
        let amount = FpVar::new_input(cs.clone(), || {
            public
                .map(|p| F::from(p.amount))
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let currency = FpVar::new_input(cs.clone(), || {
            public
                .map(|p| p.currency)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let old_root = FpVar::new_input(cs.clone(), || {
            public
                .map(|p| p.old_root)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let new_root = FpVar::new_input(cs.clone(), || {
            public
                .map(|p| p.new_root)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier = FpVar::new_input(cs, || {
            public
                .map(|p| p.nullifier)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        Ok(Self {
            amount,
            currency,
            old_root,
            new_root,
            nullifier,
        })
    }

    /// Allocate amount, currency and nullifier as public inputs around roots
    /// that are already allocated (a swap shares its intermediate root).
    pub fn with_roots(
        cs: ConstraintSystemRef<F>,
        old_root: FpVar<F>,
        new_root: FpVar<F>,
        public: Option<&LegPublicInputs<F>>,
    ) -> Result<Self, SynthesisError> {
        let amount = FpVar::new_input(cs.clone(), || {
            public
                .map(|p| F::from(p.amount))
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let currency = FpVar::new_input(cs.clone(), || {
            public
                .map(|p| p.currency)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier = FpVar::new_input(cs, || {
            public
                .map(|p| p.nullifier)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;

        Ok(Self {
            amount,
            currency,
            old_root,
            new_root,
            nullifier,
        })
    }
}

/// Private witness of one leg.
pub struct LegWitnessVar<F: PrimeField> {
    pub secret: FpVar<F>,
    pub balance: FpVar<F>,
    pub old_randomness: FpVar<F>,
    pub new_randomness: FpVar<F>,
    pub old_path: MerklePathVar<F>,
    pub new_path: MerklePathVar<F>,
}

impl<F: PrimeField + Absorb> LegWitnessVar<F> {
    pub fn new_witness(
        cs: ConstraintSystemRef<F>,
        witness: Option<&LegWitness<F>>,
        depth: usize,
    ) -> Result<Self, SynthesisError> {
        let secret = FpVar::new_witness(cs.clone(), || {
            witness
                .map(|w| w.secret)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let balance = FpVar::new_witness(cs.clone(), || {
            witness
                .map(|w| F::from(w.old_note.balance))
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let old_randomness = FpVar::new_witness(cs.clone(), || {
            witness
                .map(|w| w.old_note.randomness)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let new_randomness = FpVar::new_witness(cs.clone(), || {
            witness
                .map(|w| w.new_randomness)
                .ok_or(SynthesisError::AssignmentMissing)
        })?;
        let old_path =
            MerklePathVar::new_witness(cs.clone(), witness.map(|w| &w.old_path), depth)?;
        let new_path = MerklePathVar::new_witness(cs, witness.map(|w| &w.new_path), depth)?;

        Ok(Self {
            secret,
            balance,
            old_randomness,
            new_randomness,
            old_path,
            new_path,
        })
    }
}

/// Enforce that the fresh leaf on `new_path` was empty under `old_root` and
/// holds `commit(currency, new_balance, new_randomness)` under `new_root`.
fn enforce_fresh_leaf<F: PrimeField + Absorb>(
    poseidon: &PoseidonGadget<F>,
    signals: &LegSignalsVar<F>,
    witness: &LegWitnessVar<F>,
    new_balance: &FpVar<F>,
) -> Result<(), SynthesisError> {
    let empty = poseidon.empty_leaf();
    verify_membership(poseidon, &signals.old_root, &empty, &witness.new_path)?;

    let new_leaf = commit_var(
        poseidon,
        &signals.currency,
        new_balance,
        &witness.new_randomness,
    )?;
    verify_membership(poseidon, &signals.new_root, &new_leaf, &witness.new_path)
}

/// Constraints of a deposit-shaped leg.
///
/// A zero balance marks a first deposit: the nullifier must be the bootstrap
/// constant and the old leaf is not required to be in the tree.
pub fn enforce_deposit_leg<F: PrimeField + Absorb>(
    poseidon: &PoseidonGadget<F>,
    signals: &LegSignalsVar<F>,
    witness: &LegWitnessVar<F>,
) -> Result<(), SynthesisError> {
    enforce_nonzero(&signals.amount)?;
    enforce_balance_range(&signals.amount)?;
    enforce_balance_range(&witness.balance)?;

    let old_leaf = commit_var(
        poseidon,
        &signals.currency,
        &witness.balance,
        &witness.old_randomness,
    )?;

    let is_bootstrap = witness.balance.is_eq(&FpVar::zero())?;
    let spend_nullifier = nullifier_var(poseidon, &witness.secret, &old_leaf)?;
    let expected_nullifier = is_bootstrap.select(&FpVar::zero(), &spend_nullifier)?;
    expected_nullifier.enforce_equal(&signals.nullifier)?;

    let old_root = compute_root_from_path(poseidon, &old_leaf, &witness.old_path)?;
    old_root.conditional_enforce_equal(&signals.old_root, &is_bootstrap.not())?;

    let new_balance = &witness.balance + &signals.amount;
    enforce_balance_range(&new_balance)?;

    enforce_fresh_leaf(poseidon, signals, witness, &new_balance)
}

/// Constraints of a withdrawal-shaped leg.
pub fn enforce_withdrawal_leg<F: PrimeField + Absorb>(
    poseidon: &PoseidonGadget<F>,
    signals: &LegSignalsVar<F>,
    witness: &LegWitnessVar<F>,
) -> Result<(), SynthesisError> {
    enforce_balance_range(&signals.amount)?;
    enforce_balance_range(&witness.balance)?;

    let old_leaf = commit_var(
        poseidon,
        &signals.currency,
        &witness.balance,
        &witness.old_randomness,
    )?;

    nullifier_var(poseidon, &witness.secret, &old_leaf)?.enforce_equal(&signals.nullifier)?;
    verify_membership(poseidon, &signals.old_root, &old_leaf, &witness.old_path)?;

    // Over-withdrawal wraps around and fails the range check.
    enforce_geq(&witness.balance, &signals.amount)?;
    let new_balance = &witness.balance - &signals.amount;

    enforce_fresh_leaf(poseidon, signals, witness, &new_balance)
}
