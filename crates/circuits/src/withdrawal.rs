//! WithdrawalCircuit: proves a valid withdrawal from a note in the tree.

use std::sync::Arc;

use ark_crypto_primitives::sponge::{poseidon::PoseidonConfig, Absorb};
use ark_ff::PrimeField;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::hash::PoseidonGadget;
use crate::leg::{enforce_withdrawal_leg, LegSignalsVar, LegWitnessVar};
use crate::transition::{LegPublicInputs, LegTransition, LegWitness};

/// Circuit that proves: "a note with balance >= amount is in the tree under
/// old_root, its nullifier is published, and balance - amount sits in a fresh
/// leaf under new_root".
///
/// Public inputs, in order:
/// - amount: Amount being withdrawn
/// - currency: Currency of the note
/// - old_root: Tree root containing the spent note
/// - new_root: Tree root after the change note is written
/// - nullifier: H(secret, old_leaf)
///
/// Private witnesses are the same as for [`crate::DepositCircuit`].
#[derive(Clone)]
pub struct WithdrawalCircuit<F: PrimeField> {
    /// Public: Leg signals
    pub public: Option<LegPublicInputs<F>>,
    /// Private: Note opening and paths
    pub witness: Option<LegWitness<F>>,
    /// Tree depth; fixes the circuit shape
    pub depth: usize,

    /// Poseidon configuration
    pub poseidon_config: Arc<PoseidonConfig<F>>,
}

impl<F: PrimeField + Absorb> WithdrawalCircuit<F> {
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

impl<F: PrimeField + Absorb> ConstraintSynthesizer<F> for WithdrawalCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let signals = LegSignalsVar::new_input(cs.clone(), self.public.as_ref())?;
        let witness = LegWitnessVar::new_witness(cs.clone(), self.witness.as_ref(), self.depth)?;

        let poseidon = PoseidonGadget::new(cs, (*self.poseidon_config).clone());
        enforce_withdrawal_leg(&poseidon, &signals, &witness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{commit, Note};
    use crate::hash::poseidon_config;
    use crate::smt::{EmptyTree, MerkleTree};
    use crate::transition::{plan_deposit, plan_withdrawal, LegRequest};
    use ark_bn254::Fr;
    use ark_relations::r1cs::ConstraintSystem;

    const DEPTH: usize = 4;
    const SECRET: u64 = 123456;

    /// A tree holding a 100-unit note at leaf 11.
    fn funded() -> (Arc<PoseidonConfig<Fr>>, MerkleTree<Fr>, Note<Fr>) {
        let config = Arc::new(poseidon_config::<Fr>());
        let mut tree = MerkleTree::from_empty(&EmptyTree::build(config.clone(), DEPTH).unwrap());
        let deposit = plan_deposit(
            &mut tree,
            &LegRequest {
                secret: Fr::from(SECRET),
                note: Note::zero(Fr::from(0u64), Fr::from(1123u64)),
                note_index: None,
                amount: 100,
                new_randomness: Fr::from(1123u64),
                leaf_index: 11,
            },
        )
        .unwrap();
        (config, tree, deposit.new_note)
    }

    fn withdraw(note: Note<Fr>, amount: u128) -> LegRequest<Fr> {
        LegRequest {
            secret: Fr::from(SECRET),
            note,
            note_index: Some(11),
            amount,
            new_randomness: Fr::from(1123u64),
            leaf_index: 12,
        }
    }

    fn is_satisfied(circuit: WithdrawalCircuit<Fr>) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_withdraw_within_balance() {
        let (config, mut tree, note) = funded();
        let leg = plan_withdrawal(&mut tree, &withdraw(note, 10)).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        WithdrawalCircuit::from_transition(&leg, config)
            .generate_constraints(cs.clone())
            .unwrap();

        assert!(cs.is_satisfied().unwrap());
        println!("Withdrawal circuit constraints (depth {DEPTH}): {}", cs.num_constraints());
    }

    #[test]
    fn test_withdraw_exact_balance() {
        let (config, mut tree, note) = funded();
        let leg = plan_withdrawal(&mut tree, &withdraw(note, 100)).unwrap();

        assert_eq!(leg.new_note.balance, 0);
        assert!(is_satisfied(WithdrawalCircuit::from_transition(&leg, config)));
    }

    #[test]
    fn test_zero_withdrawal_from_drained_note() {
        let (config, mut tree, note) = funded();
        let drained = plan_withdrawal(&mut tree, &withdraw(note, 100)).unwrap();

        let leg = plan_withdrawal(
            &mut tree,
            &LegRequest {
                note_index: Some(12),
                leaf_index: 13,
                ..withdraw(drained.new_note, 0)
            },
        )
        .unwrap();

        assert_ne!(leg.public.nullifier, Fr::from(0u64));
        assert!(is_satisfied(WithdrawalCircuit::from_transition(&leg, config)));
    }

    #[test]
    fn test_withdraw_over_balance_unsatisfiable() {
        let (config, mut tree, note) = funded();
        let old_root = tree.root();
        let old_path = tree.path(11).unwrap();

        // balance - (balance + 1) computed in the field, as a cheating prover would
        let wrapped = Fr::from(100u64) - Fr::from(101u64);
        let new_leaf = crate::hash::poseidon_hash(&config, &[note.currency, wrapped, note.randomness]);
        let update = tree.update_leaf(12, new_leaf).unwrap();

        let circuit = WithdrawalCircuit::new(
            LegPublicInputs {
                amount: 101,
                currency: note.currency,
                old_root,
                new_root: update.root,
                nullifier: crate::commitment::nullifier(
                    &config,
                    Fr::from(SECRET),
                    note.commitment(&config),
                ),
            },
            LegWitness {
                secret: Fr::from(SECRET),
                old_note: note,
                new_randomness: note.randomness,
                old_path,
                new_path: update.path,
            },
            config,
        );

        assert!(!is_satisfied(circuit));
    }

    #[test]
    fn test_wrong_secret_unsatisfiable() {
        let (config, mut tree, note) = funded();
        let mut leg = plan_withdrawal(&mut tree, &withdraw(note, 10)).unwrap();

        leg.witness.secret = Fr::from(SECRET + 1);

        assert!(!is_satisfied(WithdrawalCircuit::from_transition(&leg, config)));
    }

    #[test]
    fn test_wrong_currency_unsatisfiable() {
        let (config, mut tree, note) = funded();
        let mut leg = plan_withdrawal(&mut tree, &withdraw(note, 10)).unwrap();

        leg.public.currency = Fr::from(1u64);

        assert!(!is_satisfied(WithdrawalCircuit::from_transition(&leg, config)));
    }

    #[test]
    fn test_change_note_commitment() {
        let (config, mut tree, note) = funded();
        let leg = plan_withdrawal(&mut tree, &withdraw(note, 10)).unwrap();

        assert_eq!(
            leg.new_commitment,
            commit(&config, note.currency, 90, Fr::from(1123u64))
        );
        assert_eq!(tree.leaf(12).unwrap(), leg.new_commitment);
    }
}
