//! In-circuit Merkle path verification.

use ark_crypto_primitives::sponge::Absorb;
use ark_ff::PrimeField;
use ark_r1cs_std::{boolean::Boolean, fields::fp::FpVar, prelude::*};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};

use super::MerklePath;
use crate::hash::PoseidonGadget;

/// Circuit variable representation of a Merkle path.
#[derive(Clone)]
pub struct MerklePathVar<F: PrimeField> {
    /// Sibling hashes as circuit variables
    siblings: Vec<FpVar<F>>,
    /// Direction booleans; true means the current node is a right child
    directions: Vec<Boolean<F>>,
}

impl<F: PrimeField + Absorb> MerklePathVar<F> {
    /// Allocate a path of `depth` levels as witness variables.
    ///
    /// `path` is `None` during key generation.
    pub fn new_witness(
        cs: ConstraintSystemRef<F>,
        path: Option<&MerklePath<F>>,
        depth: usize,
    ) -> Result<Self, SynthesisError> {
        if let Some(path) = path {
            if path.depth() != depth {
                return Err(SynthesisError::Unsatisfiable);
            }
        }

        let siblings = (0..depth)
            .map(|d| {
                FpVar::new_witness(cs.clone(), || {
                    path.map(|p| p.siblings()[d])
                        .ok_or(SynthesisError::AssignmentMissing)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let directions = (0..depth)
            .map(|d| {
                Boolean::new_witness(cs.clone(), || {
                    path.map(|p| p.directions()[d])
                        .ok_or(SynthesisError::AssignmentMissing)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            siblings,
            directions,
        })
    }

    pub fn siblings(&self) -> &[FpVar<F>] {
        &self.siblings
    }

    pub fn directions(&self) -> &[Boolean<F>] {
        &self.directions
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }
}

/// Compute the root hash from a leaf and Merkle path in-circuit.
pub fn compute_root_from_path<F: PrimeField + Absorb>(
    poseidon: &PoseidonGadget<F>,
    leaf: &FpVar<F>,
    path: &MerklePathVar<F>,
) -> Result<FpVar<F>, SynthesisError> {
    let mut current = leaf.clone();

    for (sibling, is_right) in path.siblings.iter().zip(path.directions.iter()) {
        // If is_right: H(sibling, current), else H(current, sibling)
        let left = is_right.select(sibling, &current)?;
        let right = is_right.select(&current, sibling)?;

        current = poseidon.hash_two(&left, &right)?;
    }

    Ok(current)
}

/// Enforce that `leaf` sits under `expected_root` along `path`.
pub fn verify_membership<F: PrimeField + Absorb>(
    poseidon: &PoseidonGadget<F>,
    expected_root: &FpVar<F>,
    leaf: &FpVar<F>,
    path: &MerklePathVar<F>,
) -> Result<(), SynthesisError> {
    let computed_root = compute_root_from_path(poseidon, leaf, path)?;
    computed_root.enforce_equal(expected_root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::poseidon_config;
    use crate::smt::{EmptyTree, MerkleTree};
    use ark_bn254::Fr;
    use ark_relations::r1cs::ConstraintSystem;
    use std::sync::Arc;

    fn populated_tree() -> MerkleTree<Fr> {
        let config = Arc::new(poseidon_config::<Fr>());
        let mut tree = MerkleTree::from_empty(&EmptyTree::build(config, 4).unwrap());
        tree.update_leaf(5, Fr::from(100u64)).unwrap();
        tree.update_leaf(10, Fr::from(200u64)).unwrap();
        tree
    }

    #[test]
    fn test_verify_membership() {
        let tree = populated_tree();
        let path = tree.path(5).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let poseidon = PoseidonGadget::new(cs.clone(), (**tree.config()).clone());

        let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root())).unwrap();
        let leaf_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(100u64))).unwrap();
        let path_var = MerklePathVar::new_witness(cs.clone(), Some(&path), 4).unwrap();

        verify_membership(&poseidon, &root_var, &leaf_var, &path_var).unwrap();

        assert!(cs.is_satisfied().unwrap());
        println!("Membership constraints (depth 4): {}", cs.num_constraints());
    }

    #[test]
    fn test_verify_membership_wrong_leaf() {
        let tree = populated_tree();
        let path = tree.path(5).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let poseidon = PoseidonGadget::new(cs.clone(), (**tree.config()).clone());

        let root_var = FpVar::new_input(cs.clone(), || Ok(tree.root())).unwrap();
        // Wrong leaf!
        let leaf_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(99u64))).unwrap();
        let path_var = MerklePathVar::new_witness(cs.clone(), Some(&path), 4).unwrap();

        verify_membership(&poseidon, &root_var, &leaf_var, &path_var).unwrap();

        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn test_in_circuit_root_matches_native() {
        let tree = populated_tree();
        let path = tree.path(10).unwrap();

        let cs = ConstraintSystem::<Fr>::new_ref();
        let poseidon = PoseidonGadget::new(cs.clone(), (**tree.config()).clone());
        let leaf_var = FpVar::new_witness(cs.clone(), || Ok(Fr::from(200u64))).unwrap();
        let path_var = MerklePathVar::new_witness(cs.clone(), Some(&path), 4).unwrap();

        let root = compute_root_from_path(&poseidon, &leaf_var, &path_var).unwrap();
        assert_eq!(root.value().unwrap(), tree.root());
    }

    #[test]
    fn test_depth_mismatch_rejected() {
        let tree = populated_tree();
        let path = tree.path(5).unwrap();
        let cs = ConstraintSystem::<Fr>::new_ref();

        assert!(MerklePathVar::new_witness(cs, Some(&path), 3).is_err());
    }
}
