//! Poseidon hash over the circuit field, native and in-circuit.
//!
//! Every input tuple is prefixed with its length before absorption, so
//! `H(a, b)` and `H(a, b, 0)` never collapse onto the same sponge state.

use ark_crypto_primitives::sponge::{
    constraints::CryptographicSpongeVar,
    poseidon::{constraints::PoseidonSpongeVar, PoseidonConfig, PoseidonSponge},
    Absorb, CryptographicSponge,
};
use ark_ff::PrimeField;
use ark_r1cs_std::fields::{fp::FpVar, FieldVar};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use ark_std::rand::{rngs::StdRng, SeedableRng};

/// Seed for the round-constant stream. Changing it changes every hash,
/// which invalidates persisted empty-tree artifacts and circuit keys.
pub const POSEIDON_SEED: u64 = 0x6d6f_7269_5f73_6d74;

/// Generate the Poseidon configuration used for H.
/// Rate: 2, Capacity: 1, Full rounds: 8, Partial rounds: 57, alpha: 5.
pub fn poseidon_config<F: PrimeField + Absorb>() -> PoseidonConfig<F> {
    let full_rounds = 8;
    let partial_rounds = 57;
    let alpha = 5;
    let rate = 2;

    let (ark, mds) = generate_poseidon_parameters::<F>(rate, full_rounds, partial_rounds);

    PoseidonConfig::new(
        full_rounds,
        partial_rounds,
        alpha,
        mds,
        ark,
        rate,
        1, // capacity
    )
}

/// Round constants come from a seeded RNG so native and in-circuit
/// instances always agree.
fn generate_poseidon_parameters<F: PrimeField>(
    rate: usize,
    full_rounds: usize,
    partial_rounds: usize,
) -> (Vec<Vec<F>>, Vec<Vec<F>>) {
    let width = rate + 1;
    let total_rounds = full_rounds + partial_rounds;
    let mut rng = StdRng::seed_from_u64(POSEIDON_SEED);

    let ark = (0..total_rounds)
        .map(|_| (0..width).map(|_| F::rand(&mut rng)).collect())
        .collect();

    // Circulant (2, 1, 1): every square submatrix is non-singular for width 3.
    let mds = (0..width)
        .map(|i| {
            (0..width)
                .map(|j| if i == j { F::from(2u64) } else { F::one() })
                .collect()
        })
        .collect();

    (ark, mds)
}

fn tagged<T: Clone>(tag: T, inputs: &[T]) -> Vec<T> {
    let mut tagged = Vec::with_capacity(inputs.len() + 1);
    tagged.push(tag);
    tagged.extend_from_slice(inputs);
    tagged
}

/// H(inputs) computed natively.
pub fn poseidon_hash<F: PrimeField + Absorb>(config: &PoseidonConfig<F>, inputs: &[F]) -> F {
    let mut sponge = PoseidonSponge::new(config);
    sponge.absorb(&tagged(F::from(inputs.len() as u64), inputs));
    sponge.squeeze_field_elements::<F>(1)[0]
}

/// H(left, right), the node combiner of the Merkle tree.
pub fn hash_two<F: PrimeField + Absorb>(config: &PoseidonConfig<F>, left: F, right: F) -> F {
    poseidon_hash(config, &[left, right])
}

/// H(0), the value of every unused leaf.
pub fn empty_leaf<F: PrimeField + Absorb>(config: &PoseidonConfig<F>) -> F {
    poseidon_hash(config, &[F::zero()])
}

/// Poseidon gadget for in-circuit hashing.
pub struct PoseidonGadget<F: PrimeField> {
    cs: ConstraintSystemRef<F>,
    config: PoseidonConfig<F>,
}

impl<F: PrimeField + Absorb> PoseidonGadget<F> {
    pub fn new(cs: ConstraintSystemRef<F>, config: PoseidonConfig<F>) -> Self {
        Self { cs, config }
    }

    pub fn config(&self) -> &PoseidonConfig<F> {
        &self.config
    }

    /// Compute H(inputs) in-circuit.
    pub fn hash(&self, inputs: &[FpVar<F>]) -> Result<FpVar<F>, SynthesisError> {
        let tag = FpVar::constant(F::from(inputs.len() as u64));
        let mut sponge = PoseidonSpongeVar::new(self.cs.clone(), &self.config);
        sponge.absorb(&tagged(tag, inputs))?;
        let output = sponge.squeeze_field_elements(1)?;
        Ok(output[0].clone())
    }

    pub fn hash_two(
        &self,
        left: &FpVar<F>,
        right: &FpVar<F>,
    ) -> Result<FpVar<F>, SynthesisError> {
        self.hash(&[left.clone(), right.clone()])
    }

    /// H(0) as a circuit constant.
    pub fn empty_leaf(&self) -> FpVar<F> {
        FpVar::constant(empty_leaf(&self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_r1cs_std::{alloc::AllocVar, eq::EqGadget};
    use ark_relations::r1cs::ConstraintSystem;

    #[test]
    fn test_config_is_deterministic() {
        let a = poseidon_config::<Fr>();
        let b = poseidon_config::<Fr>();
        assert_eq!(a.ark, b.ark);
        assert_eq!(a.mds, b.mds);
    }

    #[test]
    fn test_arity_is_domain_separated() {
        let config = poseidon_config::<Fr>();
        let one = Fr::from(1u64);
        let two = Fr::from(2u64);

        let pair = poseidon_hash(&config, &[one, two]);
        let padded = poseidon_hash(&config, &[one, two, Fr::from(0u64)]);
        assert_ne!(pair, padded);
        assert_ne!(empty_leaf(&config), Fr::from(0u64));
    }

    #[test]
    fn test_in_circuit_hash_matches_native() {
        let config = poseidon_config::<Fr>();
        let inputs = [Fr::from(7u64), Fr::from(100u64), Fr::from(12345u64)];
        let expected = poseidon_hash(&config, &inputs);

        let cs = ConstraintSystem::<Fr>::new_ref();
        let gadget = PoseidonGadget::new(cs.clone(), config);
        let input_vars: Vec<FpVar<Fr>> = inputs
            .iter()
            .map(|f| FpVar::new_witness(cs.clone(), || Ok(*f)).unwrap())
            .collect();

        let computed = gadget.hash(&input_vars).unwrap();
        let expected_var = FpVar::new_input(cs.clone(), || Ok(expected)).unwrap();
        computed.enforce_equal(&expected_var).unwrap();

        assert!(cs.is_satisfied().unwrap());
    }
}
