//! Note commitments and spend nullifiers.
//!
//! A note is the private triple (currency, balance, randomness). Its leaf value is
//! `commit(currency, balance, randomness) = H(currency, balance, randomness)`, and
//! spending it publishes `H(secret, commitment)`.

use ark_crypto_primitives::sponge::{poseidon::PoseidonConfig, Absorb};
use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::SynthesisError;

use crate::hash::{poseidon_hash, PoseidonGadget};

/// Nullifier published by a deposit into a note that has never held funds.
///
/// A zero-balance note has nothing to double-spend, so the ledger does not
/// record this value in its spent set.
pub const BOOTSTRAP_NULLIFIER: u64 = 0;

/// Field value of [`BOOTSTRAP_NULLIFIER`].
pub fn bootstrap_nullifier<F: PrimeField>() -> F {
    F::from(BOOTSTRAP_NULLIFIER)
}

/// commit(currency, balance, randomness)
pub fn commit<F: PrimeField + Absorb>(
    config: &PoseidonConfig<F>,
    currency: F,
    balance: u128,
    randomness: F,
) -> F {
    poseidon_hash(config, &[currency, F::from(balance), randomness])
}

/// H(secret, commitment)
pub fn nullifier<F: PrimeField + Absorb>(
    config: &PoseidonConfig<F>,
    secret: F,
    commitment: F,
) -> F {
    poseidon_hash(config, &[secret, commitment])
}

/// Nullifier a transition spending `note` must publish.
pub fn spend_nullifier<F: PrimeField + Absorb>(
    config: &PoseidonConfig<F>,
    secret: F,
    note: &Note<F>,
) -> F {
    if note.balance == 0 {
        bootstrap_nullifier()
    } else {
        nullifier(config, secret, note.commitment(config))
    }
}

/// Private contents of a leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Note<F> {
    pub currency: F,
    pub balance: u128,
    pub randomness: F,
}

impl<F: PrimeField + Absorb> Note<F> {
    pub fn new(currency: F, balance: u128, randomness: F) -> Self {
        Self {
            currency,
            balance,
            randomness,
        }
    }

    /// The zero-balance note a first deposit starts from.
    pub fn zero(currency: F, randomness: F) -> Self {
        Self::new(currency, 0, randomness)
    }

    pub fn commitment(&self, config: &PoseidonConfig<F>) -> F {
        commit(config, self.currency, self.balance, self.randomness)
    }
}

/// In-circuit commit(currency, balance, randomness).
pub fn commit_var<F: PrimeField + Absorb>(
    poseidon: &PoseidonGadget<F>,
    currency: &FpVar<F>,
    balance: &FpVar<F>,
    randomness: &FpVar<F>,
) -> Result<FpVar<F>, SynthesisError> {
    poseidon.hash(&[currency.clone(), balance.clone(), randomness.clone()])
}

/// In-circuit H(secret, commitment).
pub fn nullifier_var<F: PrimeField + Absorb>(
    poseidon: &PoseidonGadget<F>,
    secret: &FpVar<F>,
    commitment: &FpVar<F>,
) -> Result<FpVar<F>, SynthesisError> {
    poseidon.hash(&[secret.clone(), commitment.clone()])
}
