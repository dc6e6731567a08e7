//! Range check gadgets for balances and amounts.
//!
//! All arithmetic happens in the scalar field, so `5 - 10` is a huge positive
//! element rather than an error. Balances are bounded to `BALANCE_BITS` bits and
//! every subtraction is checked to land back inside that bound.

use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

/// Width of balances and amounts (`u128`).
pub const BALANCE_BITS: usize = 128;

/// Enforce that a field element fits in `num_bits` bits.
///
/// The value is decomposed into its canonical little-endian bits and every bit
/// at position `num_bits` or above is forced to zero.
pub fn enforce_range<F: PrimeField>(
    value: &FpVar<F>,
    num_bits: usize,
) -> Result<(), SynthesisError> {
    let value_bits = value.to_bits_le()?;

    for bit in value_bits.iter().skip(num_bits) {
        bit.enforce_equal(&Boolean::FALSE)?;
    }

    Ok(())
}

/// Enforce that a value is a valid balance.
pub fn enforce_balance_range<F: PrimeField>(value: &FpVar<F>) -> Result<(), SynthesisError> {
    enforce_range(value, BALANCE_BITS)
}

/// Enforce that a >= b, assuming both are already balance-ranged.
///
/// If b > a then (a - b) wraps to p - (b - a), which has high bits set.
pub fn enforce_geq<F: PrimeField>(a: &FpVar<F>, b: &FpVar<F>) -> Result<(), SynthesisError> {
    let diff = a - b;
    enforce_balance_range(&diff)
}

/// Enforce that a value is not zero.
pub fn enforce_nonzero<F: PrimeField>(value: &FpVar<F>) -> Result<(), SynthesisError> {
    value.enforce_not_equal(&FpVar::zero())
}
