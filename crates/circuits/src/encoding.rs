//! String codecs for field elements.
//!
//! Field elements are written as decimal strings. Parsing also accepts
//! `0x`-prefixed hex, which is how currency addresses usually arrive.

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use num_traits::Num;
use thiserror::Error;

/// Errors while decoding a field element string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid field element string {0:?}")]
    Invalid(String),
    #[error("field element {0} is not below the field modulus")]
    OutOfField(String),
}

fn to_biguint<F: PrimeField>(value: &F) -> BigUint {
    BigUint::from_bytes_le(&value.into_bigint().to_bytes_le())
}

fn modulus<F: PrimeField>() -> BigUint {
    BigUint::from_bytes_le(&F::MODULUS.to_bytes_le())
}

/// Canonical decimal representation.
pub fn to_decimal<F: PrimeField>(value: &F) -> String {
    to_biguint(value).to_str_radix(10)
}

/// `0x`-prefixed lowercase hex representation.
pub fn to_hex<F: PrimeField>(value: &F) -> String {
    format!("0x{}", to_biguint(value).to_str_radix(16))
}

/// Parse a decimal or `0x`-prefixed hex string into a field element.
///
/// Values at or above the modulus are rejected rather than reduced.
pub fn parse_field<F: PrimeField>(input: &str) -> Result<F, CodecError> {
    let trimmed = input.trim();
    let (digits, radix) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };
    // `from_str_radix` tolerates `_` separators and a leading `+`.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(CodecError::Invalid(input.to_string()));
    }
    let value = BigUint::from_str_radix(digits, radix)
        .map_err(|_| CodecError::Invalid(input.to_string()))?;

    if value >= modulus::<F>() {
        return Err(CodecError::OutOfField(value.to_str_radix(10)));
    }

    Ok(F::from_le_bytes_mod_order(&value.to_bytes_le()))
}
