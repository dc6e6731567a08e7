//! Print constraint counts for every circuit at a given tree depth.
//!
//! Usage: circuit-stats [depth]

use std::sync::Arc;
use std::time::Instant;

use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem, SynthesisError, SynthesisMode};
use shielded_circuits::{
    poseidon_config, DepositCircuit, SwapCircuit, WithdrawalCircuit, DEFAULT_DEPTH,
};

fn count<C: ConstraintSynthesizer<Fr>>(name: &str, circuit: C) -> Result<(), SynthesisError> {
    let cs = ConstraintSystem::<Fr>::new_ref();
    cs.set_mode(SynthesisMode::Setup);

    let start = Instant::now();
    circuit.generate_constraints(cs.clone())?;
    cs.finalize();

    println!(
        "{:<12} constraints: {:>8}  public inputs: {:>2}  witnesses: {:>8}  ({:?})",
        name,
        cs.num_constraints(),
        cs.num_instance_variables() - 1,
        cs.num_witness_variables(),
        start.elapsed()
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let depth = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<usize>()?,
        None => DEFAULT_DEPTH,
    };
    let config = Arc::new(poseidon_config::<Fr>());

    println!("Circuit statistics at tree depth {depth}");
    count("deposit", DepositCircuit::empty(depth, config.clone()))?;
    count("withdrawal", WithdrawalCircuit::empty(depth, config.clone()))?;
    count("swap", SwapCircuit::empty(depth, config))?;
    Ok(())
}
