//! Export verifying keys as hex for external verifiers.
//!
//! Usage: export-vks [--keys-dir DIR] [--out FILE]
//!
//! Keys are loaded from the key directory written by the proof server; with
//! no `--out` the JSON is printed to stdout.

use std::fs;
use std::path::PathBuf;

use ark_serialize::CanonicalSerialize;
use serde::Serialize;
use shielded_circuits::TransitionKind;
use shielded_prover::{CircuitKeys, ProverError};

#[derive(Serialize)]
struct ExportedKey {
    kind: TransitionKind,
    public_inputs: usize,
    verifying_key: String,
}

#[derive(Serialize)]
struct Export {
    depth: usize,
    keys: Vec<ExportedKey>,
}

fn print_help() {
    println!("Usage: export-vks [--keys-dir DIR] [--out FILE]");
}

fn main() -> Result<(), ProverError> {
    let args: Vec<String> = std::env::args().collect();
    let mut keys_dir = PathBuf::from("keys");
    let mut out: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--keys-dir" => {
                i += 1;
                if let Some(dir) = args.get(i) {
                    keys_dir = PathBuf::from(dir);
                }
            }
            "--out" => {
                i += 1;
                out = args.get(i).map(PathBuf::from);
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let keys = CircuitKeys::load_from_directory(&keys_dir)?;

    let mut exported = Vec::new();
    for kind in TransitionKind::ALL {
        let mut bytes = Vec::new();
        keys.keypair(kind)
            .verifying_key
            .serialize_compressed(&mut bytes)?;
        exported.push(ExportedKey {
            kind,
            public_inputs: kind.num_public_inputs(),
            verifying_key: hex::encode(bytes),
        });
    }

    let json = serde_json::to_string_pretty(&Export {
        depth: keys.depth,
        keys: exported,
    })?;

    match out {
        Some(path) => {
            fs::write(&path, json)?;
            println!("Verifying keys written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
