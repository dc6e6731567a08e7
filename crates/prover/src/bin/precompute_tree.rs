//! Build the all-empty tree for a depth and write it as a JSON artifact.
//!
//! Usage: precompute-tree [--depth N] [--out FILE]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ark_bn254::Fr;
use shielded_circuits::{poseidon_config, to_decimal, EmptyTree, TreeError, DEFAULT_DEPTH};

const DEFAULT_OUT: &str = "data/precomputedSparseTree.json";

fn print_help() {
    println!("Usage: precompute-tree [--depth N] [--out FILE]");
    println!("  --depth N    tree depth (default {DEFAULT_DEPTH})");
    println!("  --out FILE   output path (default {DEFAULT_OUT})");
}

fn main() -> Result<(), TreeError> {
    let args: Vec<String> = std::env::args().collect();
    let mut depth = DEFAULT_DEPTH;
    let mut out = PathBuf::from(DEFAULT_OUT);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--depth" => {
                i += 1;
                match args.get(i).and_then(|d| d.parse().ok()) {
                    Some(d) => depth = d,
                    None => {
                        eprintln!("--depth expects a number");
                        std::process::exit(1);
                    }
                }
            }
            "--out" => {
                i += 1;
                if let Some(path) = args.get(i) {
                    out = PathBuf::from(path);
                }
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

    let start = Instant::now();
    let tree = EmptyTree::build(Arc::new(poseidon_config::<Fr>()), depth)?;
    tree.save(&out)?;

    println!("Empty tree of depth {depth} written to {}", out.display());
    println!("  Root: {}", to_decimal(&tree.root()));
    println!("  Took: {:?}", start.elapsed());
    Ok(())
}
