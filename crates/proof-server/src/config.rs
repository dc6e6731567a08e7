//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use shielded_circuits::DEFAULT_DEPTH;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid value {value:?} for {name}: {reason}")]
pub struct ConfigError {
    name: &'static str,
    value: String,
    reason: String,
}

/// Which proof system backs the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProverKind {
    Groth16,
    /// Constraint checking only; no keys needed
    Mock,
}

impl FromStr for ProverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "groth16" => Ok(Self::Groth16),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown prover {other:?}, expected groth16 or mock")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub tree_depth: usize,
    pub tree_artifact: PathBuf,
    pub keys_dir: PathBuf,
    pub prover: ProverKind,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            tree_depth: DEFAULT_DEPTH,
            tree_artifact: PathBuf::from("data/precomputedSparseTree.json"),
            keys_dir: PathBuf::from("keys"),
            prover: ProverKind::Groth16,
        }
    }
}

fn var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    match std::env::var(name) {
        Ok(value) => value.parse().map_err(|e: T::Err| ConfigError {
            name,
            value,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Read `SHIELDED_*` variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: var("SHIELDED_BIND_ADDR", defaults.bind_addr)?,
            tree_depth: var("SHIELDED_TREE_DEPTH", defaults.tree_depth)?,
            tree_artifact: var("SHIELDED_TREE_ARTIFACT", defaults.tree_artifact)?,
            keys_dir: var("SHIELDED_KEYS_DIR", defaults.keys_dir)?,
            prover: var("SHIELDED_PROVER", defaults.prover)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prover_kind_parse() {
        assert_eq!("Mock".parse::<ProverKind>().unwrap(), ProverKind::Mock);
        assert_eq!("groth16".parse::<ProverKind>().unwrap(), ProverKind::Groth16);
        assert!("plonk".parse::<ProverKind>().is_err());
    }

    #[test]
    fn test_var_parse_error() {
        std::env::set_var("SHIELDED_TEST_DEPTH", "deep");
        let err = var("SHIELDED_TEST_DEPTH", 20usize).unwrap_err();
        assert!(err.to_string().contains("SHIELDED_TEST_DEPTH"));

        std::env::remove_var("SHIELDED_TEST_DEPTH");
        assert_eq!(var("SHIELDED_TEST_DEPTH", 20usize).unwrap(), 20);
    }
}
