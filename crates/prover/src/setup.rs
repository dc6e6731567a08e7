//! Groth16 trusted setup and key persistence.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use ark_bn254::{Bn254, Fr};
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintSynthesizer;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore, SeedableRng};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use shielded_circuits::hash::POSEIDON_SEED;
use shielded_circuits::{
    poseidon_config, DepositCircuit, SwapCircuit, TransitionKind, WithdrawalCircuit,
};

use crate::ProverError;

const METADATA_FILE: &str = "keys.json";

/// Proving and verifying key for one circuit.
#[derive(Clone)]
pub struct KeyPair {
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
}

/// Keys for all three circuits at one tree depth.
#[derive(Clone)]
pub struct CircuitKeys {
    pub depth: usize,
    pub deposit: KeyPair,
    pub withdrawal: KeyPair,
    pub swap: KeyPair,
}

/// Written next to the key files; keys are only valid for the depth and
/// hash parameters they were generated with.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct KeyMetadata {
    depth: usize,
    poseidon_seed: u64,
}

fn run_setup<C, R>(circuit: C, rng: &mut R) -> Result<KeyPair, ProverError>
where
    C: ConstraintSynthesizer<Fr>,
    R: RngCore + CryptoRng,
{
    let (proving_key, verifying_key) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng)?;
    Ok(KeyPair {
        proving_key,
        verifying_key,
    })
}

pub fn setup_deposit<R: RngCore + CryptoRng>(
    rng: &mut R,
    depth: usize,
    config: Arc<PoseidonConfig<Fr>>,
) -> Result<KeyPair, ProverError> {
    run_setup(DepositCircuit::empty(depth, config), rng)
}

pub fn setup_withdrawal<R: RngCore + CryptoRng>(
    rng: &mut R,
    depth: usize,
    config: Arc<PoseidonConfig<Fr>>,
) -> Result<KeyPair, ProverError> {
    run_setup(WithdrawalCircuit::empty(depth, config), rng)
}

pub fn setup_swap<R: RngCore + CryptoRng>(
    rng: &mut R,
    depth: usize,
    config: Arc<PoseidonConfig<Fr>>,
) -> Result<KeyPair, ProverError> {
    run_setup(SwapCircuit::empty(depth, config), rng)
}

/// Run setup for every circuit, in parallel, with fresh randomness.
pub fn setup_all_circuits(depth: usize) -> Result<CircuitKeys, ProverError> {
    let config = Arc::new(poseidon_config::<Fr>());
    let start = Instant::now();

    let (deposit, (withdrawal, swap)) = rayon::join(
        || setup_deposit(&mut StdRng::from_entropy(), depth, config.clone()),
        || {
            rayon::join(
                || setup_withdrawal(&mut StdRng::from_entropy(), depth, config.clone()),
                || setup_swap(&mut StdRng::from_entropy(), depth, config.clone()),
            )
        },
    );

    let keys = CircuitKeys {
        depth,
        deposit: deposit?,
        withdrawal: withdrawal?,
        swap: swap?,
    };
    tracing::info!(depth, elapsed = ?start.elapsed(), "circuit setup complete");
    Ok(keys)
}

fn write_key<T: CanonicalSerialize>(path: &Path, key: &T) -> Result<(), ProverError> {
    let mut writer = BufWriter::new(File::create(path)?);
    key.serialize_compressed(&mut writer)?;
    Ok(())
}

fn read_key<T: CanonicalDeserialize>(path: &Path) -> Result<T, ProverError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(T::deserialize_compressed(reader)?)
}

impl CircuitKeys {
    pub fn keypair(&self, kind: TransitionKind) -> &KeyPair {
        match kind {
            TransitionKind::Deposit => &self.deposit,
            TransitionKind::Withdrawal => &self.withdrawal,
            TransitionKind::Swap => &self.swap,
        }
    }

    /// Save keys as `<kind>.pk` / `<kind>.vk` plus a metadata file.
    pub fn save_to_directory(&self, dir: &Path) -> Result<(), ProverError> {
        fs::create_dir_all(dir)?;

        for kind in TransitionKind::ALL {
            let pair = self.keypair(kind);
            write_key(&dir.join(format!("{kind}.pk")), &pair.proving_key)?;
            write_key(&dir.join(format!("{kind}.vk")), &pair.verifying_key)?;
        }

        let metadata = KeyMetadata {
            depth: self.depth,
            poseidon_seed: POSEIDON_SEED,
        };
        serde_json::to_writer_pretty(File::create(dir.join(METADATA_FILE))?, &metadata)?;
        Ok(())
    }

    /// Load keys previously written by [`CircuitKeys::save_to_directory`].
    pub fn load_from_directory(dir: &Path) -> Result<Self, ProverError> {
        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.exists() {
            return Err(ProverError::KeysMissing(dir.to_path_buf()));
        }
        let metadata: KeyMetadata =
            serde_json::from_reader(BufReader::new(File::open(&metadata_path)?))?;
        if metadata.poseidon_seed != POSEIDON_SEED {
            return Err(ProverError::IncompatibleKeys(format!(
                "generated with hash seed {:#x}",
                metadata.poseidon_seed
            )));
        }

        let load_pair = |kind: TransitionKind| -> Result<KeyPair, ProverError> {
            Ok(KeyPair {
                proving_key: read_key(&dir.join(format!("{kind}.pk")))?,
                verifying_key: read_key(&dir.join(format!("{kind}.vk")))?,
            })
        };

        let start = Instant::now();
        let keys = Self {
            depth: metadata.depth,
            deposit: load_pair(TransitionKind::Deposit)?,
            withdrawal: load_pair(TransitionKind::Withdrawal)?,
            swap: load_pair(TransitionKind::Swap)?,
        };
        tracing::info!(depth = keys.depth, elapsed = ?start.elapsed(), "circuit keys loaded");
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_keys() {
        let keys = setup_all_circuits(2).unwrap();
        let dir = tempfile::tempdir().unwrap();

        keys.save_to_directory(dir.path()).unwrap();
        let loaded = CircuitKeys::load_from_directory(dir.path()).unwrap();

        assert_eq!(loaded.depth, 2);
        for kind in TransitionKind::ALL {
            assert_eq!(
                loaded.keypair(kind).verifying_key,
                keys.keypair(kind).verifying_key
            );
        }
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = CircuitKeys::load_from_directory(&dir.path().join("nope"))
            .err()
            .unwrap();
        assert!(matches!(err, ProverError::KeysMissing(_)));
    }
}
