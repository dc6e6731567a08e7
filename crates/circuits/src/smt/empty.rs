//! The precomputed all-empty tree.
//!
//! Built once bottom-up from H(0) and persisted as a JSON array of levels
//! (level 0 first, root last) of decimal field-element strings. Every
//! fresh [`MerkleTree`](super::MerkleTree) starts from this arena instead of
//! rehashing 2^D leaves.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use ark_crypto_primitives::sponge::{poseidon::PoseidonConfig, Absorb};
use ark_ff::PrimeField;
use rayon::prelude::*;

use super::{TreeError, MAX_DEPTH};
use crate::encoding::{parse_field, to_decimal};
use crate::hash::{empty_leaf, hash_two};

#[derive(Clone)]
pub struct EmptyTree<F: PrimeField> {
    depth: usize,
    levels: Arc<Vec<Vec<F>>>,
    config: Arc<PoseidonConfig<F>>,
}

impl<F: PrimeField + Absorb> EmptyTree<F> {
    /// Build the canonical empty tree of the given depth.
    ///
    /// Every node of a level is identical, so only one hash per level is
    /// computed; the arena is still materialized in full.
    pub fn build(config: Arc<PoseidonConfig<F>>, depth: usize) -> Result<Self, TreeError> {
        check_depth(depth)?;

        let mut levels = Vec::with_capacity(depth + 1);
        let mut node = empty_leaf(&config);
        for d in 0..=depth {
            levels.push(vec![node; 1 << (depth - d)]);
            if d < depth {
                node = hash_two(&config, node, node);
            }
        }

        tracing::debug!(depth, "built empty tree");
        Ok(Self {
            depth,
            levels: Arc::new(levels),
            config,
        })
    }

    /// Wrap precomputed levels after checking them against H.
    pub fn from_levels(
        config: Arc<PoseidonConfig<F>>,
        depth: usize,
        levels: Vec<Vec<F>>,
    ) -> Result<Self, TreeError> {
        check_depth(depth)?;
        validate_levels(&config, depth, &levels)?;
        Ok(Self {
            depth,
            levels: Arc::new(levels),
            config,
        })
    }

    /// Load a persisted artifact. A missing file is fatal for the caller.
    pub fn load(
        config: Arc<PoseidonConfig<F>>,
        depth: usize,
        path: &Path,
    ) -> Result<Self, TreeError> {
        if !path.exists() {
            return Err(TreeError::ArtifactMissing(path.to_path_buf()));
        }

        let reader = BufReader::new(File::open(path)?);
        let raw: Vec<Vec<String>> = serde_json::from_reader(reader)?;

        let levels = raw
            .par_iter()
            .map(|level| {
                level
                    .iter()
                    .map(|value| parse_field::<F>(value))
                    .collect::<Result<Vec<F>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tree = Self::from_levels(config, depth, levels)?;
        tracing::info!(depth, path = %path.display(), "loaded precomputed empty tree");
        Ok(tree)
    }

    /// Persist the arena as JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), TreeError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let encoded: Vec<Vec<String>> = self
            .levels
            .par_iter()
            .map(|level| level.iter().map(to_decimal).collect())
            .collect();

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &encoded)?;
        writer.flush()?;

        tracing::info!(depth = self.depth, path = %path.display(), "saved precomputed empty tree");
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn root(&self) -> F {
        self.levels[self.depth][0]
    }

    pub fn config(&self) -> &Arc<PoseidonConfig<F>> {
        &self.config
    }

    pub(super) fn shared_levels(&self) -> Arc<Vec<Vec<F>>> {
        Arc::clone(&self.levels)
    }
}

fn check_depth(depth: usize) -> Result<(), TreeError> {
    if depth == 0 || depth > MAX_DEPTH {
        return Err(TreeError::UnsupportedDepth(depth));
    }
    Ok(())
}

fn validate_levels<F: PrimeField + Absorb>(
    config: &PoseidonConfig<F>,
    depth: usize,
    levels: &[Vec<F>],
) -> Result<(), TreeError> {
    if levels.len() != depth + 1 {
        return Err(TreeError::ArtifactMismatch(format!(
            "expected {} levels, found {}",
            depth + 1,
            levels.len()
        )));
    }

    let mut expected = empty_leaf(config);
    for (d, level) in levels.iter().enumerate() {
        let width = 1usize << (depth - d);
        if level.len() != width {
            return Err(TreeError::ArtifactMismatch(format!(
                "level {d} has {} nodes, expected {width}",
                level.len()
            )));
        }
        if level.par_iter().any(|node| *node != expected) {
            return Err(TreeError::ArtifactMismatch(format!(
                "level {d} does not match the empty-subtree hash"
            )));
        }
        expected = hash_two(config, expected, expected);
    }

    Ok(())
}
