//! The ledger state machine.

use std::collections::HashSet;

use ark_bn254::Fr;
use shielded_circuits::{to_decimal, EmptyTree, MerkleTree, TransitionKind};
use shielded_prover::ProofSystem;

use crate::submission::{SignalView, Submission};
use crate::LedgerError;

/// Emitted for every accepted submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    RootUpdated {
        old_root: Fr,
        new_root: Fr,
    },
    TransitionProcessed {
        kind: TransitionKind,
        nullifiers: Vec<Fr>,
        leaf_indices: Vec<u64>,
        commitments: Vec<Fr>,
    },
}

/// Outcome of an accepted submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub kind: TransitionKind,
    pub old_root: Fr,
    pub new_root: Fr,
    pub leaf_indices: Vec<u64>,
    pub events: Vec<LedgerEvent>,
}

/// Canonical state plus the proof system used to gate updates.
pub struct Ledger<P: ProofSystem> {
    tree: MerkleTree<Fr>,
    spent: HashSet<Fr>,
    next_index: u64,
    events: Vec<LedgerEvent>,
    proof_system: P,
}

impl<P: ProofSystem> Ledger<P> {
    /// A fresh ledger starting from the precomputed empty tree.
    pub fn new(empty: &EmptyTree<Fr>, proof_system: P) -> Self {
        Self {
            tree: MerkleTree::from_empty(empty),
            spent: HashSet::new(),
            next_index: 0,
            events: Vec::new(),
            proof_system,
        }
    }

    pub fn root(&self) -> Fr {
        self.tree.root()
    }

    pub fn depth(&self) -> usize {
        self.tree.depth()
    }

    pub fn next_free_leaf_index(&self) -> u64 {
        self.next_index
    }

    pub fn is_spent(&self, nullifier: &Fr) -> bool {
        self.spent.contains(nullifier)
    }

    pub fn tree(&self) -> &MerkleTree<Fr> {
        &self.tree
    }

    /// Copy of the tree for planning and proving outside the ledger.
    pub fn snapshot(&self) -> MerkleTree<Fr> {
        self.tree.snapshot()
    }

    pub fn proof_system(&self) -> &P {
        &self.proof_system
    }

    /// Every event emitted so far, oldest first.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Validate and apply a proven transition.
    ///
    /// Nothing changes unless every check passes.
    pub fn submit(&mut self, submission: Submission<P::Proof>) -> Result<Receipt, LedgerError> {
        let kind = submission.kind;
        let view = SignalView::parse(kind, &submission.public_signals)?;

        if submission.commitments.len() != view.roots_after.len() {
            return Err(LedgerError::MalformedSubmission(format!(
                "{kind} inserts {} commitments, got {}",
                view.roots_after.len(),
                submission.commitments.len()
            )));
        }

        let current = self.tree.root();
        if view.old_root != current {
            tracing::warn!(%kind, "rejecting submission against a stale root");
            return Err(LedgerError::stale_root(current, view.old_root));
        }

        self.check_nullifiers(&view.nullifiers)?;

        let needed = submission.commitments.len() as u64;
        if self.next_index + needed > self.tree.capacity() {
            return Err(LedgerError::TreeFull {
                capacity: self.tree.capacity(),
            });
        }

        if !self
            .proof_system
            .verify(kind, &submission.proof, &submission.public_signals)?
        {
            tracing::warn!(%kind, "rejecting submission with an invalid proof");
            return Err(LedgerError::ProofInvalid(kind));
        }

        let leaf_indices = self.insert_commitments(&submission.commitments, &view.roots_after)?;

        self.spent.extend(view.nullifiers.iter().copied());
        self.next_index += needed;

        let new_root = view.new_root();
        let events = vec![
            LedgerEvent::RootUpdated {
                old_root: current,
                new_root,
            },
            LedgerEvent::TransitionProcessed {
                kind,
                nullifiers: view.nullifiers,
                leaf_indices: leaf_indices.clone(),
                commitments: submission.commitments,
            },
        ];
        self.events.extend(events.iter().cloned());

        tracing::info!(
            %kind,
            root = %to_decimal(&new_root),
            next_index = self.next_index,
            "transition accepted"
        );

        Ok(Receipt {
            kind,
            old_root: current,
            new_root,
            leaf_indices,
            events,
        })
    }

    fn check_nullifiers(&self, nullifiers: &[Fr]) -> Result<(), LedgerError> {
        for (i, nullifier) in nullifiers.iter().enumerate() {
            if self.is_spent(nullifier) || nullifiers[..i].contains(nullifier) {
                tracing::warn!(nullifier = %to_decimal(nullifier), "rejecting double spend");
                return Err(LedgerError::NullifierAlreadySpent(to_decimal(nullifier)));
            }
        }
        Ok(())
    }

    /// Write `commitments` at the next free indices, checking the root after
    /// each write. On mismatch all writes are undone.
    fn insert_commitments(
        &mut self,
        commitments: &[Fr],
        roots_after: &[Fr],
    ) -> Result<Vec<u64>, LedgerError> {
        let mut applied: Vec<(u64, Fr)> = Vec::with_capacity(commitments.len());

        for (offset, (commitment, claimed)) in commitments.iter().zip(roots_after).enumerate() {
            let index = self.next_index + offset as u64;
            let previous = self.tree.leaf(index)?;
            let update = self.tree.update_leaf(index, *commitment)?;
            applied.push((index, previous));

            if update.root != *claimed {
                for (index, previous) in applied.into_iter().rev() {
                    self.tree.update_leaf(index, previous)?;
                }
                tracing::warn!(index, "rejecting submission whose commitment does not match its root");
                return Err(LedgerError::root_mismatch(*claimed, update.root));
            }
        }

        Ok(applied.into_iter().map(|(index, _)| index).collect())
    }
}
