//! What a client hands to the ledger, and how the ledger reads it.

use ark_bn254::Fr;
use shielded_circuits::{Transition, TransitionKind, BOOTSTRAP_NULLIFIER};

use crate::LedgerError;

/// A proven transition as submitted to the ledger.
#[derive(Clone, Debug)]
pub struct Submission<P> {
    pub kind: TransitionKind,
    pub proof: P,
    /// Ordered public signals the proof is checked against
    pub public_signals: Vec<Fr>,
    /// New leaf values, in insertion order
    pub commitments: Vec<Fr>,
}

impl<P> Submission<P> {
    pub fn new(transition: &Transition<Fr>, proof: P) -> Self {
        Self {
            kind: transition.kind(),
            proof,
            public_signals: transition.public_signals(),
            commitments: transition
                .new_commitments()
                .into_iter()
                .map(|(_, commitment)| commitment)
                .collect(),
        }
    }
}

/// Roots and nullifiers extracted from a submission's public signals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalView {
    pub old_root: Fr,
    /// Root expected after each commitment is inserted; the last is the new root
    pub roots_after: Vec<Fr>,
    /// Nullifiers that must be unspent and are recorded on acceptance
    pub nullifiers: Vec<Fr>,
}

impl SignalView {
    /// Split `signals` according to the verifier order of `kind`.
    pub fn parse(kind: TransitionKind, signals: &[Fr]) -> Result<Self, LedgerError> {
        let expected = kind.num_public_inputs();
        if signals.len() != expected {
            return Err(LedgerError::MalformedSubmission(format!(
                "{kind} expects {expected} public signals, got {}",
                signals.len()
            )));
        }

        let bootstrap = Fr::from(BOOTSTRAP_NULLIFIER);
        let view = match kind {
            // [amount, currency, old_root, new_root, nullifier]
            TransitionKind::Deposit => Self {
                old_root: signals[2],
                roots_after: vec![signals[3]],
                nullifiers: [signals[4]]
                    .into_iter()
                    .filter(|nf| *nf != bootstrap)
                    .collect(),
            },
            TransitionKind::Withdrawal => Self {
                old_root: signals[2],
                roots_after: vec![signals[3]],
                nullifiers: vec![signals[4]],
            },
            // [old_root, intermediate_root, new_root, w_amount, w_currency,
            //  w_nullifier, d_amount, d_currency, d_nullifier]
            TransitionKind::Swap => {
                let mut nullifiers = vec![signals[5]];
                if signals[8] != bootstrap {
                    nullifiers.push(signals[8]);
                }
                Self {
                    old_root: signals[0],
                    roots_after: vec![signals[1], signals[2]],
                    nullifiers,
                }
            }
        };
        Ok(view)
    }

    pub fn new_root(&self) -> Fr {
        // Every kind inserts at least one leaf
        self.roots_after[self.roots_after.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(n: u64) -> Vec<Fr> {
        (1..=n).map(Fr::from).collect()
    }

    #[test]
    fn test_parse_leg() {
        let view = SignalView::parse(TransitionKind::Withdrawal, &signals(5)).unwrap();
        assert_eq!(view.old_root, Fr::from(3u64));
        assert_eq!(view.new_root(), Fr::from(4u64));
        assert_eq!(view.nullifiers, vec![Fr::from(5u64)]);
    }

    #[test]
    fn test_bootstrap_nullifier_not_tracked() {
        let mut deposit = signals(5);
        deposit[4] = Fr::from(BOOTSTRAP_NULLIFIER);
        let view = SignalView::parse(TransitionKind::Deposit, &deposit).unwrap();
        assert!(view.nullifiers.is_empty());

        let mut swap = signals(9);
        swap[8] = Fr::from(BOOTSTRAP_NULLIFIER);
        let view = SignalView::parse(TransitionKind::Swap, &swap).unwrap();
        assert_eq!(view.nullifiers, vec![Fr::from(6u64)]);
        assert_eq!(view.roots_after, vec![Fr::from(2u64), Fr::from(3u64)]);
    }

    #[test]
    fn test_wrong_length() {
        let err = SignalView::parse(TransitionKind::Swap, &signals(5)).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedSubmission(_)));
    }
}
