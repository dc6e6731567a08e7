//! State transitions: public inputs, private witnesses and client-side planners.
//!
//! A planner takes the caller's working copy of the tree, derives the leaf
//! values and nullifier for one transition, writes the new commitment at the
//! requested fresh index and returns everything a prover needs.

use std::fmt;

use ark_crypto_primitives::sponge::Absorb;
use ark_ff::PrimeField;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commitment::{nullifier, spend_nullifier, Note};
use crate::encoding::to_decimal;
use crate::hash::empty_leaf;
use crate::smt::{LeafUpdate, MerklePath, MerkleTree, TreeError};

/// Errors raised while assembling a transition.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("deposit amount must be non-zero")]
    ZeroAmount,

    #[error("balance overflow: {balance} + {amount} exceeds u128")]
    BalanceOverflow { balance: u128, amount: u128 },

    #[error("insufficient balance: have {balance}, need {amount}")]
    InsufficientBalance { balance: u128, amount: u128 },

    #[error("a funded note needs its leaf index")]
    NoteIndexRequired,

    #[error("leaf {index} does not hold the note commitment")]
    NoteNotFound { index: u64 },

    #[error("leaf {index} is already occupied")]
    LeafOccupied { index: u64 },

    #[error("swap legs do not chain: withdrawal ends at {withdrawal_new_root}, deposit starts at {deposit_old_root}")]
    BrokenSwapChain {
        withdrawal_new_root: String,
        deposit_old_root: String,
    },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// The three transition kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Deposit,
    Withdrawal,
    Swap,
}

impl TransitionKind {
    pub const ALL: [TransitionKind; 3] = [Self::Deposit, Self::Withdrawal, Self::Swap];

    /// Length of the public signal vector the verifier expects.
    pub fn num_public_inputs(self) -> usize {
        match self {
            Self::Deposit | Self::Withdrawal => 5,
            Self::Swap => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Swap => "swap",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public inputs of a single deposit or withdrawal leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegPublicInputs<F> {
    pub amount: u128,
    pub currency: F,
    pub old_root: F,
    pub new_root: F,
    pub nullifier: F,
}

impl<F: PrimeField> LegPublicInputs<F> {
    /// `[amount, currency, old_root, new_root, nullifier]`
    pub fn to_public_signals(&self) -> Vec<F> {
        vec![
            F::from(self.amount),
            self.currency,
            self.old_root,
            self.new_root,
            self.nullifier,
        ]
    }
}

/// Private witness of a single leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegWitness<F> {
    pub secret: F,
    /// The note being spent (zero balance for a first deposit)
    pub old_note: Note<F>,
    pub new_randomness: F,
    pub old_path: MerklePath<F>,
    /// Path of the fresh leaf receiving the new commitment
    pub new_path: MerklePath<F>,
}

impl<F: PrimeField + Absorb> LegWitness<F> {
    pub fn depth(&self) -> usize {
        self.new_path.depth()
    }
}

/// A planned deposit or withdrawal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegTransition<F> {
    pub public: LegPublicInputs<F>,
    pub witness: LegWitness<F>,
    /// Note now stored at `leaf_index`; the client keeps it to spend later
    pub new_note: Note<F>,
    pub new_commitment: F,
    pub leaf_index: u64,
}

/// Public inputs of a swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapPublicInputs<F> {
    pub old_root: F,
    pub intermediate_root: F,
    pub new_root: F,
    pub withdrawal_amount: u128,
    pub withdrawal_currency: F,
    pub withdrawal_nullifier: F,
    pub deposit_amount: u128,
    pub deposit_currency: F,
    pub deposit_nullifier: F,
}

impl<F: PrimeField> SwapPublicInputs<F> {
    /// Chain a withdrawal leg into a deposit leg through their shared root.
    pub fn from_legs(
        withdrawal: &LegPublicInputs<F>,
        deposit: &LegPublicInputs<F>,
    ) -> Result<Self, TransitionError> {
        if withdrawal.new_root != deposit.old_root {
            return Err(TransitionError::BrokenSwapChain {
                withdrawal_new_root: to_decimal(&withdrawal.new_root),
                deposit_old_root: to_decimal(&deposit.old_root),
            });
        }

        Ok(Self {
            old_root: withdrawal.old_root,
            intermediate_root: withdrawal.new_root,
            new_root: deposit.new_root,
            withdrawal_amount: withdrawal.amount,
            withdrawal_currency: withdrawal.currency,
            withdrawal_nullifier: withdrawal.nullifier,
            deposit_amount: deposit.amount,
            deposit_currency: deposit.currency,
            deposit_nullifier: deposit.nullifier,
        })
    }

    pub fn withdrawal_leg(&self) -> LegPublicInputs<F> {
        LegPublicInputs {
            amount: self.withdrawal_amount,
            currency: self.withdrawal_currency,
            old_root: self.old_root,
            new_root: self.intermediate_root,
            nullifier: self.withdrawal_nullifier,
        }
    }

    pub fn deposit_leg(&self) -> LegPublicInputs<F> {
        LegPublicInputs {
            amount: self.deposit_amount,
            currency: self.deposit_currency,
            old_root: self.intermediate_root,
            new_root: self.new_root,
            nullifier: self.deposit_nullifier,
        }
    }

    /// `[old_root, intermediate_root, new_root, withdrawal_amount,
    /// withdrawal_currency, withdrawal_nullifier, deposit_amount,
    /// deposit_currency, deposit_nullifier]`
    pub fn to_public_signals(&self) -> Vec<F> {
        vec![
            self.old_root,
            self.intermediate_root,
            self.new_root,
            F::from(self.withdrawal_amount),
            self.withdrawal_currency,
            self.withdrawal_nullifier,
            F::from(self.deposit_amount),
            self.deposit_currency,
            self.deposit_nullifier,
        ]
    }
}

/// A planned swap: a withdrawal leg followed by a deposit leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapTransition<F> {
    pub public: SwapPublicInputs<F>,
    pub withdrawal: LegTransition<F>,
    pub deposit: LegTransition<F>,
}

/// Any state transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition<F> {
    Deposit(LegTransition<F>),
    Withdrawal(LegTransition<F>),
    Swap(SwapTransition<F>),
}

impl<F: PrimeField> Transition<F> {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::Deposit(_) => TransitionKind::Deposit,
            Self::Withdrawal(_) => TransitionKind::Withdrawal,
            Self::Swap(_) => TransitionKind::Swap,
        }
    }

    pub fn public_signals(&self) -> Vec<F> {
        match self {
            Self::Deposit(leg) | Self::Withdrawal(leg) => leg.public.to_public_signals(),
            Self::Swap(swap) => swap.public.to_public_signals(),
        }
    }

    pub fn old_root(&self) -> F {
        match self {
            Self::Deposit(leg) | Self::Withdrawal(leg) => leg.public.old_root,
            Self::Swap(swap) => swap.public.old_root,
        }
    }

    pub fn new_root(&self) -> F {
        match self {
            Self::Deposit(leg) | Self::Withdrawal(leg) => leg.public.new_root,
            Self::Swap(swap) => swap.public.new_root,
        }
    }

    /// Leaf writes in the order they were applied.
    pub fn new_commitments(&self) -> Vec<(u64, F)> {
        match self {
            Self::Deposit(leg) | Self::Withdrawal(leg) => vec![(leg.leaf_index, leg.new_commitment)],
            Self::Swap(swap) => vec![
                (swap.withdrawal.leaf_index, swap.withdrawal.new_commitment),
                (swap.deposit.leaf_index, swap.deposit.new_commitment),
            ],
        }
    }
}

/// Client-side inputs to a planner.
#[derive(Clone, Debug)]
pub struct LegRequest<F> {
    pub secret: F,
    /// Note being spent. A first deposit passes a zero-balance note.
    pub note: Note<F>,
    /// Leaf holding `note`; may be omitted only for a zero-balance note
    pub note_index: Option<u64>,
    pub amount: u128,
    pub new_randomness: F,
    /// Fresh leaf that receives the new commitment
    pub leaf_index: u64,
}

/// Plan a deposit of `request.amount` into `request.note`.
pub fn plan_deposit<F: PrimeField + Absorb>(
    tree: &mut MerkleTree<F>,
    request: &LegRequest<F>,
) -> Result<LegTransition<F>, TransitionError> {
    if request.amount == 0 {
        return Err(TransitionError::ZeroAmount);
    }
    let balance = request.note.balance;
    let new_balance =
        balance
            .checked_add(request.amount)
            .ok_or(TransitionError::BalanceOverflow {
                balance,
                amount: request.amount,
            })?;

    apply_leg(tree, request, TransitionKind::Deposit, new_balance)
}

/// Plan a withdrawal of `request.amount` from `request.note`.
pub fn plan_withdrawal<F: PrimeField + Absorb>(
    tree: &mut MerkleTree<F>,
    request: &LegRequest<F>,
) -> Result<LegTransition<F>, TransitionError> {
    let balance = request.note.balance;
    let new_balance =
        balance
            .checked_sub(request.amount)
            .ok_or(TransitionError::InsufficientBalance {
                balance,
                amount: request.amount,
            })?;
    if request.note_index.is_none() {
        return Err(TransitionError::NoteIndexRequired);
    }

    apply_leg(tree, request, TransitionKind::Withdrawal, new_balance)
}

/// Plan a swap: withdraw from one note, deposit into another.
///
/// `tree` is only modified if both legs plan successfully.
pub fn plan_swap<F: PrimeField + Absorb>(
    tree: &mut MerkleTree<F>,
    withdrawal: &LegRequest<F>,
    deposit: &LegRequest<F>,
) -> Result<SwapTransition<F>, TransitionError> {
    let mut working = tree.snapshot();

    let withdrawal = plan_withdrawal(&mut working, withdrawal)?;
    let deposit = plan_deposit(&mut working, deposit)?;
    let public = SwapPublicInputs::from_legs(&withdrawal.public, &deposit.public)?;

    *tree = working;
    Ok(SwapTransition {
        public,
        withdrawal,
        deposit,
    })
}

fn apply_leg<F: PrimeField + Absorb>(
    tree: &mut MerkleTree<F>,
    request: &LegRequest<F>,
    kind: TransitionKind,
    new_balance: u128,
) -> Result<LegTransition<F>, TransitionError> {
    let config = tree.config().clone();
    let note = request.note;
    // Only a deposit may start from nothing; a withdrawal always spends a real leaf.
    let bootstrap = kind == TransitionKind::Deposit && note.balance == 0;

    let old_path = match request.note_index {
        Some(index) if !bootstrap => {
            if tree.leaf(index)? != note.commitment(&config) {
                return Err(TransitionError::NoteNotFound { index });
            }
            tree.path(index)?
        }
        Some(index) => tree.path(index)?,
        // Unconstrained when bootstrapping; any well-formed path will do.
        None if bootstrap => tree.path(request.leaf_index)?,
        None => return Err(TransitionError::NoteIndexRequired),
    };

    if tree.leaf(request.leaf_index)? != empty_leaf(&config) {
        return Err(TransitionError::LeafOccupied {
            index: request.leaf_index,
        });
    }

    let old_root = tree.root();
    let nullifier = match kind {
        TransitionKind::Deposit => spend_nullifier(&config, request.secret, &note),
        _ => nullifier(&config, request.secret, note.commitment(&config)),
    };
    let new_note = Note::new(note.currency, new_balance, request.new_randomness);
    let new_commitment = new_note.commitment(&config);

    let LeafUpdate {
        root: new_root,
        path: new_path,
    } = tree.update_leaf(request.leaf_index, new_commitment)?;

    Ok(LegTransition {
        public: LegPublicInputs {
            amount: request.amount,
            currency: note.currency,
            old_root,
            new_root,
            nullifier,
        },
        witness: LegWitness {
            secret: request.secret,
            old_note: note,
            new_randomness: request.new_randomness,
            old_path,
            new_path,
        },
        new_note,
        new_commitment,
        leaf_index: request.leaf_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::{nullifier, BOOTSTRAP_NULLIFIER};
    use crate::hash::poseidon_config;
    use crate::smt::EmptyTree;
    use ark_bn254::Fr;
    use std::sync::Arc;

    fn fresh_tree() -> MerkleTree<Fr> {
        let config = Arc::new(poseidon_config::<Fr>());
        MerkleTree::from_empty(&EmptyTree::build(config, 4).unwrap())
    }

    fn first_deposit(amount: u128, leaf_index: u64) -> LegRequest<Fr> {
        LegRequest {
            secret: Fr::from(123456u64),
            note: Note::zero(Fr::from(1u64), Fr::from(1123u64)),
            note_index: None,
            amount,
            new_randomness: Fr::from(1123u64),
            leaf_index,
        }
    }

    #[test]
    fn test_plan_bootstrap_deposit() {
        let mut tree = fresh_tree();
        let before = tree.root();

        let leg = plan_deposit(&mut tree, &first_deposit(100, 3)).unwrap();

        assert_eq!(leg.public.old_root, before);
        assert_eq!(leg.public.new_root, tree.root());
        assert_eq!(leg.public.nullifier, Fr::from(BOOTSTRAP_NULLIFIER));
        assert_eq!(leg.new_note.balance, 100);
        assert_eq!(tree.leaf(3).unwrap(), leg.new_commitment);
        assert!(leg.witness.new_path.verify(tree.config(), leg.new_commitment, tree.root()));
    }

    #[test]
    fn test_plan_deposit_rejects_zero() {
        let mut tree = fresh_tree();
        let before = tree.root();

        let err = plan_deposit(&mut tree, &first_deposit(0, 3)).unwrap_err();
        assert!(matches!(err, TransitionError::ZeroAmount));
        assert_eq!(tree.root(), before);
    }

    #[test]
    fn test_plan_withdrawal_spends_note() {
        let mut tree = fresh_tree();
        let deposit = plan_deposit(&mut tree, &first_deposit(100, 0)).unwrap();

        let request = LegRequest {
            secret: Fr::from(123456u64),
            note: deposit.new_note,
            note_index: Some(0),
            amount: 100,
            new_randomness: Fr::from(77u64),
            leaf_index: 1,
        };
        let leg = plan_withdrawal(&mut tree, &request).unwrap();

        let expected = nullifier(tree.config(), Fr::from(123456u64), deposit.new_commitment);
        assert_eq!(leg.public.nullifier, expected);
        assert_eq!(leg.public.old_root, deposit.public.new_root);
        assert_eq!(leg.new_note.balance, 0);
        // The spent leaf stays in place.
        assert_eq!(tree.leaf(0).unwrap(), deposit.new_commitment);
    }

    #[test]
    fn test_zero_withdrawal_from_drained_note() {
        let mut tree = fresh_tree();
        let deposit = plan_deposit(&mut tree, &first_deposit(100, 0)).unwrap();
        let drain = plan_withdrawal(
            &mut tree,
            &LegRequest {
                secret: Fr::from(123456u64),
                note: deposit.new_note,
                note_index: Some(0),
                amount: 100,
                new_randomness: Fr::from(77u64),
                leaf_index: 1,
            },
        )
        .unwrap();
        assert_eq!(drain.new_note.balance, 0);

        let mut request = LegRequest {
            secret: Fr::from(123456u64),
            note: drain.new_note,
            note_index: Some(9),
            amount: 0,
            new_randomness: Fr::from(78u64),
            leaf_index: 2,
        };
        let err = plan_withdrawal(&mut tree.snapshot(), &request).unwrap_err();
        assert!(matches!(err, TransitionError::NoteNotFound { index: 9 }));

        request.note_index = Some(1);
        let leg = plan_withdrawal(&mut tree, &request).unwrap();
        let expected = nullifier(tree.config(), Fr::from(123456u64), drain.new_commitment);
        assert_eq!(leg.public.nullifier, expected);
        assert_ne!(leg.public.nullifier, Fr::from(BOOTSTRAP_NULLIFIER));
        assert_eq!(leg.witness.old_path.leaf_index(), 1);
    }

    #[test]
    fn test_plan_withdrawal_over_balance() {
        let mut tree = fresh_tree();
        let deposit = plan_deposit(&mut tree, &first_deposit(100, 0)).unwrap();

        let request = LegRequest {
            secret: Fr::from(123456u64),
            note: deposit.new_note,
            note_index: Some(0),
            amount: 101,
            new_randomness: Fr::from(77u64),
            leaf_index: 1,
        };
        let err = plan_withdrawal(&mut tree, &request).unwrap_err();
        assert!(matches!(
            err,
            TransitionError::InsufficientBalance {
                balance: 100,
                amount: 101
            }
        ));
    }

    #[test]
    fn test_plan_rejects_wrong_note_and_occupied_leaf() {
        let mut tree = fresh_tree();
        let deposit = plan_deposit(&mut tree, &first_deposit(100, 0)).unwrap();

        let mut request = LegRequest {
            secret: Fr::from(123456u64),
            note: deposit.new_note,
            note_index: Some(2),
            amount: 10,
            new_randomness: Fr::from(77u64),
            leaf_index: 1,
        };
        assert!(matches!(
            plan_withdrawal(&mut tree, &request).unwrap_err(),
            TransitionError::NoteNotFound { index: 2 }
        ));

        request.note_index = Some(0);
        request.leaf_index = 0;
        assert!(matches!(
            plan_withdrawal(&mut tree, &request).unwrap_err(),
            TransitionError::LeafOccupied { index: 0 }
        ));
    }

    #[test]
    fn test_plan_swap_chains_roots() {
        let mut tree = fresh_tree();
        let funded = plan_deposit(&mut tree, &first_deposit(100, 0)).unwrap();

        let withdrawal = LegRequest {
            secret: Fr::from(123456u64),
            note: funded.new_note,
            note_index: Some(0),
            amount: 40,
            new_randomness: Fr::from(5u64),
            leaf_index: 1,
        };
        let deposit = LegRequest {
            secret: Fr::from(654321u64),
            note: Note::zero(Fr::from(2u64), Fr::from(6u64)),
            note_index: None,
            amount: 80,
            new_randomness: Fr::from(6u64),
            leaf_index: 2,
        };

        let swap = plan_swap(&mut tree, &withdrawal, &deposit).unwrap();
        assert_eq!(swap.public.old_root, funded.public.new_root);
        assert_eq!(swap.public.intermediate_root, swap.withdrawal.public.new_root);
        assert_eq!(swap.public.intermediate_root, swap.deposit.public.old_root);
        assert_eq!(swap.public.new_root, tree.root());
        assert_eq!(swap.public.withdrawal_leg(), swap.withdrawal.public);
        assert_eq!(swap.public.deposit_leg(), swap.deposit.public);

        let transition = Transition::Swap(swap);
        assert_eq!(transition.public_signals().len(), TransitionKind::Swap.num_public_inputs());
        assert_eq!(transition.new_commitments().len(), 2);
    }

    #[test]
    fn test_failed_swap_leaves_tree_untouched() {
        let mut tree = fresh_tree();
        let funded = plan_deposit(&mut tree, &first_deposit(100, 0)).unwrap();
        let before = tree.root();

        let withdrawal = LegRequest {
            secret: Fr::from(123456u64),
            note: funded.new_note,
            note_index: Some(0),
            amount: 40,
            new_randomness: Fr::from(5u64),
            leaf_index: 1,
        };
        let deposit = first_deposit(0, 2);

        assert!(plan_swap(&mut tree, &withdrawal, &deposit).is_err());
        assert_eq!(tree.root(), before);
        assert_eq!(tree.leaf(1).unwrap(), empty_leaf(tree.config()));
    }

    #[test]
    fn test_broken_chain_detected() {
        let a = LegPublicInputs {
            amount: 1,
            currency: Fr::from(1u64),
            old_root: Fr::from(10u64),
            new_root: Fr::from(11u64),
            nullifier: Fr::from(7u64),
        };
        let mut b = a;
        b.old_root = Fr::from(12u64);

        let err = SwapPublicInputs::from_legs(&a, &b).unwrap_err();
        assert!(matches!(err, TransitionError::BrokenSwapChain { .. }));
        assert!(err.to_string().contains("11"));
    }

    #[test]
    fn test_leg_signal_order() {
        let leg = LegPublicInputs {
            amount: 5,
            currency: Fr::from(2u64),
            old_root: Fr::from(3u64),
            new_root: Fr::from(4u64),
            nullifier: Fr::from(6u64),
        };
        assert_eq!(
            leg.to_public_signals(),
            vec![Fr::from(5u64), Fr::from(2u64), Fr::from(3u64), Fr::from(4u64), Fr::from(6u64)]
        );
    }

    #[test]
    fn test_kind_serde() {
        assert_eq!(serde_json::to_string(&TransitionKind::Withdrawal).unwrap(), "\"withdrawal\"");
        let kind: TransitionKind = serde_json::from_str("\"swap\"").unwrap();
        assert_eq!(kind, TransitionKind::Swap);
    }
}
