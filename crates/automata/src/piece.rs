//! Run pieces: candidate partial subtrees under construction.
//!
//! A piece summarises a finite subtree by the sets of states it touches,
//! so the search can decide acceptance-compatible combination without
//! walking the structure. Composite pieces keep `Arc` references to the
//! pieces they were combined from; the shared references let a piece
//! outlive the generation list it was drawn from, and the atomic
//! `invalid` flag lets the between-generation reaper tombstone a piece
//! that is still referenced elsewhere.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering::Relaxed};

use rabbet_bitset::DenseBitSet;

use crate::automaton::State;
use crate::run::RunTree;

/// A candidate partial subtree rooted at `state`.
pub(crate) struct Piece {
    state: State,
    graft: bool,
    /// Structural height: leaves are 0, a composite is one more than its
    /// taller child. Mutable only on the per-state graft sentinels, which
    /// track the height of the last installed witness.
    height: AtomicU32,
    /// States at non-leaf positions.
    internal: DenseBitSet,
    /// Leaf states not yet proven live.
    nonlive: DenseBitSet,
    /// Every state occurring anywhere in the piece.
    all: DenseBitSet,
    /// Lazy tombstone; invalid pieces are skipped and reaped.
    invalid: AtomicBool,
    children: Option<[Arc<Piece>; 2]>,
}

/// The result of combining two child pieces under a transition.
pub(crate) enum Combined {
    /// Every leaf closed: the subtree is accepted and ready to install.
    Complete { tree: RunTree, height: u32 },
    /// Some leaves remain unproven; the piece goes back into the search.
    Partial(Piece),
}

impl Piece {
    /// The trivial height-0 piece seeding the search at `s`: a lone
    /// unproven leaf.
    pub fn seed(states: State, s: State) -> Self {
        let mut singleton = DenseBitSet::with_capacity(states);
        singleton.insert(s);
        Self {
            state: s,
            graft: false,
            height: AtomicU32::new(0),
            internal: DenseBitSet::with_capacity(states),
            nonlive: singleton.clone(),
            all: singleton,
            invalid: AtomicBool::new(false),
            children: None,
        }
    }

    /// The reusable graft sentinel for `q`: a leaf standing for "continue
    /// as the witness of `q`". Nothing about it is unproven.
    pub fn sentinel(states: State, q: State) -> Self {
        let mut singleton = DenseBitSet::with_capacity(states);
        singleton.insert(q);
        Self {
            state: q,
            graft: true,
            height: AtomicU32::new(0),
            internal: DenseBitSet::with_capacity(states),
            nonlive: DenseBitSet::with_capacity(states),
            all: singleton,
            invalid: AtomicBool::new(false),
            children: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_graft(&self) -> bool {
        self.graft
    }

    pub fn height(&self) -> u32 {
        self.height.load(Relaxed)
    }

    /// Raise a sentinel's height to that of the newly installed witness.
    pub fn set_height(&self, height: u32) {
        debug_assert!(self.graft);
        self.height.store(height, Relaxed);
    }

    pub fn internal(&self) -> &DenseBitSet {
        &self.internal
    }

    pub fn nonlive(&self) -> &DenseBitSet {
        &self.nonlive
    }

    pub fn all(&self) -> &DenseBitSet {
        &self.all
    }

    pub fn invalidate(&self) {
        self.invalid.store(true, Relaxed);
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid.load(Relaxed)
    }

    pub fn children(&self) -> Option<&[Arc<Piece>; 2]> {
        self.children.as_ref()
    }

    /// The total order used for canonical sorting. All pieces of one
    /// search target the same run, so the order starts at the graft flag.
    pub fn total_cmp(&self, other: &Piece) -> Ordering {
        self.graft
            .cmp(&other.graft)
            .then_with(|| self.state.cmp(&other.state))
            .then_with(|| self.height().cmp(&other.height()))
            .then_with(|| self.internal.cmp(&other.internal))
            .then_with(|| self.nonlive.cmp(&other.nonlive))
            .then_with(|| self.all.cmp(&other.all))
    }

    /// Two pieces agreeing on everything but height are interchangeable
    /// to the search; only the smaller by [`total_cmp`](Self::total_cmp)
    /// is worth keeping.
    pub fn similar(&self, other: &Piece) -> bool {
        self.graft == other.graft
            && self.state == other.state
            && self.internal == other.internal
            && self.nonlive == other.nonlive
            && self.all == other.all
    }

    /// Unfold into the node-tree transfer form. A composite becomes an
    /// interior node over its unfolded children. Any childless piece
    /// becomes a graft leaf: a sentinel refers to an installed witness,
    /// and a seed leaf only reaches this point once an enclosing
    /// combination closed its state, so the state it names is witnessed
    /// by the same installation.
    pub fn unfold(&self) -> RunTree {
        match &self.children {
            Some([left, right]) => {
                RunTree::interior(self.state, left.unfold(), right.unfold())
            }
            None => RunTree::graft(self.state),
        }
    }
}

/// Combine two child pieces under a transition out of `state`.
pub(crate) fn combine(state: State, left: &Arc<Piece>, right: &Arc<Piece>) -> Combined {
    let height = 1 + left.height().max(right.height());
    let mut nonlive = left.nonlive.clone();
    nonlive.union_with(&right.nonlive);
    nonlive.remove(state);
    if nonlive.is_empty() {
        let tree = RunTree::interior(state, left.unfold(), right.unfold());
        return Combined::Complete { tree, height };
    }
    let mut internal = left.internal.clone();
    internal.union_with(&right.internal);
    internal.insert(state);
    let mut all = left.all.clone();
    all.union_with(&right.all);
    all.insert(state);
    Combined::Partial(Piece {
        state,
        graft: false,
        height: AtomicU32::new(height),
        internal,
        nonlive,
        all,
        invalid: AtomicBool::new(false),
        children: Some([Arc::clone(left), Arc::clone(right)]),
    })
}
