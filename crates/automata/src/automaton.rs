//! The Rabin automaton model: states, transitions, and acceptance pairs.

use rabbet_bitset::DenseBitSet;

use crate::run::Run;
use crate::search::Search;

/// A state identifier. States are densely numbered `0..N` with `N` fixed
/// when the automaton is constructed.
pub type State = u32;

/// One transition out of a state: the automaton may label the current tree
/// node with the source state and require the two subtrees to be accepted
/// from `left` and `right`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutTransition {
    /// State the left subtree must be accepted from.
    pub left: State,
    /// State the right subtree must be accepted from.
    pub right: State,
}

/// A Rabin pair `(l, u)`: an infinite branch satisfies the pair when it
/// visits no state of `l` infinitely often and some state of `u` infinitely
/// often. Pairs are stored normalised with `u` disjoint from `l`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acceptance {
    l: DenseBitSet,
    u: DenseBitSet,
}

impl Acceptance {
    /// The states a satisfying branch must eventually avoid.
    pub fn l(&self) -> &DenseBitSet {
        &self.l
    }

    /// The states a satisfying branch must revisit forever.
    pub fn u(&self) -> &DenseBitSet {
        &self.u
    }
}

/// Errors reported by [`RabinAutomaton::find_run`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The search needs at least one thread to run on.
    #[error("invalid max_threads (is less than 1)")]
    InvalidMaxThreads,
}

/// A Rabin automaton over infinite binary trees.
///
/// The automaton is built once through the mutation methods and is then
/// immutable for the lifetime of a [`find_run`](Self::find_run) search.
/// The mutation methods trust their arguments; callers constructing an
/// automaton from untrusted input (e.g. the text reader) must check state
/// numbers with [`is_valid_state`](Self::is_valid_state) first.
#[derive(Clone, Debug)]
pub struct RabinAutomaton {
    states: State,
    start: State,
    has_transitions: bool,
    transitions: Vec<Vec<OutTransition>>,
    conditions: Vec<Acceptance>,
}

impl RabinAutomaton {
    /// Create an automaton with `states` states, start state 0, no
    /// transitions, and no acceptance pairs.
    pub fn new(states: State) -> Self {
        Self {
            states,
            start: 0,
            has_transitions: false,
            transitions: vec![Vec::new(); states as usize],
            conditions: Vec::new(),
        }
    }

    /// The number of states.
    pub fn states(&self) -> State {
        self.states
    }

    /// The designated start state.
    pub fn start(&self) -> State {
        self.start
    }

    /// Designate `q` as the start state.
    pub fn set_start(&mut self, q: State) {
        debug_assert!(self.is_valid_state(q));
        self.start = q;
    }

    /// Is `q` a state of this automaton?
    pub fn is_valid_state(&self, q: State) -> bool {
        q < self.states
    }

    /// Append the transition `(from, left, right)` to `from`'s list.
    /// Multiple transitions from the same source are allowed and keep
    /// their insertion order.
    pub fn add_transition(&mut self, from: State, left: State, right: State) {
        debug_assert!(self.is_valid_state(from));
        debug_assert!(self.is_valid_state(left));
        debug_assert!(self.is_valid_state(right));
        self.transitions[from as usize].push(OutTransition { left, right });
        self.has_transitions = true;
    }

    /// Add the Rabin pair `(l, u)`. The pair is normalised to `u := u \ l`
    /// on insertion and silently dropped when `u` ends up empty (such a
    /// pair can never be satisfied). Identical pairs are not de-duplicated.
    pub fn add_acceptance(&mut self, l: DenseBitSet, mut u: DenseBitSet) {
        debug_assert_eq!(l.capacity(), self.states);
        debug_assert_eq!(u.capacity(), self.states);
        u.difference_with(&l);
        if !u.is_empty() {
            self.conditions.push(Acceptance { l, u });
        }
    }

    /// The transitions out of `q`, in insertion order.
    pub fn transitions(&self, q: State) -> &[OutTransition] {
        &self.transitions[q as usize]
    }

    /// The normalised acceptance pairs, in insertion order.
    pub fn conditions(&self) -> &[Acceptance] {
        &self.conditions
    }

    /// Does some pair accept a cycle through `pivot` whose states are
    /// contained in `visited`? This is the test the search applies when a
    /// candidate combination closes an inner loop: the pivot must recur
    /// (`pivot ∈ u`) while everything that may lie on the loop avoids `l`.
    pub(crate) fn accepts_cycle(&self, pivot: State, visited: &DenseBitSet) -> bool {
        self.conditions
            .iter()
            .any(|a| a.u.contains(pivot) && !a.l.intersects(visited))
    }

    /// Decide emptiness, using up to `max_threads` threads.
    ///
    /// Returns a [`Run`] folding an accepted infinite run of the automaton,
    /// or `None` when the language is empty. An automaton with no
    /// transitions, or whose every acceptance pair normalised away, is
    /// trivially empty and returns `None` without searching.
    pub fn find_run(&self, max_threads: usize) -> Result<Option<Run>, Error> {
        if max_threads < 1 {
            return Err(Error::InvalidMaxThreads);
        }
        if !self.has_transitions || self.conditions.is_empty() {
            log::debug!("trivially empty: no transitions or no acceptance pairs");
            return Ok(None);
        }
        Ok(Search::new(self).execute(max_threads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(capacity: u32, members: &[u32]) -> DenseBitSet {
        let mut set = DenseBitSet::with_capacity(capacity);
        for &m in members {
            set.insert(m);
        }
        set
    }

    #[test]
    fn acceptance_is_normalised() {
        let mut automaton = RabinAutomaton::new(4);
        automaton.add_acceptance(set_of(4, &[1, 2]), set_of(4, &[2, 3]));
        let pairs = automaton.conditions();
        assert_eq!(pairs.len(), 1);
        assert!(!pairs[0].l().intersects(pairs[0].u()));
        assert_eq!(pairs[0].u().iter().collect::<Vec<_>>(), [3]);
    }

    #[test]
    fn unsatisfiable_pair_is_dropped() {
        let mut automaton = RabinAutomaton::new(3);
        automaton.add_acceptance(set_of(3, &[0, 1, 2]), set_of(3, &[1, 2]));
        assert!(automaton.conditions().is_empty());
    }

    #[test]
    fn duplicate_pairs_are_kept() {
        let mut automaton = RabinAutomaton::new(2);
        automaton.add_acceptance(set_of(2, &[0]), set_of(2, &[1]));
        automaton.add_acceptance(set_of(2, &[0]), set_of(2, &[1]));
        assert_eq!(automaton.conditions().len(), 2);
        assert_eq!(automaton.conditions()[0], automaton.conditions()[1]);
    }

    #[test]
    fn zero_threads_is_an_error() {
        let mut automaton = RabinAutomaton::new(1);
        automaton.add_transition(0, 0, 0);
        automaton.add_acceptance(set_of(1, &[]), set_of(1, &[0]));
        assert!(matches!(
            automaton.find_run(0),
            Err(Error::InvalidMaxThreads)
        ));
    }

    #[test]
    fn no_transitions_is_trivially_empty() {
        let mut automaton = RabinAutomaton::new(2);
        automaton.add_acceptance(set_of(2, &[]), set_of(2, &[0]));
        assert!(automaton.find_run(1).unwrap().is_none());
    }

    #[test]
    fn no_surviving_pair_is_trivially_empty() {
        let mut automaton = RabinAutomaton::new(2);
        automaton.add_transition(0, 0, 0);
        automaton.add_acceptance(set_of(2, &[0, 1]), set_of(2, &[0]));
        assert!(automaton.find_run(1).unwrap().is_none());
    }
}
