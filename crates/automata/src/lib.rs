//! Rabin automata on infinite binary trees: emptiness decision and
//! regular witness runs.
//!
//! A [`RabinAutomaton`] is built from a state count, a start state,
//! per-state binary transitions, and a family of Rabin pairs.
//! [`RabinAutomaton::find_run`] decides whether the automaton accepts any
//! infinite binary tree and, when it does, produces a [`Run`]: a finite
//! forest of labelled binary nodes whose leaves graft back onto proven
//! subtrees, folding one accepted infinite run. The run can be rendered
//! as logic-program facts or as a Graphviz digraph, and the automaton
//! itself round-trips through its `Display` form.
//!
//! The decision procedure is a bottom-up saturation over *run pieces*:
//! partial subtrees summarised by the state sets they touch, grown
//! height-by-height and combined under an acceptance-compatibility
//! filter until the start state owns a complete subtree or the height
//! bound shows none exists. It parallelises across root states; see
//! [`RabinAutomaton::find_run`]'s `max_threads`.

#![deny(missing_docs)]

mod piece;
mod search;

pub mod automaton;
pub mod print;
pub mod run;

pub use automaton::{Acceptance, Error, OutTransition, RabinAutomaton, State};
pub use print::{LogicProgram, RunGraphviz, RunLogicProgram};
pub use run::{Node, Run, RunNode};
