//! Dense bit sets over a fixed universe.
//!
//! Every set in the automaton machinery ranges over the same universe (the
//! automaton's states), so the representation is a plain word array sized
//! once at construction. Besides membership updates, the operations the
//! search needs are in-place union and difference, an intersection test,
//! and a total order so canonical sorting is deterministic.

#![deny(missing_docs)]

mod dense;

pub use dense::DenseBitSet;
