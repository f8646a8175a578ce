//! Reader for the textual automaton format.
//!
//! The format is the one the automaton's `Display` implementation prints,
//! so dumping and re-reading an automaton is the identity:
//!
//! ```text
//! states := 2
//! start := 0
//! transitions :=
//!     0 > 1 1, 1 > 0 0
//! acceptances :=
//!     ( 1 , 0 )
//! ```
//!
//! Parsing is split into a hand-rolled [`lexer`] and a recursive-descent
//! [`parser`]; both report errors with 1-based line numbers.

#![deny(missing_docs)]

pub mod lexer;
pub mod parser;

pub use parser::parse_automaton;

use rabbet_automata::State;

/// Errors reported while reading an automaton.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The input does not follow the grammar.
    #[error("syntax error at line {line}: {message}")]
    Syntax {
        /// 1-based line of the offending token.
        line: u32,
        /// What was expected or found.
        message: String,
    },
    /// A transition, acceptance element, or the start state names a state
    /// outside `0..N`.
    #[error("state {state} at line {line} is not below the declared state count")]
    IllegalStateSet {
        /// The out-of-range state.
        state: State,
        /// 1-based line of the reference.
        line: u32,
    },
    /// The declared state count is zero.
    #[error("the automaton must have at least one state")]
    InvalidStateCount,
}
