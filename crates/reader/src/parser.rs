//! Recursive-descent parser building a `RabinAutomaton` from its text
//! form.

use rabbet_automata::{RabinAutomaton, State};
use rabbet_bitset::DenseBitSet;

use crate::ParseError;
use crate::lexer::{Keyword, Lexer, LocatedToken, Token};

/// Parse the automaton text format.
///
/// The grammar is the output language of the automaton's `Display` form:
/// a `states := N` line, a `start := q` line, then optional
/// `transitions :=` and `acceptances :=` sections. Whitespace carries no
/// meaning; transitions may be separated by commas, newlines, or both.
/// Every state reference is checked against the declared state count.
pub fn parse_automaton(source: &str) -> Result<RabinAutomaton, ParseError> {
    let mut parser = Parser::new(source)?;
    let automaton = parser.parse()?;
    log::debug!(
        "parsed automaton: {} states, {} acceptance pairs",
        automaton.states(),
        automaton.conditions().len()
    );
    Ok(automaton)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Option<LocatedToken>,
    /// Line of the most recently consumed token, for end-of-input errors.
    last_line: u32,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let lookahead = lexer.next_token()?;
        Ok(Self {
            lexer,
            lookahead,
            last_line: 1,
        })
    }

    fn peek(&self) -> Option<Token> {
        self.lookahead.map(|t| t.token)
    }

    fn bump(&mut self) -> Result<Option<LocatedToken>, ParseError> {
        let current = self.lookahead.take();
        if let Some(t) = current {
            self.last_line = t.line;
        }
        self.lookahead = self.lexer.next_token()?;
        Ok(current)
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<u32, ParseError> {
        match self.bump()? {
            Some(t) if t.token == token => Ok(t.line),
            Some(t) => Err(ParseError::Syntax {
                line: t.line,
                message: format!("expected {what}, found {:?}", t.token),
            }),
            None => Err(ParseError::Syntax {
                line: self.last_line,
                message: format!("expected {what}, found end of input"),
            }),
        }
    }

    fn expect_int(&mut self, what: &str) -> Result<(u32, u32), ParseError> {
        match self.bump()? {
            Some(LocatedToken {
                token: Token::Int(value),
                line,
            }) => Ok((value, line)),
            Some(t) => Err(ParseError::Syntax {
                line: t.line,
                message: format!("expected {what}, found {:?}", t.token),
            }),
            None => Err(ParseError::Syntax {
                line: self.last_line,
                message: format!("expected {what}, found end of input"),
            }),
        }
    }

    fn parse(&mut self) -> Result<RabinAutomaton, ParseError> {
        self.expect(Token::Keyword(Keyword::States), "`states`")?;
        self.expect(Token::Assign, "`:=`")?;
        let (states, _) = self.expect_int("the state count")?;
        if states == 0 {
            return Err(ParseError::InvalidStateCount);
        }
        let mut automaton = RabinAutomaton::new(states);

        self.expect(Token::Keyword(Keyword::Start), "`start`")?;
        self.expect(Token::Assign, "`:=`")?;
        let (start, line) = self.expect_int("the start state")?;
        self.check_state(&automaton, start, line)?;
        automaton.set_start(start);

        if self.peek() == Some(Token::Keyword(Keyword::Transitions)) {
            self.bump()?;
            self.expect(Token::Assign, "`:=`")?;
            self.parse_transitions(&mut automaton)?;
        }
        if self.peek() == Some(Token::Keyword(Keyword::Acceptances)) {
            self.bump()?;
            self.expect(Token::Assign, "`:=`")?;
            self.parse_acceptances(&mut automaton)?;
        }
        match self.bump()? {
            None => Ok(automaton),
            Some(t) => Err(ParseError::Syntax {
                line: t.line,
                message: format!("unexpected {:?} after the automaton", t.token),
            }),
        }
    }

    fn parse_transitions(&mut self, automaton: &mut RabinAutomaton) -> Result<(), ParseError> {
        while let Some(Token::Int(_)) = self.peek() {
            let (from, line) = self.expect_int("a source state")?;
            self.check_state(automaton, from, line)?;
            self.expect(Token::Gt, "`>`")?;
            let (left, line) = self.expect_int("a left successor")?;
            self.check_state(automaton, left, line)?;
            let (right, line) = self.expect_int("a right successor")?;
            self.check_state(automaton, right, line)?;
            automaton.add_transition(from, left, right);
            if self.peek() == Some(Token::Comma) {
                self.bump()?;
            }
        }
        Ok(())
    }

    fn parse_acceptances(&mut self, automaton: &mut RabinAutomaton) -> Result<(), ParseError> {
        while self.peek() == Some(Token::LParen) {
            self.bump()?;
            let l = self.parse_side(automaton)?;
            self.expect(Token::Comma, "`,`")?;
            let u = self.parse_side(automaton)?;
            self.expect(Token::RParen, "`)`")?;
            automaton.add_acceptance(l, u);
        }
        Ok(())
    }

    /// One side of an acceptance pair: `none` or a run of state numbers.
    fn parse_side(&mut self, automaton: &RabinAutomaton) -> Result<DenseBitSet, ParseError> {
        let mut side = DenseBitSet::with_capacity(automaton.states());
        if self.peek() == Some(Token::Keyword(Keyword::None)) {
            self.bump()?;
            return Ok(side);
        }
        while let Some(Token::Int(_)) = self.peek() {
            let (q, line) = self.expect_int("a state")?;
            self.check_state(automaton, q, line)?;
            side.insert(q);
        }
        Ok(side)
    }

    fn check_state(
        &self,
        automaton: &RabinAutomaton,
        state: State,
        line: u32,
    ) -> Result<(), ParseError> {
        if automaton.is_valid_state(state) {
            Ok(())
        } else {
            Err(ParseError::IllegalStateSet { state, line })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_automaton() {
        let automaton = parse_automaton("states := 1\nstart := 0").expect("parses");
        assert_eq!(automaton.states(), 1);
        assert_eq!(automaton.start(), 0);
        assert!(automaton.conditions().is_empty());
        assert!(automaton.transitions(0).is_empty());
    }

    #[test]
    fn full_automaton() {
        let text = "states := 3\n\
                    start := 1\n\
                    transitions :=\n\
                    \t0 > 1 2, 0 > 0 0\n\
                    \t2 > 2 2\n\
                    acceptances :=\n\
                    \t( 1 , 0 2 )\n\
                    \t( none , 1 )";
        let automaton = parse_automaton(text).expect("parses");
        assert_eq!(automaton.states(), 3);
        assert_eq!(automaton.start(), 1);
        assert_eq!(automaton.transitions(0).len(), 2);
        assert_eq!(automaton.transitions(1).len(), 0);
        assert_eq!(automaton.transitions(2).len(), 1);
        assert_eq!(automaton.conditions().len(), 2);
        assert_eq!(
            automaton.conditions()[0].u().iter().collect::<Vec<_>>(),
            [0, 2]
        );
    }

    #[test]
    fn commas_are_optional_between_transitions() {
        let with = parse_automaton("states := 2\nstart := 0\ntransitions := 0 > 1 1, 1 > 0 0")
            .expect("parses");
        let without = parse_automaton("states := 2\nstart := 0\ntransitions := 0 > 1 1\n1 > 0 0")
            .expect("parses");
        assert_eq!(with.transitions(0), without.transitions(0));
        assert_eq!(with.transitions(1), without.transitions(1));
    }

    #[test]
    fn out_of_range_states_are_illegal() {
        let err = parse_automaton("states := 2\nstart := 0\ntransitions := 0 > 1 2")
            .expect_err("state 2 does not exist");
        assert!(matches!(
            err,
            ParseError::IllegalStateSet { state: 2, line: 3 }
        ));

        let err = parse_automaton("states := 2\nstart := 5").expect_err("start out of range");
        assert!(matches!(
            err,
            ParseError::IllegalStateSet { state: 5, line: 2 }
        ));
    }

    #[test]
    fn zero_states_are_rejected() {
        assert!(matches!(
            parse_automaton("states := 0\nstart := 0"),
            Err(ParseError::InvalidStateCount)
        ));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(matches!(
            parse_automaton("states := 1\nstart := 0\n("),
            Err(ParseError::Syntax { line: 3, .. })
        ));
    }
}
