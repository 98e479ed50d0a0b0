//! The conditional evaluator: lookahead primitives behind
//! `\ifnextchar`/`\ifleftbrace`-style macros.
//!
//! The evaluator sits between the preprocessor and the command gatherer.
//! Almost all tokens pass through it unchanged; the two reserved control
//! sequences below are consumed and write their result into the shared
//! boolean register, where a macro (or an embedder driving the pipeline
//! directly) can read it:
//!
//! - `\ifleftbrace@` peeks at the next raw input character and records
//!   whether it is a left brace. No token is consumed from the stream.
//! - `\ifnextchar@` reads the single character token that follows it (the
//!   comparison character, normally written right after the primitive in a
//!   macro replacement) and records whether the upcoming input starts with
//!   that character. The upcoming input is the lexer's pending token if
//!   there is one, otherwise a fresh peek of the input stream.
//!
//! A control sequence arriving while the evaluator waits for the comparison
//! character is an error.

use crate::error::{ErrorKind, ParseError, Result};
use crate::input::InputStream;
use crate::lexer::Lexer;
use crate::token::{CsName, CsNameInterner, Token};

/// The boolean and numeric registers shared across the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Registers {
    /// Written by the conditional primitives.
    pub condition: bool,
    /// General-purpose counter available to embedders.
    pub counter: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    WaitingForNextChar,
}

/// The conditional evaluator. See the module documentation.
pub struct Evaluator {
    ifnextchar: CsName,
    ifleftbrace: CsName,
    state: State,
}

impl Evaluator {
    /// The reserved name of the next-character test primitive.
    pub const IFNEXTCHAR: &'static str = "ifnextchar@";
    /// The reserved name of the left-brace test primitive.
    pub const IFLEFTBRACE: &'static str = "ifleftbrace@";

    pub fn new(interner: &mut CsNameInterner) -> Evaluator {
        Evaluator {
            ifnextchar: interner.get_or_intern(Evaluator::IFNEXTCHAR),
            ifleftbrace: interner.get_or_intern(Evaluator::IFLEFTBRACE),
            state: State::Idle,
        }
    }

    /// Process one token. Returns the token if it passes through.
    pub fn process(
        &mut self,
        token: Token,
        registers: &mut Registers,
        lexer: &Lexer,
        input: &mut InputStream,
        interner: &CsNameInterner,
    ) -> Result<Option<Token>> {
        match self.state {
            State::Idle => match token {
                Token::ControlSequence(name) if name == self.ifleftbrace => {
                    registers.condition = input.peek() == Some('{');
                    Ok(None)
                }
                Token::ControlSequence(name) if name == self.ifnextchar => {
                    self.state = State::WaitingForNextChar;
                    Ok(None)
                }
                _ => Ok(Some(token)),
            },
            State::WaitingForNextChar => match token {
                Token::ControlSequence(name) => {
                    self.state = State::Idle;
                    Err(ParseError::new(ErrorKind::UnexpectedControlSequence {
                        name: interner.resolve(name).to_string(),
                    }))
                }
                Token::Character(comparison, _) => {
                    self.state = State::Idle;
                    registers.condition = match lexer.peek_pending() {
                        Some(pending) => pending.char() == Some(comparison),
                        None => input.peek() == Some(comparison),
                    };
                    Ok(None)
                }
            },
        }
    }

    /// Discard in-flight state, for error recovery.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catcode::Category;

    fn stream(content: &str) -> InputStream {
        InputStream::new(
            "test".into(),
            content.into(),
            "/*!".into(),
            "*/".into(),
            None,
        )
    }

    #[test]
    fn ifleftbrace_sets_register_on_brace() {
        let mut interner = CsNameInterner::default();
        let mut evaluator = Evaluator::new(&mut interner);
        let mut registers = Registers::default();
        let lexer = Lexer::default();
        let mut input = stream("{x");
        let token = Token::ControlSequence(interner.get(Evaluator::IFLEFTBRACE).unwrap());
        let out = evaluator
            .process(token, &mut registers, &lexer, &mut input, &interner)
            .unwrap();
        assert_eq!(out, None);
        assert!(registers.condition);
        // The peek consumed nothing.
        assert_eq!(input.read(), Some('{'));
    }

    #[test]
    fn ifleftbrace_clears_register_otherwise() {
        let mut interner = CsNameInterner::default();
        let mut evaluator = Evaluator::new(&mut interner);
        let mut registers = Registers {
            condition: true,
            counter: 0,
        };
        let lexer = Lexer::default();
        let mut input = stream("x");
        let token = Token::ControlSequence(interner.get(Evaluator::IFLEFTBRACE).unwrap());
        evaluator
            .process(token, &mut registers, &lexer, &mut input, &interner)
            .unwrap();
        assert!(!registers.condition);
    }

    #[test]
    fn ifnextchar_compares_against_input_peek() {
        let mut interner = CsNameInterner::default();
        let mut evaluator = Evaluator::new(&mut interner);
        let mut registers = Registers::default();
        let lexer = Lexer::default();
        let mut input = stream("[rest");
        let primitive = Token::ControlSequence(interner.get(Evaluator::IFNEXTCHAR).unwrap());
        evaluator
            .process(primitive, &mut registers, &lexer, &mut input, &interner)
            .unwrap();
        // The comparison character is supplied as the next token.
        let comparison = Token::Character('[', Category::Other);
        let out = evaluator
            .process(comparison, &mut registers, &lexer, &mut input, &interner)
            .unwrap();
        assert_eq!(out, None);
        assert!(registers.condition);
    }

    #[test]
    fn ifnextchar_false_on_mismatch() {
        let mut interner = CsNameInterner::default();
        let mut evaluator = Evaluator::new(&mut interner);
        let mut registers = Registers::default();
        let lexer = Lexer::default();
        let mut input = stream("x");
        let primitive = Token::ControlSequence(interner.get(Evaluator::IFNEXTCHAR).unwrap());
        evaluator
            .process(primitive, &mut registers, &lexer, &mut input, &interner)
            .unwrap();
        let comparison = Token::Character('[', Category::Other);
        evaluator
            .process(comparison, &mut registers, &lexer, &mut input, &interner)
            .unwrap();
        assert!(!registers.condition);
    }

    #[test]
    fn control_sequence_while_waiting_is_an_error() {
        let mut interner = CsNameInterner::default();
        let mut evaluator = Evaluator::new(&mut interner);
        let mut registers = Registers::default();
        let lexer = Lexer::default();
        let mut input = stream("");
        let primitive = Token::ControlSequence(interner.get(Evaluator::IFNEXTCHAR).unwrap());
        evaluator
            .process(primitive, &mut registers, &lexer, &mut input, &interner)
            .unwrap();
        let unexpected = Token::ControlSequence(interner.get_or_intern("class"));
        let result = evaluator.process(unexpected, &mut registers, &lexer, &mut input, &interner);
        assert!(matches!(
            result.unwrap_err().kind,
            ErrorKind::UnexpectedControlSequence { .. }
        ));
    }

    #[test]
    fn other_tokens_pass_through() {
        let mut interner = CsNameInterner::default();
        let mut evaluator = Evaluator::new(&mut interner);
        let mut registers = Registers::default();
        let lexer = Lexer::default();
        let mut input = stream("");
        let token = Token::Character('a', Category::Letter);
        let out = evaluator
            .process(token, &mut registers, &lexer, &mut input, &interner)
            .unwrap();
        assert_eq!(out, Some(token));
    }
}
