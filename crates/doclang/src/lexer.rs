//! The markup lexer, which turns input characters into tokens.
//!
//! The lexer is fed one character at a time by the parser driver and emits
//! zero or more tokens per character; lexing is driven by the active
//! [CategoryTable](crate::catcode::CategoryTable), which can change between
//! characters. An escape character starts a control sequence whose name
//! accumulates letters; the non-letter that terminates the name is re-lexed
//! as its own token, and whitespace directly after a letter-named control
//! sequence is absorbed.
//!
//! Whitespace runs collapse to a single space token. A run containing a
//! blank line (two or more line ends) instead produces the `\par` control
//! sequence, which the vocabulary maps to a paragraph break.

use crate::catcode::Category;
use crate::token::{CsNameInterner, Token};
use std::collections::VecDeque;

#[derive(Debug, PartialEq, Eq)]
pub enum LexerError {
    InvalidCharacter(char),
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    ControlSequence,
    Whitespace { newlines: usize },
    Comment { newlines: usize },
}

/// The push lexer. See the module documentation.
pub struct Lexer {
    state: State,
    buffer: String,
    output: VecDeque<Token>,
    absorb_whitespace: bool,
}

impl Default for Lexer {
    fn default() -> Lexer {
        Lexer {
            state: State::Idle,
            buffer: String::new(),
            output: VecDeque::new(),
            absorb_whitespace: false,
        }
    }
}

impl Lexer {
    /// Feed one character into the lexer.
    pub fn put(
        &mut self,
        c: char,
        category: Category,
        interner: &mut CsNameInterner,
    ) -> Result<(), LexerError> {
        match self.state {
            State::Idle => self.handle(c, category, interner)?,
            State::ControlSequence => {
                if category == Category::Letter {
                    self.buffer.push(c);
                } else if self.buffer.is_empty() {
                    // A single non-letter character is its own name; the
                    // character is consumed and no whitespace is absorbed.
                    let name = interner.get_or_intern(c.to_string());
                    self.output.push_back(Token::ControlSequence(name));
                    self.state = State::Idle;
                } else {
                    let name = interner.get_or_intern(&self.buffer);
                    self.output.push_back(Token::ControlSequence(name));
                    self.absorb_whitespace = true;
                    self.state = State::Idle;
                    self.handle(c, category, interner)?;
                }
            }
            State::Whitespace { newlines } => match category {
                Category::Space => {}
                Category::EndOfLine => {
                    self.state = State::Whitespace {
                        newlines: newlines + 1,
                    };
                }
                Category::Comment => {
                    self.state = State::Comment { newlines };
                }
                _ => {
                    self.finish_whitespace(newlines, interner);
                    self.handle(c, category, interner)?;
                }
            },
            State::Comment { newlines } => {
                if category == Category::EndOfLine {
                    self.state = State::Whitespace {
                        newlines: newlines + 1,
                    };
                }
            }
        }
        Ok(())
    }

    fn handle(
        &mut self,
        c: char,
        category: Category,
        interner: &mut CsNameInterner,
    ) -> Result<(), LexerError> {
        match category {
            Category::Escape => {
                self.buffer.clear();
                self.absorb_whitespace = false;
                self.state = State::ControlSequence;
            }
            Category::Space => {
                self.state = State::Whitespace { newlines: 0 };
            }
            Category::EndOfLine => {
                self.state = State::Whitespace { newlines: 1 };
            }
            Category::Comment => {
                self.state = State::Comment { newlines: 0 };
            }
            Category::Ignored => {}
            Category::Invalid => return Err(LexerError::InvalidCharacter(c)),
            _ => {
                self.absorb_whitespace = false;
                self.output.push_back(Token::Character(c, category));
            }
        }
        Ok(())
    }

    fn finish_whitespace(&mut self, newlines: usize, interner: &mut CsNameInterner) {
        self.state = State::Idle;
        if newlines >= 2 {
            let par = interner.get_or_intern("par");
            self.output.push_back(Token::ControlSequence(par));
        } else if !self.absorb_whitespace {
            self.output.push_back(Token::Character(' ', Category::Space));
        }
        self.absorb_whitespace = false;
    }

    /// Complete any partial token at the end of a block or file.
    ///
    /// A control sequence name in progress is completed by the end of input;
    /// pending whitespace is dropped.
    pub fn flush(&mut self, interner: &mut CsNameInterner) {
        match self.state {
            State::ControlSequence if !self.buffer.is_empty() => {
                let name = interner.get_or_intern(&self.buffer);
                self.output.push_back(Token::ControlSequence(name));
            }
            _ => {}
        }
        self.state = State::Idle;
        self.absorb_whitespace = false;
        self.buffer.clear();
    }

    /// Take the next completed token.
    pub fn next(&mut self) -> Option<Token> {
        self.output.pop_front()
    }

    /// Look at the next completed token without taking it.
    pub fn peek_pending(&self) -> Option<&Token> {
        self.output.front()
    }

    pub fn has_token(&self) -> bool {
        !self.output.is_empty()
    }

    /// Discard all lexer state, for error recovery.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.buffer.clear();
        self.output.clear();
        self.absorb_whitespace = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catcode::CategoryTable;

    enum TokenValue {
        ControlSequence(&'static str),
        Character(char, Category),
    }
    use Category::*;
    use TokenValue::Character;
    use TokenValue::ControlSequence;

    fn lexer_test(input: &str, expected_tokens: Vec<TokenValue>) {
        let table = CategoryTable::default();
        let mut interner = CsNameInterner::default();
        let mut lexer = Lexer::default();
        let mut actual = Vec::new();
        for c in input.chars() {
            lexer.put(c, table.get(c), &mut interner).unwrap();
            while let Some(token) = lexer.next() {
                actual.push(token);
            }
        }
        lexer.flush(&mut interner);
        while let Some(token) = lexer.next() {
            actual.push(token);
        }
        let expected: Vec<Token> = expected_tokens
            .into_iter()
            .map(|t| match t {
                ControlSequence(name) => {
                    Token::ControlSequence(interner.get_or_intern(name))
                }
                Character(c, category) => Token::Character(c, category),
            })
            .collect();
        assert_eq!(expected, actual);
    }

    macro_rules! lexer_tests {
        ($( ( $name: ident, $input: expr, $( $expected_token: expr, )* ), )+) => {
            $(
            #[test]
            fn $name() {
                let expected_tokens = vec![ $( $expected_token ),* ];
                lexer_test($input, expected_tokens);
            }
            )+
        };
    }

    lexer_tests![
        (
            control_sequence_and_group,
            r"\a{b}",
            ControlSequence("a"),
            Character('{', BeginGroup),
            Character('b', Letter),
            Character('}', EndGroup),
        ),
        (
            space_after_control_sequence_is_absorbed,
            r"\class vector",
            ControlSequence("class"),
            Character('v', Letter),
            Character('e', Letter),
            Character('c', Letter),
            Character('t', Letter),
            Character('o', Letter),
            Character('r', Letter),
        ),
        (
            newline_after_control_sequence_is_absorbed,
            "\\li\nfirst",
            ControlSequence("li"),
            Character('f', Letter),
            Character('i', Letter),
            Character('r', Letter),
            Character('s', Letter),
            Character('t', Letter),
        ),
        (
            non_letter_ends_name,
            r"\a1",
            ControlSequence("a"),
            Character('1', Other),
        ),
        (
            single_character_control_sequence,
            r"\{x",
            ControlSequence("{"),
            Character('x', Letter),
        ),
        (
            display_math_delimiters,
            r"\[x\]",
            ControlSequence("["),
            Character('x', Letter),
            ControlSequence("]"),
        ),
        (
            no_space_absorbed_after_symbol_control_sequence,
            r"\[ x",
            ControlSequence("["),
            Character(' ', Space),
            Character('x', Letter),
        ),
        (
            whitespace_collapses,
            "a  \t b",
            Character('a', Letter),
            Character(' ', Space),
            Character('b', Letter),
        ),
        (
            single_newline_is_a_space,
            "a\nb",
            Character('a', Letter),
            Character(' ', Space),
            Character('b', Letter),
        ),
        (
            blank_line_is_a_paragraph_break,
            "a\n\nb",
            Character('a', Letter),
            ControlSequence("par"),
            Character('b', Letter),
        ),
        (
            newline_space_newline_is_a_paragraph_break,
            "a\n \nb",
            Character('a', Letter),
            ControlSequence("par"),
            Character('b', Letter),
        ),
        (
            name_completed_by_end_of_input,
            r"\endclass",
            ControlSequence("endclass"),
        ),
        (
            trailing_whitespace_is_dropped,
            "a\n",
            Character('a', Letter),
        ),
        (
            math_shift_and_scripts,
            "$x^2$",
            Character('$', MathShift),
            Character('x', Letter),
            Character('^', Superscript),
            Character('2', Other),
            Character('$', MathShift),
        ),
    ];

    #[test]
    fn comment_category_skips_to_end_of_line() {
        let mut table = CategoryTable::default();
        table.set('%', Category::Comment);
        let mut interner = CsNameInterner::default();
        let mut lexer = Lexer::default();
        let mut actual = Vec::new();
        for c in "a% comment\nb".chars() {
            lexer.put(c, table.get(c), &mut interner).unwrap();
            while let Some(token) = lexer.next() {
                actual.push(token);
            }
        }
        assert_eq!(
            actual,
            vec![
                Token::Character('a', Letter),
                Token::Character(' ', Space),
                Token::Character('b', Letter),
            ]
        );
    }

    #[test]
    fn invalid_character_is_an_error() {
        let mut table = CategoryTable::default();
        table.set('#', Category::Invalid);
        let mut interner = CsNameInterner::default();
        let mut lexer = Lexer::default();
        assert_eq!(
            lexer.put('#', table.get('#'), &mut interner),
            Err(LexerError::InvalidCharacter('#'))
        );
    }

    #[test]
    fn active_newline_is_emitted_directly() {
        let mut table = CategoryTable::default();
        table.set('\n', Category::Active);
        let mut interner = CsNameInterner::default();
        let mut lexer = Lexer::default();
        lexer.put('a', table.get('a'), &mut interner).unwrap();
        lexer.put('\n', table.get('\n'), &mut interner).unwrap();
        assert_eq!(lexer.next(), Some(Token::Character('a', Letter)));
        assert_eq!(lexer.next(), Some(Token::Character('\n', Active)));
    }
}
