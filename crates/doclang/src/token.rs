//! Markup tokens and the control sequence name interner.

use crate::catcode::Category;
use std::collections::HashMap;
use std::num;

/// String type used to represent control sequence names.
///
/// Names are interned: each distinct name is stored once in a
/// [CsNameInterner] and referred to by this small copyable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CsName(num::NonZeroU32);

impl CsName {
    fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    fn from_index(index: usize) -> CsName {
        let small: u32 = u32::try_from(index + 1).expect("interner indices fit in a u32");
        CsName(num::NonZeroU32::new(small).unwrap())
    }
}

/// String interner for control sequence names.
#[derive(Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CsNameInterner {
    names: Vec<String>,
    keys: HashMap<String, CsName>,
}

impl CsNameInterner {
    pub fn get_or_intern<S: AsRef<str>>(&mut self, name: S) -> CsName {
        let name = name.as_ref();
        if let Some(&key) = self.keys.get(name) {
            return key;
        }
        let key = CsName::from_index(self.names.len());
        self.names.push(name.to_string());
        self.keys.insert(name.to_string(), key);
        key
    }

    pub fn get<S: AsRef<str>>(&self, name: S) -> Option<CsName> {
        self.keys.get(name.as_ref()).copied()
    }

    /// Resolves a key to its name. Panics on a key from another interner.
    pub fn resolve(&self, key: CsName) -> &str {
        &self.names[key.to_index()]
    }
}

/// A markup token: a control sequence, or a single categorized character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Token {
    ControlSequence(CsName),
    Character(char, Category),
}

impl Token {
    /// The character value, for character tokens.
    pub fn char(&self) -> Option<char> {
        match self {
            Token::ControlSequence(_) => None,
            Token::Character(c, _) => Some(*c),
        }
    }

    /// The category, for character tokens.
    pub fn category(&self) -> Option<Category> {
        match self {
            Token::ControlSequence(_) => None,
            Token::Character(_, category) => Some(*category),
        }
    }

    pub fn is_control_sequence(&self) -> bool {
        matches!(self, Token::ControlSequence(_))
    }

    /// Display form of the token, e.g. `\class` or `v`.
    pub fn describe(&self, interner: &CsNameInterner) -> String {
        match self {
            Token::ControlSequence(name) => format!("\\{}", interner.resolve(*name)),
            Token::Character(c, _) => c.to_string(),
        }
    }
}

/// Write a collection of tokens back to markup text.
///
/// Used in diagnostics and tests: a macro replacement can be compared against
/// the text it is expected to produce.
pub fn write_tokens<'a, T>(tokens: T, interner: &CsNameInterner) -> String
where
    T: IntoIterator<Item = &'a Token>,
{
    let mut out = String::new();
    let mut needs_separator = false;
    for token in tokens {
        match token {
            Token::ControlSequence(name) => {
                out.push('\\');
                out.push_str(interner.resolve(*name));
                needs_separator = true;
            }
            Token::Character(c, _) => {
                // A letter directly after a control sequence would be lexed
                // into the name; keep them apart.
                if needs_separator && c.is_alphabetic() {
                    out.push(' ');
                }
                out.push(*c);
                needs_separator = false;
            }
        }
    }
    out
}
