//! User-definable macros and the preprocessor that expands them.
//!
//! A [Macro] pairs a parameter pattern with a replacement. The pattern is a
//! sequence of literal tokens and numbered placeholders `#1`..`#5`; a
//! placeholder binds either a single token (or balanced group) when nothing
//! follows it, or everything up to the literal run that follows it.
//!
//! The [Preprocessor] sits between the lexer and the rest of the pipeline.
//! Control sequence tokens that name a macro are expanded: the pattern is
//! matched against the upcoming token stream and the replacement, with
//! placeholders substituted, is re-injected to be expanded again. Tokens
//! that name no macro pass through unchanged.
//!
//! Definitions are lexically scoped: entering a `{`-group pushes a scope
//! and leaving it discards definitions made inside, which is how the
//! built-in vocabulary stays immutable under user redefinition inside a
//! group.

use crate::error::{ParseError, Result};
use crate::token::{CsName, CsNameInterner, Token};
use doccraft_stdext::collections::scopedmap::ScopedMap;
use std::collections::VecDeque;
use std::rc::Rc;

// Backstop against runaway recursive macros; a single put() call never
// legitimately performs this many expansion steps.
const MAX_EXPANSION_STEPS: usize = 100_000;

/// One element of a macro's parameter pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternItem {
    Token(Token),
    /// A numbered placeholder, 1-based.
    Placeholder(u8),
}

/// One element of a macro's replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    Tokens(Vec<Token>),
    /// A reference to a bound placeholder, 1-based.
    Placeholder(u8),
}

/// A macro definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pattern: Vec<PatternItem>,
    replacement: Vec<Replacement>,
}

/// Error returned for a malformed macro definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadMacroError(pub String);

impl Macro {
    pub fn new(pattern: Vec<PatternItem>, replacement: Vec<Replacement>) -> Result<Macro> {
        Macro::validate(&pattern, &replacement)
            .map_err(|BadMacroError(reason)| ParseError::bad_call("def", reason))?;
        Ok(Macro {
            pattern,
            replacement,
        })
    }

    /// A macro with no parameters.
    pub fn expansion_of(tokens: Vec<Token>) -> Macro {
        Macro {
            pattern: Vec::new(),
            replacement: vec![Replacement::Tokens(tokens)],
        }
    }

    fn validate(
        pattern: &[PatternItem],
        replacement: &[Replacement],
    ) -> std::result::Result<(), BadMacroError> {
        let mut defined = [false; 5];
        for item in pattern {
            if let PatternItem::Placeholder(i) = item {
                match i {
                    1..=5 => defined[(i - 1) as usize] = true,
                    _ => {
                        return Err(BadMacroError(format!(
                            "placeholder #{i} is out of range (1-5)"
                        )))
                    }
                }
            }
        }
        for item in replacement {
            if let Replacement::Placeholder(i) = item {
                let in_range = matches!(i, 1..=5);
                if !in_range || !defined[(i - 1) as usize] {
                    return Err(BadMacroError(format!(
                        "placeholder #{i} is not bound by the parameter pattern"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The literal tokens that delimit the placeholder at `item`, i.e. the
    /// run of literal pattern tokens directly after it.
    fn delimiter_of(&self, item: usize) -> &[PatternItem] {
        let rest = &self.pattern[item + 1..];
        let len = rest
            .iter()
            .position(|i| matches!(i, PatternItem::Placeholder(_)))
            .unwrap_or(rest.len());
        &rest[..len]
    }
}

#[derive(Debug, Clone, Copy)]
enum ArgumentMode {
    /// Bind exactly one token.
    Undelimited,
    /// Bind a balanced group, outer braces trimmed.
    UndelimitedGroup,
    /// Bind at least one token, up to the delimiter run.
    Delimited,
}

#[derive(Debug)]
struct MatchState {
    name: CsName,
    tex_macro: Rc<Macro>,
    /// Index of the pattern item being matched.
    item: usize,
    arguments: Vec<Vec<Token>>,
    current: Vec<Token>,
    depth: usize,
    mode: Option<ArgumentMode>,
}

enum Feed {
    Consumed,
    Complete,
}

/// The macro preprocessor. See the module documentation.
#[derive(Default)]
pub struct Preprocessor {
    macros: ScopedMap<CsName, Rc<Macro>>,
    matching: Option<MatchState>,
    output: VecDeque<Token>,
}

impl Preprocessor {
    /// Define a macro in the current scope.
    pub fn define(&mut self, name: CsName, tex_macro: Macro) {
        self.macros.insert(name, Rc::new(tex_macro));
    }

    pub fn is_defined(&self, name: CsName) -> bool {
        self.macros.contains_key(&name)
    }

    /// The names of all visible macros, for spell checking.
    pub fn defined_names<'a>(&'a self, interner: &'a CsNameInterner) -> Vec<&'a str> {
        self.macros
            .iter()
            .map(|(name, _)| interner.resolve(*name))
            .collect()
    }

    pub fn begin_group(&mut self) {
        self.macros.begin_scope();
    }

    pub fn end_group(&mut self) -> bool {
        self.macros.end_scope().is_ok()
    }

    /// Feed one token; expanded output accumulates for
    /// [next](Preprocessor::next).
    pub fn put(&mut self, token: Token, interner: &CsNameInterner) -> Result<()> {
        let mut work = VecDeque::new();
        work.push_back(token);
        let mut steps = 0;
        while let Some(token) = work.pop_front() {
            steps += 1;
            if steps > MAX_EXPANSION_STEPS {
                let name = match self.matching.take() {
                    Some(state) => interner.resolve(state.name).to_string(),
                    None => "?".to_string(),
                };
                return Err(ParseError::bad_call(
                    name,
                    "macro expansion did not terminate",
                ));
            }
            if self.matching.is_none() {
                let name = match token {
                    Token::ControlSequence(name) => name,
                    _ => {
                        self.output.push_back(token);
                        continue;
                    }
                };
                let tex_macro = match self.macros.get(&name) {
                    Some(m) => m.clone(),
                    None => {
                        self.output.push_back(token);
                        continue;
                    }
                };
                if tex_macro.pattern.is_empty() {
                    Preprocessor::substitute(&tex_macro, &[], &mut work);
                } else {
                    self.matching = Some(MatchState {
                        name,
                        tex_macro,
                        item: 0,
                        arguments: Vec::new(),
                        current: Vec::new(),
                        depth: 0,
                        mode: None,
                    });
                }
                continue;
            }
            let state = self.matching.as_mut().unwrap();
            match Preprocessor::feed(state, token, interner)? {
                Feed::Consumed => {}
                Feed::Complete => {
                    let state = self.matching.take().unwrap();
                    Preprocessor::substitute(&state.tex_macro, &state.arguments, &mut work);
                }
            }
        }
        Ok(())
    }

    fn feed(state: &mut MatchState, token: Token, interner: &CsNameInterner) -> Result<Feed> {
        let item = match state.tex_macro.pattern.get(state.item) {
            Some(item) => item.clone(),
            None => {
                // The pattern was exhausted by the previous token; this is
                // prevented by the Complete transitions below.
                unreachable!("matching continued past the end of the pattern")
            }
        };
        match item {
            PatternItem::Token(expected) => {
                if token != expected {
                    return Err(ParseError::bad_call(
                        interner.resolve(state.name),
                        format!(
                            "use of the macro does not match its definition: expected {}, found {}",
                            expected.describe(interner),
                            token.describe(interner),
                        ),
                    ));
                }
                state.item += 1;
            }
            PatternItem::Placeholder(_) => {
                let delimiter_len = state.tex_macro.delimiter_of(state.item).len();
                if state.mode.is_none() {
                    state.mode = Some(if delimiter_len > 0 {
                        ArgumentMode::Delimited
                    } else if matches!(
                        token,
                        Token::Character(_, crate::catcode::Category::BeginGroup)
                    ) {
                        ArgumentMode::UndelimitedGroup
                    } else {
                        ArgumentMode::Undelimited
                    });
                }
                match state.mode.unwrap() {
                    ArgumentMode::Undelimited => {
                        state.current.push(token);
                        Preprocessor::complete_argument(state, 0);
                    }
                    ArgumentMode::UndelimitedGroup => {
                        match token.category() {
                            Some(crate::catcode::Category::BeginGroup) => {
                                // The opening brace of the group itself is
                                // not part of the argument.
                                if state.depth > 0 {
                                    state.current.push(token);
                                }
                                state.depth += 1;
                            }
                            Some(crate::catcode::Category::EndGroup) => {
                                state.depth -= 1;
                                if state.depth == 0 {
                                    Preprocessor::complete_argument(state, 0);
                                } else {
                                    state.current.push(token);
                                }
                            }
                            _ => state.current.push(token),
                        }
                    }
                    ArgumentMode::Delimited => {
                        match token.category() {
                            Some(crate::catcode::Category::BeginGroup) => state.depth += 1,
                            Some(crate::catcode::Category::EndGroup) => {
                                if state.depth == 0 {
                                    return Err(ParseError::bad_call(
                                        interner.resolve(state.name),
                                        "unbalanced group in a macro argument",
                                    ));
                                }
                                state.depth -= 1;
                            }
                            _ => {}
                        }
                        state.current.push(token);
                        if state.depth == 0 && state.current.len() > delimiter_len {
                            let tail = &state.current[state.current.len() - delimiter_len..];
                            let matches = tail
                                .iter()
                                .zip(state.tex_macro.delimiter_of(state.item))
                                .all(|(t, p)| matches!(p, PatternItem::Token(p) if p == t));
                            if matches {
                                for _ in 0..delimiter_len {
                                    state.current.pop();
                                }
                                Preprocessor::complete_argument(state, delimiter_len);
                            }
                        }
                    }
                }
            }
        }
        if state.item >= state.tex_macro.pattern.len() {
            Ok(Feed::Complete)
        } else {
            Ok(Feed::Consumed)
        }
    }

    fn complete_argument(state: &mut MatchState, delimiter_len: usize) {
        state.arguments.push(std::mem::take(&mut state.current));
        state.depth = 0;
        state.mode = None;
        // Skip the placeholder and the delimiter it consumed.
        state.item += 1 + delimiter_len;
    }

    fn substitute(tex_macro: &Macro, arguments: &[Vec<Token>], work: &mut VecDeque<Token>) {
        let mut tokens: Vec<Token> = Vec::new();
        for replacement in &tex_macro.replacement {
            match replacement {
                Replacement::Tokens(literal) => tokens.extend_from_slice(literal),
                Replacement::Placeholder(i) => {
                    tokens.extend_from_slice(&arguments[(i - 1) as usize])
                }
            }
        }
        for token in tokens.into_iter().rev() {
            work.push_front(token);
        }
    }

    /// Take the next expanded token.
    pub fn next(&mut self) -> Option<Token> {
        self.output.pop_front()
    }

    /// Whether the preprocessor is mid-way through matching macro arguments.
    pub fn is_matching(&self) -> bool {
        self.matching.is_some()
    }

    /// Discard in-flight state, for error recovery. Scopes unwind to the
    /// outermost one; the built-in vocabulary survives.
    pub fn reset(&mut self) {
        self.matching = None;
        self.output.clear();
        self.macros.end_all_scopes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catcode::CategoryTable;
    use crate::lexer::Lexer;
    use crate::token::write_tokens;

    fn lex(input: &str, interner: &mut CsNameInterner) -> Vec<Token> {
        let table = CategoryTable::default();
        let mut lexer = Lexer::default();
        let mut tokens = Vec::new();
        for c in input.chars() {
            lexer.put(c, table.get(c), interner).unwrap();
            while let Some(t) = lexer.next() {
                tokens.push(t);
            }
        }
        lexer.flush(interner);
        while let Some(t) = lexer.next() {
            tokens.push(t);
        }
        tokens
    }

    fn expand(preprocessor: &mut Preprocessor, input: &str, interner: &mut CsNameInterner) -> String {
        let mut out = Vec::new();
        for token in lex(input, interner) {
            preprocessor.put(token, interner).unwrap();
            while let Some(t) = preprocessor.next() {
                out.push(t);
            }
        }
        write_tokens(&out, interner)
    }

    fn literal(tokens: Vec<Token>) -> Vec<PatternItem> {
        tokens.into_iter().map(PatternItem::Token).collect()
    }

    #[test]
    fn expansion_without_parameters() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("hello");
        let replacement = lex("hi there", &mut interner);
        preprocessor.define(name, Macro::expansion_of(replacement));
        assert_eq!(
            expand(&mut preprocessor, r"x \hello y", &mut interner),
            "x hi there y"
        );
    }

    #[test]
    fn undelimited_parameter_binds_one_token() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("double");
        let m = Macro::new(
            vec![PatternItem::Placeholder(1)],
            vec![Replacement::Placeholder(1), Replacement::Placeholder(1)],
        )
        .unwrap();
        preprocessor.define(name, m);
        assert_eq!(expand(&mut preprocessor, r"\double x", &mut interner), "xx");
    }

    #[test]
    fn undelimited_parameter_binds_a_group() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("double");
        let m = Macro::new(
            vec![PatternItem::Placeholder(1)],
            vec![Replacement::Placeholder(1), Replacement::Placeholder(1)],
        )
        .unwrap();
        preprocessor.define(name, m);
        assert_eq!(
            expand(&mut preprocessor, r"\double{ab}", &mut interner),
            "abab"
        );
    }

    #[test]
    fn delimited_parameter_binds_to_the_delimiter() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("upto");
        let mut pattern = vec![PatternItem::Placeholder(1)];
        pattern.extend(literal(lex(".", &mut interner)));
        let m = Macro::new(pattern, vec![Replacement::Placeholder(1)]).unwrap();
        preprocessor.define(name, m);
        assert_eq!(
            expand(&mut preprocessor, r"\upto abc.z", &mut interner),
            "abcz"
        );
    }

    #[test]
    fn replacement_mixes_literals_and_placeholders() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("wrap");
        let open = lex("<", &mut interner);
        let close = lex(">", &mut interner);
        let m = Macro::new(
            vec![PatternItem::Placeholder(1)],
            vec![
                Replacement::Tokens(open),
                Replacement::Placeholder(1),
                Replacement::Tokens(close),
            ],
        )
        .unwrap();
        preprocessor.define(name, m);
        assert_eq!(
            expand(&mut preprocessor, r"\wrap{ab}", &mut interner),
            "<ab>"
        );
    }

    #[test]
    fn expansion_is_recursive() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let inner = interner.get_or_intern("inner");
        let outer = interner.get_or_intern("outer");
        let inner_replacement = lex("x", &mut interner);
        preprocessor.define(inner, Macro::expansion_of(inner_replacement));
        let outer_replacement = lex(r"\inner\inner", &mut interner);
        preprocessor.define(outer, Macro::expansion_of(outer_replacement));
        assert_eq!(expand(&mut preprocessor, r"\outer", &mut interner), "xx");
    }

    #[test]
    fn scoped_definition_disappears_at_end_of_group() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("local");
        preprocessor.begin_group();
        let replacement = lex("x", &mut interner);
        preprocessor.define(name, Macro::expansion_of(replacement));
        assert!(preprocessor.is_defined(name));
        assert!(preprocessor.end_group());
        assert!(!preprocessor.is_defined(name));
        // With no definition the token passes through unchanged.
        assert_eq!(expand(&mut preprocessor, r"\local", &mut interner), "\\local");
    }

    #[test]
    fn shadowed_definition_is_restored() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("m");
        let outer_replacement = lex("outer", &mut interner);
        preprocessor.define(name, Macro::expansion_of(outer_replacement));
        preprocessor.begin_group();
        let inner_replacement = lex("inner", &mut interner);
        preprocessor.define(name, Macro::expansion_of(inner_replacement));
        assert_eq!(expand(&mut preprocessor, r"\m", &mut interner), "inner");
        assert!(preprocessor.end_group());
        assert_eq!(expand(&mut preprocessor, r"\m", &mut interner), "outer");
    }

    #[test]
    fn mismatched_literal_is_an_error() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("m");
        let mut pattern = literal(lex("[", &mut interner));
        pattern.push(PatternItem::Placeholder(1));
        pattern.extend(literal(lex("]", &mut interner)));
        let m = Macro::new(pattern, vec![Replacement::Placeholder(1)]).unwrap();
        preprocessor.define(name, m);
        let tokens = lex(r"\m(x]", &mut interner);
        let mut failed = false;
        for token in tokens {
            if preprocessor.put(token, &interner).is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed);
    }

    #[test]
    fn runaway_recursion_is_caught() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("loop");
        let replacement = lex(r"\loop", &mut interner);
        preprocessor.define(name, Macro::expansion_of(replacement));
        let token = lex(r"\loop", &mut interner)[0];
        assert!(preprocessor.put(token, &interner).is_err());
    }

    #[test]
    fn placeholder_validation() {
        assert!(Macro::new(
            vec![PatternItem::Placeholder(1)],
            vec![Replacement::Placeholder(2)],
        )
        .is_err());
        assert!(Macro::new(vec![PatternItem::Placeholder(6)], vec![]).is_err());
    }

    #[test]
    fn delimited_group_protects_delimiter() {
        let mut interner = CsNameInterner::default();
        let mut preprocessor = Preprocessor::default();
        let name = interner.get_or_intern("upto");
        let mut pattern = vec![PatternItem::Placeholder(1)];
        pattern.extend(literal(lex(".", &mut interner)));
        let m = Macro::new(pattern, vec![Replacement::Placeholder(1)]).unwrap();
        preprocessor.define(name, m);
        // The dot inside the group does not end the argument; group tokens
        // are preserved in the binding.
        assert_eq!(
            expand(&mut preprocessor, r"\upto a{b.c}d.z", &mut interner),
            "a{b.c}dz"
        );
    }
}
