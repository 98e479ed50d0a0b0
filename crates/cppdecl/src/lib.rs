//! Parsers for one-line C/C++ declarations as they appear in documentation blocks.
//!
//! Documentation commands such as `\fn` carry the declaration they document as
//! raw text, e.g.:
//!
//! ```text
//! char* getenv(const char* env_var);
//! ```
//!
//! This crate turns such a line into a structured signature: a function name,
//! a return type, parameters with their types, names and default values, and
//! so on. It deliberately understands only the subset of C++ syntax that
//! appears in documented declarations; callers are expected to treat a parse
//! failure as "keep the raw text" rather than as a fatal error.
//!
//! The entry points are [parse_function], [parse_variable], [parse_typedef],
//! [parse_macro] and [parse_type]. The [recover_enumerators] function is a
//! separate scanner that pulls enumerator names out of a raw source span.
//!
//! All parsed values re-stringify to the literal source form via their
//! [Display](std::fmt::Display) implementations, so
//! `parse_type("std::vector<std::vector<int>>")` round-trips exactly.

mod enumrec;
mod parser;
mod signature;
mod token;

pub use enumrec::recover_enumerators;
pub use signature::{
    MacroDecl, Name, Parameter, Pointer, RefQualifier, Segment, Signature, SignatureKind,
    Specifiers, TemplateArg, Type, TypeKind, Typedef, Variable,
};

/// Error returned when a declaration cannot be parsed.
///
/// The error carries a human-readable reason and the byte offset in the
/// declaration text at which parsing gave up. Callers typically log the error
/// and fall back to storing the raw declaration text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDeclError {
    pub reason: String,
    pub offset: usize,
}

impl std::fmt::Display for ParseDeclError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (at byte {})", self.reason, self.offset)
    }
}

impl std::error::Error for ParseDeclError {}

/// Parse a function declaration such as `char* getenv(const char* env_var);`.
pub fn parse_function(declaration: &str) -> Result<Signature, ParseDeclError> {
    parser::Parser::new(declaration)?.parse_function()
}

/// Parse a variable declaration such as `static const int max_size = 64;`.
pub fn parse_variable(declaration: &str) -> Result<Variable, ParseDeclError> {
    parser::Parser::new(declaration)?.parse_variable()
}

/// Parse a typedef, in either the `typedef T name;` or the `using name = T;` form.
pub fn parse_typedef(declaration: &str) -> Result<Typedef, ParseDeclError> {
    parser::Parser::new(declaration)?.parse_typedef()
}

/// Parse a preprocessor macro prototype such as `MIN(a, b)` or `VERSION`.
pub fn parse_macro(declaration: &str) -> Result<MacroDecl, ParseDeclError> {
    parser::Parser::new(declaration)?.parse_macro()
}

/// Parse a type such as `const char*` or `std::vector<std::vector<int>>`.
pub fn parse_type(text: &str) -> Result<Type, ParseDeclError> {
    parser::Parser::new(text)?.parse_type_eof()
}
