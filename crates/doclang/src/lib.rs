//! # Doclang
//!
//! Doclang extracts structured documentation from annotated source
//! comments written in a small TeX-inspired markup language. Source files
//! carry documentation in delimited blocks (`/*! ... */` by default);
//! manual files are markup through and through. Both feed one pipeline
//! (input stream, category-driven lexer, macro preprocessor, conditional
//! evaluator, command gatherer, parser driver) whose output is dispatched
//! to frame-stack builders that produce a typed [model](crate::model) of
//! entities (namespaces, classes, functions, enums, ...) and prose
//! (paragraphs, lists, math, sections).
//!
//! The usual entry point is [DocParser]:
//!
//! ```
//! use doclang::{DocParser, Mode, Options};
//!
//! let mut parser = DocParser::new(Options::default());
//! let errors = parser.parse_source(
//!     "vector.h",
//!     "/*! \\class vector \\brief A dynamic array. \\endclass */",
//!     Mode::Blocks,
//! );
//! assert!(errors.is_empty());
//! let model = parser.into_model();
//! assert_eq!(model.entity_count(), 1);
//! ```
//!
//! Rendering and export are not part of this crate: the model is the
//! hand-off point, and with the `serde` feature enabled it serializes.

pub mod builder;
pub mod catcode;
pub mod conditional;
pub mod driver;
pub mod error;
pub mod gatherer;
pub mod input;
pub mod lexer;
pub mod model;
pub mod texmacro;
pub mod token;
pub mod vocabulary;

pub use driver::{DocParser, FileSystem, InMemoryFileSystem, Mode, Options, OsFileSystem};
pub use error::{ErrorKind, ParseError};
pub use model::Model;
