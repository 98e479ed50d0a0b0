//! Doclang unit testing library
//!
//! This crate contains helpers for writing tests that drive markup through
//! the full Doclang pipeline and assert on the resulting model. It is used
//! extensively by Doclang's own integration tests, and is designed to work
//! for any code that embeds the parser.
//!
//! The run functions come in three flavors:
//!
//! - [run_source_test] parses block-based source content and fails the
//!   test on any parse error.
//! - [run_manual_test] does the same for free-form manual content.
//! - [run_recovery_test] parses source content and returns the recovered
//!   per-block errors together with the model, for tests that exercise
//!   error isolation.
//!
//! The [block] helper wraps a snippet in the default block delimiters, and
//! the find functions walk the entity tree so assertions can name entities
//! instead of chasing ids.

use doclang::model::{Document, DocumentNode, Entity, EntityId, Model, Paragraph};
use doclang::{DocParser, Mode, Options, ParseError};

/// Wraps a markup snippet in a documentation block.
pub fn block(snippet: &str) -> String {
    format!("/*!\n{snippet}\n*/\n")
}

/// Parses block-based source content; any parse error fails the test.
pub fn run_source_test(content: &str) -> Model {
    let mut parser = DocParser::new(Options::default());
    let errors = parser.parse_source("test.h", content, Mode::Blocks);
    assert!(
        errors.is_empty(),
        "unexpected parse errors: {:?}",
        errors
    );
    parser.into_model()
}

/// Parses free-form manual content; any parse error fails the test.
pub fn run_manual_test(content: &str) -> Model {
    let mut parser = DocParser::new(Options::default());
    let errors = parser.parse_source("manual.txt", content, Mode::FreeForm);
    assert!(
        errors.is_empty(),
        "unexpected parse errors: {:?}",
        errors
    );
    parser.into_model()
}

/// Parses block-based source content, returning recovered errors.
pub fn run_recovery_test(content: &str) -> (Model, Vec<ParseError>) {
    let mut parser = DocParser::new(Options::default());
    let errors = parser.parse_source("test.h", content, Mode::Blocks);
    (parser.into_model(), errors)
}

/// Finds the entity with the given name anywhere in the model.
///
/// Panics if no entity (or more than one) has the name; tests should use
/// unique names.
pub fn find_entity<'a>(model: &'a Model, name: &str) -> &'a Entity {
    let id = find_entity_id(model, name);
    model.arena.get(id)
}

/// Finds the id of the entity with the given name anywhere in the model.
pub fn find_entity_id(model: &Model, name: &str) -> EntityId {
    let matches: Vec<EntityId> = model
        .arena
        .iter()
        .filter(|(_, entity)| entity.name == name)
        .map(|(id, _)| id)
        .collect();
    match matches.as_slice() {
        [id] => *id,
        [] => panic!("no entity named {name:?} in the model"),
        _ => panic!("multiple entities named {name:?} in the model"),
    }
}

/// The names of an entity's children, in order.
pub fn child_names(model: &Model, name: &str) -> Vec<String> {
    find_entity(model, name)
        .children()
        .iter()
        .map(|&id| model.arena.get(id).name.clone())
        .collect()
}

/// The text of every top-level paragraph in a document, in order.
pub fn paragraph_texts(document: &Document) -> Vec<&str> {
    document
        .nodes
        .iter()
        .filter_map(|node| match node {
            DocumentNode::Paragraph(Paragraph { text, .. }) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// The description paragraphs of a named entity.
pub fn description_texts<'a>(model: &'a Model, name: &str) -> Vec<&'a str> {
    match &find_entity(model, name).description {
        Some(document) => paragraph_texts(document),
        None => Vec::new(),
    }
}
