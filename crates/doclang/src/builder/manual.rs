//! The manual builder: builds standalone documents from free-form files.
//!
//! Unlike the program builder there is no frame stack here, since one
//! file contributes one document, but the prose side is the same
//! machinery.
//! `\manual` names the document; prose arriving before any `\manual`
//! creates an untitled document implicitly.

use crate::builder::prose::ProseBuilder;
use crate::error::{ErrorKind, ParseError, Result};
use crate::gatherer::FunctionCall;
use crate::model::{Document, DocumentNode, GroupMember, Model, SectionLevel};
use crate::vocabulary::names;

#[derive(Debug, Default)]
pub struct ManualBuilder {
    prose: ProseBuilder,
    /// Index of this file's document in [Model::documents].
    document: Option<usize>,
}

impl ManualBuilder {
    pub fn is_idle(&self) -> bool {
        self.prose.is_idle()
    }

    fn ensure_document(&mut self, model: &mut Model) -> usize {
        match self.document {
            Some(index) => index,
            None => {
                let index = model.documents.len();
                model.documents.push(Document::default());
                self.document = Some(index);
                index
            }
        }
    }

    pub fn write_char(&mut self, c: char) -> Result<()> {
        self.prose.write_char(c)
    }

    pub fn superscript(&mut self) -> Result<()> {
        self.prose.superscript()
    }

    pub fn subscript(&mut self) -> Result<()> {
        self.prose.subscript()
    }

    pub fn alignment_tab(&mut self) -> Result<()> {
        self.prose.alignment_tab()
    }

    pub fn math_shift(&mut self) -> Result<()> {
        self.prose.math_shift()
    }

    pub fn group_begin(&mut self) {
        self.prose.group_begin()
    }

    pub fn group_end(&mut self) -> Result<()> {
        self.prose.group_end()
    }

    pub fn add_code_block(&mut self, text: String) -> Result<()> {
        self.prose.add_code_block(text)
    }

    pub fn handle_call(&mut self, call: &FunctionCall, model: &mut Model) -> Result<()> {
        match call.name.as_str() {
            names::MANUAL => {
                let title = required_arg(call, 0, "manual")?.to_string();
                let index = self.ensure_document(model);
                let document = &mut model.documents[index];
                if document.title.is_some() {
                    return Err(ParseError::bad_call(
                        "manual",
                        "this file already has a manual title",
                    ));
                }
                document.title = Some(title);
                Ok(())
            }
            names::PART => {
                let title = required_arg(call, 0, "part")?.to_string();
                self.ensure_document(model);
                self.prose.add_section(SectionLevel::Part, title)
            }
            names::CHAPTER => {
                let title = required_arg(call, 0, "chapter")?.to_string();
                self.ensure_document(model);
                self.prose.add_section(SectionLevel::Chapter, title)
            }
            names::FRONT_MATTER => self.prose.add_marker(DocumentNode::FrontMatter),
            names::MAIN_MATTER => self.prose.add_marker(DocumentNode::MainMatter),
            names::BACK_MATTER => self.prose.add_marker(DocumentNode::BackMatter),
            names::TABLE_OF_CONTENTS => self.prose.add_marker(DocumentNode::TableOfContents),
            names::PRINT_INDEX => self.prose.add_marker(DocumentNode::Index),
            names::INGROUP => {
                let list = required_arg(call, 0, "ingroup")?.to_string();
                let index = self.ensure_document(model);
                for name in list.split(',') {
                    let name = name.trim();
                    if !name.is_empty() {
                        model.add_to_group(name, GroupMember::Document(index));
                    }
                }
                Ok(())
            }
            _ => {
                if self.prose.handle_call(call)? {
                    if self.document.is_none() && !self.prose.is_empty() {
                        self.ensure_document(model);
                    }
                    Ok(())
                } else {
                    Err(ParseError::new(ErrorKind::BadControlSequence {
                        name: call.name.trim_end_matches('@').to_string(),
                    }))
                }
            }
        }
    }

    /// Finalizes the file's document.
    pub fn end_file(&mut self, model: &mut Model) -> Result<()> {
        let nodes = self.prose.finish()?;
        self.attach(nodes, model);
        Ok(())
    }

    /// Finalizes the document keeping whatever can be kept, for recovery.
    pub fn force_end(&mut self, model: &mut Model) {
        let nodes = self.prose.force_finish();
        self.attach(nodes, model);
    }

    fn attach(&mut self, nodes: Vec<DocumentNode>, model: &mut Model) {
        if nodes.is_empty() && self.document.is_none() {
            return;
        }
        let index = self.ensure_document(model);
        model.documents[index].nodes.extend(nodes);
    }
}

fn required_arg<'a>(call: &'a FunctionCall, index: usize, command: &str) -> Result<&'a str> {
    call.string_arg(index)
        .ok_or_else(|| ParseError::bad_call(command, "missing argument"))
}
