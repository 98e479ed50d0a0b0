//! The builders that receive the dispatched token stream.
//!
//! The parser driver routes characters and gathered calls to whichever
//! builder is active for the file: the [program builder](ProgramBuilder)
//! for block-based source files, the [manual builder](ManualBuilder) for
//! free-form manual files. Both feed prose into the shared
//! [prose builder](ProseBuilder).

mod manual;
mod program;
mod prose;

pub use manual::ManualBuilder;
pub use program::{BlockContext, ProgramBuilder};
pub use prose::{ProseBuilder, ProseState};

use crate::error::Result;
use crate::gatherer::FunctionCall;
use crate::model::Model;

/// The active builder for one file.
#[derive(Debug)]
pub enum Builder {
    Program(ProgramBuilder),
    Manual(ManualBuilder),
}

impl Builder {
    pub fn is_idle(&self) -> bool {
        match self {
            Builder::Program(b) => b.is_idle(),
            Builder::Manual(b) => b.is_idle(),
        }
    }

    pub fn write_char(&mut self, c: char) -> Result<()> {
        match self {
            Builder::Program(b) => b.write_char(c),
            Builder::Manual(b) => b.write_char(c),
        }
    }

    pub fn superscript(&mut self) -> Result<()> {
        match self {
            Builder::Program(b) => b.superscript(),
            Builder::Manual(b) => b.superscript(),
        }
    }

    pub fn subscript(&mut self) -> Result<()> {
        match self {
            Builder::Program(b) => b.subscript(),
            Builder::Manual(b) => b.subscript(),
        }
    }

    pub fn alignment_tab(&mut self) -> Result<()> {
        match self {
            Builder::Program(b) => b.alignment_tab(),
            Builder::Manual(b) => b.alignment_tab(),
        }
    }

    pub fn math_shift(&mut self) -> Result<()> {
        match self {
            Builder::Program(b) => b.math_shift(),
            Builder::Manual(b) => b.math_shift(),
        }
    }

    pub fn group_begin(&mut self) {
        match self {
            Builder::Program(b) => b.group_begin(),
            Builder::Manual(b) => b.group_begin(),
        }
    }

    pub fn group_end(&mut self) -> Result<()> {
        match self {
            Builder::Program(b) => b.group_end(),
            Builder::Manual(b) => b.group_end(),
        }
    }

    pub fn add_code_block(&mut self, text: String) -> Result<()> {
        match self {
            Builder::Program(b) => b.add_code_block(text),
            Builder::Manual(b) => b.add_code_block(text),
        }
    }

    pub fn handle_call(
        &mut self,
        call: &FunctionCall,
        context: BlockContext<'_>,
        model: &mut Model,
    ) -> Result<()> {
        match self {
            Builder::Program(b) => b.handle_call(call, context, model),
            Builder::Manual(b) => b.handle_call(call, model),
        }
    }

    pub fn begin_block(&mut self, offset: usize) {
        if let Builder::Program(b) = self {
            b.begin_block(offset);
        }
    }

    pub fn end_block(&mut self, model: &mut Model) -> Result<()> {
        match self {
            Builder::Program(b) => b.end_block(model),
            Builder::Manual(_) => Ok(()),
        }
    }

    pub fn end_file(&mut self, model: &mut Model) -> Result<()> {
        match self {
            Builder::Program(b) => b.end_file(model),
            Builder::Manual(b) => b.end_file(model),
        }
    }

    /// Unwinds nesting state after an error, keeping completed entities.
    pub fn unwind(&mut self, model: &mut Model) {
        match self {
            Builder::Program(b) => b.unwind(model),
            Builder::Manual(_) => {}
        }
    }

    /// Forcibly ends the file, keeping whatever can be kept.
    pub fn force_end(&mut self, model: &mut Model) {
        match self {
            Builder::Program(b) => b.unwind(model),
            Builder::Manual(b) => b.force_end(model),
        }
    }
}
