//! The parser driver: a state machine that sequences the pipeline for one
//! input file and dispatches tokens and calls to the active builder.
//!
//! The flow for each character is
//! input stream → lexer → preprocessor → conditional evaluator → command
//! gatherer → interpretation, with gathered calls dispatched to the
//! builder as soon as the gatherer reports them. Two calls are intercepted
//! by the driver itself: `\input` pushes a file onto the input stream, and
//! `\code` captures raw text up to `\endcode` using the input stream's
//! delimiter scanning.
//!
//! Errors raised while advancing are annotated with the current source
//! location before they propagate. Recovery is per block: `recover()`
//! discards the rest of the block and resumes scanning, `reset()` is the
//! fallback when no block end can be found.

use crate::builder::{BlockContext, Builder, ManualBuilder, ProgramBuilder};
use crate::catcode::{Category, CategoryTable};
use crate::conditional::{Evaluator, Registers};
use crate::error::{ErrorKind, ParseError, Result};
use crate::gatherer::{FunctionCall, Gatherer};
use crate::input::InputStream;
use crate::lexer::{Lexer, LexerError};
use crate::model::Model;
use crate::texmacro::Preprocessor;
use crate::token::{CsName, CsNameInterner, Token};
use crate::vocabulary::{self, names};
use doccraft_stdext::algorithms::spellcheck;
use std::collections::VecDeque;
use std::path::Path;

/// How a file's content is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Documentation lives in delimited blocks; everything else is raw
    /// source.
    Blocks,
    /// The whole file is markup (manuals and pages).
    FreeForm,
}

/// Configuration accepted by the core.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Options {
    /// Block start delimiter in source files.
    pub block_start: String,
    /// Block end delimiter in source files.
    pub block_end: String,
    /// Per-line continuation prefix inside blocks.
    pub continuation: Option<char>,
    /// File suffixes parsed in block mode.
    pub source_suffixes: Vec<String>,
    /// File suffixes parsed as free-form manual text.
    pub manual_suffixes: Vec<String>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            block_start: "/*!".to_string(),
            block_end: "*/".to_string(),
            continuation: Some('*'),
            source_suffixes: ["h", "hh", "hpp", "hxx", "c", "cc", "cpp", "cxx"]
                .map(String::from)
                .to_vec(),
            manual_suffixes: ["txt"].map(String::from).to_vec(),
        }
    }
}

/// File system access, extracted to a trait so tests can run against an
/// in-memory tree.
pub trait FileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

/// The real file system.
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// An in-memory file system for unit tests.
#[derive(Default)]
pub struct InMemoryFileSystem {
    files: std::collections::HashMap<std::path::PathBuf, String>,
}

impl InMemoryFileSystem {
    pub fn add<P: Into<std::path::PathBuf>, S: Into<String>>(&mut self, path: P, content: S) {
        self.files.insert(path.into(), content.into());
    }
}

impl FileSystem for InMemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file")
        })
    }
}

const MAX_INPUT_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    BeginFile,
    SeekBlock,
    ReadChar,
    ReadToken,
    Preprocess,
    SendToken,
    EndFile,
}

struct Driver<'a> {
    model: &'a mut Model,
    interner: &'a mut CsNameInterner,
    file_system: &'a dyn FileSystem,
    input: InputStream,
    lexer: Lexer,
    preprocessor: Preprocessor,
    evaluator: Evaluator,
    gatherer: Gatherer,
    table: CategoryTable,
    registers: Registers,
    builder: Builder,
    mode: Mode,
    state: State,
    current_token: Option<Token>,
    queue: VecDeque<Token>,
    block_offset: usize,
}

impl<'a> Driver<'a> {
    fn new(
        model: &'a mut Model,
        interner: &'a mut CsNameInterner,
        file_system: &'a dyn FileSystem,
        options: &Options,
        path: String,
        content: String,
        mode: Mode,
    ) -> Driver<'a> {
        let mut preprocessor = Preprocessor::default();
        vocabulary::install(&mut preprocessor, interner);
        let evaluator = Evaluator::new(interner);
        let gatherer = Gatherer::new(interner);
        let builder = match mode {
            Mode::Blocks => Builder::Program(ProgramBuilder::default()),
            Mode::FreeForm => Builder::Manual(ManualBuilder::default()),
        };
        Driver {
            model,
            interner,
            file_system,
            input: InputStream::new(
                path,
                content,
                options.block_start.clone(),
                options.block_end.clone(),
                options.continuation,
            ),
            lexer: Lexer::default(),
            preprocessor,
            evaluator,
            gatherer,
            table: CategoryTable::default(),
            registers: Registers::default(),
            builder,
            mode,
            state: State::BeginFile,
            current_token: None,
            queue: VecDeque::new(),
            block_offset: 0,
        }
    }

    /// Runs the state machine to completion.
    fn resume(&mut self) -> Result<()> {
        while self.state != State::Idle {
            self.advance()?;
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        let location = self.input.location();
        self.advance_inner().map_err(|e| e.at(location))
    }

    fn advance_inner(&mut self) -> Result<()> {
        match self.state {
            State::Idle => Ok(()),
            State::BeginFile => {
                self.state = match self.mode {
                    Mode::Blocks => State::SeekBlock,
                    Mode::FreeForm => State::ReadChar,
                };
                Ok(())
            }
            State::SeekBlock => {
                match self.input.seek_block() {
                    Some(start) => {
                        self.block_offset = start.offset;
                        self.builder.begin_block(start.offset);
                        self.state = State::ReadChar;
                    }
                    None => self.state = State::EndFile,
                }
                Ok(())
            }
            State::ReadChar => {
                if self.lexer.has_token() {
                    self.state = State::ReadToken;
                    return Ok(());
                }
                if self.mode == Mode::Blocks && self.input.at_block_end() {
                    self.input.consume_block_end();
                    self.end_block()?;
                    self.state = State::SeekBlock;
                    return Ok(());
                }
                match self.input.read() {
                    Some(c) => {
                        let category = self.table.get(c);
                        self.lexer
                            .put(c, category, self.interner)
                            .map_err(lexer_error)?;
                        if self.lexer.has_token() {
                            self.state = State::ReadToken;
                        }
                    }
                    None => {
                        if self.mode == Mode::Blocks && self.input.in_block() {
                            // The file ended inside a block; treat the end
                            // of input as the end of the block.
                            self.end_block()?;
                        }
                        self.state = State::EndFile;
                    }
                }
                Ok(())
            }
            State::ReadToken => {
                match self.lexer.next() {
                    Some(token) => {
                        self.current_token = Some(token);
                        self.state = State::Preprocess;
                    }
                    None => self.state = State::ReadChar,
                }
                Ok(())
            }
            State::Preprocess => {
                let token = self.current_token.take().unwrap();
                self.preprocessor.put(token, self.interner)?;
                while let Some(expanded) = self.preprocessor.next() {
                    self.queue.push_back(expanded);
                }
                self.state = if self.queue.is_empty() {
                    State::ReadChar
                } else {
                    State::SendToken
                };
                Ok(())
            }
            State::SendToken => {
                match self.queue.pop_front() {
                    Some(token) => self.send(token)?,
                    None => self.state = State::ReadChar,
                }
                Ok(())
            }
            State::EndFile => {
                if self.mode == Mode::FreeForm {
                    self.flush_pipeline()?;
                }
                self.builder.end_file(self.model)?;
                self.state = State::Idle;
                Ok(())
            }
        }
    }

    /// Relays one expanded token through the evaluator and the gatherer,
    /// dispatches any pending call, and interprets what comes out.
    fn send(&mut self, token: Token) -> Result<()> {
        let token = match self.evaluator.process(
            token,
            &mut self.registers,
            &self.lexer,
            &mut self.input,
            self.interner,
        )? {
            Some(token) => token,
            None => return Ok(()),
        };
        let out = self.gatherer.put(token, &mut self.table, self.interner)?;
        while let Some(call) = self.gatherer.take_pending_call() {
            self.dispatch(call)?;
        }
        match out {
            Some(token) => self.interpret(token),
            None => Ok(()),
        }
    }

    fn interpret(&mut self, token: Token) -> Result<()> {
        let (c, category) = match token {
            Token::ControlSequence(name) => return Err(self.unknown_control_sequence(name)),
            Token::Character(c, category) => (c, category),
        };
        match category {
            Category::BeginGroup => {
                self.preprocessor.begin_group();
                self.builder.group_begin();
                Ok(())
            }
            Category::EndGroup => {
                if !self.preprocessor.end_group() {
                    return Err(ParseError::bad_call("}", "no open group"));
                }
                self.builder.group_end()
            }
            Category::MathShift => self.builder.math_shift(),
            Category::AlignmentTab => self.builder.alignment_tab(),
            Category::Superscript => self.builder.superscript(),
            Category::Subscript => self.builder.subscript(),
            Category::Letter | Category::Other => self.builder.write_char(c),
            Category::Space => {
                if !self.builder.is_idle() {
                    self.builder.write_char(' ')?;
                }
                Ok(())
            }
            // Active characters are currently inert.
            Category::Active => Ok(()),
            // The lexer never emits these categories as character tokens.
            Category::Escape
            | Category::EndOfLine
            | Category::Ignored
            | Category::Comment
            | Category::Invalid => Ok(()),
        }
    }

    fn dispatch(&mut self, call: FunctionCall) -> Result<()> {
        match call.name.as_str() {
            names::INPUT => {
                let argument = call
                    .string_arg(0)
                    .ok_or_else(|| ParseError::bad_call("input", "missing file name"))?;
                if self.input.stack_depth() >= MAX_INPUT_DEPTH {
                    return Err(ParseError::bad_call(
                        "input",
                        "input files are nested too deeply",
                    ));
                }
                let resolved = Path::new(self.input.current_path())
                    .parent()
                    .map(|parent| parent.join(argument))
                    .unwrap_or_else(|| Path::new(argument).to_path_buf());
                let content = self.file_system.read_to_string(&resolved).map_err(|e| {
                    ParseError::new(ErrorKind::Io {
                        path: resolved.display().to_string(),
                        message: e.to_string(),
                    })
                })?;
                self.input
                    .push_document(resolved.display().to_string(), content);
                Ok(())
            }
            names::CODE => {
                let text = match self.input.take_until("\\endcode") {
                    Some(text) => text,
                    None => {
                        return Err(ParseError::bad_call(
                            "code",
                            "missing \\endcode before the end of the block",
                        ))
                    }
                };
                let text = text
                    .strip_prefix('\n')
                    .unwrap_or(&text)
                    .trim_end()
                    .to_string();
                self.builder.add_code_block(text)
            }
            _ => {
                let context = BlockContext {
                    block_offset: self.block_offset,
                    file_source: self.input.file_slice(0, usize::MAX),
                };
                self.builder.handle_call(&call, context, self.model)
            }
        }
    }

    fn unknown_control_sequence(&self, name: CsName) -> Box<ParseError> {
        let name = self.interner.resolve(name).to_string();
        let dictionary = self.preprocessor.defined_names(self.interner);
        let suggestions = spellcheck::find_close_words(dictionary, &name)
            .into_iter()
            .filter(|s| s.distance() <= 2)
            .take(3)
            .map(|s| s.word().to_string())
            .collect();
        ParseError::new(ErrorKind::UnknownControlSequence { name, suggestions })
    }

    /// Flushes partial lexer state and outstanding gatherer work, then
    /// tells the builder the block ended.
    fn end_block(&mut self) -> Result<()> {
        self.flush_pipeline()?;
        self.builder.end_block(self.model)
    }

    fn flush_pipeline(&mut self) -> Result<()> {
        self.lexer.flush(self.interner);
        while let Some(token) = self.lexer.next() {
            self.preprocessor.put(token, self.interner)?;
        }
        while let Some(token) = self.preprocessor.next() {
            self.queue.push_back(token);
        }
        while let Some(token) = self.queue.pop_front() {
            self.send(token)?;
        }
        self.gatherer.end_of_block(&mut self.table, self.interner)?;
        while let Some(call) = self.gatherer.take_pending_call() {
            self.dispatch(call)?;
        }
        Ok(())
    }

    /// Discards the rest of the current block and resumes scanning.
    ///
    /// Returns false if no block end was found before the end of input, in
    /// which case the caller falls back to [reset](Driver::reset).
    fn recover(&mut self) -> bool {
        self.current_token = None;
        self.queue.clear();
        self.lexer.reset();
        self.preprocessor.reset();
        self.evaluator.reset();
        self.gatherer.reset(&mut self.table);
        self.builder.unwind(self.model);
        if self.mode == Mode::FreeForm {
            return false;
        }
        // An error raised while finalizing a block arrives with the block
        // already consumed; scanning would skip the next block's content.
        if !self.input.in_block() {
            self.state = State::SeekBlock;
            return true;
        }
        loop {
            if self.input.at_block_end() {
                self.input.consume_block_end();
                // The unwound builder has nothing left to pop, but it still
                // hears that the block ended.
                let _ = self.builder.end_block(self.model);
                self.state = State::SeekBlock;
                return true;
            }
            if self.input.read().is_none() {
                return false;
            }
        }
    }

    /// Forcibly ends the file and replaces the builder with a fresh one.
    ///
    /// Prior completed entities remain in the model.
    fn reset(&mut self) {
        self.builder.force_end(self.model);
        self.builder = match self.mode {
            Mode::Blocks => Builder::Program(ProgramBuilder::default()),
            Mode::FreeForm => Builder::Manual(ManualBuilder::default()),
        };
        self.current_token = None;
        self.queue.clear();
        self.lexer.reset();
        self.preprocessor.reset();
        self.evaluator.reset();
        self.gatherer.reset(&mut self.table);
        self.state = State::Idle;
    }
}

fn lexer_error(error: LexerError) -> Box<ParseError> {
    match error {
        LexerError::InvalidCharacter(character) => {
            ParseError::new(ErrorKind::InvalidCharacter { character })
        }
    }
}

/// The documentation parser: drives files through the pipeline and
/// accumulates the model.
pub struct DocParser {
    options: Options,
    model: Model,
    interner: CsNameInterner,
    file_system: Box<dyn FileSystem>,
}

impl DocParser {
    pub fn new(options: Options) -> DocParser {
        DocParser::with_file_system(options, Box::new(OsFileSystem))
    }

    pub fn with_file_system(options: Options, file_system: Box<dyn FileSystem>) -> DocParser {
        DocParser {
            options,
            model: Model::default(),
            interner: CsNameInterner::default(),
            file_system,
        }
    }

    /// The mode a file parses in, chosen by its suffix.
    pub fn mode_for(&self, path: &Path) -> Mode {
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if self.options.manual_suffixes.iter().any(|s| *s == suffix) {
            Mode::FreeForm
        } else {
            Mode::Blocks
        }
    }

    /// Parses one file. Returns the errors recovered from per block; an
    /// I/O failure is returned as the outer error.
    pub fn parse_file(&mut self, path: &Path) -> Result<Vec<ParseError>> {
        let content = self.file_system.read_to_string(path).map_err(|e| {
            ParseError::new(ErrorKind::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;
        let mode = self.mode_for(path);
        Ok(self.parse_source(&path.display().to_string(), &content, mode))
    }

    /// Parses in-memory content as if it were a file's.
    pub fn parse_source(&mut self, path: &str, content: &str, mode: Mode) -> Vec<ParseError> {
        let mut driver = Driver::new(
            &mut self.model,
            &mut self.interner,
            self.file_system.as_ref(),
            &self.options,
            path.to_string(),
            content.to_string(),
            mode,
        );
        let mut errors = Vec::new();
        loop {
            match driver.resume() {
                Ok(()) => break,
                Err(error) => {
                    errors.push(*error);
                    if !driver.recover() {
                        driver.reset();
                        break;
                    }
                }
            }
        }
        errors
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }
}
