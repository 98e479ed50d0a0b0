//! The command gatherer, which assembles function calls from the token
//! stream.
//!
//! The built-in vocabulary is defined as macros over six reserved meta
//! control sequences. Five of them enqueue an argument-parsing task each;
//! the sixth, `\call@`, enqueues a call task whose target is the control
//! sequence token that follows it. Once the meta run ends, the queued tasks
//! drain in order against the incoming tokens:
//!
//! ```text
//! \class vector        (user input)
//! \parseword@ \call@ \class@ vector        (after expansion)
//! ```
//!
//! Here `\parseword@` gathers the word `vector`, and the call task then
//! stamps the function name `class@` and signals a pending call, which the
//! driver dispatches to the active builder.
//!
//! Tasks terminate on character data only: a control sequence inside a
//! gathered argument is an error, and a rest-of-line argument temporarily
//! reclassifies the newline character to the active category so the line
//! end can serve as its terminator.

use crate::catcode::{Category, CategoryTable};
use crate::error::{ErrorKind, ParseError, Result};
use crate::token::{CsName, CsNameInterner, Token};
use std::collections::VecDeque;

/// A gathered argument or option value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// A fully gathered command: name, positional arguments, and options.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Value>,
    /// Keyed options in source order. The empty key holds the first
    /// unlabeled option, if any.
    pub options: Vec<(String, Value)>,
}

impl FunctionCall {
    pub fn string_arg(&self, index: usize) -> Option<&str> {
        self.arguments.get(index).and_then(Value::as_str)
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionsStage {
    /// Nothing seen yet; the whole group is optional.
    Start,
    Key,
    Value,
}

#[derive(Debug)]
enum Task {
    ParseBool {
        buffer: String,
    },
    ParseInt {
        buffer: String,
    },
    ParseWord {
        buffer: String,
    },
    ParseLongWord {
        buffer: String,
        /// The newline's prior category, restored on completion.
        saved: Option<Category>,
    },
    ParseOptions {
        stage: OptionsStage,
        key: String,
        value: String,
    },
    Call {
        target: Option<CsName>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    GatheringTasks,
    WaitingForCallCs,
    Working,
}

struct Reserved {
    parse_bool: CsName,
    parse_int: CsName,
    parse_word: CsName,
    parse_long_word: CsName,
    parse_options: CsName,
    call: CsName,
}

/// The command gatherer. See the module documentation.
pub struct Gatherer {
    reserved: Reserved,
    state: State,
    tasks: VecDeque<Task>,
    call: FunctionCall,
    pending_calls: VecDeque<FunctionCall>,
}

pub const PARSE_BOOL: &str = "parsebool@";
pub const PARSE_INT: &str = "parseint@";
pub const PARSE_WORD: &str = "parseword@";
pub const PARSE_LONG_WORD: &str = "parselongword@";
pub const PARSE_OPTIONS: &str = "parseoptions@";
pub const CALL: &str = "call@";

/// Characters that end a word argument in addition to spaces.
const WORD_TERMINATORS: [char; 3] = ['.', ',', ':'];

impl Gatherer {
    pub fn new(interner: &mut CsNameInterner) -> Gatherer {
        Gatherer {
            reserved: Reserved {
                parse_bool: interner.get_or_intern(PARSE_BOOL),
                parse_int: interner.get_or_intern(PARSE_INT),
                parse_word: interner.get_or_intern(PARSE_WORD),
                parse_long_word: interner.get_or_intern(PARSE_LONG_WORD),
                parse_options: interner.get_or_intern(PARSE_OPTIONS),
                call: interner.get_or_intern(CALL),
            },
            state: State::Idle,
            tasks: VecDeque::new(),
            call: FunctionCall::default(),
            pending_calls: VecDeque::new(),
        }
    }

    fn task_for(&self, name: CsName) -> Option<Task> {
        if name == self.reserved.parse_bool {
            Some(Task::ParseBool {
                buffer: String::new(),
            })
        } else if name == self.reserved.parse_int {
            Some(Task::ParseInt {
                buffer: String::new(),
            })
        } else if name == self.reserved.parse_word {
            Some(Task::ParseWord {
                buffer: String::new(),
            })
        } else if name == self.reserved.parse_long_word {
            Some(Task::ParseLongWord {
                buffer: String::new(),
                saved: None,
            })
        } else if name == self.reserved.parse_options {
            Some(Task::ParseOptions {
                stage: OptionsStage::Start,
                key: String::new(),
                value: String::new(),
            })
        } else {
            None
        }
    }

    /// Feed one token. Returns the token if it passes through unconsumed.
    pub fn put(
        &mut self,
        token: Token,
        table: &mut CategoryTable,
        interner: &CsNameInterner,
    ) -> Result<Option<Token>> {
        match self.state {
            State::Idle | State::GatheringTasks => {
                if let Token::ControlSequence(name) = token {
                    if let Some(task) = self.task_for(name) {
                        self.tasks.push_back(task);
                        self.state = State::GatheringTasks;
                        return Ok(None);
                    }
                    if name == self.reserved.call {
                        self.tasks.push_back(Task::Call { target: None });
                        self.state = State::WaitingForCallCs;
                        return Ok(None);
                    }
                }
                if self.state == State::Idle {
                    return Ok(Some(token));
                }
                self.state = State::Working;
                match self.work(Some(token), table, interner)? {
                    // A token that outlives the task queue re-enters in the
                    // state the queue's completion produced.
                    Some(leftover) => self.put(leftover, table, interner),
                    None => Ok(None),
                }
            }
            State::WaitingForCallCs => match token {
                Token::ControlSequence(name) => {
                    match self.tasks.back_mut() {
                        Some(Task::Call { target }) => *target = Some(name),
                        _ => unreachable!("waiting for a call target without a call task"),
                    }
                    // A queue of bare calls needs no input at all; it fires
                    // immediately so the driver dispatches before any
                    // further text is read.
                    if self.tasks.iter().all(|t| matches!(t, Task::Call { .. })) {
                        self.state = State::Working;
                        let leftover = self.work(None, table, interner)?;
                        debug_assert!(leftover.is_none());
                    } else {
                        self.state = State::GatheringTasks;
                    }
                    Ok(None)
                }
                Token::Character(c, _) => {
                    Err(ParseError::new(ErrorKind::ExpectedControlSequence {
                        found: c.to_string(),
                    }))
                }
            },
            State::Working => match self.work(Some(token), table, interner)? {
                Some(leftover) => self.put(leftover, table, interner),
                None => Ok(None),
            },
        }
    }

    /// Drains tasks against the provided token (if any) until more input is
    /// needed or everything is done.
    fn work(
        &mut self,
        token: Option<Token>,
        table: &mut CategoryTable,
        interner: &CsNameInterner,
    ) -> Result<Option<Token>> {
        let mut token = token;
        loop {
            // Call tasks complete without consuming input.
            while matches!(self.tasks.front(), Some(Task::Call { .. })) {
                self.execute_call(interner)?;
            }
            let front = match self.tasks.front_mut() {
                Some(front) => front,
                None => {
                    self.state = State::Idle;
                    return Ok(token);
                }
            };
            // A rest-of-line task claims the newline when it starts.
            if let Task::ParseLongWord { saved, .. } = front {
                if saved.is_none() {
                    *saved = Some(table.set('\n', Category::Active));
                }
            }
            let t = match token.take() {
                Some(t) => t,
                None => return Ok(None),
            };
            let (completed, returned) = self.process(t, table, interner)?;
            if completed {
                self.tasks.pop_front();
                token = returned;
                continue;
            }
            debug_assert!(returned.is_none());
            return Ok(None);
        }
    }

    /// Feeds one token into the front task.
    ///
    /// Returns (task completed, token to reprocess).
    fn process(
        &mut self,
        token: Token,
        table: &mut CategoryTable,
        interner: &CsNameInterner,
    ) -> Result<(bool, Option<Token>)> {
        let (c, category) = match token {
            Token::Character(c, category) => (c, category),
            Token::ControlSequence(name) => {
                // A command terminates word and rest-of-line arguments (and
                // an absent option group); elsewhere only character data is
                // valid.
                match self.tasks.front_mut().unwrap() {
                    Task::ParseWord { buffer } => {
                        let word = std::mem::take(buffer);
                        self.call.arguments.push(Value::Str(word));
                        return Ok((true, Some(token)));
                    }
                    Task::ParseLongWord { buffer, saved } => {
                        if let Some(previous) = saved.take() {
                            table.set('\n', previous);
                        }
                        let text = std::mem::take(buffer);
                        self.call
                            .arguments
                            .push(Value::Str(text.trim().to_string()));
                        return Ok((true, Some(token)));
                    }
                    Task::ParseOptions {
                        stage: OptionsStage::Start,
                        ..
                    } => return Ok((true, Some(token))),
                    _ => {
                        return Err(ParseError::new(ErrorKind::UnexpectedControlSequence {
                            name: interner.resolve(name).to_string(),
                        }))
                    }
                }
            }
        };
        let front = self.tasks.front_mut().unwrap();
        match front {
            Task::ParseBool { buffer } => {
                if category == Category::Space {
                    if buffer.is_empty() {
                        return Ok((false, None));
                    }
                    let value = match buffer.as_str() {
                        "true" | "1" => true,
                        "false" | "0" => false,
                        other => {
                            return Err(ParseError::bad_call(
                                "parsebool@",
                                format!("`{other}` is not a boolean"),
                            ))
                        }
                    };
                    self.call.arguments.push(Value::Bool(value));
                    return Ok((true, None));
                }
                buffer.push(c);
                Ok((false, None))
            }
            Task::ParseInt { buffer } => {
                if category == Category::Space {
                    if buffer.is_empty() {
                        return Ok((false, None));
                    }
                    let value: i64 = buffer.parse().map_err(|_| {
                        ParseError::bad_call(
                            "parseint@",
                            format!("`{buffer}` is not an integer"),
                        )
                    })?;
                    self.call.arguments.push(Value::Int(value));
                    return Ok((true, None));
                }
                buffer.push(c);
                Ok((false, None))
            }
            Task::ParseWord { buffer } => {
                if category == Category::Space {
                    if buffer.is_empty() {
                        return Ok((false, None));
                    }
                    let word = std::mem::take(buffer);
                    self.call.arguments.push(Value::Str(word));
                    return Ok((true, None));
                }
                if WORD_TERMINATORS.contains(&c) && !buffer.is_empty() {
                    let word = std::mem::take(buffer);
                    self.call.arguments.push(Value::Str(word));
                    // The terminator is content, not a separator; put it back.
                    return Ok((true, Some(token)));
                }
                buffer.push(c);
                Ok((false, None))
            }
            Task::ParseLongWord { buffer, saved } => {
                if category == Category::Active && c == '\n' {
                    if let Some(previous) = saved.take() {
                        table.set('\n', previous);
                    }
                    let text = std::mem::take(buffer);
                    self.call.arguments.push(Value::Str(text.trim().to_string()));
                    return Ok((true, None));
                }
                buffer.push(c);
                Ok((false, None))
            }
            Task::ParseOptions { stage, key, value } => match stage {
                OptionsStage::Start => {
                    if category == Category::Space {
                        return Ok((false, None));
                    }
                    if c == '[' {
                        *stage = OptionsStage::Key;
                        return Ok((false, None));
                    }
                    // No option group: the task completes without input.
                    Ok((true, Some(token)))
                }
                OptionsStage::Key => match c {
                    ']' | ',' => {
                        let bare = std::mem::take(key);
                        let entry_done = c == ']';
                        if !bare.trim().is_empty() {
                            let bare = bare.trim().to_string();
                            if self.call.options.is_empty() {
                                self.call.options.push((String::new(), coerce(&bare)));
                            } else {
                                self.call.options.push((bare, Value::Bool(true)));
                            }
                        }
                        Ok((entry_done, None))
                    }
                    '=' => {
                        *stage = OptionsStage::Value;
                        Ok((false, None))
                    }
                    _ => {
                        key.push(c);
                        Ok((false, None))
                    }
                },
                OptionsStage::Value => match c {
                    ']' | ',' => {
                        let entry_key = std::mem::take(key).trim().to_string();
                        let entry_value = std::mem::take(value);
                        self.call
                            .options
                            .push((entry_key, coerce(entry_value.trim())));
                        *stage = OptionsStage::Key;
                        Ok((c == ']', None))
                    }
                    _ => {
                        value.push(c);
                        Ok((false, None))
                    }
                },
            },
            Task::Call { .. } => unreachable!("call tasks complete without input"),
        }
    }

    fn execute_call(&mut self, interner: &CsNameInterner) -> Result<()> {
        let target = match self.tasks.pop_front() {
            Some(Task::Call { target }) => target,
            _ => unreachable!("execute_call requires a call task at the front"),
        };
        let target = target.ok_or_else(|| {
            ParseError::new(ErrorKind::ExpectedControlSequence {
                found: "end of input".to_string(),
            })
        })?;
        let mut call = std::mem::take(&mut self.call);
        call.name = interner.resolve(target).to_string();
        self.pending_calls.push_back(call);
        Ok(())
    }

    /// The next call waiting for the driver to dispatch, if any.
    ///
    /// The arguments and options accumulated for a call are moved into it
    /// when its call task executes, so the next call starts from a clean
    /// slate.
    pub fn take_pending_call(&mut self) -> Option<FunctionCall> {
        self.pending_calls.pop_front()
    }

    /// Completes outstanding work at the end of a block or file.
    ///
    /// The end of the block terminates a rest-of-line or word argument the
    /// same way a line end or space would, and a stamped call still fires.
    pub fn end_of_block(
        &mut self,
        table: &mut CategoryTable,
        interner: &CsNameInterner,
    ) -> Result<()> {
        while let Some(front) = self.tasks.front_mut() {
            match front {
                Task::ParseLongWord { buffer, saved } => {
                    if let Some(previous) = saved.take() {
                        table.set('\n', previous);
                    }
                    let text = std::mem::take(buffer);
                    self.call.arguments.push(Value::Str(text.trim().to_string()));
                    self.tasks.pop_front();
                }
                Task::ParseWord { buffer } | Task::ParseBool { buffer } | Task::ParseInt { buffer } => {
                    if buffer.is_empty() {
                        return Err(ParseError::bad_call(
                            "call@",
                            "the block ended before a command argument",
                        ));
                    }
                    let word = std::mem::take(buffer);
                    self.call.arguments.push(Value::Str(word));
                    self.tasks.pop_front();
                }
                Task::ParseOptions { stage, .. } => {
                    if *stage != OptionsStage::Start {
                        return Err(ParseError::bad_call(
                            "call@",
                            "the block ended inside an option group",
                        ));
                    }
                    self.tasks.pop_front();
                }
                Task::Call { .. } => {
                    self.execute_call(interner)?;
                }
            }
        }
        self.state = State::Idle;
        Ok(())
    }

    /// Discard all state, for error recovery. Restores the newline's
    /// category if a rest-of-line task had claimed it.
    pub fn reset(&mut self, table: &mut CategoryTable) {
        for task in &mut self.tasks {
            if let Task::ParseLongWord {
                saved: Some(previous),
                ..
            } = task
            {
                table.set('\n', *previous);
            }
        }
        self.tasks.clear();
        self.call = FunctionCall::default();
        self.pending_calls.clear();
        self.state = State::Idle;
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }
}

fn coerce(text: &str) -> Value {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        Value::Int(text.parse().unwrap_or(0))
    } else {
        Value::Str(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        interner: CsNameInterner,
        table: CategoryTable,
        gatherer: Gatherer,
        passed: Vec<Token>,
    }

    impl Fixture {
        fn new() -> Fixture {
            let mut interner = CsNameInterner::default();
            let gatherer = Gatherer::new(&mut interner);
            Fixture {
                interner,
                table: CategoryTable::default(),
                gatherer,
                passed: Vec::new(),
            }
        }

        fn cs(&mut self, name: &str) -> Token {
            Token::ControlSequence(self.interner.get_or_intern(name))
        }

        fn put(&mut self, token: Token) -> Result<()> {
            if let Some(out) =
                self.gatherer
                    .put(token, &mut self.table, &self.interner)?
            {
                self.passed.push(out);
            }
            Ok(())
        }

        fn put_meta(&mut self, names: &[&str]) {
            for name in names {
                let token = self.cs(name);
                self.put(token).unwrap();
            }
        }

        fn put_text(&mut self, text: &str) {
            for c in text.chars() {
                let token = Token::Character(c, self.table.get(c));
                self.put(token).unwrap();
            }
        }

        fn pending(&mut self) -> Option<FunctionCall> {
            self.gatherer.take_pending_call()
        }
    }

    #[test]
    fn word_and_call() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_WORD, CALL, "class@"]);
        f.put_text("vector ");
        let call = f.pending().unwrap();
        assert_eq!(call.name, "class@");
        assert_eq!(call.string_arg(0), Some("vector"));
        assert!(f.gatherer.is_idle());
        assert!(f.passed.is_empty());
    }

    #[test]
    fn call_without_arguments_fires_immediately() {
        let mut f = Fixture::new();
        f.put_meta(&[CALL, "endclass@"]);
        let call = f.pending().unwrap();
        assert_eq!(call.name, "endclass@");
        assert!(call.arguments.is_empty());
        assert!(f.gatherer.is_idle());
        assert!(f.passed.is_empty());
    }

    #[test]
    fn control_sequence_terminates_a_long_word() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_LONG_WORD, CALL, "brief@"]);
        f.put_text("A dynamic array.");
        // The next command both ends the argument and re-enters the
        // gatherer.
        let call_primitive = f.cs(CALL);
        f.put(call_primitive).unwrap();
        let call = f.pending().unwrap();
        assert_eq!(call.name, "brief@");
        assert_eq!(call.string_arg(0), Some("A dynamic array."));
        // The terminator began a new call task.
        let target = f.cs("endclass@");
        f.put(target).unwrap();
        assert_eq!(f.pending().unwrap().name, "endclass@");
        assert_eq!(f.table.get('\n'), Category::EndOfLine);
    }

    #[test]
    fn word_terminated_by_punctuation_returns_the_terminator() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_WORD, CALL, "c@"]);
        f.put_text("size.");
        let call = f.pending().unwrap();
        assert_eq!(call.string_arg(0), Some("size"));
        assert_eq!(f.passed, vec![Token::Character('.', Category::Other)]);
    }

    #[test]
    fn leading_spaces_are_separators() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_WORD, CALL, "c@"]);
        f.put_text("  word ");
        let call = f.pending().unwrap();
        assert_eq!(call.string_arg(0), Some("word"));
    }

    #[test]
    fn two_word_arguments() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_WORD, PARSE_LONG_WORD, CALL, "param@"]);
        f.put_text("env var name to read");
        // Terminate the rest-of-line argument.
        let newline = Token::Character('\n', f.table.get('\n'));
        assert_eq!(f.table.get('\n'), Category::Active);
        f.put(newline).unwrap();
        let call = f.pending().unwrap();
        assert_eq!(call.string_arg(0), Some("env"));
        assert_eq!(call.string_arg(1), Some("var name to read"));
        // The newline's classification was restored.
        assert_eq!(f.table.get('\n'), Category::EndOfLine);
    }

    #[test]
    fn bool_and_int_tasks() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_BOOL, PARSE_INT, CALL, "opt@"]);
        f.put_text("true 42 ");
        let call = f.pending().unwrap();
        assert_eq!(call.arguments[0], Value::Bool(true));
        assert_eq!(call.arguments[1], Value::Int(42));
    }

    #[test]
    fn bad_bool_is_an_error() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_BOOL, CALL, "opt@"]);
        for c in "maybe".chars() {
            let token = Token::Character(c, f.table.get(c));
            f.put(token).unwrap();
        }
        let space = Token::Character(' ', Category::Space);
        assert!(f.gatherer.put(space, &mut f.table, &f.interner).is_err());
    }

    #[test]
    fn options_group() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_OPTIONS, PARSE_WORD, CALL, "image@"]);
        f.put_text("[300, caption=A tree] forest ");
        let call = f.pending().unwrap();
        assert_eq!(call.string_arg(0), Some("forest"));
        assert_eq!(call.option(""), Some(&Value::Int(300)));
        assert_eq!(
            call.option("caption"),
            Some(&Value::Str("A tree".to_string()))
        );
    }

    #[test]
    fn later_bare_option_is_a_flag() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_OPTIONS, CALL, "image@"]);
        f.put_text("[caption=x, wide] y");
        let call = f.pending().unwrap();
        assert_eq!(call.option("wide"), Some(&Value::Bool(true)));
    }

    #[test]
    fn options_are_optional() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_OPTIONS, PARSE_WORD, CALL, "image@"]);
        f.put_text("forest ");
        let call = f.pending().unwrap();
        assert!(call.options.is_empty());
        assert_eq!(call.string_arg(0), Some("forest"));
    }

    #[test]
    fn character_after_call_primitive_is_an_error() {
        let mut f = Fixture::new();
        let call = f.cs(CALL);
        f.put(call).unwrap();
        let x = Token::Character('x', Category::Letter);
        let err = f.gatherer.put(x, &mut f.table, &f.interner).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::ExpectedControlSequence { .. }
        ));
    }

    #[test]
    fn control_sequence_inside_a_numeric_argument_is_an_error() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_INT, CALL, "opt@"]);
        f.put_text("4");
        let stray = f.cs("b");
        let err = f
            .gatherer
            .put(stray, &mut f.table, &f.interner)
            .unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::UnexpectedControlSequence { .. }
        ));
    }

    #[test]
    fn end_of_block_completes_a_long_word() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_LONG_WORD, CALL, "brief@"]);
        f.put_text("short text");
        f.gatherer
            .end_of_block(&mut f.table, &f.interner)
            .unwrap();
        let call = f.pending().unwrap();
        assert_eq!(call.name, "brief@");
        assert_eq!(call.string_arg(0), Some("short text"));
        assert_eq!(f.table.get('\n'), Category::EndOfLine);
    }

    #[test]
    fn reset_restores_the_newline_category() {
        let mut f = Fixture::new();
        f.put_meta(&[PARSE_LONG_WORD, CALL, "brief@"]);
        f.put_text("abc");
        assert_eq!(f.table.get('\n'), Category::Active);
        f.gatherer.reset(&mut f.table);
        assert_eq!(f.table.get('\n'), Category::EndOfLine);
        assert!(f.gatherer.is_idle());
    }

    #[test]
    fn idle_tokens_pass_through() {
        let mut f = Fixture::new();
        f.put_text("ab");
        assert_eq!(f.passed.len(), 2);
    }
}
