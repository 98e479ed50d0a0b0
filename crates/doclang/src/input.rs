//! The input stream: a stack of in-memory documents with block seeking.
//!
//! The stack grows when text is injected (the `\input` command pushes the
//! named file) and an injected document is popped automatically once
//! exhausted, resuming its parent. The bottom document is always the file
//! being processed.
//!
//! In block mode the stream knows how to find documentation blocks: regions
//! delimited by a start marker at the beginning of a line (after leading
//! whitespace) and an end marker. Inside a block, a per-line continuation
//! prefix (whitespace followed by `*`, conventionally) is skipped
//! transparently, so readers see only the block's content.

/// Source location of the next character to be read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Offset and position of a block-start delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStart {
    /// Byte offset of the delimiter in the file document.
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug)]
struct SourceDocument {
    path: String,
    content: String,
    pos: usize,
    line: u32,
    column: u32,
    at_line_start: bool,
}

impl SourceDocument {
    fn new(path: String, content: String) -> SourceDocument {
        SourceDocument {
            path,
            content,
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
        }
    }

    fn rest(&self) -> &str {
        &self.content[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
            self.at_line_start = false;
        }
        Some(c)
    }

    fn exhausted(&self) -> bool {
        self.pos >= self.content.len()
    }
}

#[derive(Debug)]
pub struct InputStream {
    stack: Vec<SourceDocument>,
    block_start: String,
    block_end: String,
    continuation: Option<char>,
    in_block: bool,
}

impl InputStream {
    pub fn new(
        path: String,
        content: String,
        block_start: String,
        block_end: String,
        continuation: Option<char>,
    ) -> InputStream {
        InputStream {
            stack: vec![SourceDocument::new(path, content)],
            block_start,
            block_end,
            continuation,
            in_block: false,
        }
    }

    fn top(&self) -> &SourceDocument {
        self.stack.last().unwrap()
    }

    fn top_mut(&mut self) -> &mut SourceDocument {
        self.stack.last_mut().unwrap()
    }

    /// Pops exhausted injected documents and skips the continuation prefix
    /// at a line start inside a block.
    fn prepare(&mut self) {
        while self.stack.len() > 1 && self.top().exhausted() {
            self.stack.pop();
        }
        if !self.in_block || !self.top().at_line_start {
            return;
        }
        self.top_mut().at_line_start = false;
        // Skip the prefix only if the whitespace actually leads to the
        // continuation character; otherwise indentation (inside a code
        // block, say) is content.
        let continuation = match self.continuation {
            Some(c) => c,
            None => return,
        };
        let rest = self.top().rest();
        let after_ws = rest.trim_start_matches([' ', '\t']);
        if !after_ws.starts_with(continuation) || after_ws.starts_with(&self.block_end) {
            return;
        }
        let to_skip = rest.len() - after_ws.len();
        let top = self.top_mut();
        for _ in 0..to_skip {
            top.pos += 1;
            top.column += 1;
        }
        top.advance();
        // One space after the continuation character is part of the prefix.
        if top.peek() == Some(' ') {
            top.advance();
        }
    }

    /// Peek at the next character without consuming it.
    pub fn peek(&mut self) -> Option<char> {
        self.prepare();
        self.top().peek()
    }

    /// Read one character, updating line and column.
    pub fn read(&mut self) -> Option<char> {
        self.prepare();
        self.top_mut().advance()
    }

    /// Consume the next character if it equals `c`.
    pub fn read_if(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.read();
            true
        } else {
            false
        }
    }

    /// Discard the next `n` characters.
    pub fn discard(&mut self, n: usize) {
        for _ in 0..n {
            if self.read().is_none() {
                break;
            }
        }
    }

    /// Whether the upcoming input starts with `s` (no prefix skipping beyond
    /// the usual line-start normalization).
    pub fn matches(&mut self, s: &str) -> bool {
        self.prepare();
        self.top().rest().starts_with(s)
    }

    /// The rest of the current line, excluding the newline.
    pub fn peek_line(&mut self) -> &str {
        self.prepare();
        let rest = self.top().rest();
        match rest.find('\n') {
            Some(i) => &rest[..i],
            None => rest,
        }
    }

    pub fn at_end(&mut self) -> bool {
        self.prepare();
        self.stack.len() == 1 && self.top().exhausted()
    }

    pub fn location(&self) -> Location {
        let top = self.top();
        Location {
            file: top.path.clone(),
            line: top.line,
            column: top.column,
        }
    }

    /// Path of the document currently being read, for resolving `\input`.
    pub fn current_path(&self) -> &str {
        &self.top().path
    }

    /// Inject a document; reading resumes from it immediately.
    pub fn push_document(&mut self, path: String, content: String) {
        self.stack.push(SourceDocument::new(path, content));
    }

    /// Number of documents on the stack.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Content of the file document between two byte offsets.
    pub fn file_slice(&self, start: usize, end: usize) -> &str {
        let content = &self.stack[0].content;
        let start = start.min(content.len());
        let end = end.max(start).min(content.len());
        &content[start..end]
    }

    /// Byte offset of the read cursor in the file document.
    pub fn file_offset(&self) -> usize {
        self.stack[0].pos
    }

    // ----- block mode -----

    /// Seek to the next block-start delimiter.
    ///
    /// Lines that do not begin with the delimiter (after leading whitespace)
    /// are skipped entirely. On success the cursor sits just past the
    /// delimiter and the stream is in block mode.
    pub fn seek_block(&mut self) -> Option<BlockStart> {
        self.in_block = false;
        loop {
            // Skip leading whitespace on this line.
            while matches!(self.top().peek(), Some(' ') | Some('\t')) {
                self.top_mut().advance();
            }
            if self.top().rest().starts_with(&self.block_start) {
                let top = self.top();
                let start = BlockStart {
                    offset: top.pos,
                    line: top.line,
                    column: top.column,
                };
                for _ in 0..self.block_start.chars().count() {
                    self.top_mut().advance();
                }
                self.in_block = true;
                return Some(start);
            }
            // Skip the remainder of the line.
            loop {
                match self.top_mut().advance() {
                    None => return None,
                    Some('\n') => break,
                    Some(_) => {}
                }
            }
        }
    }

    /// Whether the cursor sits at the block-end delimiter, allowing
    /// whitespace before it.
    pub fn at_block_end(&mut self) -> bool {
        if !self.in_block {
            return false;
        }
        self.prepare();
        let rest = self.top().rest();
        rest.trim_start_matches([' ', '\t'])
            .starts_with(&self.block_end)
    }

    /// Consume the block-end delimiter; the caller has checked
    /// [at_block_end](InputStream::at_block_end).
    pub fn consume_block_end(&mut self) {
        while matches!(self.top().peek(), Some(' ') | Some('\t')) {
            self.top_mut().advance();
        }
        for _ in 0..self.block_end.chars().count() {
            self.top_mut().advance();
        }
        self.in_block = false;
    }

    /// Whether the stream is currently inside a block.
    pub fn in_block(&self) -> bool {
        self.in_block
    }

    /// Read raw text up to (and through) `delimiter`, returning the text.
    ///
    /// Returns `None` if the block or the input ends first; the cursor is
    /// left wherever the scan stopped.
    pub fn take_until(&mut self, delimiter: &str) -> Option<String> {
        let mut text = String::new();
        loop {
            if self.matches(delimiter) {
                self.discard(delimiter.chars().count());
                return Some(text);
            }
            if self.in_block && self.at_block_end() {
                return None;
            }
            match self.read() {
                Some(c) => text.push(c),
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_stream(content: &str) -> InputStream {
        InputStream::new(
            "test.h".into(),
            content.into(),
            "/*!".into(),
            "*/".into(),
            Some('*'),
        )
    }

    fn read_all(stream: &mut InputStream) -> String {
        let mut out = String::new();
        while !stream.at_block_end() {
            match stream.read() {
                Some(c) => out.push(c),
                None => break,
            }
        }
        out
    }

    #[test]
    fn seek_finds_block_at_line_start() {
        let mut stream = block_stream("int x;\n/*! \\brief b\n*/\n");
        let start = stream.seek_block().unwrap();
        assert_eq!(start.line, 2);
        assert_eq!(start.column, 1);
        assert_eq!(start.offset, 7);
        assert_eq!(read_all(&mut stream), " \\brief b\n");
    }

    #[test]
    fn seek_skips_non_block_lines() {
        let mut stream = block_stream("// /*! not a block start\nint y;\n   /*! ok */\n");
        let start = stream.seek_block().unwrap();
        assert_eq!(start.line, 3);
        assert_eq!(read_all(&mut stream), " ok");
        assert!(stream.at_block_end());
        stream.consume_block_end();
        assert!(stream.seek_block().is_none());
    }

    #[test]
    fn continuation_prefix_is_skipped() {
        let mut stream = block_stream("/*!\n * first\n * second\n */\n");
        stream.seek_block().unwrap();
        assert_eq!(read_all(&mut stream), "\nfirst\nsecond\n");
    }

    #[test]
    fn indentation_without_continuation_is_kept() {
        let mut stream = block_stream("/*!\n    code line\n*/\n");
        stream.seek_block().unwrap();
        assert_eq!(read_all(&mut stream), "\n    code line\n");
    }

    #[test]
    fn two_blocks() {
        let mut stream = block_stream("/*! a */\nint x;\n/*! b */\n");
        stream.seek_block().unwrap();
        assert_eq!(read_all(&mut stream), " a");
        stream.consume_block_end();
        let second = stream.seek_block().unwrap();
        assert_eq!(second.line, 3);
        assert_eq!(read_all(&mut stream), " b");
    }

    #[test]
    fn file_slice_spans_blocks() {
        let content = "/*! a */\nenum E { X };\n/*! b */\n";
        let mut stream = block_stream(content);
        let first = stream.seek_block().unwrap();
        read_all(&mut stream);
        stream.consume_block_end();
        let second = stream.seek_block().unwrap();
        let gap = stream.file_slice(first.offset, second.offset).to_string();
        assert!(gap.contains("enum E { X };"));
    }

    #[test]
    fn injected_document_pops_when_exhausted() {
        let mut stream = InputStream::new(
            "manual.txt".into(),
            "ab".into(),
            "/*!".into(),
            "*/".into(),
            None,
        );
        assert_eq!(stream.read(), Some('a'));
        stream.push_document("inner.txt".into(), "XY".into());
        assert_eq!(stream.location().file, "inner.txt");
        assert_eq!(stream.read(), Some('X'));
        assert_eq!(stream.read(), Some('Y'));
        assert_eq!(stream.read(), Some('b'));
        assert!(stream.at_end());
    }

    #[test]
    fn take_until_strips_prefixes() {
        let mut stream = block_stream("/*!\n * \\code\n * int x;\n * \\endcode\n */\n");
        stream.seek_block().unwrap();
        // Skip up to the start of the code command for the test.
        let mut prefix = String::new();
        while !stream.matches("\\code") {
            prefix.push(stream.read().unwrap());
        }
        stream.discard("\\code".chars().count());
        let text = stream.take_until("\\endcode").unwrap();
        assert_eq!(text, "\nint x;\n");
    }

    #[test]
    fn take_until_fails_at_block_end() {
        let mut stream = block_stream("/*! \\code int x; */\n");
        stream.seek_block().unwrap();
        stream.discard(" \\code".chars().count());
        assert_eq!(stream.take_until("\\endcode"), None);
    }

    #[test]
    fn conditional_reads_and_line_peeking() {
        let mut stream = block_stream("ab cd\nef\n");
        assert_eq!(stream.peek_line(), "ab cd");
        assert!(stream.read_if('a'));
        assert!(!stream.read_if('x'));
        assert_eq!(stream.peek(), Some('b'));
        stream.discard(2);
        assert_eq!(stream.peek_line(), "cd");
        assert!(stream.matches("cd"));
    }

    #[test]
    fn location_tracks_lines_and_columns() {
        let mut stream = block_stream("ab\ncd\n");
        stream.read();
        stream.read();
        stream.read();
        let location = stream.location();
        assert_eq!((location.line, location.column), (2, 1));
        stream.read();
        assert_eq!(stream.location().column, 2);
    }
}
