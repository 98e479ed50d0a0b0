//! The prose builder: turns dispatched characters and commands into the
//! document tree.
//!
//! One instance builds one document scope: an entity description, a
//! standalone manual, or (recursively, via the frame stack) the content of
//! a list item. Plain character input starts a paragraph on demand;
//! standalone nodes (images, code blocks, sections, display math) close
//! any open paragraph first; `finish` closes whatever is still open.

use crate::error::{ParseError, Result};
use crate::gatherer::{FunctionCall, Value};
use crate::model::{
    DocumentNode, List, ListItem, MathBlock, MathNode, Paragraph, SectionLevel, Span, SpanKind,
};
use crate::vocabulary::names;

/// The externally observable state of a prose builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProseState {
    Idle,
    WritingParagraph,
    WritingList,
    WritingListItem,
    WritingMath,
}

#[derive(Debug)]
enum Frame {
    Root(Vec<DocumentNode>),
    List(Vec<ListItem>),
    Item(Vec<DocumentNode>),
}

#[derive(Debug)]
struct OpenSpan {
    kind: SpanKind,
    start: usize,
}

#[derive(Debug)]
struct WordSpan {
    kind: SpanKind,
    start: Option<usize>,
}

#[derive(Debug, Default)]
struct MathBuilder {
    source: String,
    stack: Vec<Vec<MathNode>>,
}

impl MathBuilder {
    fn new() -> MathBuilder {
        MathBuilder {
            source: String::new(),
            stack: vec![Vec::new()],
        }
    }

    fn atom(&mut self, c: char) {
        self.source.push(c);
        if c != ' ' {
            self.stack.last_mut().unwrap().push(MathNode::Atom(c));
        }
    }

    fn superscript(&mut self) {
        self.source.push('^');
        self.stack.last_mut().unwrap().push(MathNode::Superscript);
    }

    fn subscript(&mut self) {
        self.source.push('_');
        self.stack.last_mut().unwrap().push(MathNode::Subscript);
    }

    fn alignment(&mut self) {
        self.source.push('&');
        self.stack.last_mut().unwrap().push(MathNode::Alignment);
    }

    fn group_begin(&mut self) {
        self.source.push('{');
        self.stack.push(Vec::new());
    }

    fn group_end(&mut self) -> bool {
        if self.stack.len() < 2 {
            return false;
        }
        self.source.push('}');
        let group = self.stack.pop().unwrap();
        self.stack.last_mut().unwrap().push(MathNode::Group(group));
        true
    }

    fn finish(mut self) -> std::result::Result<MathBlock, ()> {
        if self.stack.len() != 1 {
            return Err(());
        }
        Ok(MathBlock {
            source: self.source.trim().to_string(),
            nodes: self.stack.pop().unwrap(),
        })
    }
}

/// The prose builder. See the module documentation.
#[derive(Debug)]
pub struct ProseBuilder {
    frames: Vec<Frame>,
    paragraph: Option<Paragraph>,
    open_spans: Vec<OpenSpan>,
    word_span: Option<WordSpan>,
    inline_math_start: Option<usize>,
    math: Option<MathBuilder>,
}

impl Default for ProseBuilder {
    fn default() -> ProseBuilder {
        ProseBuilder {
            frames: vec![Frame::Root(Vec::new())],
            paragraph: None,
            open_spans: Vec::new(),
            word_span: None,
            inline_math_start: None,
            math: None,
        }
    }
}

impl ProseBuilder {
    pub fn state(&self) -> ProseState {
        if self.math.is_some() {
            return ProseState::WritingMath;
        }
        if self.paragraph.is_some() {
            return ProseState::WritingParagraph;
        }
        match self.frames.last().unwrap() {
            Frame::Root(_) => ProseState::Idle,
            Frame::List(_) => ProseState::WritingList,
            Frame::Item(_) => ProseState::WritingListItem,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == ProseState::Idle
    }

    /// Whether anything has been built or is in progress.
    pub fn is_empty(&self) -> bool {
        self.paragraph.is_none()
            && self.math.is_none()
            && self.frames.len() == 1
            && matches!(self.frames.first(), Some(Frame::Root(nodes)) if nodes.is_empty())
    }

    // ----- character input -----

    pub fn write_char(&mut self, c: char) -> Result<()> {
        if let Some(math) = &mut self.math {
            math.atom(c);
            return Ok(());
        }
        if c == ' ' {
            if self.paragraph.is_none() {
                // Leading whitespace outside a paragraph is discarded.
                return Ok(());
            }
            self.close_word_span();
            self.paragraph.as_mut().unwrap().text.push(' ');
            return Ok(());
        }
        self.ensure_paragraph()?;
        let len = self.paragraph.as_ref().unwrap().text.len();
        if let Some(word_span) = &mut self.word_span {
            if word_span.start.is_none() {
                word_span.start = Some(len);
            }
        }
        self.paragraph.as_mut().unwrap().text.push(c);
        Ok(())
    }

    pub fn superscript(&mut self) -> Result<()> {
        match &mut self.math {
            Some(math) => {
                math.superscript();
                Ok(())
            }
            None => self.write_char('^'),
        }
    }

    pub fn subscript(&mut self) -> Result<()> {
        match &mut self.math {
            Some(math) => {
                math.subscript();
                Ok(())
            }
            None => self.write_char('_'),
        }
    }

    pub fn alignment_tab(&mut self) -> Result<()> {
        match &mut self.math {
            Some(math) => {
                math.alignment();
                Ok(())
            }
            None => self.write_char('&'),
        }
    }

    /// A math shift character: toggles an inline math span, or feeds the
    /// open display math.
    pub fn math_shift(&mut self) -> Result<()> {
        if let Some(math) = &mut self.math {
            math.atom('$');
            return Ok(());
        }
        match self.inline_math_start.take() {
            None => {
                self.ensure_paragraph()?;
                self.inline_math_start =
                    Some(self.paragraph.as_ref().unwrap().text.len());
            }
            Some(start) => {
                let end = self.paragraph.as_ref().unwrap().text.len();
                self.paragraph.as_mut().unwrap().spans.push(Span {
                    start,
                    end,
                    kind: SpanKind::Math,
                });
            }
        }
        Ok(())
    }

    pub fn group_begin(&mut self) {
        if let Some(math) = &mut self.math {
            math.group_begin();
        }
    }

    pub fn group_end(&mut self) -> Result<()> {
        if let Some(math) = &mut self.math {
            if !math.group_end() {
                return Err(ParseError::bad_call("]", "unbalanced group in math"));
            }
        }
        Ok(())
    }

    // ----- commands -----

    /// Handles a prose-level command. Returns false if the command is not
    /// a prose command, so the caller can try its own table.
    pub fn handle_call(&mut self, call: &FunctionCall) -> Result<bool> {
        match call.name.as_str() {
            names::PAR => self.end_paragraph()?,
            names::BOLD_WORD => self.style_next_word(SpanKind::Bold),
            names::ITALIC_WORD => self.style_next_word(SpanKind::Italic),
            names::CODE_WORD => self.style_next_word(SpanKind::Code),
            names::BOLD => self.begin_span(SpanKind::Bold)?,
            names::END_BOLD => {
                self.end_span("endbold", |k| matches!(k, SpanKind::Bold))?
            }
            names::EMPH => self.begin_span(SpanKind::Italic)?,
            names::END_EMPH => {
                self.end_span("endemph", |k| matches!(k, SpanKind::Italic))?
            }
            names::TT => self.begin_span(SpanKind::Code)?,
            names::END_TT => self.end_span("endtt", |k| matches!(k, SpanKind::Code))?,
            names::HREF => {
                let url = call
                    .option("")
                    .map(value_to_string)
                    .ok_or_else(|| ParseError::bad_call("href", "missing [url] option"))?;
                let text = required_arg(call, 0, "href")?.to_string();
                self.append_link(&url, &text)?;
            }
            names::IMAGE => {
                let path = required_arg(call, 0, "image")?.to_string();
                let caption = call.option("caption").map(value_to_string);
                self.add_node_closing_paragraph(DocumentNode::Image { path, caption })?;
            }
            names::LIST => self.list_begin()?,
            names::LIST_ITEM => self.list_item()?,
            names::END_LIST => self.list_end()?,
            names::INDEX => {
                let term = required_arg(call, 0, "index")?.to_string();
                self.add_index_entry(term)?;
            }
            names::SINCE_BEGIN => {
                let version = call
                    .option("")
                    .map(value_to_string)
                    .ok_or_else(|| {
                        ParseError::bad_call("beginsince", "missing [version] option")
                    })?;
                self.since_begin(version)?;
            }
            names::SINCE_END => self.since_end()?,
            names::DISPLAY_MATH => self.display_math_begin()?,
            names::END_DISPLAY_MATH => self.display_math_end()?,
            names::SECTION => {
                let title = required_arg(call, 0, "section")?.to_string();
                self.add_node_closing_paragraph(DocumentNode::Sectioning {
                    level: SectionLevel::Section,
                    title,
                })?;
            }
            names::GROUP_TABLE => {
                let group = required_arg(call, 0, "grouptable")?.to_string();
                self.add_node_closing_paragraph(DocumentNode::GroupTable { group })?;
            }
            names::END_CODE => {
                return Err(ParseError::bad_call("endcode", "no open \\code block"))
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn style_next_word(&mut self, kind: SpanKind) {
        self.word_span = Some(WordSpan { kind, start: None });
    }

    fn begin_span(&mut self, kind: SpanKind) -> Result<()> {
        self.ensure_paragraph()?;
        let start = self.paragraph.as_ref().unwrap().text.len();
        self.open_spans.push(OpenSpan { kind, start });
        Ok(())
    }

    fn end_span(&mut self, command: &str, expected: fn(&SpanKind) -> bool) -> Result<()> {
        let open = match self.open_spans.pop() {
            Some(open) if expected(&open.kind) => open,
            _ => {
                return Err(ParseError::bad_call(
                    command,
                    "does not match the open span",
                ))
            }
        };
        let end = match &self.paragraph {
            Some(paragraph) => paragraph.text.len(),
            None => {
                return Err(ParseError::bad_call(command, "no open paragraph"));
            }
        };
        self.paragraph.as_mut().unwrap().spans.push(Span {
            start: open.start,
            end,
            kind: open.kind,
        });
        Ok(())
    }

    fn append_link(&mut self, url: &str, text: &str) -> Result<()> {
        self.ensure_paragraph()?;
        let paragraph = self.paragraph.as_mut().unwrap();
        let start = paragraph.text.len();
        paragraph.text.push_str(text);
        let end = paragraph.text.len();
        paragraph.spans.push(Span {
            start,
            end,
            kind: SpanKind::Link {
                url: url.to_string(),
            },
        });
        Ok(())
    }

    fn add_index_entry(&mut self, term: String) -> Result<()> {
        self.ensure_paragraph()?;
        let paragraph = self.paragraph.as_mut().unwrap();
        let position = paragraph.text.len();
        paragraph.spans.push(Span {
            start: position,
            end: position,
            kind: SpanKind::IndexEntry { term },
        });
        Ok(())
    }

    fn since_begin(&mut self, version: String) -> Result<()> {
        if self.paragraph.is_some() {
            let start = self.paragraph.as_ref().unwrap().text.len();
            self.open_spans.push(OpenSpan {
                kind: SpanKind::Since { version },
                start,
            });
        } else {
            self.add_node(DocumentNode::SinceBegin { version })?;
        }
        Ok(())
    }

    fn since_end(&mut self) -> Result<()> {
        let span_open = matches!(
            self.open_spans.last(),
            Some(OpenSpan {
                kind: SpanKind::Since { .. },
                ..
            })
        );
        if span_open {
            self.end_span("endsince", |k| matches!(k, SpanKind::Since { .. }))
        } else {
            self.end_paragraph()?;
            self.add_node(DocumentNode::SinceEnd)
        }
    }

    fn display_math_begin(&mut self) -> Result<()> {
        if self.math.is_some() {
            return Err(ParseError::bad_call("[", "display math is already open"));
        }
        self.end_paragraph()?;
        self.math = Some(MathBuilder::new());
        Ok(())
    }

    fn display_math_end(&mut self) -> Result<()> {
        let math = match self.math.take() {
            Some(math) => math,
            None => return Err(ParseError::bad_call("]", "no open display math")),
        };
        let block = math
            .finish()
            .map_err(|_| ParseError::bad_call("]", "unbalanced group in display math"))?;
        self.add_node(DocumentNode::DisplayMath(block))
    }

    /// Appends a standalone node, closing any open paragraph first.
    pub fn add_node_closing_paragraph(&mut self, node: DocumentNode) -> Result<()> {
        self.end_paragraph()?;
        self.add_node(node)
    }

    pub fn add_code_block(&mut self, text: String) -> Result<()> {
        self.add_node_closing_paragraph(DocumentNode::CodeBlock { text })
    }

    pub fn add_section(&mut self, level: SectionLevel, title: String) -> Result<()> {
        self.add_node_closing_paragraph(DocumentNode::Sectioning { level, title })
    }

    pub fn add_marker(&mut self, node: DocumentNode) -> Result<()> {
        self.add_node_closing_paragraph(node)
    }

    // ----- lists -----

    fn list_begin(&mut self) -> Result<()> {
        self.end_paragraph()?;
        self.frames.push(Frame::List(Vec::new()));
        Ok(())
    }

    fn list_item(&mut self) -> Result<()> {
        if matches!(self.frames.last(), Some(Frame::Item(_))) {
            self.close_item()?;
        }
        match self.frames.last() {
            Some(Frame::List(_)) => {
                self.frames.push(Frame::Item(Vec::new()));
                Ok(())
            }
            _ => Err(ParseError::bad_call("li", "\\li outside a list")),
        }
    }

    fn list_end(&mut self) -> Result<()> {
        if matches!(self.frames.last(), Some(Frame::Item(_))) {
            self.close_item()?;
        }
        match self.frames.pop() {
            Some(Frame::List(items)) => self.add_node(DocumentNode::List(List { items })),
            Some(other) => {
                self.frames.push(other);
                Err(ParseError::bad_call("endlist", "no open list"))
            }
            None => Err(ParseError::bad_call("endlist", "no open list")),
        }
    }

    fn close_item(&mut self) -> Result<()> {
        self.end_paragraph()?;
        match self.frames.pop() {
            Some(Frame::Item(nodes)) => match self.frames.last_mut() {
                Some(Frame::List(items)) => {
                    items.push(ListItem { nodes });
                    Ok(())
                }
                _ => unreachable!("an item frame always sits on a list frame"),
            },
            _ => unreachable!("close_item requires an item frame"),
        }
    }

    // ----- paragraphs -----

    fn ensure_paragraph(&mut self) -> Result<()> {
        if self.paragraph.is_some() {
            return Ok(());
        }
        if matches!(self.frames.last(), Some(Frame::List(_))) {
            return Err(ParseError::bad_call(
                "list",
                "content is only allowed inside a list item",
            ));
        }
        self.paragraph = Some(Paragraph::default());
        Ok(())
    }

    fn close_word_span(&mut self) {
        let word_span = match self.word_span.take() {
            Some(word_span) => word_span,
            None => return,
        };
        let (start, paragraph) = match (word_span.start, &mut self.paragraph) {
            (Some(start), Some(paragraph)) => (start, paragraph),
            _ => return,
        };
        let end = paragraph.text.len();
        paragraph.spans.push(Span {
            start,
            end,
            kind: word_span.kind,
        });
    }

    pub fn end_paragraph(&mut self) -> Result<()> {
        self.close_word_span();
        if self.inline_math_start.is_some() {
            return Err(ParseError::bad_call("par", "inline math is still open"));
        }
        if !self.open_spans.is_empty() {
            return Err(ParseError::bad_call("par", "an inline span is still open"));
        }
        let mut paragraph = match self.paragraph.take() {
            Some(paragraph) => paragraph,
            None => return Ok(()),
        };
        let trimmed = paragraph.text.trim_end().len();
        paragraph.text.truncate(trimmed);
        for span in &mut paragraph.spans {
            span.end = span.end.min(trimmed);
            span.start = span.start.min(trimmed);
        }
        if paragraph.text.is_empty() && paragraph.spans.is_empty() {
            return Ok(());
        }
        paragraph.spans.sort_by_key(|s| s.start);
        self.add_node(DocumentNode::Paragraph(paragraph))
    }

    fn add_node(&mut self, node: DocumentNode) -> Result<()> {
        match self.frames.last_mut() {
            Some(Frame::Root(nodes)) | Some(Frame::Item(nodes)) => {
                nodes.push(node);
                Ok(())
            }
            Some(Frame::List(_)) | None => Err(ParseError::bad_call(
                "list",
                "content is only allowed inside a list item",
            )),
        }
    }

    // ----- completion -----

    /// Closes everything still open and returns the built nodes.
    pub fn finish(&mut self) -> Result<Vec<DocumentNode>> {
        if self.math.is_some() {
            return Err(ParseError::bad_call("[", "display math is still open"));
        }
        self.end_paragraph()?;
        while self.frames.len() > 1 {
            match self.frames.last() {
                Some(Frame::Item(_)) => self.close_item()?,
                Some(Frame::List(_)) => self.list_end()?,
                _ => unreachable!("the root frame is always at the bottom"),
            }
        }
        let nodes = match self.frames.pop() {
            Some(Frame::Root(nodes)) => nodes,
            _ => unreachable!("the root frame is always at the bottom"),
        };
        self.frames.push(Frame::Root(Vec::new()));
        Ok(nodes)
    }

    /// Like [finish](ProseBuilder::finish), but drops whatever cannot be
    /// closed cleanly. Used when unwinding after an error.
    pub fn force_finish(&mut self) -> Vec<DocumentNode> {
        self.math = None;
        self.open_spans.clear();
        self.word_span = None;
        self.inline_math_start = None;
        self.finish().expect("forced finish cannot fail")
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Str(s) => s.clone(),
    }
}

fn required_arg<'a>(call: &'a FunctionCall, index: usize, command: &str) -> Result<&'a str> {
    call.string_arg(index)
        .ok_or_else(|| ParseError::bad_call(command, "missing argument"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(builder: &mut ProseBuilder, text: &str) {
        for c in text.chars() {
            builder.write_char(c).unwrap();
        }
    }

    fn call(name: &str) -> FunctionCall {
        FunctionCall {
            name: name.to_string(),
            arguments: Vec::new(),
            options: Vec::new(),
        }
    }

    fn call_with_arg(name: &str, arg: &str) -> FunctionCall {
        FunctionCall {
            name: name.to_string(),
            arguments: vec![Value::Str(arg.to_string())],
            options: Vec::new(),
        }
    }

    #[test]
    fn characters_form_a_paragraph() {
        let mut builder = ProseBuilder::default();
        assert!(builder.is_idle());
        write(&mut builder, "hello world ");
        assert_eq!(builder.state(), ProseState::WritingParagraph);
        let nodes = builder.finish().unwrap();
        assert_eq!(nodes.len(), 1);
        match &nodes[0] {
            DocumentNode::Paragraph(p) => {
                assert_eq!(p.text, "hello world");
                assert!(p.spans.is_empty());
            }
            other => panic!("expected a paragraph, got {other:?}"),
        }
    }

    #[test]
    fn leading_whitespace_is_discarded() {
        let mut builder = ProseBuilder::default();
        write(&mut builder, "   ");
        assert!(builder.is_idle());
        assert!(builder.finish().unwrap().is_empty());
    }

    #[test]
    fn paragraph_break_splits_paragraphs() {
        let mut builder = ProseBuilder::default();
        write(&mut builder, "one");
        builder.handle_call(&call(names::PAR)).unwrap();
        write(&mut builder, "two");
        let nodes = builder.finish().unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn styled_word_spans_one_word() {
        let mut builder = ProseBuilder::default();
        write(&mut builder, "the ");
        builder.handle_call(&call(names::CODE_WORD)).unwrap();
        write(&mut builder, "size method");
        let nodes = builder.finish().unwrap();
        match &nodes[0] {
            DocumentNode::Paragraph(p) => {
                assert_eq!(p.text, "the size method");
                assert_eq!(p.spans.len(), 1);
                let span = &p.spans[0];
                assert_eq!(&p.text[span.start..span.end], "size");
                assert_eq!(span.kind, SpanKind::Code);
            }
            other => panic!("expected a paragraph, got {other:?}"),
        }
    }

    #[test]
    fn bold_span_wraps_a_range() {
        let mut builder = ProseBuilder::default();
        write(&mut builder, "a ");
        builder.handle_call(&call(names::BOLD)).unwrap();
        write(&mut builder, "bold run");
        builder.handle_call(&call(names::END_BOLD)).unwrap();
        write(&mut builder, " b");
        let nodes = builder.finish().unwrap();
        match &nodes[0] {
            DocumentNode::Paragraph(p) => {
                let span = &p.spans[0];
                assert_eq!(&p.text[span.start..span.end], "bold run");
                assert_eq!(span.kind, SpanKind::Bold);
            }
            other => panic!("expected a paragraph, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_span_end_is_an_error() {
        let mut builder = ProseBuilder::default();
        builder.handle_call(&call(names::BOLD)).unwrap();
        write(&mut builder, "x");
        assert!(builder.handle_call(&call(names::END_EMPH)).is_err());
    }

    #[test]
    fn unclosed_span_fails_the_paragraph() {
        let mut builder = ProseBuilder::default();
        builder.handle_call(&call(names::BOLD)).unwrap();
        write(&mut builder, "x");
        assert!(builder.handle_call(&call(names::PAR)).is_err());
    }

    #[test]
    fn nested_list() {
        let mut builder = ProseBuilder::default();
        builder.handle_call(&call(names::LIST)).unwrap();
        builder.handle_call(&call(names::LIST_ITEM)).unwrap();
        write(&mut builder, "first item ");
        builder.handle_call(&call(names::LIST_ITEM)).unwrap();
        write(&mut builder, "second item: ");
        builder.handle_call(&call(names::LIST)).unwrap();
        builder.handle_call(&call(names::LIST_ITEM)).unwrap();
        write(&mut builder, "nested item ");
        builder.handle_call(&call(names::END_LIST)).unwrap();
        builder.handle_call(&call(names::END_LIST)).unwrap();
        let nodes = builder.finish().unwrap();
        assert_eq!(nodes.len(), 1);
        let list = match &nodes[0] {
            DocumentNode::List(list) => list,
            other => panic!("expected a list, got {other:?}"),
        };
        assert_eq!(list.items.len(), 2);
        let second = &list.items[1];
        assert_eq!(second.nodes.len(), 2);
        let nested = match &second.nodes[1] {
            DocumentNode::List(nested) => nested,
            other => panic!("expected a nested list, got {other:?}"),
        };
        assert_eq!(nested.items.len(), 1);
        match &nested.items[0].nodes[0] {
            DocumentNode::Paragraph(p) => assert_eq!(p.text, "nested item"),
            other => panic!("expected a paragraph, got {other:?}"),
        }
    }

    #[test]
    fn li_outside_a_list_is_an_error() {
        let mut builder = ProseBuilder::default();
        assert!(builder.handle_call(&call(names::LIST_ITEM)).is_err());
    }

    #[test]
    fn content_between_list_and_item_is_an_error() {
        let mut builder = ProseBuilder::default();
        builder.handle_call(&call(names::LIST)).unwrap();
        assert!(builder.write_char('x').is_err());
    }

    #[test]
    fn finish_closes_an_open_list() {
        let mut builder = ProseBuilder::default();
        builder.handle_call(&call(names::LIST)).unwrap();
        builder.handle_call(&call(names::LIST_ITEM)).unwrap();
        write(&mut builder, "dangling");
        let nodes = builder.finish().unwrap();
        assert!(matches!(nodes[0], DocumentNode::List(_)));
    }

    #[test]
    fn display_math_builds_source_and_structure() {
        let mut builder = ProseBuilder::default();
        builder.handle_call(&call(names::DISPLAY_MATH)).unwrap();
        builder.write_char('x').unwrap();
        builder.superscript().unwrap();
        builder.group_begin();
        builder.write_char('2').unwrap();
        builder.write_char('n').unwrap();
        builder.group_end().unwrap();
        builder.handle_call(&call(names::END_DISPLAY_MATH)).unwrap();
        let nodes = builder.finish().unwrap();
        match &nodes[0] {
            DocumentNode::DisplayMath(block) => {
                assert_eq!(block.source, "x^{2n}");
                assert_eq!(block.nodes.len(), 3);
                assert!(matches!(block.nodes[2], MathNode::Group(ref g) if g.len() == 2));
            }
            other => panic!("expected display math, got {other:?}"),
        }
    }

    #[test]
    fn inline_math_records_a_span() {
        let mut builder = ProseBuilder::default();
        write(&mut builder, "area is ");
        builder.math_shift().unwrap();
        write(&mut builder, "pi r");
        builder.superscript().unwrap();
        write(&mut builder, "2");
        builder.math_shift().unwrap();
        let nodes = builder.finish().unwrap();
        match &nodes[0] {
            DocumentNode::Paragraph(p) => {
                let span = &p.spans[0];
                assert_eq!(&p.text[span.start..span.end], "pi r^2");
                assert_eq!(span.kind, SpanKind::Math);
            }
            other => panic!("expected a paragraph, got {other:?}"),
        }
    }

    #[test]
    fn index_entry_is_a_zero_length_marker() {
        let mut builder = ProseBuilder::default();
        write(&mut builder, "environment variables ");
        builder
            .handle_call(&call_with_arg(names::INDEX, "getenv"))
            .unwrap();
        let nodes = builder.finish().unwrap();
        match &nodes[0] {
            DocumentNode::Paragraph(p) => {
                let span = &p.spans[0];
                assert_eq!(span.start, span.end);
                assert_eq!(
                    span.kind,
                    SpanKind::IndexEntry {
                        term: "getenv".to_string()
                    }
                );
            }
            other => panic!("expected a paragraph, got {other:?}"),
        }
    }

    #[test]
    fn since_markers_outside_a_paragraph() {
        let mut builder = ProseBuilder::default();
        let mut begin = call(names::SINCE_BEGIN);
        begin
            .options
            .push((String::new(), Value::Str("2.0".to_string())));
        builder.handle_call(&begin).unwrap();
        write(&mut builder, "new stuff");
        builder.handle_call(&call(names::SINCE_END)).unwrap();
        let nodes = builder.finish().unwrap();
        assert!(matches!(
            nodes[0],
            DocumentNode::SinceBegin { ref version } if version == "2.0"
        ));
        assert!(matches!(nodes[1], DocumentNode::Paragraph(_)));
        assert!(matches!(nodes[2], DocumentNode::SinceEnd));
    }

    #[test]
    fn since_span_inside_a_paragraph() {
        let mut builder = ProseBuilder::default();
        write(&mut builder, "stable ");
        let mut begin = call(names::SINCE_BEGIN);
        begin
            .options
            .push((String::new(), Value::Str("2.0".to_string())));
        builder.handle_call(&begin).unwrap();
        write(&mut builder, "recent");
        builder.handle_call(&call(names::SINCE_END)).unwrap();
        let nodes = builder.finish().unwrap();
        match &nodes[0] {
            DocumentNode::Paragraph(p) => {
                let span = &p.spans[0];
                assert_eq!(&p.text[span.start..span.end], "recent");
                assert!(matches!(span.kind, SpanKind::Since { ref version } if version == "2.0"));
            }
            other => panic!("expected a paragraph, got {other:?}"),
        }
    }

    #[test]
    fn link_spans_the_appended_text() {
        let mut builder = ProseBuilder::default();
        let mut href = call_with_arg(names::HREF, "docs");
        href.options.push((
            String::new(),
            Value::Str("https://example.com".to_string()),
        ));
        builder.handle_call(&href).unwrap();
        let nodes = builder.finish().unwrap();
        match &nodes[0] {
            DocumentNode::Paragraph(p) => {
                assert_eq!(p.text, "docs");
                assert!(matches!(
                    p.spans[0].kind,
                    SpanKind::Link { ref url } if url == "https://example.com"
                ));
            }
            other => panic!("expected a paragraph, got {other:?}"),
        }
    }

    #[test]
    fn non_prose_commands_are_not_handled() {
        let mut builder = ProseBuilder::default();
        assert_eq!(builder.handle_call(&call(names::CLASS)).unwrap(), false);
    }
}
