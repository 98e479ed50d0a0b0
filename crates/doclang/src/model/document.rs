//! The prose side of the documentation model: documents, paragraphs, lists
//! and the other block-level nodes.

/// A document: the description of an entity, or a standalone manual/page.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    /// Title of a standalone manual; entity descriptions have none.
    pub title: Option<String>,
    pub nodes: Vec<DocumentNode>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A block-level node of a document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DocumentNode {
    Paragraph(Paragraph),
    List(List),
    Image {
        path: String,
        caption: Option<String>,
    },
    Sectioning {
        level: SectionLevel,
        title: String,
    },
    DisplayMath(MathBlock),
    CodeBlock {
        text: String,
    },
    /// A cross-reference table for a topic group, filled in by the export
    /// layer.
    GroupTable {
        group: String,
    },
    SinceBegin {
        version: String,
    },
    SinceEnd,
    FrontMatter,
    MainMatter,
    BackMatter,
    TableOfContents,
    Index,
}

/// A paragraph: text plus ordered metadata spans over that text.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Paragraph {
    pub text: String,
    /// Non-overlapping, non-nesting spans in start order.
    pub spans: Vec<Span>,
}

/// A metadata range over a paragraph's text. `start..end` are byte offsets.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpanKind {
    Bold,
    Italic,
    Code,
    Link { url: String },
    Since { version: String },
    Math,
    /// A zero-length marker carrying the indexed term.
    IndexEntry { term: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct List {
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListItem {
    pub nodes: Vec<DocumentNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SectionLevel {
    Part,
    Chapter,
    Section,
}

/// Display math: a normalized verbatim source string plus the structured
/// math list.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MathBlock {
    pub source: String,
    pub nodes: Vec<MathNode>,
}

/// One element of a math list. Superscript, subscript and alignment marks
/// are forwarded one-to-one from the input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MathNode {
    Atom(char),
    Superscript,
    Subscript,
    Alignment,
    Group(Vec<MathNode>),
}
