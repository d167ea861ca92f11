//! Publication types
//!
//! Structures exchanged between a parsed publication and the alignment core.
//! They describe already-decoded content: nothing here knows about zip
//! archives or markup.

use serde::{Deserialize, Serialize};

/// Outline (table of contents) entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineItem {
    /// Display label, possibly empty
    pub label: String,
    /// Target reference (`path#fragment`), possibly empty
    pub href: String,
    /// Target borrowed from the first descendant when the entry has none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested_target: Option<String>,
    /// Nested entries
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            nested_target: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<OutlineItem>) -> Self {
        self.children = children;
        self
    }

    /// Direct target, falling back to the nested one
    pub fn target(&self) -> &str {
        if !self.href.is_empty() {
            return &self.href;
        }
        self.nested_target.as_deref().unwrap_or("")
    }
}

/// Reading order entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpineItem {
    /// Position in the reading order
    pub index: usize,
    /// Manifest id this entry points at
    pub idref: String,
    /// Document path relative to the package directory
    pub href: String,
    /// MIME type of the document
    pub media_type: String,
    /// Whether the document is part of the linear reading order
    pub linear: bool,
}

/// Block kinds. Closed set: anything unrecognised is a paragraph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Paragraph,
    Heading,
    ListItem,
    Blockquote,
    Pre,
    Hr,
    Table,
    Figure,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::ListItem => "list_item",
            BlockKind::Blockquote => "blockquote",
            BlockKind::Pre => "pre",
            BlockKind::Hr => "hr",
            BlockKind::Table => "table",
            BlockKind::Figure => "figure",
        }
    }
}

/// Inline kinds. Closed set: anything unrecognised is text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineKind {
    #[default]
    Text,
    Emphasis,
    Strong,
    Link,
    Image,
    Code,
}

impl InlineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InlineKind::Text => "text",
            InlineKind::Emphasis => "emphasis",
            InlineKind::Strong => "strong",
            InlineKind::Link => "link",
            InlineKind::Image => "image",
            InlineKind::Code => "code",
        }
    }
}

/// Span-level content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inline {
    pub kind: InlineKind,
    pub text: String,
    pub href: String,
    pub src: String,
    pub alt: String,
    pub emph: bool,
    pub strong: bool,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            kind: InlineKind::Image,
            src: src.into(),
            alt: alt.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub inlines: Vec<Inline>,
    pub header: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Figure {
    pub images: Vec<Inline>,
    pub caption: Vec<Inline>,
}

/// Structural content unit of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Heading level, or list nesting depth for list items
    pub level: u32,
    pub ordered: bool,
    /// 1-based position inside the enclosing list
    pub list_index: u32,
    pub inlines: Vec<Inline>,
    pub table: Option<Table>,
    pub figure: Option<Figure>,
    /// Fragment identifiers that land on this block
    pub anchors: Vec<String>,
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            inlines: vec![Inline::text(text)],
            ..Default::default()
        }
    }

    /// Plain text of the block, as it appears in the content stream
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        push_inline_text(&mut out, &self.inlines);
        if let Some(table) = &self.table {
            for row in &table.rows {
                let cells: Vec<String> = row
                    .cells
                    .iter()
                    .map(|cell| {
                        let mut text = String::new();
                        push_inline_text(&mut text, &cell.inlines);
                        text
                    })
                    .collect();
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&cells.join("\t"));
            }
        }
        if let Some(figure) = &self.figure {
            push_inline_text(&mut out, &figure.caption);
        }
        out.trim().to_string()
    }
}

fn push_inline_text(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        if inline.kind != InlineKind::Image {
            out.push_str(&inline.text);
        }
    }
}

/// Text chunking strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    /// Pack blocks up to a character budget
    #[default]
    Size,
    /// One chunk per reading-order document
    Document,
}

impl ChunkMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "size" => Some(Self::Size),
            "document" | "doc" => Some(Self::Document),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingOptions {
    pub mode: ChunkMode,
    pub max_chars: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            mode: ChunkMode::Size,
            max_chars: 2000,
        }
    }
}

/// A contiguous run of text from the full content stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub spine_index: usize,
    pub first_block: usize,
    pub last_block: usize,
    /// Byte offset into the full content stream
    pub start_offset: usize,
    pub end_offset: usize,
    pub text: String,
}

/// Position a target reference resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorRef {
    pub spine_index: usize,
    pub block_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub id: String,
    pub scheme: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Publication metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub publisher: String,
    pub published_at: String,
    pub series: String,
    pub series_index: String,
    pub subjects: Vec<String>,
    pub identifiers: Vec<Identifier>,
}

/// Non-fatal problem found while reading a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
    pub path: String,
}

impl Warning {
    pub fn new(code: &str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub content_type: String,
    pub bytes: Vec<u8>,
}
