//! XHTML content conversion
//!
//! Walks a content document with the quick-xml event reader and produces
//! the flat block list the alignment core slices. Every `id` (and legacy
//! `a@name`) is recorded as an anchor of the block containing it, or of the
//! next block emitted when it sits between blocks.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};

use crate::document::{
    Block, BlockKind, DocumentError, Figure, Inline, InlineKind, Result, Table, TableCell,
    TableRow,
};

use super::xml::{attribute, decode_text, element_name, reader};

/// Blocks of one content document and where its fragment ids land
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub blocks: Vec<Block>,
    /// Fragment id to block index, first occurrence wins
    pub anchors: HashMap<String, usize>,
}

impl ParsedDocument {
    pub fn anchor(&self, fragment: &str) -> Option<usize> {
        self.anchors.get(fragment).copied()
    }
}

/// Convert an XHTML document into blocks.
pub fn parse_document(content: &str, path: &str) -> Result<ParsedDocument> {
    let mut reader = reader(content);
    let mut converter = Converter::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => converter.start(&e),
            Ok(Event::End(_)) => converter.end(),
            Ok(Event::Text(e)) => converter.text(&decode_text(&e)),
            Ok(Event::CData(e)) => converter.text(&String::from_utf8_lossy(&e.into_inner())),
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocumentError::xml(path, e)),
            _ => {}
        }
    }

    Ok(converter.finish())
}

#[derive(Debug, Clone, Default)]
struct InlineStyle {
    emph: bool,
    strong: bool,
    code: bool,
    href: Option<String>,
}

impl InlineStyle {
    fn kind(&self) -> InlineKind {
        if self.code {
            InlineKind::Code
        } else if self.href.is_some() {
            InlineKind::Link
        } else if self.strong {
            InlineKind::Strong
        } else if self.emph {
            InlineKind::Emphasis
        } else {
            InlineKind::Text
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BlockContext {
    kind: BlockKind,
    level: u32,
    ordered: bool,
    list_index: u32,
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            kind: BlockKind::Paragraph,
            level: 0,
            ordered: false,
            list_index: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ListState {
    ordered: bool,
    counter: u32,
}

/// What closing an element has to undo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Plain,
    Skip,
    Block,
    List,
    Inline,
    Table,
    Row,
    Cell,
    Figure,
    Caption,
}

#[derive(Debug, Default)]
struct TableBuilder {
    rows: Vec<TableRow>,
    row: Option<TableRow>,
    cell: Option<TableCell>,
    anchors: Vec<String>,
    /// Nested tables are flattened into the outer one
    nested: usize,
}

impl TableBuilder {
    fn close_cell(&mut self) {
        if let Some(mut cell) = self.cell.take() {
            tidy(&mut cell.inlines);
            self.row.get_or_insert_with(TableRow::default).cells.push(cell);
        }
    }

    fn close_row(&mut self) {
        self.close_cell();
        if let Some(row) = self.row.take() {
            if !row.cells.is_empty() {
                self.rows.push(row);
            }
        }
    }
}

#[derive(Debug, Default)]
struct FigureBuilder {
    images: Vec<Inline>,
    caption: Vec<Inline>,
    anchors: Vec<String>,
    in_caption: bool,
}

#[derive(Debug, Default)]
struct Converter {
    blocks: Vec<Block>,
    current: Option<Block>,
    pending_anchors: Vec<String>,
    frames: Vec<Frame>,
    skip: usize,
    styles: Vec<InlineStyle>,
    contexts: Vec<BlockContext>,
    lists: Vec<ListState>,
    table: Option<TableBuilder>,
    figure: Option<FigureBuilder>,
}

impl Converter {
    fn start(&mut self, e: &BytesStart<'_>) {
        if self.skip > 0 {
            self.frames.push(Frame::Plain);
            return;
        }

        let name = element_name(e);
        let frame = match name.as_str() {
            "head" | "script" | "style" | "title" | "noscript" | "template" => {
                self.skip += 1;
                Frame::Skip
            }
            "table" => self.open_table(),
            "tr" => match self.table.as_mut() {
                Some(table) if table.nested == 0 => {
                    table.close_row();
                    table.row = Some(TableRow::default());
                    Frame::Row
                }
                _ => Frame::Plain,
            },
            "td" | "th" => match self.table.as_mut() {
                Some(table) if table.nested == 0 => {
                    table.close_cell();
                    table.cell = Some(TableCell {
                        inlines: Vec::new(),
                        header: name == "th",
                    });
                    Frame::Cell
                }
                _ => Frame::Plain,
            },
            _ if self.table.is_some() => self.start_inline_or_plain(&name, e),
            "figure" if self.figure.is_none() => {
                self.flush();
                self.figure = Some(FigureBuilder::default());
                Frame::Figure
            }
            "figcaption" => match self.figure.as_mut() {
                Some(figure) => {
                    figure.in_caption = true;
                    Frame::Caption
                }
                None => self.open_block(BlockContext::default()),
            },
            _ if self.figure.is_some() => self.start_inline_or_plain(&name, e),
            "hr" => {
                self.flush();
                let mut anchors = std::mem::take(&mut self.pending_anchors);
                anchors.extend(element_anchors(e, &name));
                self.blocks.push(Block {
                    kind: BlockKind::Hr,
                    anchors,
                    ..Default::default()
                });
                self.frames.push(Frame::Plain);
                return;
            }
            "ul" | "ol" => {
                self.flush();
                let start = attribute(e, "start")
                    .and_then(|s| s.trim().parse::<u32>().ok())
                    .unwrap_or(1);
                self.lists.push(ListState {
                    ordered: name == "ol",
                    counter: start.saturating_sub(1),
                });
                Frame::List
            }
            "li" => {
                let level = self.lists.len().max(1) as u32;
                let list = self.lists.last_mut().map(|list| {
                    list.counter = list.counter.saturating_add(1);
                    *list
                });
                let (ordered, list_index) = list
                    .map(|list| (list.ordered, list.counter))
                    .unwrap_or((false, 1));
                self.open_block(BlockContext {
                    kind: BlockKind::ListItem,
                    level,
                    ordered,
                    list_index,
                })
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse().unwrap_or(1);
                self.open_block(BlockContext {
                    kind: BlockKind::Heading,
                    level,
                    ..Default::default()
                })
            }
            "blockquote" => self.open_block(BlockContext {
                kind: BlockKind::Blockquote,
                ..Default::default()
            }),
            "pre" => self.open_block(BlockContext {
                kind: BlockKind::Pre,
                ..Default::default()
            }),
            "p" | "div" | "dt" | "dd" | "address" | "caption" => {
                // Paragraphs inside quotes and list items keep the outer kind
                let context = match self.contexts.last() {
                    Some(outer)
                        if matches!(
                            outer.kind,
                            BlockKind::Blockquote | BlockKind::ListItem | BlockKind::Pre
                        ) =>
                    {
                        *outer
                    }
                    _ => BlockContext::default(),
                };
                self.open_block(context)
            }
            "body" | "section" | "article" | "main" | "header" | "footer" | "nav" | "aside"
            | "dl" | "hgroup" | "details" | "summary" => {
                self.flush();
                Frame::Plain
            }
            _ => self.start_inline_or_plain(&name, e),
        };

        self.frames.push(frame);
        for anchor in element_anchors(e, &name) {
            self.record_anchor(anchor);
        }
    }

    /// Inline formatting, images and line breaks
    fn start_inline_or_plain(&mut self, name: &str, e: &BytesStart<'_>) -> Frame {
        let mut style = self.styles.last().cloned().unwrap_or_default();
        match name {
            "em" | "i" | "cite" | "dfn" | "var" => style.emph = true,
            "strong" | "b" => style.strong = true,
            "code" | "kbd" | "samp" | "tt" => style.code = true,
            "a" => match attribute(e, "href") {
                Some(href) if !href.trim().is_empty() => style.href = Some(href.trim().to_string()),
                _ => return Frame::Plain,
            },
            "img" => {
                if let Some(src) = attribute(e, "src") {
                    let alt = attribute(e, "alt").unwrap_or_default();
                    self.push_image(Inline::image(src.trim(), alt));
                }
                return Frame::Plain;
            }
            "image" => {
                if let Some(src) = attribute(e, "href") {
                    self.push_image(Inline::image(src.trim(), ""));
                }
                return Frame::Plain;
            }
            "br" => {
                self.push_break();
                return Frame::Plain;
            }
            _ => return Frame::Plain,
        }
        self.styles.push(style);
        Frame::Inline
    }

    fn end(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        match frame {
            Frame::Plain => {}
            Frame::Skip => self.skip = self.skip.saturating_sub(1),
            Frame::Inline => {
                self.styles.pop();
            }
            Frame::Block => {
                self.flush();
                self.contexts.pop();
            }
            Frame::List => {
                self.flush();
                self.lists.pop();
            }
            Frame::Table => self.close_table(),
            Frame::Row => {
                if let Some(table) = self.table.as_mut() {
                    table.close_row();
                }
            }
            Frame::Cell => {
                if let Some(table) = self.table.as_mut() {
                    table.close_cell();
                }
            }
            Frame::Figure => self.close_figure(),
            Frame::Caption => {
                if let Some(figure) = self.figure.as_mut() {
                    figure.in_caption = false;
                }
            }
        }
    }

    fn text(&mut self, raw: &str) {
        if self.skip > 0 || raw.is_empty() {
            return;
        }
        let preserve = self.preserve_whitespace();
        let text = if preserve {
            raw.to_string()
        } else {
            collapse_whitespace(raw)
        };
        if text.is_empty() || (!preserve && text == " " && !self.has_open_target()) {
            return;
        }

        let style = self.styles.last().cloned().unwrap_or_default();
        if let Some(inlines) = self.target() {
            append_text(inlines, &text, &style, preserve);
        }
    }

    fn push_break(&mut self) {
        if !self.has_open_target() {
            return;
        }
        let style = self.styles.last().cloned().unwrap_or_default();
        if let Some(inlines) = self.target() {
            append_text(inlines, "\n", &style, true);
        }
    }

    fn push_image(&mut self, image: Inline) {
        if let Some(table) = self.table.as_mut() {
            if let Some(cell) = table.cell.as_mut() {
                cell.inlines.push(image);
            }
            return;
        }
        if let Some(figure) = self.figure.as_mut() {
            if figure.in_caption {
                figure.caption.push(image);
            } else {
                figure.images.push(image);
            }
            return;
        }
        if self.current.is_none() {
            self.begin_block();
        }
        if let Some(block) = self.current.as_mut() {
            block.inlines.push(image);
        }
    }

    fn record_anchor(&mut self, anchor: String) {
        if let Some(table) = self.table.as_mut() {
            table.anchors.push(anchor);
        } else if let Some(figure) = self.figure.as_mut() {
            figure.anchors.push(anchor);
        } else if let Some(block) = self.current.as_mut() {
            block.anchors.push(anchor);
        } else {
            self.pending_anchors.push(anchor);
        }
    }

    fn preserve_whitespace(&self) -> bool {
        self.contexts.iter().any(|c| c.kind == BlockKind::Pre)
    }

    fn has_open_target(&self) -> bool {
        if let Some(table) = &self.table {
            return table.cell.as_ref().is_some_and(|c| !c.inlines.is_empty());
        }
        if let Some(figure) = &self.figure {
            return !figure.caption.is_empty();
        }
        self.current.is_some()
    }

    /// Inline list text currently flows into
    fn target(&mut self) -> Option<&mut Vec<Inline>> {
        if self.table.is_some() {
            return self
                .table
                .as_mut()
                .and_then(|table| table.cell.as_mut())
                .map(|cell| &mut cell.inlines);
        }
        if self.figure.is_some() {
            return self.figure.as_mut().map(|figure| &mut figure.caption);
        }
        if self.current.is_none() {
            self.begin_block();
        }
        self.current.as_mut().map(|block| &mut block.inlines)
    }

    fn open_block(&mut self, context: BlockContext) -> Frame {
        self.flush();
        self.contexts.push(context);
        Frame::Block
    }

    fn begin_block(&mut self) {
        let context = self.contexts.last().copied().unwrap_or_default();
        self.current = Some(Block {
            kind: context.kind,
            level: context.level,
            ordered: context.ordered,
            list_index: context.list_index,
            anchors: std::mem::take(&mut self.pending_anchors),
            ..Default::default()
        });
    }

    /// Close the open text block, dropping it when it has no content
    fn flush(&mut self) {
        let Some(mut block) = self.current.take() else {
            return;
        };
        tidy(&mut block.inlines);
        if block.inlines.is_empty() {
            block.anchors.append(&mut self.pending_anchors);
            self.pending_anchors = block.anchors;
        } else {
            self.blocks.push(block);
        }
    }

    fn open_table(&mut self) -> Frame {
        match self.table.as_mut() {
            Some(table) => table.nested += 1,
            None => {
                self.flush();
                self.table = Some(TableBuilder::default());
            }
        }
        Frame::Table
    }

    fn close_table(&mut self) {
        if let Some(table) = self.table.as_mut() {
            if table.nested > 0 {
                table.nested -= 1;
                return;
            }
        }
        let Some(mut table) = self.table.take() else {
            return;
        };
        table.close_row();
        let mut anchors = std::mem::take(&mut self.pending_anchors);
        anchors.append(&mut table.anchors);
        if table.rows.is_empty() {
            self.pending_anchors = anchors;
            return;
        }
        self.blocks.push(Block {
            kind: BlockKind::Table,
            table: Some(Table { rows: table.rows }),
            anchors,
            ..Default::default()
        });
    }

    fn close_figure(&mut self) {
        let Some(mut figure) = self.figure.take() else {
            return;
        };
        tidy(&mut figure.caption);
        let mut anchors = std::mem::take(&mut self.pending_anchors);
        anchors.append(&mut figure.anchors);
        if figure.images.is_empty() && figure.caption.is_empty() {
            self.pending_anchors = anchors;
            return;
        }
        self.blocks.push(Block {
            kind: BlockKind::Figure,
            figure: Some(Figure {
                images: figure.images,
                caption: figure.caption,
            }),
            anchors,
            ..Default::default()
        });
    }

    fn finish(mut self) -> ParsedDocument {
        self.flush();
        if self.table.is_some() {
            if let Some(table) = self.table.as_mut() {
                table.nested = 0;
            }
            self.close_table();
        }
        self.close_figure();

        if !self.pending_anchors.is_empty() {
            if let Some(last) = self.blocks.last_mut() {
                last.anchors.append(&mut self.pending_anchors);
            }
        }

        let mut anchors = HashMap::new();
        for (index, block) in self.blocks.iter().enumerate() {
            for anchor in &block.anchors {
                anchors.entry(anchor.clone()).or_insert(index);
            }
        }
        ParsedDocument {
            blocks: self.blocks,
            anchors,
        }
    }
}

/// Fragment identifiers declared by an element
fn element_anchors(e: &BytesStart<'_>, name: &str) -> Vec<String> {
    let mut anchors = Vec::new();
    if let Some(id) = attribute(e, "id").filter(|id| !id.trim().is_empty()) {
        anchors.push(id.trim().to_string());
    }
    if name == "a" {
        if let Some(anchor) = attribute(e, "name").filter(|n| !n.trim().is_empty()) {
            let anchor = anchor.trim().to_string();
            if !anchors.contains(&anchor) {
                anchors.push(anchor);
            }
        }
    }
    anchors
}

/// Collapse runs of XML whitespace into one space; other spaces (`&nbsp;`) are kept
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn append_text(inlines: &mut Vec<Inline>, text: &str, style: &InlineStyle, preserve: bool) {
    let mut text = text;
    if !preserve && text.starts_with(' ') {
        let after_space = inlines
            .iter()
            .rev()
            .find(|inline| inline.kind != InlineKind::Image)
            .map_or(true, |inline| inline.text.ends_with(' ') || inline.text.ends_with('\n'));
        if after_space {
            text = &text[1..];
        }
    }
    if text.is_empty() {
        return;
    }

    let kind = style.kind();
    let href = style.href.clone().unwrap_or_default();
    if let Some(last) = inlines.last_mut() {
        if last.kind == kind
            && last.kind != InlineKind::Image
            && last.href == href
            && last.emph == style.emph
            && last.strong == style.strong
        {
            last.text.push_str(text);
            return;
        }
    }
    inlines.push(Inline {
        kind,
        text: text.to_string(),
        href,
        emph: style.emph,
        strong: style.strong,
        ..Default::default()
    });
}

/// Trim the outer edges of an inline run and drop empty text inlines
fn tidy(inlines: &mut Vec<Inline>) {
    if let Some(first) = inlines.iter_mut().find(|i| i.kind != InlineKind::Image) {
        first.text = first.text.trim_start().to_string();
    }
    if let Some(last) = inlines.iter_mut().rev().find(|i| i.kind != InlineKind::Image) {
        last.text = last.text.trim_end().to_string();
    }
    inlines.retain(|i| i.kind == InlineKind::Image || !i.text.is_empty());
}
