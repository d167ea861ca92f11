//! In-memory publication for alignment tests

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use crate::document::{
    AnchorRef, Block, Chunk, ChunkingOptions, Cover, DocumentError, Metadata, OutlineItem,
    Publication, Result, SpineItem, Warning,
};

/// Publication double with one chunk per block and injectable failures
#[derive(Default)]
pub struct FakeBook {
    pub outline: Vec<OutlineItem>,
    pub spine: Vec<SpineItem>,
    pub documents: Vec<Vec<Block>>,
    pub anchors: HashMap<String, AnchorRef>,
    pub resources: HashMap<String, Vec<u8>>,
    pub metadata: Metadata,
    pub warnings: Vec<Warning>,
    pub cover: Option<Cover>,
    failing_documents: HashSet<usize>,
    failing_chunks: bool,
    opened: RefCell<Vec<String>>,
    block_calls: RefCell<Vec<usize>>,
}

impl FakeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(self, href: &str, paragraphs: &[&str]) -> Self {
        let blocks = paragraphs.iter().map(|p| Block::paragraph(*p)).collect();
        self.document_blocks(href, blocks)
    }

    pub fn document_blocks(mut self, href: &str, blocks: Vec<Block>) -> Self {
        let index = self.spine.len();
        self.spine.push(SpineItem {
            index,
            idref: format!("item{}", index),
            href: href.to_string(),
            media_type: "application/xhtml+xml".to_string(),
            linear: true,
        });
        self.documents.push(blocks);
        self
    }

    pub fn anchor(mut self, target: &str, spine_index: usize, block_index: usize) -> Self {
        self.anchors
            .insert(target.to_string(), AnchorRef { spine_index, block_index });
        self
    }

    pub fn outline(mut self, outline: Vec<OutlineItem>) -> Self {
        self.outline = outline;
        self
    }

    pub fn resource(mut self, path: &str, data: Vec<u8>) -> Self {
        self.resources.insert(path.to_string(), data);
        self
    }

    pub fn warning(mut self, code: &str, message: &str) -> Self {
        self.warnings.push(Warning::new(code, message, ""));
        self
    }

    pub fn fail_blocks(mut self, spine_index: usize) -> Self {
        self.failing_documents.insert(spine_index);
        self
    }

    pub fn fail_chunks(mut self) -> Self {
        self.failing_chunks = true;
        self
    }

    /// Resource paths requested so far, in order
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }

    /// Documents whose block lists were requested, in order
    pub fn block_calls(&self) -> Vec<usize> {
        self.block_calls.borrow().clone()
    }

    /// Chunk covering blocks `first..=last` of one document
    pub fn chunk(&self, spine_index: usize, first_block: usize, last_block: usize) -> Chunk {
        let text = self.documents[spine_index][first_block..=last_block]
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n");
        Chunk {
            id: format!("{}:{}", spine_index, first_block),
            spine_index,
            first_block,
            last_block,
            start_offset: 0,
            end_offset: text.len(),
            text,
        }
    }
}

impl Publication for FakeBook {
    fn outline(&self) -> &[OutlineItem] {
        &self.outline
    }

    fn reading_order(&self) -> &[SpineItem] {
        &self.spine
    }

    fn resolve_anchor(&self, target: &str) -> Option<AnchorRef> {
        if let Some(anchor) = self.anchors.get(target) {
            return Some(*anchor);
        }
        if target.contains('#') {
            return None;
        }
        self.spine
            .iter()
            .position(|item| item.href == target)
            .map(|spine_index| AnchorRef { spine_index, block_index: 0 })
    }

    fn chunks(&self, _options: &ChunkingOptions) -> Result<Vec<Chunk>> {
        if self.failing_chunks {
            return Err(DocumentError::Chunking("injected failure".to_string()));
        }
        let mut chunks = Vec::new();
        let mut offset = 0;
        for (spine_index, blocks) in self.documents.iter().enumerate() {
            for (block_index, block) in blocks.iter().enumerate() {
                let text = block.plain_text();
                if text.is_empty() {
                    continue;
                }
                if !chunks.is_empty() {
                    offset += 2;
                }
                let start = offset;
                offset += text.len();
                chunks.push(Chunk {
                    id: format!("{}:{}", spine_index, block_index),
                    spine_index,
                    first_block: block_index,
                    last_block: block_index,
                    start_offset: start,
                    end_offset: offset,
                    text,
                });
            }
        }
        Ok(chunks)
    }

    fn blocks(&self, spine_index: usize) -> Result<Vec<Block>> {
        self.block_calls.borrow_mut().push(spine_index);
        if self.failing_documents.contains(&spine_index) {
            return Err(DocumentError::InvalidContent("injected failure".to_string()));
        }
        self.documents
            .get(spine_index)
            .cloned()
            .ok_or(DocumentError::DocumentNotFound(spine_index))
    }

    fn open_resource(&self, path: &str) -> Result<Vec<u8>> {
        self.opened.borrow_mut().push(path.to_string());
        self.resources
            .get(path)
            .cloned()
            .ok_or_else(|| DocumentError::ResourceNotFound(path.to_string()))
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    fn cover(&self) -> Option<Cover> {
        self.cover.clone()
    }
}

/// Encoded PNG of the given size
pub fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("encode png");
    out
}
