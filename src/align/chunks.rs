//! Chunk assignment
//!
//! Every chunk of the content stream is owned by the section whose anchor is
//! the nearest at or before it. Chunks are then numbered per section.

use std::collections::HashMap;

use crate::document::{Chunk, ChunkingOptions, Publication};

use super::anchors::{resolve_chunk_anchors, AnchorSet, ChunkAnchor};
use super::outline::Section;
use super::payload::ChunkPayload;

/// Chunk the publication and assign every chunk to a section.
///
/// A failing chunking pass yields no chunks; it never fails the request.
pub fn build_chunk_payloads<P: Publication + ?Sized>(
    book: &P,
    sections: &[Section],
    options: &ChunkingOptions,
) -> Vec<ChunkPayload> {
    let chunks = match book.chunks(options) {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::warn!("Chunking failed, omitting chunks: {}", e);
            return Vec::new();
        }
    };

    let anchors = resolve_chunk_anchors(book, sections, &chunks);
    tracing::debug!(
        chunks = chunks.len(),
        anchors = anchors.len(),
        "Assigning chunks to sections"
    );
    assign_chunks(chunks, &anchors)
}

/// Assign chunks (in stream order) to the sections owning them.
pub fn assign_chunks(chunks: Vec<Chunk>, anchors: &[ChunkAnchor]) -> Vec<ChunkPayload> {
    let set = AnchorSet::new(
        anchors
            .iter()
            .map(|anchor| (anchor.chunk_index, anchor.section_order_index)),
    );

    let mut counters: HashMap<usize, usize> = HashMap::new();
    chunks
        .into_iter()
        .enumerate()
        .map(|(position, chunk)| {
            let section_order_index = set.owner(position).unwrap_or(0);
            let counter = counters.entry(section_order_index).or_insert(0);
            let chunk_index = *counter;
            *counter += 1;

            ChunkPayload {
                section_order_index,
                chunk_index,
                start_offset: chunk.start_offset,
                end_offset: chunk.end_offset,
                word_count: count_words(&chunk.text),
                content: chunk.text,
            }
        })
        .collect()
}

/// Count runs of characters separated by space, newline, tab or carriage return
pub fn count_words(text: &str) -> usize {
    text.split([' ', '\n', '\t', '\r'])
        .filter(|word| !word.is_empty())
        .count()
}
