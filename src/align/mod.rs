//! Alignment core
//!
//! Reconciles three views of one publication that share no coordinates:
//! the hierarchical outline, the chunked text stream and the per-document
//! block lists.
//!
//! ```text
//!   outline ──► flatten_outline ──► sections
//!                                     │
//!            ┌────────────────────────┴──────────────────────┐
//!            ▼                                               ▼
//!   resolve_chunk_anchors + chunks              resolve_block_targets + blocks
//!            │                                               │
//!      assign_chunks                          block_ranges ──► convert_block
//!            │                                               │    │
//!            ▼                                               ▼    ▼
//!         chunks                                 section blocks  ResourceResolver ──► images
//! ```
//!
//! Every structure built here is private to one call of [`build_response`].

pub mod anchors;
pub mod blocks;
pub mod chunks;
pub mod outline;
pub mod payload;
pub mod resources;

#[cfg(test)]
pub(crate) mod testing;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::document::{ChunkingOptions, Publication, Warning};

pub use anchors::{AnchorSet, ChunkAnchor, SectionTarget};
pub use blocks::{block_ranges, build_section_blocks};
pub use chunks::{assign_chunks, build_chunk_payloads, count_words};
pub use outline::{flatten_outline, Section};
pub use payload::{CoverPayload, ParseResponse, SectionPayload};
pub use resources::{resolve_resource_href, ResourceResolver};

/// Run the whole alignment pipeline over a decoded publication.
pub fn build_response<P: Publication + ?Sized>(
    book: &P,
    file_name: &str,
    file_size: u64,
    options: &ChunkingOptions,
) -> ParseResponse {
    let sections = flatten_outline(book.outline(), book.reading_order());
    let chunks = build_chunk_payloads(book, &sections, options);

    let mut resources = ResourceResolver::new(book);
    let section_blocks = build_section_blocks(book, &sections, &mut resources);
    let images = resources.into_images();

    tracing::info!(
        file_name = %file_name,
        sections = sections.len(),
        chunks = chunks.len(),
        section_blocks = section_blocks.len(),
        images = images.len(),
        "Aligned publication"
    );

    ParseResponse {
        file_name: file_name.to_string(),
        file_size,
        message: status_message(book.warnings()),
        sections: sections.iter().map(SectionPayload::from).collect(),
        chunks,
        section_blocks,
        metadata: book.metadata().into(),
        warnings: book.warnings().to_vec(),
        cover: build_cover(book),
        images,
    }
}

/// `parsed`, or a summary of the warnings the reader reported
pub fn status_message(warnings: &[Warning]) -> String {
    match warnings {
        [] => "parsed".to_string(),
        [only] => format!("parsed with warnings: {}", only.message),
        [first, rest @ ..] => format!(
            "parsed with warnings: {} (+{} more)",
            first.message,
            rest.len()
        ),
    }
}

fn build_cover<P: Publication + ?Sized>(book: &P) -> Option<CoverPayload> {
    let cover = book.cover()?;
    if cover.bytes.is_empty() {
        return None;
    }
    Some(CoverPayload {
        content_type: cover.content_type,
        data: STANDARD.encode(&cover.bytes),
    })
}
