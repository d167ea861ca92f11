//! Block range extraction
//!
//! A document's block list is one linear sequence; sections anchored inside
//! it partition that sequence into contiguous ranges, cut at the sorted
//! anchor positions.

use std::collections::BTreeMap;
use std::ops::Range;

use crate::document::{Block, Figure, Inline, InlineKind, Publication, Table};

use super::anchors::{resolve_block_targets, SectionTarget};
use super::outline::Section;
use super::payload::{
    BlockPayload, FigurePayload, InlinePayload, SectionBlocksPayload, TableCellPayload,
    TablePayload, TableRowPayload,
};
use super::resources::{resolve_resource_href, ResourceResolver};

/// Partition `len` blocks among `targets`.
///
/// Targets are ordered by `(block_index, section_order_index)`. Each range
/// runs from the target's clamped start to the next strictly greater start,
/// or to the end of the list. Of several targets sharing a start, only the
/// lowest section gets the range; the others get an empty one.
pub fn block_ranges(targets: &mut [SectionTarget], len: usize) -> Vec<(usize, Range<usize>)> {
    targets.sort_by_key(|t| (t.block_index, t.section_order_index));
    let starts: Vec<usize> = targets.iter().map(|t| t.block_index.min(len)).collect();

    targets
        .iter()
        .enumerate()
        .map(|(i, target)| {
            let start = starts[i];
            if i > 0 && starts[i - 1] == start {
                return (target.section_order_index, start..start);
            }
            let end = starts[i + 1..]
                .iter()
                .copied()
                .find(|&next| next > start)
                .unwrap_or(len)
                .clamp(start, len);
            (target.section_order_index, start..end)
        })
        .collect()
}

/// Slice every targeted document into per-section block payloads.
///
/// Block lists are loaded once per targeted document. A document that fails
/// to load only loses its own sections. Sections with an empty range get no
/// entry at all. Output is ordered by section.
pub fn build_section_blocks<P: Publication + ?Sized>(
    book: &P,
    sections: &[Section],
    resources: &mut ResourceResolver<'_, P>,
) -> Vec<SectionBlocksPayload> {
    if sections.is_empty() {
        return Vec::new();
    }

    let grouped = resolve_block_targets(book, sections);
    let mut by_section: BTreeMap<usize, Vec<BlockPayload>> = BTreeMap::new();

    for (spine_index, mut targets) in grouped {
        let blocks = match book.blocks(spine_index) {
            Ok(blocks) => blocks,
            Err(e) => {
                tracing::warn!(spine_index, "Skipping document blocks: {}", e);
                continue;
            }
        };

        for (section_order_index, range) in block_ranges(&mut targets, blocks.len()) {
            if range.is_empty() {
                continue;
            }
            let base_href = targets
                .iter()
                .find(|t| t.section_order_index == section_order_index)
                .map(|t| t.base_href.as_str())
                .unwrap_or_default();
            let payloads = blocks[range]
                .iter()
                .map(|block| convert_block(block, base_href, resources))
                .collect();
            by_section.insert(section_order_index, payloads);
        }
    }

    by_section
        .into_iter()
        .map(|(section_order_index, blocks)| SectionBlocksPayload {
            section_order_index,
            blocks,
        })
        .collect()
}

pub fn convert_block<P: Publication + ?Sized>(
    block: &Block,
    base_href: &str,
    resources: &mut ResourceResolver<'_, P>,
) -> BlockPayload {
    BlockPayload {
        kind: block.kind.as_str().to_string(),
        level: block.level,
        ordered: block.ordered,
        list_index: block.list_index,
        inlines: convert_inlines(&block.inlines, base_href, resources),
        table: block
            .table
            .as_ref()
            .map(|table| convert_table(table, base_href, resources)),
        figure: block
            .figure
            .as_ref()
            .map(|figure| convert_figure(figure, base_href, resources)),
        anchors: block.anchors.clone(),
    }
}

fn convert_table<P: Publication + ?Sized>(
    table: &Table,
    base_href: &str,
    resources: &mut ResourceResolver<'_, P>,
) -> TablePayload {
    TablePayload {
        rows: table
            .rows
            .iter()
            .map(|row| TableRowPayload {
                cells: row
                    .cells
                    .iter()
                    .map(|cell| TableCellPayload {
                        inlines: convert_inlines(&cell.inlines, base_href, resources),
                        header: cell.header,
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn convert_figure<P: Publication + ?Sized>(
    figure: &Figure,
    base_href: &str,
    resources: &mut ResourceResolver<'_, P>,
) -> FigurePayload {
    FigurePayload {
        images: convert_inlines(&figure.images, base_href, resources),
        caption: convert_inlines(&figure.caption, base_href, resources),
    }
}

/// Convert inlines, rewriting image sources to package paths.
///
/// Unresolvable sources (external URLs) are left as written.
fn convert_inlines<P: Publication + ?Sized>(
    inlines: &[Inline],
    base_href: &str,
    resources: &mut ResourceResolver<'_, P>,
) -> Vec<InlinePayload> {
    inlines
        .iter()
        .map(|inline| {
            let mut payload = InlinePayload {
                kind: inline.kind.as_str().to_string(),
                text: inline.text.clone(),
                href: inline.href.clone(),
                src: inline.src.clone(),
                alt: inline.alt.clone(),
                emph: inline.emph,
                strong: inline.strong,
                ..Default::default()
            };
            if inline.kind == InlineKind::Image {
                if let Some(resolved) = resolve_resource_href(base_href, &inline.src) {
                    if let Some(image) = resources.ensure(&resolved) {
                        payload.width = image.width;
                        payload.height = image.height;
                    }
                    payload.src = resolved;
                }
            }
            payload
        })
        .collect()
}
