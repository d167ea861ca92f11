//! Anchor sets and anchor resolution
//!
//! Sections live in the outline's coordinate space; chunks and blocks live in
//! linear ones. An anchor ties a section to a position in one of those linear
//! spaces, and an [`AnchorSet`] answers "which anchor is the nearest at or
//! before position `i`".

use std::collections::BTreeMap;

use crate::document::{AnchorRef, Chunk, Publication};

use super::outline::Section;

/// Sorted association list from linear positions to values
///
/// Entries are kept sorted by position with insertion order preserved among
/// equal positions, so the earliest-inserted anchor wins ties.
#[derive(Debug, Clone)]
pub struct AnchorSet<T> {
    entries: Vec<(usize, T)>,
    first: Option<T>,
}

impl<T: Copy> AnchorSet<T> {
    pub fn new(anchors: impl IntoIterator<Item = (usize, T)>) -> Self {
        let mut entries: Vec<(usize, T)> = anchors.into_iter().collect();
        let first = entries.first().map(|(_, value)| *value);
        entries.sort_by_key(|(position, _)| *position);
        Self { entries, first }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value of the anchor with the largest position `<= position`
    pub fn nearest_preceding(&self, position: usize) -> Option<T> {
        let end = self.entries.partition_point(|(p, _)| *p <= position);
        if end == 0 {
            return None;
        }
        let best = self.entries[end - 1].0;
        let start = self.entries[..end].partition_point(|(p, _)| *p < best);
        Some(self.entries[start].1)
    }

    /// Like [`nearest_preceding`](Self::nearest_preceding), but positions
    /// before every anchor belong to the first anchor inserted.
    pub fn owner(&self, position: usize) -> Option<T> {
        self.nearest_preceding(position).or(self.first)
    }
}

/// A section's position in the chunk stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkAnchor {
    pub section_order_index: usize,
    pub chunk_index: usize,
}

/// Maps a document/block coordinate to the chunk covering it
#[derive(Debug, Default)]
pub struct ChunkLocator {
    by_last_block: BTreeMap<(usize, usize), usize>,
}

impl ChunkLocator {
    pub fn new(chunks: &[Chunk]) -> Self {
        let mut by_last_block = BTreeMap::new();
        for (index, chunk) in chunks.iter().enumerate() {
            by_last_block
                .entry((chunk.spine_index, chunk.last_block))
                .or_insert(index);
        }
        Self { by_last_block }
    }

    /// First chunk of the same document whose last block is at or after the
    /// target block. Blocks without text map to the chunk that follows them.
    pub fn locate(&self, anchor: AnchorRef) -> Option<usize> {
        self.by_last_block
            .range((anchor.spine_index, anchor.block_index)..=(anchor.spine_index, usize::MAX))
            .next()
            .map(|(_, index)| *index)
    }
}

/// Resolve every section into the chunk stream.
///
/// Sections whose target does not resolve contribute no anchor. When nothing
/// resolves but sections exist, a single `(0, 0)` anchor is synthesized.
pub fn resolve_chunk_anchors<P: Publication + ?Sized>(
    book: &P,
    sections: &[Section],
    chunks: &[Chunk],
) -> Vec<ChunkAnchor> {
    let locator = ChunkLocator::new(chunks);
    let mut anchors = Vec::with_capacity(sections.len());

    for section in sections {
        if section.target.is_empty() {
            continue;
        }
        let Some(position) = book.resolve_anchor(&section.target) else {
            tracing::debug!(
                section = section.order_index,
                target = %section.target,
                "Section target did not resolve"
            );
            continue;
        };
        let Some(chunk_index) = locator.locate(position) else {
            tracing::debug!(
                section = section.order_index,
                spine_index = position.spine_index,
                block_index = position.block_index,
                "Section target has no chunk"
            );
            continue;
        };
        anchors.push(ChunkAnchor {
            section_order_index: section.order_index,
            chunk_index,
        });
    }

    if anchors.is_empty() && !sections.is_empty() {
        anchors.push(ChunkAnchor {
            section_order_index: 0,
            chunk_index: 0,
        });
    }

    anchors
}

/// Where a section begins inside one document's block list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionTarget {
    pub section_order_index: usize,
    pub spine_index: usize,
    pub block_index: usize,
    /// Path of the document, used to resolve relative resources
    pub base_href: String,
}

/// Resolve sections into block coordinates, grouped by document.
///
/// The point lookup is tried first; when it fails, an exact match of the
/// section's document path against the reading order anchors the section at
/// the start of that document.
pub fn resolve_block_targets<P: Publication + ?Sized>(
    book: &P,
    sections: &[Section],
) -> BTreeMap<usize, Vec<SectionTarget>> {
    let reading_order = book.reading_order();
    let mut grouped: BTreeMap<usize, Vec<SectionTarget>> = BTreeMap::new();

    for section in sections {
        if section.target.is_empty() {
            continue;
        }

        let resolved = book
            .resolve_anchor(&section.target)
            .filter(|position| position.spine_index < reading_order.len())
            .map(|position| (position.spine_index, position.block_index));

        let by_path = || {
            reading_order
                .iter()
                .position(|item| !section.href.is_empty() && item.href == section.href)
                .map(|spine_index| (spine_index, 0))
        };

        let Some((spine_index, block_index)) = resolved.or_else(by_path) else {
            tracing::debug!(
                section = section.order_index,
                target = %section.target,
                "Section has no block target"
            );
            continue;
        };

        grouped.entry(spine_index).or_default().push(SectionTarget {
            section_order_index: section.order_index,
            spine_index,
            block_index,
            base_href: reading_order[spine_index].href.clone(),
        });
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::testing::FakeBook;
    use crate::align::outline::flatten_outline;
    use crate::document::OutlineItem;

    #[test]
    fn test_nearest_preceding_picks_largest_position_at_or_before() {
        let set = AnchorSet::new(vec![(0, 'a'), (4, 'b'), (9, 'c')]);
        assert_eq!(set.nearest_preceding(0), Some('a'));
        assert_eq!(set.nearest_preceding(3), Some('a'));
        assert_eq!(set.nearest_preceding(4), Some('b'));
        assert_eq!(set.nearest_preceding(8), Some('b'));
        assert_eq!(set.nearest_preceding(100), Some('c'));
    }

    #[test]
    fn test_ties_prefer_first_inserted() {
        let set = AnchorSet::new(vec![(5, 'x'), (2, 'y'), (5, 'z')]);
        assert_eq!(set.nearest_preceding(5), Some('x'));
        assert_eq!(set.nearest_preceding(7), Some('x'));
        assert_eq!(set.nearest_preceding(3), Some('y'));
    }

    #[test]
    fn test_positions_before_every_anchor() {
        let set = AnchorSet::new(vec![(3, 'a'), (1, 'b')]);
        assert_eq!(set.nearest_preceding(0), None);
        assert_eq!(set.owner(0), Some('a'));
        assert_eq!(AnchorSet::<char>::new(Vec::new()).owner(0), None);
    }

    #[test]
    fn test_chunk_locator_maps_blocks_to_covering_chunk() {
        let book = FakeBook::new()
            .document("a.xhtml", &["one", "two", "three"])
            .document("b.xhtml", &["four"]);
        let chunks = vec![
            book.chunk(0, 0, 1),
            book.chunk(0, 2, 2),
            book.chunk(1, 0, 0),
        ];
        let locator = ChunkLocator::new(&chunks);
        let at = |spine_index, block_index| AnchorRef { spine_index, block_index };
        assert_eq!(locator.locate(at(0, 0)), Some(0));
        assert_eq!(locator.locate(at(0, 1)), Some(0));
        assert_eq!(locator.locate(at(0, 2)), Some(1));
        assert_eq!(locator.locate(at(0, 3)), None);
        assert_eq!(locator.locate(at(1, 0)), Some(2));
        assert_eq!(locator.locate(at(2, 0)), None);
    }

    #[test]
    fn test_chunk_anchors_skip_unresolved_and_fall_back() {
        let book = FakeBook::new()
            .document("a.xhtml", &["one", "two"])
            .anchor("a.xhtml#mid", 0, 1)
            .outline(vec![
                OutlineItem::new("Start", "a.xhtml"),
                OutlineItem::new("Missing", "nowhere.xhtml"),
                OutlineItem::new("Empty", ""),
                OutlineItem::new("Middle", "a.xhtml#mid"),
            ]);
        let sections = flatten_outline(&book.outline, &book.spine);
        let chunks = vec![book.chunk(0, 0, 0), book.chunk(0, 1, 1)];

        let anchors = resolve_chunk_anchors(&book, &sections, &chunks);
        assert_eq!(
            anchors,
            vec![
                ChunkAnchor { section_order_index: 0, chunk_index: 0 },
                ChunkAnchor { section_order_index: 3, chunk_index: 1 },
            ]
        );

        let unresolved = FakeBook::new()
            .document("a.xhtml", &["one"])
            .outline(vec![OutlineItem::new("Lost", "x.xhtml"), OutlineItem::new("Gone", "")]);
        let sections = flatten_outline(&unresolved.outline, &unresolved.spine);
        let anchors = resolve_chunk_anchors(&unresolved, &sections, &[unresolved.chunk(0, 0, 0)]);
        assert_eq!(anchors, vec![ChunkAnchor { section_order_index: 0, chunk_index: 0 }]);

        assert!(resolve_chunk_anchors(&unresolved, &[], &[]).is_empty());
    }

    #[test]
    fn test_block_targets_use_lookup_then_path_fallback() {
        let book = FakeBook::new()
            .document("a.xhtml", &["one", "two"])
            .document("b.xhtml", &["three"])
            .anchor("a.xhtml#two", 0, 1)
            .outline(vec![
                OutlineItem::new("A", "a.xhtml#two"),
                OutlineItem::new("B", "b.xhtml#broken"),
                OutlineItem::new("C", "c.xhtml"),
                OutlineItem::new("D", ""),
            ]);
        let sections = flatten_outline(&book.outline, &book.spine);
        let grouped = resolve_block_targets(&book, &sections);

        assert_eq!(grouped.len(), 2);
        assert_eq!(
            grouped[&0],
            vec![SectionTarget {
                section_order_index: 0,
                spine_index: 0,
                block_index: 1,
                base_href: "a.xhtml".to_string(),
            }]
        );
        assert_eq!(
            grouped[&1],
            vec![SectionTarget {
                section_order_index: 1,
                spine_index: 1,
                block_index: 0,
                base_href: "b.xhtml".to_string(),
            }]
        );
    }
}
