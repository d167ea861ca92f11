//! Publication trait
//!
//! Format-agnostic view of an already-parsed publication. The alignment core
//! only talks to this trait, so it can be driven by the EPUB reader or by a
//! test double.

use super::error::Result;
use super::types::{
    AnchorRef, Block, Chunk, ChunkingOptions, Cover, Metadata, OutlineItem, SpineItem, Warning,
};

/// A decoded publication
///
/// All methods are synchronous; callers run them on a blocking thread.
pub trait Publication {
    /// Hierarchical outline, possibly empty
    fn outline(&self) -> &[OutlineItem];

    /// Linear reading order
    fn reading_order(&self) -> &[SpineItem];

    /// Point lookup: map a `path#fragment` target to a document and block
    fn resolve_anchor(&self, target: &str) -> Option<AnchorRef>;

    /// Split the full content stream into chunks
    fn chunks(&self, options: &ChunkingOptions) -> Result<Vec<Chunk>>;

    /// Block list of one reading-order document
    fn blocks(&self, spine_index: usize) -> Result<Vec<Block>>;

    /// Raw bytes of a resource addressed by its package-relative path
    fn open_resource(&self, path: &str) -> Result<Vec<u8>>;

    fn metadata(&self) -> &Metadata;

    /// Problems found while decoding that did not prevent parsing
    fn warnings(&self) -> &[Warning];

    fn cover(&self) -> Option<Cover>;
}
