//! Publication abstraction
//!
//! The contract between document decoding (see [`crate::epub`]) and the
//! alignment core (see [`crate::align`]).
//!
//! ```text
//!   upload bytes ──► EpubBook ──(Publication)──► align::build_response
//!                      │                              │
//!          outline, reading order,        sections, chunks, section blocks,
//!          blocks, chunks, resources      images, metadata, warnings
//! ```

mod error;
pub mod paths;
mod traits;
mod types;

pub use error::{DocumentError, Result};
pub use traits::Publication;
pub use types::{
    AnchorRef, Block, BlockKind, Chunk, ChunkMode, ChunkingOptions, Cover, Figure, Identifier,
    Inline, InlineKind, Metadata, OutlineItem, SpineItem, Table, TableCell, TableRow, Warning,
};
