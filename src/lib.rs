//! Folio Server Library
//!
//! EPUB structure service: aligns a publication's outline with its chunked
//! text and its per-document content blocks.
//!
//! # Modules
//!
//! - `document`: Publication abstraction (format-agnostic)
//! - `epub`: EPUB implementation of the publication abstraction
//! - `align`: Outline flattening, anchor resolution, chunk assignment,
//!   block range extraction and resource resolution
//! - `routes`: HTTP surface

pub mod align;
pub mod config;
pub mod document;
pub mod epub;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::router;
pub use state::AppState;
