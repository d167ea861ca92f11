//! EPUB publication
//!
//! Reads an EPUB container fully into memory and serves it through the
//! [`Publication`] trait. Only a missing or unreadable container/package is
//! fatal; everything else degrades into [`Warning`]s.
//!
//! All hrefs exposed (reading order, outline targets, resource paths) are
//! percent-decoded and relative to the package document's directory.

mod chunker;
mod content;
mod nav;
mod opf;
mod xml;

use std::collections::HashMap;
use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::config::DEFAULT_MAX_UNPACKED_BYTES;
use crate::document::paths::{clean_path, decode_href, join_path, parent_dir};
use crate::document::{
    AnchorRef, Block, Chunk, ChunkingOptions, Cover, DocumentError, Metadata, OutlineItem,
    Publication, Result, SpineItem, Warning,
};

pub use chunker::{chunk_documents, BLOCK_SEPARATOR};
pub use content::{parse_document, ParsedDocument};
pub use nav::{parse_nav, parse_ncx, rebase_href};
pub use opf::{identifier_kind, Package};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Warning codes
pub mod warnings {
    pub const SPINE_MISSING_ITEM: &str = "spine_missing_item";
    pub const MISSING_RESOURCE: &str = "missing_resource";
    pub const TOC_MISSING: &str = "toc_missing";
    pub const TOC_UNREADABLE: &str = "toc_unreadable";
    pub const CONTENT_UNREADABLE: &str = "content_unreadable";
}

/// A decoded EPUB held in memory
pub struct EpubBook {
    entries: HashMap<String, Vec<u8>>,
    /// Archive directory of the package document, `.` at the root
    package_dir: String,
    outline: Vec<OutlineItem>,
    spine: Vec<SpineItem>,
    /// Converted content per reading-order entry; `None` when unreadable
    documents: Vec<Option<ParsedDocument>>,
    metadata: Metadata,
    warnings: Vec<Warning>,
    /// Package-relative href and media type of the cover image
    cover: Option<(String, String)>,
}

impl EpubBook {
    /// Parse an EPUB from raw bytes, decompressing at most
    /// [`DEFAULT_MAX_UNPACKED_BYTES`]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_limit(data, DEFAULT_MAX_UNPACKED_BYTES)
    }

    /// Parse an EPUB from raw bytes. Archives that expand beyond
    /// `max_unpacked` bytes in total are rejected.
    pub fn from_bytes_with_limit(data: &[u8], max_unpacked: u64) -> Result<Self> {
        let entries = read_entries(data, max_unpacked)?;

        let container = entries
            .get(CONTAINER_PATH)
            .ok_or_else(|| DocumentError::InvalidPackage(format!("missing {}", CONTAINER_PATH)))?;
        let package_path = opf::rootfile_path(&xml::document_text(container))
            .map_err(|e| DocumentError::xml(CONTAINER_PATH, e))?
            .map(|path| clean_path(&decode_href(&path)))
            .ok_or_else(|| DocumentError::InvalidPackage("no rootfile in container".to_string()))?;

        let package_bytes = entries.get(&package_path).ok_or_else(|| {
            DocumentError::InvalidPackage(format!("missing package document {}", package_path))
        })?;
        let package = Package::parse(&xml::document_text(package_bytes))
            .map_err(|e| DocumentError::xml(&package_path, e))?;

        let mut book = Self {
            entries,
            package_dir: parent_dir(&package_path),
            outline: Vec::new(),
            spine: Vec::new(),
            documents: Vec::new(),
            metadata: package.to_metadata(),
            warnings: Vec::new(),
            cover: None,
        };

        book.check_manifest(&package);
        book.build_spine(&package);
        book.load_documents();
        book.load_outline(&package);
        book.cover = package
            .cover_item()
            .map(|item| (package_href(&item.href), item.media_type.clone()));

        tracing::debug!(
            package = %package_path,
            documents = book.spine.len(),
            outline = book.outline.len(),
            warnings = book.warnings.len(),
            "Opened EPUB"
        );

        Ok(book)
    }

    fn entry_path(&self, href: &str) -> String {
        join_path(&self.package_dir, href)
    }

    fn entry(&self, href: &str) -> Option<&Vec<u8>> {
        self.entries.get(&self.entry_path(href))
    }

    fn warn(&mut self, code: &str, message: String, path: &str) {
        tracing::debug!(code, path, "{}", message);
        self.warnings.push(Warning::new(code, message, path));
    }

    fn check_manifest(&mut self, package: &Package) {
        for item in &package.manifest.items {
            if item.href.trim().is_empty() || item.href.contains("://") {
                continue;
            }
            let href = package_href(&item.href);
            if self.entry(&href).is_none() {
                self.warn(
                    warnings::MISSING_RESOURCE,
                    format!("manifest item {} is missing from the archive", href),
                    &href,
                );
            }
        }
    }

    fn build_spine(&mut self, package: &Package) {
        for itemref in &package.spine.itemrefs {
            let Some(item) = package.item(&itemref.idref) else {
                self.warn(
                    warnings::SPINE_MISSING_ITEM,
                    format!("spine references unknown manifest item {}", itemref.idref),
                    "",
                );
                continue;
            };
            self.spine.push(SpineItem {
                index: self.spine.len(),
                idref: itemref.idref.clone(),
                href: package_href(&item.href),
                media_type: item.media_type.clone(),
                linear: itemref.is_linear(),
            });
        }
    }

    fn load_documents(&mut self) {
        let mut documents = Vec::with_capacity(self.spine.len());
        let mut failures = Vec::new();

        for item in &self.spine {
            let Some(bytes) = self.entry(&item.href) else {
                // Already reported as a missing manifest item
                documents.push(None);
                continue;
            };
            if !is_markup(&item.media_type) {
                documents.push(Some(ParsedDocument::default()));
                continue;
            }
            match parse_document(&xml::document_text(bytes), &item.href) {
                Ok(document) => documents.push(Some(document)),
                Err(e) => {
                    failures.push((item.href.clone(), e.to_string()));
                    documents.push(None);
                }
            }
        }

        self.documents = documents;
        for (href, message) in failures {
            self.warn(warnings::CONTENT_UNREADABLE, message, &href);
        }
    }

    /// Outline from the EPUB 3 navigation document, else the NCX
    fn load_outline(&mut self, package: &Package) {
        let (href, is_nav) = match (package.nav_item(), package.ncx_item()) {
            (Some(nav), _) => (package_href(&nav.href), true),
            (None, Some(ncx)) => (package_href(&ncx.href), false),
            (None, None) => {
                self.warn(
                    warnings::TOC_MISSING,
                    "no navigation document or NCX".to_string(),
                    "",
                );
                return;
            }
        };

        let Some(bytes) = self.entry(&href) else {
            self.warn(
                warnings::TOC_UNREADABLE,
                format!("table of contents {} is missing", href),
                &href,
            );
            return;
        };
        let text = xml::document_text(bytes);
        let parsed = if is_nav {
            parse_nav(&text, &href)
        } else {
            parse_ncx(&text, &href)
        };

        match parsed {
            Ok(outline) => self.outline = outline,
            Err(e) => {
                let message = e.to_string();
                self.warn(warnings::TOC_UNREADABLE, message, &href);
            }
        }
    }
}

impl Publication for EpubBook {
    fn outline(&self) -> &[OutlineItem] {
        &self.outline
    }

    fn reading_order(&self) -> &[SpineItem] {
        &self.spine
    }

    fn resolve_anchor(&self, target: &str) -> Option<AnchorRef> {
        let (path, fragment) = target.split_once('#').unwrap_or((target, ""));
        let spine_index = self.spine.iter().position(|item| item.href == path)?;
        if fragment.is_empty() {
            return Some(AnchorRef {
                spine_index,
                block_index: 0,
            });
        }
        let block_index = self.documents.get(spine_index)?.as_ref()?.anchor(fragment)?;
        Some(AnchorRef {
            spine_index,
            block_index,
        })
    }

    fn chunks(&self, options: &ChunkingOptions) -> Result<Vec<Chunk>> {
        let documents: Vec<Option<&[Block]>> = self
            .documents
            .iter()
            .map(|document| document.as_ref().map(|d| d.blocks.as_slice()))
            .collect();
        chunk_documents(&documents, options)
    }

    fn blocks(&self, spine_index: usize) -> Result<Vec<Block>> {
        let item = self
            .spine
            .get(spine_index)
            .ok_or(DocumentError::DocumentNotFound(spine_index))?;
        self.documents
            .get(spine_index)
            .and_then(Option::as_ref)
            .map(|document| document.blocks.clone())
            .ok_or_else(|| DocumentError::InvalidContent(format!("{} could not be read", item.href)))
    }

    fn open_resource(&self, path: &str) -> Result<Vec<u8>> {
        self.entry(path)
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
        let (href, media_type) = self.cover.as_ref()?;
        let bytes = self.entry(href)?.clone();
        let content_type = if media_type.is_empty() {
            mime_guess::from_path(href)
                .first_raw()
                .unwrap_or_default()
                .to_string()
        } else {
            media_type.clone()
        };
        Some(Cover {
            content_type,
            bytes,
        })
    }
}

/// Read every file entry of the archive into memory.
///
/// Declared entry sizes are not trusted: output is counted as it is
/// decompressed and reading stops once `budget` bytes are exceeded.
fn read_entries(data: &[u8], budget: u64) -> Result<HashMap<String, Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut entries = HashMap::new();
    let mut remaining = budget;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if !file.is_file() {
            continue;
        }
        let name = clean_path(file.name());
        let mut content = Vec::new();
        if let Err(e) = file
            .by_ref()
            .take(remaining.saturating_add(1))
            .read_to_end(&mut content)
        {
            tracing::debug!(entry = %name, "Skipping unreadable archive entry: {}", e);
            continue;
        }
        let size = content.len() as u64;
        if size > remaining {
            return Err(DocumentError::InvalidPackage(format!(
                "archive expands beyond {} bytes",
                budget
            )));
        }
        remaining -= size;
        entries.insert(name, content);
    }

    Ok(entries)
}

/// Manifest href to a decoded package-relative path
fn package_href(raw: &str) -> String {
    let raw = raw.trim();
    let raw = raw.split('#').next().unwrap_or(raw);
    clean_path(&decode_href(raw))
}

fn is_markup(media_type: &str) -> bool {
    let media_type = media_type.to_ascii_lowercase();
    media_type.is_empty() || media_type.contains("html") || media_type.contains("xml")
}
