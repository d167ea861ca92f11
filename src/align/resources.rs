//! Embedded resource resolution
//!
//! Image references found in blocks are relative to the document that
//! contains them. They are normalized into package-relative paths, fetched
//! once per request, typed, measured and base64-encoded.

use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::document::paths::{clean_path, parent_dir};
use crate::document::Publication;

use super::payload::ImagePayload;

/// Prefixes of references that never point inside the publication
const EXTERNAL_PREFIXES: &[&str] = &["http://", "https://", "data:", "//"];

/// Normalize `src` against the document at `base_href`.
///
/// Returns `None` for external references (absolute URLs, data URIs,
/// protocol-relative URLs) and for references that normalize to nothing.
/// A reference that cleans to `.` names the containing directory rather
/// than a file, so it also yields `None`.
pub fn resolve_resource_href(base_href: &str, src: &str) -> Option<String> {
    let clean = src.trim();
    if clean.is_empty() {
        return None;
    }
    let lower = clean.to_lowercase();
    if EXTERNAL_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
        return None;
    }

    let clean = clean.split('#').next().unwrap_or_default();
    let clean = clean.split('?').next().unwrap_or_default();
    let clean = clean.strip_prefix("./").unwrap_or(clean);
    let clean = clean.strip_prefix('/').unwrap_or(clean);
    if clean.is_empty() {
        return None;
    }

    let joined = if base_href.is_empty() {
        clean.to_string()
    } else {
        format!("{}/{}", parent_dir(base_href), clean)
    };

    let canonical = clean_path(&joined);
    (canonical != "." && !canonical.is_empty()).then_some(canonical)
}

/// Per-request image map
///
/// Each canonical path is fetched at most once; failures are remembered so
/// they are not retried for later references.
pub struct ResourceResolver<'a, P: Publication + ?Sized> {
    book: &'a P,
    images: BTreeMap<String, ImagePayload>,
    failed: HashSet<String>,
}

impl<'a, P: Publication + ?Sized> ResourceResolver<'a, P> {
    pub fn new(book: &'a P) -> Self {
        Self {
            book,
            images: BTreeMap::new(),
            failed: HashSet::new(),
        }
    }

    /// Fetch and decode `href` unless already done; `None` if unavailable.
    pub fn ensure(&mut self, href: &str) -> Option<&ImagePayload> {
        if !self.images.contains_key(href) && !self.failed.contains(href) {
            match self.load(href) {
                Some(image) => {
                    self.images.insert(href.to_string(), image);
                }
                None => {
                    self.failed.insert(href.to_string());
                }
            }
        }
        self.images.get(href)
    }

    fn load(&self, href: &str) -> Option<ImagePayload> {
        let data = match self.book.open_resource(href) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(href = %href, "Image resource unavailable: {}", e);
                return None;
            }
        };
        if data.is_empty() {
            tracing::debug!(href = %href, "Image resource is empty");
            return None;
        }

        let content_type = detect_content_type(href, &data);
        let (width, height) = image_dimensions(&data).unwrap_or((0, 0));

        Some(ImagePayload {
            href: href.to_string(),
            content_type,
            data: STANDARD.encode(&data),
            width,
            height,
        })
    }

    /// Images gathered so far, sorted by href
    pub fn into_images(self) -> Vec<ImagePayload> {
        self.images.into_values().collect()
    }
}

/// Content type from the file extension, falling back to sniffing the bytes
pub fn detect_content_type(href: &str, data: &[u8]) -> String {
    mime_guess::from_path(href)
        .first_raw()
        .map(str::to_string)
        .or_else(|| {
            image::guess_format(data)
                .ok()
                .map(|format| format.to_mime_type().to_string())
        })
        .unwrap_or_default()
}

/// Pixel dimensions from the image header, if the format is decodable
pub fn image_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}
