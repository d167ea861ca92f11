//! Package document (OPF) parsing
//!
//! `META-INF/container.xml` and the OPF package are deserialized with
//! quick-xml's serde support. Namespace prefixes (`dc:`, `opf:`) are
//! matched by local name.

use quick_xml::de::{from_str, DeError};
use serde::Deserialize;

use crate::document::{Identifier, Metadata};

/// Location of the package document inside the archive
pub fn rootfile_path(xml: &str) -> Result<Option<String>, DeError> {
    let container: Container = from_str(xml)?;
    Ok(container
        .rootfiles
        .rootfile
        .into_iter()
        .map(|rootfile| rootfile.full_path.trim().to_string())
        .find(|path| !path.is_empty()))
}

#[derive(Debug, Deserialize)]
struct Container {
    #[serde(default)]
    rootfiles: RootFiles,
}

#[derive(Debug, Default, Deserialize)]
struct RootFiles {
    #[serde(default)]
    rootfile: Vec<RootFile>,
}

#[derive(Debug, Deserialize)]
struct RootFile {
    #[serde(rename = "@full-path", default)]
    full_path: String,
}

/// Parsed OPF package
#[derive(Debug, Deserialize)]
pub struct Package {
    #[serde(default)]
    pub metadata: PackageMetadata,
    #[serde(default)]
    pub manifest: Manifest,
    #[serde(default)]
    pub spine: Spine,
}

impl Package {
    pub fn parse(xml: &str) -> Result<Self, DeError> {
        from_str(xml)
    }

    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.items.iter().find(|item| item.id == id)
    }

    /// EPUB 3 navigation document
    pub fn nav_item(&self) -> Option<&ManifestItem> {
        self.manifest.items.iter().find(|item| item.has_property("nav"))
    }

    /// EPUB 2 NCX: the spine's `toc` reference, else any item with the NCX type
    pub fn ncx_item(&self) -> Option<&ManifestItem> {
        self.spine
            .toc
            .as_deref()
            .and_then(|id| self.item(id))
            .or_else(|| {
                self.manifest
                    .items
                    .iter()
                    .find(|item| item.media_type == "application/x-dtbncx+xml")
            })
    }

    /// Cover image: `cover-image` property, then `<meta name="cover">`,
    /// then any image whose id mentions "cover"
    pub fn cover_item(&self) -> Option<&ManifestItem> {
        let items = &self.manifest.items;
        items
            .iter()
            .find(|item| item.has_property("cover-image"))
            .or_else(|| {
                self.metadata
                    .meta
                    .iter()
                    .find(|meta| meta.name.as_deref() == Some("cover"))
                    .and_then(|meta| meta.content.as_deref())
                    .and_then(|id| self.item(id.trim()))
            })
            .or_else(|| {
                items.iter().find(|item| {
                    item.media_type.starts_with("image/")
                        && item.id.to_lowercase().contains("cover")
                })
            })
    }

    pub fn to_metadata(&self) -> Metadata {
        let meta = &self.metadata;

        let title = meta
            .title
            .iter()
            .map(|t| t.content.trim())
            .find(|t| !t.is_empty())
            .unwrap_or_default()
            .to_string();

        let authors = meta
            .creator
            .iter()
            .filter_map(|c| c.content.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        let published_at = meta
            .date
            .iter()
            .find(|d| d.event.as_deref() == Some("publication"))
            .or_else(|| meta.date.first())
            .and_then(|d| d.content.as_deref())
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        let (series, series_index) = self.series();

        Metadata {
            title,
            authors,
            language: first_text(&meta.language),
            publisher: first_text(&meta.publisher),
            published_at,
            series,
            series_index,
            subjects: meta
                .subject
                .iter()
                .map(|s| s.content.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            identifiers: meta
                .identifier
                .iter()
                .filter_map(DcIdentifier::to_identifier)
                .collect(),
        }
    }

    /// Series name and position, from Calibre metadata or an EPUB 3 collection
    fn series(&self) -> (String, String) {
        let metas = &self.metadata.meta;
        let named = |name: &str| {
            metas
                .iter()
                .find(|m| m.name.as_deref() == Some(name))
                .and_then(|m| m.content.as_deref())
                .map(|v| v.trim().to_string())
        };

        if let Some(series) = named("calibre:series").filter(|s| !s.is_empty()) {
            return (series, named("calibre:series_index").unwrap_or_default());
        }

        let Some(collection) = metas.iter().find(|m| {
            m.property.as_deref() == Some("belongs-to-collection") && m.refines.is_none()
        }) else {
            return (String::new(), String::new());
        };
        let series = collection.text.as_deref().unwrap_or_default().trim().to_string();
        let position = collection
            .id
            .as_deref()
            .and_then(|id| {
                let refines = format!("#{}", id);
                metas.iter().find(|m| {
                    m.property.as_deref() == Some("group-position")
                        && m.refines.as_deref() == Some(refines.as_str())
                })
            })
            .and_then(|m| m.text.as_deref())
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        (series, position)
    }
}

fn first_text(elements: &[DcElement]) -> String {
    elements
        .iter()
        .map(|e| e.content.trim())
        .find(|t| !t.is_empty())
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    title: Vec<DcElement>,

    #[serde(default)]
    creator: Vec<DcCreator>,

    #[serde(default)]
    publisher: Vec<DcElement>,

    #[serde(default)]
    date: Vec<DcDate>,

    #[serde(default)]
    language: Vec<DcElement>,

    #[serde(default)]
    subject: Vec<DcElement>,

    #[serde(default)]
    identifier: Vec<DcIdentifier>,

    #[serde(default)]
    meta: Vec<OpfMeta>,
}

#[derive(Debug, Deserialize)]
struct DcElement {
    #[serde(rename = "$text", default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct DcCreator {
    #[serde(rename = "$text", default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DcDate {
    #[serde(rename = "@event", default)]
    event: Option<String>,

    #[serde(rename = "$text", default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DcIdentifier {
    #[serde(rename = "@id", default)]
    id: Option<String>,

    #[serde(rename = "@scheme", default)]
    scheme: Option<String>,

    #[serde(rename = "$text", default)]
    content: Option<String>,
}

impl DcIdentifier {
    fn to_identifier(&self) -> Option<Identifier> {
        let value = self.content.as_deref()?.trim();
        if value.is_empty() {
            return None;
        }
        let scheme = self.scheme.as_deref().unwrap_or_default().trim();
        Some(Identifier {
            id: self.id.clone().unwrap_or_default(),
            scheme: scheme.to_string(),
            value: value.to_string(),
            kind: identifier_kind(scheme, value),
        })
    }
}

/// Classify an identifier from its scheme, falling back to its value
pub fn identifier_kind(scheme: &str, value: &str) -> String {
    let scheme = scheme.to_lowercase();
    let value = value.to_lowercase();

    if scheme.contains("isbn") || value.starts_with("urn:isbn:") || value.starts_with("isbn:") {
        "isbn".to_string()
    } else if scheme.contains("uuid") || value.starts_with("urn:uuid:") {
        "uuid".to_string()
    } else if scheme.contains("doi") || value.starts_with("doi:") || value.starts_with("10.") {
        "doi".to_string()
    } else if matches!(scheme.as_str(), "uri" | "url")
        || value.starts_with("http://")
        || value.starts_with("https://")
    {
        "uri".to_string()
    } else {
        scheme
    }
}

#[derive(Debug, Deserialize)]
struct OpfMeta {
    #[serde(rename = "@name", default)]
    name: Option<String>,

    #[serde(rename = "@content", default)]
    content: Option<String>,

    #[serde(rename = "@property", default)]
    property: Option<String>,

    #[serde(rename = "@id", default)]
    id: Option<String>,

    #[serde(rename = "@refines", default)]
    refines: Option<String>,

    #[serde(rename = "$text", default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    #[serde(rename = "item", default)]
    pub items: Vec<ManifestItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestItem {
    #[serde(rename = "@id", default)]
    pub id: String,

    /// Raw href, relative to the package document
    #[serde(rename = "@href", default)]
    pub href: String,

    #[serde(rename = "@media-type", default)]
    pub media_type: String,

    #[serde(rename = "@properties", default)]
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == property))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Spine {
    #[serde(rename = "@toc", default)]
    pub toc: Option<String>,

    #[serde(rename = "itemref", default)]
    pub itemrefs: Vec<ItemRef>,
}

#[derive(Debug, Deserialize)]
pub struct ItemRef {
    #[serde(rename = "@idref", default)]
    pub idref: String,

    #[serde(rename = "@linear", default)]
    pub linear: Option<String>,
}

impl ItemRef {
    pub fn is_linear(&self) -> bool {
        self.linear.as_deref().map(str::trim) != Some("no")
    }
}
