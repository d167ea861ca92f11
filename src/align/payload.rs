//! Wire payloads
//!
//! JSON shapes returned by `POST /parse`. Optional fields are omitted when
//! empty, zero or false.

use serde::Serialize;

use crate::document::{Identifier, Metadata, Warning};

use super::outline::Section;

fn is_zero(value: &u32) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Full parse response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub file_name: String,
    pub file_size: u64,
    pub message: String,
    pub sections: Vec<SectionPayload>,
    pub chunks: Vec<ChunkPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub section_blocks: Vec<SectionBlocksPayload>,
    pub metadata: MetadataPayload,
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<CoverPayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImagePayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPayload {
    pub title: String,
    pub order_index: usize,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_order_index: Option<usize>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub href: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub anchor: String,
}

impl From<&Section> for SectionPayload {
    fn from(section: &Section) -> Self {
        Self {
            title: section.title.clone(),
            order_index: section.order_index,
            depth: section.depth,
            parent_order_index: section.parent_order_index,
            href: section.href.clone(),
            anchor: section.anchor.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    pub section_order_index: usize,
    /// Position among the chunks owned by the same section
    pub chunk_index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    pub word_count: usize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBlocksPayload {
    pub section_order_index: usize,
    pub blocks: Vec<BlockPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPayload {
    pub kind: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub level: u32,
    #[serde(skip_serializing_if = "is_false")]
    pub ordered: bool,
    #[serde(skip_serializing_if = "is_zero")]
    pub list_index: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inlines: Vec<InlinePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TablePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figure: Option<FigurePayload>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub anchors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinePayload {
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub href: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub src: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub alt: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub width: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub height: u32,
    #[serde(skip_serializing_if = "is_false")]
    pub emph: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub strong: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePayload {
    pub rows: Vec<TableRowPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRowPayload {
    pub cells: Vec<TableCellPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCellPayload {
    pub inlines: Vec<InlinePayload>,
    #[serde(skip_serializing_if = "is_false")]
    pub header: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FigurePayload {
    pub images: Vec<InlinePayload>,
    pub caption: Vec<InlinePayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPayload {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub publisher: String,
    pub published_at: String,
    pub series: String,
    pub series_index: String,
    pub subjects: Vec<String>,
    pub identifiers: Vec<Identifier>,
}

impl From<&Metadata> for MetadataPayload {
    fn from(meta: &Metadata) -> Self {
        Self {
            title: meta.title.clone(),
            authors: meta.authors.clone(),
            language: meta.language.clone(),
            publisher: meta.publisher.clone(),
            published_at: meta.published_at.clone(),
            series: meta.series.clone(),
            series_index: meta.series_index.clone(),
            subjects: meta
                .subjects
                .iter()
                .filter(|s| !s.is_empty())
                .cloned()
                .collect(),
            identifiers: meta.identifiers.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverPayload {
    pub content_type: String,
    /// Base64 (standard alphabet)
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub href: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    /// Base64 (standard alphabet)
    pub data: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub width: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_fields_are_omitted() {
        let inline = InlinePayload {
            kind: "text".to_string(),
            text: "hi".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&inline).unwrap(),
            json!({"kind": "text", "text": "hi"})
        );

        let block = BlockPayload {
            kind: "list_item".to_string(),
            level: 1,
            ordered: true,
            list_index: 2,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"kind": "list_item", "level": 1, "ordered": true, "listIndex": 2})
        );
    }

    #[test]
    fn test_section_payload_shape() {
        let root = SectionPayload {
            title: "One".to_string(),
            order_index: 0,
            depth: 0,
            parent_order_index: None,
            href: "a.xhtml".to_string(),
            anchor: String::new(),
        };
        assert_eq!(
            serde_json::to_value(&root).unwrap(),
            json!({"title": "One", "orderIndex": 0, "depth": 0, "href": "a.xhtml"})
        );
    }

    #[test]
    fn test_metadata_drops_empty_subjects() {
        let meta = Metadata {
            subjects: vec!["Fiction".to_string(), String::new()],
            ..Default::default()
        };
        let payload = MetadataPayload::from(&meta);
        assert_eq!(payload.subjects, vec!["Fiction".to_string()]);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["publishedAt"], json!(""));
        assert_eq!(value["identifiers"], json!([]));
    }
}
