//! quick-xml event reader helpers
//!
//! XHTML in the wild carries HTML named entities (`&nbsp;`, `&mdash;`) that
//! XML unescaping rejects, so text and attribute values are decoded with
//! `html-escape` instead.

use std::borrow::Cow;

use quick_xml::events::BytesStart;
use quick_xml::Reader;

/// Lenient reader: whitespace kept, `<x/>` reported as start + end,
/// mismatched end tags tolerated
pub fn reader(content: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(content);
    reader
        .trim_text(false)
        .expand_empty_elements(true)
        .check_end_names(false);
    reader
}

/// Lowercased local name of an element
pub fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

/// Decoded value of the attribute whose local name is `name`
pub fn attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref().eq_ignore_ascii_case(name.as_bytes()))
        .map(|attr| decode_text(&attr.value))
}

/// UTF-8 text with HTML entities resolved
pub fn decode_text(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    match html_escape::decode_html_entities(&text) {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Strip a UTF-8 byte order mark and decode, replacing invalid sequences
pub fn document_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}

/// Collapse whitespace runs into single spaces and trim
pub fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
