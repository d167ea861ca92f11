//! Outline flattening
//!
//! Turns the hierarchical outline into a flat, pre-order list of sections.
//! The `order_index` assigned here is the identity every other stage uses.

use crate::document::{OutlineItem, SpineItem};

/// A node of the flattened outline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    /// Dense, 0-based pre-order position
    pub order_index: usize,
    /// Nesting level in the outline, 0 for roots
    pub depth: usize,
    pub parent_order_index: Option<usize>,
    /// Raw `path#fragment` target, empty when the entry points nowhere
    pub target: String,
    /// `target` before the first `#`
    pub href: String,
    /// `target` after the first `#`
    pub anchor: String,
}

impl Section {
    fn new(
        title: &str,
        target: &str,
        depth: usize,
        parent_order_index: Option<usize>,
        order_index: usize,
    ) -> Self {
        let (href, anchor) = split_target(target);
        Self {
            title: title.trim().to_string(),
            order_index,
            depth,
            parent_order_index,
            target: target.to_string(),
            href: href.to_string(),
            anchor: anchor.to_string(),
        }
    }
}

/// Split a target reference at the first `#`
pub fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('#') {
        Some((href, anchor)) => (href, anchor),
        None => (target, ""),
    }
}

/// Flatten the outline, or synthesize one section per reading-order entry
/// when the outline is empty.
pub fn flatten_outline(outline: &[OutlineItem], reading_order: &[SpineItem]) -> Vec<Section> {
    let mut sections = Vec::new();
    if !outline.is_empty() {
        flatten_into(outline, &mut sections, 0, None);
    }

    if sections.is_empty() {
        sections = reading_order
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let title = if item.href.is_empty() {
                    format!("Section {}", i + 1)
                } else {
                    item.href.clone()
                };
                Section::new(&title, &item.href, 0, None, i)
            })
            .collect();
    }

    for (i, section) in sections.iter_mut().enumerate() {
        section.order_index = i;
        if section.title.is_empty() {
            section.title = format!("Section {}", i + 1);
        }
    }

    sections
}

fn flatten_into(
    items: &[OutlineItem],
    out: &mut Vec<Section>,
    depth: usize,
    parent: Option<usize>,
) {
    for item in items {
        let order_index = out.len();
        out.push(Section::new(&item.label, item.target(), depth, parent, order_index));
        if !item.children.is_empty() {
            flatten_into(&item.children, out, depth + 1, Some(order_index));
        }
    }
}
