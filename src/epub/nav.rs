//! Outline parsing
//!
//! EPUB 3 navigation documents (`nav[epub:type=toc]`) and EPUB 2 NCX
//! (`navMap/navPoint`). Targets are rebased from the location of the
//! navigation file to package-relative paths.

use quick_xml::events::Event;

use crate::document::paths::{decode_href, join_path, parent_dir};
use crate::document::{DocumentError, OutlineItem, Result};

use super::xml::{attribute, decode_text, element_name, normalize_space, reader};

/// Rebase an href found in the file at `base_href` (package-relative).
///
/// A fragment-only href points into the navigation file itself. External
/// links are returned unchanged.
pub fn rebase_href(base_href: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() || href.contains("://") {
        return href.to_string();
    }
    let (path, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    };
    let path = if path.is_empty() {
        base_href.to_string()
    } else {
        join_path(&parent_dir(base_href), &decode_href(path))
    };
    match fragment {
        Some(fragment) if !fragment.is_empty() => format!("{}#{}", path, fragment),
        _ => path,
    }
}

#[derive(Default)]
struct Entry {
    label: String,
    href: String,
    children: Vec<OutlineItem>,
}

impl Entry {
    fn finish(self) -> OutlineItem {
        let nested_target = if self.href.is_empty() {
            self.children
                .iter()
                .map(OutlineItem::target)
                .find(|target| !target.is_empty())
                .map(str::to_string)
        } else {
            None
        };
        OutlineItem {
            label: normalize_space(&self.label),
            href: self.href,
            nested_target,
            children: self.children,
        }
    }
}

/// Parse the table of contents of an EPUB 3 navigation document.
///
/// The `nav` whose `epub:type` includes `toc` is used; when none is typed,
/// the first `nav` is.
pub fn parse_nav(content: &str, nav_href: &str) -> Result<Vec<OutlineItem>> {
    let typed = parse_nav_element(content, nav_href, true)?;
    if !typed.is_empty() {
        return Ok(typed);
    }
    parse_nav_element(content, nav_href, false)
}

fn parse_nav_element(content: &str, nav_href: &str, toc_only: bool) -> Result<Vec<OutlineItem>> {
    let mut reader = reader(content);

    // Depth of the element stack while inside the selected nav
    let mut nav_depth: Option<usize> = None;
    let mut depth = 0usize;
    let mut done = false;
    // Open `li` entries; the bottom one collects top-level items
    let mut stack: Vec<Entry> = vec![Entry::default()];
    let mut label_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = element_name(&e);
                if nav_depth.is_none() {
                    if name == "nav" && !done {
                        let is_toc = attribute(&e, "type")
                            .is_some_and(|t| t.split_whitespace().any(|t| t == "toc"));
                        if is_toc || !toc_only {
                            nav_depth = Some(depth);
                        }
                    }
                    continue;
                }
                match name.as_str() {
                    "li" => stack.push(Entry::default()),
                    "a" | "span" if stack.len() > 1 => {
                        label_depth += 1;
                        if let Some(entry) = stack.last_mut() {
                            if entry.href.is_empty() {
                                if let Some(href) = attribute(&e, "href") {
                                    entry.href = rebase_href(nav_href, &href);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if label_depth > 0 {
                    if let Some(entry) = stack.last_mut() {
                        entry.label.push_str(&decode_text(&e));
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if label_depth > 0 {
                    if let Some(entry) = stack.last_mut() {
                        entry.label.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
            }
            Ok(Event::End(e)) => {
                if let Some(open) = nav_depth {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                    if depth == open {
                        nav_depth = None;
                        done = true;
                    } else {
                        match name.as_str() {
                            "li" if stack.len() > 1 => {
                                if let Some(entry) = stack.pop() {
                                    let item = entry.finish();
                                    if let Some(parent) = stack.last_mut() {
                                        parent.children.push(item);
                                    }
                                }
                            }
                            "a" | "span" if label_depth > 0 => label_depth -= 1,
                            _ => {}
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocumentError::xml(nav_href, e)),
            _ => {}
        }
        if done {
            break;
        }
    }

    // Unclosed entries
    while stack.len() > 1 {
        if let Some(entry) = stack.pop() {
            let item = entry.finish();
            if let Some(parent) = stack.last_mut() {
                parent.children.push(item);
            }
        }
    }
    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}

/// Parse an EPUB 2 NCX `navMap`.
pub fn parse_ncx(content: &str, ncx_href: &str) -> Result<Vec<OutlineItem>> {
    let mut reader = reader(content);

    let mut stack: Vec<Entry> = vec![Entry::default()];
    let mut in_label = false;
    let mut in_text = false;
    let mut in_nav_map = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match element_name(&e).as_str() {
                "navmap" => in_nav_map = true,
                "navpoint" if in_nav_map => stack.push(Entry::default()),
                "navlabel" => in_label = true,
                "text" if in_label => in_text = true,
                "content" if stack.len() > 1 => {
                    if let (Some(src), Some(entry)) = (attribute(&e, "src"), stack.last_mut()) {
                        if entry.href.is_empty() {
                            entry.href = rebase_href(ncx_href, &src);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    if let Some(entry) = stack.last_mut() {
                        entry.label.push_str(&decode_text(&e));
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if in_text {
                    if let Some(entry) = stack.last_mut() {
                        entry.label.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
            }
            Ok(Event::End(e)) => {
                match String::from_utf8_lossy(e.local_name().as_ref())
                    .to_ascii_lowercase()
                    .as_str()
                {
                    "navmap" => in_nav_map = false,
                    "navlabel" => in_label = false,
                    "text" => in_text = false,
                    "navpoint" if stack.len() > 1 => {
                        if let Some(entry) = stack.pop() {
                            let item = entry.finish();
                            if let Some(parent) = stack.last_mut() {
                                parent.children.push(item);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocumentError::xml(ncx_href, e)),
            _ => {}
        }
    }

    while stack.len() > 1 {
        if let Some(entry) = stack.pop() {
            let item = entry.finish();
            if let Some(parent) = stack.last_mut() {
                parent.children.push(item);
            }
        }
    }
    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}
