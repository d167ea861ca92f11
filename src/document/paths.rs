//! Package path helpers
//!
//! Paths inside a publication are slash-separated regardless of platform.

/// Directory part of a slash-separated path, `.` when there is none
pub fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => clean_path(&path[..idx]),
        None => ".".to_string(),
    }
}

/// Join `relative` under `dir` and canonicalize the result
pub fn join_path(dir: &str, relative: &str) -> String {
    if dir.is_empty() || dir == "." {
        clean_path(relative)
    } else {
        clean_path(&format!("{}/{}", dir, relative))
    }
}

/// Lexically canonicalize a slash-separated path: collapse repeated
/// separators, drop `.` segments and resolve `..` against earlier segments.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Percent-decode an href, keeping it unchanged when it is not valid UTF-8
pub fn decode_href(href: &str) -> String {
    urlencoding::decode(href)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| href.to_string())
}
