// src/document/segmenter.rs
// Single global pattern pass over a heading-annotated document. Headings
// look like "1. Title", "1.1 Title" or "1.1.1 Title" at the start of a
// line; a section's content runs until the next heading of depth <= its own.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{DocumentError, Section};

static HEADING: Lazy<Regex> = Lazy::new(|| {
    // A top-level heading needs its trailing dot ("1. Title") so a body
    // line like "10 users max" is not mistaken for a heading; dotted ids
    // ("1.1 Title") are unambiguous on their own. Ids are capped at three
    // segments so a line like "192.168.1.1 is the server" stays body text.
    Regex::new(r"(?m)^[ \t]*(?P<id>\d+(?:\.\d+){0,2})(?P<dot>\.)?[ \t]+(?P<title>\S[^\r\n]*)")
        .expect("heading pattern")
});

/// Carve a document into ordered sections.
///
/// Duplicate ids keep the first occurrence; later ones are ignored so the
/// uniqueness invariant holds even for sloppy documents.
pub fn segment(document: &str) -> Result<Vec<Section>, DocumentError> {
    if document.trim().is_empty() {
        return Err(DocumentError::EmptyDocument);
    }

    let mut headings: Vec<(String, String, usize, usize)> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for caps in HEADING.captures_iter(document) {
        let id = caps["id"].to_string();
        if !id.contains('.') && caps.name("dot").is_none() {
            continue;
        }
        if seen.contains(&id) {
            continue;
        }
        let depth = id.split('.').count() + 1;
        let start = caps.get(0).expect("match 0").start();
        seen.push(id.clone());
        headings.push((id, caps["title"].trim().to_string(), depth, start));
    }

    if headings.is_empty() {
        return Err(DocumentError::NoSectionsFound);
    }

    let mut sections = Vec::with_capacity(headings.len());
    for (i, (id, title, depth, start)) in headings.iter().enumerate() {
        let end = headings[i + 1..]
            .iter()
            .find(|(_, _, d, _)| d <= depth)
            .map(|(_, _, _, s)| *s)
            .unwrap_or(document.len());
        sections.push(Section {
            id: id.clone(),
            title: title.clone(),
            depth: *depth,
            start: *start,
            end,
        });
    }

    debug!(sections = sections.len(), "segmented requirement document");
    Ok(sections)
}

/// Parent pointers by dotted prefix. A parent id maps to `Some` only when
/// that section actually exists in the input set.
pub fn parent_map(sections: &[Section]) -> HashMap<String, Option<String>> {
    sections
        .iter()
        .map(|s| {
            let parent = s
                .parent_id()
                .filter(|p| sections.iter().any(|other| &other.id == p));
            (s.id.clone(), parent)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
1. Login
intro text
1.1 Form fields
username and password
1.2 Validation
rules here
2. Registration
reg text
";

    #[test]
    fn content_ranges_end_at_next_shallower_heading() {
        let sections = segment(DOC).unwrap();
        let ids: Vec<_> = sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "1.1", "1.2", "2"]);

        let login = &sections[0];
        assert!(login.content(DOC).contains("1.2 Validation"));
        assert!(!login.content(DOC).contains("Registration"));

        let fields = &sections[1];
        assert!(fields.content(DOC).contains("username"));
        assert!(!fields.content(DOC).contains("rules"));
    }

    #[test]
    fn ids_are_unique_and_parents_resolve() {
        let doc = "1. A\n1.1 B\n1.1 B again\n1.1.2 C\n";
        let sections = segment(doc).unwrap();
        let ids: Vec<_> = sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "1.1", "1.1.2"]);

        let parents = parent_map(&sections);
        assert_eq!(parents["1"], None);
        assert_eq!(parents["1.1"], Some("1".to_string()));
        assert_eq!(parents["1.1.2"], Some("1.1".to_string()));
    }

    #[test]
    fn missing_parent_maps_to_root() {
        let doc = "2.3 Orphan\nbody\n";
        let sections = segment(doc).unwrap();
        let parents = parent_map(&sections);
        assert_eq!(parents["2.3"], None);
    }

    #[test]
    fn dotted_body_lines_are_not_headings() {
        let doc = "\
1. Setup
192.168.1.1 is the server address
1.1 Accounts
account table
";
        let sections = segment(doc).unwrap();
        let ids: Vec<_> = sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "1.1"]);
        assert!(sections[0].content(doc).contains("192.168.1.1"));
    }

    #[test]
    fn no_headings_is_signalled() {
        assert!(matches!(
            segment("free form prose without numbering"),
            Err(DocumentError::NoSectionsFound)
        ));
    }

    #[test]
    fn empty_document_is_fatal() {
        assert!(matches!(segment("  \n "), Err(DocumentError::EmptyDocument)));
    }
}
