//! Pure splitter for raw page references: trailing section fragment, inline
//! query string, and length capping. No I/O; input without special syntax
//! passes through untouched.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest title forwarded to the remote; MediaWiki's own limit is 255
/// bytes, so anything beyond this cannot be a real page anyway.
pub const MAX_TITLE_LEN: usize = 250;

/// A `?key=` pattern marks the start of an inline query string.
static QUERY_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?[^\s?#=&]+=").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRef {
    pub title: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
    pub truncated: bool,
}

pub fn parse_reference(raw: &str) -> ParsedRef {
    let raw = raw.trim();
    let hash = raw.find('#');
    let query_start = QUERY_START.find(raw).map(|m| m.start());

    let (title, query, fragment) = match (hash, query_start) {
        (Some(h), Some(q)) if q < h => (
            &raw[..q],
            Some(raw[q + 1..h].to_string()),
            Some(raw[h + 1..].to_string()),
        ),
        (Some(h), Some(q)) => (
            &raw[..h],
            Some(raw[q + 1..].to_string()),
            Some(raw[h + 1..q].to_string()),
        ),
        (Some(h), None) => (&raw[..h], None, Some(raw[h + 1..].to_string())),
        (None, Some(q)) => (&raw[..q], Some(raw[q + 1..].to_string()), None),
        (None, None) => (raw, None, None),
    };

    let title = title.trim();
    let (title, truncated) = if title.chars().count() > MAX_TITLE_LEN {
        let cut: String = title.chars().take(MAX_TITLE_LEN).collect();
        (cut.trim_end().to_string(), true)
    } else {
        (title.to_string(), false)
    };

    ParsedRef {
        title,
        query: query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
        fragment: fragment.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()),
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_title_passes_through() {
        let parsed = parse_reference("Main Page");
        assert_eq!(parsed.title, "Main Page");
        assert_eq!(parsed.query, None);
        assert_eq!(parsed.fragment, None);
        assert!(!parsed.truncated);
    }

    #[test]
    fn fragment_after_hash() {
        let parsed = parse_reference("Help#Editing");
        assert_eq!(parsed.title, "Help");
        assert_eq!(parsed.fragment.as_deref(), Some("Editing"));
    }

    #[test]
    fn inline_query_string() {
        let parsed = parse_reference("Help?action=history");
        assert_eq!(parsed.title, "Help");
        assert_eq!(parsed.query.as_deref(), Some("action=history"));
    }

    #[test]
    fn segment_order_does_not_matter() {
        let a = parse_reference("Help?action=history#Notes");
        let b = parse_reference("Help#Notes?action=history");
        assert_eq!(a, b);
        assert_eq!(a.title, "Help");
        assert_eq!(a.query.as_deref(), Some("action=history"));
        assert_eq!(a.fragment.as_deref(), Some("Notes"));
    }

    #[test]
    fn bare_question_mark_is_part_of_the_title() {
        let parsed = parse_reference("Who? What? Where?");
        assert_eq!(parsed.title, "Who? What? Where?");
        assert_eq!(parsed.query, None);
    }

    #[test]
    fn long_title_is_capped_and_flagged() {
        let long = "x".repeat(MAX_TITLE_LEN + 40);
        let parsed = parse_reference(&long);
        assert!(parsed.truncated);
        assert_eq!(parsed.title.chars().count(), MAX_TITLE_LEN);
    }

    #[test]
    fn empty_fragment_is_dropped() {
        let parsed = parse_reference("Help#");
        assert_eq!(parsed.title, "Help");
        assert_eq!(parsed.fragment, None);
    }
}
