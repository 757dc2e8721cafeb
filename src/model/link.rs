//! Embedded-link matching
//!
//! A board issue is tied to its source ticket only through the ticket URL
//! written into the issue description. A plain substring test would pair
//! `https://src/r/1` with a description mentioning `https://src/r/10`, so a
//! match also requires the URL to end at a boundary.

/// Characters that can continue a URL path, query or fragment
fn continues_url(c: char) -> bool {
    c.is_alphanumeric() || "-_/~%#?&=+@:".contains(c)
}

/// Check whether `text` contains `url` as a complete link.
///
/// The character following the URL must not continue it. A trailing `.` or
/// `,` counts as punctuation unless it is followed by another URL character.
pub fn contains_link(text: &str, url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    text.match_indices(url).any(|(start, _)| {
        let mut rest = text[start + url.len()..].chars();
        match rest.next() {
            None => true,
            Some('.') | Some(',') => !rest.next().is_some_and(continues_url),
            Some(c) => !continues_url(c),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_surrounded_links() {
        assert!(contains_link("https://src/r/1", "https://src/r/1"));
        assert!(contains_link("Source: https://src/r/1\n\nbody", "https://src/r/1"));
        assert!(contains_link("(https://src/r/1)", "https://src/r/1"));
        assert!(contains_link("see https://src/r/1.", "https://src/r/1"));
    }

    #[test]
    fn test_longer_link_does_not_match() {
        assert!(!contains_link("https://src/r/10", "https://src/r/1"));
        assert!(!contains_link("https://src/r/1/comments", "https://src/r/1"));
        assert!(!contains_link("https://src/r/1.5", "https://src/r/1"));
    }

    #[test]
    fn test_later_occurrence_can_match() {
        assert!(contains_link(
            "https://src/r/10 duplicates https://src/r/1",
            "https://src/r/1"
        ));
    }

    #[test]
    fn test_empty_url_never_matches() {
        assert!(!contains_link("anything", ""));
    }
}
