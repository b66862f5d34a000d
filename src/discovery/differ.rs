//! Incremental snapshot diffing for infinite-scroll pages.
//!
//! Each scroll on the same page returns the whole, ever-growing text. Feeding
//! only the newly appended lines to the extractor keeps prompts small and
//! stops already-seen items from being emitted again.

use similar::{Algorithm, DiffTag, capture_diff_slices};
use std::collections::HashMap;
use tracing::debug;

/// Lines of `current` that are not in `previous`, in order, joined by `\n`.
///
/// Removed lines are ignored; a replaced line counts as added. Without a
/// previous snapshot the whole of `current` is returned.
pub fn diff_added_lines(previous: Option<&str>, current: &str) -> String {
    let Some(previous) = previous else {
        return current.to_string();
    };

    let old: Vec<&str> = previous.lines().collect();
    let new: Vec<&str> = current.lines().collect();

    let mut added: Vec<&str> = Vec::new();
    for op in capture_diff_slices(Algorithm::Myers, &old, &new) {
        let (tag, _old_range, new_range) = op.as_tag_tuple();
        if matches!(tag, DiffTag::Insert | DiffTag::Replace) {
            added.extend_from_slice(&new[new_range]);
        }
    }
    added.join("\n")
}

/// Remembers the last full snapshot per page URL.
#[derive(Debug, Default)]
pub struct IncrementalDiffer {
    snapshots: HashMap<String, String>,
}

impl IncrementalDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the extractor input for a fresh observation of `url`.
    ///
    /// Returns the delta against the remembered snapshot when this is a
    /// same-page scroll continuation, the full text otherwise. The remembered
    /// snapshot is replaced by `current` either way.
    pub fn prepare(&mut self, url: &str, current: &str, same_page_scroll: bool) -> String {
        let previous = self.snapshots.get(url).map(String::as_str);
        let input = match (same_page_scroll, previous) {
            (true, Some(prev)) => {
                let delta = diff_added_lines(Some(prev), current);
                debug!(
                    %url,
                    full_bytes = current.len(),
                    delta_bytes = delta.len(),
                    "Using incremental delta"
                );
                delta
            }
            _ => current.to_string(),
        };
        self.snapshots.insert(url.to_string(), current.to_string());
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_observation_is_full_text() {
        assert_eq!(diff_added_lines(None, "a\nb"), "a\nb");
    }

    #[test]
    fn test_identical_snapshots_yield_empty() {
        let s = "one\ntwo\nthree\n";
        assert_eq!(diff_added_lines(Some(s), s), "");
    }

    #[test]
    fn test_appended_lines_in_order() {
        let s1 = "header\nitem 1\nitem 2";
        let s2 = "header\nitem 1\nitem 2\nitem 3\nitem 4";
        assert_eq!(diff_added_lines(Some(s1), s2), "item 3\nitem 4");
    }

    #[test]
    fn test_trailing_newline_does_not_leak_last_line() {
        let s1 = "a\nb";
        let s2 = "a\nb\nc\n";
        assert_eq!(diff_added_lines(Some(s1), s2), "c");
    }

    #[test]
    fn test_removed_lines_are_ignored() {
        let s1 = "banner\nitem 1\nitem 2";
        let s2 = "item 1\nitem 2\nitem 3";
        assert_eq!(diff_added_lines(Some(s1), s2), "item 3");
    }

    #[test]
    fn test_modified_line_counts_as_added() {
        let s1 = "item 1\n3 comments\nitem 2";
        let s2 = "item 1\n4 comments\nitem 2";
        assert_eq!(diff_added_lines(Some(s1), s2), "4 comments");
    }

    #[test]
    fn test_differ_uses_delta_only_for_scroll() {
        let mut differ = IncrementalDiffer::new();
        let url = "https://example.com/blog";

        assert_eq!(differ.prepare(url, "a\nb", true), "a\nb");
        assert_eq!(differ.prepare(url, "a\nb\nc", true), "c");
        // non-scroll observation gets the full text but still updates memory
        assert_eq!(differ.prepare(url, "a\nb\nc\nd", false), "a\nb\nc\nd");
        assert_eq!(differ.prepare(url, "a\nb\nc\nd\ne", true), "e");
    }

    #[test]
    fn test_differ_keys_by_url() {
        let mut differ = IncrementalDiffer::new();
        differ.prepare("https://a.example", "x\ny", true);
        assert_eq!(differ.prepare("https://b.example", "x\ny\nz", true), "x\ny\nz");
    }
}
