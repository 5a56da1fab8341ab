//! Word-level diff classification
//!
//! `git log --word-diff=plain` with colour forced on wraps every inserted run of
//! words in `ESC[32m{+ ... +}ESC[m` and every deleted run in `ESC[31m[- ... -]ESC[m`.
//! The colour escapes make the markers unambiguous against source text that
//! happens to contain `{+` or `[-`.
//!
//! A line holding exactly one insertion span and nothing else is a new line; the
//! same holds for deletions. Any other mix of spans and plain text means the line
//! was edited in place.

use crate::types::ChangeCounts;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Start of an insertion span
pub const INSERT_START: &str = "\x1b[32m{+";
/// End of an insertion span
pub const INSERT_END: &str = "+}\x1b[m";
/// Start of a deletion span
pub const DELETE_START: &str = "\x1b[31m[-";
/// End of a deletion span
pub const DELETE_END: &str = "-]\x1b[m";

/// Marks the start of the per-file diff sections in a patch body
const DIFF_SECTION_MARKER: &str = "diff --git a/";

static INSERT_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[32m\{\+(.+?)\+\}\x1b\[m").expect("valid regex"));
static WHOLE_LINE_INSERT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x1b\[32m\{\+(.+?)\+\}\x1b\[m$").expect("valid regex"));
static DELETE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[31m\[-(.+?)-\]\x1b\[m").expect("valid regex"));
static WHOLE_LINE_DELETE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x1b\[31m\[-(.+?)-\]\x1b\[m$").expect("valid regex"));

/// `  path/to/file | 12 +++---` (also `| Bin 0 -> 10 bytes`)
static STAT_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(.*[^\s]+)\s+\|\s+[a-zA-Z0-9]+").expect("valid regex"));

/// Classification of a single diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Inserted,
    Deleted,
    Modified,
    /// Unchanged context, headers, hunk markers
    Context,
}

/// Classify one physical diff line
pub fn classify_line(raw: &str) -> LineKind {
    let line = raw.trim();

    let insertions = non_blank_spans(&INSERT_SPAN, line);
    let deletions = non_blank_spans(&DELETE_SPAN, line);

    match (insertions, deletions) {
        (0, 0) => LineKind::Context,
        (1, 0) if WHOLE_LINE_INSERT.is_match(line) => LineKind::Inserted,
        (0, 1) if WHOLE_LINE_DELETE.is_match(line) => LineKind::Deleted,
        _ => LineKind::Modified,
    }
}

/// Number of spans whose content is not empty or whitespace-only
fn non_blank_spans(pattern: &Regex, line: &str) -> usize {
    pattern
        .captures_iter(line)
        .filter(|caps| caps.get(1).is_some_and(|m| !m.as_str().trim().is_empty()))
        .count()
}

/// Tally inserted, deleted and modified lines over a diff body
pub fn count_changed_lines(diff_body: &str) -> ChangeCounts {
    let mut counts = ChangeCounts::default();
    for line in diff_body.lines() {
        match classify_line(line) {
            LineKind::Inserted => counts.inserted += 1,
            LineKind::Deleted => counts.deleted += 1,
            LineKind::Modified => counts.modified += 1,
            LineKind::Context => {}
        }
    }
    counts
}

/// Split a patch body into the stat summary and the per-file diff sections
pub fn split_patch(patch: &str) -> (&str, &str) {
    match patch.find(DIFF_SECTION_MARKER) {
        Some(pos) => patch.split_at(pos),
        None => (patch, ""),
    }
}

/// Distinct file names listed in a `--stat` summary
pub fn stat_filenames(stat: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    STAT_FILENAME
        .captures_iter(stat)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Files-changed count and line tallies for one commit's patch body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub num_files_changed: u64,
    pub counts: ChangeCounts,
}

/// Classify a whole patch body (stat summary followed by word diffs)
pub fn classify_patch(patch: &str) -> PatchStats {
    let (stat, diff_body) = split_patch(patch);
    PatchStats {
        num_files_changed: stat_filenames(stat).len() as u64,
        counts: count_changed_lines(diff_body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(text: &str) -> String {
        format!("{INSERT_START}{text}{INSERT_END}")
    }

    fn del(text: &str) -> String {
        format!("{DELETE_START}{text}{DELETE_END}")
    }

    #[test]
    fn test_single_insertion_span_is_inserted() {
        assert_eq!(classify_line(&ins("let x = 1;")), LineKind::Inserted);
    }

    #[test]
    fn test_insertion_with_trailing_text_is_modified() {
        let line = format!("{};", ins("let x = 1"));
        assert_eq!(classify_line(&line), LineKind::Modified);
    }

    #[test]
    fn test_insertion_with_leading_text_is_modified() {
        let line = format!("let x = {}", ins("2;"));
        assert_eq!(classify_line(&line), LineKind::Modified);
    }

    #[test]
    fn test_two_insertion_spans_are_modified() {
        let line = format!("{} {}", ins("foo"), ins("bar"));
        assert_eq!(classify_line(&line), LineKind::Modified);
    }

    #[test]
    fn test_single_deletion_span_is_deleted() {
        assert_eq!(classify_line(&del("return None;")), LineKind::Deleted);
    }

    #[test]
    fn test_deletion_mixed_with_text_is_modified() {
        let line = format!("return {}", del("None;"));
        assert_eq!(classify_line(&line), LineKind::Modified);
    }

    #[test]
    fn test_deletion_and_insertion_is_modified() {
        let line = format!("{}{}", del("old"), ins("new"));
        assert_eq!(classify_line(&line), LineKind::Modified);

        let line = format!("{} {} {}", del("a"), ins("b"), ins("c"));
        assert_eq!(classify_line(&line), LineKind::Modified);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let line = format!("    {}\t", ins("indented"));
        assert_eq!(classify_line(&line), LineKind::Inserted);
    }

    #[test]
    fn test_whitespace_only_spans_are_discarded() {
        // Only blank spans: nothing left to count
        assert_eq!(classify_line(&ins("   ")), LineKind::Context);

        // The blank deletion is dropped, but the insertion no longer spans the whole line
        let line = format!("{}{}", del(" "), ins("value"));
        assert_eq!(classify_line(&line), LineKind::Modified);
        let counts = count_changed_lines(&line);
        assert_eq!(counts.changed(), 1);
    }

    #[test]
    fn test_plain_markers_without_colour_are_context() {
        assert_eq!(classify_line("let s = \"{+not a diff+}\";"), LineKind::Context);
        assert_eq!(classify_line("x[-1-]"), LineKind::Context);
    }

    #[test]
    fn test_context_line() {
        assert_eq!(classify_line("fn main() {"), LineKind::Context);
        assert_eq!(classify_line(""), LineKind::Context);
        assert_eq!(classify_line("@@ -1,3 +1,4 @@"), LineKind::Context);
    }

    #[test]
    fn test_modified_example_counts() {
        let counts = count_changed_lines(&format!("{}{}", del("old"), ins("new")));
        assert_eq!(counts.modified, 1);
        assert_eq!(counts.inserted, 0);
        assert_eq!(counts.deleted, 0);
        assert_eq!(counts.changed(), 1);
    }

    #[test]
    fn test_empty_patch_is_all_zero() {
        let stats = classify_patch("");
        assert_eq!(stats, PatchStats::default());
        assert_eq!(stats.counts.changed(), 0);
    }

    #[test]
    fn test_stat_filenames() {
        let stat = "\n\n src/lib.rs                  | 12 \x1b[32m++++\x1b[m\x1b[31m--\x1b[m\n \
                    docs/a long name/readme.md  |  3 \x1b[32m+++\x1b[m\n \
                    assets/logo.png             | Bin 0 -> 1024 bytes\n \
                    3 files changed, 15 insertions(+), 2 deletions(-)\n\n";
        let names = stat_filenames(stat);
        assert_eq!(
            names,
            vec!["src/lib.rs", "docs/a long name/readme.md", "assets/logo.png"]
        );
    }

    #[test]
    fn test_stat_filenames_distinct() {
        let stat = " a.txt | 1 +\n a.txt | 1 +\n";
        assert_eq!(stat_filenames(stat).len(), 1);
    }

    #[test]
    fn test_classify_patch_end_to_end() {
        let patch = format!(
            "\n\n src/main.rs | 4 \x1b[32m++\x1b[m\x1b[31m-\x1b[m\n 1 file changed\n\n\
             \x1b[1mdiff --git a/src/main.rs b/src/main.rs\x1b[m\n\
             \x1b[1mindex 1111111..2222222 100644\x1b[m\n\
             \x1b[1m--- a/src/main.rs\x1b[m\n\
             \x1b[1m+++ b/src/main.rs\x1b[m\n\
             \x1b[36m@@ -1,3 +1,4 @@\x1b[m\n\
             fn main() {{\n\
             {}\n\
             {}\n\
             println!(\"{}\");\n\
             {}\n\
             }}\n",
            ins("let a = 1;"),
            del("let b = 2;"),
            format!("{}{}", del("hi"), ins("hello")),
            ins("let c = 3;"),
        );

        let stats = classify_patch(&patch);
        assert_eq!(stats.num_files_changed, 1);
        assert_eq!(stats.counts.inserted, 2);
        assert_eq!(stats.counts.deleted, 1);
        assert_eq!(stats.counts.modified, 1);
        assert_eq!(stats.counts.changed(), 4);
    }

    #[test]
    fn test_split_patch_without_diff_sections() {
        let (stat, body) = split_patch(" a | 1 +\n");
        assert_eq!(stat, " a | 1 +\n");
        assert_eq!(body, "");
    }
}
