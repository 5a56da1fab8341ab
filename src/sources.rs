//! Repository sources and list-valued arguments
//!
//! A source list is a `;`-separated string of items of the form
//! `<local path>[?path=<p>&label=<l>&since=<ts>&until=<ts>]`, with the query
//! form-urlencoded. An item naming a regular file is replaced by the source
//! list stored in that file, where line breaks separate items like `;`.

use crate::error::SourceError;
use crate::types::{TimeRange, parse_timestamp};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use url::form_urlencoded;

/// Separator of list-valued arguments and source lists
pub const LIST_DELIMITER: char = ';';

/// Source lists may reference files that reference files; stop eventually
const MAX_LIST_DEPTH: usize = 8;

/// One repository to scrape, with its per-entry overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoSource {
    pub location: PathBuf,
    pub paths: Vec<String>,
    pub labels: Vec<String>,
    /// More than one value means the entry's lower bound is ignored
    pub since: Vec<String>,
    /// More than one value means the entry's upper bound is ignored
    pub until: Vec<String>,
}

/// Drop duplicates, keeping first occurrences in order
pub fn dedup_preserving_order<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut unique: Vec<String> = Vec::new();
    for item in items {
        let item = item.into();
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

/// Split a `;`-separated list into trimmed, non-empty, unique items
pub fn split_list(input: &str) -> Vec<String> {
    dedup_preserving_order(
        input
            .split(LIST_DELIMITER)
            .map(str::trim)
            .filter(|item| !item.is_empty()),
    )
}

/// Read a list file; each line break acts as a separator
fn read_list_file(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path)
        .map(|content| content.replace(['\n', '\r'], ";"))
        .map_err(|e| SourceError::ListUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Expand `~` and `~/...` to the home directory
fn expand_home(location: &str) -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        if location == "~" {
            return home;
        }
        if let Some(rest) = location.strip_prefix("~/") {
            return home.join(rest);
        }
    }
    PathBuf::from(location)
}

/// Parse a list-valued argument such as `--paths` or `--labels`
///
/// Items naming an existing file are replaced by the items listed in it.
pub fn expand_list_arg(input: &str) -> Vec<String> {
    expand_list_arg_at(input, 0)
}

fn expand_list_arg_at(input: &str, depth: usize) -> Vec<String> {
    let mut items = Vec::new();
    for item in split_list(input) {
        let path = Path::new(&item);
        if depth < MAX_LIST_DEPTH && path.is_file() {
            match read_list_file(path) {
                Ok(content) => items.extend(expand_list_arg_at(&content, depth + 1)),
                Err(e) => tracing::warn!("{}; ignoring", e),
            }
        } else {
            items.push(item);
        }
    }
    dedup_preserving_order(items)
}

/// Parse one source item
///
/// Query values are percent-decoded and `+` reads as a space. Blank values
/// and unknown keys are ignored.
pub fn parse_source(item: &str) -> Result<RepoSource, SourceError> {
    let item = item.trim();
    let (location, query) = match item.split_once('?') {
        Some((location, query)) => (location.trim(), query),
        None => (item, ""),
    };

    if location.is_empty() {
        return Err(SourceError::Malformed(item.to_string()));
    }

    let mut source = RepoSource {
        location: expand_home(location),
        ..RepoSource::default()
    };

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let target = match key.trim() {
            "path" => &mut source.paths,
            "label" => &mut source.labels,
            "since" => &mut source.since,
            "until" => &mut source.until,
            other => {
                tracing::debug!("Ignoring unknown source parameter '{}' in '{}'", other, item);
                continue;
            }
        };
        if !target.iter().any(|v| v == value) {
            target.push(value.to_string());
        }
    }

    Ok(source)
}

/// Parse a source list, expanding source files
///
/// Malformed items are logged and skipped; exact duplicates are dropped.
pub fn parse_sources(input: &str) -> Vec<RepoSource> {
    parse_sources_at(input, 0)
}

fn parse_sources_at(input: &str, depth: usize) -> Vec<RepoSource> {
    let mut sources: Vec<RepoSource> = Vec::new();

    for item in split_list(input) {
        let source = match parse_source(&item) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("{}; ignoring", e);
                continue;
            }
        };

        let nested = if source.location.is_file() {
            if depth >= MAX_LIST_DEPTH {
                tracing::warn!(
                    "Source list '{}' nests too deeply; ignoring",
                    source.location.display()
                );
                continue;
            }
            match read_list_file(&source.location) {
                Ok(content) => parse_sources_at(&content, depth + 1),
                Err(e) => {
                    tracing::warn!("{}; ignoring", e);
                    continue;
                }
            }
        } else {
            vec![source.clone()]
        };

        // Parameters on a file item apply to every entry read from it
        for mut entry in nested {
            entry.paths = dedup_preserving_order(entry.paths.iter().chain(&source.paths).cloned());
            entry.labels = dedup_preserving_order(entry.labels.iter().chain(&source.labels).cloned());
            if !sources.contains(&entry) {
                sources.push(entry);
            }
        }
    }

    sources
}

/// Pick the entry-level bound if exactly one valid value was given
fn override_bound(
    values: &[String],
    default: DateTime<Utc>,
    descriptor: &str,
    location: &Path,
) -> DateTime<Utc> {
    match values {
        [] => default,
        [value] => parse_timestamp(value).unwrap_or_else(|e| {
            tracing::warn!(
                "{} for '{}' {}; using the run default",
                e,
                location.display(),
                descriptor
            );
            default
        }),
        _ => {
            tracing::warn!(
                "Too many '{}' timestamps for '{}'; using the run default",
                descriptor,
                location.display()
            );
            default
        }
    }
}

impl RepoSource {
    /// Run-wide paths followed by this entry's, or `["."]` when there are none
    pub fn effective_paths(&self, global: &[String]) -> Vec<String> {
        let paths = dedup_preserving_order(global.iter().chain(&self.paths).cloned());
        if paths.is_empty() {
            vec![".".to_string()]
        } else {
            paths
        }
    }

    /// Run-wide labels followed by this entry's
    pub fn effective_labels(&self, global: &[String]) -> Vec<String> {
        dedup_preserving_order(global.iter().chain(&self.labels).cloned())
    }

    /// Commit window for this entry, falling back to the run default
    pub fn time_range(&self, default: &TimeRange) -> TimeRange {
        let since = override_bound(&self.since, default.since, "since", &self.location);
        let until = override_bound(&self.until, default.until, "until", &self.location);
        TimeRange::new(since, until).unwrap_or_else(|e| {
            tracing::warn!("{} for '{}'; using the run default", e, self.location.display());
            *default
        })
    }
}
