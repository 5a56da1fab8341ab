//! Splits raw `git log` output into per-commit field groups
//!
//! Every commit group starts with [`RECORD_DELIMITER`] and holds the header
//! fields of [`HEADER_PLACEHOLDERS`] followed by the stat + patch body, all
//! separated by [`FIELD_DELIMITER`]. Both delimiters are runs of ASCII
//! record/unit separator control characters, which do not occur in commit text.

use crate::error::ParseError;
use std::borrow::Cow;

/// Separates header fields (and the trailing patch body) within one commit
pub const FIELD_DELIMITER: &str = "\x1f\x1f\x1f";
/// Introduces each commit group
pub const RECORD_DELIMITER: &str = "\x1e\x1e\x1e";

/// `git log --format` placeholders, in field order
pub const HEADER_PLACEHOLDERS: [&str; 8] = [
    "%H",  // commit hash
    "%an", // author name
    "%ae", // author email
    "%at", // author UNIX timestamp
    "%cn", // committer name
    "%ce", // committer email
    "%ct", // committer UNIX timestamp
    "%s",  // subject
];

/// Header fields plus the patch body
pub const FIELD_COUNT: usize = HEADER_PLACEHOLDERS.len() + 1;

/// The `--format=` argument producing the layout this parser expects
///
/// The trailing field delimiter separates the subject from the stat/patch
/// text git appends after the formatted header.
pub fn log_format() -> String {
    format!(
        "{}{}{}",
        RECORD_DELIMITER,
        HEADER_PLACEHOLDERS.join(FIELD_DELIMITER),
        FIELD_DELIMITER
    )
}

/// One commit as read from the history stream, before classification
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommit {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub author_unix_timestamp: f64,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_unix_timestamp: f64,
    pub subject: String,
    /// Subject length in characters, taken before any anonymization
    pub len_subject: u64,
    /// Stat summary followed by the word-diff patch
    pub patch: String,
}

/// Decode history output, replacing invalid UTF-8 sequences
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Non-empty commit groups of a decoded history stream
pub fn commit_groups(stream: &str) -> impl Iterator<Item = &str> {
    stream
        .split(RECORD_DELIMITER)
        .filter(|group| !group.trim().is_empty())
}

/// Parse a single commit group
pub fn parse_commit_group(group: &str) -> Result<RawCommit, ParseError> {
    let fields: Vec<&str> = group.split(FIELD_DELIMITER).collect();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::FieldCount {
            expected: FIELD_COUNT,
            actual: fields.len(),
        });
    }

    let subject = fields[7].to_string();
    let len_subject = subject.chars().count() as u64;

    Ok(RawCommit {
        hash: fields[0].trim().to_string(),
        author_name: fields[1].to_string(),
        author_email: fields[2].to_string(),
        author_unix_timestamp: parse_unix_timestamp("author", fields[3])?,
        committer_name: fields[4].to_string(),
        committer_email: fields[5].to_string(),
        committer_unix_timestamp: parse_unix_timestamp("committer", fields[6])?,
        subject,
        len_subject,
        patch: fields[8].to_string(),
    })
}

fn parse_unix_timestamp(field: &'static str, value: &str) -> Result<f64, ParseError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|ts| ts.is_finite())
        .ok_or_else(|| ParseError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
}

/// Parse every well-formed commit in a history stream
///
/// Malformed groups are logged and dropped; parsing continues with the next one.
pub fn parse_log(stream: &str) -> Vec<RawCommit> {
    let mut commits = Vec::new();
    let mut dropped = 0usize;

    for (index, group) in commit_groups(stream).enumerate() {
        match parse_commit_group(group) {
            Ok(commit) => commits.push(commit),
            Err(e) => {
                dropped += 1;
                tracing::warn!("Dropping malformed commit group #{}: {}", index, e);
            }
        }
    }

    if dropped > 0 {
        tracing::warn!(
            "Parsed {} commits, dropped {} malformed groups",
            commits.len(),
            dropped
        );
    } else {
        tracing::debug!("Parsed {} commits", commits.len());
    }

    commits
}
