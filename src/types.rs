use crate::error::ValidationError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Version of the serialized commit record layout
///
/// Bumped whenever an attribute is added, removed, renamed or retyped.
pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Commit record attributes in canonical order
pub const RECORD_ATTRIBUTES: [&str; 19] = [
    "repo_remote_hostname",
    "repo_owner",
    "repo_name",
    "path_in_repo",
    "labels",
    "commit_hash",
    "author_name",
    "author_email",
    "author_unix_timestamp",
    "committer_name",
    "committer_email",
    "committer_unix_timestamp",
    "subject",
    "len_subject",
    "num_files_changed",
    "num_lines_changed",
    "num_lines_inserted",
    "num_lines_deleted",
    "num_lines_modified",
];

/// Set of user-supplied tags, kept as an ordered list without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Labels(Vec<String>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label unless it is already present. Returns true if it was added.
    pub fn insert(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.0.contains(&label) {
            return false;
        }
        self.0.push(label);
        true
    }

    /// Union with another label set, keeping first-seen order
    pub fn union_with(&mut self, other: &Labels) {
        for label in &other.0 {
            self.insert(label.clone());
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Order-insensitive comparison
    pub fn same_set(&self, other: &Labels) -> bool {
        self.len() == other.len() && self.iter().all(|l| other.contains(l))
    }
}

impl<S: Into<String>> FromIterator<S> for Labels {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut labels = Labels::new();
        for label in iter {
            labels.insert(label);
        }
        labels
    }
}

/// Line-level change tallies for one commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub inserted: u64,
    pub deleted: u64,
    pub modified: u64,
}

impl ChangeCounts {
    /// Total changed lines; always inserted + deleted + modified
    pub fn changed(&self) -> u64 {
        self.inserted + self.deleted + self.modified
    }
}

/// One physical change in one repository sub-path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommitRecord {
    pub repo_remote_hostname: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub path_in_repo: String,
    pub labels: Labels,
    pub commit_hash: String,
    pub author_name: String,
    pub author_email: String,
    /// UNIX epoch seconds
    pub author_unix_timestamp: f64,
    pub committer_name: String,
    pub committer_email: String,
    /// UNIX epoch seconds
    pub committer_unix_timestamp: f64,
    pub subject: String,
    /// Character length of the subject before anonymization
    pub len_subject: u64,
    pub num_files_changed: u64,
    pub num_lines_changed: u64,
    pub num_lines_inserted: u64,
    pub num_lines_deleted: u64,
    pub num_lines_modified: u64,
}

impl CommitRecord {
    /// Change tallies carried by this record
    pub fn change_counts(&self) -> ChangeCounts {
        ChangeCounts {
            inserted: self.num_lines_inserted,
            deleted: self.num_lines_deleted,
            modified: self.num_lines_modified,
        }
    }

    /// Overwrite the line tallies, keeping `num_lines_changed` consistent
    pub fn set_change_counts(&mut self, counts: ChangeCounts) {
        self.num_lines_inserted = counts.inserted;
        self.num_lines_deleted = counts.deleted;
        self.num_lines_modified = counts.modified;
        self.num_lines_changed = counts.changed();
    }

    /// Check `num_lines_changed == inserted + deleted + modified`
    pub fn counts_consistent(&self) -> bool {
        self.num_lines_changed == self.change_counts().changed()
    }
}

/// Commit time window `[since, until]` passed to the history tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl Default for TimeRange {
    /// UNIX epoch until now
    fn default() -> Self {
        Self {
            since: DateTime::<Utc>::UNIX_EPOCH,
            until: Utc::now(),
        }
    }
}

impl TimeRange {
    pub fn new(since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Self, ValidationError> {
        if since > until {
            return Err(ValidationError::EmptyTimeRange {
                since: format_git_timestamp(&since),
                until: format_git_timestamp(&until),
            });
        }
        Ok(Self { since, until })
    }

    /// Lower bound in the form handed to `git log --since`
    pub fn git_since(&self) -> String {
        format_git_timestamp(&self.since)
    }

    /// Upper bound in the form handed to `git log --until`
    pub fn git_until(&self) -> String {
        format_git_timestamp(&self.until)
    }
}

/// Format as `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_git_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse a user-supplied timestamp
///
/// Accepts UNIX seconds, RFC 3339, `YYYY-MM-DD` and `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let input = input.trim();
    let invalid = || ValidationError::InvalidTimestamp(input.to_string());

    if let Ok(seconds) = input.parse::<i64>() {
        return Utc.timestamp_opt(seconds, 0).single().ok_or_else(invalid);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        && let Some(naive) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(invalid())
}

#[cfg(test)]
pub(crate) mod tests;
