//! Persistent collection of commit records
//!
//! A [`Store`] is an in-memory table of [`CommitRecord`]s. [`Store::merge`]
//! folds a freshly scraped batch into it without duplicating rows, and a
//! [`StoreAdapter`] moves it to and from a concrete backend.

/// Versioned JSON document backend
pub mod json_store;
/// Cross-process store lock
pub mod lock;
/// SQLite table backend
pub mod sqlite_store;

pub use json_store::JsonStore;
pub use lock::StoreLock;
pub use sqlite_store::SqliteStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;
use crate::types::CommitRecord;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Load/save capability implemented once per backend
pub trait StoreAdapter {
    /// Read the whole store; a store that does not exist yet loads empty
    fn load(&self) -> Result<Store, StoreError>;

    /// Replace the persisted store with `store`
    fn save(&self, store: &Store) -> Result<(), StoreError>;

    /// Where the store lives, used for locking and messages
    fn location(&self) -> String;

    /// Short backend-specific detail, e.g. `TABLE='commits'`
    fn describe(&self) -> String;
}

/// Build the adapter selected by configuration
pub fn open_adapter(config: &StoreConfig) -> Box<dyn StoreAdapter> {
    let path = config.resolved_path();
    match config.backend {
        StoreBackend::Sqlite => Box::new(SqliteStore::new(path, &config.table)),
        StoreBackend::Json => Box::new(JsonStore::new(path, &config.table)),
    }
}

/// Every attribute except `labels`
///
/// Two records with equal keys describe the same change and collapse to one
/// row. Timestamps compare by bit pattern with zero normalized.
#[derive(Debug, PartialEq, Eq, Hash)]
struct RecordKey<'a> {
    text: [&'a str; 10],
    timestamps: [u64; 2],
    counts: [u64; 6],
}

fn timestamp_bits(ts: f64) -> u64 {
    if ts == 0.0 { 0 } else { ts.to_bits() }
}

impl<'a> RecordKey<'a> {
    fn of(record: &'a CommitRecord) -> Self {
        Self {
            text: [
                record.repo_remote_hostname.as_str(),
                record.repo_owner.as_str(),
                record.repo_name.as_str(),
                record.path_in_repo.as_str(),
                record.commit_hash.as_str(),
                record.author_name.as_str(),
                record.author_email.as_str(),
                record.committer_name.as_str(),
                record.committer_email.as_str(),
                record.subject.as_str(),
            ],
            timestamps: [
                timestamp_bits(record.author_unix_timestamp),
                timestamp_bits(record.committer_unix_timestamp),
            ],
            counts: [
                record.len_subject,
                record.num_files_changed,
                record.num_lines_changed,
                record.num_lines_inserted,
                record.num_lines_deleted,
                record.num_lines_modified,
            ],
        }
    }
}

/// Outcome of one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Batch records that became new rows
    pub rows_added: usize,
    /// Batch records that matched an existing row
    pub rows_matched: usize,
}

/// An ordered, duplicate-free table of commit records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    records: Vec<CommitRecord>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap records read from a backend as-is
    pub fn from_records(records: Vec<CommitRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[CommitRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CommitRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge a batch into a copy of this store
    ///
    /// Records agreeing on every attribute but `labels` become one row whose
    /// labels are the union of theirs. Rows keep first-occurrence order:
    /// existing rows first, then new ones in batch order.
    pub fn merge(&self, batch: &[CommitRecord]) -> Store {
        self.merge_with_stats(batch).0
    }

    /// [`Store::merge`], also reporting how many batch rows were new
    pub fn merge_with_stats(&self, batch: &[CommitRecord]) -> (Store, MergeStats) {
        let mut merged: Vec<CommitRecord> = Vec::with_capacity(self.records.len() + batch.len());
        let mut index: HashMap<RecordKey<'_>, usize> = HashMap::with_capacity(merged.capacity());
        let mut stats = MergeStats::default();

        let existing = self.records.iter().map(|r| (r, false));
        let incoming = batch.iter().map(|r| (r, true));

        for (record, from_batch) in existing.chain(incoming) {
            match index.entry(RecordKey::of(record)) {
                Entry::Occupied(slot) => {
                    merged[*slot.get()].labels.union_with(&record.labels);
                    if from_batch {
                        stats.rows_matched += 1;
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(merged.len());
                    merged.push(record.clone());
                    if from_batch {
                        stats.rows_added += 1;
                    }
                }
            }
        }

        tracing::debug!(
            "Merged {} records: {} new rows, {} matched existing rows",
            batch.len(),
            stats.rows_added,
            stats.rows_matched
        );

        (Store { records: merged }, stats)
    }
}
