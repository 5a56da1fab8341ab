//! Sequential pipeline driver
//!
//! For every source and every path in it: extract history, parse, classify,
//! optionally anonymize, then merge the batch into the store and write the
//! store back before moving on. The store is read once per run and the run
//! holds the store lock throughout.

use crate::anonymize::anonymize_record;
use crate::config::Config;
use crate::error::Result;
use crate::git::{Checkout, HistoryExtractor, RawCommit, RepoIdentity, classify_patch, parse_log};
use crate::git::parser::decode;
use crate::sources::RepoSource;
use crate::store::{StoreAdapter, StoreLock, open_adapter};
use crate::types::{CommitRecord, Labels, TimeRange};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Everything a record needs besides the commit itself
#[derive(Debug, Clone)]
pub struct RunContext {
    pub identity: RepoIdentity,
    pub path_in_repo: String,
    pub labels: Labels,
    pub time_range: TimeRange,
    pub anonymize: bool,
}

impl RunContext {
    /// Classify a parsed commit and attach repository context
    pub fn build_record(&self, raw: RawCommit) -> CommitRecord {
        let stats = classify_patch(&raw.patch);

        let mut record = CommitRecord {
            repo_remote_hostname: self.identity.remote_hostname.clone(),
            repo_owner: self.identity.owner.clone(),
            repo_name: self.identity.name.clone(),
            path_in_repo: self.path_in_repo.clone(),
            labels: self.labels.clone(),
            commit_hash: raw.hash,
            author_name: raw.author_name,
            author_email: raw.author_email,
            author_unix_timestamp: raw.author_unix_timestamp,
            committer_name: raw.committer_name,
            committer_email: raw.committer_email,
            committer_unix_timestamp: raw.committer_unix_timestamp,
            subject: raw.subject,
            len_subject: raw.len_subject,
            num_files_changed: stats.num_files_changed,
            num_lines_changed: 0,
            num_lines_inserted: 0,
            num_lines_deleted: 0,
            num_lines_modified: 0,
        };
        record.set_change_counts(stats.counts);

        if self.anonymize {
            anonymize_record(&mut record);
        }
        record
    }
}

/// Turn one decoded history stream into records, in stream order
pub fn records_from_stream(stream: &str, ctx: &RunContext) -> Vec<CommitRecord> {
    parse_log(stream)
        .into_iter()
        .map(|raw| {
            tracing::debug!("Classifying commit {}", raw.hash);
            ctx.build_record(raw)
        })
        .collect()
}

/// What to scrape in one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub sources: Vec<RepoSource>,
    /// Applied to every source, ahead of per-entry paths
    pub paths: Vec<String>,
    /// Applied to every source, ahead of per-entry labels
    pub labels: Vec<String>,
    pub time_range: TimeRange,
    pub anonymize: bool,
}

/// Where and how long to wait for the store lock
#[derive(Debug, Clone)]
pub struct LockSettings {
    pub dir: PathBuf,
    pub timeout: Duration,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub sources_total: usize,
    pub sources_skipped: usize,
    pub paths_processed: usize,
    pub records_produced: usize,
    /// Produced records that became new rows
    pub rows_added: usize,
    /// Produced records that matched an existing row
    pub rows_matched: usize,
    /// Rows in the store after the last write
    pub store_rows: usize,
    pub wrote_records: bool,
    pub location: String,
    pub backend_info: String,
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wrote_records {
            writeln!(
                f,
                "Commit records written to '{}' ({}).",
                self.location, self.backend_info
            )?;
        } else {
            writeln!(f, "No commit records written.")?;
        }
        write!(f, "Execution complete: done in {:?}", self.elapsed)
    }
}

/// Runs the extraction pipeline against one store
pub struct Scraper {
    extractor: HistoryExtractor,
    adapter: Box<dyn StoreAdapter>,
    lock: Option<LockSettings>,
}

impl Scraper {
    pub fn new(extractor: HistoryExtractor, adapter: Box<dyn StoreAdapter>) -> Self {
        Self {
            extractor,
            adapter,
            lock: None,
        }
    }

    /// Hold the cross-process store lock for the duration of each run
    pub fn with_lock(mut self, settings: LockSettings) -> Self {
        self.lock = Some(settings);
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let extractor =
            HistoryExtractor::new(&config.extraction.git_binary, config.extraction.stat_width);
        Self::new(extractor, open_adapter(&config.store)).with_lock(LockSettings {
            dir: config.store.lock_dir.clone(),
            timeout: Duration::from_secs(config.store.lock_timeout_secs),
        })
    }

    pub fn adapter(&self) -> &dyn StoreAdapter {
        self.adapter.as_ref()
    }

    fn acquire_lock(&self) -> Result<Option<StoreLock>> {
        let Some(settings) = &self.lock else {
            return Ok(None);
        };
        let location = self.adapter.location();
        let canonical = std::path::absolute(&location)
            .map(|p| p.display().to_string())
            .unwrap_or(location);
        Ok(Some(StoreLock::acquire(
            &settings.dir,
            &canonical,
            settings.timeout,
        )?))
    }

    /// Extract, parse and classify one path of one checkout
    pub fn scrape_path(&self, checkout: &Checkout, ctx: &RunContext) -> Vec<CommitRecord> {
        let start = Instant::now();
        let stream = self
            .extractor
            .extract(&checkout.root, &ctx.path_in_repo, &ctx.time_range);
        let records = records_from_stream(&decode(&stream), ctx);

        tracing::info!(
            "Built {} commit records for '{}' in {:?}",
            records.len(),
            ctx.path_in_repo,
            start.elapsed()
        );
        records
    }

    /// Process every source in order
    ///
    /// Invalid sources are skipped with a warning. Store failures end the run.
    pub fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        let start = Instant::now();
        let _lock = self.acquire_lock()?;

        let mut store = self.adapter.load()?;
        let mut summary = RunSummary {
            sources_total: options.sources.len(),
            store_rows: store.len(),
            location: self.adapter.location(),
            backend_info: self.adapter.describe(),
            ..RunSummary::default()
        };

        for (i, source) in options.sources.iter().enumerate() {
            tracing::info!(
                "Processing repository {} of {}: '{}'",
                i + 1,
                options.sources.len(),
                source.location.display()
            );

            let checkout = match Checkout::open(&source.location) {
                Ok(checkout) => checkout,
                Err(e) => {
                    tracing::warn!("{}; skipping", e);
                    summary.sources_skipped += 1;
                    continue;
                }
            };

            let labels: Labels = source.effective_labels(&options.labels).into_iter().collect();
            let time_range = source.time_range(&options.time_range);
            let paths = source.effective_paths(&options.paths);

            for (j, path_in_repo) in paths.iter().enumerate() {
                tracing::info!(
                    "Processing repository path {} of {}: '{}' ({} to {})",
                    j + 1,
                    paths.len(),
                    path_in_repo,
                    time_range.git_since(),
                    time_range.git_until()
                );

                let ctx = RunContext {
                    identity: checkout.identity.clone(),
                    path_in_repo: path_in_repo.clone(),
                    labels: labels.clone(),
                    time_range,
                    anonymize: options.anonymize,
                };

                let records = self.scrape_path(&checkout, &ctx);
                summary.paths_processed += 1;

                if records.is_empty() {
                    tracing::info!("No relevant commits found");
                    continue;
                }

                summary.records_produced += records.len();
                let (merged, stats) = store.merge_with_stats(&records);
                summary.rows_added += stats.rows_added;
                summary.rows_matched += stats.rows_matched;

                let write_start = Instant::now();
                self.adapter.save(&merged)?;
                store = merged;
                summary.wrote_records = true;
                summary.store_rows = store.len();
                tracing::info!(
                    "Exported {} rows ({} new, {} already stored) to {} in {:?}",
                    store.len(),
                    stats.rows_added,
                    stats.rows_matched,
                    summary.location,
                    write_start.elapsed()
                );
            }
        }

        summary.elapsed = start.elapsed();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests;
