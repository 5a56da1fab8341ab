use super::*;
use crate::anonymize::{ANONYMIZED_LEN, anonymize};
use crate::error::{ScraperError, StoreError};
use crate::git::classifier::{DELETE_END, DELETE_START, INSERT_END, INSERT_START};
use crate::git::parser::tests::group;
use crate::sources::parse_source;
use crate::store::{JsonStore, Store};
use crate::types::parse_timestamp;
use std::cell::RefCell;
use tempfile::TempDir;

fn ins(text: &str) -> String {
    format!("{INSERT_START}{text}{INSERT_END}")
}

fn del(text: &str) -> String {
    format!("{DELETE_START}{text}{DELETE_END}")
}

/// Stat summary for two files plus a word diff with one line of each kind
fn sample_patch() -> String {
    format!(
        "\n\n src/lib.rs | 3 ++-\n README.md  | 1 +\n 2 files changed, 3 insertions(+), 1 deletion(-)\n\n\
         \x1b[1mdiff --git a/src/lib.rs b/src/lib.rs\x1b[m\n\
         \x1b[36m@@ -1,3 +1,4 @@\x1b[m\n\
         pub fn run() {{\n\
         {}\n\
         {}\n\
         let mode = {};\n\
         }}\n\
         \x1b[1mdiff --git a/README.md b/README.md\x1b[m\n\
         {}\n",
        ins("    setup();"),
        del("    legacy();"),
        format!("{}{}", del("\"old\""), ins("\"new\"")),
        ins("Usage notes"),
    )
}

fn context(anonymize: bool) -> RunContext {
    RunContext {
        identity: RepoIdentity {
            remote_hostname: "github.com".to_string(),
            owner: "octo".to_string(),
            name: "widgets".to_string(),
        },
        path_in_repo: "src".to_string(),
        labels: Labels::from_iter(["team-a", "q3"]),
        time_range: TimeRange::default(),
        anonymize,
    }
}

#[test]
fn test_records_from_stream_builds_full_records() {
    let stream = group("abc123", "Add setup step", &sample_patch());
    let records = records_from_stream(&stream, &context(false));
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.repo_remote_hostname, "github.com");
    assert_eq!(record.repo_owner, "octo");
    assert_eq!(record.repo_name, "widgets");
    assert_eq!(record.path_in_repo, "src");
    assert_eq!(record.labels.as_slice(), &["team-a", "q3"]);
    assert_eq!(record.commit_hash, "abc123");
    assert_eq!(record.author_name, "Ada Lovelace");
    assert_eq!(record.committer_email, "charles@example.com");
    assert_eq!(record.author_unix_timestamp, 1_700_000_000.0);
    assert_eq!(record.subject, "Add setup step");
    assert_eq!(record.len_subject, 14);
    assert_eq!(record.num_files_changed, 2);
    assert_eq!(record.num_lines_inserted, 2);
    assert_eq!(record.num_lines_deleted, 1);
    assert_eq!(record.num_lines_modified, 1);
    assert_eq!(record.num_lines_changed, 4);
    assert!(record.counts_consistent());
}

#[test]
fn test_records_keep_stream_order() {
    let stream = format!(
        "{}{}",
        group("newer", "second", &sample_patch()),
        group("older", "first", &sample_patch())
    );
    let hashes: Vec<String> = records_from_stream(&stream, &context(false))
        .into_iter()
        .map(|r| r.commit_hash)
        .collect();
    assert_eq!(hashes, vec!["newer", "older"]);
}

#[test]
fn test_anonymized_records() {
    let stream = group("abc123", "Add setup step", &sample_patch());
    let plain = records_from_stream(&stream, &context(false)).remove(0);
    let hidden = records_from_stream(&stream, &context(true)).remove(0);

    assert_eq!(hidden.commit_hash, anonymize("abc123"));
    assert_eq!(hidden.repo_name, anonymize("widgets"));
    assert_eq!(hidden.path_in_repo, anonymize("src"));
    assert_eq!(hidden.subject.len(), ANONYMIZED_LEN);

    // Length and tallies describe the original text
    assert_eq!(hidden.len_subject, plain.len_subject);
    assert_eq!(hidden.change_counts(), plain.change_counts());
    assert_eq!(hidden.labels, plain.labels);
    assert_eq!(hidden.author_unix_timestamp, plain.author_unix_timestamp);
}

#[test]
fn test_empty_stream_yields_no_records() {
    assert!(records_from_stream("", &context(false)).is_empty());
}

/// In-memory backend
#[derive(Default)]
struct MemoryStore {
    store: RefCell<Store>,
    fail_load: bool,
}

impl StoreAdapter for MemoryStore {
    fn load(&self) -> std::result::Result<Store, StoreError> {
        if self.fail_load {
            return Err(StoreError::LoadFailed {
                location: self.location(),
                reason: "unreachable".to_string(),
            });
        }
        Ok(self.store.borrow().clone())
    }

    fn save(&self, store: &Store) -> std::result::Result<(), StoreError> {
        *self.store.borrow_mut() = store.clone();
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    fn describe(&self) -> String {
        "IN-MEMORY".to_string()
    }
}

fn default_options(sources: Vec<RepoSource>) -> RunOptions {
    RunOptions {
        sources,
        time_range: TimeRange::new(
            parse_timestamp("2000-01-01").unwrap(),
            parse_timestamp("2030-01-01").unwrap(),
        )
        .unwrap(),
        ..RunOptions::default()
    }
}

#[test]
fn test_invalid_sources_are_skipped() {
    let dir = TempDir::new().unwrap();
    let not_a_repo = dir.path().join("plain");
    std::fs::create_dir(&not_a_repo).unwrap();

    let sources = vec![
        parse_source(&dir.path().join("missing").display().to_string()).unwrap(),
        parse_source(&not_a_repo.display().to_string()).unwrap(),
    ];

    let scraper = Scraper::new(HistoryExtractor::default(), Box::new(MemoryStore::default()));
    let summary = scraper.run(&default_options(sources)).unwrap();

    assert_eq!(summary.sources_total, 2);
    assert_eq!(summary.sources_skipped, 2);
    assert_eq!(summary.paths_processed, 0);
    assert!(!summary.wrote_records);
    assert!(summary.to_string().starts_with("No commit records written."));
}

#[test]
fn test_store_load_failure_aborts_run() {
    let adapter = MemoryStore {
        fail_load: true,
        ..MemoryStore::default()
    };
    let scraper = Scraper::new(HistoryExtractor::default(), Box::new(adapter));

    let err = scraper.run(&default_options(Vec::new())).unwrap_err();
    assert!(err.is_run_fatal());
    assert!(matches!(err, ScraperError::Store(StoreError::LoadFailed { .. })));
}

#[test]
fn test_locked_store_times_out() {
    let dir = TempDir::new().unwrap();
    let lock_dir = dir.path().join("locks");
    let store_path = dir.path().join("commits.json");

    let location = std::path::absolute(&store_path).unwrap().display().to_string();
    let _held = StoreLock::try_acquire(&lock_dir, &location).unwrap().unwrap();

    let handle = std::thread::spawn(move || {
        let scraper = Scraper::new(
            HistoryExtractor::default(),
            Box::new(JsonStore::new(&store_path, "commits")),
        )
        .with_lock(LockSettings {
            dir: lock_dir,
            timeout: Duration::from_millis(100),
        });
        scraper.run(&default_options(Vec::new())).map(|_| ())
    });

    let err = handle.join().unwrap().unwrap_err();
    assert!(matches!(err, ScraperError::Store(StoreError::LockTimeout { .. })));
}

#[test]
fn test_summary_display_when_written() {
    let summary = RunSummary {
        wrote_records: true,
        location: "/data/commits.db".to_string(),
        backend_info: "TABLE='commits'".to_string(),
        elapsed: Duration::from_millis(1500),
        ..RunSummary::default()
    };
    let text = summary.to_string();
    assert!(text.starts_with("Commit records written to '/data/commits.db' (TABLE='commits')."));
    assert!(text.contains("Execution complete"));
}
