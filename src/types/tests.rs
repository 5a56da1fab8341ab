use super::*;

pub(crate) fn sample_record() -> CommitRecord {
    CommitRecord {
        repo_remote_hostname: "github.com".to_string(),
        repo_owner: "octo".to_string(),
        repo_name: "widgets".to_string(),
        path_in_repo: ".".to_string(),
        labels: Labels::from_iter(["team-a"]),
        commit_hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
        author_name: "Ada".to_string(),
        author_email: "ada@example.com".to_string(),
        author_unix_timestamp: 1_700_000_000.0,
        committer_name: "Ada".to_string(),
        committer_email: "ada@example.com".to_string(),
        committer_unix_timestamp: 1_700_000_100.0,
        subject: "Fix widget alignment".to_string(),
        len_subject: 20,
        num_files_changed: 2,
        num_lines_changed: 6,
        num_lines_inserted: 3,
        num_lines_deleted: 1,
        num_lines_modified: 2,
    }
}

#[test]
fn test_labels_deduplicate_preserving_order() {
    let labels = Labels::from_iter(["b", "a", "b", "c", "a"]);
    assert_eq!(labels.as_slice(), &["b", "a", "c"]);
}

#[test]
fn test_labels_union() {
    let mut labels = Labels::from_iter(["a"]);
    labels.union_with(&Labels::from_iter(["b", "a"]));
    assert_eq!(labels.as_slice(), &["a", "b"]);
}

#[test]
fn test_labels_same_set_ignores_order() {
    let left = Labels::from_iter(["a", "b"]);
    let right = Labels::from_iter(["b", "a"]);
    assert!(left.same_set(&right));
    assert!(!left.same_set(&Labels::from_iter(["a"])));
}

#[test]
fn test_labels_serialize_as_list() {
    let labels = Labels::from_iter(["x", "y"]);
    assert_eq!(serde_json::to_string(&labels).unwrap(), r#"["x","y"]"#);
}

#[test]
fn test_change_counts_sum() {
    let counts = ChangeCounts {
        inserted: 4,
        deleted: 2,
        modified: 1,
    };
    assert_eq!(counts.changed(), 7);
}

#[test]
fn test_set_change_counts_keeps_invariant() {
    let mut record = sample_record();
    record.set_change_counts(ChangeCounts {
        inserted: 10,
        deleted: 0,
        modified: 5,
    });
    assert_eq!(record.num_lines_changed, 15);
    assert!(record.counts_consistent());
}

#[test]
fn test_record_serializes_in_canonical_order() {
    let json = serde_json::to_string(&sample_record()).unwrap();
    let mut last = 0;
    for attribute in RECORD_ATTRIBUTES {
        let pos = json
            .find(&format!("\"{}\"", attribute))
            .unwrap_or_else(|| panic!("missing attribute {}", attribute));
        assert!(pos >= last, "{} out of order", attribute);
        last = pos;
    }
}

#[test]
fn test_parse_timestamp_unix() {
    let ts = parse_timestamp("1704067200").unwrap();
    assert_eq!(ts.timestamp(), 1704067200);
}

#[test]
fn test_parse_timestamp_rfc3339() {
    let ts = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
    assert_eq!(ts.timestamp(), 1704067200);
}

#[test]
fn test_parse_timestamp_date_only() {
    let ts = parse_timestamp("2024-01-01").unwrap();
    assert_eq!(ts.timestamp(), 1704067200);
}

#[test]
fn test_parse_timestamp_date_time() {
    let ts = parse_timestamp("2024-01-01 01:00:00").unwrap();
    assert_eq!(ts.timestamp(), 1704067200 + 3600);
}

#[test]
fn test_parse_timestamp_invalid() {
    assert!(matches!(
        parse_timestamp("last tuesday"),
        Err(ValidationError::InvalidTimestamp(_))
    ));
}

#[test]
fn test_time_range_git_format() {
    let range = TimeRange::new(
        parse_timestamp("2020-05-01").unwrap(),
        parse_timestamp("2021-01-02T03:04:05Z").unwrap(),
    )
    .unwrap();
    assert_eq!(range.git_since(), "2020-05-01T00:00:00Z");
    assert_eq!(range.git_until(), "2021-01-02T03:04:05Z");
}

#[test]
fn test_time_range_rejects_inverted_bounds() {
    let result = TimeRange::new(
        parse_timestamp("2022-01-01").unwrap(),
        parse_timestamp("2021-01-01").unwrap(),
    );
    assert!(matches!(result, Err(ValidationError::EmptyTimeRange { .. })));
}

#[test]
fn test_default_time_range_starts_at_epoch() {
    let range = TimeRange::default();
    assert_eq!(range.since.timestamp(), 0);
    assert!(range.until > range.since);
}
