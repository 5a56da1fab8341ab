//! Deterministic one-way anonymization of identifying text fields
//!
//! `anonymize(s)` hashes `s`, then hashes `s` again salted with the hex text of
//! the first digest. No external randomness is involved, so the same input maps
//! to the same 40-character hex string in every run and anonymized identities
//! stay joinable across separate extractions.

use crate::types::CommitRecord;
use sha1::{Digest, Sha1};

/// Length of an anonymized value in hex characters
pub const ANONYMIZED_LEN: usize = 40;

/// Anonymize a single string
pub fn anonymize(input: &str) -> String {
    let bytes = input.as_bytes();

    let salt = format!("{:x}", Sha1::digest(bytes));

    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Anonymize every identifying field of a record in place
///
/// Timestamps, counts, `len_subject` and labels are left untouched.
pub fn anonymize_record(record: &mut CommitRecord) {
    for field in [
        &mut record.repo_remote_hostname,
        &mut record.repo_owner,
        &mut record.repo_name,
        &mut record.path_in_repo,
        &mut record.commit_hash,
        &mut record.author_name,
        &mut record.author_email,
        &mut record.committer_name,
        &mut record.committer_email,
        &mut record.subject,
    ] {
        *field = anonymize(field);
    }
}
