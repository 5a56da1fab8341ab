//! Git history extraction and word-diff analysis
//!
//! Runs `git log` with a fixed machine-readable layout, splits the output into
//! commits and classifies every changed line of every patch.

/// Word-diff line classification and stat-section file counting
pub mod classifier;
/// `git log` invocation and checkout validation
pub mod extractor;
/// History stream splitting and header decoding
pub mod parser;
/// Repository identity from remote URLs
pub mod remote;

pub use classifier::{LineKind, PatchStats, classify_line, classify_patch};
pub use extractor::{Checkout, HistoryExtractor};
pub use parser::{RawCommit, parse_log};
pub use remote::RepoIdentity;
