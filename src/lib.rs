//! # Commit Scraper - Line-Level Commit History Mining
//!
//! Walks the history of local git repositories and turns every commit into a
//! flat, typed record: who changed what, when, and how many lines were
//! inserted, deleted or edited in place. Records accumulate in a persistent
//! store that repeated runs extend without duplicating rows.
//!
//! ## Key Features
//!
//! - **Word-Diff Classification**: each changed line is classified from
//!   `git log --word-diff` output, so an edited line counts once as modified
//!   instead of once deleted plus once inserted
//! - **Idempotent Merging**: re-scraping the same history only unions labels
//! - **Anonymization**: salted SHA-1 digests for every identifying text field
//! - **Two Backends**: SQLite table or versioned JSON document, chosen explicitly
//! - **Single Writer**: a cross-process file lock guards each store
//!
//! ## Architecture
//!
//! ```text
//! sources ──► git::extractor ──► git::parser ──► git::classifier
//!                                                      │
//!                                      anonymize ◄─────┘
//!                                          │
//!                             store::merge ──► StoreAdapter (sqlite | json)
//! ```
//!
//! ## Modules
//!
//! - [`git`]: history extraction, stream parsing, line classification
//! - [`anonymize`]: salted digests for identifying fields
//! - [`store`]: store type, merge, backends and locking
//! - [`sources`]: repository source lists and per-entry overrides
//! - [`scraper`]: the sequential pipeline driver
//! - [`config`]: configuration management with environment variable support
//! - [`types`]: commit records, labels and time ranges
//! - [`error`]: error types and result aliases
//! - [`paths`]: platform data and config directories
//!
//! ## Usage Example
//!
//! ```no_run
//! use commit_scraper::config::Config;
//! use commit_scraper::scraper::{RunOptions, Scraper};
//! use commit_scraper::sources::parse_sources;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::new(None)?;
//!     let options = RunOptions {
//!         sources: parse_sources("/src/widgets?label=team-a"),
//!         time_range: config.time_range()?,
//!         ..RunOptions::default()
//!     };
//!
//!     let summary = Scraper::from_config(&config).run(&options)?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! ```

/// Salted digests replacing identifying text
pub mod anonymize;

/// Configuration management with environment variable overrides
pub mod config;

/// Error types and utilities
pub mod error;

/// Git history extraction and word-diff analysis
pub mod git;

/// Platform directories and default file locations
pub mod paths;

/// Sequential pipeline driver and run summary
pub mod scraper;

/// Repository source lists
pub mod sources;

/// Persistent commit record store
pub mod store;

/// Commit records, labels and time ranges
pub mod types;
