//! History Extractor: one `git log` query per repository path
//!
//! Diff colours are pinned so word-diff spans can be told apart from text,
//! and the whole stream is buffered before parsing.

use super::parser;
use super::remote::RepoIdentity;
use crate::error::{ExtractionError, SourceError};
use crate::types::TimeRange;
use git2::Repository;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

/// Last second git's date parser accepts (2099-12-31T23:59:59Z)
pub const GIT_MAX_TIMESTAMP: i64 = 4_102_444_799;

/// Default `--stat-width`, wide enough that long paths are never elided
pub const DEFAULT_STAT_WIDTH: usize = 1000;

/// Colour settings that make word-diff markers unambiguous
///
/// Insertions come out as `ESC[32m{+...+}ESC[m` and deletions as
/// `ESC[31m[-...-]ESC[m`; user colour configuration must not leak in.
const COLOUR_CONFIG: [&str; 8] = [
    "color.ui=always",
    "color.diff.plain=normal",
    "color.diff.meta=normal bold",
    "color.diff.old=red",
    "color.diff.new=green",
    "color.diff.whitespace=normal",
    "diff.colorMoved=no",
    "core.quotepath=off",
];

/// A validated local checkout
#[derive(Debug, Clone)]
pub struct Checkout {
    /// Directory git is run in
    pub root: PathBuf,
    /// Identity derived from the `origin` remote
    pub identity: RepoIdentity,
}

impl Checkout {
    /// Open a local repository and make sure it has history to read
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let location = path.display().to_string();

        if !path.is_dir() {
            return Err(SourceError::NotADirectory(location));
        }

        let repo = Repository::open(path).map_err(|e| {
            tracing::debug!("git2 could not open {}: {}", location, e);
            SourceError::NotARepository(location.clone())
        })?;

        // An unborn HEAD means an empty or corrupt checkout
        if let Err(e) = repo.head() {
            tracing::debug!("HEAD does not resolve in {}: {}", location, e);
            return Err(SourceError::NoCommits(location));
        }

        let root = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();

        let identity = repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(str::to_string))
            .and_then(|url| RepoIdentity::from_remote_url(&url))
            .unwrap_or_else(|| {
                let dir_name = root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                tracing::debug!(
                    "No parsable origin remote for {}, using local name '{}'",
                    location,
                    dir_name
                );
                RepoIdentity::local(&dir_name)
            });

        tracing::info!("Opened git repository at: {}", root.display());

        Ok(Self { root, identity })
    }
}

/// Runs `git log` and returns its buffered output
#[derive(Debug, Clone)]
pub struct HistoryExtractor {
    git_binary: String,
    stat_width: usize,
}

impl Default for HistoryExtractor {
    fn default() -> Self {
        Self::new("git", DEFAULT_STAT_WIDTH)
    }
}

impl HistoryExtractor {
    pub fn new(git_binary: impl Into<String>, stat_width: usize) -> Self {
        Self {
            git_binary: git_binary.into(),
            stat_width,
        }
    }

    /// Arguments for one history query (everything after the binary name)
    pub fn log_args(&self, repo_root: &Path, path_in_repo: &str, range: &TimeRange) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-C".into(), repo_root.into()];
        for setting in COLOUR_CONFIG {
            args.push("-c".into());
            args.push(setting.into());
        }

        args.push("log".into());
        // Bounds git cannot represent are left open
        if range.since.timestamp() > 0 {
            args.push(format!("--since={}", range.git_since()).into());
        }
        if range.until.timestamp() <= GIT_MAX_TIMESTAMP {
            args.push(format!("--until={}", range.git_until()).into());
        }

        for arg in [
            "--all".to_string(),
            "--full-history".to_string(),
            "--stat".to_string(),
            format!("--stat-width={}", self.stat_width),
            format!("--format={}", parser::log_format()),
            "-p".to_string(),
            "--word-diff=plain".to_string(),
            "--no-ext-diff".to_string(),
            "--".to_string(),
            path_in_repo.to_string(),
        ] {
            args.push(arg.into());
        }
        args
    }

    /// Run the history query, failing on launch errors or a non-zero exit
    pub fn try_extract(
        &self,
        repo_root: &Path,
        path_in_repo: &str,
        range: &TimeRange,
    ) -> Result<Vec<u8>, ExtractionError> {
        if range.until.timestamp() <= 0 || range.since.timestamp() > GIT_MAX_TIMESTAMP {
            tracing::debug!(
                "Window {} to {} lies outside git's date range; no history",
                range.git_since(),
                range.git_until()
            );
            return Ok(Vec::new());
        }

        let output = Command::new(&self.git_binary)
            .args(self.log_args(repo_root, path_in_repo, range))
            .output()
            .map_err(|e| ExtractionError::LaunchFailed {
                binary: self.git_binary.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ExtractionError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    /// Run the history query; any failure yields an empty stream
    pub fn extract(&self, repo_root: &Path, path_in_repo: &str, range: &TimeRange) -> Vec<u8> {
        let start = Instant::now();
        match self.try_extract(repo_root, path_in_repo, range) {
            Ok(stream) => {
                tracing::info!(
                    "[git] Retrieved commit log for '{}' ({} bytes) in {:?}",
                    path_in_repo,
                    stream.len(),
                    start.elapsed()
                );
                stream
            }
            Err(e) => {
                tracing::warn!(
                    "Commit log unavailable for {} path '{}': {}",
                    repo_root.display(),
                    path_in_repo,
                    e
                );
                Vec::new()
            }
        }
    }
}
