//! Repository identity from a remote URL

use regex::Regex;
use std::sync::LazyLock;

// scheme://[user@]host[:port]/owner/name, or scp-like user@host:owner/name
static URL_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://(?:[^@/]+@)?([^/:]+)(?::\d+)?/(.+)/([^/]+?)/?$")
        .expect("valid regex")
});
static SCP_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[^@/]+@)?([^/:]+):/?(.+)/([^/]+?)/?$").expect("valid regex")
});

/// Hostname, owner and name of a repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoIdentity {
    pub remote_hostname: String,
    pub owner: String,
    pub name: String,
}

impl RepoIdentity {
    /// Parse `https://host/owner/name.git`, `ssh://git@host/owner/name` or `git@host:owner/name.git`
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let url = url.trim();
        let caps = URL_FORM.captures(url).or_else(|| SCP_FORM.captures(url))?;

        let name = caps[3].strip_suffix(".git").unwrap_or(&caps[3]);
        if name.is_empty() {
            return None;
        }

        Some(Self {
            remote_hostname: caps[1].to_string(),
            owner: caps[2].to_string(),
            name: name.to_string(),
        })
    }

    /// Identity for a checkout without a usable remote
    pub fn local(dir_name: &str) -> Self {
        Self {
            name: dir_name.to_string(),
            ..Self::default()
        }
    }
}
