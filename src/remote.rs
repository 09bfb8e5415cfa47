//! Git remote URL classification and decomposition
//!
//! A remote URL maps onto the local tree as `root/<group path>/<repo name>`,
//! so `git@gitlab.example.com:teamA/tools/app.git` lands in
//! `root/teamA/tools/app`.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static SSH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:git)@([^:/]+):(.+)/([^/]+)\.git$")
        .expect("SSH remote pattern compiles")
});

static HTTP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?i:https?)://[^/]+)/(.+)/([^/]+)\.git$")
        .expect("HTTP remote pattern compiles")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("{0} is not a git url")]
    NotAGitUrl(String),

    /// Looks like a git URL but has no `host/group/.../repo.git` structure
    #[error("{0} has no group/repository path that can be mapped to a local directory")]
    UnrecognizedLayout(String),
}

/// A remote repository named explicitly in configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepo {
    /// The URL as written, used verbatim for cloning
    pub url: String,
    /// Host for SSH URLs, scheme and host for HTTP(S) URLs
    pub domain: String,
    /// Everything between the host and the repository name
    pub group_path: String,
    /// Last path segment without the `.git` suffix
    pub name: String,
}

impl RemoteRepo {
    pub fn parse(url: &str) -> Result<Self, UrlError> {
        if !is_git_url(url) {
            return Err(UrlError::NotAGitUrl(url.to_string()));
        }

        let layout = if url.to_lowercase().starts_with("git@") {
            &SSH_PATTERN
        } else {
            &HTTP_PATTERN
        };

        let captures = layout
            .captures(url)
            .ok_or_else(|| UrlError::UnrecognizedLayout(url.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            domain: captures[1].to_string(),
            group_path: captures[2].trim_matches('/').to_string(),
            name: captures[3].to_string(),
        })
    }

    /// Directory this repository is mirrored into under `root`
    pub fn local_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for segment in self.group_path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.join(&self.name)
    }
}

/// Loose classification: any of the known prefixes *or* a `.git` suffix
pub fn is_git_url(url: &str) -> bool {
    let url = url.to_lowercase();
    url.starts_with("git@")
        || url.starts_with("http://")
        || url.starts_with("https://")
        || url.ends_with(".git")
}
