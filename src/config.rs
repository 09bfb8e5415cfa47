use anyhow::{Context, Result};
use path_clean::PathClean;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file read when `-c` is not given
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Environment variable consulted when the config file carries no token
pub const TOKEN_ENV_VAR: &str = "GITLAB_TOKEN";

/// Main configuration structure for labsync
///
/// Loaded once at startup and passed by reference afterwards; nothing mutates
/// it once [`Config::load`] returns.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// GitLab base URL, e.g. `https://gitlab.example.com`
    #[serde(default)]
    pub url: String,

    /// Personal access token sent as `PRIVATE-TOKEN`
    #[serde(default)]
    pub token: String,

    /// Local root the group tree is mirrored into (blank means cwd)
    #[serde(default)]
    pub path: String,

    /// Group full paths to mirror instead of every accessible group
    #[serde(default)]
    pub groups: Vec<String>,

    /// Individual repository clone URLs to mirror
    #[serde(default)]
    pub repos: Vec<String>,

    /// Project clone URLs to skip
    #[serde(default)]
    pub repo_ignore: Vec<String>,

    /// Group full paths to skip
    #[serde(default)]
    pub group_ignore: Vec<String>,

    /// `path` after expansion, filled in by [`Config::load`]
    #[serde(skip)]
    pub resolved_root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.resolve()?;

        Ok(config)
    }

    /// Parse a YAML document without touching the filesystem or environment
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).context("Invalid configuration document")
    }

    /// Fill in the values that depend on the process environment
    fn resolve(&mut self) -> Result<()> {
        self.resolved_root = Some(self.expand_root()?);

        if self.token.trim().is_empty() {
            if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
                tracing::debug!("Using token from {}", TOKEN_ENV_VAR);
                self.token = token;
            }
        }

        Ok(())
    }

    /// Local root directory with `~` and environment variables expanded
    ///
    /// A loaded configuration answers from the root resolved at load time, so
    /// a directory name that itself contains `$` or `~` is never expanded twice.
    pub fn root_directory(&self) -> Result<PathBuf> {
        match &self.resolved_root {
            Some(root) => Ok(root.clone()),
            None => self.expand_root(),
        }
    }

    fn expand_root(&self) -> Result<PathBuf> {
        if self.path.trim().is_empty() {
            let cwd = std::env::current_dir().context("Failed to determine current directory")?;
            return Ok(cwd);
        }

        let expanded = shellexpand::full(self.path.trim())
            .with_context(|| format!("Failed to expand path: {}", self.path))?;

        Ok(PathBuf::from(expanded.as_ref()).clean())
    }

    /// Whether both a hosting URL and a token are present
    pub fn has_api_credentials(&self) -> bool {
        !self.url.trim().is_empty() && !self.token.trim().is_empty()
    }

    pub fn is_group_ignored(&self, full_path: &str) -> bool {
        self.group_ignore.iter().any(|ignored| ignored == full_path)
    }

    pub fn is_repo_ignored(&self, clone_url: &str) -> bool {
        self.repo_ignore.iter().any(|ignored| ignored == clone_url)
    }
}
