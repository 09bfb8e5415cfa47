use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;

/// Items requested per page
pub const PER_PAGE: u32 = 100;

/// Paging continues while a page holds at least this many items
pub const CONTINUE_THRESHOLD: usize = 50;

/// GitLab "Developer" access level
pub const MIN_ACCESS_LEVEL: u32 = 30;

const API_PREFIX: &str = "api/v4";

/// Characters escaped in a namespace path used as one `:id` segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A GitLab group (namespace holding subgroups and projects)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// `None` for placeholders built from configured group paths
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    pub full_path: String,
}

impl Group {
    /// Stand-in for a group named in configuration without being fetched
    pub fn placeholder(full_path: &str) -> Self {
        Self {
            id: None,
            name: full_path.to_string(),
            path: full_path.to_string(),
            full_path: full_path.to_string(),
        }
    }

    /// Identifier accepted by the `/groups/:id` endpoints
    pub fn api_ref(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => encode_path(&self.full_path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub path: String,
    pub path_with_namespace: String,
    pub ssh_url_to_repo: String,
    #[serde(default)]
    pub http_url_to_repo: String,
}

/// Paged listing endpoints of the hosting API
///
/// Each call fetches a single page; callers own the paging loop.
#[async_trait]
pub trait GitLabApi: Send + Sync {
    async fn list_groups(&self, page: u32) -> Result<Vec<Group>>;

    async fn list_subgroups(&self, group: &str, page: u32) -> Result<Vec<Group>>;

    async fn list_group_projects(&self, group: &str, page: u32) -> Result<Vec<Project>>;
}

/// GitLab REST v4 client authenticated with a personal access token
pub struct GitLabClient {
    http: reqwest::Client,
    api_root: Url,
    token: String,
}

impl GitLabClient {
    /// Build a client from the configured base URL and token
    pub fn new(config: &Config) -> Result<Self> {
        let token = config.token.trim();
        if token.is_empty() {
            return Err(anyhow!("No GitLab token configured"));
        }

        let api_root = api_root(&config.url)?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("labsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        info!("Using GitLab API at {}", api_root);

        Ok(Self {
            http,
            api_root,
            token: token.to_string(),
        })
    }

    async fn get_page<T: DeserializeOwned>(&self, endpoint: &str, page: u32) -> Result<Vec<T>> {
        let url = format!("{}{}", self.api_root, endpoint);
        debug!("GET {} page {}", url, page);

        let response = self
            .http
            .get(&url)
            .header("PRIVATE-TOKEN", self.token.as_str())
            .query(&[
                ("page", page),
                ("per_page", PER_PAGE),
                ("min_access_level", MIN_ACCESS_LEVEL),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} page {}", endpoint, page))?
            .error_for_status()
            .with_context(|| format!("GitLab rejected {} page {}", endpoint, page))?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to decode {} page {}", endpoint, page))
    }
}

#[async_trait]
impl GitLabApi for GitLabClient {
    async fn list_groups(&self, page: u32) -> Result<Vec<Group>> {
        self.get_page("groups", page).await
    }

    async fn list_subgroups(&self, group: &str, page: u32) -> Result<Vec<Group>> {
        self.get_page(&format!("groups/{}/subgroups", group), page).await
    }

    async fn list_group_projects(&self, group: &str, page: u32) -> Result<Vec<Project>> {
        self.get_page(&format!("groups/{}/projects", group), page).await
    }
}

impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("api_root", &self.api_root.as_str())
            .finish_non_exhaustive()
    }
}

/// Base URL with `/api/v4/` appended unless it is already there
fn api_root(base: &str) -> Result<Url> {
    let base = base.trim();
    if base.is_empty() {
        return Err(anyhow!("No GitLab URL configured"));
    }

    let trimmed = base.trim_end_matches('/');
    let root = if trimmed.ends_with(API_PREFIX) {
        format!("{}/", trimmed)
    } else {
        format!("{}/{}/", trimmed, API_PREFIX)
    };

    let url = Url::parse(&root).with_context(|| format!("Invalid GitLab URL: {}", base))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!("Unsupported GitLab URL scheme: {}", base));
    }

    Ok(url)
}

/// URL-encode a namespace path for use as a single path segment
fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_SEGMENT).to_string()
}
