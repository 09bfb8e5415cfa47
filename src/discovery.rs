//! Group and project discovery
//!
//! Groups are expanded into their subgroups with an explicit worklist rather
//! than recursion, so nesting depth never grows the call stack. Every listing
//! is paged through [`collect_pages`].

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::gitlab::{GitLabApi, Group, Project, CONTINUE_THRESHOLD};
use crate::output;
use crate::remote::RemoteRepo;

/// Everything needed to clone or update one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Display name for console output
    pub name: String,

    /// URL handed to `git clone`
    pub clone_url: String,

    /// Working copy location under the configured root
    pub local_path: PathBuf,
}

impl RepoSpec {
    /// Repository named explicitly in configuration
    pub fn from_remote(repo: &RemoteRepo, root: &Path) -> Self {
        Self {
            name: repo.url.clone(),
            clone_url: repo.url.clone(),
            local_path: repo.local_path(root),
        }
    }

    /// Repository discovered through a group listing
    pub fn from_project(project: &Project, root: &Path) -> Self {
        let mut local_path = root.to_path_buf();
        for segment in project.path_with_namespace.split('/').filter(|s| !s.is_empty()) {
            local_path.push(segment);
        }

        Self {
            name: project.path_with_namespace.clone(),
            clone_url: project.ssh_url_to_repo.clone(),
            local_path,
        }
    }
}

/// Request pages starting at 1 until one comes back short
///
/// A page is "short" when it holds fewer than [`CONTINUE_THRESHOLD`] items,
/// independent of the page size that was requested.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut items = Vec::new();
    let mut page = 1;

    loop {
        let batch = fetch(page).await?;
        let count = batch.len();
        items.extend(batch);

        if count < CONTINUE_THRESHOLD {
            break;
        }
        page += 1;
    }

    Ok(items)
}

/// Walks the group hierarchy visible to the configured token
pub struct GroupDiscovery<'a> {
    api: &'a dyn GitLabApi,
    config: &'a Config,
}

impl<'a> GroupDiscovery<'a> {
    pub fn new(api: &'a dyn GitLabApi, config: &'a Config) -> Self {
        Self { api, config }
    }

    /// Every group to mirror, parents before their subgroups
    ///
    /// Listing failures are reported and cut off only the affected subtree.
    pub async fn list_groups(&self) -> Vec<Group> {
        let roots = if self.config.groups.is_empty() {
            match self.top_level_groups().await {
                Ok(groups) => groups,
                Err(e) => {
                    warn!("Listing groups failed: {:#}", e);
                    output::failure(format!("list groups failed:{:#}", e));
                    return Vec::new();
                }
            }
        } else {
            self.config
                .groups
                .iter()
                .map(|path| Group::placeholder(path))
                .collect()
        };

        let mut discovered = Vec::new();
        let mut seen = HashSet::new();
        let mut pending: Vec<Group> = roots.into_iter().rev().collect();

        while let Some(group) = pending.pop() {
            if !seen.insert(group.full_path.clone()) {
                debug!("Group {} already discovered", group.full_path);
                continue;
            }

            match self.subgroups(&group).await {
                Ok(children) => pending.extend(
                    children
                        .into_iter()
                        .filter(|child| !self.config.is_group_ignored(&child.full_path))
                        .rev(),
                ),
                Err(e) => {
                    warn!("Listing subgroups of {} failed: {:#}", group.full_path, e);
                    output::failure(format!(
                        "list sub group failed:{} {:#}",
                        group.full_path, e
                    ));
                }
            }

            discovered.push(group);
        }

        discovered.retain(|group| !self.config.is_group_ignored(&group.full_path));
        info!("Discovered {} groups", discovered.len());
        discovered
    }

    /// Projects of one group, minus ignored clone URLs
    pub async fn list_projects(&self, group: &Group) -> Result<Vec<Project>> {
        let api = self.api;
        let group_ref = group.api_ref();
        let group_ref = group_ref.as_str();

        let mut projects = collect_pages(move |page| api.list_group_projects(group_ref, page))
            .await
            .with_context(|| format!("Failed to list projects of {}", group.full_path))?;

        projects.retain(|project| {
            let ignored = self.config.is_repo_ignored(&project.ssh_url_to_repo);
            if ignored {
                debug!("Ignoring project {}", project.ssh_url_to_repo);
            }
            !ignored
        });

        Ok(projects)
    }

    async fn top_level_groups(&self) -> Result<Vec<Group>> {
        let api = self.api;
        collect_pages(move |page| api.list_groups(page)).await
    }

    async fn subgroups(&self, group: &Group) -> Result<Vec<Group>> {
        let api = self.api;
        let group_ref = group.api_ref();
        let group_ref = group_ref.as_str();
        collect_pages(move |page| api.list_subgroups(group_ref, page)).await
    }
}
