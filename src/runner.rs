//! Run orchestration: explicit repositories first, then every discovered group

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::discovery::{GroupDiscovery, RepoSpec};
use crate::git::Git;
use crate::gitlab::{GitLabApi, Group};
use crate::output;
use crate::remote::RemoteRepo;
use crate::sync::{SyncEngine, SyncSummary};

/// Everything a run needs, built once and borrowed by each phase
pub struct Runner<'a, G> {
    config: &'a Config,
    api: Option<&'a dyn GitLabApi>,
    engine: SyncEngine<G>,
    root: PathBuf,
}

impl<'a, G: Git> Runner<'a, G> {
    /// `api` is `None` when no hosting client could be built; group sync is
    /// then skipped entirely.
    pub fn new(config: &'a Config, api: Option<&'a dyn GitLabApi>, git: G) -> Result<Self> {
        let root = config.root_directory()?;

        Ok(Self {
            config,
            api,
            engine: SyncEngine::new(git),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sync explicit repositories, then groups
    ///
    /// Returns an error only when an explicit repository cannot be parsed or
    /// synced; group-level problems are reported and skipped.
    pub async fn run(&self) -> Result<SyncSummary> {
        let start_time = Instant::now();
        let mut summary = SyncSummary::default();

        info!("Mirroring into {}", self.root.display());

        self.sync_explicit_repos(&mut summary).await?;

        match self.api {
            Some(api) => self.sync_groups(api, &mut summary).await,
            None => info!("No GitLab client configured, skipping group sync"),
        }

        summary.duration = start_time.elapsed();
        Ok(summary)
    }

    async fn sync_explicit_repos(&self, summary: &mut SyncSummary) -> Result<()> {
        for url in &self.config.repos {
            let remote = RemoteRepo::parse(url)
                .inspect_err(|_| output::failure(format!("{} is not git url!", url)))?;

            output::success(format!("******Project: {} Start pulling******", remote.url));

            let spec = RepoSpec::from_remote(&remote, &self.root);
            let result = self
                .engine
                .sync_repository(&spec)
                .await
                .with_context(|| format!("Failed to sync {}", remote.url))?;
            summary.record(&result);
        }

        Ok(())
    }

    async fn sync_groups(&self, api: &dyn GitLabApi, summary: &mut SyncSummary) {
        let discovery = GroupDiscovery::new(api, self.config);
        let groups = discovery.list_groups().await;

        for group in &groups {
            self.sync_group(&discovery, group, summary).await;
        }
    }

    async fn sync_group(
        &self,
        discovery: &GroupDiscovery<'_>,
        group: &Group,
        summary: &mut SyncSummary,
    ) {
        output::success(format!("******Group: {} Start fetching******", group.full_path));

        let projects = match discovery.list_projects(group).await {
            Ok(projects) => projects,
            Err(e) => {
                warn!("{:#}", e);
                output::failure(format!("list projects failed:{:#}", e));
                Vec::new()
            }
        };

        if projects.is_empty() {
            output::failure(format!("******Group: {} Not exist skip******", group.full_path));
        }

        for project in &projects {
            output::success(format!("******Project: {} Start fetching******", project.path));

            let spec = RepoSpec::from_project(project, &self.root);
            match self.engine.sync_repository(&spec).await {
                Ok(result) => {
                    summary.record(&result);
                    output::success(format!(
                        "******Project: {} Fetch complete******",
                        project.path
                    ));
                }
                Err(e) => {
                    warn!("Skipping {}: {:#}", project.path_with_namespace, e);
                    summary.record_skip();
                }
            }
        }

        output::success(format!("******Group: {} Fetch complete******\n", group.full_path));
    }
}
