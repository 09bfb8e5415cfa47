/// Common test utilities and helpers for labsync tests
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use labsync::{Config, Git, GitLabApi, Group, Project};

/// Scratch directory holding a config file and the mirror root
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    pub fn root(&self) -> PathBuf {
        self.temp_dir.path().join("mirror")
    }

    pub fn create_test_config(&self, content: &str) -> PathBuf {
        let config_path = self.temp_dir.path().join("config.yml");
        std::fs::write(&config_path, content).expect("Failed to write test config");
        config_path
    }

    /// Config rooted at [`Self::root`] with the given lists
    pub fn config(&self, repos: &[&str], repo_ignore: &[&str], group_ignore: &[&str]) -> Config {
        Config {
            path: self.root().to_string_lossy().into_owned(),
            repos: to_strings(repos),
            repo_ignore: to_strings(repo_ignore),
            group_ignore: to_strings(group_ignore),
            ..Default::default()
        }
    }

    /// Mark `relative` under the root as an existing working copy
    pub fn create_working_copy(&self, relative: &str) -> PathBuf {
        let path = self.root().join(relative);
        std::fs::create_dir_all(path.join(".git")).expect("Failed to create working copy");
        path
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Git double that records every call and never touches the network
#[derive(Default)]
pub struct FakeGit {
    pub branch: String,
    /// Branches `ls-remote` reports as existing
    pub remote_branches: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeGit {
    pub fn on_branch(branch: &str, remote_branches: &[&str]) -> Self {
        Self {
            branch: branch.to_string(),
            remote_branches: to_strings(remote_branches),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl Git for FakeGit {
    async fn current_branch(&self, _repo: &Path) -> Result<String> {
        self.record("current_branch".to_string());
        Ok(self.branch.clone())
    }

    async fn ls_remote_heads(&self, branch: &str, _repo: &Path) -> Result<String> {
        self.record(format!("ls_remote {}", branch));
        Ok(self
            .remote_branches
            .iter()
            .filter(|name| name.as_str() == branch)
            .map(|name| format!("3f1c2a9e\trefs/heads/{}", name))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn clone_repo(&self, url: &str, target: &Path) -> Result<()> {
        self.record(format!("clone {} {}", url, target.display()));
        Ok(())
    }

    async fn pull(&self, repo: &Path) -> Result<()> {
        self.record(format!("pull {}", repo.display()));
        Ok(())
    }

    async fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        self.record(format!("checkout {} {}", repo.display(), branch));
        Ok(())
    }
}

/// In-memory group tree served one page per call
#[derive(Default)]
pub struct FakeGitLab {
    pub groups: Vec<Group>,
    /// Subgroups keyed by parent API ref
    pub subgroups: HashMap<String, Vec<Group>>,
    /// Projects keyed by group API ref
    pub projects: HashMap<String, Vec<Project>>,
    /// Group refs whose project listing fails
    pub failing_projects: Vec<String>,
}

impl FakeGitLab {
    pub fn with_group(mut self, group: Group, projects: Vec<Project>) -> Self {
        self.projects.insert(group.api_ref(), projects);
        self.groups.push(group);
        self
    }
}

#[async_trait]
impl GitLabApi for FakeGitLab {
    async fn list_groups(&self, page: u32) -> Result<Vec<Group>> {
        Ok(if page == 1 { self.groups.clone() } else { Vec::new() })
    }

    async fn list_subgroups(&self, group: &str, page: u32) -> Result<Vec<Group>> {
        if page > 1 {
            return Ok(Vec::new());
        }
        Ok(self.subgroups.get(group).cloned().unwrap_or_default())
    }

    async fn list_group_projects(&self, group: &str, page: u32) -> Result<Vec<Project>> {
        if self.failing_projects.iter().any(|failing| failing == group) {
            return Err(anyhow!("500 Internal Server Error"));
        }
        if page > 1 {
            return Ok(Vec::new());
        }
        Ok(self.projects.get(group).cloned().unwrap_or_default())
    }
}

pub fn group(id: u64, full_path: &str) -> Group {
    let path = full_path.rsplit('/').next().unwrap_or(full_path).to_string();
    Group {
        id: Some(id),
        name: path.clone(),
        path,
        full_path: full_path.to_string(),
    }
}

pub fn project(id: u64, path_with_namespace: &str) -> Project {
    let path = path_with_namespace
        .rsplit('/')
        .next()
        .unwrap_or(path_with_namespace)
        .to_string();
    Project {
        id,
        path,
        path_with_namespace: path_with_namespace.to_string(),
        ssh_url_to_repo: format!("git@gitlab.example.com:{}.git", path_with_namespace),
        http_url_to_repo: format!("https://gitlab.example.com/{}.git", path_with_namespace),
    }
}
