use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// Version-control operations against a working directory
///
/// Queries return trimmed stdout. Mutating operations stream git's own
/// progress output to the console.
#[async_trait]
pub trait Git: Send + Sync {
    /// Abbreviated name of HEAD, e.g. `main`
    async fn current_branch(&self, repo: &Path) -> Result<String>;

    /// Raw `ls-remote --heads origin <branch>` output
    async fn ls_remote_heads(&self, branch: &str, repo: &Path) -> Result<String>;

    async fn clone_repo(&self, url: &str, target: &Path) -> Result<()>;

    async fn pull(&self, repo: &Path) -> Result<()>;

    async fn checkout(&self, repo: &Path, branch: &str) -> Result<()>;
}

/// Whether `path` holds version-control metadata
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// [`Git`] implementation backed by the `git` executable
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    async fn output(&self, args: &[&str], dir: &Path) -> Result<String> {
        debug!("git {} (in {})", args.join(" "), dir.display());

        let output = AsyncCommand::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, command: &mut AsyncCommand, description: &str) -> Result<()> {
        let status = command
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("Failed to execute {}", description))?;

        if !status.success() {
            return Err(anyhow!("{} exited with {}", description, status));
        }

        Ok(())
    }
}

#[async_trait]
impl Git for GitCli {
    async fn current_branch(&self, repo: &Path) -> Result<String> {
        self.output(&["rev-parse", "--abbrev-ref", "HEAD"], repo)
            .await
            .context("Failed to get current branch")
    }

    async fn ls_remote_heads(&self, branch: &str, repo: &Path) -> Result<String> {
        self.output(&["ls-remote", "--heads", "origin", branch], repo)
            .await
            .context("Failed to list remote branches")
    }

    async fn clone_repo(&self, url: &str, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create parent directory {}", parent.display())
            })?;
        }

        let mut command = AsyncCommand::new("git");
        command.args(["clone", "--progress", url]).arg(target);
        self.run(&mut command, "git clone").await
    }

    async fn pull(&self, repo: &Path) -> Result<()> {
        let mut command = AsyncCommand::new("git");
        command.arg("pull").current_dir(repo);
        self.run(&mut command, "git pull").await
    }

    async fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        let mut command = AsyncCommand::new("git");
        command.args(["checkout", branch]).current_dir(repo);
        self.run(&mut command, "git checkout").await
    }
}
