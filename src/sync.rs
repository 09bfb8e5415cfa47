//! Clone-or-pull for a single repository
//!
//! A missing working copy is cloned. An existing one is pulled, after first
//! switching to [`FALLBACK_BRANCH`] when its current branch no longer exists
//! on the remote. Clone and pull failures are reported in the returned
//! [`SyncResult`]; failing to inspect the branch or to switch away from it is
//! an error for that repository.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::branch::{check_branch, FALLBACK_BRANCH};
use crate::discovery::RepoSpec;
use crate::git::{is_git_repo, Git};
use crate::output;

/// Git operation whose failure was logged and tolerated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitOperation {
    Clone,
    Pull,
}

impl fmt::Display for GitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitOperation::Clone => write!(f, "clone"),
            GitOperation::Pull => write!(f, "pull"),
        }
    }
}

/// Result of a sync operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    /// Repository was cloned into a fresh directory
    Cloned { path: PathBuf },
    /// Existing working copy was pulled, possibly after a branch switch
    Pulled {
        path: PathBuf,
        switched_to: Option<String>,
    },
    /// Clone or pull ran but failed
    Failed {
        path: PathBuf,
        operation: GitOperation,
        error: String,
    },
}

impl SyncResult {
    pub fn path(&self) -> &Path {
        match self {
            SyncResult::Cloned { path }
            | SyncResult::Pulled { path, .. }
            | SyncResult::Failed { path, .. } => path,
        }
    }
}

/// Counts for a complete run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
    pub cloned: usize,
    pub pulled: usize,
    pub switched: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl SyncSummary {
    pub fn record(&mut self, result: &SyncResult) {
        match result {
            SyncResult::Cloned { .. } => self.cloned += 1,
            SyncResult::Pulled { switched_to, .. } => {
                self.pulled += 1;
                if switched_to.is_some() {
                    self.switched += 1;
                }
            }
            SyncResult::Failed { .. } => self.failed += 1,
        }
    }

    /// A repository abandoned before clone or pull ran
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn total(&self) -> usize {
        self.cloned + self.pulled + self.failed + self.skipped
    }
}

/// Drives the per-repository state machine over a [`Git`] implementation
pub struct SyncEngine<G> {
    git: G,
}

impl<G: Git> SyncEngine<G> {
    pub fn new(git: G) -> Self {
        Self { git }
    }

    pub fn git(&self) -> &G {
        &self.git
    }

    /// Bring the working copy at `spec.local_path` in line with its remote
    pub async fn sync_repository(&self, spec: &RepoSpec) -> Result<SyncResult> {
        let label = spec.name.as_str();
        let local_path = spec.local_path.as_path();

        if !is_git_repo(local_path) {
            output::success(format!(
                "{} repository does not exist. Cloning the repository from the remote server.",
                label
            ));
            return Ok(self.clone_repository(&spec.clone_url, local_path).await);
        }

        let status = check_branch(&self.git, local_path).await.inspect_err(|_| {
            output::failure(format!(
                "{} An error occurred while checking if the local branch exists on the server.",
                label
            ))
        })?;

        let mut switched_to = None;
        if !status.exists_on_remote {
            output::failure(format!(
                "{} branch {} not exist on the server, it will be switched to {}.",
                label, status.current, FALLBACK_BRANCH
            ));

            self.git
                .checkout(local_path, FALLBACK_BRANCH)
                .await
                .inspect_err(|_| {
                    output::failure(format!(
                        "{} An error occurred while switching the branch to {}.",
                        label, FALLBACK_BRANCH
                    ))
                })
                .with_context(|| {
                    format!(
                        "Failed to switch {} to {}",
                        local_path.display(),
                        FALLBACK_BRANCH
                    )
                })?;
            switched_to = Some(FALLBACK_BRANCH.to_string());
        }

        output::notice(format!(
            "{} repository already exists. Pulling the latest changes.",
            label
        ));

        Ok(self.pull_repository(local_path, switched_to).await)
    }

    async fn clone_repository(&self, clone_url: &str, local_path: &Path) -> SyncResult {
        debug!("Cloning {} -> {}", clone_url, local_path.display());

        match self.git.clone_repo(clone_url, local_path).await {
            Ok(()) => SyncResult::Cloned {
                path: local_path.to_path_buf(),
            },
            Err(e) => {
                warn!("Clone of {} failed: {:#}", clone_url, e);
                output::failure(format!("{} clone failed!", local_path.display()));
                SyncResult::Failed {
                    path: local_path.to_path_buf(),
                    operation: GitOperation::Clone,
                    error: format!("{:#}", e),
                }
            }
        }
    }

    async fn pull_repository(&self, local_path: &Path, switched_to: Option<String>) -> SyncResult {
        match self.git.pull(local_path).await {
            Ok(()) => SyncResult::Pulled {
                path: local_path.to_path_buf(),
                switched_to,
            },
            Err(e) => {
                warn!("Pull in {} failed: {:#}", local_path.display(), e);
                output::failure(format!("{} pull failed!", local_path.display()));
                SyncResult::Failed {
                    path: local_path.to_path_buf(),
                    operation: GitOperation::Pull,
                    error: format!("{:#}", e),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every git call and answers from canned values
    #[derive(Default)]
    pub(crate) struct RecordingGit {
        pub branch: String,
        pub remote_heads: String,
        pub fail_clone: bool,
        pub fail_pull: bool,
        pub fail_checkout: bool,
        pub fail_ls_remote: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl RecordingGit {
        pub(crate) fn on_branch(branch: &str, remote_heads: &str) -> Self {
            Self {
                branch: branch.to_string(),
                remote_heads: remote_heads.to_string(),
                ..Default::default()
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Git for RecordingGit {
        async fn current_branch(&self, _repo: &Path) -> Result<String> {
            self.record("current_branch".to_string());
            Ok(self.branch.clone())
        }

        async fn ls_remote_heads(&self, branch: &str, _repo: &Path) -> Result<String> {
            self.record(format!("ls_remote {}", branch));
            if self.fail_ls_remote {
                return Err(anyhow!("Could not read from remote repository"));
            }
            Ok(self.remote_heads.clone())
        }

        async fn clone_repo(&self, url: &str, target: &Path) -> Result<()> {
            self.record(format!("clone {} {}", url, target.display()));
            if self.fail_clone {
                return Err(anyhow!("repository not found"));
            }
            Ok(())
        }

        async fn pull(&self, _repo: &Path) -> Result<()> {
            self.record("pull".to_string());
            if self.fail_pull {
                return Err(anyhow!("merge conflict"));
            }
            Ok(())
        }

        async fn checkout(&self, _repo: &Path, branch: &str) -> Result<()> {
            self.record(format!("checkout {}", branch));
            if self.fail_checkout {
                return Err(anyhow!("pathspec did not match"));
            }
            Ok(())
        }
    }

    fn spec(local_path: &Path) -> RepoSpec {
        RepoSpec {
            name: "teamA/app".to_string(),
            clone_url: "git@host:teamA/app.git".to_string(),
            local_path: local_path.to_path_buf(),
        }
    }

    fn working_copy() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        temp
    }

    #[tokio::test]
    async fn test_missing_working_copy_is_cloned() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("teamA").join("app");
        let engine = SyncEngine::new(RecordingGit::default());

        let result = engine.sync_repository(&spec(&target)).await.unwrap();

        assert_eq!(result, SyncResult::Cloned { path: target.clone() });
        assert_eq!(
            engine.git.calls(),
            vec![format!("clone git@host:teamA/app.git {}", target.display())]
        );
    }

    #[tokio::test]
    async fn test_clone_failure_is_reported_not_propagated() {
        let temp = TempDir::new().unwrap();
        let engine = SyncEngine::new(RecordingGit {
            fail_clone: true,
            ..Default::default()
        });

        let result = engine.sync_repository(&spec(temp.path())).await.unwrap();

        assert_matches!(
            result,
            SyncResult::Failed {
                operation: GitOperation::Clone,
                ..
            }
        );
        let calls = engine.git.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with("clone"));
    }

    #[tokio::test]
    async fn test_existing_branch_is_pulled_without_checkout() {
        let repo = working_copy();
        let engine = SyncEngine::new(RecordingGit::on_branch("main", "abc\trefs/heads/main"));

        let result = engine.sync_repository(&spec(repo.path())).await.unwrap();

        assert_eq!(
            result,
            SyncResult::Pulled {
                path: repo.path().to_path_buf(),
                switched_to: None,
            }
        );
        assert_eq!(
            engine.git.calls(),
            vec!["current_branch", "ls_remote main", "pull"]
        );
    }

    #[tokio::test]
    async fn test_vanished_branch_switches_to_fallback_before_pull() {
        let repo = working_copy();
        let engine = SyncEngine::new(RecordingGit::on_branch("feature/gone", ""));

        let result = engine.sync_repository(&spec(repo.path())).await.unwrap();

        assert_eq!(
            result,
            SyncResult::Pulled {
                path: repo.path().to_path_buf(),
                switched_to: Some(FALLBACK_BRANCH.to_string()),
            }
        );
        assert_eq!(
            engine.git.calls(),
            vec![
                "current_branch",
                "ls_remote feature/gone",
                "checkout master",
                "pull"
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_checkout_skips_pull() {
        let repo = working_copy();
        let engine = SyncEngine::new(RecordingGit {
            fail_checkout: true,
            ..RecordingGit::on_branch("topic", "")
        });

        let result = engine.sync_repository(&spec(repo.path())).await;

        assert!(result.is_err());
        assert!(!engine.git.calls().contains(&"pull".to_string()));
    }

    #[tokio::test]
    async fn test_branch_check_failure_is_error() {
        let repo = working_copy();
        let engine = SyncEngine::new(RecordingGit {
            fail_ls_remote: true,
            ..RecordingGit::on_branch("main", "")
        });

        let result = engine.sync_repository(&spec(repo.path())).await;

        assert!(result.is_err());
        assert_eq!(engine.git.calls(), vec!["current_branch", "ls_remote main"]);
    }

    #[tokio::test]
    async fn test_pull_failure_is_reported_not_propagated() {
        let repo = working_copy();
        let engine = SyncEngine::new(RecordingGit {
            fail_pull: true,
            ..RecordingGit::on_branch("main", "abc\trefs/heads/main")
        });

        let result = engine.sync_repository(&spec(repo.path())).await.unwrap();

        assert!(matches!(
            result,
            SyncResult::Failed {
                operation: GitOperation::Pull,
                ..
            }
        ));
    }

    #[test]
    fn test_sync_summary_calculation() {
        let results = vec![
            SyncResult::Cloned {
                path: "/tmp/repo1".into(),
            },
            SyncResult::Pulled {
                path: "/tmp/repo2".into(),
                switched_to: None,
            },
            SyncResult::Pulled {
                path: "/tmp/repo3".into(),
                switched_to: Some("master".to_string()),
            },
            SyncResult::Failed {
                path: "/tmp/repo4".into(),
                operation: GitOperation::Pull,
                error: "Network error".to_string(),
            },
        ];

        let mut summary = SyncSummary::default();
        for result in &results {
            summary.record(result);
        }
        summary.record_skip();

        assert_eq!(summary.cloned, 1);
        assert_eq!(summary.pulled, 2);
        assert_eq!(summary.switched, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total(), 5);
        assert_eq!(results[3].path(), Path::new("/tmp/repo4"));
    }
}
