use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::git::Git;

/// Branch a working copy falls back to when its branch is gone upstream
pub const FALLBACK_BRANCH: &str = "master";

/// Current branch of a working copy and whether `origin` still has it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchStatus {
    pub current: String,
    pub exists_on_remote: bool,
}

/// Look up the working copy's branch and check it against `origin`
pub async fn check_branch<G: Git + ?Sized>(git: &G, repo: &Path) -> Result<BranchStatus> {
    let current = git.current_branch(repo).await?;
    let heads = git.ls_remote_heads(&current, repo).await?;
    let exists_on_remote = remote_has_branch(&heads, &current);

    debug!(
        "{}: branch {} exists on remote: {}",
        repo.display(),
        current,
        exists_on_remote
    );

    Ok(BranchStatus {
        current,
        exists_on_remote,
    })
}

/// Whether `ls-remote --heads` output lists exactly `refs/heads/<branch>`
///
/// `ls-remote` filters by pattern, so asking for `x` also returns
/// `refs/heads/feature/x`; only an exact ref name counts.
pub fn remote_has_branch(ls_remote_output: &str, branch: &str) -> bool {
    let wanted = format!("refs/heads/{}", branch);
    ls_remote_output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|reference| reference == wanted)
}
