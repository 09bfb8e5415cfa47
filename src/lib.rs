//! labsync - GitLab group mirroring
//!
//! labsync keeps a local directory tree in step with the repositories hosted
//! on a GitLab instance: missing working copies are cloned, existing ones are
//! pulled.
//!
//! ## Core Features
//!
//! - **Group Discovery**: Every group and subgroup reachable with developer access
//! - **Explicit Repositories**: Individual clone URLs mapped to `root/<group>/<repo>`
//! - **Ignore Lists**: Exact-match exclusion of groups and repositories
//! - **Branch Recovery**: Working copies on a deleted branch fall back to `master`
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and parsing
//! - [`gitlab`]: GitLab API types and client
//! - [`discovery`]: Group and project enumeration
//! - [`remote`]: Git remote URL decomposition
//! - [`sync`]: Per-repository clone-or-pull
//! - [`runner`]: Whole-run orchestration

pub mod branch;
pub mod config;
pub mod discovery;
pub mod git;
pub mod gitlab;
pub mod output;
pub mod remote;
pub mod runner;
pub mod sync;

pub use config::Config;
pub use discovery::{GroupDiscovery, RepoSpec};
pub use git::{Git, GitCli};
pub use gitlab::{GitLabApi, GitLabClient, Group, Project};
pub use remote::{RemoteRepo, UrlError};
pub use runner::Runner;
pub use sync::{SyncEngine, SyncResult, SyncSummary};
