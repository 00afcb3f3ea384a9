pub mod client;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use types::{BranchHead, CommitMeta, ForkInfo, Identity, IssueInfo, Member, RepoRef};

/// Read-only view of the hosting service.
///
/// Every method is one logical lookup and may cost one or more round trips.
/// Callers treat errors from per-item lookups as degraded data, not as fatal.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn identity(&self) -> Result<Identity>;

    async fn org_repos(&self, org: &str) -> Result<Vec<RepoRef>>;

    async fn branches(&self, repo: &RepoRef) -> Result<Vec<BranchHead>>;

    async fn commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitMeta>;

    async fn issue(&self, repo: &RepoRef, number: u64) -> Result<IssueInfo>;

    async fn forks(&self, repo: &RepoRef) -> Result<Vec<ForkInfo>>;

    /// Committer date of the newest commit on the default branch, `None` for
    /// an empty repository.
    async fn latest_commit_time(&self, owner: &str, repo: &str) -> Result<Option<DateTime<Utc>>>;

    async fn org_members(&self, org: &str) -> Result<Vec<Member>>;

    async fn user_profile(&self, login: &str) -> Result<Member>;

    async fn user_repos(&self, login: &str) -> Result<Vec<String>>;

    async fn rate_limit_remaining(&self) -> Option<u32> {
        None
    }
}
