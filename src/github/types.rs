use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated user behind the token.
#[derive(Clone, Debug, Deserialize)]
pub struct Identity {
    pub login: String,
    pub name: Option<String>,
}

impl Identity {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.login)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
}

impl RepoRef {
    pub fn new(owner: &str, name: &str, default_branch: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            default_branch: default_branch.to_string(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A branch as listed: name plus the SHA it points at. Commit details cost
/// another round trip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchHead {
    pub name: String,
    pub sha: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitMeta {
    /// Platform login; `None` when the commit email maps to no account.
    pub author: Option<String>,
    pub message: String,
    pub committed_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueInfo {
    pub number: u64,
    pub state: IssueState,
    pub labels: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForkInfo {
    pub owner: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub login: String,
    pub name: Option<String>,
}

impl Member {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.login)
    }
}
