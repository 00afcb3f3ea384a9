use crate::github::types::{CommitMeta, RepoRef};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Grouping key for branch records: the last committer's login, or the
/// single `Unknown` bucket for commits that map to no account.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Developer {
    Known(String),
    Unknown,
}

impl Developer {
    pub fn from_login(login: Option<&str>) -> Self {
        match login {
            Some(l) if !l.is_empty() => Developer::Known(l.to_string()),
            _ => Developer::Unknown,
        }
    }

    pub fn handle(&self) -> &str {
        match self {
            Developer::Known(login) => login,
            Developer::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Developer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handle())
    }
}

impl Serialize for Developer {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.handle())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    Open,
    Closed,
    Unlinked,
    NeverLinked,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Open,
        Category::Closed,
        Category::Unlinked,
        Category::NeverLinked,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Open => "open",
            Category::Closed => "closed",
            Category::Unlinked => "unlinked",
            Category::NeverLinked => "never linked",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    /// Empty unless the category is `Open` or `Closed`.
    pub labels: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecencyTier {
    Fresh,
    Warning,
    Critical,
}

impl RecencyTier {
    pub fn from_age_days(days: i64) -> Self {
        if days > 30 {
            RecencyTier::Critical
        } else if days > 7 {
            RecencyTier::Warning
        } else {
            RecencyTier::Fresh
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            RecencyTier::Critical => "tomato",
            RecencyTier::Warning => "goldenrod",
            RecencyTier::Fresh => "black",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayFields {
    pub age: String,
    pub tier: RecencyTier,
}

/// One non-default branch.
///
/// Built by discovery with `classification: None`, classified once, then
/// given display fields once by the summary stage.
#[derive(Clone, Debug, Serialize)]
pub struct BranchRecord {
    #[serde(serialize_with = "repo_name")]
    pub repo: Arc<RepoRef>,
    pub branch: String,
    pub issue_number: Option<u64>,
    pub classification: Option<Classification>,
    pub last_commit: CommitMeta,
    pub display: Option<DisplayFields>,
}

fn repo_name<S: Serializer>(repo: &Arc<RepoRef>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&repo.name)
}

impl BranchRecord {
    pub fn new(repo: Arc<RepoRef>, branch: &str, last_commit: CommitMeta) -> Self {
        Self {
            repo,
            branch: branch.to_string(),
            issue_number: None,
            classification: None,
            last_commit,
            display: None,
        }
    }

    pub fn category(&self) -> Option<Category> {
        self.classification.as_ref().map(|c| c.category)
    }

    pub fn labels(&self) -> &[String] {
        self.classification
            .as_ref()
            .map(|c| c.labels.as_slice())
            .unwrap_or(&[])
    }
}

pub type AuthorGroups = BTreeMap<Developer, Vec<BranchRecord>>;
