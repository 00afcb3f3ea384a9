use crate::branches::types::{AuthorGroups, Category, Classification};
use crate::github::types::{IssueInfo, IssueState, RepoRef};
use crate::github::Gateway;
use crate::scheduler::map_bounded;
use std::sync::Arc;

/// Issue number encoded as the branch name's prefix up to the first `-`.
///
/// `"42-login-fix"` gives 42. No hyphen, a non-digit prefix, an empty prefix,
/// zero, or a value that overflows all give `None`.
pub fn parse_issue_number(branch: &str) -> Option<u64> {
    let (prefix, _) = branch.split_once('-')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse::<u64>().ok().filter(|&n| n > 0)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssueLookup {
    /// The branch name carries no issue number.
    NotAttempted,
    Found(IssueInfo),
    /// A number was parsed but the gateway returned nothing usable.
    Missing,
}

pub fn categorize(lookup: &IssueLookup) -> Classification {
    match lookup {
        IssueLookup::NotAttempted => Classification {
            category: Category::NeverLinked,
            labels: Vec::new(),
        },
        IssueLookup::Missing => Classification {
            category: Category::Unlinked,
            labels: Vec::new(),
        },
        IssueLookup::Found(issue) => Classification {
            category: match issue.state {
                IssueState::Open => Category::Open,
                IssueState::Closed => Category::Closed,
            },
            labels: issue.labels.clone(),
        },
    }
}

async fn lookup_issue(gateway: &dyn Gateway, repo: &RepoRef, number: Option<u64>) -> IssueLookup {
    let Some(number) = number else {
        return IssueLookup::NotAttempted;
    };
    match gateway.issue(repo, number).await {
        Ok(issue) => IssueLookup::Found(issue),
        Err(e) => {
            tracing::debug!("issue #{number} of {repo}: {e}");
            IssueLookup::Missing
        }
    }
}

/// Parses and resolves the issue of every record, at most `limit` lookups in
/// flight. Each record is classified exactly once.
pub async fn classify_all(gateway: &dyn Gateway, groups: &mut AuthorGroups, limit: usize) {
    for record in groups.values_mut().flatten() {
        record.issue_number = parse_issue_number(&record.branch);
    }

    let requests: Vec<(Arc<RepoRef>, Option<u64>)> = groups
        .values()
        .flatten()
        .map(|r| (Arc::clone(&r.repo), r.issue_number))
        .collect();
    tracing::info!(records = requests.len(), "classifying branches");

    let lookups = map_bounded(requests, limit, |(repo, number)| async move {
        lookup_issue(gateway, &repo, number).await
    })
    .await;

    for (record, lookup) in groups.values_mut().flatten().zip(lookups) {
        record.classification = Some(categorize(&lookup));
    }
}
