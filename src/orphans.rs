//! Forks of organization repositories and the personal repositories of
//! organization members. Independent of branch discovery.
//!
//! Forks are not filtered by whether their owner is a member; see DESIGN.md.

use crate::error::Result;
use crate::github::types::{ForkInfo, Member, RepoRef};
use crate::github::Gateway;
use crate::scheduler::map_bounded;
use crate::summary::format_age;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForkActivity {
    LastCommit { at: DateTime<Utc>, ago: String },
    /// No commits, or the history could not be read.
    Never,
}

impl fmt::Display for ForkActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkActivity::LastCommit { ago, .. } => f.write_str(ago),
            ForkActivity::Never => f.write_str("never"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrphanRecord {
    pub repo: String,
    pub owner: Option<String>,
    pub activity: ForkActivity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemberRepoRecord {
    pub member: String,
    pub repo: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct OrphanReport {
    pub orphans: Vec<OrphanRecord>,
    pub member_repos: Vec<MemberRepoRecord>,
}

pub async fn find_orphans(gateway: &dyn Gateway, org: &str, limit: usize) -> Result<OrphanReport> {
    let repos = gateway.org_repos(org).await?;
    tracing::info!(org, repos = repos.len(), "scanning forks");

    let per_repo = map_bounded(repos, limit, |repo| async move {
        let listed = gateway.forks(&repo).await;
        match listed {
            Ok(forks) => (repo, forks),
            Err(e) => {
                tracing::warn!("listing forks of {repo}: {e}");
                (repo, Vec::new())
            }
        }
    })
    .await;

    let forks: Vec<(RepoRef, ForkInfo)> = per_repo
        .into_iter()
        .flat_map(|(repo, forks)| forks.into_iter().map(move |f| (repo.clone(), f)))
        .collect();

    let now = Utc::now();
    let orphans = map_bounded(forks, limit, |(repo, fork)| async move {
        let activity = fork_activity(gateway, &fork, now).await;
        OrphanRecord {
            repo: repo.name,
            owner: fork.owner,
            activity,
        }
    })
    .await;

    let member_repos = member_repositories(gateway, org, limit).await;

    Ok(OrphanReport {
        orphans,
        member_repos,
    })
}

async fn fork_activity(gateway: &dyn Gateway, fork: &ForkInfo, now: DateTime<Utc>) -> ForkActivity {
    let Some(owner) = fork.owner.as_deref() else {
        return ForkActivity::Never;
    };
    match gateway.latest_commit_time(owner, &fork.name).await {
        Ok(Some(at)) => ForkActivity::LastCommit {
            at,
            ago: format_age(at, now),
        },
        Ok(None) => ForkActivity::Never,
        Err(e) => {
            tracing::debug!("history of fork {owner}/{}: {e}", fork.name);
            ForkActivity::Never
        }
    }
}

async fn member_repositories(gateway: &dyn Gateway, org: &str, limit: usize) -> Vec<MemberRepoRecord> {
    let members = match gateway.org_members(org).await {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("listing members of {org}: {e}");
            return Vec::new();
        }
    };

    let per_member = map_bounded(members, limit, |member| async move {
        let profile = gateway.user_profile(&member.login).await;
        let member = profile.unwrap_or(member);
        let listed = gateway.user_repos(&member.login).await;
        let repos = listed.unwrap_or_else(|e| {
            tracing::warn!("listing repositories of {}: {e}", member.login);
            Vec::new()
        });
        (member, repos)
    })
    .await;

    per_member
        .into_iter()
        .flat_map(|(member, repos): (Member, Vec<String>)| {
            let display = member.display_name().to_string();
            repos.into_iter().map(move |repo| MemberRepoRecord {
                member: display.clone(),
                repo,
            })
        })
        .collect()
}
