use crate::error::{BranchboardError, Result};
use crate::github::types::{
    BranchHead, CommitMeta, ForkInfo, Identity, IssueInfo, IssueState, Member, RepoRef,
};
use crate::github::Gateway;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const PER_PAGE: u8 = 100;

#[derive(Serialize)]
struct PageQuery {
    per_page: u8,
    page: u32,
}

#[derive(Deserialize)]
struct UserProfile {
    login: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct RepoName {
    name: String,
}

#[derive(Clone)]
pub struct GitHubClient {
    octo: Octocrab,
    // keyed by SHA; a commit never changes once pushed
    commits: Arc<Mutex<HashMap<String, CommitMeta>>>,
}

impl GitHubClient {
    pub fn new(token: &str) -> Result<Self> {
        let octo = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| BranchboardError::Config(e.to_string()))?;

        Ok(Self {
            octo,
            commits: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn cached_commit(&self, sha: &str) -> Option<CommitMeta> {
        let commits = self.commits.lock().unwrap_or_else(|e| e.into_inner());
        commits.get(sha).cloned()
    }

    fn remember_commit(&self, sha: &str, meta: &CommitMeta) {
        let mut commits = self.commits.lock().unwrap_or_else(|e| e.into_inner());
        commits.insert(sha.to_string(), meta.clone());
    }

    pub async fn rate_limit(&self) -> Option<u32> {
        self.octo
            .ratelimit()
            .get()
            .await
            .ok()
            .map(|r| remaining_budget(r.rate.remaining))
    }
}

fn remaining_budget(remaining: usize) -> u32 {
    u32::try_from(remaining).unwrap_or(u32::MAX)
}

fn is_rejected_token(status: u16) -> bool {
    matches!(status, 401 | 403)
}

// Only a rejected token is an auth failure; transport errors and 5xx stay GitHub errors.
fn identity_error(e: octocrab::Error) -> BranchboardError {
    match &e {
        octocrab::Error::GitHub { source, .. } if is_rejected_token(source.status_code.as_u16()) => {
            BranchboardError::Auth(source.message.clone())
        }
        _ => e.into(),
    }
}

#[async_trait]
impl Gateway for GitHubClient {
    async fn identity(&self) -> Result<Identity> {
        self.octo
            .get::<Identity, _, ()>("/user", None)
            .await
            .map_err(identity_error)
    }

    async fn org_repos(&self, org: &str) -> Result<Vec<RepoRef>> {
        let mut repos = Vec::new();
        let mut page = 1u32;

        loop {
            let result = self
                .octo
                .orgs(org)
                .list_repos()
                .per_page(PER_PAGE)
                .page(page)
                .send()
                .await?;

            if result.items.is_empty() {
                break;
            }

            for repo in &result.items {
                let owner = repo
                    .owner
                    .as_ref()
                    .map(|o| o.login.clone())
                    .unwrap_or_else(|| org.to_string());
                let default_branch = repo.default_branch.as_deref().unwrap_or("main");
                repos.push(RepoRef::new(&owner, &repo.name, default_branch));
            }

            if result.next.is_none() {
                break;
            }
            page += 1;
        }

        tracing::debug!(org, count = repos.len(), "listed repositories");
        Ok(repos)
    }

    async fn branches(&self, repo: &RepoRef) -> Result<Vec<BranchHead>> {
        let mut branches = Vec::new();
        let mut page = 1u32;

        loop {
            let result = self
                .octo
                .repos(&repo.owner, &repo.name)
                .list_branches()
                .per_page(PER_PAGE)
                .page(page)
                .send()
                .await?;

            if result.items.is_empty() {
                break;
            }

            for branch in &result.items {
                branches.push(BranchHead {
                    name: branch.name.clone(),
                    sha: branch.commit.sha.clone(),
                });
            }

            if result.next.is_none() {
                break;
            }
            page += 1;
        }

        Ok(branches)
    }

    async fn commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitMeta> {
        if let Some(hit) = self.cached_commit(sha) {
            return Ok(hit);
        }

        let result = self
            .octo
            .repos(&repo.owner, &repo.name)
            .list_commits()
            .sha(sha)
            .per_page(1)
            .send()
            .await?;

        let c = result.items.first().ok_or_else(|| {
            BranchboardError::GitHub(format!("{repo}: commit {sha} not found"))
        })?;

        let committed_at: DateTime<Utc> = c
            .commit
            .committer
            .as_ref()
            .and_then(|u| u.date.as_ref())
            .or_else(|| c.commit.author.as_ref().and_then(|u| u.date.as_ref()))
            .cloned()
            .ok_or_else(|| {
                BranchboardError::GitHub(format!("{repo}: commit {sha} has no date"))
            })?;

        let meta = CommitMeta {
            author: c.author.as_ref().map(|a| a.login.clone()),
            message: c.commit.message.lines().next().unwrap_or("").to_string(),
            committed_at,
        };
        self.remember_commit(sha, &meta);
        Ok(meta)
    }

    async fn issue(&self, repo: &RepoRef, number: u64) -> Result<IssueInfo> {
        let issue = self
            .octo
            .issues(&repo.owner, &repo.name)
            .get(number)
            .await?;

        let state = match issue.state {
            octocrab::models::IssueState::Open => IssueState::Open,
            _ => IssueState::Closed,
        };

        Ok(IssueInfo {
            number: issue.number,
            state,
            labels: issue.labels.iter().map(|l| l.name.clone()).collect(),
        })
    }

    async fn forks(&self, repo: &RepoRef) -> Result<Vec<ForkInfo>> {
        let mut forks = Vec::new();
        let mut page = 1u32;

        loop {
            let result = self
                .octo
                .repos(&repo.owner, &repo.name)
                .list_forks()
                .per_page(PER_PAGE)
                .page(page)
                .send()
                .await?;

            if result.items.is_empty() {
                break;
            }

            for fork in &result.items {
                forks.push(ForkInfo {
                    owner: fork.owner.as_ref().map(|o| o.login.clone()),
                    name: fork.name.clone(),
                });
            }

            if result.next.is_none() {
                break;
            }
            page += 1;
        }

        Ok(forks)
    }

    async fn latest_commit_time(&self, owner: &str, repo: &str) -> Result<Option<DateTime<Utc>>> {
        let result = self
            .octo
            .repos(owner, repo)
            .list_commits()
            .per_page(1)
            .send()
            .await?;

        Ok(result.items.first().and_then(|c| {
            c.commit
                .committer
                .as_ref()
                .and_then(|u| u.date.as_ref())
                .cloned()
        }))
    }

    async fn org_members(&self, org: &str) -> Result<Vec<Member>> {
        let mut members = Vec::new();
        let mut page = 1u32;

        loop {
            let result = self
                .octo
                .orgs(org)
                .list_members()
                .per_page(PER_PAGE)
                .page(page)
                .send()
                .await?;

            if result.items.is_empty() {
                break;
            }

            for m in &result.items {
                members.push(Member {
                    login: m.login.clone(),
                    name: None,
                });
            }

            if result.next.is_none() {
                break;
            }
            page += 1;
        }

        Ok(members)
    }

    async fn user_profile(&self, login: &str) -> Result<Member> {
        let profile: UserProfile = self
            .octo
            .get(format!("/users/{login}"), None::<&()>)
            .await?;
        Ok(Member {
            login: profile.login,
            name: profile.name,
        })
    }

    async fn user_repos(&self, login: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut page = 1u32;

        loop {
            let query = PageQuery {
                per_page: PER_PAGE,
                page,
            };
            let batch: Vec<RepoName> = self
                .octo
                .get(format!("/users/{login}/repos"), Some(&query))
                .await?;

            let short_page = batch.len() < PER_PAGE as usize;
            names.extend(batch.into_iter().map(|r| r.name));
            if short_page {
                break;
            }
            page += 1;
        }

        Ok(names)
    }

    async fn rate_limit_remaining(&self) -> Option<u32> {
        self.rate_limit().await
    }
}
