#![cfg(test)]

use crate::error::{BranchboardError, Result};
use crate::github::types::*;
use crate::github::Gateway;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

pub fn make_commit(author: Option<&str>, message: &str, days: i64) -> CommitMeta {
    CommitMeta {
        author: author.map(str::to_string),
        message: message.to_string(),
        committed_at: days_ago(days),
    }
}

/// In-memory gateway. Anything not registered answers with an error, the
/// way a missing object on the remote would.
#[derive(Default)]
pub struct FakeGateway {
    org: String,
    org_fails: bool,
    repos: Vec<RepoRef>,
    branches: HashMap<String, Vec<BranchHead>>,
    commits: HashMap<String, CommitMeta>,
    issues: HashMap<(String, u64), IssueInfo>,
    forks: HashMap<String, Vec<ForkInfo>>,
    fork_activity: HashMap<String, Option<DateTime<Utc>>>,
    members: Vec<Member>,
    member_repos: HashMap<String, Vec<String>>,
    calls: AtomicUsize,
    issue_calls: AtomicUsize,
    // SHA memo mirroring the real client; misses are remote fetches
    commit_memo: Mutex<HashSet<String>>,
    commit_calls: AtomicUsize,
    commit_misses: AtomicUsize,
    commit_in_flight: AtomicUsize,
    commit_peak: AtomicUsize,
}

impl FakeGateway {
    pub fn new(org: &str) -> Self {
        Self {
            org: org.to_string(),
            ..Default::default()
        }
    }

    pub fn failing_org(mut self) -> Self {
        self.org_fails = true;
        self
    }

    pub fn with_repo(mut self, name: &str, default_branch: &str, branches: &[(&str, &str)]) -> Self {
        self.repos.push(RepoRef::new(&self.org, name, default_branch));
        self.branches.insert(
            name.to_string(),
            branches
                .iter()
                .map(|(b, sha)| BranchHead {
                    name: b.to_string(),
                    sha: sha.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn with_unlistable_repo(mut self, name: &str, default_branch: &str) -> Self {
        self.repos.push(RepoRef::new(&self.org, name, default_branch));
        self
    }

    pub fn with_commit(mut self, sha: &str, author: Option<&str>, message: &str, days: i64) -> Self {
        self.commits
            .insert(sha.to_string(), make_commit(author, message, days));
        self
    }

    pub fn with_issue(mut self, repo: &str, number: u64, state: IssueState, labels: &[&str]) -> Self {
        self.issues.insert(
            (repo.to_string(), number),
            IssueInfo {
                number,
                state,
                labels: labels.iter().map(|l| l.to_string()).collect(),
            },
        );
        self
    }

    /// `days: None` registers a fork with an empty history; a fork added with
    /// `reachable: false` fails its commit lookup.
    pub fn with_fork(mut self, repo: &str, owner: Option<&str>, name: &str, days: Option<i64>, reachable: bool) -> Self {
        self.forks.entry(repo.to_string()).or_default().push(ForkInfo {
            owner: owner.map(str::to_string),
            name: name.to_string(),
        });
        if reachable {
            let key = format!("{}/{name}", owner.unwrap_or_default());
            self.fork_activity.insert(key, days.map(days_ago));
        }
        self
    }

    pub fn with_member(mut self, login: &str, name: Option<&str>, repos: Option<&[&str]>) -> Self {
        self.members.push(Member {
            login: login.to_string(),
            name: name.map(str::to_string),
        });
        if let Some(repos) = repos {
            self.member_repos.insert(
                login.to_string(),
                repos.iter().map(|r| r.to_string()).collect(),
            );
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn issue_calls(&self) -> usize {
        self.issue_calls.load(Ordering::SeqCst)
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    pub fn commit_misses(&self) -> usize {
        self.commit_misses.load(Ordering::SeqCst)
    }

    /// Most uncached commit fetches that were in flight at once.
    pub fn peak_commit_fetches(&self) -> usize {
        self.commit_peak.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn not_found(what: String) -> BranchboardError {
    BranchboardError::GitHub(format!("Not Found: {what}"))
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn identity(&self) -> Result<Identity> {
        self.hit();
        Ok(Identity {
            login: "tester".to_string(),
            name: Some("Test User".to_string()),
        })
    }

    async fn org_repos(&self, org: &str) -> Result<Vec<RepoRef>> {
        self.hit();
        if self.org_fails || org != self.org {
            return Err(not_found(format!("org {org}")));
        }
        Ok(self.repos.clone())
    }

    async fn branches(&self, repo: &RepoRef) -> Result<Vec<BranchHead>> {
        self.hit();
        tokio::task::yield_now().await;
        self.branches
            .get(&repo.name)
            .cloned()
            .ok_or_else(|| not_found(format!("branches of {repo}")))
    }

    async fn commit(&self, repo: &RepoRef, sha: &str) -> Result<CommitMeta> {
        self.hit();
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        let memoized = self.commit_memo.lock().unwrap().contains(sha);
        if memoized {
            if let Some(meta) = self.commits.get(sha) {
                return Ok(meta.clone());
            }
        }

        self.commit_misses.fetch_add(1, Ordering::SeqCst);
        let now = self.commit_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.commit_peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        self.commit_in_flight.fetch_sub(1, Ordering::SeqCst);

        let meta = self
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| not_found(format!("commit {sha} in {repo}")))?;
        self.commit_memo.lock().unwrap().insert(sha.to_string());
        Ok(meta)
    }

    async fn issue(&self, repo: &RepoRef, number: u64) -> Result<IssueInfo> {
        self.hit();
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.issues
            .get(&(repo.name.clone(), number))
            .cloned()
            .ok_or_else(|| not_found(format!("issue #{number} in {repo}")))
    }

    async fn forks(&self, repo: &RepoRef) -> Result<Vec<ForkInfo>> {
        self.hit();
        Ok(self.forks.get(&repo.name).cloned().unwrap_or_default())
    }

    async fn latest_commit_time(&self, owner: &str, repo: &str) -> Result<Option<DateTime<Utc>>> {
        self.hit();
        self.fork_activity
            .get(&format!("{owner}/{repo}"))
            .copied()
            .ok_or_else(|| not_found(format!("commits of {owner}/{repo}")))
    }

    async fn org_members(&self, org: &str) -> Result<Vec<Member>> {
        self.hit();
        if self.org_fails || org != self.org {
            return Err(not_found(format!("members of {org}")));
        }
        Ok(self
            .members
            .iter()
            .map(|m| Member {
                login: m.login.clone(),
                name: None,
            })
            .collect())
    }

    async fn user_profile(&self, login: &str) -> Result<Member> {
        self.hit();
        self.members
            .iter()
            .find(|m| m.login == login)
            .cloned()
            .ok_or_else(|| not_found(format!("user {login}")))
    }

    async fn user_repos(&self, login: &str) -> Result<Vec<String>> {
        self.hit();
        self.member_repos
            .get(login)
            .cloned()
            .ok_or_else(|| not_found(format!("repos of {login}")))
    }
}
