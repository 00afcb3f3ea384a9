use crate::branches::types::{AuthorGroups, BranchRecord, Developer};
use crate::error::Result;
use crate::github::types::{BranchHead, RepoRef};
use crate::github::Gateway;
use crate::scheduler::{map_bounded, run_all};
use std::sync::Arc;

/// Walks every repository of `org` and groups its non-default branches by the
/// login of the last committer.
///
/// Runs in three stages that never overlap: branch listings for all
/// repositories, a warm pass over commit metadata, then a serial read that
/// builds the records. A repository whose branches cannot be listed and a
/// branch whose commit cannot be resolved are skipped with a warning; only a
/// failure to list the organization's repositories aborts the run.
pub async fn discover(gateway: &dyn Gateway, org: &str, limit: usize) -> Result<AuthorGroups> {
    let repos: Vec<Arc<RepoRef>> = gateway
        .org_repos(org)
        .await?
        .into_iter()
        .map(Arc::new)
        .collect();
    tracing::info!(org, repos = repos.len(), "discovering open branches");

    let listings = map_bounded(repos, limit, |repo| async move {
        let listed = gateway.branches(&repo).await;
        match listed {
            Ok(heads) => (repo, heads),
            Err(e) => {
                tracing::warn!("listing branches of {repo}: {e}");
                (repo, Vec::new())
            }
        }
    })
    .await;

    let open: Vec<(Arc<RepoRef>, BranchHead)> = listings
        .into_iter()
        .flat_map(|(repo, heads)| {
            let default = repo.default_branch.clone();
            heads
                .into_iter()
                .filter(move |h| h.name != default)
                .map(move |h| (Arc::clone(&repo), h))
        })
        .collect();
    tracing::debug!(branches = open.len(), "warming commit metadata");

    run_all(open.iter(), limit, |(repo, head)| async move {
        // result discarded; the serial pass below reads it again
        let _ = gateway.commit(repo, &head.sha).await;
    })
    .await;

    let mut groups = AuthorGroups::new();
    for (repo, head) in open {
        let resolved = gateway.commit(&repo, &head.sha).await;
        match resolved {
            Ok(meta) => {
                let author = Developer::from_login(meta.author.as_deref());
                groups
                    .entry(author)
                    .or_default()
                    .push(BranchRecord::new(repo, &head.name, meta));
            }
            Err(e) => {
                tracing::warn!("resolving last commit of {repo}:{}: {e}", head.name);
            }
        }
    }

    Ok(groups)
}
