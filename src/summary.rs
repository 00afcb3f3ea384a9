use crate::branches::classify::classify_all;
use crate::branches::discovery::discover;
use crate::branches::types::{
    AuthorGroups, BranchRecord, Category, Developer, DisplayFields, RecencyTier,
};
use crate::error::Result;
use crate::github::Gateway;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

pub type CategoryCounts = BTreeMap<Category, usize>;

/// Author-keyed records restricted to a single category, one map per category.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CategoryBuckets {
    pub open: AuthorGroups,
    pub closed: AuthorGroups,
    pub unlinked: AuthorGroups,
    pub never_linked: AuthorGroups,
}

impl CategoryBuckets {
    pub fn get(&self, category: Category) -> &AuthorGroups {
        match category {
            Category::Open => &self.open,
            Category::Closed => &self.closed,
            Category::Unlinked => &self.unlinked,
            Category::NeverLinked => &self.never_linked,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut AuthorGroups {
        match category {
            Category::Open => &mut self.open,
            Category::Closed => &mut self.closed,
            Category::Unlinked => &mut self.unlinked,
            Category::NeverLinked => &mut self.never_linked,
        }
    }
}

/// Finished output of one discovery run, ready to render.
#[derive(Clone, Debug, Serialize)]
pub struct BranchReport {
    pub generated_at: DateTime<Utc>,
    pub groups: AuthorGroups,
    pub counts: BTreeMap<Developer, CategoryCounts>,
    pub ranking: Vec<(Developer, usize)>,
    pub buckets: CategoryBuckets,
    pub non_empty: BTreeMap<Category, bool>,
}

impl BranchReport {
    pub fn total(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Payload handed to the page renderer for one request.
#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
    pub user_name: String,
    pub org_name: String,
    pub elapsed_secs: f64,
    pub report: Arc<BranchReport>,
}

pub fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

fn plural(n: i64, unit: &str) -> String {
    format!("{n} {unit}s ago")
}

/// Human relative age such as "3 days ago" or "a month ago".
pub fn format_age(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let dur = now.signed_duration_since(time);
    let secs = dur.num_seconds();
    let days = dur.num_days();

    if secs < 10 {
        "just now".to_string()
    } else if secs < 45 {
        plural(secs, "second")
    } else if secs < 90 {
        "a minute ago".to_string()
    } else if dur.num_minutes() < 45 {
        plural(dur.num_minutes().max(2), "minute")
    } else if dur.num_minutes() < 90 {
        "an hour ago".to_string()
    } else if dur.num_hours() < 24 {
        plural(dur.num_hours().max(2), "hour")
    } else if dur.num_hours() < 48 {
        "a day ago".to_string()
    } else if days < 7 {
        plural(days.max(2), "day")
    } else if days < 14 {
        "a week ago".to_string()
    } else if days < 30 {
        plural(days / 7, "week")
    } else if days < 60 {
        "a month ago".to_string()
    } else if days < 365 {
        plural((days / 30).max(2), "month")
    } else if days < 730 {
        "a year ago".to_string()
    } else {
        plural(days / 365, "year")
    }
}

pub fn age_days(time: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(time).num_days()
}

/// Orders each developer's records newest first and attaches age text and tier.
pub fn annotate(groups: &mut AuthorGroups, now: DateTime<Utc>) {
    for records in groups.values_mut() {
        records.sort_by(|a, b| b.last_commit.committed_at.cmp(&a.last_commit.committed_at));
        for record in records.iter_mut() {
            let at = record.last_commit.committed_at;
            record.display = Some(DisplayFields {
                age: format_age(at, now),
                tier: RecencyTier::from_age_days(age_days(at, now)),
            });
        }
    }
}

/// Every category is present in each developer's map, zero included.
pub fn count_categories(groups: &AuthorGroups) -> BTreeMap<Developer, CategoryCounts> {
    groups
        .iter()
        .map(|(dev, records)| {
            let mut counts: CategoryCounts = Category::ALL.iter().map(|&c| (c, 0)).collect();
            for category in records.iter().filter_map(BranchRecord::category) {
                *counts.entry(category).or_default() += 1;
            }
            (dev.clone(), counts)
        })
        .collect()
}

/// Developers by number of open branches, most first; ties by handle.
pub fn rank_developers(groups: &AuthorGroups) -> Vec<(Developer, usize)> {
    groups
        .iter()
        .map(|(dev, records)| (dev.clone(), records.len()))
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}

pub fn bucket(groups: &AuthorGroups) -> CategoryBuckets {
    let mut buckets = CategoryBuckets::default();
    for (dev, records) in groups {
        for record in records {
            if let Some(category) = record.category() {
                buckets
                    .get_mut(category)
                    .entry(dev.clone())
                    .or_default()
                    .push(record.clone());
            }
        }
    }
    buckets
}

pub fn summarize(mut groups: AuthorGroups, now: DateTime<Utc>) -> BranchReport {
    annotate(&mut groups, now);
    let counts = count_categories(&groups);
    let ranking = rank_developers(&groups);
    let buckets = bucket(&groups);
    let non_empty = Category::ALL
        .iter()
        .map(|&c| (c, !buckets.get(c).is_empty()))
        .collect();

    BranchReport {
        generated_at: now,
        groups,
        counts,
        ranking,
        buckets,
        non_empty,
    }
}

/// Discovery, classification and summary for one organization.
pub async fn build_report(gateway: &dyn Gateway, org: &str, limit: usize) -> Result<BranchReport> {
    let start = Instant::now();
    let mut groups = discover(gateway, org, limit).await?;
    classify_all(gateway, &mut groups, limit).await;
    let report = summarize(groups, Utc::now());
    tracing::info!(
        org,
        branches = report.total(),
        developers = report.groups.len(),
        elapsed_secs = round_secs(start.elapsed().as_secs_f64()),
        "branch report ready"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branches::types::Classification;
    use crate::github::types::{IssueState, RepoRef};
    use crate::test_utils::*;
    use chrono::Duration;

    fn record(branch: &str, days: i64, category: Category) -> BranchRecord {
        let repo = Arc::new(RepoRef::new("acme", "api", "main"));
        let mut r = BranchRecord::new(repo, branch, make_commit(Some("x"), "msg", days));
        r.classification = Some(Classification {
            category,
            labels: Vec::new(),
        });
        r
    }

    fn dev(login: &str) -> Developer {
        Developer::Known(login.to_string())
    }

    #[test]
    fn format_age_buckets() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "just now");
        assert_eq!(format_age(now - Duration::seconds(30), now), "30 seconds ago");
        assert_eq!(format_age(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(format_age(now - Duration::minutes(60), now), "an hour ago");
        assert_eq!(format_age(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_age(now - Duration::hours(30), now), "a day ago");
        assert_eq!(format_age(now - Duration::days(3), now), "3 days ago");
        assert_eq!(format_age(now - Duration::days(10), now), "a week ago");
        assert_eq!(format_age(now - Duration::days(21), now), "3 weeks ago");
        assert_eq!(format_age(now - Duration::days(45), now), "a month ago");
        assert_eq!(format_age(now - Duration::days(100), now), "3 months ago");
        assert_eq!(format_age(now - Duration::days(400), now), "a year ago");
        assert_eq!(format_age(now - Duration::days(1100), now), "3 years ago");
    }

    #[test]
    fn future_timestamps_read_as_just_now() {
        let now = Utc::now();
        assert_eq!(format_age(now + Duration::hours(2), now), "just now");
    }

    #[test]
    fn annotate_sorts_newest_first_and_tiers() {
        let mut groups = AuthorGroups::new();
        groups.insert(
            dev("alice"),
            vec![
                record("old", 45, Category::Open),
                record("new", 1, Category::Open),
                record("mid", 10, Category::Open),
            ],
        );

        annotate(&mut groups, Utc::now());

        let records = &groups[&dev("alice")];
        let order: Vec<&str> = records.iter().map(|r| r.branch.as_str()).collect();
        assert_eq!(order, vec!["new", "mid", "old"]);

        let tiers: Vec<RecencyTier> = records
            .iter()
            .map(|r| r.display.as_ref().unwrap().tier)
            .collect();
        assert_eq!(
            tiers,
            vec![RecencyTier::Fresh, RecencyTier::Warning, RecencyTier::Critical]
        );
        assert_eq!(records[2].display.as_ref().unwrap().tier.color(), "tomato");
    }

    #[test]
    fn counts_sum_to_record_total() {
        let mut groups = AuthorGroups::new();
        groups.insert(
            dev("alice"),
            vec![
                record("1-a", 1, Category::Open),
                record("2-b", 1, Category::Open),
                record("c", 1, Category::NeverLinked),
            ],
        );
        groups.insert(Developer::Unknown, vec![record("9-z", 1, Category::Unlinked)]);

        let counts = count_categories(&groups);

        for (dev, records) in &groups {
            let per_dev = &counts[dev];
            assert_eq!(per_dev.len(), 4);
            assert_eq!(per_dev.values().sum::<usize>(), records.len());
        }
        assert_eq!(counts[&dev("alice")][&Category::Open], 2);
        assert_eq!(counts[&dev("alice")][&Category::Closed], 0);
    }

    #[test]
    fn ranking_orders_by_count_then_handle() {
        let mut groups = AuthorGroups::new();
        groups.insert(dev("zed"), vec![record("a", 1, Category::Open)]);
        groups.insert(
            dev("bob"),
            vec![record("b", 1, Category::Open), record("c", 1, Category::Open)],
        );
        groups.insert(dev("amy"), vec![record("d", 1, Category::Closed)]);

        let ranking = rank_developers(&groups);
        assert_eq!(ranking, vec![(dev("bob"), 2), (dev("amy"), 1), (dev("zed"), 1)]);
    }

    #[test]
    fn buckets_split_by_category_and_flag_empties() {
        let mut groups = AuthorGroups::new();
        groups.insert(
            dev("alice"),
            vec![record("1-a", 1, Category::Open), record("b", 1, Category::NeverLinked)],
        );
        groups.insert(dev("bob"), vec![record("2-c", 1, Category::Open)]);

        let report = summarize(groups, Utc::now());

        assert_eq!(report.buckets.open.len(), 2);
        assert_eq!(report.buckets.never_linked[&dev("alice")].len(), 1);
        assert!(report.buckets.closed.is_empty());
        assert!(report.non_empty[&Category::Open]);
        assert!(!report.non_empty[&Category::Closed]);
        assert!(!report.non_empty[&Category::Unlinked]);
        assert!(report.non_empty[&Category::NeverLinked]);
        assert_eq!(report.total(), 3);
    }

    #[tokio::test]
    async fn build_report_runs_whole_pipeline() {
        let gw = FakeGateway::new("acme")
            .with_repo("a", "main", &[("main", "a0"), ("12-fix", "a1"), ("refactor", "a2")])
            .with_repo("b", "main", &[("main", "b0"), ("99-feature", "b1")])
            .with_commit("a1", Some("alice"), "fix", 2)
            .with_commit("a2", Some("bob"), "cleanup", 40)
            .with_commit("b1", Some("bob"), "feature", 12)
            .with_issue("a", 12, IssueState::Open, &["bug"]);

        let report = build_report(&gw, "acme", 8).await.unwrap();

        assert_eq!(report.total(), 3);
        assert_eq!(report.ranking[0], (dev("bob"), 2));
        assert_eq!(report.buckets.open[&dev("alice")][0].labels(), ["bug".to_string()]);
        assert_eq!(report.buckets.unlinked[&dev("bob")][0].branch, "99-feature");
        assert_eq!(report.buckets.never_linked[&dev("bob")][0].branch, "refactor");
        assert!(report
            .groups
            .values()
            .flatten()
            .all(|r| r.display.is_some()));
    }

    #[test]
    fn elapsed_rounds_to_two_decimals() {
        assert_eq!(round_secs(1.23456), 1.23);
        assert_eq!(round_secs(0.005), 0.01);
    }
}
