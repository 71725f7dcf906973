//! Query surface over the indexed entities.
//!
//! Every list query filters, orders by its entity's timestamp and keeps the `first` items.
//! An empty status filter matches every status.
use std::cmp::Ordering;

use serde::Deserialize;

use crate::{
    entities::{
        AllowlistEntry, AllowlistKind, Arbitration, ArbitrationStatus, CategoryScore, Review, RewardDistribution,
        Submission, SubmissionStatus, Task, TaskStatus, User,
    },
    stats::{DailyStatistic, Statistics},
    store::EntityStore,
};

pub const DEFAULT_FIRST: usize = 100;
pub const MAX_FIRST: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub first: usize,
    pub order: OrderDirection,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            first: DEFAULT_FIRST,
            order: OrderDirection::Desc,
        }
    }
}

impl Page {
    pub fn new(first: Option<usize>, order: Option<OrderDirection>) -> Self {
        Self {
            first: first.unwrap_or(DEFAULT_FIRST).min(MAX_FIRST),
            order: order.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub statuses: Vec<TaskStatus>,
    pub publisher: Option<String>,
    pub page: Page,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionQuery {
    pub statuses: Vec<SubmissionStatus>,
    pub task: Option<String>,
    pub submitter: Option<String>,
    pub page: Page,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewQuery {
    pub reviewer: Option<String>,
    pub submission: Option<String>,
    pub page: Page,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArbitrationQuery {
    pub statuses: Vec<ArbitrationStatus>,
    pub requester: Option<String>,
    pub page: Page,
}

/// Numeric ids sort numerically, anything else after them by text.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn paginate<'a, T, I>(items: I, page: Page, key: impl Fn(&T) -> (u64, &str)) -> Vec<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut items: Vec<&T> = items.collect();
    items.sort_by(|a, b| {
        let (ta, ia) = key(a);
        let (tb, ib) = key(b);
        let ordering = ta.cmp(&tb).then_with(|| compare_ids(ia, ib));
        match page.order {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        }
    });
    items.into_iter().take(page.first).cloned().collect()
}

fn matches_status<S: PartialEq>(filter: &[S], status: &S) -> bool {
    filter.is_empty() || filter.contains(status)
}

fn matches_id(filter: Option<&String>, value: &str) -> bool {
    filter.is_none_or(|f| f.eq_ignore_ascii_case(value))
}

impl EntityStore {
    pub fn task(&self, id: &str) -> Option<Task> {
        self.tasks.get(id).cloned()
    }

    pub fn query_tasks(&self, q: &TaskQuery) -> Vec<Task> {
        let items = self
            .tasks
            .values()
            .filter(|t| matches_status(&q.statuses, &t.status))
            .filter(|t| matches_id(q.publisher.as_ref(), &t.publisher));
        paginate(items, q.page, |t: &Task| (t.created_at, t.id.as_str()))
    }

    pub fn submission(&self, id: &str) -> Option<Submission> {
        self.submissions.get(id).cloned()
    }

    pub fn query_submissions(&self, q: &SubmissionQuery) -> Vec<Submission> {
        let items = self
            .submissions
            .values()
            .filter(|s| matches_status(&q.statuses, &s.status))
            .filter(|s| matches_id(q.task.as_ref(), &s.task))
            .filter(|s| matches_id(q.submitter.as_ref(), &s.submitter));
        paginate(items, q.page, |s: &Submission| (s.submitted_at, s.id.as_str()))
    }

    pub fn query_reviews(&self, q: &ReviewQuery) -> Vec<Review> {
        let items = self
            .reviews
            .values()
            .filter(|r| matches_id(q.reviewer.as_ref(), &r.reviewer))
            .filter(|r| matches_id(q.submission.as_ref(), &r.submission));
        paginate(items, q.page, |r: &Review| (r.reviewed_at, r.id.as_str()))
    }

    pub fn query_arbitrations(&self, q: &ArbitrationQuery) -> Vec<Arbitration> {
        let items = self
            .arbitrations
            .values()
            .filter(|a| matches_status(&q.statuses, &a.status))
            .filter(|a| matches_id(q.requester.as_ref(), &a.requester));
        paginate(items, q.page, |a: &Arbitration| (a.requested_at, a.id.as_str()))
    }

    pub fn user(&self, address: &str) -> Option<User> {
        self.users.get(&address.to_ascii_lowercase()).cloned()
    }

    pub fn category_scores_of(&self, address: &str) -> Vec<CategoryScore> {
        let address = address.to_ascii_lowercase();
        self.category_scores
            .values()
            .filter(|s| s.user == address)
            .cloned()
            .collect()
    }

    /// Distributions for any of `submissions`, newest first.
    pub fn reward_distributions_for(&self, submissions: &[String], first: usize) -> Vec<RewardDistribution> {
        let items = self
            .reward_distributions
            .values()
            .filter(|d| submissions.contains(&d.submission));
        let page = Page {
            first,
            order: OrderDirection::Desc,
        };
        paginate(items, page, |d: &RewardDistribution| (d.distributed_at, d.id.as_str()))
    }

    /// Entries of `kind` that are currently allowed, oldest first.
    pub fn allowed(&self, kind: AllowlistKind) -> Vec<AllowlistEntry> {
        let items = self.allowlist(kind).values().filter(|e| e.is_allowed);
        let page = Page {
            first: usize::MAX,
            order: OrderDirection::Asc,
        };
        paginate(items, page, |e: &AllowlistEntry| (e.added_at, e.id.as_str()))
    }
}

impl Statistics {
    pub fn query_daily(&self, page: Page) -> Vec<DailyStatistic> {
        paginate(self.daily.values(), page, |d: &DailyStatistic| (d.date, d.id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{
        submission_created, submission_status, task_created, task_published, user_staked, Harness,
    };

    fn seeded() -> Harness {
        let mut h = Harness::default();
        h.apply(300, task_created(1, "0xa")).unwrap();
        h.apply(100, task_created(2, "0xb")).unwrap();
        h.apply(200, task_created(10, "0xa")).unwrap();
        h.apply(400, task_published(2)).unwrap();
        h
    }

    #[test]
    fn tasks_order_by_creation() {
        let h = seeded();
        let ids = |tasks: Vec<Task>| tasks.into_iter().map(|t| t.id).collect::<Vec<_>>();

        let newest = h.index.entities.query_tasks(&TaskQuery::default());
        assert_eq!(ids(newest), ["1", "10", "2"]);

        let oldest_two = h.index.entities.query_tasks(&TaskQuery {
            page: Page::new(Some(2), Some(OrderDirection::Asc)),
            ..TaskQuery::default()
        });
        assert_eq!(ids(oldest_two), ["2", "10"]);
    }

    #[test]
    fn filters_by_status_and_owner() {
        let h = seeded();
        let drafts = h.index.entities.query_tasks(&TaskQuery {
            statuses: vec![TaskStatus::Draft],
            publisher: Some("0xA".to_owned()),
            ..TaskQuery::default()
        });
        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|t| t.publisher == "0xa"));

        let published = h.index.entities.query_tasks(&TaskQuery {
            statuses: vec![TaskStatus::Published, TaskStatus::Active],
            ..TaskQuery::default()
        });
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, "2");
    }

    #[test]
    fn submissions_by_status() {
        let mut h = seeded();
        h.apply(500, submission_created(1, 2, "0xs")).unwrap();
        h.apply(510, submission_created(2, 2, "0xs")).unwrap();
        h.apply(520, submission_status(1, 3)).unwrap();

        let open = h.index.entities.query_submissions(&SubmissionQuery {
            statuses: vec![SubmissionStatus::Submitted, SubmissionStatus::UnderReview],
            task: Some("2".to_owned()),
            ..SubmissionQuery::default()
        });
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "2");
    }

    #[test]
    fn ties_break_on_numeric_id() {
        assert_eq!(compare_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_ids("10", "abc"), Ordering::Less);
        assert_eq!(compare_ids("b", "a"), Ordering::Greater);
    }

    #[test]
    fn page_is_capped() {
        assert_eq!(Page::new(Some(50_000), None).first, MAX_FIRST);
        assert_eq!(Page::new(None, None), Page::default());
    }

    #[test]
    fn daily_statistics_ordering() {
        let mut h = Harness::default();
        h.apply(10, user_staked("0xa", 1)).unwrap();
        h.apply(86_400 * 2, user_staked("0xa", 1)).unwrap();
        h.apply(86_400 * 5, user_staked("0xa", 1)).unwrap();

        let days = h.index.stats.query_daily(Page::new(Some(2), Some(OrderDirection::Asc)));
        assert_eq!(days.iter().map(|d| d.date).collect::<Vec<_>>(), [0, 172_800]);
    }
}
