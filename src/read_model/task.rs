//! Task list and task detail.
use serde::Serialize;

use super::{degrade, short_address, to_iso, token::TokenAmount, ReadModel};
use crate::{
    entities::{Submission, SubmissionStatus, Task, TaskStatus},
    guard::{GuardKind, GuardRequirement},
    query::{OrderDirection, Page, SubmissionQuery, TaskQuery},
    strategy::{evaluate_strategy_config, StrategyConfig, StrategyIssue},
};

/// Submissions shown per task in a list.
const LIST_SUBMISSIONS: usize = 5;
/// Tasks shown when no `first` is given.
pub const DEFAULT_TASKS: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub id: String,
    pub author: String,
    pub submitted_at: String,
    pub status: SubmissionStatus,
    pub approve_count: u64,
    pub reject_count: u64,
    pub content_hash: String,
    pub version: u64,
}

impl From<Submission> for SubmissionView {
    fn from(s: Submission) -> Self {
        Self {
            id: s.id,
            author: s.submitter,
            submitted_at: to_iso(s.submitted_at),
            status: s.status,
            approve_count: s.approve_count,
            reject_count: s.reject_count,
            content_hash: s.content_hash,
            version: s.version,
        }
    }
}

/// The adoption rules a task runs under.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionSummary {
    pub min_reviews: u64,
    pub approval_threshold: u64,
    pub rejection_threshold: u64,
    pub allow_time_based_adoption: bool,
    pub auto_adopt_after_hours: Option<f64>,
    pub approvals_required: u64,
    pub rejections_required: u64,
}

impl From<&StrategyConfig> for AdoptionSummary {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            min_reviews: config.min_reviews,
            approval_threshold: config.approval_threshold,
            rejection_threshold: config.rejection_threshold,
            allow_time_based_adoption: config.allow_time_based_adoption,
            auto_adopt_after_hours: config.auto_adoption_hours.filter(|_| config.allow_time_based_adoption),
            approvals_required: config.approvals_required(),
            rejections_required: config.rejections_required(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGuards {
    pub submission: GuardRequirement,
    pub review: GuardRequirement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub category: String,
    pub status: TaskStatus,
    pub reward: TokenAmount,
    pub reward_token_address: Option<String>,
    pub deadline: String,
    pub release: String,
    pub guard_tags: Vec<String>,
    pub publisher: String,
    pub submissions: Vec<SubmissionView>,
    pub submission_count: u64,
    pub active_submission_count: u64,
    pub review_count: u64,
    pub guards: TaskGuards,
    pub adoption_strategy: AdoptionSummary,
    pub adoption_strategy_address: Option<String>,
    /// Problems with the strategy config in effect. Only filled in for task detail.
    pub strategy_issues: Vec<StrategyIssue>,
    /// Why the live strategy config could not be read, if it could not.
    pub strategy_error: Option<String>,
}

impl ReadModel {
    fn map_task(&self, task: Task, submissions: Vec<Submission>) -> TaskView {
        let token = self.tokens.get(task.reward_token.as_deref());

        let mut guard_tags = Vec::new();
        if let Some(guard) = &task.submission_guard {
            guard_tags.push(format!("Submission {}", short_address(guard)));
        }
        if let Some(guard) = &task.review_guard {
            guard_tags.push(format!("Review {}", short_address(guard)));
        }

        let adoption_strategy = task
            .adoption_strategy
            .as_deref()
            .and_then(|s| self.strategies.get(s))
            .map(AdoptionSummary::from)
            .unwrap_or_default();

        TaskView {
            reward: TokenAmount::new(task.reward, &token),
            reward_token_address: task.reward_token.clone(),
            deadline: to_iso(task.deadline),
            release: to_iso(task.created_at),
            guard_tags,
            submissions: submissions.into_iter().map(SubmissionView::from).collect(),
            guards: TaskGuards {
                submission: GuardRequirement {
                    address: task.submission_guard.clone(),
                    ..GuardRequirement::default()
                },
                review: GuardRequirement {
                    address: task.review_guard.clone(),
                    ..GuardRequirement::default()
                },
            },
            adoption_strategy,
            adoption_strategy_address: task.adoption_strategy.clone(),
            strategy_issues: Vec::new(),
            strategy_error: None,
            id: task.id,
            title: task.title,
            description: task.description,
            requirements: task.requirements,
            category: task.category,
            status: task.status,
            publisher: task.publisher,
            submission_count: task.submission_count,
            active_submission_count: task.active_submission_count,
            review_count: task.review_count,
        }
    }

    async fn submissions_of(&self, task: &str, first: usize) -> Vec<Submission> {
        let query = SubmissionQuery {
            task: Some(task.to_owned()),
            page: Page {
                first,
                order: OrderDirection::Desc,
            },
            ..SubmissionQuery::default()
        };
        degrade("task submissions", self.snapshot.submissions(&query).await)
    }

    /// Newest tasks first, each with its latest submissions. Strategies come from the
    /// fallback table only; live reads are left to the detail view.
    pub async fn load_tasks(&self, first: Option<usize>) -> Vec<TaskView> {
        let query = TaskQuery {
            page: Page::new(Some(first.unwrap_or(DEFAULT_TASKS)), Some(OrderDirection::Desc)),
            ..TaskQuery::default()
        };
        let tasks = degrade("loadTasks", self.snapshot.tasks(&query).await);

        let mut views = Vec::with_capacity(tasks.len());
        for task in tasks {
            let submissions = self.submissions_of(&task.id, LIST_SUBMISSIONS).await;
            views.push(self.map_task(task, submissions));
        }
        views
    }

    /// One task with every submission, guard requirements and the live strategy config.
    pub async fn load_task_detail(&self, id: &str) -> Option<TaskView> {
        let task = degrade("loadTaskDetail", self.snapshot.task(id).await)?;
        let submissions = self.submissions_of(&task.id, usize::MAX).await;

        let submission_guard = task.submission_guard.clone();
        let review_guard = task.review_guard.clone();
        let strategy = task.adoption_strategy.clone();
        let mut view = self.map_task(task, submissions);

        let (submission, review) = futures::join!(
            self.live.guard_requirement(GuardKind::Submission, submission_guard.as_deref()),
            self.live.guard_requirement(GuardKind::Review, review_guard.as_deref()),
        );
        if let Some(requirement) = submission {
            view.guards.submission = requirement;
        }
        if let Some(requirement) = review {
            view.guards.review = requirement;
        }

        if let Some(strategy) = strategy {
            let config = match self.live.strategy_config(&strategy).await {
                Ok(config) => config.or_else(|| self.strategies.get(&strategy).cloned()),
                Err(e) => {
                    view.strategy_error = Some(e.message);
                    self.strategies.get(&strategy).cloned()
                }
            };
            if let Some(config) = &config {
                view.adoption_strategy = AdoptionSummary::from(config);
            }
            view.strategy_issues = evaluate_strategy_config(config.as_ref());
        }

        Some(view)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        entities::TaskStatus,
        guard::{ReviewGuardConfig, SubmissionGuardConfig},
        reducer::ZERO_ADDRESS,
        strategy::{RawStrategyConfig, StrategyIssue},
        tests::{
            guards_updated, submission_created, task_created, task_published, FailingSnapshot, Harness,
            MockContracts, SIMPLE_STRATEGY,
        },
    };

    #[tokio::test]
    async fn list_uses_fallback_strategy() {
        let mut h = Harness::default();
        h.apply(1_700_000_000, task_created(1, "0xpub")).unwrap();
        h.apply(1_700_000_100, guards_updated(1, "0xsg", "0xrg", SIMPLE_STRATEGY)).unwrap();
        h.apply(1_700_000_200, task_published(1)).unwrap();
        for id in 1..=7 {
            h.apply(1_700_000_300 + id, submission_created(id, 1, "0xs")).unwrap();
        }

        let model = h.read_model(MockContracts::default());
        let tasks = model.load_tasks(None).await;
        assert_eq!(tasks.len(), 1);

        let task = &tasks[0];
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.submissions.len(), 5);
        assert_eq!(task.submissions[0].id, "7");
        assert_eq!(task.adoption_strategy.min_reviews, 3);
        assert_eq!(task.adoption_strategy.approvals_required, 2);
        assert_eq!(task.guard_tags, ["Submission 0xsg", "Review 0xrg"]);
        assert_eq!(task.reward.symbol, "ETH");
        assert_eq!(task.reward.display, "1 ETH");
        assert_eq!(task.release, "2023-11-14T22:13:20.000Z");
    }

    #[tokio::test]
    async fn detail_prefers_live_reads() {
        let mut h = Harness::default();
        h.apply(100, task_created(1, "0xpub")).unwrap();
        h.apply(110, guards_updated(1, "0xsg", "0xrg", SIMPLE_STRATEGY)).unwrap();

        let mock = MockContracts::default()
            .with_simple_config(RawStrategyConfig {
                min_reviews_required: 5,
                approval_threshold: 80,
                rejection_threshold: 30,
                expiration_time: 3600,
                allow_time_based_adoption: true,
                auto_adoption_time: 7200,
            })
            .with_submission_guard(SubmissionGuardConfig {
                min_reputation_score: 400,
                ..SubmissionGuardConfig::default()
            });
        let task = h.read_model(mock).load_task_detail("1").await.unwrap();

        assert_eq!(task.adoption_strategy.min_reviews, 5);
        assert_eq!(task.adoption_strategy.auto_adopt_after_hours, Some(2.0));
        assert_eq!(
            task.strategy_issues,
            [StrategyIssue::ThresholdOverlap, StrategyIssue::AutoAdoptionOrder]
        );
        assert_eq!(task.guards.submission.min_reputation, Some(40.0));
        assert_eq!(task.guards.submission.address.as_deref(), Some("0xsg"));
        // The review guard read failed; the indexed address is still shown.
        assert_eq!(task.guards.review.address.as_deref(), Some("0xrg"));
        assert_eq!(task.guards.review.min_reputation, None);
    }

    #[tokio::test]
    async fn detail_fills_review_guard() {
        let mut h = Harness::default();
        h.apply(100, task_created(1, "0xpub")).unwrap();
        h.apply(110, guards_updated(1, ZERO_ADDRESS, "0xRG", ZERO_ADDRESS)).unwrap();

        let mock = MockContracts::default().with_review_guard(ReviewGuardConfig {
            min_reputation_score: 300,
            min_review_count: 5,
            min_accuracy_rate: 70,
            enforce_accuracy_rate: true,
            ..ReviewGuardConfig::default()
        });
        let task = h.read_model(mock).load_task_detail("1").await.unwrap();

        let review = &task.guards.review;
        assert_eq!(review.address.as_deref(), Some("0xrg"));
        assert_eq!(review.min_reputation, Some(30.0));
        assert_eq!(review.min_review_count, Some(5));
        assert_eq!(review.min_accuracy_rate, Some(70));
        assert_eq!(review.required_category, None);
        assert_eq!(task.guards.submission.address, None);
        assert_eq!(task.guards.submission.min_reputation, None);
    }

    #[tokio::test]
    async fn detail_falls_back_when_live_read_fails() {
        let mut h = Harness::default();
        h.apply(100, task_created(1, "0xpub")).unwrap();
        h.apply(110, guards_updated(1, "0xsg", "0xrg", SIMPLE_STRATEGY)).unwrap();

        let task = h
            .read_model(MockContracts::default())
            .load_task_detail("1")
            .await
            .unwrap();
        assert_eq!(task.adoption_strategy.min_reviews, 3);
        assert!(task.strategy_issues.is_empty());
        assert_eq!(task.strategy_error.as_deref(), Some("not mocked"));
    }

    #[tokio::test]
    async fn failed_snapshot_degrades() {
        let model = FailingSnapshot::read_model();
        assert!(model.load_tasks(Some(10)).await.is_empty());
        assert_eq!(model.load_task_detail("1").await, None);
    }
}
