//! Review queue.
use serde::Serialize;

use super::{degrade, short_address, to_iso, ReadModel};
use crate::{
    entities::{Submission, SubmissionStatus},
    query::{OrderDirection, Page, SubmissionQuery},
};

pub const DEFAULT_QUEUE: usize = 20;
pub const DEFAULT_QUEUE_STATUSES: [SubmissionStatus; 2] = [SubmissionStatus::Submitted, SubmissionStatus::UnderReview];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueueItem {
    pub id: String,
    pub task_id: String,
    pub submission_id: String,
    pub title: String,
    pub author: String,
    pub status: SubmissionStatus,
    pub approve_count: u64,
    pub reject_count: u64,
    pub submitted_at: String,
    pub deadline: String,
    /// Short form of the task's review guard, or empty.
    pub guard: String,
}

impl ReadModel {
    async fn queue_item(&self, submission: Submission) -> ReviewQueueItem {
        let task = degrade("review queue task", self.snapshot.task(&submission.task).await);
        let (title, deadline, guard) = task.map_or_else(Default::default, |t| {
            (
                t.title,
                to_iso(t.deadline),
                t.review_guard.as_deref().map(short_address).unwrap_or_default(),
            )
        });

        ReviewQueueItem {
            task_id: submission.task,
            submission_id: submission.id.clone(),
            id: submission.id,
            title,
            author: submission.submitter,
            status: submission.status,
            approve_count: submission.approve_count,
            reject_count: submission.reject_count,
            submitted_at: to_iso(submission.submitted_at),
            deadline,
            guard,
        }
    }

    /// Submissions awaiting review, newest first. An empty status list means the default queue.
    pub async fn load_review_queue(&self, first: Option<usize>, statuses: Vec<SubmissionStatus>) -> Vec<ReviewQueueItem> {
        let statuses = if statuses.is_empty() {
            DEFAULT_QUEUE_STATUSES.to_vec()
        } else {
            statuses
        };
        let query = SubmissionQuery {
            statuses,
            page: Page::new(Some(first.unwrap_or(DEFAULT_QUEUE)), Some(OrderDirection::Desc)),
            ..SubmissionQuery::default()
        };

        let submissions = degrade("loadReviewQueues", self.snapshot.submissions(&query).await);
        let items = submissions.into_iter().map(|s| self.queue_item(s));
        futures::future::join_all(items).await
    }
}
