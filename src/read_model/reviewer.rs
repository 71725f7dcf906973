//! Reviewer metrics.
//!
//! Accuracy only counts reviews of concluded submissions. Rewards are an estimate: a
//! distribution's reviewer share split evenly over every review cast on the submission.
use serde::Serialize;

use super::{degrade, token::TokenAmount, ReadModel};
use crate::{
    entities::{ArbitrationStatus, Review, Submission},
    query::{ArbitrationQuery, OrderDirection, Page, ReviewQuery},
};

/// Most recent reviews considered.
const RECENT_REVIEWS: usize = 30;
/// Distinct submissions whose rewards are looked up.
const REWARD_SUBMISSIONS: usize = 50;
const REWARD_DISTRIBUTIONS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedReward {
    pub symbol: String,
    pub amount: TokenAmount,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerMetrics {
    pub total_reviews: u64,
    pub concluded_reviews: u64,
    pub accurate_reviews: u64,
    pub accuracy_rate: u64,
    pub disputes_defended: u64,
    pub queued_rewards: Vec<QueuedReward>,
}

/// `accurate / concluded` as a whole percentage, rounded half up and clamped to 0-100.
/// No concluded reviews is 0.
pub fn accuracy_rate(accurate: u64, concluded: u64) -> u64 {
    if concluded == 0 {
        return 0;
    }
    let accurate = u128::from(accurate.min(concluded));
    let concluded = u128::from(concluded);
    let rate = (accurate * 200 + concluded) / (2 * concluded);
    u64::try_from(rate.min(100)).unwrap_or(100)
}

fn count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl ReadModel {
    async fn reviewed_submissions(&self, reviews: &[Review]) -> Vec<Option<Submission>> {
        let lookups = reviews.iter().map(|r| async move {
            degrade("reviewer submission", self.snapshot.submission(&r.submission).await)
        });
        futures::future::join_all(lookups).await
    }

    async fn queued_rewards(&self, reviews: &[Review]) -> Vec<QueuedReward> {
        let mut submissions: Vec<String> = Vec::new();
        for review in reviews {
            if !submissions.contains(&review.submission) {
                submissions.push(review.submission.clone());
            }
        }
        submissions.truncate(REWARD_SUBMISSIONS);
        if submissions.is_empty() {
            return Vec::new();
        }

        let distributions = degrade(
            "loadReviewerMetrics rewards",
            self.snapshot.reward_distributions(&submissions, REWARD_DISTRIBUTIONS).await,
        );

        // Raw amounts per symbol, in first-seen order.
        let mut totals: Vec<(crate::read_model::token::TokenInfo, u128)> = Vec::new();
        for distribution in distributions {
            let Some(submission) = degrade(
                "reward submission",
                self.snapshot.submission(&distribution.submission).await,
            ) else {
                continue;
            };
            let reviews = u128::from(submission.approve_count.saturating_add(submission.reject_count));
            if distribution.reviewer_share == 0 || reviews == 0 {
                continue;
            }
            let share = distribution.reviewer_share / reviews;
            if share == 0 {
                continue;
            }

            let task = degrade("reward task", self.snapshot.task(&distribution.task).await);
            let token = self.tokens.get(task.as_ref().and_then(|t| t.reward_token.as_deref()));
            match totals.iter_mut().find(|(t, _)| t.symbol == token.symbol) {
                Some((_, total)) => *total = total.saturating_add(share),
                None => totals.push((token, share)),
            }
        }

        totals
            .into_iter()
            .map(|(token, raw)| QueuedReward {
                symbol: token.symbol.clone(),
                amount: TokenAmount::new(raw, &token),
            })
            .collect()
    }

    /// Metrics for the reviewer at `address`. Failed reads contribute nothing.
    pub async fn load_reviewer_metrics(&self, address: &str) -> ReviewerMetrics {
        let address = address.trim().to_ascii_lowercase();
        if address.is_empty() {
            return ReviewerMetrics::default();
        }

        let total_reviews = degrade("loadReviewerMetrics user", self.snapshot.user(&address).await)
            .map_or(0, |u| u.review_count);

        let reviews = degrade(
            "loadReviewerMetrics reviews",
            self.snapshot
                .reviews(&ReviewQuery {
                    reviewer: Some(address.clone()),
                    submission: None,
                    page: Page {
                        first: RECENT_REVIEWS,
                        order: OrderDirection::Desc,
                    },
                })
                .await,
        );

        let submissions = self.reviewed_submissions(&reviews).await;
        let mut concluded = 0;
        let mut accurate = 0;
        for (review, submission) in reviews.iter().zip(&submissions) {
            let Some(status) = submission.as_ref().map(|s| s.status) else {
                continue;
            };
            if status.is_terminal() {
                concluded += 1;
                if review.outcome.is_accurate_for(status) {
                    accurate += 1;
                }
            }
        }

        let defended = degrade(
            "loadReviewerMetrics arbitrations",
            self.snapshot
                .arbitrations(&ArbitrationQuery {
                    statuses: vec![ArbitrationStatus::Approved, ArbitrationStatus::Dismissed],
                    requester: Some(address.clone()),
                    page: Page {
                        first: usize::MAX,
                        order: OrderDirection::Desc,
                    },
                })
                .await,
        );

        ReviewerMetrics {
            total_reviews,
            concluded_reviews: concluded,
            accurate_reviews: accurate,
            accuracy_rate: accuracy_rate(accurate, concluded),
            disputes_defended: count(defended.len()),
            queued_rewards: self.queued_rewards(&reviews).await,
        }
    }
}
