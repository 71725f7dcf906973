//! Indexed entities.
//!
//! Every entity is owned by the reducer; the read model only ever sees clones.
use serde::{Deserialize, Serialize};

/// Serialize integers as decimal strings, and accept either strings or JSON numbers.
///
/// On-chain amounts routinely exceed what JSON consumers can hold in a double.
pub(crate) mod decimal {
    use std::{fmt::Display, str::FromStr};

    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    pub(crate) fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub(crate) fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s,
            Repr::Unsigned(n) => n.to_string(),
            Repr::Signed(n) => n.to_string(),
        };
        text.trim().parse::<T>().map_err(D::Error::custom)
    }
}

/// The block a change was observed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BlockRef {
    pub number: u64,
    pub timestamp: u64,
    pub transaction_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Draft,
    Published,
    Active,
    Completed,
    Cancelled,
    Expired,
}

impl TaskStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Draft,
            1 => Self::Published,
            2 => Self::Active,
            3 => Self::Completed,
            4 => Self::Cancelled,
            5 => Self::Expired,
            _ => return None,
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }

    /// Counted by `GlobalStatistic::active_tasks`.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Published | Self::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Submitted,
    UnderReview,
    Normal,
    Adopted,
    Removed,
}

impl SubmissionStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Submitted,
            1 => Self::UnderReview,
            2 => Self::Normal,
            3 => Self::Adopted,
            4 => Self::Removed,
            _ => return None,
        })
    }

    /// Adopted or removed: the submission is concluded.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Adopted | Self::Removed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Uninitialized,
    Normal,
    AtRisk,
    Blacklisted,
}

impl UserStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Uninitialized,
            1 => Self::Normal,
            2 => Self::AtRisk,
            3 => Self::Blacklisted,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewOutcome {
    Approve,
    Reject,
}

impl ReviewOutcome {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Approve),
            1 => Some(Self::Reject),
            _ => None,
        }
    }

    /// Whether this outcome agrees with where the submission ended up.
    pub fn is_accurate_for(self, status: SubmissionStatus) -> bool {
        matches!(
            (status, self),
            (SubmissionStatus::Adopted, Self::Approve) | (SubmissionStatus::Removed, Self::Reject)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArbitrationType {
    UserReputation,
    SubmissionStatus,
}

impl ArbitrationType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::UserReputation),
            1 => Some(Self::SubmissionStatus),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArbitrationStatus {
    Pending,
    Approved,
    Rejected,
    Dismissed,
}

impl ArbitrationStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Pending,
            1 => Self::Approved,
            2 => Self::Rejected,
            3 => Self::Dismissed,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub publisher: String,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub category: String,
    pub deadline: u64,
    #[serde(with = "decimal")]
    pub reward: u128,
    /// `None` pays out in the native asset.
    pub reward_token: Option<String>,
    pub status: TaskStatus,
    pub submission_guard: Option<String>,
    pub review_guard: Option<String>,
    pub adoption_strategy: Option<String>,
    pub submission_count: u64,
    pub active_submission_count: u64,
    pub review_count: u64,
    pub adopted_submission_id: Option<String>,
    pub created_at: u64,
    pub published_at: Option<u64>,
    pub created_block: BlockRef,
    pub last_block: BlockRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub task: String,
    pub submitter: String,
    pub content_hash: String,
    pub version: u64,
    pub status: SubmissionStatus,
    pub approve_count: u64,
    pub reject_count: u64,
    pub submitted_at: u64,
    pub last_updated_at: u64,
    pub adopted_at: Option<u64>,
    pub created_block: BlockRef,
    pub last_block: BlockRef,
}

/// One edit of a submission. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionVersion {
    pub id: String,
    pub submission: String,
    pub version: u64,
    pub content_hash: String,
    pub created_at: u64,
    pub block: BlockRef,
}

impl SubmissionVersion {
    pub fn id_for(submission: &str, version: u64) -> String {
        format!("{submission}_v{version}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub submission: String,
    pub reviewer: String,
    pub outcome: ReviewOutcome,
    pub reason: String,
    pub reviewed_at: u64,
    pub block: BlockRef,
}

/// Default reputation of a fresh user, with one implied decimal (100.0).
pub const DEFAULT_REPUTATION: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub reputation: i64,
    pub status: UserStatus,
    #[serde(with = "decimal")]
    pub staked_amount: u128,
    pub task_count: u64,
    pub submission_count: u64,
    pub review_count: u64,
    pub adopted_submission_count: u64,
    pub accurate_review_count: u64,
    pub sbt_token_id: Option<String>,
    pub initialized_at: Option<u64>,
    pub last_activity_at: u64,
    pub created_block: BlockRef,
}

impl User {
    /// A user seen for the first time, before any initialization event.
    pub fn fresh(id: &str, block: BlockRef) -> Self {
        Self {
            id: id.to_owned(),
            reputation: DEFAULT_REPUTATION,
            status: UserStatus::Uninitialized,
            staked_amount: 0,
            task_count: 0,
            submission_count: 0,
            review_count: 0,
            adopted_submission_count: 0,
            accurate_review_count: 0,
            sbt_token_id: None,
            initialized_at: None,
            last_activity_at: 0,
            created_block: block,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub id: String,
    pub user: String,
    pub category: String,
    #[serde(with = "decimal")]
    pub score: i128,
    #[serde(with = "decimal")]
    pub pending_score: i128,
    pub last_claim_at: u64,
    pub last_updated_at: u64,
}

impl CategoryScore {
    pub fn id_for(user: &str, category: &str) -> String {
        format!("{user}_{category}")
    }

    pub fn fresh(user: &str, category: &str) -> Self {
        Self {
            id: Self::id_for(user, category),
            user: user.to_owned(),
            category: category.to_owned(),
            score: 0,
            pending_score: 0,
            last_claim_at: 0,
            last_updated_at: 0,
        }
    }
}

/// How an arbitration deposit was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FeeSettlement {
    Refunded {
        recipient: String,
        #[serde(with = "decimal")]
        amount: u128,
    },
    Forfeited {
        payer: Option<String>,
        #[serde(with = "decimal")]
        amount: u128,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arbitration {
    pub id: String,
    pub arbitration_id: String,
    pub requester: String,
    pub arbitration_type: ArbitrationType,
    pub target_id: String,
    pub evidence: String,
    #[serde(with = "decimal")]
    pub fee_amount: u128,
    /// Arbitration deposits are not tagged with a token; native unless set.
    pub fee_token: Option<String>,
    pub status: ArbitrationStatus,
    pub resolution: Option<String>,
    pub resolved_by: Option<String>,
    pub requested_at: u64,
    pub resolved_at: Option<u64>,
    pub fee_settlement: Option<FeeSettlement>,
    pub created_block: BlockRef,
    pub last_block: BlockRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AllowlistKind {
    Guard,
    Strategy,
    Token,
}

/// Current allowlist state of one address. Re-allowing replaces the previous record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowlistEntry {
    pub id: String,
    pub kind: AllowlistKind,
    pub is_allowed: bool,
    pub added_at: u64,
    pub removed_at: Option<u64>,
    pub block: BlockRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDistribution {
    pub id: String,
    pub task: String,
    pub submission: String,
    pub submitter: String,
    #[serde(with = "decimal")]
    pub submitter_share: u128,
    #[serde(with = "decimal")]
    pub reviewer_share: u128,
    #[serde(with = "decimal")]
    pub platform_share: u128,
    pub distributed_at: u64,
    pub block: BlockRef,
}

/// A typed audit trail entry recorded alongside entity changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// `{txHash}_{logIndex}`.
    pub id: String,
    /// The task, submission or user the entry belongs to.
    pub subject: String,
    pub block: BlockRef,
    pub activity: Activity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum Activity {
    TaskCreated {
        title: String,
        category: String,
        #[serde(with = "decimal")]
        reward: u128,
    },
    TaskPublished {
        published_at: u64,
    },
    TaskCompleted {
        adopted_submission_id: String,
    },
    TaskExpired,
    TaskCancelled {
        reason: String,
    },
    TaskGuardsUpdated {
        submission_guard: Option<String>,
        review_guard: Option<String>,
        adoption_strategy: Option<String>,
    },
    SubmissionCreated {
        task_id: String,
        content_hash: String,
        version: u64,
    },
    SubmissionUpdated {
        new_content_hash: String,
        new_version: u64,
    },
    SubmissionStatusChanged {
        old_status: SubmissionStatus,
        new_status: SubmissionStatus,
        reason: String,
    },
    SubmissionAdopted {
        task_id: String,
        adopted_at: u64,
    },
    UserInitialized {
        initial_reputation: i64,
    },
    ReputationChanged {
        change: i64,
        new_reputation: i64,
        reason: String,
    },
    UserStatusChanged {
        old_status: UserStatus,
        new_status: UserStatus,
    },
    Staked {
        #[serde(with = "decimal")]
        amount: u128,
        token: String,
        #[serde(with = "decimal")]
        total_staked: u128,
    },
    UnstakeRequested {
        unlock_time: u64,
    },
    Unstaked {
        #[serde(with = "decimal")]
        amount: u128,
        token: String,
        #[serde(with = "decimal")]
        remaining_staked: u128,
    },
    CategoryScoreClaimed {
        category: String,
        #[serde(with = "decimal")]
        score_increase: i128,
        #[serde(with = "decimal")]
        new_score: i128,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(TaskStatus::from_code(2), Some(TaskStatus::Active));
        assert_eq!(TaskStatus::from_code(6), None);
        assert_eq!(SubmissionStatus::from_code(4), Some(SubmissionStatus::Removed));
        assert_eq!(UserStatus::from_code(3), Some(UserStatus::Blacklisted));
        assert_eq!(ArbitrationStatus::from_code(0), Some(ArbitrationStatus::Pending));
        assert_eq!(ReviewOutcome::from_code(2), None);
    }

    #[test]
    fn accuracy_only_against_concluded_status() {
        use SubmissionStatus::*;
        assert!(ReviewOutcome::Approve.is_accurate_for(Adopted));
        assert!(ReviewOutcome::Reject.is_accurate_for(Removed));
        assert!(!ReviewOutcome::Reject.is_accurate_for(Adopted));
        assert!(!ReviewOutcome::Approve.is_accurate_for(UnderReview));
    }

    #[test]
    fn amounts_serialize_as_strings() {
        let mut user = User::fresh("0xabc", BlockRef::default());
        user.staked_amount = 340_282_366_920_938_463_463_374_607_431_768_211_455;

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["stakedAmount"], "340282366920938463463374607431768211455");
        assert_eq!(json["status"], "UNINITIALIZED");

        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn amounts_accept_numbers() {
        let score: CategoryScore = serde_json::from_value(serde_json::json!({
            "id": "0xabc_design",
            "user": "0xabc",
            "category": "design",
            "score": -15,
            "pendingScore": "30",
            "lastClaimAt": 0,
            "lastUpdatedAt": 0,
        }))
        .unwrap();
        assert_eq!(score.score, -15);
        assert_eq!(score.pending_score, 30);
    }
}
