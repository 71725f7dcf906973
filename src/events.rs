//! Indexer inputs.
//!
//! Events arrive as JSON, one object per log:
//!
//! ```json
//! {
//!   "meta": { "blockNumber": 1, "blockTimestamp": 1700000000, "transactionHash": "0x..", "logIndex": 0 },
//!   "event": { "type": "TaskPublished", "taskId": 1, "publishedAt": 1700000000 }
//! }
//! ```
use serde::{Deserialize, Serialize};

use crate::entities::{decimal, BlockRef};

/// Where a log was emitted. `(transaction_hash, log_index)` identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: String,
    pub log_index: u64,
}

impl EventMeta {
    /// `{txHash}_{logIndex}`.
    pub fn entity_id(&self) -> String {
        format!("{}_{}", self.transaction_hash, self.log_index)
    }

    pub fn block(&self) -> BlockRef {
        BlockRef {
            number: self.block_number,
            timestamp: self.block_timestamp,
            transaction_hash: self.transaction_hash.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub meta: EventMeta,
    pub event: Event,
}

/// Every contract event the reducer handles.
///
/// Status and outcome fields carry the raw on-chain enum code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    GuardAllowed(GuardAllowed),
    GuardDisallowed(GuardDisallowed),
    StrategyAllowed(StrategyAllowed),
    StrategyDisallowed(StrategyDisallowed),
    TokenAllowed(TokenAllowed),
    TokenDisallowed(TokenDisallowed),
    ArbitrationRequested(ArbitrationRequested),
    ArbitrationResolved(ArbitrationResolved),
    ArbitrationFeeRefunded(ArbitrationFeeRefunded),
    ArbitrationFeeForfeited(ArbitrationFeeForfeited),
    #[serde(rename = "SBTMinted")]
    SbtMinted(SbtMinted),
    ReputationUpdated(ReputationUpdated),
    CategoryScoreUpdated(CategoryScoreUpdated),
    StakeAmountUpdated(StakeAmountUpdated),
    UserInitialized(UserInitialized),
    ReputationChanged(ReputationChanged),
    UserStatusChanged(UserStatusChanged),
    UserStaked(UserStaked),
    UnstakeRequested(UnstakeRequested),
    UserUnstaked(UserUnstaked),
    CategoryScoreClaimed(CategoryScoreClaimed),
    SubmissionCreated(SubmissionCreated),
    SubmissionUpdated(SubmissionUpdated),
    SubmissionStatusChanged(SubmissionStatusChanged),
    SubmissionAdopted(SubmissionAdopted),
    ReviewSubmitted(ReviewSubmitted),
    TaskCreated(TaskCreated),
    TaskPublished(TaskPublished),
    TaskCompleted(TaskCompleted),
    TaskExpired(TaskExpired),
    TaskCancelled(TaskCancelled),
    TaskGuardsUpdated(TaskGuardsUpdated),
    RewardDistributed(RewardDistributed),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardAllowed {
    pub guard: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardDisallowed {
    pub guard: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAllowed {
    pub strategy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDisallowed {
    pub strategy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAllowed {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDisallowed {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationRequested {
    pub arbitration_id: u64,
    pub requester: String,
    pub arbitration_type: u8,
    pub target_id: u64,
    #[serde(default)]
    pub evidence: String,
    #[serde(with = "decimal")]
    pub deposit_amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationResolved {
    pub arbitration_id: u64,
    pub decision: u8,
    pub resolver: String,
    #[serde(default)]
    pub reason: String,
    pub resolved_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationFeeRefunded {
    pub arbitration_id: u64,
    pub recipient: String,
    #[serde(with = "decimal")]
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbitrationFeeForfeited {
    pub arbitration_id: u64,
    #[serde(default)]
    pub payer: Option<String>,
    #[serde(with = "decimal")]
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SbtMinted {
    pub user: String,
    pub token_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationUpdated {
    pub user: String,
    pub new_reputation: i64,
    pub new_status: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScoreUpdated {
    pub user: String,
    pub category: String,
    #[serde(with = "decimal")]
    pub new_score: i128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeAmountUpdated {
    pub user: String,
    #[serde(with = "decimal")]
    pub new_stake_amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInitialized {
    pub user: String,
    pub initial_reputation: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationChanged {
    pub user: String,
    pub change: i64,
    pub new_reputation: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusChanged {
    pub user: String,
    pub old_status: u8,
    pub new_status: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStaked {
    pub user: String,
    #[serde(with = "decimal")]
    pub amount: u128,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnstakeRequested {
    pub user: String,
    pub unlock_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUnstaked {
    pub user: String,
    #[serde(with = "decimal")]
    pub amount: u128,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScoreClaimed {
    pub user: String,
    pub category: String,
    #[serde(with = "decimal")]
    pub score_increase: i128,
    #[serde(with = "decimal")]
    pub new_score: i128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCreated {
    pub submission_id: u64,
    pub task_id: u64,
    pub submitter: String,
    pub content_hash: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionUpdated {
    pub submission_id: u64,
    pub new_content_hash: String,
    pub new_version: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatusChanged {
    pub submission_id: u64,
    pub new_status: u8,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAdopted {
    pub submission_id: u64,
    pub task_id: u64,
    pub submitter: String,
    pub adopted_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmitted {
    pub review_id: u64,
    pub submission_id: u64,
    pub reviewer: String,
    pub outcome: u8,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreated {
    pub task_id: u64,
    pub publisher: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: String,
    pub category: String,
    pub deadline: u64,
    #[serde(with = "decimal")]
    pub reward: u128,
    pub reward_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPublished {
    pub task_id: u64,
    pub published_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompleted {
    pub task_id: u64,
    pub adopted_submission_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskExpired {
    pub task_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCancelled {
    pub task_id: u64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskGuardsUpdated {
    pub task_id: u64,
    pub submission_guard: String,
    pub review_guard: String,
    pub adoption_strategy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDistributed {
    pub task_id: u64,
    pub submission_id: u64,
    pub submitter: String,
    #[serde(with = "decimal")]
    pub submitter_share: u128,
    #[serde(with = "decimal")]
    pub reviewer_share: u128,
    #[serde(with = "decimal")]
    pub platform_share: u128,
}

impl Event {
    /// The contract event name, as logged.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GuardAllowed(_) => "GuardAllowed",
            Self::GuardDisallowed(_) => "GuardDisallowed",
            Self::StrategyAllowed(_) => "StrategyAllowed",
            Self::StrategyDisallowed(_) => "StrategyDisallowed",
            Self::TokenAllowed(_) => "TokenAllowed",
            Self::TokenDisallowed(_) => "TokenDisallowed",
            Self::ArbitrationRequested(_) => "ArbitrationRequested",
            Self::ArbitrationResolved(_) => "ArbitrationResolved",
            Self::ArbitrationFeeRefunded(_) => "ArbitrationFeeRefunded",
            Self::ArbitrationFeeForfeited(_) => "ArbitrationFeeForfeited",
            Self::SbtMinted(_) => "SBTMinted",
            Self::ReputationUpdated(_) => "ReputationUpdated",
            Self::CategoryScoreUpdated(_) => "CategoryScoreUpdated",
            Self::StakeAmountUpdated(_) => "StakeAmountUpdated",
            Self::UserInitialized(_) => "UserInitialized",
            Self::ReputationChanged(_) => "ReputationChanged",
            Self::UserStatusChanged(_) => "UserStatusChanged",
            Self::UserStaked(_) => "UserStaked",
            Self::UnstakeRequested(_) => "UnstakeRequested",
            Self::UserUnstaked(_) => "UserUnstaked",
            Self::CategoryScoreClaimed(_) => "CategoryScoreClaimed",
            Self::SubmissionCreated(_) => "SubmissionCreated",
            Self::SubmissionUpdated(_) => "SubmissionUpdated",
            Self::SubmissionStatusChanged(_) => "SubmissionStatusChanged",
            Self::SubmissionAdopted(_) => "SubmissionAdopted",
            Self::ReviewSubmitted(_) => "ReviewSubmitted",
            Self::TaskCreated(_) => "TaskCreated",
            Self::TaskPublished(_) => "TaskPublished",
            Self::TaskCompleted(_) => "TaskCompleted",
            Self::TaskExpired(_) => "TaskExpired",
            Self::TaskCancelled(_) => "TaskCancelled",
            Self::TaskGuardsUpdated(_) => "TaskGuardsUpdated",
            Self::RewardDistributed(_) => "RewardDistributed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_logged_event() {
        let event: LoggedEvent = serde_json::from_str(
            r#"{
                "meta": { "blockNumber": 12, "blockTimestamp": 1700000000, "transactionHash": "0xab", "logIndex": 3 },
                "event": { "type": "TaskCreated", "taskId": 1, "publisher": "0xAA", "title": "Logo",
                           "category": "design", "deadline": 1700600000, "reward": "1000000",
                           "rewardToken": "0x0000000000000000000000000000000000000000" }
            }"#,
        )
        .unwrap();

        assert_eq!(event.meta.entity_id(), "0xab_3");
        assert_eq!(event.event.name(), "TaskCreated");
        match event.event {
            Event::TaskCreated(created) => {
                assert_eq!(created.reward, 1_000_000);
                assert!(created.description.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sbt_event_keeps_contract_name() {
        let event = Event::SbtMinted(SbtMinted {
            user: "0x01".to_owned(),
            token_id: "7".to_owned(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SBTMinted");
        assert_eq!(json["tokenId"], "7");
    }

    #[test]
    fn forfeit_without_payer() {
        let event: Event = serde_json::from_str(
            r#"{ "type": "ArbitrationFeeForfeited", "arbitrationId": 4, "amount": 500 }"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Event::ArbitrationFeeForfeited(ArbitrationFeeForfeited {
                arbitration_id: 4,
                payer: None,
                amount: 500,
            })
        );
    }
}
