//! Adoption strategy configuration.
//!
//! A strategy exposes its parameters either as a structured tuple
//! (`getSimpleAdoptionConfig`) or as an ABI-encoded blob of the same tuple
//! (`getStrategyConfig`). Both are normalized into a [`StrategyConfig`].
use std::collections::HashMap;

use alloy::sol_types::SolValue as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{
    chain::{ContractReader, IAdoptionStrategy, ReadError},
    math::compute_threshold_count,
};

/// Strategy parameters exactly as the contract reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawStrategyConfig {
    pub min_reviews_required: u64,
    /// Percentage, 0-100.
    pub approval_threshold: u64,
    /// Percentage, 0-100.
    pub rejection_threshold: u64,
    /// Seconds.
    pub expiration_time: u64,
    pub allow_time_based_adoption: bool,
    /// Seconds.
    pub auto_adoption_time: u64,
}

/// Normalized adoption strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    pub min_reviews: u64,
    pub approval_threshold: u64,
    pub rejection_threshold: u64,
    pub expiration_seconds: u64,
    pub expiration_hours: f64,
    pub allow_time_based_adoption: bool,
    pub auto_adoption_seconds: Option<u64>,
    pub auto_adoption_hours: Option<f64>,
}

impl StrategyConfig {
    /// Approvals needed for adoption.
    pub fn approvals_required(&self) -> u64 {
        compute_threshold_count(self.min_reviews, self.approval_threshold)
    }

    /// Rejections needed for removal.
    pub fn rejections_required(&self) -> u64 {
        compute_threshold_count(self.min_reviews, self.rejection_threshold)
    }
}

fn to_hours(seconds: u64) -> f64 {
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    let seconds = seconds as f64;
    seconds / 3600.0
}

impl From<RawStrategyConfig> for StrategyConfig {
    fn from(raw: RawStrategyConfig) -> Self {
        let allow = raw.allow_time_based_adoption;
        // A disabled flag must not leak a stale duration.
        let auto_adoption_seconds = (allow && raw.auto_adoption_time > 0).then_some(raw.auto_adoption_time);

        Self {
            min_reviews: raw.min_reviews_required,
            approval_threshold: raw.approval_threshold,
            rejection_threshold: raw.rejection_threshold,
            expiration_seconds: raw.expiration_time,
            expiration_hours: to_hours(raw.expiration_time),
            allow_time_based_adoption: allow,
            auto_adoption_seconds,
            auto_adoption_hours: auto_adoption_seconds.map(to_hours),
        }
    }
}

/// A problem with a strategy configuration that makes it unusable or misleading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyIssue {
    MinReviews,
    ApprovalOutOfRange,
    RejectionOutOfRange,
    ThresholdOverlap,
    ExpirationMissing,
    AutoAdoptionMissing,
    AutoAdoptionOrder,
}

/// Every check runs independently; a missing config has no issues.
pub fn evaluate_strategy_config(config: Option<&StrategyConfig>) -> Vec<StrategyIssue> {
    let Some(config) = config else {
        return Vec::new();
    };

    let mut issues = Vec::new();

    if config.min_reviews < 1 {
        issues.push(StrategyIssue::MinReviews);
    }
    if !(1..=100).contains(&config.approval_threshold) {
        issues.push(StrategyIssue::ApprovalOutOfRange);
    }
    if config.rejection_threshold > 100 {
        issues.push(StrategyIssue::RejectionOutOfRange);
    }
    if config.approval_threshold.saturating_add(config.rejection_threshold) > 100 {
        issues.push(StrategyIssue::ThresholdOverlap);
    }
    if config.expiration_seconds == 0 {
        issues.push(StrategyIssue::ExpirationMissing);
    }
    if config.allow_time_based_adoption {
        match config.auto_adoption_seconds {
            None | Some(0) => issues.push(StrategyIssue::AutoAdoptionMissing),
            Some(auto) if auto >= config.expiration_seconds => {
                issues.push(StrategyIssue::AutoAdoptionOrder);
            }
            Some(_) => {}
        }
    }

    issues
}

/// Decode a `getStrategyConfig` blob. An empty blob means "no config".
pub fn decode_strategy_blob(bytes: &[u8]) -> Result<Option<RawStrategyConfig>, ReadError> {
    if bytes.is_empty() {
        return Ok(None);
    }

    let decoded = IAdoptionStrategy::SimpleAdoptionConfig::abi_decode(bytes).map_err(|e| {
        ReadError::with_short("failed to decode strategy config", format!("failed to decode strategy config: {e}"))
    })?;

    Ok(Some(decoded.into()))
}

/// Both strategy read methods failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DecodeError {
    pub message: String,
}

/// The ways a strategy config can be read, in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyRead {
    SimpleAdoption,
    EncodedBlob,
}

const READ_ORDER: [StrategyRead; 2] = [StrategyRead::SimpleAdoption, StrategyRead::EncodedBlob];

impl StrategyRead {
    async fn attempt(
        self,
        reader: &dyn ContractReader,
        strategy: &str,
    ) -> Result<Option<RawStrategyConfig>, ReadError> {
        match self {
            Self::SimpleAdoption => reader.simple_adoption_config(strategy).await.map(Some),
            Self::EncodedBlob => {
                let bytes = reader.strategy_config_bytes(strategy).await?;
                decode_strategy_blob(&bytes)
            }
        }
    }
}

/// Resolve the config of `strategy` from the chain.
///
/// The first read method that succeeds wins. `Ok(None)` means the strategy
/// reported no configuration at all.
pub async fn fetch_strategy_config(
    reader: &dyn ContractReader,
    strategy: &str,
) -> Result<Option<StrategyConfig>, DecodeError> {
    let mut last_error = None;

    for method in READ_ORDER {
        match method.attempt(reader, strategy).await {
            Ok(raw) => return Ok(raw.map(StrategyConfig::from)),
            Err(e) => {
                debug!("{method:?} read failed for {strategy}: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(DecodeError {
        message: last_error
            .map(|e| e.human_message().to_owned())
            .unwrap_or_else(|| "Unknown error".to_owned()),
    })
}

/// Static configs for well-known strategies, used when nothing can be read on-chain.
#[derive(Debug, Clone, Default)]
pub struct StrategyDefaults {
    by_address: HashMap<String, StrategyConfig>,
}

impl StrategyDefaults {
    /// The table for a deployment whose simple adoption strategy lives at `simple_adoption`.
    pub fn new(simple_adoption: &str) -> Self {
        let mut by_address = HashMap::new();
        drop(by_address.insert(
            simple_adoption.to_lowercase(),
            StrategyConfig::from(RawStrategyConfig {
                min_reviews_required: 3,
                approval_threshold: 60,
                rejection_threshold: 40,
                expiration_time: 604_800,
                allow_time_based_adoption: false,
                auto_adoption_time: 0,
            }),
        ));
        Self { by_address }
    }

    pub fn get(&self, strategy: &str) -> Option<&StrategyConfig> {
        self.by_address.get(&strategy.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::MockContracts;
    use alloy::primitives::U256;

    fn default_config() -> StrategyConfig {
        StrategyConfig::from(RawStrategyConfig {
            min_reviews_required: 3,
            approval_threshold: 60,
            rejection_threshold: 40,
            expiration_time: 604_800,
            allow_time_based_adoption: false,
            auto_adoption_time: 0,
        })
    }

    #[test]
    fn valid_config_has_no_issues() {
        assert!(evaluate_strategy_config(Some(&default_config())).is_empty());
    }

    #[test]
    fn missing_config_has_no_issues() {
        assert!(evaluate_strategy_config(None).is_empty());
    }

    #[test]
    fn approval_out_of_range_also_overlaps() {
        let config = StrategyConfig {
            approval_threshold: 150,
            ..default_config()
        };
        assert_eq!(
            evaluate_strategy_config(Some(&config)),
            vec![StrategyIssue::ApprovalOutOfRange, StrategyIssue::ThresholdOverlap]
        );
    }

    #[test]
    fn every_check_is_independent() {
        let config = StrategyConfig {
            min_reviews: 0,
            approval_threshold: 0,
            rejection_threshold: 101,
            expiration_seconds: 0,
            expiration_hours: 0.0,
            allow_time_based_adoption: true,
            auto_adoption_seconds: None,
            auto_adoption_hours: None,
        };
        assert_eq!(
            evaluate_strategy_config(Some(&config)),
            vec![
                StrategyIssue::MinReviews,
                StrategyIssue::ApprovalOutOfRange,
                StrategyIssue::RejectionOutOfRange,
                StrategyIssue::ThresholdOverlap,
                StrategyIssue::ExpirationMissing,
                StrategyIssue::AutoAdoptionMissing,
            ]
        );
    }

    #[test]
    fn auto_adoption_must_precede_expiration() {
        let raw = RawStrategyConfig {
            min_reviews_required: 3,
            approval_threshold: 60,
            rejection_threshold: 40,
            expiration_time: 3600,
            allow_time_based_adoption: true,
            auto_adoption_time: 3600,
        };
        assert_eq!(
            evaluate_strategy_config(Some(&StrategyConfig::from(raw))),
            vec![StrategyIssue::AutoAdoptionOrder]
        );

        let raw = RawStrategyConfig {
            auto_adoption_time: 1800,
            ..raw
        };
        assert!(evaluate_strategy_config(Some(&StrategyConfig::from(raw))).is_empty());
    }

    #[test]
    fn disabled_auto_adoption_drops_stale_duration() {
        let config = StrategyConfig::from(RawStrategyConfig {
            allow_time_based_adoption: false,
            auto_adoption_time: 7200,
            ..RawStrategyConfig::default()
        });
        assert_eq!(config.auto_adoption_seconds, None);
        assert_eq!(config.auto_adoption_hours, None);

        let config = StrategyConfig::from(RawStrategyConfig {
            allow_time_based_adoption: true,
            auto_adoption_time: 5400,
            ..RawStrategyConfig::default()
        });
        assert_eq!(config.auto_adoption_seconds, Some(5400));
        assert_eq!(config.auto_adoption_hours, Some(1.5));
    }

    #[test]
    fn hours_are_not_rounded() {
        let config = StrategyConfig::from(RawStrategyConfig {
            expiration_time: 5000,
            ..RawStrategyConfig::default()
        });
        assert!((config.expiration_hours - 5000.0 / 3600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn threshold_counts() {
        let config = default_config();
        assert_eq!(config.approvals_required(), 2);
        assert_eq!(config.rejections_required(), 2);
    }

    #[tokio::test]
    async fn direct_read_wins() {
        let reader = MockContracts::default().with_simple_config(RawStrategyConfig {
            min_reviews_required: 5,
            approval_threshold: 70,
            rejection_threshold: 30,
            expiration_time: 86_400,
            allow_time_based_adoption: false,
            auto_adoption_time: 0,
        });

        let config = fetch_strategy_config(&reader, "0xabc").await.unwrap().unwrap();
        assert_eq!(config.min_reviews, 5);
        assert_eq!(config.approval_threshold, 70);
    }

    #[tokio::test]
    async fn falls_back_to_encoded_blob() {
        let encoded = IAdoptionStrategy::SimpleAdoptionConfig {
            minReviewsRequired: U256::from(4_u64),
            approvalThreshold: U256::from(75_u64),
            rejectionThreshold: U256::from(25_u64),
            expirationTime: U256::from(172_800_u64),
            allowTimeBasedAdoption: true,
            autoAdoptionTime: U256::from(86_400_u64),
        }
        .abi_encode();
        let reader = MockContracts::default().with_strategy_bytes(encoded);

        let config = fetch_strategy_config(&reader, "0xabc").await.unwrap().unwrap();
        assert_eq!(config.min_reviews, 4);
        assert_eq!(config.expiration_hours, 48.0);
        assert_eq!(config.auto_adoption_seconds, Some(86_400));
    }

    #[tokio::test]
    async fn empty_blob_is_no_config() {
        let reader = MockContracts::default().with_strategy_bytes(Vec::new());
        assert_eq!(fetch_strategy_config(&reader, "0xabc").await, Ok(None));
    }

    #[tokio::test]
    async fn both_failures_surface_short_message() {
        let reader = MockContracts::default()
            .with_strategy_error(ReadError::with_short("execution reverted", "long transport error"));

        let err = fetch_strategy_config(&reader, "0xabc").await.unwrap_err();
        assert_eq!(err.message, "execution reverted");
    }

    #[tokio::test]
    async fn garbage_blob_is_a_decode_failure() {
        let reader = MockContracts::default().with_strategy_bytes(vec![1, 2, 3]);
        let err = fetch_strategy_config(&reader, "0xabc").await.unwrap_err();
        assert_eq!(err.message, "failed to decode strategy config");
    }

    #[test]
    fn fallback_table_is_case_insensitive() {
        let defaults = StrategyDefaults::new("0xBBCB88B4D6EA2F860AB8AE8DB035B11F3C052E01");
        let config = defaults.get("0xbbcb88b4d6ea2f860ab8ae8db035b11f3c052e01").unwrap();
        assert_eq!(config.min_reviews, 3);
        assert_eq!(config.expiration_hours, 168.0);
        assert_eq!(config.auto_adoption_seconds, None);
        assert!(defaults.get("0x0000000000000000000000000000000000000001").is_none());
    }
}
