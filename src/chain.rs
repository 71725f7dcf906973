//! Live contract reads.
//!
//! The indexer cannot express guard and strategy parameters, so the read model
//! fetches them straight from the chain through a [`ContractReader`].
use alloy::{
    primitives::{Address, Bytes, U256},
    providers::{DynProvider, Provider as _, ProviderBuilder},
    sol,
};
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
    guard::{ReviewGuardConfig, SubmissionGuardConfig},
    strategy::RawStrategyConfig,
};

sol! {
    #[sol(rpc)]
    interface IAdoptionStrategy {
        struct SimpleAdoptionConfig {
            uint256 minReviewsRequired;
            uint256 approvalThreshold;
            uint256 rejectionThreshold;
            uint256 expirationTime;
            bool allowTimeBasedAdoption;
            uint256 autoAdoptionTime;
        }

        function getSimpleAdoptionConfig() external view returns (SimpleAdoptionConfig memory);
        function getStrategyConfig() external view returns (bytes memory config);
    }

    #[sol(rpc)]
    interface ISubmissionGuard {
        struct SubmissionConfig {
            uint256 minReputationScore;
            uint256 minCategoryScore;
            uint256 maxFailedSubmissions;
            uint256 minSuccessRate;
            bool requireCategoryExpertise;
            bool enforceSuccessRate;
            string requiredCategory;
        }

        function getSubmissionConfig() external view returns (SubmissionConfig memory config);
        function validateUser(address user, bytes calldata data) external view returns (bool success, string memory reason);
    }

    #[sol(rpc)]
    interface IReviewGuard {
        struct ReviewConfig {
            uint256 minReputationScore;
            uint256 minCategoryScore;
            uint256 minReviewCount;
            uint256 minAccuracyRate;
            bool requireCategoryExpertise;
            bool enforceAccuracyRate;
            string requiredCategory;
        }

        function getReviewConfig() external view returns (ReviewConfig memory config);
    }
}

/// A failed contract read.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ReadError {
    /// A short, human-readable reason (e.g. a JSON-RPC error message), if the transport gave one.
    short_message: Option<String>,
    /// The full error message.
    message: String,
}

impl ReadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            short_message: None,
            message: message.into(),
        }
    }

    pub fn with_short(short_message: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            short_message: Some(short_message.into()),
            message: message.into(),
        }
    }

    /// The message to show a user: the short form when present, otherwise the full one.
    pub fn human_message(&self) -> &str {
        self.short_message
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.message)
    }
}

impl From<alloy::contract::Error> for ReadError {
    fn from(err: alloy::contract::Error) -> Self {
        let short = match &err {
            alloy::contract::Error::TransportError(rpc) => {
                rpc.as_error_resp().map(|payload| payload.message.to_string())
            }
            _ => None,
        };

        match short {
            Some(short) => Self::with_short(short, err.to_string()),
            None => Self::new(err.to_string()),
        }
    }
}

/// The outcome of a guard's `validateUser` call.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    pub allowed: bool,
    pub reason: String,
}

/// Read surface of guard and adoption-strategy contracts.
///
/// Addresses are lower-case hex strings.
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// `getSimpleAdoptionConfig()` on an adoption strategy.
    async fn simple_adoption_config(&self, strategy: &str) -> Result<RawStrategyConfig, ReadError>;

    /// `getStrategyConfig()` on an adoption strategy: the ABI-encoded config blob.
    async fn strategy_config_bytes(&self, strategy: &str) -> Result<Vec<u8>, ReadError>;

    async fn submission_guard_config(&self, guard: &str) -> Result<SubmissionGuardConfig, ReadError>;

    async fn review_guard_config(&self, guard: &str) -> Result<ReviewGuardConfig, ReadError>;

    /// `validateUser(user, data)` on a guard.
    async fn validate_user(&self, guard: &str, user: &str, data: &[u8]) -> Result<Validation, ReadError>;
}

/// A reader used when no RPC endpoint is configured. Every read fails, which the
/// read model turns into its fallback values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

#[async_trait]
impl ContractReader for Disconnected {
    async fn simple_adoption_config(&self, _strategy: &str) -> Result<RawStrategyConfig, ReadError> {
        Err(ReadError::new("no RPC endpoint configured"))
    }

    async fn strategy_config_bytes(&self, _strategy: &str) -> Result<Vec<u8>, ReadError> {
        Err(ReadError::new("no RPC endpoint configured"))
    }

    async fn submission_guard_config(&self, _guard: &str) -> Result<SubmissionGuardConfig, ReadError> {
        Err(ReadError::new("no RPC endpoint configured"))
    }

    async fn review_guard_config(&self, _guard: &str) -> Result<ReviewGuardConfig, ReadError> {
        Err(ReadError::new("no RPC endpoint configured"))
    }

    async fn validate_user(&self, _guard: &str, _user: &str, _data: &[u8]) -> Result<Validation, ReadError> {
        Err(ReadError::new("no RPC endpoint configured"))
    }
}

/// JSON-RPC backed [`ContractReader`].
#[derive(Clone)]
pub struct RpcContracts {
    provider: DynProvider,
}

impl std::fmt::Debug for RpcContracts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcContracts").finish_non_exhaustive()
    }
}

impl RpcContracts {
    pub fn connect(rpc_url: Url) -> Self {
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();
        Self { provider }
    }
}

fn parse_address(value: &str) -> Result<Address, ReadError> {
    value
        .parse::<Address>()
        .map_err(|e| ReadError::with_short("invalid address", format!("invalid address {value}: {e}")))
}

/// Saturate a `uint256` into a u64. Anything wider than 64 bits is far outside
/// every meaningful range for these configs.
pub(crate) fn to_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

impl From<IAdoptionStrategy::SimpleAdoptionConfig> for RawStrategyConfig {
    fn from(raw: IAdoptionStrategy::SimpleAdoptionConfig) -> Self {
        Self {
            min_reviews_required: to_u64(raw.minReviewsRequired),
            approval_threshold: to_u64(raw.approvalThreshold),
            rejection_threshold: to_u64(raw.rejectionThreshold),
            expiration_time: to_u64(raw.expirationTime),
            allow_time_based_adoption: raw.allowTimeBasedAdoption,
            auto_adoption_time: to_u64(raw.autoAdoptionTime),
        }
    }
}

impl From<ISubmissionGuard::SubmissionConfig> for SubmissionGuardConfig {
    fn from(raw: ISubmissionGuard::SubmissionConfig) -> Self {
        Self {
            min_reputation_score: to_u64(raw.minReputationScore),
            min_category_score: to_u64(raw.minCategoryScore),
            max_failed_submissions: to_u64(raw.maxFailedSubmissions),
            min_success_rate: to_u64(raw.minSuccessRate),
            require_category_expertise: raw.requireCategoryExpertise,
            enforce_success_rate: raw.enforceSuccessRate,
            required_category: raw.requiredCategory,
        }
    }
}

impl From<IReviewGuard::ReviewConfig> for ReviewGuardConfig {
    fn from(raw: IReviewGuard::ReviewConfig) -> Self {
        Self {
            min_reputation_score: to_u64(raw.minReputationScore),
            min_category_score: to_u64(raw.minCategoryScore),
            min_review_count: to_u64(raw.minReviewCount),
            min_accuracy_rate: to_u64(raw.minAccuracyRate),
            require_category_expertise: raw.requireCategoryExpertise,
            enforce_accuracy_rate: raw.enforceAccuracyRate,
            required_category: raw.requiredCategory,
        }
    }
}

#[async_trait]
impl ContractReader for RpcContracts {
    async fn simple_adoption_config(&self, strategy: &str) -> Result<RawStrategyConfig, ReadError> {
        debug!("reading getSimpleAdoptionConfig on {strategy}");
        let contract = IAdoptionStrategy::new(parse_address(strategy)?, &self.provider);
        let config = contract.getSimpleAdoptionConfig().call().await?;
        Ok(config.into())
    }

    async fn strategy_config_bytes(&self, strategy: &str) -> Result<Vec<u8>, ReadError> {
        debug!("reading getStrategyConfig on {strategy}");
        let contract = IAdoptionStrategy::new(parse_address(strategy)?, &self.provider);
        let config: Bytes = contract.getStrategyConfig().call().await?;
        Ok(config.to_vec())
    }

    async fn submission_guard_config(&self, guard: &str) -> Result<SubmissionGuardConfig, ReadError> {
        debug!("reading getSubmissionConfig on {guard}");
        let contract = ISubmissionGuard::new(parse_address(guard)?, &self.provider);
        let config = contract.getSubmissionConfig().call().await?;
        Ok(config.into())
    }

    async fn review_guard_config(&self, guard: &str) -> Result<ReviewGuardConfig, ReadError> {
        debug!("reading getReviewConfig on {guard}");
        let contract = IReviewGuard::new(parse_address(guard)?, &self.provider);
        let config = contract.getReviewConfig().call().await?;
        Ok(config.into())
    }

    async fn validate_user(&self, guard: &str, user: &str, data: &[u8]) -> Result<Validation, ReadError> {
        // `validateUser` has the same signature on submission and review guards.
        let contract = ISubmissionGuard::new(parse_address(guard)?, &self.provider);
        let result = contract
            .validateUser(parse_address(user)?, Bytes::copy_from_slice(data))
            .call()
            .await?;

        Ok(Validation {
            allowed: result.success,
            reason: result.reason,
        })
    }
}
