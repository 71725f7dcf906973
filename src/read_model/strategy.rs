//! Adoption strategy inspection.
use serde::Serialize;

use super::ReadModel;
use crate::strategy::{evaluate_strategy_config, StrategyConfig, StrategyIssue};

/// Where a strategy config came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Live,
    Fallback,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfigView {
    pub address: String,
    pub source: ConfigSource,
    pub config: Option<StrategyConfig>,
    pub issues: Vec<StrategyIssue>,
    pub approvals_required: u64,
    pub rejections_required: u64,
    /// Why the live read failed, if it did.
    pub error: Option<String>,
}

impl ReadModel {
    /// The config of `address`: read live, else from the fallback table.
    pub async fn load_strategy_config(&self, address: &str) -> StrategyConfigView {
        let address = address.trim().to_ascii_lowercase();
        let from_table = || {
            self.strategies
                .get(&address)
                .map_or((ConfigSource::None, None), |c| (ConfigSource::Fallback, Some(c.clone())))
        };

        let ((source, config), error) = match self.live.strategy_config(&address).await {
            Ok(Some(config)) => ((ConfigSource::Live, Some(config)), None),
            Ok(None) => (from_table(), None),
            Err(e) => (from_table(), Some(e.message)),
        };

        StrategyConfigView {
            issues: evaluate_strategy_config(config.as_ref()),
            approvals_required: config.as_ref().map_or(0, StrategyConfig::approvals_required),
            rejections_required: config.as_ref().map_or(0, StrategyConfig::rejections_required),
            address,
            source,
            config,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chain::ReadError,
        reducer::ZERO_ADDRESS,
        strategy::RawStrategyConfig,
        tests::{Harness, MockContracts, SIMPLE_STRATEGY},
    };

    #[tokio::test]
    async fn live_config_with_counts() {
        let mock = MockContracts::default().with_simple_config(RawStrategyConfig {
            min_reviews_required: 10,
            approval_threshold: 5,
            rejection_threshold: 50,
            expiration_time: 86_400,
            allow_time_based_adoption: false,
            auto_adoption_time: 0,
        });
        let view = Harness::default().read_model(mock).load_strategy_config("0xABC").await;

        assert_eq!(view.address, "0xabc");
        assert_eq!(view.source, ConfigSource::Live);
        assert_eq!(view.approvals_required, 1);
        assert_eq!(view.rejections_required, 5);
        assert!(view.issues.is_empty());
        assert_eq!(view.error, None);
    }

    #[tokio::test]
    async fn failed_read_uses_the_table() {
        let mock = MockContracts::default().with_strategy_error(ReadError::new("execution reverted"));
        let model = Harness::default().read_model(mock);

        let known = model.load_strategy_config(SIMPLE_STRATEGY).await;
        assert_eq!(known.source, ConfigSource::Fallback);
        assert_eq!(known.approvals_required, 2);
        assert_eq!(known.error.as_deref(), Some("execution reverted"));

        let unknown = model.load_strategy_config("0xdead").await;
        assert_eq!(unknown.source, ConfigSource::None);
        assert_eq!(unknown.config, None);
        assert_eq!(unknown.approvals_required, 0);
        assert!(unknown.issues.is_empty());
    }

    #[tokio::test]
    async fn zero_address_has_no_config() {
        let mock = MockContracts::default().with_strategy_error(ReadError::new("execution reverted"));
        let view = Harness::default().read_model(mock).load_strategy_config(ZERO_ADDRESS).await;

        assert_eq!(view.address, ZERO_ADDRESS);
        assert_eq!(view.source, ConfigSource::None);
        assert_eq!(view.config, None);
        assert_eq!(view.error, None);
        assert!(view.issues.is_empty());
    }

    #[tokio::test]
    async fn empty_blob_is_no_config() {
        let mock = MockContracts::default().with_strategy_bytes(Vec::new());
        let view = Harness::default().read_model(mock).load_strategy_config("0xdead").await;
        assert_eq!(view.source, ConfigSource::None);
        assert_eq!(view.error, None);
    }
}
