//! Read-model assemblers.
//!
//! Each assembler fetches what it needs from a [`SnapshotSource`], merges live contract
//! state where the index cannot express it, and maps the result into a view object.
//! A failed sub-query is logged and replaced by an empty value; it never fails the view.
mod allowlist;
mod arbitration;
mod review;
mod reviewer;
mod stats;
mod strategy;
mod task;
pub mod token;
mod user;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use metrics::counter;
use tracing::error;

pub use allowlist::{AllowlistOptions, GuardOption, GuardOptionKind, StrategyOption, StrategyOptionKind, TokenOption};
pub use arbitration::ArbitrationCase;
pub use review::ReviewQueueItem;
pub use reviewer::{accuracy_rate, QueuedReward, ReviewerMetrics};
pub use stats::{DailyStatView, GlobalStatsView};
pub use strategy::{ConfigSource, StrategyConfigView};
pub use task::{AdoptionSummary, SubmissionView, TaskGuards, TaskView};
pub use token::{TokenAmount, TokenRegistry};
pub use user::{sbt_level, UserView};

use crate::{
    config::ContractsConfig,
    entities::{AllowlistEntry, AllowlistKind, Arbitration, CategoryScore, Review, RewardDistribution, Submission, Task, User},
    live::LiveReads,
    metrics::READ_DEGRADED,
    query::{ArbitrationQuery, Page, ReviewQuery, SubmissionQuery, TaskQuery},
    stats::{DailyStatistic, GlobalStatistic},
    store::SharedIndex,
    strategy::StrategyDefaults,
};

/// The queryable snapshot the assemblers read from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn tasks(&self, q: &TaskQuery) -> anyhow::Result<Vec<Task>>;
    async fn task(&self, id: &str) -> anyhow::Result<Option<Task>>;
    async fn submissions(&self, q: &SubmissionQuery) -> anyhow::Result<Vec<Submission>>;
    async fn submission(&self, id: &str) -> anyhow::Result<Option<Submission>>;
    async fn reviews(&self, q: &ReviewQuery) -> anyhow::Result<Vec<Review>>;
    async fn arbitrations(&self, q: &ArbitrationQuery) -> anyhow::Result<Vec<Arbitration>>;
    async fn user(&self, address: &str) -> anyhow::Result<Option<User>>;
    async fn category_scores(&self, address: &str) -> anyhow::Result<Vec<CategoryScore>>;
    async fn reward_distributions(&self, submissions: &[String], first: usize)
        -> anyhow::Result<Vec<RewardDistribution>>;
    async fn global_statistic(&self) -> anyhow::Result<Option<GlobalStatistic>>;
    async fn daily_statistics(&self, page: Page) -> anyhow::Result<Vec<DailyStatistic>>;
    async fn allowed(&self, kind: AllowlistKind) -> anyhow::Result<Vec<AllowlistEntry>>;
}

/// Snapshot over the in-process index.
#[derive(Debug, Clone)]
pub struct LocalSnapshot {
    index: SharedIndex,
}

impl LocalSnapshot {
    pub fn new(index: SharedIndex) -> Self {
        Self { index }
    }
}

#[async_trait]
impl SnapshotSource for LocalSnapshot {
    async fn tasks(&self, q: &TaskQuery) -> anyhow::Result<Vec<Task>> {
        Ok(self.index.read().await.entities.query_tasks(q))
    }

    async fn task(&self, id: &str) -> anyhow::Result<Option<Task>> {
        Ok(self.index.read().await.entities.task(id))
    }

    async fn submissions(&self, q: &SubmissionQuery) -> anyhow::Result<Vec<Submission>> {
        Ok(self.index.read().await.entities.query_submissions(q))
    }

    async fn submission(&self, id: &str) -> anyhow::Result<Option<Submission>> {
        Ok(self.index.read().await.entities.submission(id))
    }

    async fn reviews(&self, q: &ReviewQuery) -> anyhow::Result<Vec<Review>> {
        Ok(self.index.read().await.entities.query_reviews(q))
    }

    async fn arbitrations(&self, q: &ArbitrationQuery) -> anyhow::Result<Vec<Arbitration>> {
        Ok(self.index.read().await.entities.query_arbitrations(q))
    }

    async fn user(&self, address: &str) -> anyhow::Result<Option<User>> {
        Ok(self.index.read().await.entities.user(address))
    }

    async fn category_scores(&self, address: &str) -> anyhow::Result<Vec<CategoryScore>> {
        Ok(self.index.read().await.entities.category_scores_of(address))
    }

    async fn reward_distributions(
        &self,
        submissions: &[String],
        first: usize,
    ) -> anyhow::Result<Vec<RewardDistribution>> {
        Ok(self
            .index
            .read()
            .await
            .entities
            .reward_distributions_for(submissions, first))
    }

    async fn global_statistic(&self) -> anyhow::Result<Option<GlobalStatistic>> {
        Ok(Some(self.index.read().await.stats.global.clone()))
    }

    async fn daily_statistics(&self, page: Page) -> anyhow::Result<Vec<DailyStatistic>> {
        Ok(self.index.read().await.stats.query_daily(page))
    }

    async fn allowed(&self, kind: AllowlistKind) -> anyhow::Result<Vec<AllowlistEntry>> {
        Ok(self.index.read().await.entities.allowed(kind))
    }
}

/// Unwrap a sub-query, or log it and fall back to the default value.
fn degrade<T: Default>(what: &str, result: anyhow::Result<T>) -> T {
    result.unwrap_or_else(|e| {
        counter!(READ_DEGRADED).increment(1);
        error!("{what} failed: {e:?}");
        T::default()
    })
}

/// Unix seconds as an RFC 3339 UTC timestamp. Zero means "never" and is empty.
pub(crate) fn to_iso(seconds: u64) -> String {
    if seconds == 0 {
        return String::new();
    }
    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// `0x1234...abcd`.
pub(crate) fn short_address(address: &str) -> String {
    match (address.get(..6), address.len().checked_sub(4).and_then(|i| address.get(i..))) {
        (Some(head), Some(tail)) if address.len() > 10 => format!("{head}...{tail}"),
        _ => address.to_owned(),
    }
}

/// Everything an assembler needs.
#[derive(Clone)]
pub struct ReadModel {
    snapshot: Arc<dyn SnapshotSource>,
    live: Arc<LiveReads>,
    tokens: Arc<TokenRegistry>,
    strategies: Arc<StrategyDefaults>,
    contracts: Arc<ContractsConfig>,
}

impl std::fmt::Debug for ReadModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadModel").field("live", &self.live).finish_non_exhaustive()
    }
}

impl ReadModel {
    pub fn new(
        snapshot: Arc<dyn SnapshotSource>,
        live: Arc<LiveReads>,
        tokens: TokenRegistry,
        contracts: ContractsConfig,
    ) -> Self {
        let contracts = contracts.normalized();
        Self {
            snapshot,
            live,
            tokens: Arc::new(tokens),
            strategies: Arc::new(StrategyDefaults::new(&contracts.simple_adoption_strategy)),
            contracts: Arc::new(contracts),
        }
    }

    pub fn live(&self) -> &LiveReads {
        &self.live
    }

    pub fn strategy_defaults(&self) -> &StrategyDefaults {
        &self.strategies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_timestamps() {
        assert_eq!(to_iso(0), "");
        assert_eq!(to_iso(1_700_000_000), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn short_addresses() {
        assert_eq!(
            short_address("0x3a0508bbf4acd261fe3fecb1267be0fbccca6dba"),
            "0x3a05...6dba"
        );
        assert_eq!(short_address("0xabc"), "0xabc");
    }
}
