//! Cached live contract reads.
//!
//! Guard and strategy parameters are read per address and kept for a short validity
//! window. A stale entry is simply read again; only successful reads are cached.
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use metrics::counter;
use tokio::sync::RwLock;
use tracing::warn;

use crate::{
    chain::{ContractReader, ReadError, Validation},
    guard::{GuardKind, GuardRequirement},
    metrics::{LIVE_CACHE_HITS, LIVE_READ_FAILED},
    reducer::non_zero_address,
    strategy::{fetch_strategy_config, DecodeError, StrategyConfig},
};

struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

struct Cache<K, T> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Cached<T>>>,
}

impl<K: Eq + std::hash::Hash, T: Clone> Cache<K, T> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, key: &K) -> Option<T> {
        let entries = self.entries.read().await;
        let cached = entries.get(key)?;
        (cached.fetched_at.elapsed() < self.ttl).then(|| cached.value.clone())
    }

    /// Store a fresh value, dropping every entry that has outlived the ttl.
    async fn put(&self, key: K, value: T) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, cached| cached.fetched_at.elapsed() < self.ttl);
        drop(entries.insert(
            key,
            Cached {
                value,
                fetched_at: Instant::now(),
            },
        ));
    }
}

/// Live reads shared by every request.
pub struct LiveReads {
    reader: Arc<dyn ContractReader>,
    strategies: Cache<String, Option<StrategyConfig>>,
    guards: Cache<(GuardKind, String), GuardRequirement>,
}

impl std::fmt::Debug for LiveReads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveReads").field("ttl", &self.strategies.ttl).finish_non_exhaustive()
    }
}

impl LiveReads {
    pub fn new(reader: Arc<dyn ContractReader>, ttl: Duration) -> Self {
        Self {
            reader,
            strategies: Cache::new(ttl),
            guards: Cache::new(ttl),
        }
    }

    /// The strategy's on-chain config. `Ok(None)` means it reports none, or there is no strategy.
    pub async fn strategy_config(&self, strategy: &str) -> Result<Option<StrategyConfig>, DecodeError> {
        let Some(key) = non_zero_address(strategy) else {
            return Ok(None);
        };
        if let Some(config) = self.strategies.get(&key).await {
            counter!(LIVE_CACHE_HITS).increment(1);
            return Ok(config);
        }

        match fetch_strategy_config(self.reader.as_ref(), &key).await {
            Ok(config) => {
                self.strategies.put(key, config.clone()).await;
                Ok(config)
            }
            Err(e) => {
                counter!(LIVE_READ_FAILED).increment(1);
                warn!("strategy config read failed for {key}: {e}");
                Err(e)
            }
        }
    }

    /// Requirements of the guard in slot `kind`. No guard, or a failed read, is `None`.
    pub async fn guard_requirement(&self, kind: GuardKind, guard: Option<&str>) -> Option<GuardRequirement> {
        let address = guard.and_then(non_zero_address)?;
        let key = (kind, address.clone());
        if let Some(requirement) = self.guards.get(&key).await {
            counter!(LIVE_CACHE_HITS).increment(1);
            return Some(requirement);
        }

        let read = match kind {
            GuardKind::Submission => self
                .reader
                .submission_guard_config(&address)
                .await
                .map(|c| GuardRequirement::from(&c)),
            GuardKind::Review => self
                .reader
                .review_guard_config(&address)
                .await
                .map(|c| GuardRequirement::from(&c)),
        };

        match read {
            Ok(mut requirement) => {
                requirement.address = Some(address);
                self.guards.put(key, requirement.clone()).await;
                Some(requirement)
            }
            Err(e) => {
                counter!(LIVE_READ_FAILED).increment(1);
                warn!("{kind:?} guard config read failed for {address}: {}", e.human_message());
                None
            }
        }
    }

    /// Ask `guard` whether `user` may act. Never cached. Without a guard anyone may.
    pub async fn validate_user(&self, guard: &str, user: &str, data: &[u8]) -> Result<Validation, ReadError> {
        let Some(guard) = non_zero_address(guard) else {
            return Ok(Validation {
                allowed: true,
                reason: String::new(),
            });
        };
        self.reader.validate_user(&guard, user, data).await.inspect_err(|e| {
            counter!(LIVE_READ_FAILED).increment(1);
            warn!("validateUser on {guard} failed: {}", e.human_message());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        guard::SubmissionGuardConfig, reducer::ZERO_ADDRESS, strategy::RawStrategyConfig, tests::MockContracts,
    };

    fn simple() -> RawStrategyConfig {
        RawStrategyConfig {
            min_reviews_required: 3,
            approval_threshold: 60,
            rejection_threshold: 40,
            expiration_time: 604_800,
            allow_time_based_adoption: false,
            auto_adoption_time: 0,
        }
    }

    #[tokio::test]
    async fn strategy_reads_are_cached() {
        let mock = Arc::new(MockContracts::default().with_simple_config(simple()));
        let live = LiveReads::new(mock.clone(), Duration::from_secs(60));

        let first = live.strategy_config("0xABC").await.unwrap();
        let second = live.strategy_config("0xabc").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(mock.reads(), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_read_again() {
        let mock = Arc::new(MockContracts::default().with_simple_config(simple()));
        let live = LiveReads::new(mock.clone(), Duration::ZERO);

        _ = live.strategy_config("0xabc").await.unwrap();
        _ = live.strategy_config("0xabc").await.unwrap();
        assert_eq!(mock.reads(), 2);
    }

    #[tokio::test]
    async fn stale_entries_are_pruned_on_insert() {
        let stale = Cache::new(Duration::ZERO);
        stale.put("0xa", 1).await;
        stale.put("0xb", 2).await;
        assert_eq!(stale.entries.read().await.keys().collect::<Vec<_>>(), [&"0xb"]);

        let fresh = Cache::new(Duration::from_secs(60));
        fresh.put("0xa", 1).await;
        fresh.put("0xb", 2).await;
        assert_eq!(fresh.entries.read().await.len(), 2);
        assert_eq!(fresh.get(&"0xa").await, Some(1));
    }

    #[tokio::test]
    async fn zero_address_is_never_read() {
        let mock = Arc::new(MockContracts::default().with_strategy_error(ReadError::new("execution reverted")));
        let live = LiveReads::new(mock.clone(), Duration::from_secs(60));

        assert_eq!(live.strategy_config(ZERO_ADDRESS).await, Ok(None));
        assert_eq!(live.strategy_config(" ").await, Ok(None));
        let validation = live.validate_user(ZERO_ADDRESS, "0xu", &[]).await.unwrap();
        assert!(validation.allowed);
        assert_eq!(validation.reason, "");
        assert_eq!(mock.reads(), 0);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let mock = Arc::new(MockContracts::default());
        let live = LiveReads::new(mock.clone(), Duration::from_secs(60));

        assert!(live.strategy_config("0xabc").await.is_err());
        assert!(live.strategy_config("0xabc").await.is_err());
        // Both read methods are attempted each time.
        assert_eq!(mock.reads(), 4);
    }

    #[tokio::test]
    async fn guard_requirement_carries_address() {
        let mock = Arc::new(MockContracts::default().with_submission_guard(SubmissionGuardConfig {
            min_reputation_score: 500,
            ..SubmissionGuardConfig::default()
        }));
        let live = LiveReads::new(mock.clone(), Duration::from_secs(60));

        let requirement = live
            .guard_requirement(GuardKind::Submission, Some("0xGUARD"))
            .await
            .unwrap();
        assert_eq!(requirement.address.as_deref(), Some("0xguard"));
        assert_eq!(requirement.min_reputation, Some(50.0));

        // Review guard reads fail on this mock.
        assert_eq!(live.guard_requirement(GuardKind::Review, Some("0xguard")).await, None);
        assert_eq!(live.guard_requirement(GuardKind::Submission, None).await, None);
        assert_eq!(
            live.guard_requirement(GuardKind::Submission, Some(crate::reducer::ZERO_ADDRESS)).await,
            None
        );
    }
}
