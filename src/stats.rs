//! Running aggregate counters.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::decimal;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Floor a unix timestamp to the start of its UTC day.
pub const fn day_start(timestamp: u64) -> u64 {
    timestamp / SECONDS_PER_DAY * SECONDS_PER_DAY
}

/// Counters scoped to one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatistic {
    /// The day start, as a decimal string.
    pub id: String,
    pub date: u64,
    pub tasks_created: u64,
    pub tasks_published: u64,
    pub tasks_completed: u64,
    pub tasks_cancelled: u64,
    pub tasks_expired: u64,
    pub submissions_created: u64,
    pub submissions_adopted: u64,
    pub submissions_removed: u64,
    pub reviews_submitted: u64,
    pub users_registered: u64,
    pub active_users: u64,
    #[serde(with = "decimal")]
    pub total_rewards_distributed: u128,
    #[serde(with = "decimal")]
    pub total_fees_collected: u128,
}

impl DailyStatistic {
    pub fn for_day(date: u64) -> Self {
        Self {
            id: date.to_string(),
            date,
            ..Self::default()
        }
    }
}

/// The `"global"` singleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStatistic {
    pub id: String,
    pub total_tasks: u64,
    pub total_submissions: u64,
    pub total_reviews: u64,
    pub total_users: u64,
    pub total_arbitrations: u64,
    pub active_tasks: u64,
    pub active_submissions: u64,
    pub pending_arbitrations: u64,
    #[serde(with = "decimal")]
    pub total_rewards_distributed: u128,
    #[serde(with = "decimal")]
    pub total_fees_collected: u128,
    pub last_updated: u64,
}

impl Default for GlobalStatistic {
    fn default() -> Self {
        Self {
            id: "global".to_owned(),
            total_tasks: 0,
            total_submissions: 0,
            total_reviews: 0,
            total_users: 0,
            total_arbitrations: 0,
            active_tasks: 0,
            active_submissions: 0,
            pending_arbitrations: 0,
            total_rewards_distributed: 0,
            total_fees_collected: 0,
            last_updated: 0,
        }
    }
}

/// Global and per-day statistics, threaded through the reducer alongside the entity store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub global: GlobalStatistic,
    pub daily: BTreeMap<u64, DailyStatistic>,
}

impl Statistics {
    /// The bucket for the day containing `timestamp`, created on first use.
    pub fn day(&mut self, timestamp: u64) -> &mut DailyStatistic {
        let date = day_start(timestamp);
        self.daily
            .entry(date)
            .or_insert_with(|| DailyStatistic::for_day(date))
    }

    pub fn touch(&mut self, timestamp: u64) {
        self.global.last_updated = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bucketing() {
        assert_eq!(day_start(0), 0);
        assert_eq!(day_start(86_399), 0);
        assert_eq!(day_start(86_400), 86_400);
        assert_eq!(day_start(1_700_000_123), 1_699_920_000);
    }

    #[test]
    fn buckets_are_created_once() {
        let mut stats = Statistics::default();
        stats.day(100).tasks_created += 1;
        stats.day(200).tasks_created += 1;
        stats.day(86_500).tasks_created += 1;

        assert_eq!(stats.daily.len(), 2);
        assert_eq!(stats.daily[&0].tasks_created, 2);
        assert_eq!(stats.daily[&86_400].id, "86400");
    }
}
