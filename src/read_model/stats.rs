//! Platform statistics.
use serde::Serialize;

use super::{
    degrade, to_iso,
    token::{to_display, DEFAULT_DECIMALS},
    ReadModel,
};
use crate::{
    query::{OrderDirection, Page},
    stats::{DailyStatistic, GlobalStatistic},
};

pub const DEFAULT_DAYS: usize = 30;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStatsView {
    pub total_tasks: u64,
    pub total_submissions: u64,
    pub total_reviews: u64,
    pub total_users: u64,
    pub total_arbitrations: u64,
    pub active_tasks: u64,
    pub active_submissions: u64,
    pub pending_arbitrations: u64,
    pub total_rewards_distributed: f64,
    pub total_fees_collected: f64,
    pub last_updated: String,
}

impl From<GlobalStatistic> for GlobalStatsView {
    fn from(g: GlobalStatistic) -> Self {
        Self {
            total_tasks: g.total_tasks,
            total_submissions: g.total_submissions,
            total_reviews: g.total_reviews,
            total_users: g.total_users,
            total_arbitrations: g.total_arbitrations,
            active_tasks: g.active_tasks,
            active_submissions: g.active_submissions,
            pending_arbitrations: g.pending_arbitrations,
            total_rewards_distributed: to_display(g.total_rewards_distributed, DEFAULT_DECIMALS),
            total_fees_collected: to_display(g.total_fees_collected, DEFAULT_DECIMALS),
            last_updated: to_iso(g.last_updated),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatView {
    pub id: String,
    pub date: u64,
    pub day: String,
    pub tasks_created: u64,
    pub submissions_created: u64,
    pub submissions_adopted: u64,
    pub reviews_submitted: u64,
    pub users_registered: u64,
    pub active_users: u64,
    pub total_rewards_distributed: f64,
}

impl From<DailyStatistic> for DailyStatView {
    fn from(d: DailyStatistic) -> Self {
        Self {
            day: to_iso(d.date),
            date: d.date,
            id: d.id,
            tasks_created: d.tasks_created,
            submissions_created: d.submissions_created,
            submissions_adopted: d.submissions_adopted,
            reviews_submitted: d.reviews_submitted,
            users_registered: d.users_registered,
            active_users: d.active_users,
            total_rewards_distributed: to_display(d.total_rewards_distributed, DEFAULT_DECIMALS),
        }
    }
}

impl ReadModel {
    /// Platform totals. Zero everywhere when nothing is indexed or the read fails.
    pub async fn load_global_stats(&self) -> GlobalStatsView {
        degrade("loadGlobalStats", self.snapshot.global_statistic().await)
            .map(GlobalStatsView::from)
            .unwrap_or_default()
    }

    /// Day buckets, oldest first unless `order` says otherwise.
    pub async fn load_daily_statistics(&self, first: Option<usize>, order: Option<OrderDirection>) -> Vec<DailyStatView> {
        let page = Page::new(
            Some(first.unwrap_or(DEFAULT_DAYS)),
            Some(order.unwrap_or(OrderDirection::Asc)),
        );
        degrade("loadDailyStatistics", self.snapshot.daily_statistics(page).await)
            .into_iter()
            .map(DailyStatView::from)
            .collect()
    }
}
