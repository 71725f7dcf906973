//! Reward strategy events.
use super::{normalize_address, Context, Dropped, Outcome};
use crate::{entities::RewardDistribution, events::RewardDistributed};

pub(super) fn distributed(cx: &mut Context<'_>, e: &RewardDistributed) -> Outcome {
    let id = cx.meta.entity_id();
    if cx.entities.reward_distributions.contains_key(&id) {
        return Err(Dropped::AlreadyExists);
    }

    let block = cx.block();
    drop(cx.entities.reward_distributions.insert(
        id.clone(),
        RewardDistribution {
            id,
            task: e.task_id.to_string(),
            submission: e.submission_id.to_string(),
            submitter: normalize_address(&e.submitter),
            submitter_share: e.submitter_share,
            reviewer_share: e.reviewer_share,
            platform_share: e.platform_share,
            distributed_at: block.timestamp,
            block,
        },
    ));

    // Platform share excluded.
    let paid_out = e.submitter_share.saturating_add(e.reviewer_share);
    let timestamp = cx.timestamp();
    let day = cx.stats.day(timestamp);
    day.total_rewards_distributed = day.total_rewards_distributed.saturating_add(paid_out);
    let global = &mut cx.stats.global;
    global.total_rewards_distributed = global.total_rewards_distributed.saturating_add(paid_out);
    cx.stats.touch(timestamp);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::tests::{reward_distributed, Harness};

    #[test]
    fn distribution_is_recorded_and_totalled() {
        let mut h = Harness::default();
        h.apply(100, reward_distributed(1, 9, 800, 150)).unwrap();
        h.apply(200, reward_distributed(2, 10, 80, 15)).unwrap();

        assert_eq!(h.index.entities.reward_distributions.len(), 2);
        let first = h.index.entities.reward_distributions.values().find(|d| d.submission == "9").unwrap();
        assert_eq!(first.reviewer_share, 150);
        assert_eq!(first.distributed_at, 100);
        assert_eq!(h.index.stats.global.total_rewards_distributed, 1045);
        assert_eq!(h.index.stats.daily[&0].total_rewards_distributed, 1045);
    }
}
