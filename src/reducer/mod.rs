//! Event-sourced entity reducer.
//!
//! [`apply`] folds one logged event into an [`Index`]. Events must be applied in chain
//! order (block, then log index); the reducer does no ordering of its own.
//!
//! Handlers never fail. An update that references an unknown entity, or that would move
//! an entity backwards through its state machine, is dropped and reported as such.
mod allowlist;
mod arbitration;
mod reputation;
mod reward;
mod sbt;
mod submission;
mod task;

use tracing::{debug, warn};

use crate::{
    entities::{Activity, ActivityRecord, AllowlistKind, BlockRef, User},
    events::{Event, EventMeta, LoggedEvent},
    stats::{day_start, Statistics},
    store::{upsert, EntityStore, Index},
};

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Lower-case an address so it can be used as an id.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// A normalized address, or `None` for the zero address.
pub fn non_zero_address(address: &str) -> Option<String> {
    let address = normalize_address(address);
    (!address.is_empty() && address != ZERO_ADDRESS).then_some(address)
}

/// Why an event left the index untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dropped {
    /// The event updates an entity that was never created.
    UnknownEntity,
    /// The event creates an entity that already exists.
    AlreadyExists,
    /// The entity's current status does not allow this transition.
    IllegalTransition,
    /// A status or outcome code outside the known range.
    UnknownCode,
}

impl Dropped {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownEntity => "unknown entity",
            Self::AlreadyExists => "already exists",
            Self::IllegalTransition => "illegal transition",
            Self::UnknownCode => "unknown code",
        }
    }
}

pub type Outcome = Result<(), Dropped>;

/// What a handler gets to work with.
pub(crate) struct Context<'a> {
    pub entities: &'a mut EntityStore,
    pub stats: &'a mut Statistics,
    pub meta: &'a EventMeta,
}

impl Context<'_> {
    pub fn timestamp(&self) -> u64 {
        self.meta.block_timestamp
    }

    pub fn block(&self) -> BlockRef {
        self.meta.block()
    }

    /// Get or create the user at `address` and stamp its activity.
    ///
    /// The first touch of a user within a UTC day counts towards that day's active users.
    pub fn touch_user(&mut self, address: &str) -> &mut User {
        let id = normalize_address(address);
        let timestamp = self.meta.block_timestamp;
        let existed = self.entities.users.contains_key(&id);

        let block = self.meta.block();
        let user = upsert(&mut self.entities.users, &id, || User::fresh(&id, block));
        if !existed || day_start(user.last_activity_at) != day_start(timestamp) {
            self.stats.day(timestamp).active_users += 1;
        }
        user.last_activity_at = timestamp;
        user
    }

    /// Append an audit trail entry for `subject`.
    pub fn record(&mut self, subject: &str, activity: Activity) {
        let id = self.meta.entity_id();
        drop(self.entities.activity.insert(
            id.clone(),
            ActivityRecord {
                id,
                subject: subject.to_owned(),
                block: self.meta.block(),
                activity,
            },
        ));
    }
}

/// Apply one event to the index.
pub fn apply(index: &mut Index, logged: &LoggedEvent) -> Outcome {
    let Index { entities, stats } = index;
    let mut cx = Context {
        entities,
        stats,
        meta: &logged.meta,
    };

    let outcome = match &logged.event {
        Event::GuardAllowed(e) => allowlist::allowed(&mut cx, AllowlistKind::Guard, &e.guard),
        Event::GuardDisallowed(e) => allowlist::disallowed(&mut cx, AllowlistKind::Guard, &e.guard),
        Event::StrategyAllowed(e) => allowlist::allowed(&mut cx, AllowlistKind::Strategy, &e.strategy),
        Event::StrategyDisallowed(e) => allowlist::disallowed(&mut cx, AllowlistKind::Strategy, &e.strategy),
        Event::TokenAllowed(e) => allowlist::allowed(&mut cx, AllowlistKind::Token, &e.token),
        Event::TokenDisallowed(e) => allowlist::disallowed(&mut cx, AllowlistKind::Token, &e.token),

        Event::ArbitrationRequested(e) => arbitration::requested(&mut cx, e),
        Event::ArbitrationResolved(e) => arbitration::resolved(&mut cx, e),
        Event::ArbitrationFeeRefunded(e) => arbitration::fee_refunded(&mut cx, e),
        Event::ArbitrationFeeForfeited(e) => arbitration::fee_forfeited(&mut cx, e),

        Event::SbtMinted(e) => sbt::minted(&mut cx, e),
        Event::ReputationUpdated(e) => sbt::reputation_updated(&mut cx, e),
        Event::CategoryScoreUpdated(e) => sbt::category_score_updated(&mut cx, e),
        Event::StakeAmountUpdated(e) => sbt::stake_amount_updated(&mut cx, e),

        Event::UserInitialized(e) => reputation::initialized(&mut cx, e),
        Event::ReputationChanged(e) => reputation::reputation_changed(&mut cx, e),
        Event::UserStatusChanged(e) => reputation::status_changed(&mut cx, e),
        Event::UserStaked(e) => reputation::staked(&mut cx, e),
        Event::UnstakeRequested(e) => reputation::unstake_requested(&mut cx, e),
        Event::UserUnstaked(e) => reputation::unstaked(&mut cx, e),
        Event::CategoryScoreClaimed(e) => reputation::category_score_claimed(&mut cx, e),

        Event::SubmissionCreated(e) => submission::created(&mut cx, e),
        Event::SubmissionUpdated(e) => submission::updated(&mut cx, e),
        Event::SubmissionStatusChanged(e) => submission::status_changed(&mut cx, e),
        Event::SubmissionAdopted(e) => submission::adopted(&mut cx, e),
        Event::ReviewSubmitted(e) => submission::review_submitted(&mut cx, e),

        Event::TaskCreated(e) => task::created(&mut cx, e),
        Event::TaskPublished(e) => task::published(&mut cx, e),
        Event::TaskCompleted(e) => task::completed(&mut cx, e),
        Event::TaskExpired(e) => task::expired(&mut cx, e),
        Event::TaskCancelled(e) => task::cancelled(&mut cx, e),
        Event::TaskGuardsUpdated(e) => task::guards_updated(&mut cx, e),

        Event::RewardDistributed(e) => reward::distributed(&mut cx, e),
    };

    match outcome {
        Ok(()) => debug!(
            "applied {} at block {} ({})",
            logged.event.name(),
            logged.meta.block_number,
            logged.meta.entity_id()
        ),
        Err(reason) => warn!(
            "dropped {} at block {} ({}): {}",
            logged.event.name(),
            logged.meta.block_number,
            logged.meta.entity_id(),
            reason.as_str()
        ),
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{user_staked, Harness};

    #[test]
    fn addresses() {
        assert_eq!(normalize_address(" 0xAbC "), "0xabc");
        assert_eq!(non_zero_address(ZERO_ADDRESS), None);
        assert_eq!(non_zero_address("0xABC").as_deref(), Some("0xabc"));
    }

    #[test]
    fn daily_active_users_count_first_touch_per_day() {
        let mut h = Harness::default();
        h.apply(1_000, user_staked("0xa1", 10)).unwrap();
        h.apply(2_000, user_staked("0xA1", 10)).unwrap();
        h.apply(3_000, user_staked("0xb2", 10)).unwrap();
        h.apply(86_405, user_staked("0xa1", 10)).unwrap();

        assert_eq!(h.index.stats.daily[&0].active_users, 2);
        assert_eq!(h.index.stats.daily[&86_400].active_users, 1);
        assert_eq!(h.index.entities.users["0xa1"].staked_amount, 30);
    }

    #[test]
    fn activity_is_keyed_by_log() {
        let mut h = Harness::default();
        h.apply(10, user_staked("0xa1", 5)).unwrap();

        let record = h.index.entities.activity.values().next().unwrap();
        assert_eq!(record.subject, "0xa1");
        assert_eq!(record.id, h.events[0].meta.entity_id());
        assert!(matches!(record.activity, Activity::Staked { total_staked: 5, .. }));
    }
}
