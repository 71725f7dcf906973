//! ReputationManager events.
use super::{normalize_address, Context, Dropped, Outcome};
use crate::{
    entities::{Activity, CategoryScore, UserStatus},
    events::{
        CategoryScoreClaimed, ReputationChanged, UnstakeRequested, UserInitialized, UserStaked, UserStatusChanged,
        UserUnstaked,
    },
    store::upsert,
};

pub(super) fn initialized(cx: &mut Context<'_>, e: &UserInitialized) -> Outcome {
    let timestamp = cx.timestamp();
    let user = cx.touch_user(&e.user);
    let first = user.initialized_at.is_none();

    user.reputation = e.initial_reputation;
    user.status = UserStatus::Normal;
    if first {
        user.initialized_at = Some(timestamp);
    }
    let id = user.id.clone();

    cx.record(
        &id,
        Activity::UserInitialized {
            initial_reputation: e.initial_reputation,
        },
    );

    if first {
        cx.stats.day(timestamp).users_registered += 1;
        cx.stats.global.total_users += 1;
    }
    cx.stats.touch(timestamp);
    Ok(())
}

pub(super) fn reputation_changed(cx: &mut Context<'_>, e: &ReputationChanged) -> Outcome {
    let user = cx.touch_user(&e.user);
    user.reputation = e.new_reputation;
    let id = user.id.clone();

    cx.record(
        &id,
        Activity::ReputationChanged {
            change: e.change,
            new_reputation: e.new_reputation,
            reason: e.reason.clone(),
        },
    );
    Ok(())
}

pub(super) fn status_changed(cx: &mut Context<'_>, e: &UserStatusChanged) -> Outcome {
    let new = UserStatus::from_code(e.new_status).ok_or(Dropped::UnknownCode)?;
    let user = cx.touch_user(&e.user);
    let old = UserStatus::from_code(e.old_status).unwrap_or(user.status);
    user.status = new;
    let id = user.id.clone();

    cx.record(
        &id,
        Activity::UserStatusChanged {
            old_status: old,
            new_status: new,
        },
    );
    Ok(())
}

pub(super) fn staked(cx: &mut Context<'_>, e: &UserStaked) -> Outcome {
    let user = cx.touch_user(&e.user);
    user.staked_amount = user.staked_amount.saturating_add(e.amount);
    let (id, total_staked) = (user.id.clone(), user.staked_amount);

    cx.record(
        &id,
        Activity::Staked {
            amount: e.amount,
            token: normalize_address(&e.token),
            total_staked,
        },
    );
    Ok(())
}

pub(super) fn unstake_requested(cx: &mut Context<'_>, e: &UnstakeRequested) -> Outcome {
    let id = cx.touch_user(&e.user).id.clone();
    cx.record(
        &id,
        Activity::UnstakeRequested {
            unlock_time: e.unlock_time,
        },
    );
    Ok(())
}

pub(super) fn unstaked(cx: &mut Context<'_>, e: &UserUnstaked) -> Outcome {
    let user = cx.touch_user(&e.user);
    user.staked_amount = user.staked_amount.saturating_sub(e.amount);
    let (id, remaining_staked) = (user.id.clone(), user.staked_amount);

    cx.record(
        &id,
        Activity::Unstaked {
            amount: e.amount,
            token: normalize_address(&e.token),
            remaining_staked,
        },
    );
    Ok(())
}

/// A claim moves score out of pending. The event reports the resulting absolute score.
pub(super) fn category_score_claimed(cx: &mut Context<'_>, e: &CategoryScoreClaimed) -> Outcome {
    let timestamp = cx.timestamp();
    let user = cx.touch_user(&e.user).id.clone();

    let id = CategoryScore::id_for(&user, &e.category);
    let score = upsert(&mut cx.entities.category_scores, &id, || {
        CategoryScore::fresh(&user, &e.category)
    });
    score.score = e.new_score;
    score.pending_score = score.pending_score.saturating_sub(e.score_increase);
    score.last_claim_at = timestamp;
    score.last_updated_at = timestamp;

    cx.record(
        &user,
        Activity::CategoryScoreClaimed {
            category: e.category.clone(),
            score_increase: e.score_increase,
            new_score: e.new_score,
        },
    );
    Ok(())
}
