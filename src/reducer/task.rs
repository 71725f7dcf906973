//! TaskManager events.
use super::{non_zero_address, normalize_address, Context, Dropped, Outcome};
use crate::{
    entities::{Activity, Task, TaskStatus},
    events::{TaskCancelled, TaskCompleted, TaskCreated, TaskExpired, TaskGuardsUpdated, TaskPublished},
};

pub(super) fn created(cx: &mut Context<'_>, e: &TaskCreated) -> Outcome {
    let id = e.task_id.to_string();
    if cx.entities.tasks.contains_key(&id) {
        return Err(Dropped::AlreadyExists);
    }

    let publisher = normalize_address(&e.publisher);
    cx.touch_user(&publisher).task_count += 1;

    let block = cx.block();
    drop(cx.entities.tasks.insert(
        id.clone(),
        Task {
            id: id.clone(),
            publisher,
            title: e.title.clone(),
            description: e.description.clone(),
            requirements: e.requirements.clone(),
            category: e.category.clone(),
            deadline: e.deadline,
            reward: e.reward,
            reward_token: non_zero_address(&e.reward_token),
            status: TaskStatus::Draft,
            submission_guard: None,
            review_guard: None,
            adoption_strategy: None,
            submission_count: 0,
            active_submission_count: 0,
            review_count: 0,
            adopted_submission_id: None,
            created_at: block.timestamp,
            published_at: None,
            created_block: block.clone(),
            last_block: block,
        },
    ));

    cx.record(
        &id,
        Activity::TaskCreated {
            title: e.title.clone(),
            category: e.category.clone(),
            reward: e.reward,
        },
    );

    let timestamp = cx.timestamp();
    cx.stats.day(timestamp).tasks_created += 1;
    cx.stats.global.total_tasks += 1;
    cx.stats.touch(timestamp);
    Ok(())
}

pub(super) fn published(cx: &mut Context<'_>, e: &TaskPublished) -> Outcome {
    let id = e.task_id.to_string();
    let block = cx.block();
    let task = cx.entities.tasks.get_mut(&id).ok_or(Dropped::UnknownEntity)?;
    if task.status != TaskStatus::Draft {
        return Err(Dropped::IllegalTransition);
    }

    task.status = TaskStatus::Published;
    task.published_at = Some(e.published_at);
    task.last_block = block;

    cx.record(
        &id,
        Activity::TaskPublished {
            published_at: e.published_at,
        },
    );

    let timestamp = cx.timestamp();
    cx.stats.day(timestamp).tasks_published += 1;
    cx.stats.global.active_tasks += 1;
    cx.stats.touch(timestamp);
    Ok(())
}

/// Move a task into a terminal status. Returns the status it left.
///
/// Only a cancellation may conclude a draft; completion and expiry need a published task.
fn conclude(cx: &mut Context<'_>, id: &str, status: TaskStatus) -> Result<TaskStatus, Dropped> {
    let block = cx.block();
    let task = cx.entities.tasks.get_mut(id).ok_or(Dropped::UnknownEntity)?;
    let prior = task.status;
    let from_draft = prior == TaskStatus::Draft && status != TaskStatus::Cancelled;
    if prior.is_terminal() || from_draft {
        return Err(Dropped::IllegalTransition);
    }

    task.status = status;
    task.last_block = block;

    // Only tasks that were counted as active leave the gauge.
    if prior.is_active() {
        cx.stats.global.active_tasks = cx.stats.global.active_tasks.saturating_sub(1);
    }
    cx.stats.touch(cx.meta.block_timestamp);
    Ok(prior)
}

pub(super) fn completed(cx: &mut Context<'_>, e: &TaskCompleted) -> Outcome {
    let id = e.task_id.to_string();
    let adopted = e.adopted_submission_id.to_string();
    _ = conclude(cx, &id, TaskStatus::Completed)?;

    if let Some(task) = cx.entities.tasks.get_mut(&id) {
        task.adopted_submission_id = Some(adopted.clone());
    }
    cx.record(
        &id,
        Activity::TaskCompleted {
            adopted_submission_id: adopted,
        },
    );
    let timestamp = cx.timestamp();
    cx.stats.day(timestamp).tasks_completed += 1;
    Ok(())
}

pub(super) fn expired(cx: &mut Context<'_>, e: &TaskExpired) -> Outcome {
    let id = e.task_id.to_string();
    _ = conclude(cx, &id, TaskStatus::Expired)?;

    cx.record(&id, Activity::TaskExpired);
    let timestamp = cx.timestamp();
    cx.stats.day(timestamp).tasks_expired += 1;
    Ok(())
}

pub(super) fn cancelled(cx: &mut Context<'_>, e: &TaskCancelled) -> Outcome {
    let id = e.task_id.to_string();
    _ = conclude(cx, &id, TaskStatus::Cancelled)?;

    cx.record(
        &id,
        Activity::TaskCancelled {
            reason: e.reason.clone(),
        },
    );
    let timestamp = cx.timestamp();
    cx.stats.day(timestamp).tasks_cancelled += 1;
    Ok(())
}

pub(super) fn guards_updated(cx: &mut Context<'_>, e: &TaskGuardsUpdated) -> Outcome {
    let id = e.task_id.to_string();
    let block = cx.block();
    let task = cx.entities.tasks.get_mut(&id).ok_or(Dropped::UnknownEntity)?;

    task.submission_guard = non_zero_address(&e.submission_guard);
    task.review_guard = non_zero_address(&e.review_guard);
    task.adoption_strategy = non_zero_address(&e.adoption_strategy);
    task.last_block = block;

    let activity = Activity::TaskGuardsUpdated {
        submission_guard: task.submission_guard.clone(),
        review_guard: task.review_guard.clone(),
        adoption_strategy: task.adoption_strategy.clone(),
    };
    cx.record(&id, activity);
    Ok(())
}
