//! SubmissionManager events.
use super::{normalize_address, Context, Dropped, Outcome};
use crate::{
    entities::{Activity, Review, ReviewOutcome, Submission, SubmissionStatus, SubmissionVersion, TaskStatus},
    events::{ReviewSubmitted, SubmissionAdopted, SubmissionCreated, SubmissionStatusChanged, SubmissionUpdated},
    store::upsert,
};

pub(super) fn created(cx: &mut Context<'_>, e: &SubmissionCreated) -> Outcome {
    let id = e.submission_id.to_string();
    if cx.entities.submissions.contains_key(&id) {
        return Err(Dropped::AlreadyExists);
    }

    let task_id = e.task_id.to_string();
    let submitter = normalize_address(&e.submitter);
    cx.touch_user(&submitter).submission_count += 1;

    let block = cx.block();
    drop(cx.entities.submissions.insert(
        id.clone(),
        Submission {
            id: id.clone(),
            task: task_id.clone(),
            submitter,
            content_hash: e.content_hash.clone(),
            version: e.version,
            status: SubmissionStatus::Submitted,
            approve_count: 0,
            reject_count: 0,
            submitted_at: block.timestamp,
            last_updated_at: block.timestamp,
            adopted_at: None,
            created_block: block.clone(),
            last_block: block.clone(),
        },
    ));
    add_version(cx, &id, e.version, &e.content_hash, block.timestamp);

    if let Some(task) = cx.entities.tasks.get_mut(&task_id) {
        task.submission_count += 1;
        task.active_submission_count += 1;
        if task.status == TaskStatus::Published {
            task.status = TaskStatus::Active;
        }
        task.last_block = block;
    }

    cx.record(
        &id,
        Activity::SubmissionCreated {
            task_id,
            content_hash: e.content_hash.clone(),
            version: e.version,
        },
    );

    let timestamp = cx.timestamp();
    cx.stats.day(timestamp).submissions_created += 1;
    cx.stats.global.total_submissions += 1;
    cx.stats.global.active_submissions += 1;
    cx.stats.touch(timestamp);
    Ok(())
}

/// Versions are immutable: a version number seen twice keeps its first record.
fn add_version(cx: &mut Context<'_>, submission: &str, version: u64, content_hash: &str, created_at: u64) {
    let id = SubmissionVersion::id_for(submission, version);
    let block = cx.block();
    _ = cx
        .entities
        .submission_versions
        .entry(id.clone())
        .or_insert_with(|| SubmissionVersion {
            id,
            submission: submission.to_owned(),
            version,
            content_hash: content_hash.to_owned(),
            created_at,
            block,
        });
}

pub(super) fn updated(cx: &mut Context<'_>, e: &SubmissionUpdated) -> Outcome {
    let id = e.submission_id.to_string();
    let block = cx.block();
    let submission = cx.entities.submissions.get_mut(&id).ok_or(Dropped::UnknownEntity)?;

    submission.content_hash = e.new_content_hash.clone();
    submission.version = e.new_version;
    submission.last_updated_at = e.updated_at;
    submission.last_block = block;

    add_version(cx, &id, e.new_version, &e.new_content_hash, e.updated_at);
    cx.record(
        &id,
        Activity::SubmissionUpdated {
            new_content_hash: e.new_content_hash.clone(),
            new_version: e.new_version,
        },
    );
    Ok(())
}

pub(super) fn status_changed(cx: &mut Context<'_>, e: &SubmissionStatusChanged) -> Outcome {
    let new = SubmissionStatus::from_code(e.new_status).ok_or(Dropped::UnknownCode)?;
    let id = e.submission_id.to_string();
    let block = cx.block();
    let submission = cx.entities.submissions.get_mut(&id).ok_or(Dropped::UnknownEntity)?;

    let old = submission.status;
    submission.status = new;
    submission.last_updated_at = block.timestamp;
    submission.last_block = block.clone();
    let task_id = submission.task.clone();

    let entering = !old.is_terminal() && new.is_terminal();
    let leaving = old.is_terminal() && !new.is_terminal();

    if let Some(task) = cx.entities.tasks.get_mut(&task_id) {
        if entering {
            task.active_submission_count = task.active_submission_count.saturating_sub(1);
        } else if leaving {
            task.active_submission_count += 1;
        }
        task.last_block = block;
    }

    let timestamp = cx.timestamp();
    let global = &mut cx.stats.global;
    if entering {
        global.active_submissions = global.active_submissions.saturating_sub(1);
    } else if leaving {
        global.active_submissions += 1;
    }
    if entering {
        let day = cx.stats.day(timestamp);
        match new {
            SubmissionStatus::Adopted => day.submissions_adopted += 1,
            SubmissionStatus::Removed => day.submissions_removed += 1,
            _ => {}
        }
    }
    cx.stats.touch(timestamp);

    rescore_reviewers(cx, &id, old, new);

    cx.record(
        &id,
        Activity::SubmissionStatusChanged {
            old_status: old,
            new_status: new,
            reason: e.reason.clone(),
        },
    );
    Ok(())
}

/// Keep each reviewer's accurate review count in line with the status of the submissions
/// they reviewed.
fn rescore_reviewers(cx: &mut Context<'_>, submission: &str, old: SubmissionStatus, new: SubmissionStatus) {
    let entities = &*cx.entities;
    let Some(ids) = entities.reviews_by_submission.get(submission) else {
        return;
    };
    let changes: Vec<(String, bool)> = ids
        .iter()
        .filter_map(|id| entities.reviews.get(id))
        .filter_map(|review| {
            let was = review.outcome.is_accurate_for(old);
            let now = review.outcome.is_accurate_for(new);
            (was != now).then(|| (review.reviewer.clone(), now))
        })
        .collect();

    for (reviewer, accurate) in changes {
        if let Some(user) = cx.entities.users.get_mut(&reviewer) {
            user.accurate_review_count = if accurate {
                user.accurate_review_count + 1
            } else {
                user.accurate_review_count.saturating_sub(1)
            };
        }
    }
}

pub(super) fn adopted(cx: &mut Context<'_>, e: &SubmissionAdopted) -> Outcome {
    let id = e.submission_id.to_string();
    let block = cx.block();
    let submission = cx.entities.submissions.get_mut(&id).ok_or(Dropped::UnknownEntity)?;

    submission.adopted_at = Some(e.adopted_at);
    submission.last_block = block;

    cx.touch_user(&e.submitter).adopted_submission_count += 1;
    cx.record(
        &id,
        Activity::SubmissionAdopted {
            task_id: e.task_id.to_string(),
            adopted_at: e.adopted_at,
        },
    );
    Ok(())
}

pub(super) fn review_submitted(cx: &mut Context<'_>, e: &ReviewSubmitted) -> Outcome {
    let outcome = ReviewOutcome::from_code(e.outcome).ok_or(Dropped::UnknownCode)?;
    let id = e.review_id.to_string();
    if cx.entities.reviews.contains_key(&id) {
        return Err(Dropped::AlreadyExists);
    }

    let submission_id = e.submission_id.to_string();
    let reviewer = normalize_address(&e.reviewer);
    let block = cx.block();

    // A review of an unknown submission is still recorded; only the counters it feeds
    // are skipped.
    let mut accurate = false;
    if let Some(submission) = cx.entities.submissions.get_mut(&submission_id) {
        match outcome {
            ReviewOutcome::Approve => submission.approve_count += 1,
            ReviewOutcome::Reject => submission.reject_count += 1,
        }
        submission.last_updated_at = block.timestamp;
        submission.last_block = block.clone();
        accurate = outcome.is_accurate_for(submission.status);

        let task_id = submission.task.clone();
        if let Some(task) = cx.entities.tasks.get_mut(&task_id) {
            task.review_count += 1;
        }
    }

    let user = cx.touch_user(&reviewer);
    user.review_count += 1;
    if accurate {
        user.accurate_review_count += 1;
    }

    upsert(&mut cx.entities.reviews_by_submission, &submission_id, Vec::new).push(id.clone());
    drop(cx.entities.reviews.insert(
        id.clone(),
        Review {
            id,
            submission: submission_id,
            reviewer,
            outcome,
            reason: e.reason.clone(),
            reviewed_at: block.timestamp,
            block,
        },
    ));

    let timestamp = cx.timestamp();
    cx.stats.day(timestamp).reviews_submitted += 1;
    cx.stats.global.total_reviews += 1;
    cx.stats.touch(timestamp);
    Ok(())
}
