//! AllowlistManager events.
//!
//! An allowlist entry is the current state of one address, not a history: allowing an
//! address again restarts its `added_at` and forgets the previous removal.
use super::{normalize_address, Context, Dropped, Outcome};
use crate::{
    entities::{AllowlistEntry, AllowlistKind},
    store::upsert,
};

pub(super) fn allowed(cx: &mut Context<'_>, kind: AllowlistKind, address: &str) -> Outcome {
    let id = normalize_address(address);
    let block = cx.block();
    let entry = upsert(cx.entities.allowlist_mut(kind), &id, || AllowlistEntry {
        id: id.clone(),
        kind,
        is_allowed: true,
        added_at: block.timestamp,
        removed_at: None,
        block: block.clone(),
    });

    entry.is_allowed = true;
    entry.added_at = block.timestamp;
    entry.removed_at = None;
    entry.block = block;
    Ok(())
}

pub(super) fn disallowed(cx: &mut Context<'_>, kind: AllowlistKind, address: &str) -> Outcome {
    let id = normalize_address(address);
    let block = cx.block();
    let entry = cx
        .entities
        .allowlist_mut(kind)
        .get_mut(&id)
        .ok_or(Dropped::UnknownEntity)?;

    entry.is_allowed = false;
    entry.removed_at = Some(block.timestamp);
    entry.block = block;
    Ok(())
}
