//! Keyed entity store.
use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{
    entities::{
        ActivityRecord, AllowlistEntry, AllowlistKind, Arbitration, CategoryScore, Review, RewardDistribution,
        Submission, SubmissionVersion, Task, User,
    },
    stats::Statistics,
};

pub type Table<V> = BTreeMap<String, V>;

/// Get the entity with `id`, inserting the result of `defaults` first if there is none.
pub fn upsert<'a, V>(table: &'a mut Table<V>, id: &str, defaults: impl FnOnce() -> V) -> &'a mut V {
    table.entry(id.to_owned()).or_insert_with(defaults)
}

/// All indexed entities, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStore {
    pub tasks: Table<Task>,
    pub submissions: Table<Submission>,
    pub submission_versions: Table<SubmissionVersion>,
    pub reviews: Table<Review>,
    /// Review ids per submission id, in the order they were submitted.
    pub reviews_by_submission: Table<Vec<String>>,
    pub users: Table<User>,
    pub category_scores: Table<CategoryScore>,
    pub arbitrations: Table<Arbitration>,
    pub allowed_guards: Table<AllowlistEntry>,
    pub allowed_strategies: Table<AllowlistEntry>,
    pub allowed_tokens: Table<AllowlistEntry>,
    pub reward_distributions: Table<RewardDistribution>,
    pub activity: Table<ActivityRecord>,
}

impl EntityStore {
    pub fn allowlist(&self, kind: AllowlistKind) -> &Table<AllowlistEntry> {
        match kind {
            AllowlistKind::Guard => &self.allowed_guards,
            AllowlistKind::Strategy => &self.allowed_strategies,
            AllowlistKind::Token => &self.allowed_tokens,
        }
    }

    pub fn allowlist_mut(&mut self, kind: AllowlistKind) -> &mut Table<AllowlistEntry> {
        match kind {
            AllowlistKind::Guard => &mut self.allowed_guards,
            AllowlistKind::Strategy => &mut self.allowed_strategies,
            AllowlistKind::Token => &mut self.allowed_tokens,
        }
    }
}

/// Entities plus aggregates: everything the reducer folds events into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub entities: EntityStore,
    pub stats: Statistics,
}

/// The index shared between the sequential writer and concurrent readers.
pub type SharedIndex = Arc<RwLock<Index>>;
