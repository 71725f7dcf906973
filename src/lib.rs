//! Hermis Atlas indexer: folds contract events into a queryable index and serves
//! UI-ready views over it.
pub mod chain;
pub mod config;
mod db;
pub mod endpoints;
pub mod entities;
pub mod error;
pub mod events;
pub mod guard;
pub mod indexer;
pub mod live;
pub mod math;
mod metrics;
pub mod query;
pub mod read_model;
pub mod reducer;
mod serve;
pub mod stats;
pub mod store;
pub mod strategy;

pub use serve::{run, AppState, Error, Result};

/// The index (/) route.
async fn index() -> impl axum::response::IntoResponse {
    r"
This is the Hermis Atlas indexer.

Views are under /tasks, /users, /reviews, /reviewers, /arbitrations, /stats and /allowlist.
Logged contract events are accepted at POST /events.
    "
}
