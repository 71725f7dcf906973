//! JSON read API and event ingestion.
use std::str::FromStr as _;

use alloy::primitives::Bytes;
use anyhow::{anyhow, Context as _};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{
    de::{value::StrDeserializer, DeserializeOwned, IntoDeserializer as _},
    Deserialize, Serialize,
};
use sqlx::SqlitePool;

use crate::{
    chain::Validation,
    db,
    entities::{ArbitrationStatus, SubmissionStatus},
    error::Error,
    events::LoggedEvent,
    indexer::{IndexerHandle, IngestReport},
    query::OrderDirection,
    read_model::{
        AllowlistOptions, ArbitrationCase, DailyStatView, GlobalStatsView, ReadModel, ReviewQueueItem,
        ReviewerMetrics, StrategyConfigView, TaskView, UserView,
    },
    AppState, Result,
};

#[derive(Debug, Deserialize)]
struct FirstParams {
    first: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    first: Option<usize>,
    /// Comma-separated status names, e.g. `SUBMITTED,UNDER_REVIEW`.
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyParams {
    first: Option<usize>,
    order: Option<OrderDirection>,
}

#[derive(Debug, Deserialize)]
struct ValidateParams {
    user: String,
    /// Hex-encoded extra data for the guard.
    data: Option<String>,
}

#[derive(Debug, Serialize)]
struct Health {
    version: &'static str,
    journal: u64,
}

/// Parse a comma-separated status filter. Names are case-insensitive.
fn parse_statuses<T: DeserializeOwned>(raw: Option<&str>) -> Result<Vec<T>> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let upper = s.to_ascii_uppercase();
            let de: StrDeserializer<'_, serde::de::value::Error> = upper.as_str().into_deserializer();
            T::deserialize(de).map_err(|e| Error::bad_request(anyhow!("invalid status {s:?}: {e}")))
        })
        .collect()
}

async fn tasks(State(model): State<ReadModel>, Query(params): Query<FirstParams>) -> Json<Vec<TaskView>> {
    Json(model.load_tasks(params.first).await)
}

async fn task(State(model): State<ReadModel>, Path(id): Path<String>) -> Result<Json<TaskView>> {
    model
        .load_task_detail(&id)
        .await
        .map(Json)
        .ok_or_else(|| Error::not_found(anyhow!("no task {id}")))
}

async fn user(State(model): State<ReadModel>, Path(address): Path<String>) -> Json<UserView> {
    Json(model.load_user(&address).await)
}

async fn review_queue(
    State(model): State<ReadModel>,
    Query(params): Query<StatusParams>,
) -> Result<Json<Vec<ReviewQueueItem>>> {
    let statuses = parse_statuses::<SubmissionStatus>(params.status.as_deref())?;
    Ok(Json(model.load_review_queue(params.first, statuses).await))
}

async fn reviewer_metrics(State(model): State<ReadModel>, Path(address): Path<String>) -> Json<ReviewerMetrics> {
    Json(model.load_reviewer_metrics(&address).await)
}

async fn arbitrations(
    State(model): State<ReadModel>,
    Query(params): Query<StatusParams>,
) -> Result<Json<Vec<ArbitrationCase>>> {
    let statuses = parse_statuses::<ArbitrationStatus>(params.status.as_deref())?;
    Ok(Json(model.load_arbitrations(params.first, statuses).await))
}

async fn global_stats(State(model): State<ReadModel>) -> Json<GlobalStatsView> {
    Json(model.load_global_stats().await)
}

async fn daily_stats(State(model): State<ReadModel>, Query(params): Query<DailyParams>) -> Json<Vec<DailyStatView>> {
    Json(model.load_daily_statistics(params.first, params.order).await)
}

async fn strategy_config(State(model): State<ReadModel>, Path(address): Path<String>) -> Json<StrategyConfigView> {
    Json(model.load_strategy_config(&address).await)
}

async fn allowlist(State(model): State<ReadModel>) -> Json<AllowlistOptions> {
    Json(model.load_allowlist_options().await)
}

async fn validate_user(
    State(model): State<ReadModel>,
    Path(guard): Path<String>,
    Query(params): Query<ValidateParams>,
) -> Result<Json<Validation>> {
    let data = match params.data.as_deref().filter(|d| !d.is_empty()) {
        Some(hex) => Bytes::from_str(hex)
            .context("data is not valid hex")
            .map_err(Error::bad_request)?,
        None => Bytes::new(),
    };

    let validation = model
        .live()
        .validate_user(&guard.to_ascii_lowercase(), &params.user.to_ascii_lowercase(), &data)
        .await
        .map_err(|e| Error::with_status(axum::http::StatusCode::BAD_GATEWAY, anyhow!(e.human_message().to_owned())))?;
    Ok(Json(validation))
}

async fn ingest(State(indexer): State<IndexerHandle>, Json(events): Json<Vec<LoggedEvent>>) -> Result<Json<IngestReport>> {
    Ok(Json(indexer.ingest(events).await?))
}

async fn health(State(db): State<SqlitePool>) -> Result<Json<Health>> {
    Ok(Json(Health {
        version: env!("CARGO_PKG_VERSION"),
        journal: db::journal_length(&db).await?,
    }))
}

#[rustfmt::skip]
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks",                         get(tasks))
        .route("/tasks/{id}",                    get(task))
        .route("/users/{address}",               get(user))
        .route("/reviews/queue",                 get(review_queue))
        .route("/reviewers/{address}/metrics",   get(reviewer_metrics))
        .route("/arbitrations",                  get(arbitrations))
        .route("/stats/global",                  get(global_stats))
        .route("/stats/daily",                   get(daily_stats))
        .route("/strategies/{address}/config",   get(strategy_config))
        .route("/guards/{address}/validate",     get(validate_user))
        .route("/allowlist",                     get(allowlist))
        .route("/events",                        post(ingest))
        .route("/_health",                       get(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filters() {
        let statuses = parse_statuses::<SubmissionStatus>(Some("submitted, UNDER_REVIEW,")).unwrap();
        assert_eq!(statuses, [SubmissionStatus::Submitted, SubmissionStatus::UnderReview]);

        assert!(parse_statuses::<ArbitrationStatus>(None).unwrap().is_empty());

        let err = parse_statuses::<ArbitrationStatus>(Some("PENDING,LOST")).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
