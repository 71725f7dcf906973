//! The single writer.
//!
//! Events reach the index only through this task, one at a time and in arrival order.
//! Each event is journaled first; a log that is already journaled is skipped, so
//! re-delivering a batch is harmless.
use anyhow::{Context as _, Result};
use metrics::{counter, gauge};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::{
    db,
    events::LoggedEvent,
    metrics::{EVENTS_APPLIED, EVENTS_DROPPED, EVENTS_DUPLICATE, JOURNAL_LENGTH},
    reducer,
    store::{Index, SharedIndex},
};

/// What happened to a batch of events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub applied: u64,
    pub duplicate: u64,
    pub dropped: u64,
}

struct Batch {
    events: Vec<LoggedEvent>,
    reply: oneshot::Sender<Result<IngestReport>>,
}

/// Submits events to the indexer task.
#[derive(Clone, Debug)]
pub struct IndexerHandle {
    tx: mpsc::Sender<Batch>,
}

impl IndexerHandle {
    /// Journal and apply `events` in order. Stops at the first journal failure; events
    /// before it stay applied.
    pub async fn ingest(&self, events: Vec<LoggedEvent>) -> Result<IngestReport> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Batch { events, reply })
            .await
            .ok()
            .context("indexer has shut down")?;
        rx.await.context("indexer dropped the batch")?
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn set_journal_gauge(length: u64) {
    gauge!(JOURNAL_LENGTH).set(length as f64);
}

/// Count an outcome. The reducer has already logged it.
fn record_outcome(outcome: reducer::Outcome, report: &mut IngestReport) {
    match outcome {
        Ok(()) => {
            counter!(EVENTS_APPLIED).increment(1);
            report.applied += 1;
        }
        Err(reason) => {
            counter!(EVENTS_DROPPED, "reason" => reason.as_str()).increment(1);
            report.dropped += 1;
        }
    }
}

async fn apply_batch(db: &SqlitePool, index: &SharedIndex, events: Vec<LoggedEvent>) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    for logged in events {
        if !db::append(db, &logged).await? {
            counter!(EVENTS_DUPLICATE).increment(1);
            report.duplicate += 1;
            continue;
        }

        let outcome = reducer::apply(&mut *index.write().await, &logged);
        record_outcome(outcome, &mut report);
    }

    set_journal_gauge(db::journal_length(db).await?);
    Ok(report)
}

/// Rebuild `index` from scratch out of the journal.
pub async fn replay(db: &SqlitePool, index: &SharedIndex) -> Result<usize> {
    let journal = db::journal(db).await?;

    let mut rebuilt = Index::default();
    for logged in &journal {
        // Drops were already reported when the event first arrived.
        _ = reducer::apply(&mut rebuilt, logged);
    }
    *index.write().await = rebuilt;

    set_journal_gauge(u64::try_from(journal.len()).unwrap_or(u64::MAX));
    info!("replayed {} journaled events", journal.len());
    Ok(journal.len())
}

/// Start the indexer task.
pub fn spawn(db: SqlitePool, index: SharedIndex) -> (tokio::task::JoinHandle<()>, IndexerHandle) {
    let (tx, mut rx) = mpsc::channel::<Batch>(64);
    let handle = tokio::spawn(async move {
        // All handles have been dropped once this yields `None`.
        while let Some(batch) = rx.recv().await {
            let result = apply_batch(&db, &index, batch.events).await;
            if let Err(e) = &result {
                error!("failed to ingest batch: {e:?}");
            }
            drop(batch.reply.send(result));
        }
    });

    (handle, IndexerHandle { tx })
}

/// Read a JSON-lines file of events. Blank lines are skipped.
pub async fn read_events_file(path: &std::path::Path) -> Result<Vec<LoggedEvent>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("{}:{}: invalid event", path.display(), n + 1))
        })
        .collect()
}
