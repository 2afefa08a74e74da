//! Scheduled expiry of login sessions
//!
//! A sweep walks every page of the session listing and deletes sessions whose
//! `createdAt` is strictly older than the retention window. The first failure
//! aborts the sweep.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info};

use crate::{
    storage::{SessionStore, StorageError},
    AppState,
};

/// Sessions older than this (7 days) are deleted.
pub const SESSION_RETENTION_MS: i64 = 604_800_000;

pub fn session_retention() -> TimeDelta {
    TimeDelta::milliseconds(SESSION_RETENTION_MS)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: u64,
    pub deleted: u64,
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("session store failure during sweep: {0}")]
    Storage(#[from] StorageError),
    #[error("session {key} holds invalid JSON: {source}")]
    InvalidPayload {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub async fn sweep(store: &dyn SessionStore, now: DateTime<Utc>) -> Result<SweepReport, SweepError> {
    let cutoff = now - session_retention();
    let mut report = SweepReport::default();
    let mut cursor: Option<String> = None;

    loop {
        let page = store.list(cursor.as_deref()).await?;

        for key in page.keys {
            report.scanned += 1;
            let Some(raw) = store.get(&key).await? else {
                continue;
            };
            let payload: Value = serde_json::from_str(&raw)
                .map_err(|source| SweepError::InvalidPayload {
                    key: key.clone(),
                    source,
                })?;

            if created_at(&payload).is_some_and(|created| created < cutoff) {
                store.delete(&key).await?;
                report.deleted += 1;
            }
        }

        match page.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(report)
}

/// Reads `createdAt` as epoch milliseconds (a number or a digit string) or an
/// RFC 3339 timestamp.
fn created_at(payload: &Value) -> Option<DateTime<Utc>> {
    match payload.get("createdAt")? {
        Value::Number(millis) => {
            DateTime::from_timestamp_millis(millis.as_f64()? as i64)
        }
        Value::String(text) => match text.trim().parse::<i64>() {
            Ok(millis) => DateTime::from_timestamp_millis(millis),
            Err(_) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|timestamp| timestamp.with_timezone(&Utc)),
        },
        _ => None,
    }
}

/// One scheduled sweep: logs the outcome and reports failures.
pub async fn run_sweep(state: &AppState) -> Option<SweepReport> {
    let started_at = Utc::now();
    match sweep(state.session_store.as_ref(), started_at).await {
        Ok(report) => {
            state.metrics.record_sessions_deleted(report.deleted);
            info!(
                scanned = report.scanned,
                deleted = report.deleted,
                "session cleanup completed"
            );
            Some(report)
        }
        Err(err) => {
            error!(error = %err, "session cleanup failed");
            state.reporter.report(&err);
            None
        }
    }
}

pub fn spawn(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            info!(scheduled_at = %Utc::now(), "session cleanup triggered");
            run_sweep(&state).await;
        }
    })
}
