//! Process-wide metrics, exposed in the Prometheus text format
//!
//! The registry owns its own recorder instead of installing a global one, so
//! every `AppState` (and every test) gets an isolated set of counters.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use serde::Serialize;

/// Point-in-time totals shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub requests_total: u64,
    pub server_errors_total: u64,
    pub documents_uploaded: u64,
    pub documents_retrieved: u64,
    pub sessions_deleted: u64,
    pub tool_invocations: u64,
}

#[derive(Debug, Default)]
struct Totals {
    requests: AtomicU64,
    server_errors: AtomicU64,
    documents_uploaded: AtomicU64,
    documents_retrieved: AtomicU64,
    sessions_deleted: AtomicU64,
    tool_invocations: AtomicU64,
}

pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    totals: Totals,
    version: &'static str,
    started_at: DateTime<Utc>,
}

impl MetricsRegistry {
    pub fn new(version: &'static str) -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let started_at = Utc::now();

        metrics::with_local_recorder(&recorder, || {
            metrics::gauge!("worker_version_info", "version" => version).set(1.0);
            metrics::gauge!("worker_startup_time_seconds")
                .set(started_at.timestamp_millis() as f64 / 1000.0);
        });

        Self {
            recorder,
            handle,
            totals: Totals::default(),
            version,
            started_at,
        }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }

    pub fn record_request(&self, method: &str, path: &str, status: u16) {
        self.totals.requests.fetch_add(1, Ordering::Relaxed);
        if status >= 500 {
            self.totals.server_errors.fetch_add(1, Ordering::Relaxed);
        }
        metrics::with_local_recorder(&self.recorder, || {
            metrics::counter!(
                "http_requests_total",
                "method" => method.to_string(),
                "path" => path.to_string(),
                "status" => status.to_string()
            )
            .increment(1);
        });
    }

    pub fn record_upload(&self) {
        self.totals.documents_uploaded.fetch_add(1, Ordering::Relaxed);
        metrics::with_local_recorder(&self.recorder, || {
            metrics::counter!("documents_uploaded_total").increment(1);
        });
    }

    pub fn record_retrieval(&self) {
        self.totals.documents_retrieved.fetch_add(1, Ordering::Relaxed);
        metrics::with_local_recorder(&self.recorder, || {
            metrics::counter!("documents_retrieved_total").increment(1);
        });
    }

    pub fn record_sessions_deleted(&self, count: u64) {
        self.totals.sessions_deleted.fetch_add(count, Ordering::Relaxed);
        metrics::with_local_recorder(&self.recorder, || {
            metrics::counter!("sessions_deleted_total").increment(count);
        });
    }

    pub fn record_tool_invocation(&self, tool: &str) {
        self.totals.tool_invocations.fetch_add(1, Ordering::Relaxed);
        metrics::with_local_recorder(&self.recorder, || {
            metrics::counter!("tool_invocations_total", "tool" => tool.to_string()).increment(1);
        });
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        let totals = &self.totals;
        CounterSnapshot {
            requests_total: totals.requests.load(Ordering::Relaxed),
            server_errors_total: totals.server_errors.load(Ordering::Relaxed),
            documents_uploaded: totals.documents_uploaded.load(Ordering::Relaxed),
            documents_retrieved: totals.documents_retrieved.load(Ordering::Relaxed),
            sessions_deleted: totals.sessions_deleted.load(Ordering::Relaxed),
            tool_invocations: totals.tool_invocations.load(Ordering::Relaxed),
        }
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }
}
