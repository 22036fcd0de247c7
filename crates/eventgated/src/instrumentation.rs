//! Gateway metrics and the periodic connection gauge.
//!
//! Metric emission goes through [`GatewayMetrics`] so the pipeline can be
//! observed in tests. [`RecorderMetrics`] forwards to the `metrics` facade;
//! without an installed recorder every call is a no-op.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tracing::debug;

use crate::registry::ConnectionTable;

const REPORTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::instrumentation");

/// Why reading a batch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadFailure {
    /// The frame payload could not be decoded.
    Serde,
    /// The peer went away: normal, going-away or abnormal close, no status,
    /// or a reset connection.
    CloseError,
    /// Any other read failure, including liveness expiry.
    Unknown,
}

impl ReadFailure {
    /// Metric label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Serde => "serde",
            Self::CloseError => "closeerror",
            Self::Unknown => "unknown",
        }
    }
}

/// Outcome of reading one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchOutcome {
    /// The batch was decoded.
    Success,
    /// The batch, or the read itself, failed.
    Failed(ReadFailure),
}

/// Sink for gateway metrics.
pub trait GatewayMetrics: Send + Sync {
    /// A frame read completed with `outcome`.
    fn batch_read(&self, outcome: BatchOutcome, group: &str);
    /// One event of a decoded batch.
    fn event_received(&self, group: &str, event_type: &str, bytes: usize);
    /// A batch whose request id this connection already sent.
    fn duplicate_batch(&self, group: &str);
    /// Time from decode to synchronous acknowledgement.
    fn ack_round_trip(&self, elapsed: Duration);
    /// An upgrade was admitted.
    fn connection_accepted(&self, group: &str);
    /// An upgrade was refused.
    fn connection_rejected(&self, reason: &str, group: &str);
    /// A registered connection ended after `duration`.
    fn connection_closed(&self, group: &str, duration: Duration);
    /// Current number of connections in `group`.
    fn connections_current(&self, group: &str, count: usize);
}

/// Forwards gateway metrics to the global `metrics` recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecorderMetrics;

fn millis(duration: Duration) -> f64 {
    u32::try_from(duration.as_millis()).map_or(f64::from(u32::MAX), f64::from)
}

fn as_gauge(value: usize) -> f64 {
    u32::try_from(value).map_or(f64::from(u32::MAX), f64::from)
}

impl GatewayMetrics for RecorderMetrics {
    fn batch_read(&self, outcome: BatchOutcome, group: &str) {
        match outcome {
            BatchOutcome::Success => counter!(
                "batches_read_total",
                "status" => "success",
                "conn_group" => group.to_owned()
            )
            .increment(1),
            BatchOutcome::Failed(reason) => counter!(
                "batches_read_total",
                "status" => "failed",
                "reason" => reason.as_str(),
                "conn_group" => group.to_owned()
            )
            .increment(1),
        }
    }

    fn event_received(&self, group: &str, event_type: &str, bytes: usize) {
        counter!(
            "events_rx_bytes_total",
            "conn_group" => group.to_owned(),
            "event_type" => event_type.to_owned()
        )
        .increment(u64::try_from(bytes).unwrap_or(u64::MAX));
        counter!(
            "events_rx_total",
            "conn_group" => group.to_owned(),
            "event_type" => event_type.to_owned()
        )
        .increment(1);
    }

    fn duplicate_batch(&self, group: &str) {
        counter!("events_duplicate_total", "conn_group" => group.to_owned()).increment(1);
    }

    fn ack_round_trip(&self, elapsed: Duration) {
        histogram!("event_rtt_ms").record(millis(elapsed));
    }

    fn connection_accepted(&self, group: &str) {
        counter!("user_connection_success_total", "conn_group" => group.to_owned()).increment(1);
    }

    fn connection_rejected(&self, reason: &str, group: &str) {
        counter!(
            "user_connection_failure_total",
            "reason" => reason.to_owned(),
            "conn_group" => group.to_owned()
        )
        .increment(1);
    }

    fn connection_closed(&self, group: &str, duration: Duration) {
        histogram!(
            "user_session_duration_milliseconds",
            "conn_group" => group.to_owned()
        )
        .record(millis(duration));
    }

    fn connections_current(&self, group: &str, count: usize) {
        gauge!("connections_count_current", "conn_group" => group.to_owned())
            .set(as_gauge(count));
    }
}

/// Background thread publishing per-group connection counts.
pub struct ConnectionReporter {
    stop: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ConnectionReporter {
    /// Starts reporting every `interval`.
    ///
    /// # Errors
    ///
    /// Returns the spawn failure when the thread cannot be created.
    pub fn spawn(
        table: Arc<ConnectionTable>,
        metrics: Arc<dyn GatewayMetrics>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let (stop, stopped) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("eventgate-reporter".to_owned())
            .spawn(move || {
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => report(&table, metrics.as_ref()),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!(target: REPORTER_TARGET, "connection reporter stopped");
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.stop.send(()).is_err() {
            debug!(target: REPORTER_TARGET, "connection reporter already stopped");
        }
        if handle.join().is_err() {
            debug!(target: REPORTER_TARGET, "connection reporter panicked");
        }
    }
}

impl Drop for ConnectionReporter {
    fn drop(&mut self) {
        self.halt();
    }
}

fn report(table: &ConnectionTable, metrics: &dyn GatewayMetrics) {
    for (group, count) in table.total_connection_per_group() {
        metrics.connections_current(&group, count);
    }
}
