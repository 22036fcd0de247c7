//! Metrics double recording every observation.

use std::sync::Mutex;
use std::time::Duration;

use crate::instrumentation::{BatchOutcome, GatewayMetrics};

/// One recorded metric observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricEvent {
    BatchRead { outcome: BatchOutcome, group: String },
    EventReceived { group: String, event_type: String },
    DuplicateBatch { group: String },
    AckRoundTrip,
    ConnectionAccepted { group: String },
    ConnectionRejected { reason: String, group: String },
    ConnectionClosed { group: String },
    ConnectionsCurrent { group: String, count: usize },
}

#[derive(Debug, Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<MetricEvent>>,
}

impl RecordingMetrics {
    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().expect("metrics mutex poisoned").clone()
    }

    /// Outcomes passed to `batch_read`, in order.
    pub fn batch_outcomes(&self) -> Vec<BatchOutcome> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                MetricEvent::BatchRead { outcome, .. } => Some(outcome),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: MetricEvent) {
        self.events
            .lock()
            .expect("metrics mutex poisoned")
            .push(event);
    }
}

impl GatewayMetrics for RecordingMetrics {
    fn batch_read(&self, outcome: BatchOutcome, group: &str) {
        self.record(MetricEvent::BatchRead {
            outcome,
            group: group.to_owned(),
        });
    }

    fn event_received(&self, group: &str, event_type: &str, _bytes: usize) {
        self.record(MetricEvent::EventReceived {
            group: group.to_owned(),
            event_type: event_type.to_owned(),
        });
    }

    fn duplicate_batch(&self, group: &str) {
        self.record(MetricEvent::DuplicateBatch {
            group: group.to_owned(),
        });
    }

    fn ack_round_trip(&self, _elapsed: Duration) {
        self.record(MetricEvent::AckRoundTrip);
    }

    fn connection_accepted(&self, group: &str) {
        self.record(MetricEvent::ConnectionAccepted {
            group: group.to_owned(),
        });
    }

    fn connection_rejected(&self, reason: &str, group: &str) {
        self.record(MetricEvent::ConnectionRejected {
            reason: reason.to_owned(),
            group: group.to_owned(),
        });
    }

    fn connection_closed(&self, group: &str, _duration: Duration) {
        self.record(MetricEvent::ConnectionClosed {
            group: group.to_owned(),
        });
    }

    fn connections_current(&self, group: &str, count: usize) {
        self.record(MetricEvent::ConnectionsCurrent {
            group: group.to_owned(),
            count,
        });
    }
}
