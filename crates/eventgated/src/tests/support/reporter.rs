//! Test double for [`HealthReporter`] that records lifecycle events.

use std::net::SocketAddr;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use eventgate_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ListenerReady(SocketAddr),
    ShutdownStarted,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
    changed: Condvar,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Blocks until the listener reports its bound address.
    pub fn wait_for_listener(&self, timeout: Duration) -> Option<SocketAddr> {
        let guard = self.events.lock().expect("health reporter mutex poisoned");
        let (guard, _) = self
            .changed
            .wait_timeout_while(guard, timeout, |events| listener_addr(events).is_none())
            .expect("health reporter mutex poisoned");
        listener_addr(&guard)
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
        self.changed.notify_all();
    }
}

fn listener_addr(events: &[HealthEvent]) -> Option<SocketAddr> {
    events.iter().find_map(|event| match event {
        HealthEvent::ListenerReady(addr) => Some(*addr),
        _ => None,
    })
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_ready(&self, addr: SocketAddr) {
        self.record(HealthEvent::ListenerReady(addr));
    }

    fn shutdown_started(&self) {
        self.record(HealthEvent::ShutdownStarted);
    }
}
