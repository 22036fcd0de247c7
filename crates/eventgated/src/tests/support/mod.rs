//! Test doubles shared by the gateway suites.

mod collector;
mod config_loader;
mod gateway;
mod metrics;
mod reporter;
mod shutdown;
mod socket;

use std::time::{Duration, Instant};

pub use collector::{Completion, RecordingCollector};
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use gateway::{RunningGateway, read_data};
pub use metrics::{MetricEvent, RecordingMetrics};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::TestShutdownSignal;
pub use socket::{ScriptedSocket, SocketDriver};

/// Generous bound for cross-thread assertions.
pub const WAIT: Duration = Duration::from_secs(2);

/// Polls `condition` until it holds or [`WAIT`] elapses.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
