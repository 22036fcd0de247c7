//! Real-time event ingestion gateway.
//!
//! Clients hold long-lived WebSocket connections, send batches of events and
//! receive one acknowledgement per batch. The crate is organised around two
//! pieces:
//!
//! - the [`ConnectionTable`], a capacity-bounded registry of live
//!   connections that also remembers which request ids each connection has
//!   sent;
//! - the per-connection [`Pipeline`], which decodes frames with the codec for
//!   their frame type, hands batches to a [`Collector`], and acknowledges them
//!   either immediately or once the collector reports completion.
//!
//! [`run_gateway`] wires these to a TCP listener, structured telemetry and
//! signal-driven shutdown.

mod bootstrap;
pub mod collector;
pub mod gateway;
mod health;
mod identifier;
pub mod instrumentation;
mod process;
pub mod registry;
mod session;
mod telemetry;
pub mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Gateway, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use collector::{
    ChannelCollector, CollectError, CollectRequest, Collector, EventSink, LoggingSink, WorkerPool,
};
pub use gateway::{Acknowledger, Pipeline, PipelineSettings};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use identifier::Identifier;
pub use instrumentation::{GatewayMetrics, RecorderMetrics};
pub use process::{LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_gateway};
pub use registry::{ConnectionTable, RegistryError};
pub use session::Session;
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
