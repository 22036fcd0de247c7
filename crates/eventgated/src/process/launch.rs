//! Launch sequencing and runtime orchestration.

use std::io;
use std::sync::Arc;

use tracing::info;

use eventgate_proto::CodecRegistry;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::collector::{EventSink, LoggingSink, WorkerPool};
use crate::gateway::{
    GatewayConnectionHandler, Pipeline, PipelineSettings, UpgradeSettings, Upgrader,
};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::instrumentation::{ConnectionReporter, GatewayMetrics, RecorderMetrics};
use crate::registry::ConnectionTable;
use crate::transport::GatewayListener;

use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{PROCESS_TARGET, SHUTDOWN_TIMEOUT};

/// Collaborators the runtime is assembled from.
pub(crate) struct ServiceDeps<L> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) metrics: Arc<dyn GatewayMetrics>,
    pub(crate) sink: Arc<dyn EventSink>,
}

/// Everything needed to run the gateway once.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) shutdown: S,
    pub(crate) services: ServiceDeps<L>,
}

/// Runs the gateway with production collaborators until a termination
/// signal arrives.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, binding or signal handling fails.
pub fn run_gateway() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        shutdown: SystemShutdownSignal::new(SHUTDOWN_TIMEOUT),
        services: ServiceDeps {
            loader: SystemConfigLoader,
            reporter: Arc::new(StructuredHealthReporter::new()),
            metrics: Arc::new(RecorderMetrics),
            sink: Arc::new(LoggingSink),
        },
    };
    run_gateway_with(plan)
}

fn service_error(service: &'static str) -> impl FnOnce(io::Error) -> LaunchError {
    move |source| LaunchError::Service { service, source }
}

/// Runs the gateway with injected collaborators.
pub(crate) fn run_gateway_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan { shutdown, services } = plan;
    let ServiceDeps {
        loader,
        reporter,
        metrics,
        sink,
    } = services;

    let config = bootstrap_with(&loader, reporter.as_ref())?.into_config();
    info!(
        target: PROCESS_TARGET,
        listen = %config.listen(),
        "starting gateway runtime"
    );
    let listener = GatewayListener::bind(config.listen())?;
    let table = Arc::new(ConnectionTable::new(config.max_connections));

    let (pool, collector) =
        WorkerPool::start(config.worker_pool_size, config.collector_buffer, sink)
            .map_err(service_error("collector workers"))?;
    let connection_reporter = ConnectionReporter::spawn(
        Arc::clone(&table),
        Arc::clone(&metrics),
        config.report_interval(),
    )
    .map_err(service_error("connection reporter"))?;

    let pipeline = Arc::new(Pipeline::new(
        CodecRegistry::standard(),
        Arc::new(collector),
        Arc::clone(&metrics),
        PipelineSettings::from(&config),
    ));
    let upgrader = Upgrader::new(
        UpgradeSettings::from(&config),
        Arc::clone(&table),
        Arc::clone(&metrics),
    );
    let handler = Arc::new(GatewayConnectionHandler::new(
        upgrader,
        pipeline,
        config.ping_interval(),
        config.write_wait(),
    ));

    let addr = listener.local_addr();
    let listener_handle = listener.start(handler)?;
    reporter.listener_ready(addr);

    shutdown.wait()?;
    reporter.shutdown_started();
    listener_handle.shutdown();
    listener_handle.join()?;
    connection_reporter.stop();
    pool.shutdown();
    info!(
        target: PROCESS_TARGET,
        open_connections = table.len(),
        "shutdown sequence completed"
    );
    Ok(())
}
