//! Unit tests for bootstrap, reporter wiring and collector hand-off.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::rstest;

use eventgate_config::{AckMode, Config};
use eventgate_proto::{CodecRegistry, FrameType};

use crate::bootstrap::{StaticConfigLoader, bootstrap_with};
use crate::collector::MockCollector;
use crate::gateway::{Pipeline, PipelineSettings};
use crate::health::HealthReporter;
use crate::identifier::Identifier;
use crate::registry::ConnectionTable;
use crate::session::Session;

use super::support::{
    HealthEvent, RecordingHealthReporter, RecordingMetrics, ScriptedSocket, TestConfigLoader, WAIT,
};

#[rstest]
fn bootstrap_reports_start_before_success() {
    let reporter = RecordingHealthReporter::default();
    bootstrap_with(&TestConfigLoader::new(), &reporter).expect("bootstrap succeeds");
    assert_eq!(
        reporter.events(),
        vec![HealthEvent::BootstrapStarting, HealthEvent::BootstrapSucceeded]
    );
}

#[rstest]
fn static_loader_configuration_is_returned_unchanged() {
    let config = Config {
        max_connections: 3,
        dedup_enabled: true,
        ..Config::default()
    };
    let reporter = RecordingHealthReporter::default();
    let gateway =
        bootstrap_with(&StaticConfigLoader::new(config.clone()), &reporter).expect("bootstrap");
    assert_eq!(gateway.config(), &config);
    assert_eq!(gateway.into_config().max_connections, 3);
}

#[rstest]
fn shared_reporters_forward_events() {
    let recorder = Arc::new(RecordingHealthReporter::default());
    let shared: Arc<dyn HealthReporter> = Arc::clone(&recorder) as _;
    shared.bootstrap_starting();
    shared.shutdown_started();
    assert_eq!(
        recorder.events(),
        vec![HealthEvent::BootstrapStarting, HealthEvent::ShutdownStarted]
    );
}

#[rstest]
fn only_decoded_batches_reach_the_collector() {
    let mut collector = MockCollector::new();
    collector
        .expect_collect()
        .withf(|request| request.request.req_guid == "valid-1")
        .times(1)
        .return_const(());

    let metrics = Arc::new(RecordingMetrics::default());
    let table = Arc::new(ConnectionTable::new(1));
    let identifier = Identifier::new("gina", "web");
    table.store(&identifier).expect("register connection");
    let session = Session::open(identifier, Arc::clone(&table), Arc::clone(&metrics) as _);
    let pipeline = Pipeline::new(
        CodecRegistry::standard(),
        Arc::new(collector),
        Arc::clone(&metrics) as _,
        PipelineSettings {
            ack_mode: AckMode::Asynchronous,
            dedup_enabled: false,
            ping_interval: Duration::from_secs(60),
            pong_wait: Duration::from_secs(120),
        },
    );

    let (socket, mut driver) = ScriptedSocket::pair();
    let served = Arc::clone(&socket);
    let serving = thread::spawn(move || pipeline.run(served, session));
    driver.send(FrameType::Text, b"not json".to_vec());
    driver.send(FrameType::Text, br#"{"req_guid":"valid-1","events":[]}"#.to_vec());

    assert_eq!(socket.wait_for_responses(2, WAIT).len(), 2);
    driver.disconnect();
    serving.join().expect("pipeline thread panicked");
    assert!(table.is_empty());
}
