//! Per-connection read loop.
//!
//! Frames are processed in arrival order. Each data frame is decoded with the
//! codec for its frame type and handed to the collector; the next frame is not
//! read until that hand-off returns. Any read failure ends the loop, after
//! which the ack correlator is stopped, the socket closed and the session
//! dropped.

use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use eventgate_config::{AckMode, Config};
use eventgate_proto::{
    CodecRegistry, FrameType, SendEventRequest, SendEventResponse, json_req_guid,
};

use super::GATEWAY_TARGET;
use super::ack::{AckCorrelator, AckEvent, Acknowledger};
use super::frame::{FrameSocket, Inbound, Outbound, ReadError};
use super::keepalive::{Keepalive, KeepaliveAction};
use super::respond::write_response;
use crate::collector::{CollectRequest, Collector};
use crate::instrumentation::{BatchOutcome, GatewayMetrics, ReadFailure};
use crate::session::Session;

/// Behaviour switches taken from [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// When clients are acknowledged.
    pub ack_mode: AckMode,
    /// Acknowledge replayed request ids without collecting them.
    pub dedup_enabled: bool,
    /// Interval between server pings.
    pub ping_interval: Duration,
    /// Silence after which the peer is considered gone.
    pub pong_wait: Duration,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            ack_mode: config.ack_mode,
            dedup_enabled: config.dedup_enabled,
            ping_interval: config.ping_interval(),
            pong_wait: config.pong_wait(),
        }
    }
}

/// Why the read loop stopped.
#[derive(Debug)]
enum LoopExit {
    /// The transport failed or the peer left.
    Read(ReadError),
    /// A data frame arrived with no registered codec.
    UnknownFrameType(FrameType),
}

/// Shared per-gateway state driving every connection's read loop.
pub struct Pipeline {
    codecs: CodecRegistry,
    collector: Arc<dyn Collector>,
    metrics: Arc<dyn GatewayMetrics>,
    settings: PipelineSettings,
}

struct Connection<'a> {
    socket: &'a dyn FrameSocket,
    session: &'a Session,
    acks: &'a Sender<AckEvent>,
}

impl Connection<'_> {
    fn group(&self) -> &str {
        &self.session.identifier().group
    }
}

impl Pipeline {
    /// Builds a pipeline.
    #[must_use]
    pub const fn new(
        codecs: CodecRegistry,
        collector: Arc<dyn Collector>,
        metrics: Arc<dyn GatewayMetrics>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            codecs,
            collector,
            metrics,
            settings,
        }
    }

    /// Serves `socket` until it fails, then tears the connection down.
    pub fn run<S: FrameSocket>(&self, socket: Arc<S>, session: Session) {
        let (acks, events) = mpsc::channel();
        let correlator = match AckCorrelator::spawn(
            Arc::clone(&socket),
            self.codecs,
            Arc::clone(&self.metrics),
            session.identifier().clone(),
            self.settings
                .dedup_enabled
                .then(|| Arc::clone(session.table())),
            events,
        ) {
            Ok(correlator) => Some(correlator),
            Err(error) => {
                warn!(
                    target: GATEWAY_TARGET,
                    connection = %session.identifier(),
                    error = %error,
                    "failed to start ack correlator"
                );
                None
            }
        };

        if correlator.is_some() {
            let connection = Connection {
                socket: socket.as_ref(),
                session: &session,
                acks: &acks,
            };
            let exit = self.read_loop(&connection);
            self.record_exit(&connection, &exit);
        }

        if acks.send(AckEvent::Teardown).is_err() {
            debug!(target: GATEWAY_TARGET, "ack correlator already stopped");
        }
        drop(acks);
        if let Some(correlator) = correlator {
            correlator.join();
        }
        socket.close();
        drop(session);
    }

    fn read_loop(&self, connection: &Connection<'_>) -> LoopExit {
        let mut keepalive = Keepalive::new(
            Instant::now(),
            self.settings.ping_interval,
            self.settings.pong_wait,
        );
        loop {
            let inbound = match connection.socket.next_frame() {
                Ok(inbound) => inbound,
                Err(error) => return LoopExit::Read(error),
            };
            let now = Instant::now();
            match inbound {
                Inbound::Data {
                    frame_type,
                    payload,
                } => {
                    keepalive.observe(now);
                    if let Err(exit) = self.handle_frame(connection, frame_type, &payload, now) {
                        return exit;
                    }
                }
                Inbound::Pong | Inbound::Control => keepalive.observe(now),
                Inbound::Idle => {}
            }
            match keepalive.poll(Instant::now()) {
                KeepaliveAction::Wait => {}
                KeepaliveAction::Ping => {
                    if let Err(error) = connection.socket.send_frame(Outbound::Ping) {
                        debug!(
                            target: GATEWAY_TARGET,
                            connection = %connection.session.identifier(),
                            error = %error,
                            "failed to send ping"
                        );
                    }
                }
                KeepaliveAction::Expired => {
                    return LoopExit::Read(ReadError::LivenessExpired(keepalive.pong_wait()));
                }
            }
        }
    }

    fn handle_frame(
        &self,
        connection: &Connection<'_>,
        frame_type: FrameType,
        payload: &[u8],
        received_at: Instant,
    ) -> Result<(), LoopExit> {
        let codec = self
            .codecs
            .resolve(frame_type)
            .ok_or(LoopExit::UnknownFrameType(frame_type))?;
        let request = match codec.decode(payload) {
            Ok(request) => request,
            Err(error) => {
                debug!(
                    target: GATEWAY_TARGET,
                    connection = %connection.session.identifier(),
                    frame_type = %frame_type,
                    error = %error,
                    "failed to decode batch"
                );
                self.metrics.batch_read(
                    BatchOutcome::Failed(ReadFailure::Serde),
                    connection.group(),
                );
                let req_guid = match frame_type {
                    FrameType::Text => json_req_guid(payload).unwrap_or_default(),
                    FrameType::Binary => String::new(),
                };
                self.respond(
                    connection,
                    frame_type,
                    &SendEventResponse::bad_request(&req_guid, &error),
                );
                return Ok(());
            }
        };

        self.metrics
            .batch_read(BatchOutcome::Success, connection.group());
        for event in &request.events {
            self.metrics
                .event_received(connection.group(), &event.r#type, event.event_bytes.len());
        }

        if self.is_replay(connection, &request) {
            self.metrics.duplicate_batch(connection.group());
            self.respond(
                connection,
                frame_type,
                &SendEventResponse::success(&request.req_guid),
            );
            return Ok(());
        }

        let acknowledger = match self.settings.ack_mode {
            AckMode::Asynchronous => {
                self.respond(
                    connection,
                    frame_type,
                    &SendEventResponse::success(&request.req_guid),
                );
                Acknowledger::Detached
            }
            AckMode::Synchronous => Acknowledger::correlated(
                connection.acks.clone(),
                frame_type,
                request.req_guid.clone(),
                received_at,
            ),
        };
        self.collector.collect(CollectRequest {
            identifier: connection.session.identifier().clone(),
            received_at,
            request,
            acknowledger,
        });
        Ok(())
    }

    /// Checks and records the request id when deduplication is enabled.
    fn is_replay(&self, connection: &Connection<'_>, request: &SendEventRequest) -> bool {
        if !self.settings.dedup_enabled {
            return false;
        }
        let identifier = connection.session.identifier();
        let table = connection.session.table();
        if table.has_event(identifier, &request.req_guid) {
            debug!(
                target: GATEWAY_TARGET,
                connection = %identifier,
                req_guid = %request.req_guid,
                "duplicate batch acknowledged without collection"
            );
            return true;
        }
        table.store_event(identifier, &request.req_guid);
        false
    }

    fn respond(
        &self,
        connection: &Connection<'_>,
        frame_type: FrameType,
        response: &SendEventResponse,
    ) {
        if let Err(error) = write_response(connection.socket, &self.codecs, frame_type, response)
        {
            debug!(
                target: GATEWAY_TARGET,
                connection = %connection.session.identifier(),
                error = %error,
                "failed to write response"
            );
        }
    }

    fn record_exit(&self, connection: &Connection<'_>, exit: &LoopExit) {
        let identifier = connection.session.identifier();
        match exit {
            LoopExit::Read(error) => {
                let failure = error.failure();
                self.metrics
                    .batch_read(BatchOutcome::Failed(failure), connection.group());
                if failure == ReadFailure::CloseError {
                    debug!(
                        target: GATEWAY_TARGET,
                        connection = %identifier,
                        reason = failure.as_str(),
                        error = %error,
                        "read loop ended"
                    );
                } else {
                    warn!(
                        target: GATEWAY_TARGET,
                        connection = %identifier,
                        reason = failure.as_str(),
                        error = %error,
                        "read loop ended"
                    );
                }
            }
            LoopExit::UnknownFrameType(frame_type) => {
                warn!(
                    target: GATEWAY_TARGET,
                    connection = %identifier,
                    frame_type = %frame_type,
                    "no codec for frame type; closing connection"
                );
            }
        }
    }
}
