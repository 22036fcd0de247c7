//! Acknowledgement delivery.
//!
//! In synchronous mode the collector completes a batch by sending an
//! [`AckInfo`] over the connection's ack channel. The [`AckCorrelator`]
//! thread drains that channel and writes the final response, so completion
//! never touches read-loop state directly. A failed batch has its request id
//! released from the replay set before the error is written, so a client retry
//! is collected again.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Instant;

use tracing::{debug, warn};

use eventgate_proto::{CodecRegistry, FrameType, SendEventResponse};

use super::GATEWAY_TARGET;
use super::frame::FrameSocket;
use super::respond::write_response;
use crate::collector::CollectError;
use crate::identifier::Identifier;
use crate::instrumentation::GatewayMetrics;
use crate::registry::ConnectionTable;

/// Completion notice for one batch.
#[derive(Debug)]
pub struct AckInfo {
    /// Frame type the batch arrived on.
    pub frame_type: FrameType,
    /// Request id echoed in the response.
    pub req_guid: String,
    /// Downstream outcome.
    pub outcome: Result<(), CollectError>,
    /// When the batch was decoded.
    pub submitted_at: Instant,
}

/// Message consumed by the correlator.
#[derive(Debug)]
pub enum AckEvent {
    /// A batch completed.
    Ack(AckInfo),
    /// The read loop ended; stop after earlier acks.
    Teardown,
}

/// Handle passed to the collector with every batch.
#[derive(Debug)]
pub enum Acknowledger {
    /// The client was already answered; completion is not reported.
    Detached,
    /// Completion is forwarded to the connection's correlator.
    Correlated(CorrelatedAck),
}

/// Plain data needed to report one batch's completion.
#[derive(Debug)]
pub struct CorrelatedAck {
    sender: Sender<AckEvent>,
    frame_type: FrameType,
    req_guid: String,
    submitted_at: Instant,
}

impl Acknowledger {
    /// Builds a correlated acknowledger.
    #[must_use]
    pub const fn correlated(
        sender: Sender<AckEvent>,
        frame_type: FrameType,
        req_guid: String,
        submitted_at: Instant,
    ) -> Self {
        Self::Correlated(CorrelatedAck {
            sender,
            frame_type,
            req_guid,
            submitted_at,
        })
    }

    /// Reports the batch outcome. Reports for closed connections are dropped.
    pub fn ack(self, outcome: Result<(), CollectError>) {
        let Self::Correlated(ack) = self else {
            return;
        };
        let info = AckInfo {
            frame_type: ack.frame_type,
            req_guid: ack.req_guid,
            outcome,
            submitted_at: ack.submitted_at,
        };
        if ack.sender.send(AckEvent::Ack(info)).is_err() {
            debug!(
                target: GATEWAY_TARGET,
                "acknowledgement dropped: connection already closed"
            );
        }
    }
}

/// Per-connection thread writing synchronous acknowledgements.
pub struct AckCorrelator {
    handle: Option<thread::JoinHandle<()>>,
}

impl AckCorrelator {
    /// Starts draining `events` for the connection.
    ///
    /// `replays` is the table holding the connection's seen request ids when
    /// deduplication is enabled.
    ///
    /// # Errors
    ///
    /// Returns the spawn failure when the thread cannot be created.
    pub fn spawn<S: FrameSocket>(
        socket: Arc<S>,
        codecs: CodecRegistry,
        metrics: Arc<dyn GatewayMetrics>,
        identifier: Identifier,
        replays: Option<Arc<ConnectionTable>>,
        events: Receiver<AckEvent>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name("eventgate-ack".to_owned())
            .spawn(move || {
                for event in events {
                    let AckEvent::Ack(info) = event else {
                        break;
                    };
                    if info.outcome.is_err()
                        && let Some(table) = &replays
                    {
                        table.remove_event(&identifier, &info.req_guid);
                    }
                    deliver(socket.as_ref(), &codecs, metrics.as_ref(), &identifier, info);
                }
                debug!(
                    target: GATEWAY_TARGET,
                    connection = %identifier,
                    "ack correlator stopped"
                );
            })?;
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Waits for the thread to exit.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!(target: GATEWAY_TARGET, "ack correlator panicked");
        }
    }
}

fn deliver(
    socket: &dyn FrameSocket,
    codecs: &CodecRegistry,
    metrics: &dyn GatewayMetrics,
    identifier: &Identifier,
    info: AckInfo,
) {
    metrics.ack_round_trip(info.submitted_at.elapsed());
    let response = match &info.outcome {
        Ok(()) => SendEventResponse::success(&info.req_guid),
        Err(error) => {
            warn!(
                target: GATEWAY_TARGET,
                connection = %identifier,
                req_guid = %info.req_guid,
                error = %error,
                "batch delivery failed"
            );
            SendEventResponse::internal_error(&info.req_guid, error)
        }
    };
    if let Err(error) = write_response(socket, codecs, info.frame_type, &response) {
        debug!(
            target: GATEWAY_TARGET,
            connection = %identifier,
            error = %error,
            "failed to write acknowledgement"
        );
    }
}
