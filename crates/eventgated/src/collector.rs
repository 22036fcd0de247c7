//! Downstream hand-off for decoded batches.
//!
//! The pipeline hands every batch to a [`Collector`] together with its
//! [`Acknowledger`]. The production collector is a bounded channel drained by
//! a [`WorkerPool`]; a full channel blocks the connection's read loop, which
//! is the gateway's backpressure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use eventgate_proto::SendEventRequest;

use crate::gateway::Acknowledger;
use crate::identifier::Identifier;

const COLLECTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::collector");
const WORKER_POLL: Duration = Duration::from_millis(100);

/// A decoded batch awaiting downstream processing.
#[derive(Debug)]
pub struct CollectRequest {
    /// Connection the batch arrived on.
    pub identifier: Identifier,
    /// When the batch was decoded.
    pub received_at: Instant,
    /// The batch itself.
    pub request: SendEventRequest,
    /// Completion handle.
    pub acknowledger: Acknowledger,
}

/// Downstream failure reported to the client in synchronous mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectError {
    /// The collector is no longer accepting batches.
    #[error("collector is closed")]
    Closed,
    /// The sink refused the batch.
    #[error("{message}")]
    Sink {
        /// Sink-provided description.
        message: String,
    },
}

/// Accepts decoded batches.
#[cfg_attr(test, mockall::automock)]
pub trait Collector: Send + Sync {
    /// Takes ownership of `request`; the collector must eventually call
    /// `request.acknowledger.ack`.
    fn collect(&self, request: CollectRequest);
}

/// Final destination of a batch.
pub trait EventSink: Send + Sync {
    /// Publishes one batch.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError`] when the batch cannot be published.
    fn publish(&self, identifier: &Identifier, request: &SendEventRequest)
    -> Result<(), CollectError>;
}

/// Sink that logs each batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn publish(
        &self,
        identifier: &Identifier,
        request: &SendEventRequest,
    ) -> Result<(), CollectError> {
        debug!(
            target: COLLECTOR_TARGET,
            connection = %identifier,
            req_guid = %request.req_guid,
            events = request.events.len(),
            bytes = request.events.iter().map(|event| event.event_bytes.len()).sum::<usize>(),
            "batch published"
        );
        Ok(())
    }
}

/// Collector that enqueues batches for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct ChannelCollector {
    sender: SyncSender<CollectRequest>,
}

impl Collector for ChannelCollector {
    fn collect(&self, request: CollectRequest) {
        if let Err(mpsc::SendError(rejected)) = self.sender.send(request) {
            warn!(
                target: COLLECTOR_TARGET,
                connection = %rejected.identifier,
                req_guid = %rejected.request.req_guid,
                "collector closed; batch dropped"
            );
            rejected.acknowledger.ack(Err(CollectError::Closed));
        }
    }
}

/// Threads publishing enqueued batches to an [`EventSink`].
pub struct WorkerPool {
    stop: Arc<AtomicBool>,
    workers: Vec<thread::JoinHandle<()>>,
    queue: Arc<Mutex<Receiver<CollectRequest>>>,
}

impl WorkerPool {
    /// Starts `size` workers over a channel holding at most `buffer` batches.
    ///
    /// # Errors
    ///
    /// Returns the spawn failure when a worker thread cannot be created.
    pub fn start(
        size: usize,
        buffer: usize,
        sink: Arc<dyn EventSink>,
    ) -> std::io::Result<(Self, ChannelCollector)> {
        let (sender, receiver) = mpsc::sync_channel(buffer);
        let queue = Arc::new(Mutex::new(receiver));
        let stop = Arc::new(AtomicBool::new(false));
        let mut pool = Self {
            stop: Arc::clone(&stop),
            workers: Vec::with_capacity(size),
            queue: Arc::clone(&queue),
        };
        for index in 0..size.max(1) {
            let worker_queue = Arc::clone(&queue);
            let worker_stop = Arc::clone(&stop);
            let worker_sink = Arc::clone(&sink);
            let worker = thread::Builder::new()
                .name(format!("eventgate-worker-{index}"))
                .spawn(move || run_worker(&worker_queue, &worker_stop, worker_sink.as_ref()))?;
            pool.workers.push(worker);
        }
        Ok((pool, ChannelCollector { sender }))
    }

    /// Drains queued batches, then stops every worker.
    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!(target: COLLECTOR_TARGET, "collector worker panicked");
            }
        }
        drop(self.queue);
        debug!(target: COLLECTOR_TARGET, "collector workers stopped");
    }
}

fn run_worker(queue: &Mutex<Receiver<CollectRequest>>, stop: &AtomicBool, sink: &dyn EventSink) {
    loop {
        let next = queue
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .recv_timeout(WORKER_POLL);
        match next {
            Ok(request) => {
                let outcome = sink.publish(&request.identifier, &request.request);
                if let Err(error) = &outcome {
                    warn!(
                        target: COLLECTOR_TARGET,
                        connection = %request.identifier,
                        req_guid = %request.request.req_guid,
                        error = %error,
                        "batch publish failed"
                    );
                }
                request.acknowledger.ack(outcome);
            }
            Err(RecvTimeoutError::Timeout) if !stop.load(Ordering::SeqCst) => {}
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
        }
    }
}
