//! In-memory [`FrameSocket`] driven by the test.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use prost::Message as _;

use eventgate_proto::{FrameType, SendEventResponse};

use crate::gateway::{FrameSocket, Inbound, Outbound, ReadError, WriteError};

const POLL: Duration = Duration::from_millis(10);

/// Socket whose inbound frames are scripted and whose writes are captured.
pub struct ScriptedSocket {
    inbound: Mutex<Receiver<Result<Inbound, ReadError>>>,
    sent: Mutex<Vec<Outbound>>,
    sent_changed: Condvar,
    closed: AtomicBool,
}

/// Test-side handle feeding frames into a [`ScriptedSocket`].
pub struct SocketDriver {
    sender: Option<Sender<Result<Inbound, ReadError>>>,
}

impl ScriptedSocket {
    pub fn pair() -> (Arc<Self>, SocketDriver) {
        let (sender, receiver) = mpsc::channel();
        let socket = Arc::new(Self {
            inbound: Mutex::new(receiver),
            sent: Mutex::new(Vec::new()),
            sent_changed: Condvar::new(),
            closed: AtomicBool::new(false),
        });
        (
            socket,
            SocketDriver {
                sender: Some(sender),
            },
        )
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` data frames were written, then decodes
    /// every data frame written so far.
    pub fn wait_for_responses(
        &self,
        count: usize,
        timeout: Duration,
    ) -> Vec<(FrameType, SendEventResponse)> {
        let guard = self.sent.lock().expect("sent frames mutex poisoned");
        let (guard, _) = self
            .sent_changed
            .wait_timeout_while(guard, timeout, |sent| data_frames(sent) < count)
            .expect("sent frames mutex poisoned");
        guard.iter().filter_map(decode_response).collect()
    }

    /// Number of pings written so far.
    pub fn pings(&self) -> usize {
        self.sent
            .lock()
            .expect("sent frames mutex poisoned")
            .iter()
            .filter(|frame| matches!(frame, Outbound::Ping))
            .count()
    }
}

fn data_frames(sent: &[Outbound]) -> usize {
    sent.iter()
        .filter(|frame| matches!(frame, Outbound::Data { .. }))
        .count()
}

fn decode_response(frame: &Outbound) -> Option<(FrameType, SendEventResponse)> {
    let Outbound::Data {
        frame_type,
        payload,
    } = frame
    else {
        return None;
    };
    let response = match frame_type {
        FrameType::Text => serde_json::from_slice(payload).expect("decode JSON response"),
        FrameType::Binary => {
            SendEventResponse::decode(payload.as_slice()).expect("decode protobuf response")
        }
    };
    Some((*frame_type, response))
}

impl FrameSocket for ScriptedSocket {
    fn next_frame(&self) -> Result<Inbound, ReadError> {
        let inbound = self.inbound.lock().expect("inbound mutex poisoned");
        match inbound.recv_timeout(POLL) {
            Ok(item) => item,
            Err(RecvTimeoutError::Timeout) => Ok(Inbound::Idle),
            Err(RecvTimeoutError::Disconnected) => Err(ReadError::Closed {
                code: Some(1000),
                reason: "client went away".to_owned(),
            }),
        }
    }

    fn send_frame(&self, frame: Outbound) -> Result<(), WriteError> {
        if self.is_closed() {
            return Err(WriteError::from(tungstenite::Error::AlreadyClosed));
        }
        self.sent
            .lock()
            .expect("sent frames mutex poisoned")
            .push(frame);
        self.sent_changed.notify_all();
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl SocketDriver {
    pub fn send(&self, frame_type: FrameType, payload: Vec<u8>) {
        self.push(Ok(Inbound::Data {
            frame_type,
            payload,
        }));
    }

    pub fn push(&self, item: Result<Inbound, ReadError>) {
        if let Some(sender) = &self.sender {
            // The pipeline may already have stopped reading.
            let _ = sender.send(item);
        }
    }

    /// Simulates the peer closing the connection.
    pub fn disconnect(&mut self) {
        self.sender = None;
    }
}
