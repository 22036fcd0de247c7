//! [`FrameSocket`] over a `tungstenite` WebSocket.
//!
//! The WebSocket sits behind one mutex shared by the reader and every writer.
//! The reader waits for readability on a cloned handle without holding the
//! lock, then takes it only for a short drain read, so acknowledgements and
//! pings are never stalled behind an idle read.

use std::io;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;
use tungstenite::protocol::CloseFrame;
use tungstenite::{Message, WebSocket};

use eventgate_proto::FrameType;

use super::frame::{FrameSocket, Inbound, Outbound, ReadError, WriteError};
use super::GATEWAY_TARGET;

const DRAIN_TIMEOUT: Duration = Duration::from_millis(20);

/// Timing for a [`WsSocket`].
#[derive(Debug, Clone, Copy)]
pub struct SocketTimeouts {
    /// Longest a single `next_frame` call waits for data.
    pub poll_interval: Duration,
    /// Budget for one frame write.
    pub write_wait: Duration,
}

/// WebSocket connection with serialised writes.
pub struct WsSocket {
    inner: Mutex<WebSocket<TcpStream>>,
    watcher: TcpStream,
    poll_interval: Duration,
    buffered: AtomicBool,
}

impl WsSocket {
    /// Wraps an upgraded connection.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while cloning the stream handle or
    /// applying timeouts.
    pub fn new(socket: WebSocket<TcpStream>, timeouts: SocketTimeouts) -> io::Result<Self> {
        let watcher = socket.get_ref().try_clone()?;
        socket.get_ref().set_write_timeout(Some(timeouts.write_wait))?;
        Ok(Self {
            inner: Mutex::new(socket),
            watcher,
            poll_interval: timeouts.poll_interval,
            buffered: AtomicBool::new(false),
        })
    }

    fn lock(&self) -> MutexGuard<'_, WebSocket<TcpStream>> {
        self.inner
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Blocks until the transport has bytes or the poll interval passes.
    fn wait_readable(&self) -> Result<bool, ReadError> {
        self.watcher
            .set_read_timeout(Some(self.poll_interval))
            .map_err(tungstenite::Error::Io)?;
        let mut byte = [0_u8; 1];
        match self.watcher.peek(&mut byte) {
            Ok(_) => Ok(true),
            Err(error) if is_timeout(&error) => Ok(false),
            Err(error) => Err(tungstenite::Error::Io(error).into()),
        }
    }

    fn read_buffered(&self) -> Result<Inbound, ReadError> {
        let mut socket = self.lock();
        socket
            .get_ref()
            .set_read_timeout(Some(DRAIN_TIMEOUT))
            .map_err(tungstenite::Error::Io)?;
        match socket.read() {
            Ok(message) => {
                self.buffered.store(true, Ordering::Release);
                let inbound = classify(message)?;
                if inbound == Inbound::Control {
                    // Queued pong replies go out on the next flush.
                    socket.flush()?;
                }
                Ok(inbound)
            }
            Err(tungstenite::Error::Io(error)) if is_timeout(&error) => {
                self.buffered.store(false, Ordering::Release);
                Ok(Inbound::Idle)
            }
            Err(error) => Err(error.into()),
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn classify(message: Message) -> Result<Inbound, ReadError> {
    let frame_type = if message.is_text() {
        FrameType::Text
    } else {
        FrameType::Binary
    };
    match message {
        Message::Text(_) | Message::Binary(_) => Ok(Inbound::Data {
            frame_type,
            payload: message.into_data().to_vec(),
        }),
        Message::Pong(_) => Ok(Inbound::Pong),
        Message::Ping(_) | Message::Frame(_) => Ok(Inbound::Control),
        Message::Close(frame) => Err(closed(frame)),
    }
}

fn closed(close: Option<CloseFrame>) -> ReadError {
    match close {
        Some(frame) => ReadError::Closed {
            code: Some(u16::from(frame.code)),
            reason: frame.reason.to_string(),
        },
        None => ReadError::Closed {
            code: None,
            reason: String::new(),
        },
    }
}

impl FrameSocket for WsSocket {
    fn next_frame(&self) -> Result<Inbound, ReadError> {
        if !self.buffered.load(Ordering::Acquire) && !self.wait_readable()? {
            return Ok(Inbound::Idle);
        }
        self.read_buffered()
    }

    fn send_frame(&self, frame: Outbound) -> Result<(), WriteError> {
        let message = match frame {
            Outbound::Data {
                frame_type: FrameType::Text,
                payload,
            } => Message::text(String::from_utf8(payload).map_err(|_| WriteError::InvalidText)?),
            Outbound::Data {
                frame_type: FrameType::Binary,
                payload,
            } => Message::binary(payload),
            Outbound::Ping => Message::Ping(Vec::<u8>::new().into()),
        };
        self.lock().send(message)?;
        Ok(())
    }

    fn close(&self) {
        let mut socket = self.lock();
        if let Err(error) = socket.close(None).and_then(|()| socket.flush()) {
            debug!(
                target: GATEWAY_TARGET,
                error = %error,
                "close handshake not completed"
            );
        }
    }
}
