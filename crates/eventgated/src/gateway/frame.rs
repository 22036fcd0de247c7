//! Frame-level view of a client connection.

use std::io;
use std::time::Duration;

use thiserror::Error;

use eventgate_proto::{CodecError, FrameType};

use crate::instrumentation::ReadFailure;

/// Close codes treated as the peer going away.
const GRACEFUL_CLOSE_CODES: [u16; 4] = [1000, 1001, 1005, 1006];

/// One unit read from the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A text or binary data frame.
    Data {
        /// Frame kind the payload arrived on.
        frame_type: FrameType,
        /// Raw payload.
        payload: Vec<u8>,
    },
    /// A pong answering a server ping.
    Pong,
    /// Any other control frame; pings are answered by the socket.
    Control,
    /// Nothing arrived within the poll interval.
    Idle,
}

/// One unit written to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A text or binary data frame.
    Data {
        /// Frame kind to write.
        frame_type: FrameType,
        /// Encoded payload.
        payload: Vec<u8>,
    },
    /// A liveness ping.
    Ping,
}

/// Failure to read the next frame; always ends the connection.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The peer sent a close frame.
    #[error("connection closed by peer (code {code:?}): {reason}")]
    Closed {
        /// Close status, if the peer sent one.
        code: Option<u16>,
        /// Close reason text.
        reason: String,
    },
    /// No frame arrived within the liveness window.
    #[error("no frame received within {0:?}")]
    LivenessExpired(Duration),
    /// The transport reported an error.
    #[error("transport read failed: {0}")]
    Transport(Box<tungstenite::Error>),
}

impl From<tungstenite::Error> for ReadError {
    fn from(error: tungstenite::Error) -> Self {
        Self::Transport(Box::new(error))
    }
}

impl ReadError {
    /// Classifies the failure for logs and metrics.
    #[must_use]
    pub fn failure(&self) -> ReadFailure {
        match self {
            Self::Closed { code: None, .. } => ReadFailure::CloseError,
            Self::Closed {
                code: Some(code), ..
            } if GRACEFUL_CLOSE_CODES.contains(code) => ReadFailure::CloseError,
            Self::Closed { .. } | Self::LivenessExpired(_) => ReadFailure::Unknown,
            Self::Transport(error) => classify_transport(error),
        }
    }
}

fn classify_transport(error: &tungstenite::Error) -> ReadFailure {
    use tungstenite::error::ProtocolError;

    match error {
        tungstenite::Error::ConnectionClosed
        | tungstenite::Error::AlreadyClosed
        | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            ReadFailure::CloseError
        }
        tungstenite::Error::Io(io_error) => match io_error.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => ReadFailure::CloseError,
            _ => ReadFailure::Unknown,
        },
        _ => ReadFailure::Unknown,
    }
}

/// Failure to write a frame.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The response could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(#[from] CodecError),
    /// A text payload was not valid UTF-8.
    #[error("text payload is not valid UTF-8")]
    InvalidText,
    /// No codec is registered for the frame type.
    #[error("no codec registered for {0} frames")]
    UnknownFrameType(FrameType),
    /// The transport rejected the write.
    #[error("transport write failed: {0}")]
    Transport(Box<tungstenite::Error>),
}

impl From<tungstenite::Error> for WriteError {
    fn from(error: tungstenite::Error) -> Self {
        Self::Transport(Box::new(error))
    }
}

/// A framed, full-duplex client connection.
///
/// Reads happen on one thread; writes may come from several and are
/// serialised by the implementation, so frames never interleave.
pub trait FrameSocket: Send + Sync + 'static {
    /// Waits at most one poll interval for the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] when the connection can no longer be read.
    fn next_frame(&self) -> Result<Inbound, ReadError>;

    /// Writes one frame.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError`] when the frame cannot be written.
    fn send_frame(&self, frame: Outbound) -> Result<(), WriteError>;

    /// Starts the closing handshake and releases the transport. Errors are
    /// ignored.
    fn close(&self);
}
