//! WebSocket gateway: upgrade, read loop and acknowledgements.
//!
//! Each accepted connection is upgraded by [`Upgrader`], which registers its
//! [`Identifier`](crate::Identifier) before the handshake completes. The
//! [`Pipeline`] then owns the connection's read loop while an
//! [`AckCorrelator`] writes synchronous acknowledgements.

mod ack;
mod frame;
mod handler;
mod keepalive;
mod pipeline;
mod respond;
mod upgrade;
mod ws;

pub use self::ack::{AckCorrelator, AckEvent, AckInfo, Acknowledger, CorrelatedAck};
pub use self::frame::{FrameSocket, Inbound, Outbound, ReadError, WriteError};
pub use self::handler::GatewayConnectionHandler;
pub use self::pipeline::{Pipeline, PipelineSettings};
pub use self::upgrade::{Rejection, UpgradeError, UpgradeSettings, Upgraded, Upgrader};
pub use self::ws::{SocketTimeouts, WsSocket};

const GATEWAY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::gateway");
