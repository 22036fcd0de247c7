//! Connection handler joining the upgrade to the read loop.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::transport::ConnectionHandler;

use super::GATEWAY_TARGET;
use super::pipeline::Pipeline;
use super::upgrade::{UpgradeError, Upgrader};
use super::ws::{SocketTimeouts, WsSocket};

const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upgrades each accepted stream and serves it on the calling thread.
pub struct GatewayConnectionHandler {
    upgrader: Upgrader,
    pipeline: Arc<Pipeline>,
    timeouts: SocketTimeouts,
}

impl GatewayConnectionHandler {
    /// Builds a handler. The socket poll interval never exceeds the ping
    /// interval, so pings are sent on time.
    #[must_use]
    pub fn new(
        upgrader: Upgrader,
        pipeline: Arc<Pipeline>,
        ping_interval: Duration,
        write_wait: Duration,
    ) -> Self {
        let poll_interval = ping_interval
            .min(MAX_POLL_INTERVAL)
            .max(Duration::from_millis(1));
        Self {
            upgrader,
            pipeline,
            timeouts: SocketTimeouts {
                poll_interval,
                write_wait,
            },
        }
    }
}

impl ConnectionHandler for GatewayConnectionHandler {
    fn handle(&self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        let upgraded = match self.upgrader.upgrade(stream) {
            Ok(upgraded) => upgraded,
            Err(UpgradeError::Rejected { status }) => {
                debug!(
                    target: GATEWAY_TARGET,
                    peer = ?peer,
                    status,
                    "upgrade rejected"
                );
                return;
            }
            Err(error) => {
                warn!(
                    target: GATEWAY_TARGET,
                    peer = ?peer,
                    error = %error,
                    "upgrade failed"
                );
                return;
            }
        };
        let socket = match WsSocket::new(upgraded.socket, self.timeouts) {
            Ok(socket) => Arc::new(socket),
            Err(error) => {
                warn!(
                    target: GATEWAY_TARGET,
                    connection = %upgraded.session.identifier(),
                    error = %error,
                    "failed to configure connection"
                );
                return;
            }
        };
        self.pipeline.run(socket, upgraded.session);
    }
}
