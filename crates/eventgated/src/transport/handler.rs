//! Connection handling abstraction for the listener.

use std::net::TcpStream;

/// Handles accepted connections.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves a single connection on the calling thread. Implementations
    /// should avoid panicking.
    fn handle(&self, stream: TcpStream);
}
