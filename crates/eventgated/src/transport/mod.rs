//! TCP listener for gateway connections.
//!
//! The listener binds the configured endpoint and accepts connections on a
//! background thread, handing each one to a [`ConnectionHandler`] on its own
//! thread.

mod errors;
mod handler;
mod listener;

pub use self::errors::ListenerError;
pub use self::handler::ConnectionHandler;
pub use self::listener::{GatewayListener, ListenerHandle};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
