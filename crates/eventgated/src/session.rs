//! Registration guard for an admitted connection.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::identifier::Identifier;
use crate::instrumentation::GatewayMetrics;
use crate::registry::ConnectionTable;

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// Keeps a connection registered until dropped.
///
/// Dropping the session removes the table entry, so deregistration happens
/// exactly once however the connection ends.
pub struct Session {
    identifier: Identifier,
    table: Arc<ConnectionTable>,
    metrics: Arc<dyn GatewayMetrics>,
    opened_at: Instant,
}

impl Session {
    /// Wraps an identifier that is already stored in `table`.
    #[must_use]
    pub fn open(
        identifier: Identifier,
        table: Arc<ConnectionTable>,
        metrics: Arc<dyn GatewayMetrics>,
    ) -> Self {
        Self {
            identifier,
            table,
            metrics,
            opened_at: Instant::now(),
        }
    }

    /// Connection identity.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Registry the connection lives in.
    #[must_use]
    pub const fn table(&self) -> &Arc<ConnectionTable> {
        &self.table
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.table.remove(&self.identifier);
        let duration = self.opened_at.elapsed();
        self.metrics
            .connection_closed(&self.identifier.group, duration);
        info!(
            target: SESSION_TARGET,
            connection = %self.identifier,
            duration_ms = duration.as_millis(),
            "connection closed"
        );
    }
}
