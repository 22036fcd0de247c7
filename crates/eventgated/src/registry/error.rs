//! Registration failures.

use thiserror::Error;

/// Reasons a connection cannot be registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The table already holds `capacity` connections.
    #[error("max connection reached")]
    MaxCapacity,
    /// The identifier is already registered.
    #[error("duplicate connection")]
    Duplicate,
}

impl RegistryError {
    /// Stable label used in metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxCapacity => "max_connection",
            Self::Duplicate => "duplicate",
        }
    }
}
