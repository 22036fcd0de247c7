//! Connection identity.

use std::fmt;

/// Names a logical client connection.
///
/// The pair is the natural key: the same id in two groups names two distinct
/// connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    /// Client id read from the upgrade request.
    pub id: String,
    /// Connection group read from the upgrade request.
    pub group: String,
}

impl Identifier {
    /// Builds an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[id={} group={}]", self.id, self.group)
    }
}
