//! Concurrent registry of live connections.
//!
//! The table enforces a global capacity and identifier uniqueness, keeps a
//! per-group count, and remembers the request ids each connection has sent so
//! replays can be detected. Entries and group counts change together inside a
//! single critical section, so the per-group counts always sum to the number
//! of entries.

mod error;

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::identifier::Identifier;

pub use self::error::RegistryError;

#[derive(Debug, Default)]
struct TableState {
    entries: HashMap<Identifier, HashSet<String>>,
    group_counts: HashMap<String, usize>,
}

/// Capacity-bounded table of registered connections.
#[derive(Debug)]
pub struct ConnectionTable {
    capacity: usize,
    state: Mutex<TableState>,
}

impl ConnectionTable {
    /// Creates an empty table that admits at most `capacity` connections.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(TableState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Registers `identifier` with an empty event set.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::MaxCapacity`] when the table is full and
    /// [`RegistryError::Duplicate`] when the identifier is already present.
    pub fn store(&self, identifier: &Identifier) -> Result<(), RegistryError> {
        let mut state = self.lock();
        if state.entries.len() >= self.capacity {
            return Err(RegistryError::MaxCapacity);
        }
        if state.entries.contains_key(identifier) {
            return Err(RegistryError::Duplicate);
        }
        state.entries.insert(identifier.clone(), HashSet::new());
        *state
            .group_counts
            .entry(identifier.group.clone())
            .or_default() += 1;
        Ok(())
    }

    /// Deregisters `identifier` and forgets its events. Removing an absent
    /// identifier does nothing.
    pub fn remove(&self, identifier: &Identifier) {
        let mut state = self.lock();
        if state.entries.remove(identifier).is_none() {
            return;
        }
        if let Some(count) = state.group_counts.get_mut(&identifier.group) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.group_counts.remove(&identifier.group);
            }
        }
    }

    /// Whether `identifier` is registered.
    #[must_use]
    pub fn exists(&self, identifier: &Identifier) -> bool {
        self.lock().entries.contains_key(identifier)
    }

    /// Records `token` for a registered connection; ignored otherwise.
    pub fn store_event(&self, identifier: &Identifier, token: &str) {
        if let Some(events) = self.lock().entries.get_mut(identifier) {
            events.insert(token.to_owned());
        }
    }

    /// Whether `token` was recorded for `identifier`.
    #[must_use]
    pub fn has_event(&self, identifier: &Identifier, token: &str) -> bool {
        self.lock()
            .entries
            .get(identifier)
            .is_some_and(|events| events.contains(token))
    }

    /// Forgets `token` for `identifier`, so a later batch carrying it is
    /// treated as new. Absent entries and tokens are ignored.
    pub fn remove_event(&self, identifier: &Identifier, token: &str) {
        if let Some(events) = self.lock().entries.get_mut(identifier) {
            events.remove(token);
        }
    }

    /// Snapshot of connection counts for every non-empty group.
    #[must_use]
    pub fn total_connection_per_group(&self) -> HashMap<String, usize> {
        self.lock().group_counts.clone()
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of connections.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
