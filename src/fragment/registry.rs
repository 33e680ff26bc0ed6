//! Keyed collection of in-flight reassembly buffers.
//!
//! [`ReassemblyRegistry`] maps each [`MessageId`] to exactly one
//! [`ReassemblyBuffer`]. It never replaces an entry silently: callers look
//! up first and insert only when nothing is registered. Growth is bounded by
//! a crude overrun policy: once the registry holds `max_entries` buffers,
//! the next admission clears all of them.

use std::collections::{HashMap, hash_map::Entry};

use log::warn;

use super::{MessageId, ReassemblyBuffer, RegistryError};
use crate::metrics;

/// Buffers of messages currently being reassembled.
#[derive(Debug)]
pub struct ReassemblyRegistry {
    max_entries: usize,
    entries: HashMap<MessageId, ReassemblyBuffer>,
}

impl ReassemblyRegistry {
    /// Create an empty registry that holds at most `max_entries` buffers
    /// before the overrun policy fires.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            entries: HashMap::new(),
        }
    }

    /// Configured overrun threshold.
    #[must_use]
    pub const fn max_entries(&self) -> usize { self.max_entries }

    /// Borrow the buffer registered for `message_id`.
    #[must_use]
    pub fn find(&self, message_id: MessageId) -> Option<&ReassemblyBuffer> {
        self.entries.get(&message_id)
    }

    /// Mutably borrow the buffer registered for `message_id`.
    pub fn find_mut(&mut self, message_id: MessageId) -> Option<&mut ReassemblyBuffer> {
        self.entries.get_mut(&message_id)
    }

    /// Register a caller-initialised buffer under its message id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateEntry`] when a buffer for the same
    /// message is already registered; the existing entry is left untouched.
    pub fn insert(&mut self, buffer: ReassemblyBuffer) -> Result<&mut ReassemblyBuffer, RegistryError> {
        match self.entries.entry(buffer.message_id()) {
            Entry::Occupied(occupied) => Err(RegistryError::DuplicateEntry {
                message_id: *occupied.key(),
            }),
            Entry::Vacant(vacant) => Ok(vacant.insert(buffer)),
        }
    }

    /// Apply the overrun policy ahead of an insertion.
    ///
    /// When the registry already holds `max_entries` buffers every entry is
    /// dropped, not just the oldest. Returns the number of evicted buffers.
    pub fn enforce_capacity(&mut self) -> usize {
        if self.entries.len() < self.max_entries {
            return 0;
        }
        let evicted = self.entries.len();
        if evicted > 0 {
            warn!(
                "reassembly registry overrun: {evicted} in-flight messages evicted (limit {})",
                self.max_entries
            );
            metrics::inc_overruns();
        }
        self.entries.clear();
        evicted
    }

    /// Release the buffer for `message_id`. Returns `false` if none exists.
    pub fn delete(&mut self, message_id: MessageId) -> bool { self.entries.remove(&message_id).is_some() }

    /// Unregister the buffer for `message_id` and hand it to the caller.
    pub fn remove(&mut self, message_id: MessageId) -> Option<ReassemblyBuffer> {
        self.entries.remove(&message_id)
    }

    /// Release every buffer.
    pub fn clear(&mut self) { self.entries.clear(); }

    /// Number of registered buffers.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether no buffer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Identifiers of the registered messages, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = MessageId> + '_ { self.entries.keys().copied() }
}
