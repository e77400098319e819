//! # Channel Registry
//!
//! Ordered list of the channels the session intends to be joined to,
//! plus the active-channel pointer that routes unaddressed outgoing
//! messages. Insertion order is preserved because the pointer is a
//! positional reference.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.5.0

use log::warn;

use crate::core::{ChannelConfig, RegistryError};

/// One joined or pending channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub password: String,
    /// Set once the server confirms the join.
    pub joined: bool,
}

/// The ordered channel collection with its active pointer.
///
/// Invariants: names are unique (case-insensitive), the sequence never
/// exceeds `capacity`, and `active` always indexes a valid entry while
/// the registry is non-empty.
#[derive(Debug)]
pub struct ChannelRegistry {
    entries: Vec<Channel>,
    active: usize,
    capacity: usize,
}

impl ChannelRegistry {
    pub fn new(capacity: usize) -> Self {
        ChannelRegistry {
            entries: Vec::new(),
            active: 0,
            capacity,
        }
    }

    /// Seed the registry from configuration. Capacity and duplicates are
    /// checked the same way as runtime adds.
    pub fn from_config(channels: &[ChannelConfig], capacity: usize) -> Result<Self, RegistryError> {
        let mut registry = Self::new(capacity);
        for channel in channels {
            registry.add(&channel.name, &channel.password)?;
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.name.clone()).collect()
    }

    /// Exact lookup, case-insensitive as channel names are on the wire.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Check the add preconditions without mutating, so a join can be
    /// attempted on the adapter before the entry is committed.
    pub fn ensure_can_add(&self, name: &str) -> Result<(), RegistryError> {
        if self.find(name).is_some() {
            return Err(RegistryError::DuplicateChannel(name.to_string()));
        }
        if self.entries.len() >= self.capacity {
            return Err(RegistryError::RegistryFull(self.capacity));
        }
        Ok(())
    }

    /// Append a channel. Returns its index.
    pub fn add(&mut self, name: &str, password: &str) -> Result<usize, RegistryError> {
        self.ensure_can_add(name)?;
        self.entries.push(Channel {
            name: name.to_string(),
            password: password.to_string(),
            joined: false,
        });
        Ok(self.entries.len() - 1)
    }

    /// Record a server join confirmation. Returns false for channels we
    /// never asked for.
    pub fn mark_joined(&mut self, name: &str) -> bool {
        match self.find(name) {
            Some(index) => {
                self.entries[index].joined = true;
                true
            }
            None => false,
        }
    }

    /// Forget all join confirmations, for a fresh connection attempt.
    pub fn clear_joined(&mut self) {
        for entry in &mut self.entries {
            entry.joined = false;
        }
    }

    /// Remove a channel by name, or the active one when `name` is None.
    ///
    /// The last remaining channel can never be removed. When the removed
    /// entry was the active one the pointer resets to index 0 (explicit
    /// policy); when an earlier entry goes the pointer shifts down so it
    /// keeps naming the same channel.
    pub fn remove(&mut self, name: Option<&str>) -> Result<Channel, RegistryError> {
        if self.entries.len() <= 1 {
            return Err(RegistryError::LastChannel);
        }
        let index = match name {
            Some(name) => self
                .find(name)
                .ok_or_else(|| RegistryError::ChannelNotFound(name.to_string()))?,
            None => self.active,
        };

        let removed = self.entries.remove(index);
        if index == self.active {
            self.active = 0;
        } else if index < self.active {
            self.active -= 1;
        }
        Ok(removed)
    }

    /// Make `name` the active channel and return its index.
    pub fn set_active(&mut self, name: &str) -> Result<usize, RegistryError> {
        let index = self
            .find(name)
            .ok_or_else(|| RegistryError::ChannelNotFound(name.to_string()))?;
        self.active = index;
        Ok(index)
    }

    pub fn set_active_index(&mut self, index: usize) {
        if index < self.entries.len() {
            self.active = index;
        }
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &Channel {
        &self.entries[self.active]
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.entries.get(index)
    }

    /// Resolve an inbound or user-supplied channel token to an index.
    ///
    /// Exact match first, then prefix match, both case-insensitive. On a
    /// miss the active channel is used with a warning; this fallback is a
    /// usability compromise, not a protocol requirement.
    pub fn resolve(&self, candidate: &str) -> usize {
        if let Some(index) = self.find(candidate) {
            return index;
        }
        let lowered = candidate.to_ascii_lowercase();
        if let Some(index) = self
            .entries
            .iter()
            .position(|c| c.name.to_ascii_lowercase().starts_with(&lowered))
        {
            return index;
        }
        warn!(
            "channel {candidate} not found, defaulting to {}",
            self.active().name
        );
        self.active
    }
}
