//! In-memory stores backing the raw-payload accessors.
//!
//! Three independent maps, filled from inbound client events:
//!
//! | store    | key         | filled by                                    |
//! |----------|-------------|----------------------------------------------|
//! | messages | message id  | every inbound message                        |
//! | contacts | [`UserId`]  | first message of a sender, friend list import |
//! | rooms    | [`GroupId`] | every group / discuss message                |
//!
//! Nothing is ever evicted: the stores grow for the lifetime of the puppet.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use puppet_core::{EntityKind, PuppetError, PuppetResult};

use crate::model::{ContactRecord, MessageRecord, RoomRecord};
use crate::qq_id::{GroupId, UserId};

/// Entry counts of an [`EntityCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cached messages.
    pub messages: usize,
    /// Cached contacts.
    pub contacts: usize,
    /// Cached rooms.
    pub rooms: usize,
}

/// Message, contact and room stores of one puppet instance.
#[derive(Debug, Default)]
pub struct EntityCache {
    messages: HashMap<String, MessageRecord>,
    contacts: HashMap<UserId, ContactRecord>,
    rooms: HashMap<GroupId, RoomRecord>,
}

impl EntityCache {
    /// Creates empty stores.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Stores a message under its message id.
    pub fn put_message(&mut self, record: MessageRecord) {
        self.messages.insert(record.message_id.clone(), record);
    }

    /// Looks up a message.
    pub fn message(&self, message_id: &str) -> PuppetResult<&MessageRecord> {
        self.messages
            .get(message_id)
            .ok_or_else(|| PuppetError::not_found(EntityKind::Message, message_id))
    }

    /// Returns whether a message is cached.
    pub fn contains_message(&self, message_id: &str) -> bool {
        self.messages.contains_key(message_id)
    }

    // =========================================================================
    // Contacts
    // =========================================================================

    /// Stores a contact, replacing any previous record.
    pub fn put_contact(&mut self, id: UserId, record: ContactRecord) -> Option<ContactRecord> {
        self.contacts.insert(id, record)
    }

    /// Stores a contact only if none is cached yet; returns whether it was stored.
    pub fn put_contact_if_absent(&mut self, id: UserId, record: ContactRecord) -> bool {
        match self.contacts.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Looks up a contact.
    pub fn contact(&self, id: UserId) -> PuppetResult<&ContactRecord> {
        self.contacts
            .get(&id)
            .ok_or_else(|| PuppetError::not_found(EntityKind::Contact, id.to_string()))
    }

    /// Returns every cached contact id, or an empty list.
    pub fn contact_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<_> = self.contacts.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    // =========================================================================
    // Rooms
    // =========================================================================

    /// Stores a room, replacing any previous record.
    pub fn put_room(&mut self, record: RoomRecord) {
        self.rooms.insert(record.id, record);
    }

    /// Looks up a room.
    pub fn room(&self, id: GroupId) -> PuppetResult<&RoomRecord> {
        self.rooms
            .get(&id)
            .ok_or_else(|| PuppetError::not_found(EntityKind::Room, id.to_string()))
    }

    /// Returns whether a room is cached.
    pub fn contains_room(&self, id: GroupId) -> bool {
        self.rooms.contains_key(&id)
    }

    /// Returns every cached room id, or an empty list.
    pub fn room_ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<_> = self.rooms.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the entry count of each store.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            messages: self.messages.len(),
            contacts: self.contacts.len(),
            rooms: self.rooms.len(),
        }
    }
}
