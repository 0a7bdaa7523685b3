//! Rooms synthesized from group traffic.

use serde::{Deserialize, Serialize};

use crate::qq_id::GroupId;

/// A group the bot has seen traffic from.
///
/// QQ reports no standalone room objects to the adapter; a record is
/// (re)written each time a group or discuss message names its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    /// Group identifier.
    pub id: GroupId,
    /// Group name at the time of the last message.
    pub topic: String,
}

impl RoomRecord {
    /// Creates a room record.
    pub fn new(id: GroupId, topic: impl Into<String>) -> Self {
        Self {
            id,
            topic: topic.into(),
        }
    }
}
