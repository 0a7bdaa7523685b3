//! Raw inbound message events.
//!
//! ```text
//! MessageRecord { message_id, self_id, time, sender, raw_message }
//! ├── message_type = private   (destination: self_id)
//! ├── message_type = group     (destination: group_id,   name: group_name)
//! └── message_type = discuss   (destination: discuss_id, name: discuss_name)
//! ```
//!
//! `discuss` is QQ's deprecated multi-person chat; it is addressed exactly
//! like a group.

use serde::{Deserialize, Deserializer, Serialize};

use super::contact::ContactRecord;

/// Message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// One-to-one message.
    Private,
    /// Group message.
    Group,
    /// Legacy discuss-group message.
    Discuss,
    /// Any other discriminator.
    #[serde(other)]
    Unknown,
}

impl MessageKind {
    /// Returns `true` for kinds addressed to a room.
    pub fn is_room(&self) -> bool {
        matches!(self, Self::Group | Self::Discuss)
    }
}

/// Inbound message event as reported by the protocol client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Protocol-assigned message id (string or number on the wire).
    #[serde(deserialize_with = "string_or_number")]
    pub message_id: String,
    /// The bot's own account number.
    #[serde(default)]
    pub self_id: u64,
    /// Protocol timestamp (seconds); informational only.
    #[serde(default)]
    pub time: i64,
    /// Message type discriminator.
    pub message_type: MessageKind,
    /// Sub-type ("friend", "group", "normal", ...).
    #[serde(default)]
    pub sub_type: Option<String>,
    /// Sender information.
    pub sender: ContactRecord,
    /// Group number (group messages).
    #[serde(default)]
    pub group_id: Option<u64>,
    /// Group name (group messages).
    #[serde(default)]
    pub group_name: Option<String>,
    /// Discuss number (discuss messages).
    #[serde(default)]
    pub discuss_id: Option<u64>,
    /// Discuss name (discuss messages).
    #[serde(default)]
    pub discuss_name: Option<String>,
    /// Raw textual content.
    #[serde(default)]
    pub raw_message: String,
}

impl MessageRecord {
    /// Creates a private message addressed to `self_id`.
    pub fn private(
        message_id: impl Into<String>,
        self_id: u64,
        sender: ContactRecord,
        text: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            self_id,
            time: 0,
            message_type: MessageKind::Private,
            sub_type: Some("friend".to_string()),
            sender,
            group_id: None,
            group_name: None,
            discuss_id: None,
            discuss_name: None,
            raw_message: text.into(),
        }
    }

    /// Creates a group message.
    pub fn group(
        message_id: impl Into<String>,
        self_id: u64,
        group_id: u64,
        group_name: impl Into<String>,
        sender: ContactRecord,
        text: impl Into<String>,
    ) -> Self {
        Self {
            message_type: MessageKind::Group,
            sub_type: Some("normal".to_string()),
            group_id: Some(group_id),
            group_name: Some(group_name.into()),
            ..Self::private(message_id, self_id, sender, text)
        }
    }

    /// Creates a legacy discuss message.
    pub fn discuss(
        message_id: impl Into<String>,
        self_id: u64,
        discuss_id: u64,
        discuss_name: impl Into<String>,
        sender: ContactRecord,
        text: impl Into<String>,
    ) -> Self {
        Self {
            message_type: MessageKind::Discuss,
            sub_type: None,
            discuss_id: Some(discuss_id),
            discuss_name: Some(discuss_name.into()),
            ..Self::private(message_id, self_id, sender, text)
        }
    }

    /// Returns the room number and name this message names, if any.
    ///
    /// Discuss messages report their discuss id here.
    pub fn room_source(&self) -> Option<(u64, Option<&str>)> {
        match self.message_type {
            MessageKind::Group => self.group_id.map(|id| (id, self.group_name.as_deref())),
            MessageKind::Discuss => self
                .discuss_id
                .map(|id| (id, self.discuss_name.as_deref())),
            MessageKind::Private | MessageKind::Unknown => None,
        }
    }
}

/// Accepts a message id sent either as a string or as an integer.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Signed(n) => n.to_string(),
        RawId::Unsigned(n) => n.to_string(),
    })
}
