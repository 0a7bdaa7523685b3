//! Canonical payload shapes handed to the host framework.
//!
//! Puppets cache protocol-specific raw records and convert them on demand
//! into these platform-neutral payloads. Field names serialize in camelCase.

use serde::{Deserialize, Serialize};

use crate::error::PuppetError;

// =============================================================================
// Message
// =============================================================================

/// Message content classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Content that could not be classified.
    #[default]
    Unknown,
    /// Plain text.
    Text,
    /// An image.
    Image,
    /// A voice clip.
    Audio,
    /// A video.
    Video,
    /// A file attachment.
    Attachment,
    /// A shared contact card.
    Contact,
    /// A shared link.
    Url,
}

/// Where a message was delivered: straight to a contact or into a room.
///
/// Flattened into [`MessagePayload`], so exactly one of `toId` / `roomId`
/// appears in the serialized form. Deserializing a payload with both or
/// neither fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageDestination {
    /// Direct message to a contact.
    #[serde(rename = "toId")]
    To(String),
    /// Message posted in a room.
    #[serde(rename = "roomId")]
    Room(String),
}

/// Framework-facing message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireMessagePayload")]
pub struct MessagePayload {
    /// Message id.
    pub id: String,
    /// Sender contact id.
    pub from_id: String,
    /// Textual content.
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Content classification.
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Direct recipient or room.
    #[serde(flatten)]
    pub destination: MessageDestination,
}

/// Serialized form of [`MessagePayload`] with both destination keys optional.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMessagePayload {
    id: String,
    from_id: String,
    text: String,
    timestamp: u64,
    #[serde(rename = "type")]
    message_type: MessageType,
    #[serde(default)]
    to_id: Option<String>,
    #[serde(default)]
    room_id: Option<String>,
}

impl TryFrom<WireMessagePayload> for MessagePayload {
    type Error = PuppetError;

    fn try_from(wire: WireMessagePayload) -> Result<Self, Self::Error> {
        let destination = match (wire.to_id, wire.room_id) {
            (Some(to), None) => MessageDestination::To(to),
            (None, Some(room)) => MessageDestination::Room(room),
            (Some(_), Some(_)) => {
                return Err(PuppetError::AmbiguousDestination { message_id: wire.id });
            }
            (None, None) => return Err(PuppetError::MissingDestination { message_id: wire.id }),
        };

        Ok(Self {
            id: wire.id,
            from_id: wire.from_id,
            text: wire.text,
            timestamp: wire.timestamp,
            message_type: wire.message_type,
            destination,
        })
    }
}

impl MessagePayload {
    /// Returns the direct recipient, if this is a direct message.
    pub fn to_id(&self) -> Option<&str> {
        match &self.destination {
            MessageDestination::To(id) => Some(id),
            MessageDestination::Room(_) => None,
        }
    }

    /// Returns the room id, if this message was posted in a room.
    pub fn room_id(&self) -> Option<&str> {
        match &self.destination {
            MessageDestination::Room(id) => Some(id),
            MessageDestination::To(_) => None,
        }
    }
}

// =============================================================================
// Contact
// =============================================================================

/// Contact gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContactGender {
    #[default]
    Unknown,
    Male,
    Female,
}

/// Contact classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    #[default]
    Unknown,
    /// A person.
    Individual,
    /// An official or service account.
    Official,
    /// A corporation account.
    Corporation,
}

/// Framework-facing contact payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    /// Contact id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Gender.
    pub gender: ContactGender,
    /// Avatar locator.
    pub avatar: String,
    /// Phone numbers.
    pub phone: Vec<String>,
    /// Contact classification.
    #[serde(rename = "type")]
    pub contact_type: ContactType,
    /// Alias set by the bot account, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Whether the contact is on the bot's friend list.
    #[serde(default)]
    pub friend: bool,
}

// =============================================================================
// Room
// =============================================================================

/// Framework-facing room payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    /// Room id.
    pub id: String,
    /// Room topic.
    pub topic: String,
    /// Known member ids.
    #[serde(default)]
    pub member_id_list: Vec<String>,
    /// Known admin ids.
    #[serde(default)]
    pub admin_id_list: Vec<String>,
}

// =============================================================================
// Attachments
// =============================================================================

/// A file by display name and locator (URL or local path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBox {
    /// File name shown to users.
    pub name: String,
    /// Where the content lives.
    pub url: String,
}

/// Image resolution requested from [`Puppet::message_image`](crate::Puppet::message_image).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    #[default]
    Unknown,
    Thumbnail,
    Hd,
    Artwork,
}

/// A shared link card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlLinkPayload {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// A shared mini program card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MiniProgramPayload {
    pub app_id: Option<String>,
    pub title: Option<String>,
    pub page_path: Option<String>,
    pub description: Option<String>,
    pub thumb_url: Option<String>,
    pub username: Option<String>,
}

// =============================================================================
// Friendships, invitations, members
// =============================================================================

/// A friend request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendshipPayload {
    pub id: String,
    pub contact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hello: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// An invitation to join a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInvitationPayload {
    pub id: String,
    pub inviter_id: String,
    pub topic: String,
    pub member_count: u32,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// A contact as seen inside one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMemberPayload {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inviter_id: Option<String>,
    pub avatar: String,
}
