//! Raw record to canonical payload conversion.
//!
//! The functions here are pure: they take a raw record (plus, for messages,
//! the receipt time) and never touch the entity cache.

use std::time::{SystemTime, UNIX_EPOCH};

use puppet_core::{
    ContactGender, ContactPayload, ContactType, MessageDestination, MessagePayload, MessageType,
    PuppetError, PuppetResult, RoomPayload,
};

use crate::model::{ContactRecord, MessageKind, MessageRecord, RoomRecord};
use crate::qq_id::{GroupId, UserId};

/// Placeholder reported for contact avatars.
pub const AVATAR_PLACEHOLDER: &str = "unknown";

/// Placeholder reported for contact phone numbers.
pub const PHONE_PLACEHOLDER: &str = "unknown";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Converts a raw message, stamping it with the current time.
pub fn to_canonical_message(raw: &MessageRecord) -> PuppetResult<MessagePayload> {
    to_canonical_message_at(raw, now_millis())
}

/// Converts a raw message, stamping it with `timestamp` (ms since epoch).
///
/// Private messages resolve to `toId` (the bot's own account), group and
/// discuss messages to `roomId`. A record that resolves to neither fails
/// with [`PuppetError::MissingDestination`].
pub fn to_canonical_message_at(
    raw: &MessageRecord,
    timestamp: u64,
) -> PuppetResult<MessagePayload> {
    let missing = || PuppetError::MissingDestination {
        message_id: raw.message_id.clone(),
    };

    let destination = match raw.message_type {
        MessageKind::Private => {
            let to = UserId::from_number(raw.self_id).ok_or_else(missing)?;
            MessageDestination::To(to.to_string())
        }
        MessageKind::Group | MessageKind::Discuss => {
            let (number, _) = raw.room_source().ok_or_else(missing)?;
            let room = GroupId::from_number(number).ok_or_else(missing)?;
            MessageDestination::Room(room.to_string())
        }
        MessageKind::Unknown => return Err(missing()),
    };

    let from = UserId::from_number(raw.sender.user_id)
        .ok_or_else(|| PuppetError::invalid_identifier(raw.sender.user_id.to_string()))?;

    Ok(MessagePayload {
        id: raw.message_id.clone(),
        from_id: from.to_string(),
        text: raw.raw_message.clone(),
        timestamp,
        message_type: MessageType::Text,
        destination,
    })
}

/// Maps a raw gender string onto [`ContactGender`].
pub fn parse_gender(sex: &str) -> PuppetResult<ContactGender> {
    match sex {
        "male" => Ok(ContactGender::Male),
        "female" => Ok(ContactGender::Female),
        "unknown" => Ok(ContactGender::Unknown),
        other => Err(PuppetError::UnknownEnumValue {
            field: "sex",
            value: other.to_string(),
        }),
    }
}

/// Converts a raw friend / sender record.
pub fn to_canonical_contact(raw: &ContactRecord) -> PuppetResult<ContactPayload> {
    let id = UserId::from_number(raw.user_id)
        .ok_or_else(|| PuppetError::invalid_identifier(raw.user_id.to_string()))?;

    Ok(ContactPayload {
        id: id.to_string(),
        name: raw.nickname.clone(),
        gender: parse_gender(&raw.sex)?,
        avatar: AVATAR_PLACEHOLDER.to_string(),
        phone: vec![PHONE_PLACEHOLDER.to_string()],
        contact_type: ContactType::Individual,
        alias: raw.remark.clone().filter(|r| !r.is_empty()),
        friend: true,
    })
}

/// Converts a synthesized room record. Member lists are always empty.
pub fn to_canonical_room(raw: &RoomRecord) -> RoomPayload {
    RoomPayload {
        id: raw.id.to_string(),
        topic: raw.topic.clone(),
        member_id_list: Vec::new(),
        admin_id_list: Vec::new(),
    }
}
