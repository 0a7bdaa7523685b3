//! The puppet trait.
//!
//! A puppet drives one chat account on behalf of a host framework. The host
//! calls lifecycle hooks, queries raw payloads by id and has them parsed
//! into canonical payloads, and invokes outbound operations.
//!
//! # Capability Surface
//!
//! Only the lifecycle hooks, the raw-payload accessors/parsers and
//! [`Puppet::message_send_text`] are required. Every other operation has a
//! default body returning [`PuppetError::NotImplemented`], so a partial
//! puppet always reports "not supported" instead of a silent success.
//!
//! ```rust,ignore
//! let mut events = puppet.subscribe();
//! puppet.on_start().await?;
//! while let Ok(PuppetEvent::Message { message_id }) = events.recv().await {
//!     let raw = puppet.message_raw_payload(&message_id).await?;
//!     let payload = puppet.message_raw_payload_parser(raw).await?;
//!     println!("{}: {}", payload.from_id, payload.text);
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::{PuppetError, PuppetResult};
use crate::event::{EventEmitter, PuppetEvent};
use crate::payload::{
    ContactPayload, FileBox, FriendshipPayload, ImageType, MessagePayload, MiniProgramPayload,
    RoomInvitationPayload, RoomMemberPayload, RoomPayload, UrlLinkPayload,
};

macro_rules! unsupported {
    ($operation:literal) => {
        Err(PuppetError::not_implemented($operation))
    };
}

/// The core puppet trait.
#[async_trait]
pub trait Puppet: Send + Sync {
    /// Raw message record as cached by the puppet.
    type RawMessage: Send + Sync + 'static;
    /// Raw contact record as cached by the puppet.
    type RawContact: Send + Sync + 'static;
    /// Raw room record as cached by the puppet.
    type RawRoom: Send + Sync + 'static;

    /// Returns the puppet name (e.g., "oicq").
    fn name(&self) -> &'static str;

    /// Returns the puppet version.
    fn version(&self) -> &'static str;

    /// Returns the emitter events are broadcast on.
    fn emitter(&self) -> &EventEmitter;

    /// Subscribes to the puppet's events.
    fn subscribe(&self) -> broadcast::Receiver<PuppetEvent> {
        self.emitter().subscribe()
    }

    /// Returns the bot's own contact id once logged in.
    fn self_id(&self) -> Option<String>;

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Called when the host starts the puppet.
    async fn on_start(&self) -> PuppetResult<()>;

    /// Called when the host stops the puppet.
    ///
    /// Must succeed even if `on_start` never completed.
    async fn on_stop(&self) -> PuppetResult<()>;

    /// Liveness probe; answered with a [`PuppetEvent::Dong`].
    async fn ding(&self, data: Option<&str>) {
        self.emitter().emit(PuppetEvent::Dong {
            data: data.unwrap_or_default().to_string(),
        });
    }

    // =========================================================================
    // Raw Payloads
    // =========================================================================

    /// Looks up a cached raw message.
    async fn message_raw_payload(&self, message_id: &str) -> PuppetResult<Self::RawMessage>;

    /// Converts a raw message into the canonical payload.
    async fn message_raw_payload_parser(
        &self,
        raw: Self::RawMessage,
    ) -> PuppetResult<MessagePayload>;

    /// Looks up a cached raw contact.
    async fn contact_raw_payload(&self, contact_id: &str) -> PuppetResult<Self::RawContact>;

    /// Converts a raw contact into the canonical payload.
    async fn contact_raw_payload_parser(
        &self,
        raw: Self::RawContact,
    ) -> PuppetResult<ContactPayload>;

    /// Looks up a cached raw room.
    async fn room_raw_payload(&self, room_id: &str) -> PuppetResult<Self::RawRoom>;

    /// Converts a raw room into the canonical payload.
    async fn room_raw_payload_parser(&self, raw: Self::RawRoom) -> PuppetResult<RoomPayload>;

    // =========================================================================
    // Messages
    // =========================================================================

    /// Sends a text message, returning the new message id if known.
    async fn message_send_text(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> PuppetResult<Option<String>>;

    async fn message_send_contact(
        &self,
        _conversation_id: &str,
        _contact_id: &str,
    ) -> PuppetResult<Option<String>> {
        unsupported!("messageSendContact")
    }

    async fn message_send_file(
        &self,
        _conversation_id: &str,
        _file: &FileBox,
    ) -> PuppetResult<Option<String>> {
        unsupported!("messageSendFile")
    }

    async fn message_send_mini_program(
        &self,
        _conversation_id: &str,
        _mini_program: &MiniProgramPayload,
    ) -> PuppetResult<Option<String>> {
        unsupported!("messageSendMiniProgram")
    }

    async fn message_send_url(
        &self,
        _conversation_id: &str,
        _url_link: &UrlLinkPayload,
    ) -> PuppetResult<Option<String>> {
        unsupported!("messageSendUrl")
    }

    async fn message_forward(
        &self,
        _conversation_id: &str,
        _message_id: &str,
    ) -> PuppetResult<Option<String>> {
        unsupported!("messageForward")
    }

    async fn message_recall(&self, _message_id: &str) -> PuppetResult<bool> {
        unsupported!("messageRecall")
    }

    async fn message_contact(&self, _message_id: &str) -> PuppetResult<String> {
        unsupported!("messageContact")
    }

    async fn message_file(&self, _message_id: &str) -> PuppetResult<FileBox> {
        unsupported!("messageFile")
    }

    async fn message_image(
        &self,
        _message_id: &str,
        _image_type: ImageType,
    ) -> PuppetResult<FileBox> {
        unsupported!("messageImage")
    }

    async fn message_mini_program(&self, _message_id: &str) -> PuppetResult<MiniProgramPayload> {
        unsupported!("messageMiniProgram")
    }

    async fn message_url(&self, _message_id: &str) -> PuppetResult<UrlLinkPayload> {
        unsupported!("messageUrl")
    }

    async fn conversation_read_mark(
        &self,
        _conversation_id: &str,
        _has_read: bool,
    ) -> PuppetResult<()> {
        unsupported!("conversationReadMark")
    }

    // =========================================================================
    // Contacts
    // =========================================================================

    async fn contact_list(&self) -> PuppetResult<Vec<String>> {
        unsupported!("contactList")
    }

    async fn contact_alias(&self, _contact_id: &str) -> PuppetResult<String> {
        unsupported!("contactAlias")
    }

    async fn contact_set_alias(&self, _contact_id: &str, _alias: &str) -> PuppetResult<()> {
        unsupported!("contactAlias")
    }

    async fn contact_avatar(&self, _contact_id: &str) -> PuppetResult<FileBox> {
        unsupported!("contactAvatar")
    }

    async fn contact_set_avatar(&self, _contact_id: &str, _file: &FileBox) -> PuppetResult<()> {
        unsupported!("contactAvatar")
    }

    async fn contact_corporation_remark(
        &self,
        _contact_id: &str,
        _remark: Option<&str>,
    ) -> PuppetResult<()> {
        unsupported!("contactCorporationRemark")
    }

    async fn contact_phone(&self, _contact_id: &str, _phone_list: &[String]) -> PuppetResult<()> {
        unsupported!("contactPhone")
    }

    async fn contact_description(
        &self,
        _contact_id: &str,
        _description: &str,
    ) -> PuppetResult<()> {
        unsupported!("contactDescription")
    }

    async fn contact_self_name(&self, _name: &str) -> PuppetResult<()> {
        unsupported!("contactSelfName")
    }

    async fn contact_self_signature(&self, _signature: &str) -> PuppetResult<()> {
        unsupported!("contactSelfSignature")
    }

    async fn contact_self_qr_code(&self) -> PuppetResult<String> {
        unsupported!("contactSelfQRCode")
    }

    // =========================================================================
    // Friendships
    // =========================================================================

    async fn friendship_accept(&self, _friendship_id: &str) -> PuppetResult<()> {
        unsupported!("friendshipAccept")
    }

    async fn friendship_add(&self, _contact_id: &str, _hello: Option<&str>) -> PuppetResult<()> {
        unsupported!("friendshipAdd")
    }

    async fn friendship_search_phone(&self, _phone: &str) -> PuppetResult<Option<String>> {
        unsupported!("friendshipSearchPhone")
    }

    async fn friendship_search_weixin(&self, _weixin: &str) -> PuppetResult<Option<String>> {
        unsupported!("friendshipSearchWeixin")
    }

    async fn friendship_raw_payload(&self, _friendship_id: &str) -> PuppetResult<Value> {
        unsupported!("friendshipRawPayload")
    }

    async fn friendship_raw_payload_parser(&self, _raw: Value) -> PuppetResult<FriendshipPayload> {
        unsupported!("friendshipRawPayloadParser")
    }

    // =========================================================================
    // Tags
    // =========================================================================

    async fn tag_contact_add(&self, _tag_id: &str, _contact_id: &str) -> PuppetResult<()> {
        unsupported!("tagContactAdd")
    }

    async fn tag_contact_remove(&self, _tag_id: &str, _contact_id: &str) -> PuppetResult<()> {
        unsupported!("tagContactRemove")
    }

    async fn tag_contact_delete(&self, _tag_id: &str) -> PuppetResult<()> {
        unsupported!("tagContactDelete")
    }

    async fn tag_contact_list(&self, _contact_id: Option<&str>) -> PuppetResult<Vec<String>> {
        unsupported!("tagContactList")
    }

    // =========================================================================
    // Rooms
    // =========================================================================

    async fn room_list(&self) -> PuppetResult<Vec<String>> {
        unsupported!("roomList")
    }

    async fn room_member_list(&self, _room_id: &str) -> PuppetResult<Vec<String>> {
        unsupported!("roomMemberList")
    }

    async fn room_create(
        &self,
        _contact_ids: &[String],
        _topic: Option<&str>,
    ) -> PuppetResult<String> {
        unsupported!("roomCreate")
    }

    async fn room_add(&self, _room_id: &str, _contact_id: &str) -> PuppetResult<()> {
        unsupported!("roomAdd")
    }

    async fn room_del(&self, _room_id: &str, _contact_id: &str) -> PuppetResult<()> {
        unsupported!("roomDel")
    }

    async fn room_quit(&self, _room_id: &str) -> PuppetResult<()> {
        unsupported!("roomQuit")
    }

    async fn room_topic(&self, _room_id: &str) -> PuppetResult<String> {
        unsupported!("roomTopic")
    }

    async fn room_set_topic(&self, _room_id: &str, _topic: &str) -> PuppetResult<()> {
        unsupported!("roomTopic")
    }

    async fn room_announce(&self, _room_id: &str) -> PuppetResult<String> {
        unsupported!("roomAnnounce")
    }

    async fn room_set_announce(&self, _room_id: &str, _text: &str) -> PuppetResult<()> {
        unsupported!("roomAnnounce")
    }

    async fn room_avatar(&self, _room_id: &str) -> PuppetResult<FileBox> {
        unsupported!("roomAvatar")
    }

    async fn room_member_raw_payload(
        &self,
        _room_id: &str,
        _contact_id: &str,
    ) -> PuppetResult<Value> {
        unsupported!("roomMemberRawPayload")
    }

    async fn room_member_raw_payload_parser(
        &self,
        _raw: Value,
    ) -> PuppetResult<RoomMemberPayload> {
        unsupported!("roomMemberRawPayloadParser")
    }

    async fn room_qr_code(&self, _room_id: &str) -> PuppetResult<String> {
        unsupported!("roomQRCode")
    }

    async fn room_invitation_accept(&self, _invitation_id: &str) -> PuppetResult<()> {
        unsupported!("roomInvitationAccept")
    }

    async fn room_invitation_raw_payload(&self, _invitation_id: &str) -> PuppetResult<Value> {
        unsupported!("roomInvitationRawPayload")
    }

    async fn room_invitation_raw_payload_parser(
        &self,
        _raw: Value,
    ) -> PuppetResult<RoomInvitationPayload> {
        unsupported!("roomInvitationRawPayloadParser")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ContactGender, ContactType, MessageDestination, MessageType};

    /// Minimal puppet relying on every default.
    struct NullPuppet {
        emitter: EventEmitter,
    }

    #[async_trait]
    impl Puppet for NullPuppet {
        type RawMessage = String;
        type RawContact = String;
        type RawRoom = String;

        fn name(&self) -> &'static str {
            "null"
        }

        fn version(&self) -> &'static str {
            "0.0.0"
        }

        fn emitter(&self) -> &EventEmitter {
            &self.emitter
        }

        fn self_id(&self) -> Option<String> {
            None
        }

        async fn on_start(&self) -> PuppetResult<()> {
            Ok(())
        }

        async fn on_stop(&self) -> PuppetResult<()> {
            Ok(())
        }

        async fn message_raw_payload(&self, message_id: &str) -> PuppetResult<String> {
            Ok(message_id.to_string())
        }

        async fn message_raw_payload_parser(&self, raw: String) -> PuppetResult<MessagePayload> {
            Ok(MessagePayload {
                id: raw.clone(),
                from_id: "a".into(),
                text: raw,
                timestamp: 0,
                message_type: MessageType::Text,
                destination: MessageDestination::To("b".into()),
            })
        }

        async fn contact_raw_payload(&self, contact_id: &str) -> PuppetResult<String> {
            Ok(contact_id.to_string())
        }

        async fn contact_raw_payload_parser(&self, raw: String) -> PuppetResult<ContactPayload> {
            Ok(ContactPayload {
                id: raw.clone(),
                name: raw,
                gender: ContactGender::Unknown,
                avatar: String::new(),
                phone: Vec::new(),
                contact_type: ContactType::Individual,
                alias: None,
                friend: false,
            })
        }

        async fn room_raw_payload(&self, room_id: &str) -> PuppetResult<String> {
            Ok(room_id.to_string())
        }

        async fn room_raw_payload_parser(&self, raw: String) -> PuppetResult<RoomPayload> {
            Ok(RoomPayload {
                id: raw.clone(),
                topic: raw,
                member_id_list: Vec::new(),
                admin_id_list: Vec::new(),
            })
        }

        async fn message_send_text(&self, _: &str, _: &str) -> PuppetResult<Option<String>> {
            Ok(None)
        }
    }

    fn null_puppet() -> NullPuppet {
        NullPuppet {
            emitter: EventEmitter::new(4),
        }
    }

    #[tokio::test]
    async fn test_unsupported_operations_reject() {
        let puppet = null_puppet();

        let err = puppet.room_create(&[], Some("topic")).await.unwrap_err();
        assert_eq!(err, PuppetError::not_implemented("roomCreate"));

        assert!(puppet.contact_list().await.unwrap_err().is_not_implemented());
        assert!(puppet.room_list().await.unwrap_err().is_not_implemented());
        assert!(
            puppet
                .tag_contact_list(None)
                .await
                .unwrap_err()
                .is_not_implemented()
        );
        assert!(
            puppet
                .message_recall("1")
                .await
                .unwrap_err()
                .is_not_implemented()
        );
    }

    #[tokio::test]
    async fn test_attachment_and_payload_operations_reject() {
        let puppet = null_puppet();
        let file = FileBox {
            name: "a.txt".into(),
            url: "file:///tmp/a.txt".into(),
        };

        assert_eq!(
            puppet.message_send_file("qq_1", &file).await,
            Err(PuppetError::not_implemented("messageSendFile"))
        );
        assert_eq!(
            puppet
                .message_send_mini_program("qq_1", &MiniProgramPayload::default())
                .await,
            Err(PuppetError::not_implemented("messageSendMiniProgram"))
        );
        assert_eq!(
            puppet.message_image("m", ImageType::Hd).await,
            Err(PuppetError::not_implemented("messageImage"))
        );
        assert_eq!(
            puppet.contact_set_avatar("qq_1", &file).await,
            Err(PuppetError::not_implemented("contactAvatar"))
        );
        assert_eq!(
            puppet.friendship_search_weixin("wx").await,
            Err(PuppetError::not_implemented("friendshipSearchWeixin"))
        );
        assert_eq!(
            puppet.friendship_raw_payload_parser(Value::Null).await,
            Err(PuppetError::not_implemented("friendshipRawPayloadParser"))
        );
        assert_eq!(
            puppet.room_invitation_raw_payload("i").await,
            Err(PuppetError::not_implemented("roomInvitationRawPayload"))
        );
        assert_eq!(
            puppet.room_member_raw_payload("group_1", "qq_1").await,
            Err(PuppetError::not_implemented("roomMemberRawPayload"))
        );
        assert_eq!(
            puppet.room_set_announce("group_1", "notice").await,
            Err(PuppetError::not_implemented("roomAnnounce"))
        );

        for result in [
            puppet.message_file("m").await.err(),
            puppet.contact_avatar("qq_1").await.err(),
            puppet.room_avatar("group_1").await.err(),
        ] {
            assert!(result.is_some_and(|e| e.is_not_implemented()));
        }
        assert!(puppet.message_url("m").await.unwrap_err().is_not_implemented());
        assert!(
            puppet
                .message_mini_program("m")
                .await
                .unwrap_err()
                .is_not_implemented()
        );
        assert!(
            puppet
                .contact_corporation_remark("qq_1", None)
                .await
                .unwrap_err()
                .is_not_implemented()
        );
        assert!(
            puppet
                .room_member_raw_payload_parser(Value::Null)
                .await
                .unwrap_err()
                .is_not_implemented()
        );
        assert!(
            puppet
                .room_invitation_raw_payload_parser(Value::Null)
                .await
                .unwrap_err()
                .is_not_implemented()
        );
        assert!(
            puppet
                .friendship_raw_payload("f")
                .await
                .unwrap_err()
                .is_not_implemented()
        );
    }

    #[tokio::test]
    async fn test_default_ding_emits_dong() {
        let puppet = null_puppet();
        let mut events = puppet.subscribe();

        puppet.ding(Some("ping")).await;

        assert_eq!(
            events.recv().await.unwrap(),
            PuppetEvent::Dong {
                data: "ping".into()
            }
        );
    }
}
