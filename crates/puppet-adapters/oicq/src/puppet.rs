//! The OICQ puppet: session lifecycle, event handling and outbound sends.
//!
//! # Session States
//!
//! ```text
//!            on_start                LoginQrCode               Online
//! Stopped ─────────────► Starting ───────────────► AwaitingScan ───────► Online
//!    ▲                      ▲                                              │
//!    │                      └──────────────── Offline ─────────────────────┤
//!    └──────────────────────────────── on_stop ◄───────────────────────────┘
//! ```
//!
//! The adapter never drives these transitions on its own; it reacts to the
//! protocol client's [`ClientEvent`]s. All events of one client are handled
//! in order on a single pump task, which is also the only writer of the
//! entity cache.

use std::num::NonZeroU64;
use std::str::FromStr;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use parking_lot::{Mutex, RwLock};
use puppet_core::{
    ContactPayload, EventEmitter, MessagePayload, Puppet, PuppetError, PuppetEvent, PuppetResult,
    RoomPayload,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::cache::{CacheStats, EntityCache};
use crate::client::{BoxedClient, BoxedClientFactory, ClientEvent, ClientFactory};
use crate::config::OicqConfig;
use crate::model::{ContactRecord, MessageRecord, RoomRecord};
use crate::probe::LoginProbe;
use crate::qq_id::{ConversationId, GroupId, UserId, encode_user};
use crate::translate;

/// Version of this puppet.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Where the session stands in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No client exists.
    #[default]
    Stopped,
    /// A client exists and a login attempt is running.
    Starting,
    /// The client waits for a QR code scan; the login probe is running.
    AwaitingScan,
    /// Logged in.
    Online,
}

/// Per-start state. Replaced wholesale on every `on_start`.
#[derive(Default)]
struct Session {
    state: SessionState,
    /// Bumped on every start so events of an earlier client are ignored.
    generation: u64,
    client: Option<BoxedClient>,
    probe: Option<LoginProbe>,
    pump: Option<JoinHandle<()>>,
}

/// Resources taken out of a [`Session`] when it ends.
struct Teardown {
    client: Option<BoxedClient>,
    probe: Option<LoginProbe>,
    pump: Option<JoinHandle<()>>,
    was_online: bool,
}

impl Teardown {
    /// Stops the probe, then the pump, then terminates the client.
    async fn run(self) -> PuppetResult<()> {
        if let Some(probe) = self.probe {
            probe.cancel();
        }
        if let Some(pump) = self.pump {
            pump.abort();
        }
        match self.client {
            Some(client) => client.terminate().await.map_err(PuppetError::from),
            None => Ok(()),
        }
    }
}

struct Inner {
    config: OicqConfig,
    account: NonZeroU64,
    factory: BoxedClientFactory,
    emitter: EventEmitter,
    cache: RwLock<EntityCache>,
    session: Mutex<Session>,
}

impl Inner {
    fn self_contact_id(&self) -> String {
        encode_user(self.account).to_string()
    }

    /// Takes the session's resources and marks it stopped.
    ///
    /// With `generation` set, only a session of that generation is taken.
    fn take_session(&self, generation: Option<u64>) -> Option<Teardown> {
        let mut session = self.session.lock();
        if generation.is_some_and(|g| g != session.generation) {
            return None;
        }
        if session.state == SessionState::Stopped && session.client.is_none() {
            return None;
        }

        let was_online = session.state == SessionState::Online;
        session.state = SessionState::Stopped;
        Some(Teardown {
            client: session.client.take(),
            probe: session.probe.take(),
            pump: session.pump.take(),
            was_online,
        })
    }

    fn active_client(&self) -> PuppetResult<BoxedClient> {
        self.session
            .lock()
            .client
            .clone()
            .ok_or(PuppetError::NoActiveSession)
    }

    // =========================================================================
    // Event Handling
    // =========================================================================

    /// Drains one client's event stream.
    async fn pump(
        inner: Weak<Inner>,
        generation: u64,
        mut events: BoxStream<'static, ClientEvent>,
    ) {
        while let Some(event) = events.next().await {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.handle_client_event(generation, event).await;
        }
        debug!(generation, "Client event stream ended");
    }

    async fn handle_client_event(&self, generation: u64, event: ClientEvent) {
        let client = {
            let session = self.session.lock();
            match session.client.clone() {
                Some(client) if session.generation == generation => client,
                _ => {
                    debug!(event = event.name(), generation, "Ignoring event of a stale client");
                    return;
                }
            }
        };

        trace!(event = event.name(), "Client event");

        match event {
            ClientEvent::LoginQrCode => self.on_login_qrcode(generation, client),
            ClientEvent::LoginError { code, message } => {
                self.on_login_error(client, code, message);
            }
            ClientEvent::Online { friends } => self.on_online(generation, friends),
            ClientEvent::Message(record) => self.on_message(record),
            ClientEvent::Offline { reason } => self.on_offline(generation, reason),
        }
    }

    /// Runs `f` on the session if it still belongs to `generation`.
    ///
    /// `on_stop` may take the session between dispatch and a state write,
    /// so every write goes through here.
    fn with_live_session<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        let mut session = self.session.lock();
        if session.generation != generation || session.client.is_none() {
            debug!(generation, "Session ended while handling an event");
            return None;
        }
        Some(f(&mut session))
    }

    fn on_login_qrcode(&self, generation: u64, client: BoxedClient) {
        let period = self.config.login_probe_interval();
        self.with_live_session(generation, |session| match session.state {
            SessionState::Starting | SessionState::AwaitingScan => {
                session.state = SessionState::AwaitingScan;
                if session.probe.as_ref().is_some_and(LoginProbe::is_active) {
                    return;
                }
                info!(
                    qq = %self.account,
                    interval_secs = period.as_secs(),
                    "Waiting for QR code scan"
                );
                session.probe = Some(LoginProbe::spawn(client, period));
            }
            state => debug!(?state, "Ignoring QR code request"),
        });
    }

    /// Negative codes retry on a separate task; the pump never awaits a login.
    fn on_login_error(&self, client: BoxedClient, code: i32, message: String) {
        if code < 0 {
            warn!(qq = %self.account, code, message = %message, "Login error, retrying");
            let account = self.account;
            tokio::spawn(async move {
                if let Err(e) = client.login().await {
                    warn!(qq = %account, error = %e, "Login retry failed");
                }
            });
            return;
        }

        error!(qq = %self.account, code, message = %message, "Login failed");
        self.emitter.emit(PuppetEvent::Error {
            message: format!("login failed ({code}): {message}"),
        });
    }

    fn on_online(&self, generation: u64, friends: Vec<ContactRecord>) {
        let went_online = self.with_live_session(generation, |session| {
            if let Some(probe) = session.probe.take() {
                probe.cancel();
            }
            session.state = SessionState::Online;
        });
        if went_online.is_none() {
            return;
        }

        let imported = {
            let mut cache = self.cache.write();
            let mut imported = 0usize;
            for friend in friends {
                match UserId::from_number(friend.user_id) {
                    Some(id) => {
                        cache.put_contact(id, friend);
                        imported += 1;
                    }
                    None => warn!("Skipping friend with account number 0"),
                }
            }
            imported
        };

        let contact_id = self.self_contact_id();
        info!(qq = %self.account, friends = imported, "Logged in");
        self.emitter.emit(PuppetEvent::Login { contact_id });
    }

    fn on_message(&self, record: MessageRecord) {
        let message_id = record.message_id.clone();
        {
            let mut cache = self.cache.write();

            if let Some(sender) = UserId::from_number(record.sender.user_id) {
                cache.put_contact_if_absent(sender, record.sender.clone());
            }

            if let Some((number, name)) = record.room_source() {
                match (GroupId::from_number(number), name) {
                    (Some(room), Some(name)) => cache.put_room(RoomRecord::new(room, name)),
                    (Some(room), None) if cache.contains_room(room) => {
                        debug!(room = %room, "Room message without a name, keeping cached topic");
                    }
                    (Some(room), None) => {
                        warn!(room = %room, "Room message without a name, caching an empty topic");
                        cache.put_room(RoomRecord::new(room, ""));
                    }
                    (None, _) => warn!(message_id = %message_id, "Room message with group number 0"),
                }
            }

            if cache.contains_message(&message_id) {
                debug!(message_id = %message_id, "Message delivered again, replacing cached record");
            }
            cache.put_message(record);
        }

        debug!(message_id = %message_id, "Message cached");
        self.emitter.emit(PuppetEvent::Message { message_id });
    }

    fn on_offline(&self, generation: u64, reason: String) {
        let Some(was_online) = self.with_live_session(generation, |session| {
            if let Some(probe) = session.probe.take() {
                probe.cancel();
            }
            let was_online = session.state == SessionState::Online;
            session.state = SessionState::Starting;
            was_online
        }) else {
            return;
        };

        warn!(qq = %self.account, reason = %reason, "Client went offline");
        if was_online {
            self.emitter.emit(PuppetEvent::Logout {
                contact_id: self.self_contact_id(),
                reason: reason.clone(),
            });
        }
        self.emitter.emit(PuppetEvent::Error {
            message: format!("client offline: {reason}"),
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let session = self.session.get_mut();
        if let Some(probe) = session.probe.take() {
            probe.cancel();
        }
        if let Some(pump) = session.pump.take() {
            pump.abort();
        }
    }
}

// =============================================================================
// PuppetOicq
// =============================================================================

/// Puppet driving one QQ account through a [`ProtocolClient`](crate::ProtocolClient).
///
/// Cloning yields another handle to the same puppet.
#[derive(Clone)]
pub struct PuppetOicq {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PuppetOicq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PuppetOicq")
            .field("account", &self.inner.account)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PuppetOicq {
    /// Creates a puppet builder.
    pub fn builder() -> PuppetOicqBuilder {
        PuppetOicqBuilder::default()
    }

    /// Returns the configured account number.
    pub fn account(&self) -> NonZeroU64 {
        self.inner.account
    }

    /// Returns the configuration.
    pub fn config(&self) -> &OicqConfig {
        &self.inner.config
    }

    /// Returns the current session state.
    pub fn state(&self) -> SessionState {
        self.inner.session.lock().state
    }

    /// Returns `true` while the QR-scan login probe is running.
    pub fn login_probe_active(&self) -> bool {
        self.inner
            .session
            .lock()
            .probe
            .as_ref()
            .is_some_and(LoginProbe::is_active)
    }

    /// Returns the entry counts of the entity cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.read().stats()
    }

    /// Returns the ids of every cached contact.
    pub fn cached_contact_ids(&self) -> Vec<String> {
        self.inner
            .cache
            .read()
            .contact_ids()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Returns the ids of every room seen in group traffic.
    pub fn cached_room_ids(&self) -> Vec<String> {
        self.inner
            .cache
            .read()
            .room_ids()
            .into_iter()
            .map(String::from)
            .collect()
    }
}

#[async_trait]
impl Puppet for PuppetOicq {
    type RawMessage = MessageRecord;
    type RawContact = ContactRecord;
    type RawRoom = RoomRecord;

    fn name(&self) -> &'static str {
        "oicq"
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn emitter(&self) -> &EventEmitter {
        &self.inner.emitter
    }

    fn self_id(&self) -> Option<String> {
        (self.state() == SessionState::Online).then(|| self.inner.self_contact_id())
    }

    async fn on_start(&self) -> PuppetResult<()> {
        let inner = &self.inner;

        let (client, generation) = {
            let mut session = inner.session.lock();
            if session.state != SessionState::Stopped {
                warn!(qq = %inner.account, state = ?session.state, "Puppet already started");
                return Ok(());
            }

            let client = inner
                .factory
                .create(inner.account, &inner.config.client_options());
            session.generation += 1;
            let generation = session.generation;

            let events = client.events();
            session.pump = Some(tokio::spawn(Inner::pump(
                Arc::downgrade(inner),
                generation,
                events,
            )));
            session.client = Some(Arc::clone(&client));
            session.state = SessionState::Starting;
            (client, generation)
        };

        info!(qq = %inner.account, version = VERSION, "Starting puppet");

        if let Err(e) = client.login().await {
            error!(qq = %inner.account, error = %e, "Login failed to start");
            if let Some(teardown) = inner.take_session(Some(generation))
                && let Err(te) = teardown.run().await
            {
                warn!(error = %te, "Failed to terminate client after login error");
            }
            return Err(e.into());
        }

        Ok(())
    }

    async fn on_stop(&self) -> PuppetResult<()> {
        let Some(teardown) = self.inner.take_session(None) else {
            debug!(qq = %self.inner.account, "Puppet not running, nothing to stop");
            return Ok(());
        };

        let was_online = teardown.was_online;
        info!(qq = %self.inner.account, "Stopping puppet");
        let result = teardown.run().await;

        if was_online {
            self.inner.emitter.emit(PuppetEvent::Logout {
                contact_id: self.inner.self_contact_id(),
                reason: "stopped".to_string(),
            });
        }

        if let Err(ref e) = result {
            warn!(error = %e, "Client did not terminate cleanly");
        }
        result
    }

    async fn ding(&self, data: Option<&str>) {
        let emitter = self.inner.emitter.clone();
        let delay = self.inner.config.ding_delay();
        let data = data.unwrap_or_default().to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            emitter.emit(PuppetEvent::Dong { data });
        });
    }

    // =========================================================================
    // Raw Payloads
    // =========================================================================

    async fn message_raw_payload(&self, message_id: &str) -> PuppetResult<MessageRecord> {
        self.inner.cache.read().message(message_id).cloned()
    }

    async fn message_raw_payload_parser(&self, raw: MessageRecord) -> PuppetResult<MessagePayload> {
        translate::to_canonical_message(&raw)
    }

    async fn contact_raw_payload(&self, contact_id: &str) -> PuppetResult<ContactRecord> {
        let id = UserId::from_str(contact_id)?;
        self.inner.cache.read().contact(id).cloned()
    }

    async fn contact_raw_payload_parser(&self, raw: ContactRecord) -> PuppetResult<ContactPayload> {
        translate::to_canonical_contact(&raw)
    }

    async fn room_raw_payload(&self, room_id: &str) -> PuppetResult<RoomRecord> {
        let id = GroupId::from_str(room_id)?;
        self.inner.cache.read().room(id).cloned()
    }

    async fn room_raw_payload_parser(&self, raw: RoomRecord) -> PuppetResult<RoomPayload> {
        Ok(translate::to_canonical_room(&raw))
    }

    // =========================================================================
    // Messages
    // =========================================================================

    async fn message_send_text(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> PuppetResult<Option<String>> {
        let conversation = ConversationId::parse(conversation_id)?;
        let client = self.inner.active_client()?;

        let message_id = match conversation {
            ConversationId::Group(group) => {
                if !client.is_group_joined(group.get()) {
                    warn!(group = %group, "Sending to a group the account has not joined");
                }
                debug!(group = %group, "Sending group message");
                client.send_group_msg(group.get(), text).await?
            }
            ConversationId::User(user) => {
                debug!(user = %user, "Sending private message");
                client.send_private_msg(user.get(), text).await?
            }
        };

        Ok(Some(message_id).filter(|id| !id.is_empty()))
    }

    // =========================================================================
    // Rooms
    // =========================================================================

    async fn room_list(&self) -> PuppetResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn room_member_list(&self, _room_id: &str) -> PuppetResult<Vec<String>> {
        Ok(Vec::new())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`PuppetOicq`].
#[derive(Default)]
pub struct PuppetOicqBuilder {
    config: OicqConfig,
    factory: Option<BoxedClientFactory>,
    event_capacity: Option<usize>,
}

impl PuppetOicqBuilder {
    /// Sets the puppet configuration.
    pub fn config(mut self, config: OicqConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the account number, overriding the configuration.
    pub fn account(mut self, qq: u64) -> Self {
        self.config.qq = Some(qq);
        self
    }

    /// Sets the factory used to build a protocol client on every start.
    pub fn client_factory(mut self, factory: impl ClientFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Sets the event channel buffer size.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Validates the configuration, resolves the account and builds the puppet.
    pub fn build(self) -> PuppetResult<PuppetOicq> {
        self.config.validate()?;
        let account = self.config.resolve_account()?;
        let factory = self
            .factory
            .ok_or_else(|| PuppetError::config("no protocol client factory configured"))?;

        let emitter = match self.event_capacity {
            Some(capacity) => EventEmitter::new(capacity),
            None => EventEmitter::default(),
        };

        Ok(PuppetOicq {
            inner: Arc::new(Inner {
                config: self.config,
                account,
                factory,
                emitter,
                cache: RwLock::new(EntityCache::new()),
                session: Mutex::new(Session::default()),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use puppet_core::EntityKind;
    use tokio::sync::broadcast;

    use super::*;
    use crate::client::{ClientError, ProtocolClient};
    use crate::mock::{Call, MockFactory};

    const SELF_QQ: u64 = 10000;

    fn puppet(factory: &MockFactory) -> PuppetOicq {
        PuppetOicq::builder()
            .account(SELF_QQ)
            .client_factory(factory.clone())
            .build()
            .unwrap()
    }

    /// Lets the pump task drain pending events.
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    async fn next_event(rx: &mut broadcast::Receiver<PuppetEvent>) -> PuppetEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[test]
    fn test_build_requires_account_and_factory() {
        let err = PuppetOicq::builder()
            .client_factory(MockFactory::default())
            .config(OicqConfig::with_account(0))
            .build()
            .unwrap_err();
        assert!(matches!(err, PuppetError::Config(_)));

        let err = PuppetOicq::builder().account(1).build().unwrap_err();
        assert!(matches!(err, PuppetError::Config(_)));
    }

    #[tokio::test]
    async fn test_start_logs_in_with_configured_options() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);

        puppet.on_start().await.unwrap();
        assert_eq!(puppet.state(), SessionState::Starting);
        assert_eq!(factory.created(), 1);

        let client = factory.last();
        assert_eq!(client.uin().get(), SELF_QQ);
        assert_eq!(client.calls(), vec![Call::Login]);
        assert!(factory.last_options().unwrap().suppress_qrcode_image);

        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_text_routes_by_conversation_kind() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        puppet.on_start().await.unwrap();
        let client = factory.last();
        client.join_group(333);

        let id = puppet.message_send_text("group_333", "hi room").await.unwrap();
        assert_eq!(id.as_deref(), Some("group-333"));

        let id = puppet.message_send_text("qq_111", "hi you").await.unwrap();
        assert_eq!(id.as_deref(), Some("private-111"));

        let err = puppet.message_send_text("wxid_abc", "nope").await.unwrap_err();
        assert_eq!(
            err,
            PuppetError::InvalidConversationId {
                id: "wxid_abc".to_string()
            }
        );

        let err = puppet.message_send_text("qq_abc", "nope").await.unwrap_err();
        assert_eq!(err, PuppetError::invalid_identifier("qq_abc"));

        assert_eq!(
            client.calls(),
            vec![
                Call::Login,
                Call::SendGroup(333, "hi room".to_string()),
                Call::SendPrivate(111, "hi you".to_string()),
            ]
        );

        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_without_session_fails() {
        let puppet = puppet(&MockFactory::default());
        assert_eq!(
            puppet.message_send_text("qq_1", "x").await,
            Err(PuppetError::NoActiveSession)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_imports_friends_and_stops_probe() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        let mut events = puppet.subscribe();
        puppet.on_start().await.unwrap();
        let client = factory.last();

        client.push(ClientEvent::LoginQrCode);
        settle().await;
        assert_eq!(puppet.state(), SessionState::AwaitingScan);
        assert!(puppet.login_probe_active());

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(client.login_calls(), 2);

        client.push(ClientEvent::Online {
            friends: vec![
                ContactRecord::new(111, "alice"),
                ContactRecord::new(222, "bob").with_sex("male"),
            ],
        });

        assert_eq!(
            next_event(&mut events).await,
            PuppetEvent::Login {
                contact_id: "qq_10000".to_string()
            }
        );
        assert_eq!(puppet.state(), SessionState::Online);
        assert!(!puppet.login_probe_active());
        assert_eq!(puppet.self_id().as_deref(), Some("qq_10000"));
        assert_eq!(
            puppet.cached_contact_ids(),
            vec!["qq_111".to_string(), "qq_222".to_string()]
        );

        let raw = puppet.contact_raw_payload("qq_222").await.unwrap();
        assert_eq!(raw.nickname, "bob");

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(client.login_calls(), 2);

        puppet.on_stop().await.unwrap();
        assert_eq!(
            next_event(&mut events).await,
            PuppetEvent::Logout {
                contact_id: "qq_10000".to_string(),
                reason: "stopped".to_string()
            }
        );
        assert_eq!(puppet.self_id(), None);
    }

    #[tokio::test]
    async fn test_inbound_message_populates_caches() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        let mut events = puppet.subscribe();
        puppet.on_start().await.unwrap();
        let client = factory.last();

        client.push(ClientEvent::Message(MessageRecord::group(
            "m1",
            SELF_QQ,
            333,
            "rustaceans",
            ContactRecord::new(111, "alice"),
            "hello",
        )));

        assert_eq!(
            next_event(&mut events).await,
            PuppetEvent::Message {
                message_id: "m1".to_string()
            }
        );

        let raw = puppet.message_raw_payload("m1").await.unwrap();
        let payload = puppet.message_raw_payload_parser(raw).await.unwrap();
        assert_eq!(payload.from_id, "qq_111");
        assert_eq!(payload.room_id(), Some("group_333"));
        assert_eq!(payload.text, "hello");

        let room = puppet.room_raw_payload("group_333").await.unwrap();
        let room = puppet.room_raw_payload_parser(room).await.unwrap();
        assert_eq!(room.topic, "rustaceans");

        let contact = puppet.contact_raw_payload("qq_111").await.unwrap();
        let contact = puppet.contact_raw_payload_parser(contact).await.unwrap();
        assert_eq!(contact.name, "alice");

        assert_eq!(
            puppet.message_raw_payload("m2").await,
            Err(PuppetError::not_found(EntityKind::Message, "m2"))
        );
        assert_eq!(
            puppet.room_raw_payload("group_999").await,
            Err(PuppetError::not_found(EntityKind::Room, "group_999"))
        );
        assert_eq!(
            puppet.contact_raw_payload("group_333").await,
            Err(PuppetError::invalid_identifier("group_333"))
        );

        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_first_sender_record_is_kept() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        puppet.on_start().await.unwrap();
        let client = factory.last();

        client.push(ClientEvent::Message(MessageRecord::private(
            "a",
            SELF_QQ,
            ContactRecord::new(111, "first"),
            "1",
        )));
        client.push(ClientEvent::Message(MessageRecord::private(
            "b",
            SELF_QQ,
            ContactRecord::new(111, "second"),
            "2",
        )));
        settle().await;

        let raw = puppet.contact_raw_payload("qq_111").await.unwrap();
        assert_eq!(raw.nickname, "first");
        assert_eq!(puppet.cache_stats().messages, 2);

        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_start_then_start() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);

        puppet.on_stop().await.unwrap();
        assert_eq!(puppet.state(), SessionState::Stopped);

        puppet.on_start().await.unwrap();
        assert_eq!(puppet.state(), SessionState::Starting);
        puppet.on_stop().await.unwrap();
        assert!(factory.client(0).terminated());

        puppet.on_start().await.unwrap();
        assert_eq!(factory.created(), 2);
        assert!(!factory.client(1).terminated());
        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_while_awaiting_scan_cancels_probe() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        puppet.on_start().await.unwrap();
        let client = factory.last();

        client.push(ClientEvent::LoginQrCode);
        settle().await;
        assert!(puppet.login_probe_active());

        puppet.on_stop().await.unwrap();
        assert!(!puppet.login_probe_active());
        assert_eq!(puppet.state(), SessionState::Stopped);
        assert_eq!(client.calls().last(), Some(&Call::Terminate));
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_while_awaiting_scan_stops_login_retries() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        puppet.on_start().await.unwrap();
        let client = factory.last();

        client.push(ClientEvent::LoginQrCode);
        settle().await;
        assert!(puppet.login_probe_active());

        client.push(ClientEvent::Offline {
            reason: "net".to_string(),
        });
        settle().await;
        assert_eq!(puppet.state(), SessionState::Starting);
        assert!(!puppet.login_probe_active());

        tokio::time::sleep(Duration::from_secs(46)).await;
        assert_eq!(client.login_calls(), 1);

        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_events_racing_a_stop_leave_session_stopped() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        let mut events = puppet.subscribe();
        puppet.on_start().await.unwrap();
        let generation = puppet.inner.session.lock().generation;
        let client: BoxedClient = factory.last();

        // Stop lands after dispatch, before the handlers write the state.
        puppet.on_stop().await.unwrap();
        puppet.inner.on_login_qrcode(generation, client);
        puppet
            .inner
            .on_online(generation, vec![ContactRecord::new(111, "alice")]);
        puppet.inner.on_offline(generation, "net".to_string());

        assert_eq!(puppet.state(), SessionState::Stopped);
        assert!(!puppet.login_probe_active());
        assert!(puppet.cached_contact_ids().is_empty());
        assert!(events.try_recv().is_err());

        puppet.on_start().await.unwrap();
        assert_eq!(factory.created(), 2);
        let id = puppet.message_send_text("qq_1", "x").await.unwrap();
        assert_eq!(id.as_deref(), Some("private-1"));
        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_login_retry_does_not_block_events() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        let mut events = puppet.subscribe();
        puppet.on_start().await.unwrap();
        let client = factory.last();
        client.hold_logins();

        client.push(ClientEvent::LoginError {
            code: -1,
            message: "timeout".to_string(),
        });
        client.push(ClientEvent::Message(MessageRecord::private(
            "m1",
            SELF_QQ,
            ContactRecord::new(111, "alice"),
            "still here",
        )));

        assert_eq!(
            next_event(&mut events).await,
            PuppetEvent::Message {
                message_id: "m1".to_string()
            }
        );
        settle().await;
        assert_eq!(client.login_calls(), 2);

        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_unnamed_room_message_keeps_known_topic() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        puppet.on_start().await.unwrap();
        let client = factory.last();
        let alice = ContactRecord::new(111, "alice");

        client.push(ClientEvent::Message(MessageRecord::group(
            "m1",
            SELF_QQ,
            333,
            "rustaceans",
            alice.clone(),
            "named",
        )));
        let mut unnamed = MessageRecord::group("m2", SELF_QQ, 333, "", alice.clone(), "unnamed");
        unnamed.group_name = None;
        client.push(ClientEvent::Message(unnamed));
        let mut fresh = MessageRecord::group("m3", SELF_QQ, 444, "", alice, "fresh");
        fresh.group_name = None;
        client.push(ClientEvent::Message(fresh));
        settle().await;

        let room = puppet.room_raw_payload("group_333").await.unwrap();
        assert_eq!(room.topic, "rustaceans");
        let room = puppet.room_raw_payload("group_444").await.unwrap();
        assert!(room.topic.is_empty());
        assert_eq!(
            puppet.cached_room_ids(),
            vec!["group_333".to_string(), "group_444".to_string()]
        );

        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_negative_login_error_retries() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        let mut events = puppet.subscribe();
        puppet.on_start().await.unwrap();
        let client = factory.last();

        client.push(ClientEvent::LoginError {
            code: -2,
            message: "qrcode expired".to_string(),
        });
        settle().await;
        assert_eq!(client.login_calls(), 2);

        client.push(ClientEvent::LoginError {
            code: 45,
            message: "account frozen".to_string(),
        });
        assert_eq!(
            next_event(&mut events).await,
            PuppetEvent::Error {
                message: "login failed (45): account frozen".to_string()
            }
        );
        assert_eq!(client.login_calls(), 2);

        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_login_call_releases_client() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);

        let failing = MockFactory::default();
        let failing_puppet = PuppetOicq::builder()
            .account(SELF_QQ)
            .client_factory({
                let failing = failing.clone();
                move |account: NonZeroU64, options: &crate::ClientOptions| {
                    let client = failing.create(account, options);
                    failing.last().fail_login(ClientError::NotConnected);
                    client
                }
            })
            .build()
            .unwrap();

        let err = failing_puppet.on_start().await.unwrap_err();
        assert_eq!(err, PuppetError::Client("client is not connected".to_string()));
        assert_eq!(failing_puppet.state(), SessionState::Stopped);
        assert!(failing.last().terminated());

        puppet.on_start().await.unwrap();
        puppet.on_stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_offline_reports_error_and_restarts_flow() {
        let factory = MockFactory::default();
        let puppet = puppet(&factory);
        let mut events = puppet.subscribe();
        puppet.on_start().await.unwrap();
        let client = factory.last();

        client.push(ClientEvent::Online { friends: vec![] });
        next_event(&mut events).await;

        client.push(ClientEvent::Offline {
            reason: "network".to_string(),
        });
        assert_eq!(
            next_event(&mut events).await,
            PuppetEvent::Logout {
                contact_id: "qq_10000".to_string(),
                reason: "network".to_string()
            }
        );
        assert_eq!(
            next_event(&mut events).await,
            PuppetEvent::Error {
                message: "client offline: network".to_string()
            }
        );
        assert_eq!(puppet.state(), SessionState::Starting);

        puppet.on_stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ding_answers_after_delay() {
        let puppet = puppet(&MockFactory::default());
        let mut events = puppet.subscribe();

        puppet.ding(Some("ping")).await;
        assert!(events.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert_eq!(
            events.try_recv().unwrap(),
            PuppetEvent::Dong {
                data: "ping".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_room_listings_are_empty_and_rest_unsupported() {
        let puppet = puppet(&MockFactory::default());
        assert_eq!(puppet.room_list().await, Ok(Vec::new()));
        assert_eq!(puppet.room_member_list("group_1").await, Ok(Vec::new()));
        assert!(puppet.contact_list().await.unwrap_err().is_not_implemented());
        assert!(
            puppet
                .friendship_accept("f")
                .await
                .unwrap_err()
                .is_not_implemented()
        );
        assert_eq!(
            puppet.room_avatar("group_1").await,
            Err(PuppetError::not_implemented("roomAvatar"))
        );
        assert_eq!(
            puppet.friendship_search_weixin("wx").await,
            Err(PuppetError::not_implemented("friendshipSearchWeixin"))
        );
        assert_eq!(puppet.name(), "oicq");
        assert_eq!(puppet.version(), VERSION);
    }
}
