//! Echo Bot Example
//!
//! Drives a [`PuppetOicq`] against an in-process loopback client, so the whole
//! login → message → reply cycle runs without a QQ account:
//!
//! ```text
//! LoopbackClient ──ClientEvent──▶ PuppetOicq ──PuppetEvent──▶ echo task
//!       ▲                                                         │
//!       └──────────── send_private_msg / send_group_msg ◀─────────┘
//! ```
//!
//! # Commands
//!
//! - `/echo <text>`: replies with `<text>`
//! - `/ping`: replies with `Pong!`
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot
//! ```

use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use puppet::prelude::*;
use tokio::sync::broadcast;

const ACCOUNT: u64 = 10001;
const FRIEND: u64 = 20002;
const GROUP: u64 = 30003;

// ============================================================================
// Loopback Client
// ============================================================================

/// A protocol client that logs in immediately, replays a scripted chat and
/// delivers every sent message back as an inbound one.
struct LoopbackClient {
    uin: NonZeroU64,
    tx: mpsc::UnboundedSender<ClientEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<ClientEvent>>>,
    next_id: Mutex<u64>,
}

impl LoopbackClient {
    fn new(uin: NonZeroU64) -> Self {
        let (tx, rx) = mpsc::unbounded();
        Self {
            uin,
            tx,
            rx: Mutex::new(Some(rx)),
            next_id: Mutex::new(0),
        }
    }

    fn next_message_id(&self) -> String {
        let mut id = self.next_id.lock();
        *id += 1;
        format!("loopback-{id}")
    }

    fn deliver(&self, event: ClientEvent) -> ClientResult<()> {
        self.tx
            .unbounded_send(event)
            .map_err(|_| ClientError::NotConnected)
    }

    fn own_contact(&self) -> ContactRecord {
        ContactRecord::new(self.uin.get(), "echo-bot")
    }

    fn script(&self) -> Vec<ClientEvent> {
        let alice = ContactRecord::new(FRIEND, "alice").with_sex("female");
        let bob = ContactRecord::new(40004, "bob").with_sex("male");
        let self_id = self.uin.get();

        vec![
            ClientEvent::LoginQrCode,
            ClientEvent::Online {
                friends: vec![alice.clone().with_remark("Alice")],
            },
            ClientEvent::Message(MessageRecord::private(
                self.next_message_id(),
                self_id,
                alice,
                "/echo hello from a friend",
            )),
            ClientEvent::Message(MessageRecord::group(
                self.next_message_id(),
                self_id,
                GROUP,
                "puppet testers",
                bob,
                "/ping",
            )),
        ]
    }
}

#[async_trait]
impl ProtocolClient for LoopbackClient {
    fn uin(&self) -> NonZeroU64 {
        self.uin
    }

    fn events(&self) -> BoxStream<'static, ClientEvent> {
        match self.rx.lock().take() {
            Some(rx) => rx.boxed(),
            None => futures::stream::empty().boxed(),
        }
    }

    async fn login(&self) -> ClientResult<()> {
        for event in self.script() {
            self.deliver(event)?;
        }
        Ok(())
    }

    async fn terminate(&self) -> ClientResult<()> {
        self.tx.close_channel();
        Ok(())
    }

    async fn send_private_msg(&self, user_id: u64, text: &str) -> ClientResult<String> {
        let message_id = self.next_message_id();
        tracing::info!("[Private -> {}] {}", user_id, text);
        self.deliver(ClientEvent::Message(MessageRecord::private(
            message_id.clone(),
            user_id,
            self.own_contact(),
            text,
        )))?;
        Ok(message_id)
    }

    async fn send_group_msg(&self, group_id: u64, text: &str) -> ClientResult<String> {
        let message_id = self.next_message_id();
        tracing::info!("[Group {} <-] {}", group_id, text);
        self.deliver(ClientEvent::Message(MessageRecord::group(
            message_id.clone(),
            self.uin.get(),
            group_id,
            "puppet testers",
            self.own_contact(),
            text,
        )))?;
        Ok(message_id)
    }

    fn is_group_joined(&self, group_id: u64) -> bool {
        group_id == GROUP
    }
}

// ============================================================================
// Echo Task
// ============================================================================

/// Builds the reply for a command, if the text is one.
fn reply_for(text: &str) -> Option<String> {
    if let Some(content) = text.strip_prefix("/echo ") {
        return Some(content.to_string());
    }
    (text.trim() == "/ping").then(|| "Pong!".to_string())
}

/// Answers commands until `replies` messages have been handled.
async fn echo(
    puppet: Arc<PuppetOicq>,
    mut events: broadcast::Receiver<PuppetEvent>,
    replies: usize,
) {
    let mut handled = 0;
    while handled < replies {
        let message_id = match events.recv().await {
            Ok(PuppetEvent::Message { message_id }) => message_id,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let payload = match puppet.message_raw_payload(&message_id).await {
            Ok(raw) => puppet.message_raw_payload_parser(raw).await,
            Err(e) => Err(e),
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to load message {}: {}", message_id, e);
                continue;
            }
        };

        let conversation = match &payload.destination {
            MessageDestination::Room(room_id) => room_id.clone(),
            MessageDestination::To(_) => payload.from_id.clone(),
        };
        tracing::info!("[{}] {}: {}", conversation, payload.from_id, payload.text);
        if puppet.self_id().as_deref() == Some(payload.from_id.as_str()) {
            continue;
        }

        if let Some(reply) = reply_for(&payload.text) {
            if let Err(e) = puppet.message_send_text(&conversation, &reply).await {
                tracing::error!("Failed to send reply: {}", e);
            }
            handled += 1;
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = PuppetConfig {
        oicq: OicqConfig::with_account(ACCOUNT),
        ..PuppetConfig::default()
    };

    let factory = |account: NonZeroU64, _: &ClientOptions| -> BoxedClient {
        Arc::new(LoopbackClient::new(account))
    };
    let runtime = PuppetRuntime::builder().merge(config).build_oicq(factory)?;

    tracing::info!("puppet-oicq {}", puppet::oicq::VERSION);

    let puppet = runtime.puppet().clone();
    let events = puppet.subscribe();
    let bot = tokio::spawn(echo(puppet.clone(), events, 2));

    runtime
        .run_until(async move {
            if tokio::time::timeout(Duration::from_secs(5), bot).await.is_err() {
                tracing::warn!("Echo bot timed out");
            }
        })
        .await?;

    tracing::info!("Cached contacts: {:?}", puppet.cached_contact_ids());
    Ok(())
}
