//! In-memory protocol client for tests.

use std::collections::HashSet;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use parking_lot::Mutex;

use crate::client::{
    BoxedClient, ClientError, ClientEvent, ClientFactory, ClientOptions, ClientResult,
    ProtocolClient,
};

/// A recorded client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login,
    Terminate,
    SendPrivate(u64, String),
    SendGroup(u64, String),
}

pub struct MockClient {
    uin: NonZeroU64,
    tx: mpsc::UnboundedSender<ClientEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<ClientEvent>>>,
    calls: Mutex<Vec<Call>>,
    login_error: Mutex<Option<ClientError>>,
    hold_logins: AtomicBool,
    joined_groups: Mutex<HashSet<u64>>,
}

impl MockClient {
    pub fn new(uin: u64) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded();
        Arc::new(Self {
            uin: NonZeroU64::new(uin).expect("mock uin must be non-zero"),
            tx,
            rx: Mutex::new(Some(rx)),
            calls: Mutex::new(Vec::new()),
            login_error: Mutex::new(None),
            hold_logins: AtomicBool::new(false),
            joined_groups: Mutex::new(HashSet::new()),
        })
    }

    /// Delivers an event on the client's event stream.
    pub fn push(&self, event: ClientEvent) {
        self.tx
            .unbounded_send(event)
            .expect("mock event stream closed");
    }

    /// Makes every following `login()` fail with `err`.
    pub fn fail_login(&self, err: ClientError) {
        *self.login_error.lock() = Some(err);
    }

    /// Makes every following `login()` stay pending forever.
    pub fn hold_logins(&self) {
        self.hold_logins.store(true, Ordering::SeqCst);
    }

    pub fn join_group(&self, group_id: u64) {
        self.joined_groups.lock().insert(group_id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn login_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| **c == Call::Login)
            .count()
    }

    pub fn terminated(&self) -> bool {
        self.calls.lock().contains(&Call::Terminate)
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl ProtocolClient for MockClient {
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
        self.record(Call::Login);
        if self.hold_logins.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        match self.login_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn terminate(&self) -> ClientResult<()> {
        self.record(Call::Terminate);
        self.tx.close_channel();
        Ok(())
    }

    async fn send_private_msg(&self, user_id: u64, text: &str) -> ClientResult<String> {
        self.record(Call::SendPrivate(user_id, text.to_string()));
        Ok(format!("private-{user_id}"))
    }

    async fn send_group_msg(&self, group_id: u64, text: &str) -> ClientResult<String> {
        self.record(Call::SendGroup(group_id, text.to_string()));
        Ok(format!("group-{group_id}"))
    }

    fn is_group_joined(&self, group_id: u64) -> bool {
        self.joined_groups.lock().contains(&group_id)
    }
}

/// Factory handing out fresh [`MockClient`]s and remembering them.
#[derive(Clone, Default)]
pub struct MockFactory {
    clients: Arc<Mutex<Vec<Arc<MockClient>>>>,
    options: Arc<Mutex<Vec<ClientOptions>>>,
}

impl MockFactory {
    pub fn created(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn client(&self, index: usize) -> Arc<MockClient> {
        Arc::clone(&self.clients.lock()[index])
    }

    pub fn last(&self) -> Arc<MockClient> {
        let clients = self.clients.lock();
        Arc::clone(clients.last().expect("no client created yet"))
    }

    pub fn last_options(&self) -> Option<ClientOptions> {
        self.options.lock().last().cloned()
    }
}

impl ClientFactory for MockFactory {
    fn create(&self, account: NonZeroU64, options: &ClientOptions) -> BoxedClient {
        let client = MockClient::new(account.get());
        self.clients.lock().push(Arc::clone(&client));
        self.options.lock().push(options.clone());
        client
    }
}
