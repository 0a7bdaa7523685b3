//! Runtime orchestration: one puppet, its configuration and its event log.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use puppet_runtime::PuppetRuntime;
//!
//! // Loads puppet.toml from the current directory and PUPPET_* overrides
//! let runtime = PuppetRuntime::builder().build_oicq(my_client_factory)?;
//! runtime.run().await?;
//! ```
//!
//! While running, every [`PuppetEvent`] the puppet emits is logged; hosts
//! that need the events themselves subscribe via [`Puppet::subscribe`].

use std::future::Future;
use std::sync::Arc;

use puppet_core::{Puppet, PuppetEvent, PuppetResult};
use puppet_oicq::{ClientFactory, PuppetOicq};
use tokio::signal;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, PuppetConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// Background task logging the puppet's events.
struct EventLog {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl EventLog {
    fn spawn(mut events: broadcast::Receiver<PuppetEvent>) -> Self {
        let token = CancellationToken::new();
        let child = token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = child.cancelled() => break,
                    received = events.recv() => match received {
                        Ok(event) => log_event(&event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Event log lagging behind, events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        });

        Self { token, task }
    }

    async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            debug!(error = %e, "Event log task ended abnormally");
        }
    }
}

fn log_event(event: &PuppetEvent) {
    match event {
        PuppetEvent::Login { contact_id } => info!(contact_id = %contact_id, "Logged in"),
        PuppetEvent::Logout { contact_id, reason } => {
            info!(contact_id = %contact_id, reason = %reason, "Logged out");
        }
        PuppetEvent::Message { message_id } => debug!(message_id = %message_id, "Message received"),
        PuppetEvent::Dong { data } => debug!(data = %data, "Dong"),
        PuppetEvent::Error { message } => warn!(message = %message, "Puppet error"),
    }
}

/// Runs one puppet: logging, lifecycle and shutdown signals.
pub struct PuppetRuntime<P: Puppet + 'static> {
    config: PuppetConfig,
    puppet: Arc<P>,
    running: RwLock<bool>,
    event_log: Mutex<Option<EventLog>>,
}

impl PuppetRuntime<PuppetOicq> {
    /// Creates a runtime builder loading configuration from the default locations.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }
}

impl<P: Puppet + 'static> PuppetRuntime<P> {
    /// Creates a runtime, initializing logging from `config`.
    pub fn new(config: PuppetConfig, puppet: P) -> Self {
        logging::init_from_config(&config.logging);
        Self::with_logging_initialized(config, puppet)
    }

    fn with_logging_initialized(config: PuppetConfig, puppet: P) -> Self {
        info!(
            puppet = puppet.name(),
            version = puppet.version(),
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            puppet: Arc::new(puppet),
            running: RwLock::new(false),
            event_log: Mutex::new(None),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PuppetConfig {
        &self.config
    }

    /// Returns the puppet.
    pub fn puppet(&self) -> &Arc<P> {
        &self.puppet
    }

    /// Returns whether the puppet has been started and not yet stopped.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Starts the event log and the puppet.
    ///
    /// A start failure leaves the runtime stopped.
    pub async fn start(&self) -> RuntimeResult<()> {
        let mut running = self.running.write().await;
        if *running {
            warn!("Runtime is already running");
            return Ok(());
        }

        info!(puppet = self.puppet.name(), "Starting puppet runtime");
        *self.event_log.lock().await = Some(EventLog::spawn(self.puppet.subscribe()));

        if let Err(e) = self.puppet.on_start().await {
            error!(puppet = self.puppet.name(), error = %e, "Failed to start puppet");
            if let Some(log) = self.event_log.lock().await.take() {
                log.shutdown().await;
            }
            return Err(e.into());
        }

        *running = true;
        info!(puppet = self.puppet.name(), "Runtime started");
        Ok(())
    }

    /// Stops the puppet and the event log.
    pub async fn stop(&self) -> RuntimeResult<()> {
        let mut running = self.running.write().await;
        if !*running {
            debug!("Runtime is not running");
            return Ok(());
        }
        *running = false;

        info!(puppet = self.puppet.name(), "Stopping puppet runtime");
        let result = self.puppet.on_stop().await;
        if let Err(ref e) = result {
            error!(puppet = self.puppet.name(), error = %e, "Error during puppet shutdown");
        }

        if let Some(log) = self.event_log.lock().await.take() {
            log.shutdown().await;
        }

        info!("Runtime stopped");
        result.map_err(Into::into)
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.start().await?;
        info!("Puppet runtime is now running. Press Ctrl+C to stop.");
        wait_for_shutdown().await;
        self.stop().await
    }

    /// Runs until `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.stop().await
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder loading the configuration and constructing the puppet from it.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    /// Creates a builder searching the current directory.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Loads exactly this configuration file.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables `PUPPET_*` environment overrides.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges a programmatic configuration.
    pub fn merge(mut self, config: PuppetConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration without building anything.
    pub fn load(self) -> ConfigResult<PuppetConfig> {
        self.config_loader.load()
    }

    /// Loads the configuration, initializes logging, then builds the puppet with `make`.
    pub fn build<P, F>(self, make: F) -> RuntimeResult<PuppetRuntime<P>>
    where
        P: Puppet + 'static,
        F: FnOnce(&PuppetConfig) -> PuppetResult<P>,
    {
        let config = self.config_loader.load()?;
        logging::init_from_config(&config.logging);
        let puppet = make(&config)?;
        Ok(PuppetRuntime::with_logging_initialized(config, puppet))
    }

    /// Builds a runtime around a [`PuppetOicq`] configured from `[oicq]`.
    pub fn build_oicq(
        self,
        factory: impl ClientFactory + 'static,
    ) -> RuntimeResult<PuppetRuntime<PuppetOicq>> {
        self.build(|config| {
            PuppetOicq::builder()
                .config(config.oicq.clone())
                .client_factory(factory)
                .build()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use puppet_core::{
        ContactPayload, EventEmitter, MessagePayload, PuppetError, RoomPayload,
    };

    use super::*;

    #[derive(Default)]
    struct CountingPuppet {
        emitter: EventEmitter,
        starts: AtomicUsize,
        stops: AtomicUsize,
        fail_start: bool,
    }

    #[async_trait]
    impl Puppet for CountingPuppet {
        type RawMessage = ();
        type RawContact = ();
        type RawRoom = ();

        fn name(&self) -> &'static str {
            "counting"
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
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(PuppetError::NoActiveSession);
            }
            self.emitter.emit(PuppetEvent::Login {
                contact_id: "qq_1".to_string(),
            });
            Ok(())
        }

        async fn on_stop(&self) -> PuppetResult<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn message_raw_payload(&self, id: &str) -> PuppetResult<()> {
            Err(PuppetError::not_found(puppet_core::EntityKind::Message, id))
        }

        async fn message_raw_payload_parser(&self, _: ()) -> PuppetResult<MessagePayload> {
            Err(PuppetError::not_implemented("messageRawPayloadParser"))
        }

        async fn contact_raw_payload(&self, id: &str) -> PuppetResult<()> {
            Err(PuppetError::not_found(puppet_core::EntityKind::Contact, id))
        }

        async fn contact_raw_payload_parser(&self, _: ()) -> PuppetResult<ContactPayload> {
            Err(PuppetError::not_implemented("contactRawPayloadParser"))
        }

        async fn room_raw_payload(&self, id: &str) -> PuppetResult<()> {
            Err(PuppetError::not_found(puppet_core::EntityKind::Room, id))
        }

        async fn room_raw_payload_parser(&self, _: ()) -> PuppetResult<RoomPayload> {
            Err(PuppetError::not_implemented("roomRawPayloadParser"))
        }

        async fn message_send_text(&self, _: &str, _: &str) -> PuppetResult<Option<String>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let runtime = PuppetRuntime::new(PuppetConfig::default(), CountingPuppet::default());

        runtime.stop().await.unwrap();
        runtime.start().await.unwrap();
        runtime.start().await.unwrap();
        assert!(runtime.is_running().await);
        assert_eq!(runtime.puppet().starts.load(Ordering::SeqCst), 1);

        runtime.stop().await.unwrap();
        runtime.stop().await.unwrap();
        assert!(!runtime.is_running().await);
        assert_eq!(runtime.puppet().stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_start_leaves_runtime_stopped() {
        let puppet = CountingPuppet {
            fail_start: true,
            ..CountingPuppet::default()
        };
        let runtime = PuppetRuntime::new(PuppetConfig::default(), puppet);

        let err = runtime.start().await.unwrap_err();
        assert!(matches!(err, crate::RuntimeError::Puppet(PuppetError::NoActiveSession)));
        assert!(!runtime.is_running().await);
        assert!(runtime.event_log.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_run_until_stops_after_shutdown_future() {
        let runtime = PuppetRuntime::new(PuppetConfig::default(), CountingPuppet::default());
        runtime.run_until(async {}).await.unwrap();

        assert_eq!(runtime.puppet().starts.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.puppet().stops.load(Ordering::SeqCst), 1);
        assert!(!runtime.is_running().await);
    }

    #[test]
    fn test_builder_requires_account() {
        let result = RuntimeBuilder::new()
            .without_env()
            .merge(PuppetConfig::default())
            .build(|config| {
                config.oicq.resolve_account_from(|_| None)?;
                Ok(CountingPuppet::default())
            });
        assert!(matches!(
            result,
            Err(crate::RuntimeError::Puppet(PuppetError::Config(_)))
        ));
    }
}
