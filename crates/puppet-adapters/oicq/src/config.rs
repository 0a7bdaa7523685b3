//! Configuration for the OICQ puppet.
//!
//! # Example Configuration
//!
//! ```yaml
//! oicq:
//!   qq: 123456789               # or WECHATY_PUPPET_OICQ_QQ=123456789
//!   login_probe_interval_secs: 15
//!   client_log_level: "off"
//!   suppress_qrcode_image: true
//!   ding_delay_ms: 1000
//! ```

use std::num::NonZeroU64;
use std::time::Duration;

use puppet_core::{PuppetError, PuppetResult};
use serde::{Deserialize, Serialize};

use crate::client::ClientOptions;

/// Environment variable consulted when `qq` is not configured.
pub const ACCOUNT_ENV: &str = "WECHATY_PUPPET_OICQ_QQ";

/// OICQ puppet configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OicqConfig {
    /// QQ account number to log into.
    pub qq: Option<u64>,

    /// Seconds between login retries while waiting for a QR scan.
    pub login_probe_interval_secs: u64,

    /// Log level handed to the protocol client library.
    pub client_log_level: String,

    /// Ask the protocol client not to write QR code image files.
    pub suppress_qrcode_image: bool,

    /// Delay before a `ding` is answered, in milliseconds.
    pub ding_delay_ms: u64,
}

impl Default for OicqConfig {
    fn default() -> Self {
        Self {
            qq: None,
            login_probe_interval_secs: 15,
            client_log_level: "off".to_string(),
            suppress_qrcode_image: true,
            ding_delay_ms: 1000,
        }
    }
}

impl OicqConfig {
    /// Creates a config for a fixed account with all other fields defaulted.
    pub fn with_account(qq: u64) -> Self {
        Self {
            qq: Some(qq),
            ..Self::default()
        }
    }

    /// Resolves the account number from `qq` or [`ACCOUNT_ENV`].
    pub fn resolve_account(&self) -> PuppetResult<NonZeroU64> {
        self.resolve_account_from(|key| std::env::var(key).ok())
    }

    /// Resolves the account number, reading the environment through `lookup`.
    pub fn resolve_account_from<F>(&self, lookup: F) -> PuppetResult<NonZeroU64>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if let Some(qq) = self.qq {
            return NonZeroU64::new(qq)
                .ok_or_else(|| PuppetError::config("qq account number must not be zero"));
        }

        match lookup(ACCOUNT_ENV) {
            Some(raw) => parse_account(&raw),
            None => Err(PuppetError::config(format!(
                "no qq account configured: set `oicq.qq` or {ACCOUNT_ENV}"
            ))),
        }
    }

    /// Returns the login probe period.
    pub fn login_probe_interval(&self) -> Duration {
        Duration::from_secs(self.login_probe_interval_secs)
    }

    /// Returns the `ding` answer delay.
    pub fn ding_delay(&self) -> Duration {
        Duration::from_millis(self.ding_delay_ms)
    }

    /// Builds the protocol client options.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            log_level: self.client_log_level.clone(),
            suppress_qrcode_image: self.suppress_qrcode_image,
        }
    }

    /// Checks values that deserialize fine but cannot work.
    pub fn validate(&self) -> PuppetResult<()> {
        if self.login_probe_interval_secs == 0 {
            return Err(PuppetError::config(
                "login_probe_interval_secs must be greater than zero",
            ));
        }
        if self.qq == Some(0) {
            return Err(PuppetError::config("qq account number must not be zero"));
        }
        Ok(())
    }
}

/// Parses a textual account number.
pub fn parse_account(raw: &str) -> PuppetResult<NonZeroU64> {
    let trimmed = raw.trim();
    trimmed
        .parse::<u64>()
        .ok()
        .and_then(NonZeroU64::new)
        .ok_or_else(|| PuppetError::config(format!("invalid qq account number {trimmed:?}")))
}
