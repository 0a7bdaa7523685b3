//! Recurring login retry while a QR code waits to be scanned.
//!
//! A QR code can expire without the client reporting anything. While the
//! session sits in `AwaitingScan` the probe re-issues `login()` on a fixed
//! interval so a fresh code is produced.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::BoxedClient;

/// Handle to a running login probe.
///
/// The probe stops when [`cancel`](Self::cancel) is called or the handle is
/// dropped, whichever comes first.
pub struct LoginProbe {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl LoginProbe {
    /// Spawns a probe calling `client.login()` every `period`.
    ///
    /// The first attempt fires one full period after spawning.
    pub fn spawn(client: BoxedClient, period: Duration) -> Self {
        let token = CancellationToken::new();
        let child = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = child.cancelled() => break,
                    _ = ticker.tick() => {
                        debug!(qq = %client.uin(), "Login probe firing");
                        if let Err(e) = client.login().await {
                            warn!(qq = %client.uin(), error = %e, "Login probe attempt failed");
                        }
                    }
                }
            }

            debug!(qq = %client.uin(), "Login probe stopped");
        });

        Self { token, task }
    }

    /// Stops the probe. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
        self.task.abort();
    }

    /// Returns `true` while the probe may still fire.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.task.is_finished()
    }
}

impl Drop for LoginProbe {
    fn drop(&mut self) {
        self.cancel();
    }
}
