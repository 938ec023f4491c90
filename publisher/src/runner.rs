//! Periodic driver for publish cycles.
//!
//! The first cycle starts immediately, then one per period. Cycles run as
//! their own tasks, so a slow cycle does not hold back the next tick unless
//! overlap is disabled. Cancelling the token stops new cycles, aborts the
//! ones in flight and shuts the broker down within a bounded wait.

use config::PublisherConfig;
use notes_core::ShutdownStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::PublisherError;
use crate::publisher::Publisher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub period: Duration,
    pub shutdown_timeout: Duration,
    pub allow_overlap: bool,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(180),
            shutdown_timeout: Duration::from_secs(5),
            allow_overlap: true,
        }
    }
}

impl From<&PublisherConfig> for LoopSettings {
    fn from(config: &PublisherConfig) -> Self {
        Self {
            period: config.cycle_interval(),
            shutdown_timeout: config.shutdown_timeout(),
            allow_overlap: config.allow_overlap,
        }
    }
}

/// How the loop ended.
#[derive(Debug)]
pub struct LoopExit {
    pub cycles_started: u64,
    pub shutdown: Result<ShutdownStatus, PublisherError>,
}

pub struct PublishLoop {
    publisher: Arc<Publisher>,
    settings: LoopSettings,
}

impl PublishLoop {
    pub fn new(publisher: Arc<Publisher>, settings: LoopSettings) -> Self {
        Self {
            publisher,
            settings,
        }
    }

    /// Runs until `token` is cancelled. Consumes the loop, so it stops once.
    pub async fn run(self, token: CancellationToken) -> LoopExit {
        let mut ticker = interval(self.settings.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = JoinSet::new();
        let mut cycles_started = 0u64;

        info!(
            period_secs = self.settings.period.as_secs(),
            allow_overlap = self.settings.allow_overlap,
            "Publish loop started"
        );

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.settings.allow_overlap && !cycles.is_empty() {
                        debug!("Previous publish cycle still running, skipping tick");
                        continue;
                    }
                    let publisher = self.publisher.clone();
                    let cycle_token = token.child_token();
                    cycles_started += 1;
                    cycles.spawn(async move {
                        if let Err(e) = publisher.run_once(&cycle_token).await {
                            error!(error = %e, "Publish cycle failed");
                        }
                    });
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Publish cycle task panicked");
                    }
                }
            }
        }

        info!(in_flight = cycles.len(), "Shutting down publish loop");
        cycles.abort_all();
        while cycles.join_next().await.is_some() {}

        let shutdown = self.shutdown_broker().await;
        info!(cycles_started, "Publish loop stopped");
        LoopExit {
            cycles_started,
            shutdown,
        }
    }

    async fn shutdown_broker(&self) -> Result<ShutdownStatus, PublisherError> {
        let timeout = self.settings.shutdown_timeout;
        match tokio::time::timeout(timeout, self.publisher.sender().shutdown()).await {
            Ok(Ok(status)) => {
                debug!(?status, "Broker shut down");
                Ok(status)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Broker shutdown failed");
                Err(PublisherError::Shutdown(e))
            }
            Err(_) => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                error!(timeout_ms, "Broker shutdown timed out");
                Err(PublisherError::ShutdownTimedOut { timeout_ms })
            }
        }
    }
}
