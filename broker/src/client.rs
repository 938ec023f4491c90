//! Broker client with lazy, single-flight bootstrap.
//!
//! Nothing is dialed until the first send or receive. The first caller dials
//! the control connection (with linear backoff), creates the topic, and only
//! then opens the writer or reader. Concurrent first callers wait on the same
//! attempt; a failed or cancelled attempt leaves nothing registered so the
//! next call starts over.
//!
//! Shutdown interrupts any bootstrap still in flight, so a connection opened
//! after shutdown began is closed again rather than registered.

use async_trait::async_trait;
use config::BrokerConfig;
use errors::BrokerError;
use notes_core::{
    LinearBackoff, Message, MessageReceiver, MessageSender, ShutdownStatus, retry_until_cancelled,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{OnceCell, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{
    BackendError, ReadRequest, StreamBackend, StreamConnection, TopicLayout, TopicStatus,
};
use crate::partition::{partition_for, stream_name, stream_names};

/// Runtime settings for a [`BrokerClient`].
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub topic: TopicLayout,
    pub consumer: String,
    pub send_timeout: Duration,
    pub read_block: Duration,
    pub backoff: LinearBackoff,
}

impl BrokerSettings {
    pub fn new(topic: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            topic: TopicLayout {
                name: topic.into(),
                partitions: 1,
                replication_factor: 1,
                group: group.into(),
            },
            consumer: "notes-publisher".to_string(),
            send_timeout: Duration::from_secs(5),
            read_block: Duration::from_secs(5),
            backoff: LinearBackoff::default(),
        }
    }

    /// Partition stream a message with `key` is appended to.
    pub fn stream_for(&self, key: &[u8]) -> String {
        stream_name(&self.topic.name, partition_for(key, self.topic.partitions))
    }

    fn read_request(&self) -> ReadRequest {
        ReadRequest {
            streams: stream_names(&self.topic.name, self.topic.partitions),
            group: self.topic.group.clone(),
            consumer: self.consumer.clone(),
            block: self.read_block,
        }
    }
}

impl From<&BrokerConfig> for BrokerSettings {
    fn from(config: &BrokerConfig) -> Self {
        Self {
            topic: TopicLayout {
                name: config.topic.clone(),
                partitions: config.partitions,
                replication_factor: config.replication_factor,
                group: config.group.clone(),
            },
            consumer: config.consumer.clone(),
            send_timeout: Duration::from_millis(config.send_timeout_ms),
            read_block: Duration::from_millis(config.read_block_ms),
            backoff: config.retry.backoff(),
        }
    }
}

pub struct BrokerClient<B: StreamBackend> {
    backend: B,
    settings: BrokerSettings,
    control: OnceCell<B::Connection>,
    writer: OnceCell<B::Connection>,
    reader: OnceCell<B::Connection>,
    closed: AtomicBool,
    closing: CancellationToken,
    // Held shared while a connection is acquired, exclusively by shutdown.
    gate: RwLock<()>,
}

impl<B: StreamBackend> BrokerClient<B> {
    pub fn new(backend: B, settings: BrokerSettings) -> Self {
        Self {
            backend,
            settings,
            control: OnceCell::new(),
            writer: OnceCell::new(),
            reader: OnceCell::new(),
            closed: AtomicBool::new(false),
            closing: CancellationToken::new(),
            gate: RwLock::new(()),
        }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.control.initialized()
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::Closed);
        }
        Ok(())
    }

    /// Dials one connection, retrying with linear backoff.
    async fn dial(&self, token: &CancellationToken) -> Result<B::Connection, BrokerError> {
        let backend = &self.backend;
        let attempt = move || async move {
            backend.dial().await.inspect_err(|e| {
                warn!(error = %e, "Broker dial failed, retrying");
            })
        };

        match retry_until_cancelled(token, self.settings.backoff, attempt, |_: &BackendError| true)
            .await
        {
            None => Err(BrokerError::Cancelled),
            Some(Err(e)) => Err(BrokerError::bootstrap(e)),
            Some(Ok(connection)) => Ok(connection),
        }
    }

    /// Control connection with the topic in place. Runs at most once
    /// successfully per client.
    async fn bootstrap(&self, token: &CancellationToken) -> Result<&B::Connection, BrokerError> {
        self.control
            .get_or_try_init(|| async {
                self.ensure_open()?;
                let connection = self.cancellable(token, self.dial(token)).await??;

                match self
                    .cancellable(token, connection.ensure_topic(&self.settings.topic))
                    .await
                {
                    Ok(Ok(TopicStatus::Created)) => {
                        info!(
                            topic = %self.settings.topic.name,
                            partitions = self.settings.topic.partitions,
                            "Broker topic created"
                        );
                    }
                    Ok(Ok(TopicStatus::AlreadyExists)) => {
                        debug!(topic = %self.settings.topic.name, "Broker topic already exists");
                    }
                    Ok(Err(e)) => {
                        let _ = connection.close().await;
                        return Err(BrokerError::bootstrap(e));
                    }
                    Err(interrupted) => {
                        let _ = connection.close().await;
                        return Err(interrupted);
                    }
                }
                Ok(connection)
            })
            .await
    }

    async fn writer(&self, token: &CancellationToken) -> Result<&B::Connection, BrokerError> {
        self.writer
            .get_or_try_init(|| async {
                self.bootstrap(token).await?;
                self.ensure_open()?;
                let connection = self.cancellable(token, self.dial(token)).await??;
                debug!(topic = %self.settings.topic.name, "Broker writer registered");
                Ok(connection)
            })
            .await
    }

    async fn reader(&self, token: &CancellationToken) -> Result<&B::Connection, BrokerError> {
        self.reader
            .get_or_try_init(|| async {
                self.bootstrap(token).await?;
                self.ensure_open()?;
                let connection = self.cancellable(token, self.dial(token)).await??;
                debug!(
                    topic = %self.settings.topic.name,
                    group = %self.settings.topic.group,
                    consumer = %self.settings.consumer,
                    "Broker reader registered"
                );
                Ok(connection)
            })
            .await
    }

    /// Races `future` against shutdown of the client and cancellation of
    /// `token`.
    async fn cancellable<T>(
        &self,
        token: &CancellationToken,
        future: impl Future<Output = T>,
    ) -> Result<T, BrokerError> {
        tokio::select! {
            biased;
            () = self.closing.cancelled() => Err(BrokerError::Closed),
            () = token.cancelled() => Err(BrokerError::Cancelled),
            output = future => Ok(output),
        }
    }
}

#[async_trait]
impl<B: StreamBackend> MessageSender for BrokerClient<B> {
    async fn send(&self, token: &CancellationToken, message: Message) -> Result<(), BrokerError> {
        let writer = {
            let _gate = self.gate.read().await;
            self.ensure_open()?;
            self.writer(token).await?
        };
        let stream = self.settings.stream_for(&message.key);
        let timeout = self.settings.send_timeout;

        match self
            .cancellable(token, tokio::time::timeout(timeout, writer.append(&stream, &message)))
            .await?
        {
            Err(_) => Err(BrokerError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Ok(Err(e)) => Err(BrokerError::Send {
                stream,
                reason: e.to_string(),
            }),
            Ok(Ok(())) => Ok(()),
        }
    }

    /// Closes every registered connection. Failures are collected rather than
    /// stopping at the first one.
    async fn shutdown(&self) -> Result<ShutdownStatus, BrokerError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(ShutdownStatus::AlreadyClosed);
        }
        self.closing.cancel();
        let _gate = self.gate.write().await;
        // Every in-flight acquisition has now either registered its
        // connection or closed it.

        let mut failures = Vec::new();
        for (name, cell) in [
            ("writer", &self.writer),
            ("reader", &self.reader),
            ("connection", &self.control),
        ] {
            if let Some(connection) = cell.get()
                && let Err(e) = connection.close().await
            {
                failures.push(format!("closing {name}: {e}"));
            }
        }

        if failures.is_empty() {
            info!(topic = %self.settings.topic.name, "Broker client closed");
            Ok(ShutdownStatus::Closed)
        } else {
            warn!(failures = failures.len(), "Broker client closed with errors");
            Err(BrokerError::Shutdown { failures })
        }
    }
}

#[async_trait]
impl<B: StreamBackend> MessageReceiver for BrokerClient<B> {
    async fn receive(&self, token: &CancellationToken) -> Result<Message, BrokerError> {
        let request = self.settings.read_request();
        loop {
            let reader = {
                let _gate = self.gate.read().await;
                self.ensure_open()?;
                self.reader(token).await?
            };
            match self.cancellable(token, reader.read(&request)).await? {
                Ok(Some(message)) => return Ok(message),
                Ok(None) => continue,
                Err(e) => {
                    return Err(BrokerError::Receive {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let config = BrokerConfig {
            partitions: 4,
            send_timeout_ms: 250,
            ..BrokerConfig::default()
        };
        let settings = BrokerSettings::from(&config);

        assert_eq!(settings.topic.name, "reminders");
        assert_eq!(settings.topic.partitions, 4);
        assert_eq!(settings.send_timeout, Duration::from_millis(250));
        assert_eq!(settings.backoff, LinearBackoff::default());
        assert_eq!(settings.read_request().streams.len(), 4);
    }

    #[test]
    fn test_stream_for_is_stable() {
        let mut settings = BrokerSettings::new("reminders", "reminders");
        assert_eq!(settings.stream_for(b"7"), "reminders:0");

        settings.topic.partitions = 8;
        assert_eq!(settings.stream_for(b"7"), settings.stream_for(b"7"));
        assert!(settings.stream_for(b"7").starts_with("reminders:"));
    }
}
