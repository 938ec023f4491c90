//! Seam between the broker client and a concrete stream store.
//!
//! A topic is a set of partition streams; a connection can create the topic
//! (and its consumer group), append to one partition and read on behalf of a
//! group member.

use async_trait::async_trait;
use notes_core::Message;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a backend operation.
#[derive(Debug, Error)]
#[error("{operation}: {reason}")]
pub struct BackendError {
    pub operation: &'static str,
    pub reason: String,
}

impl BackendError {
    pub fn new(operation: &'static str, reason: impl ToString) -> Self {
        Self {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// Topic layout requested at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    pub name: String,
    pub partitions: u32,
    pub replication_factor: u32,
    pub group: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicStatus {
    Created,
    AlreadyExists,
}

/// One blocking read for a consumer group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub streams: Vec<String>,
    pub group: String,
    pub consumer: String,
    pub block: Duration,
}

#[async_trait]
pub trait StreamBackend: Send + Sync + 'static {
    type Connection: StreamConnection;

    async fn dial(&self) -> Result<Self::Connection, BackendError>;
}

#[async_trait]
pub trait StreamConnection: Send + Sync + 'static {
    /// Creates every partition stream and the consumer group. A topic that
    /// is already fully in place reports [`TopicStatus::AlreadyExists`].
    async fn ensure_topic(&self, layout: &TopicLayout) -> Result<TopicStatus, BackendError>;

    async fn append(&self, stream: &str, message: &Message) -> Result<(), BackendError>;

    /// Next message for this group member, or `None` when nothing arrived
    /// within `request.block`. Delivered entries are acknowledged.
    async fn read(&self, request: &ReadRequest) -> Result<Option<Message>, BackendError>;

    async fn close(&self) -> Result<(), BackendError>;
}
