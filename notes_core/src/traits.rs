//! Capability traits for the reminder notes system

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use errors::{BrokerError, StoreError};
use tokio_util::sync::CancellationToken;

use crate::types::{DueWindow, Message, Note, NoteId, NoteUpdate, ShutdownStatus};

/// Durable record of notes. The store is the only writer of persisted state.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Inserts `note` and returns it with the id the store assigned.
    async fn create_note(&self, note: Note) -> Result<Note, StoreError>;

    /// Notes whose due instant falls in `[now, now + window)`, or every note
    /// for [`DueWindow::ALL`]. Order is unspecified.
    async fn get_notes(&self, window: DueWindow, now: DateTime<Utc>)
    -> Result<Vec<Note>, StoreError>;

    async fn get_note(&self, id: NoteId) -> Result<Note, StoreError>;

    async fn update_note(&self, update: NoteUpdate) -> Result<(), StoreError>;

    async fn delete_note(&self, id: NoteId) -> Result<(), StoreError>;
}

/// Anything able to answer "which notes are due within this window".
#[async_trait]
pub trait DueNoteSource: Send + Sync {
    async fn due_notes(&self, window: DueWindow) -> Result<Vec<Note>, StoreError>;
}

/// Producer side of the broker.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, token: &CancellationToken, message: Message) -> Result<(), BrokerError>;

    /// Releases every broker resource. Calling it again is a no-op.
    async fn shutdown(&self) -> Result<ShutdownStatus, BrokerError>;
}

/// Consumer side of the broker.
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    async fn receive(&self, token: &CancellationToken) -> Result<Message, BrokerError>;
}
