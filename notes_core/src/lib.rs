//! # Reminder Notes Core
//!
//! Shared types, traits, and utilities for the reminder notes system.
//!
//! This crate provides:
//! - The note record, its creation draft and its field-mask update
//! - Capability traits for the store, the due-note source and the broker
//! - The note to message codec
//! - Clocks and the linear retry policy

pub mod clock;
pub mod message;
pub mod retry;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use message::{JsonCodec, NoteCodec};
pub use retry::{LinearBackoff, retry_until_cancelled};
pub use traits::{DueNoteSource, MessageReceiver, MessageSender, NoteStore};
pub use types::{DueWindow, Message, Note, NoteDraft, NoteId, NoteUpdate, ShutdownStatus};
