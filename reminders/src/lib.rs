//! # Reminder Scheduling
//!
//! Decides when a note is due: the initial schedule on creation and the
//! escalating reschedule-or-expire step on every refresh.

pub mod schedule;
pub mod service;

pub use schedule::{Advance, GROWTH_FACTOR, INITIAL_DELAY, LIFETIME_CAP, advance, initial_schedule};
pub use service::{RefreshOutcome, ReminderService};
