//! Pure schedule arithmetic for reminder notes.
//!
//! A new note is due `INITIAL_DELAY` after creation. Every refresh pushes
//! the due instant forward by the current delay and multiplies the delay by
//! `GROWTH_FACTOR`; once the delay would exceed `LIFETIME_CAP` the note
//! expires instead. Growth is unconditional: elapsed time since the previous
//! due instant is not taken into account.

use chrono::{DateTime, TimeDelta, Utc};
use errors::StoreError;

pub const INITIAL_DELAY: TimeDelta = TimeDelta::minutes(20);
pub const GROWTH_FACTOR: i32 = 10;
pub const LIFETIME_CAP: TimeDelta = TimeDelta::days(365);

/// Temporal fields of a freshly created note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub date_added: DateTime<Utc>,
    pub date_notify: DateTime<Utc>,
    pub delay: TimeDelta,
}

/// What a refresh does to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Reschedule {
        date_notify: DateTime<Utc>,
        delay: TimeDelta,
    },
    Expire,
}

pub fn initial_schedule(now: DateTime<Utc>) -> Schedule {
    Schedule {
        date_added: now,
        date_notify: now + INITIAL_DELAY,
        delay: INITIAL_DELAY,
    }
}

/// Next schedule for a note currently due at `date_notify` with `delay`.
///
/// Arithmetic overflow counts as exceeding the cap.
pub fn advance(date_notify: DateTime<Utc>, delay: TimeDelta) -> Result<Advance, StoreError> {
    if delay <= TimeDelta::zero() {
        return Err(StoreError::validation(format!(
            "delay must be positive, got {}ms",
            delay.num_milliseconds()
        )));
    }

    let next_notify = date_notify.checked_add_signed(delay);
    let next_delay = delay.checked_mul(GROWTH_FACTOR);
    match (next_notify, next_delay) {
        (Some(date_notify), Some(delay)) if delay <= LIFETIME_CAP => {
            Ok(Advance::Reschedule { date_notify, delay })
        }
        _ => Ok(Advance::Expire),
    }
}
