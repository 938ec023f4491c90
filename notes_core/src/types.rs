use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifier assigned by the note store. Zero marks a note that has not
/// been persisted yet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NoteId(u64);

impl NoteId {
    pub const UNASSIGNED: Self = Self(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_unassigned(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for NoteId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NoteId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// A reminder note.
///
/// `date_notify` is the next due instant and `delay` the backoff that will be
/// added to it on the next refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub description: String,
    pub date_added: DateTime<Utc>,
    pub date_notify: DateTime<Utc>,
    #[serde(with = "delay_nanos")]
    pub delay: TimeDelta,
}

/// Caller supplied part of a new note; the schedule is filled in on creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub description: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Partial update of a stored note.
///
/// Only the fields set here are written. `expected_date_notify` turns the
/// write into a conditional one: the store rejects it with a conflict when
/// the persisted due instant no longer matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteUpdate {
    pub id: NoteId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_notify: Option<DateTime<Utc>>,
    pub delay: Option<TimeDelta>,
    pub expected_date_notify: Option<DateTime<Utc>>,
}

impl NoteUpdate {
    pub fn new(id: NoteId) -> Self {
        Self {
            id,
            title: None,
            description: None,
            date_notify: None,
            delay: None,
            expected_date_notify: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_date_notify(mut self, date_notify: DateTime<Utc>) -> Self {
        self.date_notify = Some(date_notify);
        self
    }

    pub fn with_delay(mut self, delay: TimeDelta) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn expecting_date_notify(mut self, date_notify: DateTime<Utc>) -> Self {
        self.expected_date_notify = Some(date_notify);
        self
    }

    /// True when no field would be written. The guard does not count.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date_notify.is_none()
            && self.delay.is_none()
    }

    /// Applies the set fields to `note` in place.
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            note.description.clone_from(description);
        }
        if let Some(date_notify) = self.date_notify {
            note.date_notify = date_notify;
        }
        if let Some(delay) = self.delay {
            note.delay = delay;
        }
    }
}

/// Opaque key/value pair handed to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Message {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// How far ahead of now a note's due instant may lie to be selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueWindow(Duration);

impl DueWindow {
    /// Zero window: every note is selected regardless of its due instant.
    pub const ALL: Self = Self(Duration::ZERO);

    pub const fn new(window: Duration) -> Self {
        Self(window)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn is_all(self) -> bool {
        self.0.is_zero()
    }

    pub const fn as_duration(self) -> Duration {
        self.0
    }

    /// Half-open selection range `[now, now + window)`, or `None` for
    /// [`DueWindow::ALL`]. A window too large to represent saturates.
    pub fn bounds(self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if self.is_all() {
            return None;
        }
        let end = TimeDelta::from_std(self.0)
            .ok()
            .and_then(|window| now.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Some((now, end))
    }

    pub fn contains(self, now: DateTime<Utc>, at: DateTime<Utc>) -> bool {
        match self.bounds(now) {
            None => true,
            Some((start, end)) => at >= start && at < end,
        }
    }
}

/// Outcome of a successful broker shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStatus {
    Closed,
    AlreadyClosed,
}

/// Delay travels as an integer count of nanoseconds.
mod delay_nanos {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer, ser::Error};

    pub fn serialize<S: Serializer>(delay: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
        let nanos = delay.num_nanoseconds().ok_or_else(|| {
            S::Error::custom(format!(
                "delay of {}s does not fit in nanoseconds",
                delay.num_seconds()
            ))
        })?;
        serializer.serialize_i64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeDelta, D::Error> {
        i64::deserialize(deserializer).map(TimeDelta::nanoseconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_note() -> Note {
        let added = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Note {
            id: NoteId::new(42),
            title: "dentist".to_string(),
            description: "call to confirm".to_string(),
            date_added: added,
            date_notify: added + TimeDelta::minutes(20),
            delay: TimeDelta::minutes(20),
        }
    }

    #[test]
    fn test_note_json_uses_camel_case_and_nanosecond_delay() {
        let json = serde_json::to_value(sample_note()).unwrap();

        assert_eq!(json["id"], 42);
        assert_eq!(json["dateAdded"], "2024-03-01T12:00:00Z");
        assert_eq!(json["dateNotify"], "2024-03-01T12:20:00Z");
        assert_eq!(json["delay"], 1_200_000_000_000_i64);
    }

    #[test]
    fn test_note_accepts_offset_timestamps() {
        let raw = r#"{
            "id": 3,
            "title": "t",
            "description": "d",
            "dateAdded": "2024-03-01T14:00:00+02:00",
            "dateNotify": "2024-03-01T14:20:00.5+02:00",
            "delay": 3600000000000
        }"#;
        let note: Note = serde_json::from_str(raw).unwrap();

        assert_eq!(note.date_added, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        assert_eq!(note.delay, TimeDelta::hours(1));
    }

    #[test]
    fn test_delay_beyond_nanosecond_range_fails_to_serialize() {
        let mut note = sample_note();
        note.delay = TimeDelta::days(365 * 400);

        assert!(serde_json::to_string(&note).is_err());
    }

    #[test]
    fn test_note_update_field_mask() {
        let update = NoteUpdate::new(NoteId::new(1));
        assert!(update.is_empty());

        let guarded = update.clone().expecting_date_notify(Utc::now());
        assert!(guarded.is_empty());

        let titled = update.with_title("");
        assert!(!titled.is_empty());
    }

    #[test]
    fn test_note_update_apply_keeps_unset_fields() {
        let mut note = sample_note();
        let before = note.clone();
        NoteUpdate::new(note.id)
            .with_description("")
            .with_delay(TimeDelta::hours(3))
            .apply_to(&mut note);

        assert_eq!(note.title, before.title);
        assert_eq!(note.description, "");
        assert_eq!(note.date_notify, before.date_notify);
        assert_eq!(note.delay, TimeDelta::hours(3));
    }

    #[test]
    fn test_due_window_bounds() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let window = DueWindow::from_secs(300);

        assert_eq!(window.bounds(now), Some((now, now + TimeDelta::minutes(5))));
        assert!(window.contains(now, now));
        assert!(window.contains(now, now + TimeDelta::seconds(299)));
        assert!(!window.contains(now, now + TimeDelta::minutes(5)));
        assert!(!window.contains(now, now - TimeDelta::seconds(1)));
    }

    #[test]
    fn test_zero_window_selects_everything() {
        let now = Utc::now();
        assert!(DueWindow::ALL.is_all());
        assert_eq!(DueWindow::ALL.bounds(now), None);
        assert!(DueWindow::ALL.contains(now, now - TimeDelta::days(900)));
    }

    #[test]
    fn test_huge_window_saturates() {
        let now = Utc::now();
        let window = DueWindow::new(Duration::from_secs(u64::MAX));
        assert_eq!(window.bounds(now), Some((now, DateTime::<Utc>::MAX_UTC)));
    }

    #[test]
    fn test_note_id_parse_and_display() {
        let id: NoteId = "17".parse().unwrap();
        assert_eq!(id, NoteId::from(17));
        assert_eq!(id.to_string(), "17");
        assert!(NoteId::UNASSIGNED.is_unassigned());
        assert!("x".parse::<NoteId>().is_err());
    }
}
