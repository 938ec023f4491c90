//! In-process note store.
//!
//! Same semantics as the PostgreSQL store, including the conditional update
//! guard, without durability. Used by tests and `--store memory` runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use errors::StoreError;
use notes_core::{DueWindow, Note, NoteId, NoteStore, NoteUpdate};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct InMemoryNoteStore {
    notes: RwLock<BTreeMap<NoteId, Note>>,
    next_id: AtomicU64,
}

impl Default for InMemoryNoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.notes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.read().is_empty()
    }
}

fn require_id(id: NoteId) -> Result<(), StoreError> {
    if id.is_unassigned() {
        return Err(StoreError::validation("required fields are unspecified"));
    }
    Ok(())
}

#[async_trait]
impl NoteStore for InMemoryNoteStore {
    async fn create_note(&self, mut note: Note) -> Result<Note, StoreError> {
        note.id = NoteId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.notes.write().insert(note.id, note.clone());
        tracing::debug!(note_id = %note.id, "Note inserted");
        Ok(note)
    }

    async fn get_notes(
        &self,
        window: DueWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<Note>, StoreError> {
        Ok(self
            .notes
            .read()
            .values()
            .filter(|note| window.contains(now, note.date_notify))
            .cloned()
            .collect())
    }

    async fn get_note(&self, id: NoteId) -> Result<Note, StoreError> {
        require_id(id)?;
        self.notes
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { id: id.get() })
    }

    async fn update_note(&self, update: NoteUpdate) -> Result<(), StoreError> {
        require_id(update.id)?;
        if update.is_empty() {
            return Err(StoreError::validation("no fields to update"));
        }

        let mut notes = self.notes.write();
        let note = notes
            .get_mut(&update.id)
            .ok_or(StoreError::NotFound {
                id: update.id.get(),
            })?;
        if update
            .expected_date_notify
            .is_some_and(|expected| note.date_notify != expected)
        {
            return Err(StoreError::Conflict {
                id: update.id.get(),
                reason: "due instant changed since it was read".to_string(),
            });
        }
        update.apply_to(note);
        Ok(())
    }

    async fn delete_note(&self, id: NoteId) -> Result<(), StoreError> {
        require_id(id)?;
        self.notes
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id: id.get() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn note_due_in(minutes: i64) -> Note {
        Note {
            id: NoteId::UNASSIGNED,
            title: format!("due in {minutes}m"),
            description: String::new(),
            date_added: now() - TimeDelta::hours(1),
            date_notify: now() + TimeDelta::minutes(minutes),
            delay: TimeDelta::minutes(20),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = InMemoryNoteStore::new();
        let first = store.create_note(note_due_in(1)).await.unwrap();
        let second = store.create_note(note_due_in(2)).await.unwrap();

        assert_eq!(first.id, NoteId::new(1));
        assert_eq!(second.id, NoteId::new(2));
        assert_eq!(store.get_note(first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_get_notes_selects_window() {
        let store = InMemoryNoteStore::new();
        for minutes in [-10, 0, 4, 5, 30] {
            store.create_note(note_due_in(minutes)).await.unwrap();
        }

        let due = store
            .get_notes(DueWindow::from_secs(300), now())
            .await
            .unwrap();
        let mut titles: Vec<_> = due.into_iter().map(|n| n.title).collect();
        titles.sort();
        assert_eq!(titles, vec!["due in 0m", "due in 4m"]);

        let all = store.get_notes(DueWindow::ALL, now()).await.unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_unassigned_id_is_validation_error() {
        let store = InMemoryNoteStore::new();
        assert!(matches!(
            store.get_note(NoteId::UNASSIGNED).await,
            Err(StoreError::Validation { .. })
        ));
        assert!(matches!(
            store.delete_note(NoteId::UNASSIGNED).await,
            Err(StoreError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_update_is_rejected() {
        let store = InMemoryNoteStore::new();
        let note = store.create_note(note_due_in(3)).await.unwrap();

        let err = store.update_note(NoteUpdate::new(note.id)).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_note() {
        let store = InMemoryNoteStore::new();
        let update = NoteUpdate::new(NoteId::new(99)).with_title("x");

        assert!(store.update_note(update).await.unwrap_err().is_not_found());
        assert!(store.delete_note(NoteId::new(99)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_guarded_update_detects_concurrent_change() {
        let store = InMemoryNoteStore::new();
        let note = store.create_note(note_due_in(3)).await.unwrap();
        let later = note.date_notify + TimeDelta::minutes(20);

        store
            .update_note(
                NoteUpdate::new(note.id)
                    .with_date_notify(later)
                    .expecting_date_notify(note.date_notify),
            )
            .await
            .unwrap();

        let stale = NoteUpdate::new(note.id)
            .with_date_notify(later + TimeDelta::minutes(20))
            .expecting_date_notify(note.date_notify);
        let err = store.update_note(stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.get_note(note.id).await.unwrap().date_notify, later);
    }

    #[tokio::test]
    async fn test_delete_removes_note() {
        let store = InMemoryNoteStore::new();
        let note = store.create_note(note_due_in(3)).await.unwrap();

        store.delete_note(note.id).await.unwrap();
        assert!(store.is_empty());
        assert!(store.get_note(note.id).await.unwrap_err().is_not_found());
    }
}
