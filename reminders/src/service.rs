use async_trait::async_trait;
use errors::StoreError;
use notes_core::{Clock, DueNoteSource, DueWindow, Note, NoteDraft, NoteId, NoteStore, NoteUpdate};
use std::sync::Arc;

use crate::schedule::{Advance, advance, initial_schedule};

/// Result of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The note stays active with the returned schedule.
    Rescheduled(Note),
    /// The delay outgrew its cap and the note was deleted.
    Expired(NoteId),
}

/// Scheduling engine in front of a note store.
///
/// Computes schedules and hands every write to the store; it keeps no state
/// of its own and takes no locks.
#[derive(Clone)]
pub struct ReminderService {
    store: Arc<dyn NoteStore>,
    clock: Arc<dyn Clock>,
}

impl ReminderService {
    pub fn new(store: Arc<dyn NoteStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Creates a note due twenty minutes from now.
    pub async fn create_note(&self, draft: NoteDraft) -> Result<Note, StoreError> {
        let schedule = initial_schedule(self.clock.now());
        let note = Note {
            id: NoteId::UNASSIGNED,
            title: draft.title,
            description: draft.description,
            date_added: schedule.date_added,
            date_notify: schedule.date_notify,
            delay: schedule.delay,
        };

        let created = self.store.create_note(note).await?;
        tracing::info!(
            note_id = %created.id,
            date_notify = %created.date_notify,
            "Note scheduled"
        );
        Ok(created)
    }

    /// Advances the schedule of note `id` after a delivery was acknowledged.
    ///
    /// Performs exactly one store mutation: a guarded update, or a delete
    /// when the note expires. Both are success.
    pub async fn refresh(&self, id: NoteId) -> Result<RefreshOutcome, StoreError> {
        let note = self.store.get_note(id).await?;

        match advance(note.date_notify, note.delay)? {
            Advance::Expire => {
                self.store.delete_note(id).await?;
                tracing::info!(note_id = %id, delay_ms = note.delay.num_milliseconds(), "Note expired");
                Ok(RefreshOutcome::Expired(id))
            }
            Advance::Reschedule { date_notify, delay } => {
                let update = NoteUpdate::new(id)
                    .with_date_notify(date_notify)
                    .with_delay(delay)
                    .expecting_date_notify(note.date_notify);
                self.store.update_note(update).await?;

                tracing::debug!(
                    note_id = %id,
                    date_notify = %date_notify,
                    delay_ms = delay.num_milliseconds(),
                    "Note rescheduled"
                );
                Ok(RefreshOutcome::Rescheduled(Note {
                    date_notify,
                    delay,
                    ..note
                }))
            }
        }
    }

    pub async fn get_note(&self, id: NoteId) -> Result<Note, StoreError> {
        self.store.get_note(id).await
    }

    pub async fn get_notes(&self, window: DueWindow) -> Result<Vec<Note>, StoreError> {
        self.store.get_notes(window, self.clock.now()).await
    }

    pub async fn update_note(&self, update: NoteUpdate) -> Result<(), StoreError> {
        self.store.update_note(update).await
    }

    pub async fn delete_note(&self, id: NoteId) -> Result<(), StoreError> {
        self.store.delete_note(id).await
    }
}

#[async_trait]
impl DueNoteSource for ReminderService {
    async fn due_notes(&self, window: DueWindow) -> Result<Vec<Note>, StoreError> {
        self.get_notes(window).await
    }
}
