use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use errors::StoreError;
use notes_core::{DueWindow, LinearBackoff, Note, NoteId, NoteStore, NoteUpdate};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BACKEND: &str = "PostgreSQL";

/// SQLSTATE raised when the target database does not exist. Retrying cannot
/// fix it.
const INVALID_CATALOG_NAME: &str = "3D000";

const NOTE_COLUMNS: &str = "id, title, description, date_added, date_notify, delay_ms";

/// Pool settings for [`PostgresNoteStore::connect`].
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30)
        }
    }
}

pub struct PostgresNoteStore {
    pool: PgPool
}

impl PostgresNoteStore {
    /// Single connection attempt.
    pub async fn new(connection_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(connection_url)
            .await
            .map_err(connection_error)?;
        Ok(Self { pool })
    }

    /// Connects, retrying under `backoff` until the database answers, the
    /// backoff runs out or `token` is cancelled. A missing database fails
    /// immediately.
    pub async fn connect(
        connection_url: &str,
        settings: &PoolSettings,
        token: &CancellationToken,
        backoff: LinearBackoff
    ) -> Result<Self, StoreError> {
        let attempt = move || async move {
            PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .acquire_timeout(settings.acquire_timeout)
                .connect(connection_url)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Connecting to PostgreSQL failed"))
        };

        match notes_core::retry_until_cancelled(token, backoff, attempt, |e: &sqlx::Error| {
            !is_missing_database(e)
        })
        .await
        {
            None => Err(StoreError::Cancelled),
            Some(Err(e)) => Err(connection_error(e)),
            Some(Ok(pool)) => {
                tracing::info!("Connected to PostgreSQL");
                Ok(Self { pool })
            }
        }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notes (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                date_added TIMESTAMPTZ NOT NULL,
                date_notify TIMESTAMPTZ NOT NULL,
                delay_ms BIGINT NOT NULL
            )"
        )
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_notes_date_notify ON notes(date_notify)")
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn exists(&self, id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 AS present FROM notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl NoteStore for PostgresNoteStore {
    async fn create_note(&self, note: Note) -> Result<Note, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO notes (title, description, date_added, date_notify, delay_ms)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(&note.title)
        .bind(&note.description)
        .bind(note.date_added)
        .bind(note.date_notify)
        .bind(note.delay.num_milliseconds())
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;

        let created = row_to_note(&row).map_err(query_error)?;
        tracing::debug!(note_id = %created.id, "Note inserted");
        Ok(created)
    }

    async fn get_notes(
        &self,
        window: DueWindow,
        now: DateTime<Utc>
    ) -> Result<Vec<Note>, StoreError> {
        let rows = match window.bounds(now) {
            None => {
                sqlx::query(&format!("SELECT {NOTE_COLUMNS} FROM notes"))
                    .fetch_all(&self.pool)
                    .await
            }
            Some((start, end)) => {
                sqlx::query(&format!(
                    "SELECT {NOTE_COLUMNS} FROM notes
                     WHERE date_notify >= $1 AND date_notify < $2"
                ))
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(query_error)?;

        rows.iter()
            .map(|row| row_to_note(row).map_err(query_error))
            .collect()
    }

    async fn get_note(&self, id: NoteId) -> Result<Note, StoreError> {
        let db_id = db_id(id)?;
        let row = sqlx::query(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1"))
            .bind(db_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;

        match row {
            Some(row) => row_to_note(&row).map_err(query_error),
            None => Err(StoreError::NotFound { id: id.get() })
        }
    }

    async fn update_note(&self, update: NoteUpdate) -> Result<(), StoreError> {
        let db_id = db_id(update.id)?;
        if update.is_empty() {
            return Err(StoreError::validation("no fields to update"));
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE notes SET ");
        let mut fields = builder.separated(", ");
        if let Some(title) = &update.title {
            fields.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(description) = &update.description {
            fields
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(date_notify) = update.date_notify {
            fields
                .push("date_notify = ")
                .push_bind_unseparated(date_notify);
        }
        if let Some(delay) = update.delay {
            fields
                .push("delay_ms = ")
                .push_bind_unseparated(delay.num_milliseconds());
        }
        builder.push(" WHERE id = ").push_bind(db_id);
        if let Some(expected) = update.expected_date_notify {
            builder.push(" AND date_notify = ").push_bind(expected);
        }

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }
        if update.expected_date_notify.is_some() && self.exists(db_id).await? {
            return Err(StoreError::Conflict {
                id: update.id.get(),
                reason: "due instant changed since it was read".to_string()
            });
        }
        Err(StoreError::NotFound {
            id: update.id.get()
        })
    }

    async fn delete_note(&self, id: NoteId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(db_id(id)?)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id: id.get() });
        }
        Ok(())
    }
}

fn db_id(id: NoteId) -> Result<i64, StoreError> {
    if id.is_unassigned() {
        return Err(StoreError::validation("required fields are unspecified"));
    }
    i64::try_from(id.get()).map_err(|_| StoreError::NotFound { id: id.get() })
}

fn row_to_note(row: &PgRow) -> Result<Note, sqlx::Error> {
    let id: i64 = row.try_get("id")?;
    Ok(Note {
        id: NoteId::new(id as u64),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        date_added: row.try_get("date_added")?,
        date_notify: row.try_get("date_notify")?,
        delay: TimeDelta::milliseconds(row.try_get::<i64, _>("delay_ms")?)
    })
}

fn is_missing_database(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some(INVALID_CATALOG_NAME))
}

fn connection_error(e: sqlx::Error) -> StoreError {
    StoreError::Connection {
        backend: BACKEND.to_string(),
        reason: e.to_string()
    }
}

fn query_error(e: sqlx::Error) -> StoreError {
    StoreError::query(BACKEND, e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unassigned_id_is_rejected() {
        let err = db_id(NoteId::UNASSIGNED).unwrap_err();
        assert!(matches!(err, StoreError::Validation { .. }));
    }

    #[test]
    fn test_id_outside_bigserial_range_is_not_found() {
        let err = db_id(NoteId::new(u64::MAX)).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id } if id == u64::MAX));
    }

    #[test]
    fn test_pool_errors_are_not_missing_database() {
        assert!(!is_missing_database(&sqlx::Error::PoolTimedOut));
    }
}
