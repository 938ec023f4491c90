//! Wiring from configuration to the concrete store, broker and fetcher.

use anyhow::{Context, Result, bail};
use broker::{BrokerClient, BrokerSettings, RedisBroker, RedisStreamBackend};
use config::Config;
use notes_core::{LinearBackoff, NoteStore, SystemClock};
use publisher::{DueNoteFetcher, LocalFetcher, RemoteFetcher};
use reminders::ReminderService;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use storage::{InMemoryNoteStore, PoolSettings, PostgresNoteStore};
use tokio_util::sync::CancellationToken;

use crate::commands::StoreBackend;

pub const DEFAULT_CONFIG_PATH: &str = "./config/local.yaml";

/// Loads configuration from `path`, or from the default location when it
/// exists. Without a file the defaults plus environment overrides apply.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => Some(path),
        None => Some(Path::new(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
    };
    config::load_config(path)
        .with_context(|| match path {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load configuration".to_string(),
        })
}

pub struct App {
    pub config: Config,
    store_override: Option<StoreBackend>,
}

impl App {
    pub fn new(config: Config, store_override: Option<StoreBackend>) -> Self {
        Self {
            config,
            store_override,
        }
    }

    pub fn store_backend(&self) -> Result<StoreBackend> {
        if let Some(backend) = self.store_override {
            return Ok(backend);
        }
        match self.config.store.backend.as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("Unknown store backend: {other}"),
        }
    }

    pub async fn note_store(&self, token: &CancellationToken) -> Result<Arc<dyn NoteStore>> {
        match self.store_backend()? {
            StoreBackend::Memory => {
                tracing::debug!("Using in-memory note store");
                Ok(Arc::new(InMemoryNoteStore::new()))
            }
            StoreBackend::Postgres => {
                let postgres = &self.config.store.postgres;
                let settings = PoolSettings {
                    max_connections: postgres.pool_size,
                    acquire_timeout: Duration::from_secs(postgres.timeout_seconds),
                };
                let store = PostgresNoteStore::connect(
                    &postgres.connection_url(),
                    &settings,
                    token,
                    LinearBackoff::default(),
                )
                .await
                .context("Failed to connect to PostgreSQL")?;
                store.initialize_schema().await?;
                Ok(Arc::new(store))
            }
        }
    }

    pub async fn reminder_service(&self, token: &CancellationToken) -> Result<ReminderService> {
        let store = self.note_store(token).await?;
        Ok(ReminderService::new(store, Arc::new(SystemClock)))
    }

    pub fn broker(&self) -> Result<Arc<RedisBroker>> {
        let backend = RedisStreamBackend::new(&self.config.broker.addresses)
            .context("Invalid broker addresses")?;
        Ok(Arc::new(BrokerClient::new(
            backend,
            BrokerSettings::from(&self.config.broker),
        )))
    }

    pub async fn fetcher(&self, token: &CancellationToken) -> Result<Arc<dyn DueNoteFetcher>> {
        let window = self.config.publisher.due_window();
        if self.config.publisher.source == "remote" {
            let service = &self.config.notes_service;
            let fetcher = RemoteFetcher::new(
                service.base_url.as_str(),
                window,
                Duration::from_secs(service.timeout_seconds),
            )?;
            return Ok(Arc::new(fetcher));
        }

        let service = self.reminder_service(token).await?;
        Ok(Arc::new(LocalFetcher::new(Arc::new(service), window)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_override_wins() {
        let app = App::new(Config::default(), Some(StoreBackend::Memory));
        assert_eq!(app.store_backend().unwrap(), StoreBackend::Memory);

        let app = App::new(Config::default(), None);
        assert_eq!(app.store_backend().unwrap(), StoreBackend::Postgres);
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        let err = load_config(Some(Path::new("/nonexistent/notes.yaml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/notes.yaml"));
    }

    #[tokio::test]
    async fn test_memory_store_needs_no_connection() {
        let app = App::new(Config::default(), Some(StoreBackend::Memory));
        let service = app
            .reminder_service(&CancellationToken::new())
            .await
            .unwrap();
        assert!(service.get_note(notes_core::NoteId::new(1)).await.is_err());
    }
}
