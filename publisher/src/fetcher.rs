//! Sources of due notes for a publish cycle.

use async_trait::async_trait;
use errors::FetchError;
use notes_core::{DueNoteSource, DueWindow, Note};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[async_trait]
pub trait DueNoteFetcher: Send + Sync {
    /// Notes due within the fetcher's window. Order is unspecified.
    async fn fetch(&self, token: &CancellationToken) -> Result<Vec<Note>, FetchError>;
}

/// Reads due notes straight from an in-process source.
pub struct LocalFetcher {
    source: Arc<dyn DueNoteSource>,
    window: DueWindow,
}

impl LocalFetcher {
    pub fn new(source: Arc<dyn DueNoteSource>, window: DueWindow) -> Self {
        Self { source, window }
    }
}

#[async_trait]
impl DueNoteFetcher for LocalFetcher {
    async fn fetch(&self, token: &CancellationToken) -> Result<Vec<Note>, FetchError> {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(FetchError::Cancelled),
            notes = self.source.due_notes(self.window) => Ok(notes?),
        }
    }
}

/// Asks a remote notes service for due notes over HTTP.
pub struct RemoteFetcher {
    client: reqwest::Client,
    base_url: String,
    window: DueWindow,
}

impl RemoteFetcher {
    pub fn new(
        base_url: impl Into<String>,
        window: DueWindow,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            window,
        })
    }

    fn url(&self) -> String {
        if self.window.is_all() {
            format!("{}/notes", self.base_url)
        } else {
            format!(
                "{}/notes?interval={}s",
                self.base_url,
                self.window.as_duration().as_secs()
            )
        }
    }

    async fn request(&self) -> Result<Vec<Note>, FetchError> {
        let url = self.url();
        debug!(url = %url, "Fetching due notes");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<Note>>()
            .await
            .map_err(|e| FetchError::Decode {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl DueNoteFetcher for RemoteFetcher {
    async fn fetch(&self, token: &CancellationToken) -> Result<Vec<Note>, FetchError> {
        tokio::select! {
            biased;
            () = token.cancelled() => Err(FetchError::Cancelled),
            notes = self.request() => notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_url_carries_window() {
        let fetcher = RemoteFetcher::new(
            "http://notes:8080/",
            DueWindow::from_secs(300),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(fetcher.url(), "http://notes:8080/notes?interval=300s");

        let fetcher =
            RemoteFetcher::new("http://notes:8080", DueWindow::ALL, Duration::from_secs(5))
                .unwrap();
        assert_eq!(fetcher.url(), "http://notes:8080/notes");
    }
}
