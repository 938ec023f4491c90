use errors::{BrokerError, FetchError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublisherError {
    /// The due notes could not be fetched; nothing was sent this cycle.
    #[error("Publish cycle aborted: {0}")]
    Fetch(#[from] FetchError),

    #[error("Broker shutdown failed: {0}")]
    Shutdown(BrokerError),

    #[error("Broker shutdown did not finish within {timeout_ms}ms")]
    ShutdownTimedOut { timeout_ms: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PublisherError::from(FetchError::Transport {
            reason: "connection refused".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Publish cycle aborted: Request to notes service failed: connection refused"
        );

        let err = PublisherError::ShutdownTimedOut { timeout_ms: 5000 };
        assert_eq!(
            err.to_string(),
            "Broker shutdown did not finish within 5000ms"
        );
    }
}
