//! One publish cycle: fetch the due notes, encode each and hand it to the
//! broker.

use notes_core::{JsonCodec, MessageSender, NoteCodec, NoteId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PublisherError;
use crate::fetcher::DueNoteFetcher;
use crate::telemetry::PublishTelemetry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    EncodeFailed(String),
    SendFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteOutcome {
    pub note_id: NoteId,
    pub status: DeliveryStatus,
}

/// Per-note results of one cycle, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub outcomes: Vec<NoteOutcome>,
}

impl CycleReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::Delivered)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.attempted() - self.delivered()
    }
}

pub struct Publisher {
    fetcher: Arc<dyn DueNoteFetcher>,
    sender: Arc<dyn MessageSender>,
    codec: Arc<dyn NoteCodec>,
}

impl Publisher {
    pub fn new(fetcher: Arc<dyn DueNoteFetcher>, sender: Arc<dyn MessageSender>) -> Self {
        Self::with_codec(fetcher, sender, Arc::new(JsonCodec))
    }

    pub fn with_codec(
        fetcher: Arc<dyn DueNoteFetcher>,
        sender: Arc<dyn MessageSender>,
        codec: Arc<dyn NoteCodec>,
    ) -> Self {
        Self {
            fetcher,
            sender,
            codec,
        }
    }

    pub fn sender(&self) -> &Arc<dyn MessageSender> {
        &self.sender
    }

    /// Runs a single cycle.
    ///
    /// A failed fetch aborts the cycle before anything is sent. After that,
    /// every note is attempted: encode or send failures are recorded in the
    /// report and the loop moves on. Skipped notes stay due and are picked
    /// up again next cycle.
    pub async fn run_once(&self, token: &CancellationToken) -> Result<CycleReport, PublisherError> {
        PublishTelemetry::record_cycle();

        let notes = match self.fetcher.fetch(token).await {
            Ok(notes) => notes,
            Err(e) => {
                PublishTelemetry::record_cycle_failure();
                return Err(e.into());
            }
        };
        debug!(count = notes.len(), "Fetched due notes");

        let mut report = CycleReport {
            outcomes: Vec::with_capacity(notes.len()),
        };
        for note in &notes {
            let status = match self.codec.encode(note) {
                Err(e) => {
                    warn!(note_id = %note.id, error = %e, "Skipping note that cannot be encoded");
                    PublishTelemetry::record_skipped("encode");
                    DeliveryStatus::EncodeFailed(e.to_string())
                }
                Ok(message) => match self.sender.send(token, message).await {
                    Ok(()) => {
                        PublishTelemetry::record_published();
                        DeliveryStatus::Delivered
                    }
                    Err(e) => {
                        warn!(note_id = %note.id, error = %e, "Failed to send note");
                        PublishTelemetry::record_skipped("send");
                        DeliveryStatus::SendFailed(e.to_string())
                    }
                },
            };
            report.outcomes.push(NoteOutcome {
                note_id: note.id,
                status,
            });
        }

        info!(
            attempted = report.attempted(),
            delivered = report.delivered(),
            skipped = report.skipped(),
            "Publish cycle finished"
        );
        Ok(report)
    }
}
