use anyhow::Result;
use clap::Args;
use notes_core::MessageSender;
use publisher::{LoopSettings, PublishLoop, Publisher};
use std::sync::Arc;

use crate::app::App;
use crate::{output, signal};

#[derive(Args)]
pub struct PublishArgs {
    #[arg(long, help = "Override the publish period in seconds")]
    pub interval_secs: Option<u64>,
}

#[derive(Args)]
pub struct PublishOnceArgs {
    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub async fn run(app: &App, args: PublishArgs) -> Result<()> {
    let token = signal::shutdown_token();
    let fetcher = app.fetcher(&token).await?;
    let broker = app.broker()?;
    let publisher = Arc::new(Publisher::new(fetcher, broker));

    let mut settings = LoopSettings::from(&app.config.publisher);
    if let Some(secs) = args.interval_secs {
        settings.period = std::time::Duration::from_secs(secs.max(1));
    }

    tracing::info!(
        topic = %app.config.broker.topic,
        source = %app.config.publisher.source,
        "Started publisher"
    );
    let exit = PublishLoop::new(publisher, settings).run(token).await;
    tracing::info!(cycles = exit.cycles_started, "Publisher stopped");

    exit.shutdown?;
    Ok(())
}

pub async fn run_once(app: &App, args: PublishOnceArgs) -> Result<()> {
    let token = signal::shutdown_token();
    let fetcher = app.fetcher(&token).await?;
    let broker = app.broker()?;
    let publisher = Publisher::new(fetcher, broker.clone());

    let result = publisher.run_once(&token).await;
    let timeout = app.config.publisher.shutdown_timeout();
    match tokio::time::timeout(timeout, broker.shutdown()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => output::warn(&format!("Broker shutdown failed: {e}")),
        Err(_) => output::warn("Broker shutdown timed out"),
    }

    let report = result?;
    if args.json {
        return output::json(&serde_json::json!({
            "attempted": report.attempted(),
            "delivered": report.delivered(),
            "skipped": report.skipped(),
            "outcomes": report.outcomes.iter().map(|o| serde_json::json!({
                "id": o.note_id,
                "status": format!("{:?}", o.status),
            })).collect::<Vec<_>>(),
        }));
    }
    output::report(&report);
    Ok(())
}
