use anyhow::Result;
use clap::Args;
use errors::BrokerError;
use notes_core::{JsonCodec, MessageReceiver, MessageSender, NoteCodec};

use crate::app::App;
use crate::{output, signal};

#[derive(Args)]
pub struct ConsumeArgs {
    #[arg(long, help = "Stop after this many reminders")]
    pub count: Option<usize>,

    #[arg(long, help = "Output each reminder as a JSON line")]
    pub json: bool,
}

pub async fn run(app: &App, args: ConsumeArgs) -> Result<()> {
    let token = signal::shutdown_token();
    let broker = app.broker()?;
    let codec = JsonCodec;
    let mut received = 0usize;

    while args.count.is_none_or(|count| received < count) {
        let message = match broker.receive(&token).await {
            Ok(message) => message,
            Err(BrokerError::Cancelled) => break,
            Err(e) => {
                let _ = broker.shutdown().await;
                return Err(e.into());
            }
        };
        received += 1;

        match codec.decode(&message) {
            Ok(note) if args.json => println!("{}", serde_json::to_string(&note)?),
            Ok(note) => output::note(&note),
            Err(e) => output::warn(&format!("Undecodable reminder: {e}")),
        }
    }

    let timeout = app.config.publisher.shutdown_timeout();
    match tokio::time::timeout(timeout, broker.shutdown()).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => {
            output::warn("Broker shutdown timed out");
            Ok(())
        }
    }
}
