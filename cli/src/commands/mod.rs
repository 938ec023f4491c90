pub mod consume;
pub mod notes;
pub mod publish;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "notes",
    author,
    version,
    about = "Reminder notes - schedule, refresh and publish due notes",
    long_about = "Notes are due twenty minutes after creation. Every refresh pushes the next \
                  reminder out by the current delay and grows the delay tenfold, until it passes \
                  a year and the note is dropped.\n\nThe publisher sends due notes to the broker \
                  on a fixed period."
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "NOTES_CONFIG",
        help = "Configuration file (TOML or YAML) [default: ./config/local.yaml if present]"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, help = "Override the configured note store")]
    pub store: Option<StoreBackend>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Publish due notes every cycle until interrupted")]
    Publish(publish::PublishArgs),

    #[command(about = "Run a single publish cycle and print its report")]
    PublishOnce(publish::PublishOnceArgs),

    #[command(about = "Create a note due in twenty minutes")]
    Create(notes::CreateArgs),

    #[command(about = "Advance a note's schedule after a delivered reminder")]
    Refresh(notes::IdArgs),

    #[command(about = "Change a note's title or description")]
    Update(notes::UpdateArgs),

    #[command(about = "Show a note")]
    Show(notes::IdArgs),

    #[command(about = "List notes due soon")]
    Due(notes::DueArgs),

    #[command(about = "Delete a note")]
    Delete(notes::IdArgs),

    #[command(about = "Print reminders delivered to the broker")]
    Consume(consume::ConsumeArgs),
}
