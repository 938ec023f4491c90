use anyhow::Result;
use clap::Args;
use notes_core::{DueWindow, NoteDraft, NoteId, NoteUpdate};
use reminders::RefreshOutcome;
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::output;

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long, help = "Note title")]
    pub title: String,

    #[arg(long, default_value = "", help = "Note description")]
    pub description: String,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

#[derive(Args)]
pub struct IdArgs {
    #[arg(help = "Note id")]
    pub id: u64,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

#[derive(Args)]
pub struct UpdateArgs {
    #[arg(help = "Note id")]
    pub id: u64,

    #[arg(long, help = "New title")]
    pub title: Option<String>,

    #[arg(long, help = "New description")]
    pub description: Option<String>,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

impl UpdateArgs {
    /// Field mask touching only the fields given on the command line.
    fn to_update(&self) -> NoteUpdate {
        let mut update = NoteUpdate::new(NoteId::new(self.id));
        if let Some(title) = &self.title {
            update = update.with_title(title.as_str());
        }
        if let Some(description) = &self.description {
            update = update.with_description(description.as_str());
        }
        update
    }
}

#[derive(Args)]
pub struct DueArgs {
    #[arg(long, help = "Due window in seconds, 0 lists every note [default: configured window]")]
    pub window_secs: Option<u64>,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub async fn create(app: &App, args: CreateArgs) -> Result<()> {
    let service = app.reminder_service(&CancellationToken::new()).await?;
    let note = service
        .create_note(NoteDraft::new(args.title, args.description))
        .await?;

    if args.json {
        return output::json(&note);
    }
    output::success(&format!("Created note #{}", note.id));
    output::note(&note);
    Ok(())
}

pub async fn refresh(app: &App, args: IdArgs) -> Result<()> {
    let service = app.reminder_service(&CancellationToken::new()).await?;
    let outcome = service.refresh(NoteId::new(args.id)).await?;

    match (&outcome, args.json) {
        (RefreshOutcome::Rescheduled(note), true) => output::json(&serde_json::json!({
            "outcome": "rescheduled",
            "note": note
        })),
        (RefreshOutcome::Expired(id), true) => output::json(&serde_json::json!({
            "outcome": "expired",
            "id": id
        })),
        (RefreshOutcome::Rescheduled(note), false) => {
            output::success(&format!("Rescheduled note #{}", note.id));
            output::note(note);
            Ok(())
        }
        (RefreshOutcome::Expired(id), false) => {
            output::success(&format!("Note #{id} expired and was deleted"));
            Ok(())
        }
    }
}

pub async fn update(app: &App, args: UpdateArgs) -> Result<()> {
    let service = app.reminder_service(&CancellationToken::new()).await?;
    service.update_note(args.to_update()).await?;
    let note = service.get_note(NoteId::new(args.id)).await?;

    if args.json {
        return output::json(&note);
    }
    output::success(&format!("Updated note #{}", note.id));
    output::note(&note);
    Ok(())
}

pub async fn show(app: &App, args: IdArgs) -> Result<()> {
    let service = app.reminder_service(&CancellationToken::new()).await?;
    let note = service.get_note(NoteId::new(args.id)).await?;

    if args.json {
        return output::json(&note);
    }
    output::note(&note);
    Ok(())
}

pub async fn due(app: &App, args: DueArgs) -> Result<()> {
    let window = args
        .window_secs
        .map_or_else(|| app.config.publisher.due_window(), DueWindow::from_secs);
    let service = app.reminder_service(&CancellationToken::new()).await?;
    let notes = service.get_notes(window).await?;

    if args.json {
        return output::json(&notes);
    }
    if notes.is_empty() {
        output::info("No notes due");
        return Ok(());
    }
    output::header(&format!("{} due", notes.len()));
    for note in &notes {
        output::note(note);
    }
    Ok(())
}

pub async fn delete(app: &App, args: IdArgs) -> Result<()> {
    let service = app.reminder_service(&CancellationToken::new()).await?;
    service.delete_note(NoteId::new(args.id)).await?;

    if args.json {
        return output::json(&serde_json::json!({ "deleted": args.id }));
    }
    output::success(&format!("Deleted note #{}", args.id));
    Ok(())
}
