use colored::Colorize;
use notes_core::Note;
use publisher::{CycleReport, DeliveryStatus};

pub fn header(title: &str) {
    println!("{}", title.bold().underline());
}

pub fn info(msg: &str) {
    eprintln!("{} {}", "info:".blue().bold(), msg);
}

pub fn warn(msg: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), msg);
}

pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn note(note: &Note) {
    println!("{} {}", format!("#{}", note.id).bold(), note.title);
    if !note.description.is_empty() {
        println!("  {}", note.description.dimmed());
    }
    println!("  {:<8} {}", "added:".dimmed(), note.date_added.to_rfc3339());
    println!("  {:<8} {}", "notify:".dimmed(), note.date_notify.to_rfc3339());
    println!("  {:<8} {}", "delay:".dimmed(), format_delay(note.delay));
}

pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn report(report: &CycleReport) {
    header("Publish cycle");
    for outcome in &report.outcomes {
        match &outcome.status {
            DeliveryStatus::Delivered => println!("  {} #{}", "sent".green(), outcome.note_id),
            DeliveryStatus::EncodeFailed(reason) => {
                println!("  {} #{} {}", "skipped".yellow(), outcome.note_id, reason.dimmed());
            }
            DeliveryStatus::SendFailed(reason) => {
                println!("  {} #{} {}", "failed".red(), outcome.note_id, reason.dimmed());
            }
        }
    }
    println!(
        "{} attempted, {} delivered, {} skipped",
        report.attempted(),
        report.delivered(),
        report.skipped()
    );
}

/// Largest whole unit of a delay, e.g. `20m` or `1000h`.
pub fn format_delay(delay: chrono::TimeDelta) -> String {
    let minutes = delay.num_minutes();
    if delay.num_seconds() % 60 != 0 {
        format!("{}s", delay.num_seconds())
    } else if minutes % 60 != 0 {
        format!("{minutes}m")
    } else {
        format!("{}h", delay.num_hours())
    }
}
