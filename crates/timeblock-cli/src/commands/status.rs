use anyhow::Result;
use chrono::Utc;
use owo_colors::{OwoColorize, Style};
use timeblock_core::models::TaskStatus;
use timeblock_core::planner::Planner;
use timeblock_core::repository::Repository;
use timeblock_core::timezone::format_with_timezone;

use crate::cli::StatusCommand;
use crate::commands::Session;
use crate::util::resolve_occurrence_id;

/// Shared by `start`, `done` and `skip`.
pub async fn change_status<R: Repository>(
    planner: &Planner<R>,
    session: &Session,
    command: StatusCommand,
    target: TaskStatus,
) -> Result<()> {
    let id = resolve_occurrence_id(planner.repository(), session.owner_id, &command.id).await?;
    let occurrence = planner.change_status(id, target, Utc::now()).await?;

    let success_style = Style::new().green().bold();
    let verb = match target {
        TaskStatus::Active => "Started",
        TaskStatus::Completed => "Completed",
        TaskStatus::Skipped => "Skipped",
        TaskStatus::Planned => "Re-planned",
    };
    println!("{} {}: '{}'", "✓".style(success_style), verb, occurrence.title);

    if let (Some(actual_start), Some(actual_end)) = (occurrence.actual_start, occurrence.actual_end) {
        println!(
            "  {} ran {} - {}",
            "→".blue(),
            format_with_timezone(actual_start, session.tz, "%H:%M"),
            format_with_timezone(actual_end, session.tz, "%H:%M")
        );
    }
    if target == TaskStatus::Completed {
        println!("  {} Add a reflection: timeblock reflect {}", "•".bright_black(), command.id.yellow());
    }

    Ok(())
}
