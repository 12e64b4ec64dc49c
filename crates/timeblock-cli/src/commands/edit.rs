use anyhow::Result;
use chrono::Utc;
use owo_colors::{OwoColorize, Style};
use timeblock_core::models::OccurrenceEdit;
use timeblock_core::planner::Planner;
use timeblock_core::repository::Repository;

use crate::cli::EditCommand;
use crate::commands::Session;
use crate::parser::parse_when;
use crate::util::resolve_occurrence_id;

pub async fn edit_block<R: Repository>(planner: &Planner<R>, session: &Session, command: EditCommand) -> Result<()> {
    let id = resolve_occurrence_id(planner.repository(), session.owner_id, &command.id).await?;
    let now = Utc::now();

    let category_id = match command.category.as_deref() {
        Some(name) => Some(planner.category_or_default(session.owner_id, Some(name)).await?.id),
        None => None,
    };
    let edit = OccurrenceEdit {
        title: command.title,
        category_id,
        planned_start: command.start.as_deref().map(|s| parse_when(s, session.tz, now)).transpose()?,
        planned_end: command.end.as_deref().map(|s| parse_when(s, session.tz, now)).transpose()?,
    };

    let occurrence = planner.edit(id, edit).await?;
    println!(
        "{} Updated block: {}",
        "✓".style(Style::new().green().bold()),
        occurrence.title.bright_white().bold()
    );
    if occurrence.parent_id.is_some() || occurrence.is_series_head() {
        println!("  {} Other blocks of the series are unchanged", "→".blue());
    }
    Ok(())
}
