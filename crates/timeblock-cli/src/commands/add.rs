use anyhow::Result;
use chrono::Utc;
use owo_colors::{OwoColorize, Style};
use timeblock_core::models::{NewOccurrenceData, PlannedTime};
use timeblock_core::planner::Planner;
use timeblock_core::repository::Repository;
use timeblock_core::timezone::format_with_timezone;

use crate::cli::AddCommand;
use crate::commands::Session;
use crate::parser::{build_rule, parse_duration, parse_when};
use crate::util::short_id;

pub async fn add_block<R: Repository>(planner: &Planner<R>, session: &Session, command: AddCommand) -> Result<()> {
    let now = Utc::now();
    let start = parse_when(&command.start, session.tz, now)?;
    let end = match (&command.end, &command.duration) {
        (Some(end), _) => parse_when(end, session.tz, now)?,
        (None, Some(duration)) => start + parse_duration(duration)?,
        (None, None) => anyhow::bail!("Either --end or --duration must be provided"),
    };

    let recurrence_rule = match &command.template {
        Some(name) => Some(planner.find_template(session.owner_id, name).await?.rule),
        None => build_rule(
            command.every,
            command.interval,
            command.on.as_deref(),
            command.until.as_deref(),
            session.tz,
            now,
        )?,
    };

    let category = planner
        .category_or_default(session.owner_id, command.category.as_deref())
        .await?;

    let created = planner
        .create_task(
            session.owner_id,
            NewOccurrenceData {
                title: command.title,
                category_id: category.id,
                start: PlannedTime::from(start),
                end: PlannedTime::from(end),
                priority: command.priority,
                recurrence_rule,
            },
            session.tz,
            now,
        )
        .await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    let head = &created.head;

    println!(
        "{} Planned {}: {}",
        "✓".style(success_style),
        if head.is_series_head() { "recurring block" } else { "block" },
        head.title.bright_white().bold()
    );
    println!("  {} ID: {}", "→".style(info_style), short_id(&head.id).yellow());
    println!(
        "  {} {} - {} ({})",
        "→".style(info_style),
        format_with_timezone(head.planned_start, session.tz, "%a %Y-%m-%d %H:%M"),
        format_with_timezone(head.planned_end, session.tz, "%H:%M"),
        category.name.cyan()
    );
    if let Some(last) = created.children.last() {
        println!(
            "  {} {} more through {}",
            "→".style(info_style),
            created.children.len(),
            format_with_timezone(last.planned_start, session.tz, "%Y-%m-%d")
        );
    }

    Ok(())
}
