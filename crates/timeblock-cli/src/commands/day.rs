use anyhow::Result;
use chrono::Utc;
use timeblock_core::planner::Planner;
use timeblock_core::repository::Repository;
use timeblock_core::timezone::timezone_abbreviation;

use crate::cli::DayCommand;
use crate::commands::Session;
use crate::parser::parse_date;
use crate::views::table::{display_day, ViewCategory};

pub async fn show_day<R: Repository>(planner: &Planner<R>, session: &Session, command: DayCommand) -> Result<()> {
    let now = Utc::now();
    let date = parse_date(&command.date, session.tz, now)?;
    let agenda = planner.day_layout(session.owner_id, date, session.tz).await?;
    let categories = planner.repository().find_categories(session.owner_id).await?;

    println!(
        "{} ({})",
        date.format("%A, %d %B %Y"),
        timezone_abbreviation(session.tz, agenda.window.start)
    );
    display_day(&agenda.slots(), &ViewCategory::lookup(&categories), session.tz, now);
    Ok(())
}
