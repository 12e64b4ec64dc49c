use anyhow::{anyhow, Result};
use chrono::{Days, NaiveDate, Utc};
use timeblock_core::planner::Planner;
use timeblock_core::repository::Repository;
use timeblock_core::timezone::{first_of_next_month, first_of_week, local_midnight, timezone_abbreviation};

use crate::cli::{MonthCommand, WeekCommand};
use crate::commands::Session;
use crate::parser::{parse_date, parse_month};
use crate::views::table::{display_agenda, ViewCategory};

pub async fn show_week<R: Repository>(planner: &Planner<R>, session: &Session, command: WeekCommand) -> Result<()> {
    let now = Utc::now();
    let monday = first_of_week(parse_date(&command.date, session.tz, now)?);
    let sunday = monday
        .checked_add_days(Days::new(6))
        .ok_or_else(|| anyhow!("Week of {} is out of range", monday))?;

    println!(
        "Week of {} ({})",
        monday.format("%d %B %Y"),
        timezone_abbreviation(session.tz, local_midnight(monday, session.tz))
    );
    show_range(planner, session, monday, sunday, true).await
}

pub async fn show_month<R: Repository>(planner: &Planner<R>, session: &Session, command: MonthCommand) -> Result<()> {
    let now = Utc::now();
    let first = parse_month(command.month.as_deref(), session.tz, now)?;
    let last = first_of_next_month(first)
        .pred_opt()
        .ok_or_else(|| anyhow!("Month {} is out of range", first.format("%Y-%m")))?;

    println!(
        "{} ({})",
        first.format("%B %Y"),
        timezone_abbreviation(session.tz, local_midnight(first, session.tz))
    );
    show_range(planner, session, first, last, false).await
}

async fn show_range<R: Repository>(
    planner: &Planner<R>,
    session: &Session,
    first: NaiveDate,
    last: NaiveDate,
    include_empty_days: bool,
) -> Result<()> {
    let days = planner.agenda(session.owner_id, first, last, session.tz).await?;
    let categories = planner.repository().find_categories(session.owner_id).await?;
    display_agenda(&days, &ViewCategory::lookup(&categories), session.tz, Utc::now(), include_empty_days);
    Ok(())
}
