use anyhow::Result;
use chrono::Utc;
use timeblock_core::planner::Planner;
use timeblock_core::repository::Repository;

use crate::cli::InsightsCommand;
use crate::commands::Session;
use crate::views::table::{display_insights, display_monthly_counts};

pub async fn show_insights<R: Repository>(planner: &Planner<R>, session: &Session, command: InsightsCommand) -> Result<()> {
    let now = Utc::now();
    if command.monthly {
        let counts = planner.export_eligibility(session.owner_id, session.tz, now).await?;
        display_monthly_counts(&counts);
        return Ok(());
    }

    let report = planner
        .insights(session.owner_id, command.mode, session.tz, session.insights, now)
        .await?;
    display_insights(&report, session.tz);
    Ok(())
}
