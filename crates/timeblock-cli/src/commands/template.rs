use anyhow::Result;
use chrono::Utc;
use owo_colors::{OwoColorize, Style};
use timeblock_core::planner::Planner;
use timeblock_core::repository::Repository;

use crate::cli::{TemplateCommand, TemplateSubcommand};
use crate::commands::Session;
use crate::parser::build_rule;
use crate::views::table::display_templates;

pub async fn template_command<R: Repository>(planner: &Planner<R>, session: &Session, command: TemplateCommand) -> Result<()> {
    match command.command {
        TemplateSubcommand::Add(add) => {
            let rule = build_rule(
                add.every,
                add.interval,
                add.on.as_deref(),
                add.until.as_deref(),
                session.tz,
                Utc::now(),
            )?
            .ok_or_else(|| anyhow::anyhow!("A template needs --every or --on"))?;

            let template = planner.save_template(session.owner_id, &add.name, rule).await?;
            println!(
                "{} Saved template: {}",
                "✓".style(Style::new().green().bold()),
                template.name.bright_white().bold()
            );
            println!("  {} Use it with: timeblock add <title> --template {}", "•".bright_black(), template.name.yellow());
        }
        TemplateSubcommand::List => {
            let templates = planner.repository().find_templates(session.owner_id).await?;
            display_templates(&templates);
        }
    }
    Ok(())
}
