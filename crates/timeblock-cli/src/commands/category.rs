use anyhow::{bail, Result};
use owo_colors::{OwoColorize, Style};
use timeblock_core::planner::Planner;
use timeblock_core::repository::Repository;

use crate::cli::{CategoryCommand, CategorySubcommand};
use crate::commands::Session;
use crate::views::table::display_categories;

pub async fn category_command<R: Repository>(planner: &Planner<R>, session: &Session, command: CategoryCommand) -> Result<()> {
    let repo = planner.repository();
    match command.command {
        CategorySubcommand::Add(add) => {
            if !is_hex_color(&add.color) {
                bail!("Color must look like #rrggbb, got '{}'", add.color);
            }
            // make sure the owner has a default before their first custom category
            planner.category_or_default(session.owner_id, None).await?;
            let category = repo
                .add_category(session.owner_id, add.name.trim().to_string(), add.color, false)
                .await?;
            println!(
                "{} Added category: {}",
                "✓".style(Style::new().green().bold()),
                category.name.bright_white().bold()
            );
        }
        CategorySubcommand::List => {
            let categories = repo.find_categories(session.owner_id).await?;
            display_categories(&categories);
        }
    }
    Ok(())
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7 && color.starts_with('#') && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}
