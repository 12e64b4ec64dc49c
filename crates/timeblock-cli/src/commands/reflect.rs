use anyhow::Result;
use dialoguer::Input;
use owo_colors::{OwoColorize, Style};
use timeblock_core::models::Reflection;
use timeblock_core::planner::Planner;
use timeblock_core::repository::Repository;

use crate::cli::ReflectCommand;
use crate::commands::Session;
use crate::util::resolve_occurrence_id;

pub async fn reflect<R: Repository>(planner: &Planner<R>, session: &Session, command: ReflectCommand) -> Result<()> {
    let id = resolve_occurrence_id(planner.repository(), session.owner_id, &command.id).await?;

    let reflection = if command.mood.is_none() && command.value.is_none() {
        prompt_reflection()?
    } else {
        Reflection {
            mood: command.mood,
            value: command.value,
        }
    };

    let occurrence = planner.reflect(id, reflection).await?;
    println!(
        "{} Saved reflection for '{}'",
        "✓".style(Style::new().green().bold()),
        occurrence.title
    );
    Ok(())
}

fn prompt_reflection() -> Result<Reflection> {
    let mood: String = Input::new()
        .with_prompt("How did it feel?")
        .allow_empty(true)
        .interact_text()?;
    let value: String = Input::new()
        .with_prompt("What was it worth?")
        .allow_empty(true)
        .interact_text()?;

    let non_empty = |s: String| (!s.trim().is_empty()).then(|| s.trim().to_string());
    Ok(Reflection {
        mood: non_empty(mood),
        value: non_empty(value),
    })
}
