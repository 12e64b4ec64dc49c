use anyhow::{anyhow, Result};
use timeblock_core::error::CoreError;
use timeblock_core::repository::Repository;
use uuid::Uuid;

/// Length of the ID prefix shown in tables.
pub const SHORT_ID_LEN: usize = 8;

pub fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..SHORT_ID_LEN].to_string()
}

pub async fn resolve_occurrence_id(repo: &impl Repository, owner_id: Uuid, short_id: &str) -> Result<Uuid> {
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    let occurrences = repo.find_occurrences_by_short_id_prefix(owner_id, short_id).await?;
    match occurrences.as_slice() {
        [single] => Ok(single.id),
        [] => Err(anyhow!(CoreError::NotFound(format!(
            "No block found with ID prefix '{}'",
            short_id
        )))),
        _ => {
            let candidates: Vec<(String, String)> = occurrences
                .into_iter()
                .map(|o| (o.id.to_string(), format!("{} @ {}", o.title, o.planned_start.format("%Y-%m-%d %H:%M"))))
                .collect();
            Err(anyhow!(CoreError::AmbiguousId(candidates)))
        }
    }
}
