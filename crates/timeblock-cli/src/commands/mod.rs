use chrono_tz::Tz;
use timeblock_core::analytics::InsightsConfig;
use uuid::Uuid;

pub mod add;
pub mod agenda;
pub mod category;
pub mod day;
pub mod edit;
pub mod insights;
pub mod reflect;
pub mod status;
pub mod template;

/// Who is planning and which wall clock they read.
#[derive(Debug, Clone)]
pub struct Session {
    pub owner_id: Uuid,
    pub tz: Tz,
    pub insights: InsightsConfig,
}
