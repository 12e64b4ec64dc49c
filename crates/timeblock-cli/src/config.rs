use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use timeblock_core::analytics::InsightsConfig;
use timeblock_core::recurrence::MaterializationConfig;
use uuid::Uuid;

use crate::timezone::detect_system_timezone;

pub const CONFIG_FILE: &str = "timeblock.toml";
pub const ENV_PREFIX: &str = "TIMEBLOCK_";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub database_path: String,
    /// IANA timezone used to read and display wall-clock times
    pub timezone: String,
    /// The local user every block belongs to
    pub owner_id: Uuid,
    /// Default tracing filter when `RUST_LOG` is not set
    pub log_level: String,
    pub materialization: MaterializationConfig,
    pub insights: InsightsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "timeblock.db".to_string(),
            timezone: detect_system_timezone(),
            owner_id: Uuid::nil(),
            log_level: "warn".to_string(),
            materialization: MaterializationConfig::default(),
            insights: InsightsConfig::default(),
        }
    }
}

impl Config {
    /// `timeblock.toml` in the working directory, overridden by `TIMEBLOCK_*`
    /// variables. Nested keys use a double underscore, e.g.
    /// `TIMEBLOCK_MATERIALIZATION__HORIZON_DAYS=30`.
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
