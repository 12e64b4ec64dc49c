//! # Timeblock Core Library
//!
//! The temporal scheduling engine behind a personal time-blocking calendar:
//! it turns user input into absolute time intervals, expands recurring blocks
//! into concrete occurrences, tracks each block through its execution
//! lifecycle, lays overlapping blocks out side by side, and aggregates the
//! history into insights.
//!
//! ## Core Modules
//!
//! - [`timezone`]: Normalization of wall-clock input onto the UTC timeline
//! - [`recurrence`]: Recurrence rules and their bounded expansion
//! - [`lifecycle`]: Status transitions and actual-time bookkeeping
//! - [`layout`]: Column layout for overlapping blocks on a day
//! - [`analytics`]: Trend, category performance, focus balance and observations
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Store contracts and the SQLite implementation
//! - [`planner`]: Use cases wiring the engine to a store
//! - [`db`]: Database connection and migration management
//! - [`error`]: Error types
//!
//! The engine modules (`timezone` through `analytics`) are pure and
//! synchronous. Only `repository`, `planner` and `db` touch storage.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use timeblock_core::{
//!     db,
//!     models::{NewOccurrenceData, PlannedTime},
//!     planner::Planner,
//!     recurrence::{MaterializationConfig, RecurrenceRule},
//!     repository::SqliteRepository,
//! };
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("timeblock.db").await?;
//!     let planner = Planner::new(SqliteRepository::new(pool), MaterializationConfig::default());
//!
//!     let owner = Uuid::nil();
//!     let category = planner.category_or_default(owner, None).await?;
//!     let created = planner
//!         .create_task(
//!             owner,
//!             NewOccurrenceData {
//!                 title: "Morning run".to_string(),
//!                 category_id: category.id,
//!                 start: PlannedTime::from("2024-01-01T07:00"),
//!                 end: PlannedTime::from("2024-01-01T07:45"),
//!                 priority: None,
//!                 recurrence_rule: Some(RecurrenceRule::weekly(1).on_days([1, 3, 5])),
//!             },
//!             chrono_tz::Europe::Berlin,
//!             Utc::now(),
//!         )
//!         .await?;
//!     println!("Planned {} blocks", created.occurrence_count());
//!
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod db;
pub mod error;
pub mod layout;
pub mod lifecycle;
pub mod models;
pub mod planner;
pub mod recurrence;
pub mod repository;
pub mod timezone;
