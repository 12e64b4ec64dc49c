//! Status transitions of a single occurrence and the actual-time bookkeeping
//! each one triggers.
//!
//! ```text
//! Planned ──► Active ──► Completed
//!    │           │
//!    ├───────────┴─────► Skipped
//!    └─────────────────► Completed
//! ```
//!
//! Nothing here is time-driven: a `Planned` block that is never touched stays
//! `Planned`.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::CoreError;
use crate::models::{Occurrence, Reflection, TaskStatus, UpdateOccurrenceData};

impl TaskStatus {
    pub fn can_transition_to(self, target: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, target),
            (Planned, Active) | (Planned, Completed) | (Planned, Skipped) | (Active, Completed) | (Active, Skipped)
        )
    }

    /// `Completed` and `Skipped` have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Skipped)
    }
}

/// Fields a transition writes. Built without touching the occurrence so a
/// rejected transition leaves it exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: TaskStatus,
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
}

impl StatusChange {
    pub fn apply(&self, occurrence: &mut Occurrence) {
        occurrence.status = self.status;
        occurrence.actual_start = self.actual_start;
        occurrence.actual_end = self.actual_end;
    }

    pub fn into_update(self) -> UpdateOccurrenceData {
        UpdateOccurrenceData {
            status: Some(self.status),
            actual_start: self.actual_start,
            actual_end: self.actual_end,
            ..Default::default()
        }
    }
}

/// Computes the result of moving `occurrence` to `target` at instant `at`.
pub fn transition(occurrence: &Occurrence, target: TaskStatus, at: DateTime<Utc>) -> Result<StatusChange, CoreError> {
    let from = occurrence.status;
    if !from.can_transition_to(target) {
        warn!(id = %occurrence.id, %from, to = %target, "rejected status transition");
        return Err(CoreError::StateTransitionRejected { from, to: target });
    }

    let mut change = StatusChange {
        status: target,
        actual_start: occurrence.actual_start,
        actual_end: occurrence.actual_end,
    };

    match target {
        TaskStatus::Active => {
            change.actual_start.get_or_insert(at);
        }
        TaskStatus::Completed => {
            change.actual_end = Some(at);
            // completed without ever being started: assume it ran as planned
            change.actual_start.get_or_insert(occurrence.planned_start);
        }
        TaskStatus::Skipped | TaskStatus::Planned => {}
    }

    info!(id = %occurrence.id, %from, to = %target, "status transition");
    Ok(change)
}

/// Validates a reflection for `occurrence`. Only completed blocks can be reflected on.
pub fn set_reflection(occurrence: &Occurrence, reflection: Reflection) -> Result<Reflection, CoreError> {
    if occurrence.status != TaskStatus::Completed {
        return Err(CoreError::InvalidStateForReflection(occurrence.status));
    }
    if reflection.is_empty() {
        return Err(CoreError::InvalidInput(
            "a reflection needs a mood or a value".to_string(),
        ));
    }
    Ok(reflection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;
    use uuid::Uuid;

    fn planned_at_nine() -> Occurrence {
        let start = Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap();
        Occurrence::planned(Uuid::now_v7(), Uuid::now_v7(), "Write report", start, start + Duration::hours(1))
    }

    fn with_status(status: TaskStatus) -> Occurrence {
        let mut occurrence = planned_at_nine();
        occurrence.status = status;
        occurrence
    }

    #[rstest]
    #[case(TaskStatus::Planned, TaskStatus::Active, true)]
    #[case(TaskStatus::Planned, TaskStatus::Completed, true)]
    #[case(TaskStatus::Planned, TaskStatus::Skipped, true)]
    #[case(TaskStatus::Active, TaskStatus::Completed, true)]
    #[case(TaskStatus::Active, TaskStatus::Skipped, true)]
    #[case(TaskStatus::Planned, TaskStatus::Planned, false)]
    #[case(TaskStatus::Active, TaskStatus::Active, false)]
    #[case(TaskStatus::Active, TaskStatus::Planned, false)]
    #[case(TaskStatus::Completed, TaskStatus::Planned, false)]
    #[case(TaskStatus::Completed, TaskStatus::Active, false)]
    #[case(TaskStatus::Completed, TaskStatus::Skipped, false)]
    #[case(TaskStatus::Skipped, TaskStatus::Planned, false)]
    #[case(TaskStatus::Skipped, TaskStatus::Completed, false)]
    fn test_transition_table(#[case] from: TaskStatus, #[case] to: TaskStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
        let result = transition(&with_status(from), to, Utc::now());
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn test_rejected_transition_reports_both_states() {
        let occurrence = with_status(TaskStatus::Skipped);
        let before = occurrence.clone();

        let err = transition(&occurrence, TaskStatus::Active, Utc::now()).unwrap_err();

        assert!(matches!(
            err,
            CoreError::StateTransitionRejected {
                from: TaskStatus::Skipped,
                to: TaskStatus::Active
            }
        ));
        assert_eq!(occurrence, before);
    }

    #[test]
    fn test_start_records_actual_start() {
        let occurrence = planned_at_nine();
        let at = occurrence.planned_start + Duration::minutes(7);

        let change = transition(&occurrence, TaskStatus::Active, at).unwrap();

        assert_eq!(change.status, TaskStatus::Active);
        assert_eq!(change.actual_start, Some(at));
        assert_eq!(change.actual_end, None);
    }

    #[test]
    fn test_start_keeps_existing_actual_start() {
        let mut occurrence = planned_at_nine();
        let earlier = occurrence.planned_start - Duration::minutes(5);
        occurrence.actual_start = Some(earlier);

        let change = transition(&occurrence, TaskStatus::Active, Utc::now()).unwrap();

        assert_eq!(change.actual_start, Some(earlier));
    }

    #[test]
    fn test_complete_without_start_backfills_planned_start() {
        let occurrence = planned_at_nine();
        let at = occurrence.planned_end + Duration::minutes(20);

        let change = transition(&occurrence, TaskStatus::Completed, at).unwrap();

        assert_eq!(change.actual_start, Some(occurrence.planned_start));
        assert_eq!(change.actual_end, Some(at));
    }

    #[test]
    fn test_start_then_complete() {
        let mut occurrence = planned_at_nine();
        let started = occurrence.planned_start + Duration::minutes(3);
        let finished = occurrence.planned_start + Duration::minutes(58);

        transition(&occurrence, TaskStatus::Active, started).unwrap().apply(&mut occurrence);
        transition(&occurrence, TaskStatus::Completed, finished).unwrap().apply(&mut occurrence);

        assert_eq!(occurrence.status, TaskStatus::Completed);
        assert_eq!(occurrence.actual_start, Some(started));
        assert_eq!(occurrence.actual_end, Some(finished));
        assert_eq!(occurrence.actual_duration(), Some(Duration::minutes(55)));
    }

    #[test]
    fn test_skip_leaves_actual_times_alone() {
        let mut occurrence = with_status(TaskStatus::Active);
        let started = occurrence.planned_start;
        occurrence.actual_start = Some(started);

        let change = transition(&occurrence, TaskStatus::Skipped, Utc::now()).unwrap();

        assert_eq!(change.actual_start, Some(started));
        assert_eq!(change.actual_end, None);
    }

    #[test]
    fn test_into_update_carries_status_and_actuals() {
        let occurrence = planned_at_nine();
        let at = occurrence.planned_start;
        let update = transition(&occurrence, TaskStatus::Active, at).unwrap().into_update();

        assert_eq!(update.status, Some(TaskStatus::Active));
        assert_eq!(update.actual_start, Some(at));
        assert!(update.title.is_none());
    }

    #[rstest]
    #[case(TaskStatus::Planned)]
    #[case(TaskStatus::Active)]
    #[case(TaskStatus::Skipped)]
    fn test_reflection_requires_completed(#[case] status: TaskStatus) {
        let reflection = Reflection {
            mood: Some("focused".to_string()),
            value: None,
        };
        let err = set_reflection(&with_status(status), reflection).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateForReflection(s) if s == status));
    }

    #[test]
    fn test_reflection_on_completed() {
        let reflection = Reflection {
            mood: Some("calm".to_string()),
            value: Some("high".to_string()),
        };
        let accepted = set_reflection(&with_status(TaskStatus::Completed), reflection.clone()).unwrap();
        assert_eq!(accepted, reflection);

        assert!(matches!(
            set_reflection(&with_status(TaskStatus::Completed), Reflection::default()),
            Err(CoreError::InvalidInput(_))
        ));
    }
}
