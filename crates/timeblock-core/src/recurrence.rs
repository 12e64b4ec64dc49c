use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::timezone::{local_date, local_midnight, localize_lenient};

/// Recurrence frequency
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
        }
    }
}

fn default_interval() -> i32 {
    1
}

/// A repeat rule as persisted on the head of a series.
///
/// The serialized form is the stored blob, e.g.
/// `{"frequency":"weekly","interval":1,"days_of_week":[1,3],"end_date":"2024-01-31"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Every N days/weeks. Values below 1 are kept as supplied and coerced to
    /// 1 when the rule is expanded.
    #[serde(default = "default_interval")]
    pub interval: i32,
    /// Weekday indices, 0 = Sunday through 6 = Saturday. Only meaningful for
    /// weekly rules.
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    /// Last calendar day (UTC) on which an occurrence may start.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceRule {
    pub fn daily(interval: i32) -> Self {
        Self {
            frequency: Frequency::Daily,
            interval,
            days_of_week: Vec::new(),
            end_date: None,
        }
    }

    pub fn weekly(interval: i32) -> Self {
        Self {
            frequency: Frequency::Weekly,
            ..Self::daily(interval)
        }
    }

    pub fn on_days(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_week = days.into_iter().collect();
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Rejects weekday indices outside 0..=6.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(day) = self.days_of_week.iter().find(|day| **day > 6) {
            return Err(CoreError::InvalidInput(format!(
                "day of week {} is out of range (0 = Sunday .. 6 = Saturday)",
                day
            )));
        }
        Ok(())
    }

    /// The rule the expander works with: interval at least 1, weekdays sorted,
    /// de-duplicated and dropped for daily rules.
    pub fn normalized(&self) -> Self {
        let mut days: Vec<u8> = match self.frequency {
            Frequency::Daily => Vec::new(),
            Frequency::Weekly => self.days_of_week.iter().copied().filter(|d| *d <= 6).collect(),
        };
        days.sort_unstable();
        days.dedup();

        Self {
            frequency: self.frequency,
            interval: self.interval.max(1),
            days_of_week: days,
            end_date: self.end_date,
        }
    }

    /// Last instant covered by `end_date`, inclusive of the whole local day in `tz`.
    pub fn end_bound(&self, tz: Tz) -> Option<DateTime<Utc>> {
        self.end_date.map(|date| match date.succ_opt() {
            Some(next) => local_midnight(next, tz) - Duration::nanoseconds(1),
            None => DateTime::<Utc>::MAX_UTC,
        })
    }

    /// Calendar days between consecutive periods.
    fn step_days(&self) -> u64 {
        let interval = u64::from(self.interval.max(1).unsigned_abs());
        match self.frequency {
            Frequency::Daily => interval,
            Frequency::Weekly => interval * 7,
        }
    }

    pub fn to_blob(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_blob(blob: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(blob)?)
    }
}

/// Configuration for materialization behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializationConfig {
    /// How far past "now" recurring occurrences are ever generated, in days.
    pub horizon_days: i64,
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self { horizon_days: 90 }
    }
}

impl MaterializationConfig {
    /// Longest horizon honored; larger configured values are clamped to it.
    pub const MAX_HORIZON_DAYS: i64 = 366 * 100;

    pub fn horizon(&self) -> Duration {
        Duration::try_days(self.horizon_days.clamp(0, Self::MAX_HORIZON_DAYS)).unwrap_or(Duration::zero())
    }
}

enum Cursor {
    /// Plain stepping by the rule's interval. `None` once the calendar runs out.
    Fixed { next: Option<NaiveDate> },
    /// Week-by-week stepping, emitting the listed weekdays of each week.
    Weekdays {
        week_start: Option<NaiveDate>,
        days: Vec<u8>,
        position: usize,
    },
    Done,
}

enum Advance {
    Emit(DateTime<Utc>),
    Skip,
    Finish,
}

/// Finite, single-pass sequence of occurrence starts generated by a rule.
///
/// Dates are stepped on the local calendar of the expansion timezone and
/// keep the anchor's local time of day. Every item is strictly after the
/// anchor and at or before the effective end.
pub struct Occurrences {
    anchor: DateTime<Utc>,
    end: DateTime<Utc>,
    /// Local dates after this one cannot reach `end`.
    last_date: NaiveDate,
    tz: Tz,
    time_of_day: NaiveTime,
    step: Days,
    cursor: Cursor,
}

impl Occurrences {
    fn new(anchor: DateTime<Utc>, rule: &RecurrenceRule, end: DateTime<Utc>, tz: Tz) -> Self {
        let local = anchor.with_timezone(&tz);
        let anchor_date = local.date_naive();
        let step = Days::new(rule.step_days());

        let cursor = if rule.days_of_week.is_empty() {
            Cursor::Fixed {
                next: anchor_date.checked_add_days(step),
            }
        } else {
            // local Sunday of the anchor's week
            let offset = u64::from(anchor_date.weekday().num_days_from_sunday());
            Cursor::Weekdays {
                week_start: anchor_date.checked_sub_days(Days::new(offset)),
                days: rule.days_of_week.clone(),
                position: 0,
            }
        };

        Self {
            anchor,
            end,
            // a day of slack for DST shifts around the end instant
            last_date: local_date(end, tz).succ_opt().unwrap_or(NaiveDate::MAX),
            tz,
            time_of_day: local.time(),
            step,
            cursor,
        }
    }

    /// Upper bound the sequence never passes.
    pub fn effective_end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `Some(instant)` when `date` may still fall inside the bound.
    fn at(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        if date > self.last_date {
            return None;
        }
        let instant = localize_lenient(date.and_time(self.time_of_day), self.tz);
        (instant <= self.end).then_some(instant)
    }

    fn advance(&mut self) -> Advance {
        match &self.cursor {
            Cursor::Done => Advance::Finish,
            Cursor::Fixed { next: None } => Advance::Finish,
            Cursor::Fixed { next: Some(date) } => {
                let date = *date;
                let Some(candidate) = self.at(date) else {
                    return Advance::Finish;
                };
                self.cursor = Cursor::Fixed {
                    next: date.checked_add_days(self.step),
                };
                Advance::Emit(candidate)
            }
            Cursor::Weekdays { week_start: None, .. } => Advance::Finish,
            Cursor::Weekdays {
                week_start: Some(week_start),
                days,
                position,
            } => {
                let (week_start, position) = (*week_start, *position);
                let Some(day) = days.get(position).copied() else {
                    let days = days.clone();
                    self.cursor = Cursor::Weekdays {
                        week_start: week_start.checked_add_days(self.step),
                        days,
                        position: 0,
                    };
                    return Advance::Skip;
                };
                if let Cursor::Weekdays { position, .. } = &mut self.cursor {
                    *position += 1;
                }

                // days are ascending and later weeks only move further out
                let Some(candidate) = week_start
                    .checked_add_days(Days::new(u64::from(day)))
                    .and_then(|date| self.at(date))
                else {
                    return Advance::Finish;
                };
                if candidate <= self.anchor {
                    Advance::Skip
                } else {
                    Advance::Emit(candidate)
                }
            }
        }
    }
}

impl Iterator for Occurrences {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.advance() {
                Advance::Emit(instant) => return Some(instant),
                Advance::Skip => continue,
                Advance::Finish => {
                    self.cursor = Cursor::Done;
                    return None;
                }
            }
        }
    }
}

/// The earlier of the rule's end date (a local day in `tz`) and `now + horizon_cap`.
pub fn effective_end_in(rule: &RecurrenceRule, now: DateTime<Utc>, horizon_cap: Duration, tz: Tz) -> DateTime<Utc> {
    let horizon = now.checked_add_signed(horizon_cap).unwrap_or(DateTime::<Utc>::MAX_UTC);
    match rule.end_date {
        // only dates up to the horizon can tighten it
        Some(end_date) if end_date <= local_date(horizon, tz) => {
            rule.end_bound(tz).map_or(horizon, |bound| bound.min(horizon))
        }
        _ => horizon,
    }
}

/// [`effective_end_in`] on the UTC calendar.
pub fn effective_end(rule: &RecurrenceRule, now: DateTime<Utc>, horizon_cap: Duration) -> DateTime<Utc> {
    effective_end_in(rule, now, horizon_cap, Tz::UTC)
}

/// Start instants generated by `rule` after `anchor_start`, bounded by the
/// effective end. Weekdays and the end date are read on the local calendar
/// of `tz`. The anchor itself is never included.
pub fn expand_in(
    anchor_start: DateTime<Utc>,
    rule: &RecurrenceRule,
    now: DateTime<Utc>,
    horizon_cap: Duration,
    tz: Tz,
) -> Vec<DateTime<Utc>> {
    if rule.interval < 1 {
        warn!(interval = rule.interval, "coercing recurrence interval to 1");
    }
    let rule = rule.normalized();
    let end = effective_end_in(&rule, now, horizon_cap, tz);
    Occurrences::new(anchor_start, &rule, end, tz).collect()
}

/// [`expand_in`] on the UTC calendar.
pub fn expand(
    anchor_start: DateTime<Utc>,
    rule: &RecurrenceRule,
    now: DateTime<Utc>,
    horizon_cap: Duration,
) -> Vec<DateTime<Utc>> {
    expand_in(anchor_start, rule, now, horizon_cap, Tz::UTC)
}

/// Expands rules against a fixed materialization horizon, independent of
/// how many instances any one caller wants, on the calendar of one timezone.
#[derive(Debug, Clone)]
pub struct RecurrenceExpander {
    config: MaterializationConfig,
    tz: Tz,
}

impl Default for RecurrenceExpander {
    fn default() -> Self {
        Self::new(MaterializationConfig::default(), Tz::UTC)
    }
}

impl RecurrenceExpander {
    pub fn new(config: MaterializationConfig, tz: Tz) -> Self {
        Self { config, tz }
    }

    pub fn config(&self) -> &MaterializationConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn effective_end(&self, rule: &RecurrenceRule, now: DateTime<Utc>) -> DateTime<Utc> {
        effective_end_in(&rule.normalized(), now, self.config.horizon(), self.tz)
    }

    /// Lazily generated starts; see [`expand`](Self::expand) for the eager form.
    pub fn occurrences(&self, anchor_start: DateTime<Utc>, rule: &RecurrenceRule, now: DateTime<Utc>) -> Occurrences {
        let rule = rule.normalized();
        let end = effective_end_in(&rule, now, self.config.horizon(), self.tz);
        Occurrences::new(anchor_start, &rule, end, self.tz)
    }

    pub fn expand(&self, anchor_start: DateTime<Utc>, rule: &RecurrenceRule, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let starts = expand_in(anchor_start, rule, now, self.config.horizon(), self.tz);
        debug!(
            frequency = %rule.frequency,
            tz = %self.tz,
            generated = starts.len(),
            "expanded recurrence rule"
        );
        starts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};
    use proptest::prelude::*;
    use rstest::rstest;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap()
    }

    const NINETY_DAYS: i64 = 90;

    fn horizon() -> Duration {
        Duration::days(NINETY_DAYS)
    }

    mod expansion_tests {
        use super::*;

        #[test]
        fn test_daily_until_end_date() {
            let anchor = utc(2024, 1, 1, 10, 0);
            let rule = RecurrenceRule::daily(1).until(date(2024, 1, 4));

            let starts = expand(anchor, &rule, anchor, horizon());

            assert_eq!(
                starts,
                vec![utc(2024, 1, 2, 10, 0), utc(2024, 1, 3, 10, 0), utc(2024, 1, 4, 10, 0)]
            );
        }

        #[test]
        fn test_weekly_without_days_steps_whole_weeks() {
            let anchor = utc(2024, 1, 1, 8, 30);
            let rule = RecurrenceRule::weekly(2).until(date(2024, 2, 12));

            let starts = expand(anchor, &rule, anchor, horizon());

            assert_eq!(
                starts,
                vec![utc(2024, 1, 15, 8, 30), utc(2024, 1, 29, 8, 30), utc(2024, 2, 12, 8, 30)]
            );
        }

        #[test]
        fn test_monday_wednesday_never_skips_a_week() {
            // 2024-01-01 is a Monday
            let anchor = utc(2024, 1, 1, 7, 0);
            assert_eq!(anchor.weekday(), Weekday::Mon);
            let rule = RecurrenceRule::weekly(1).on_days([3, 1]).until(date(2024, 1, 17));

            let starts = expand(anchor, &rule, anchor, horizon());

            assert_eq!(
                starts,
                vec![
                    utc(2024, 1, 3, 7, 0),
                    utc(2024, 1, 8, 7, 0),
                    utc(2024, 1, 10, 7, 0),
                    utc(2024, 1, 15, 7, 0),
                    utc(2024, 1, 17, 7, 0),
                ]
            );
        }

        #[test]
        fn test_weekdays_with_interval_skip_off_weeks() {
            // Tuesday anchor, every other week on Sunday and Friday
            let anchor = utc(2024, 1, 2, 18, 0);
            let rule = RecurrenceRule::weekly(2).on_days([0, 5]).until(date(2024, 1, 31));

            let starts = expand(anchor, &rule, anchor, horizon());

            // week of Dec 31: Sunday is before the anchor, Friday Jan 5 counts;
            // next eligible week starts Jan 14, then Jan 28
            assert_eq!(
                starts,
                vec![
                    utc(2024, 1, 5, 18, 0),
                    utc(2024, 1, 14, 18, 0),
                    utc(2024, 1, 19, 18, 0),
                    utc(2024, 1, 28, 18, 0),
                ]
            );
        }

        #[test]
        fn test_anchor_is_never_reemitted() {
            let anchor = utc(2024, 1, 1, 9, 0); // Monday
            let rule = RecurrenceRule::weekly(1).on_days([1]).until(date(2024, 1, 8));

            let starts = expand(anchor, &rule, anchor, horizon());

            assert_eq!(starts, vec![utc(2024, 1, 8, 9, 0)]);
        }

        #[test]
        fn test_days_with_no_match_in_range_is_empty() {
            let anchor = utc(2024, 1, 1, 9, 0); // Monday
            let rule = RecurrenceRule::weekly(1).on_days([6]).until(date(2024, 1, 5));

            assert!(expand(anchor, &rule, anchor, horizon()).is_empty());
        }

        #[test]
        fn test_end_date_before_anchor_is_empty() {
            let anchor = utc(2024, 3, 1, 9, 0);
            let rule = RecurrenceRule::daily(1).until(date(2024, 2, 1));

            assert!(expand(anchor, &rule, anchor, horizon()).is_empty());
        }

        #[rstest]
        #[case(0)]
        #[case(-3)]
        fn test_interval_below_one_is_coerced(#[case] interval: i32) {
            let anchor = utc(2024, 1, 1, 6, 0);
            let rule = RecurrenceRule::daily(interval).until(date(2024, 1, 3));

            let starts = expand(anchor, &rule, anchor, horizon());

            assert_eq!(starts, vec![utc(2024, 1, 2, 6, 0), utc(2024, 1, 3, 6, 0)]);
        }

        #[test]
        fn test_horizon_caps_open_ended_rules() {
            let anchor = utc(2024, 1, 1, 12, 0);
            let now = anchor;
            let rule = RecurrenceRule::daily(1);

            let starts = expand(anchor, &rule, now, Duration::days(10));

            assert_eq!(starts.len(), 10);
            assert_eq!(starts.last().copied(), Some(utc(2024, 1, 11, 12, 0)));
        }

        #[test]
        fn test_horizon_wins_over_distant_end_date() {
            let anchor = utc(2024, 1, 1, 12, 0);
            let rule = RecurrenceRule::daily(7).until(date(2099, 12, 31));

            let starts = expand(anchor, &rule, anchor, Duration::days(30));

            assert_eq!(starts.len(), 4);
        }

        #[test]
        fn test_daily_rule_ignores_weekdays() {
            let anchor = utc(2024, 1, 1, 12, 0);
            let rule = RecurrenceRule::daily(1).on_days([5]).until(date(2024, 1, 3));

            let starts = expand(anchor, &rule, anchor, horizon());

            assert_eq!(starts, vec![utc(2024, 1, 2, 12, 0), utc(2024, 1, 3, 12, 0)]);
        }

        #[test]
        fn test_iterator_is_lazy_and_single_pass() {
            let expander = RecurrenceExpander::default();
            let anchor = utc(2024, 1, 1, 12, 0);
            let mut occurrences = expander.occurrences(anchor, &RecurrenceRule::daily(1), anchor);

            assert_eq!(occurrences.effective_end(), anchor + Duration::days(90));
            assert_eq!(occurrences.next(), Some(utc(2024, 1, 2, 12, 0)));
            assert_eq!(occurrences.by_ref().count(), 89);
            assert_eq!(occurrences.next(), None);
        }

        #[test]
        fn test_huge_daily_interval_ends_the_sequence() {
            let anchor = utc(2024, 1, 1, 12, 0);
            let rule = RecurrenceRule::daily(200_000_000);

            assert!(expand(anchor, &rule, anchor, horizon()).is_empty());
        }

        #[test]
        fn test_huge_weekly_interval_keeps_the_first_week() {
            let anchor = utc(2024, 1, 1, 12, 0); // Monday
            let rule = RecurrenceRule::weekly(i32::MAX).on_days([1, 3]);

            let starts = expand(anchor, &rule, anchor, horizon());

            assert_eq!(starts, vec![utc(2024, 1, 3, 12, 0)]);
        }

        #[test]
        fn test_unbounded_horizon_near_calendar_end() {
            let anchor = utc(2024, 1, 1, 12, 0);
            let rule = RecurrenceRule::weekly(i32::MAX);

            assert!(expand(anchor, &rule, anchor, Duration::MAX).is_empty());
            assert_eq!(effective_end(&rule, anchor, Duration::MAX), DateTime::<Utc>::MAX_UTC);
        }

        #[test]
        fn test_expander_with_absurd_horizon_is_clamped() {
            let expander = RecurrenceExpander::new(
                MaterializationConfig {
                    horizon_days: i64::MAX,
                },
                Tz::UTC,
            );
            let anchor = utc(2024, 1, 1, 12, 0);

            let mut occurrences = expander.occurrences(anchor, &RecurrenceRule::weekly(6_000), anchor);

            assert_eq!(occurrences.next(), None);
            assert!(occurrences.effective_end() < DateTime::<Utc>::MAX_UTC);
        }

        #[test]
        fn test_weekdays_follow_local_calendar() {
            let tokyo = chrono_tz::Asia::Tokyo;
            // Monday 08:00 in Tokyo is still Sunday in UTC
            let anchor = crate::timezone::normalize("2024-01-08T08:00", tokyo).unwrap();
            assert_eq!(anchor.weekday(), Weekday::Sun);
            let rule = RecurrenceRule::weekly(1).on_days([1, 3]).until(date(2024, 1, 15));

            let starts = expand_in(anchor, &rule, anchor, horizon(), tokyo);

            let local: Vec<_> = starts.iter().map(|s| s.with_timezone(&tokyo).naive_local()).collect();
            assert_eq!(
                local,
                vec![
                    date(2024, 1, 10).and_hms_opt(8, 0, 0).unwrap(),
                    date(2024, 1, 15).and_hms_opt(8, 0, 0).unwrap(),
                ]
            );
        }

        #[test]
        fn test_local_time_of_day_survives_dst_change() {
            let new_york = chrono_tz::America::New_York;
            let anchor = crate::timezone::normalize("2024-03-09T09:00", new_york).unwrap();
            let rule = RecurrenceRule::daily(1).until(date(2024, 3, 11));
            let expander = RecurrenceExpander::new(MaterializationConfig::default(), new_york);

            let starts = expander.expand(anchor, &rule, anchor);

            // EST before the switch on Mar 10, EDT after
            assert_eq!(starts, vec![utc(2024, 3, 10, 13, 0), utc(2024, 3, 11, 13, 0)]);
            assert_eq!(anchor, utc(2024, 3, 9, 14, 0));
        }

        proptest! {
            #[test]
            fn prop_fixed_stepping_is_exact_and_bounded(
                interval in 1i32..10,
                weekly in any::<bool>(),
                anchor_offset_hours in 0i64..(24 * 365),
                end_offset_days in 0i64..200,
                horizon_days in 1i64..120,
            ) {
                let anchor = utc(2024, 1, 1, 0, 0) + Duration::hours(anchor_offset_hours);
                let now = anchor;
                let base = if weekly { RecurrenceRule::weekly(interval) } else { RecurrenceRule::daily(interval) };
                let rule = base.until((anchor + Duration::days(end_offset_days)).date_naive());
                let step = if weekly { Duration::weeks(i64::from(interval)) } else { Duration::days(i64::from(interval)) };
                let end = effective_end(&rule, now, Duration::days(horizon_days));

                let starts = expand(anchor, &rule, now, Duration::days(horizon_days));

                for pair in starts.windows(2) {
                    prop_assert_eq!(pair[1] - pair[0], step);
                }
                for start in &starts {
                    prop_assert!(*start > anchor);
                    prop_assert!(*start <= end);
                }
                if let Some(last) = starts.last() {
                    prop_assert!(*last + step > end);
                } else {
                    prop_assert!(anchor + step > end);
                }
            }
        }
    }

    mod rule_tests {
        use super::*;

        #[test]
        fn test_blob_round_trip() {
            let rule = RecurrenceRule::weekly(2).on_days([1, 3]).until(date(2024, 1, 31));

            let blob = rule.to_blob().unwrap();
            assert_eq!(
                blob,
                r#"{"frequency":"weekly","interval":2,"days_of_week":[1,3],"end_date":"2024-01-31"}"#
            );
            assert_eq!(RecurrenceRule::from_blob(&blob).unwrap(), rule);
        }

        #[test]
        fn test_blob_round_trip_keeps_uncoerced_interval() {
            let rule = RecurrenceRule::daily(0);
            let decoded = RecurrenceRule::from_blob(&rule.to_blob().unwrap()).unwrap();
            assert_eq!(decoded, rule);
        }

        #[test]
        fn test_blob_defaults() {
            let rule = RecurrenceRule::from_blob(r#"{"frequency":"daily"}"#).unwrap();
            assert_eq!(rule, RecurrenceRule::daily(1));
        }

        #[test]
        fn test_blob_rejects_unknown_frequency() {
            assert!(matches!(
                RecurrenceRule::from_blob(r#"{"frequency":"monthly","interval":1}"#),
                Err(CoreError::Serialization(_))
            ));
        }

        #[test]
        fn test_validate_day_range() {
            assert!(RecurrenceRule::weekly(1).on_days([0, 6]).validate().is_ok());
            assert!(matches!(
                RecurrenceRule::weekly(1).on_days([7]).validate(),
                Err(CoreError::InvalidInput(_))
            ));
        }

        #[test]
        fn test_normalized() {
            let rule = RecurrenceRule::weekly(-1).on_days([5, 1, 5, 9]).normalized();
            assert_eq!(rule.interval, 1);
            assert_eq!(rule.days_of_week, vec![1, 5]);
        }

        #[test]
        fn test_end_bound_covers_whole_day() {
            let rule = RecurrenceRule::daily(1).until(date(2024, 1, 4));
            let bound = rule.end_bound(Tz::UTC).unwrap();
            assert!(bound > utc(2024, 1, 4, 23, 59));
            assert!(bound < utc(2024, 1, 5, 0, 0));
        }

        #[test]
        fn test_end_bound_follows_local_day() {
            let rule = RecurrenceRule::daily(1).until(date(2024, 1, 4));
            let bound = rule.end_bound(chrono_tz::Asia::Tokyo).unwrap();
            // local midnight of Jan 5 in Tokyo is 15:00 UTC on Jan 4
            assert!(bound > utc(2024, 1, 4, 14, 59));
            assert!(bound < utc(2024, 1, 4, 15, 0));
        }

        #[test]
        fn test_end_bound_on_last_representable_date() {
            let rule = RecurrenceRule::daily(1).until(NaiveDate::MAX);
            assert_eq!(rule.end_bound(Tz::UTC), Some(DateTime::<Utc>::MAX_UTC));
        }

        #[rstest]
        #[case(-5, 0)]
        #[case(3, 3)]
        #[case(i64::MAX, MaterializationConfig::MAX_HORIZON_DAYS)]
        fn test_horizon_is_clamped(#[case] configured: i64, #[case] expected_days: i64) {
            let config = MaterializationConfig {
                horizon_days: configured,
            };
            assert_eq!(config.horizon(), Duration::days(expected_days));
        }

        #[test]
        fn test_expander_uses_configured_horizon() {
            let expander = RecurrenceExpander::new(MaterializationConfig { horizon_days: 3 }, Tz::UTC);
            let anchor = utc(2024, 1, 1, 12, 0);

            assert_eq!(expander.expand(anchor, &RecurrenceRule::daily(1), anchor).len(), 3);
            assert_eq!(
                expander.effective_end(&RecurrenceRule::daily(1), anchor),
                utc(2024, 1, 4, 12, 0)
            );
        }
    }
}
