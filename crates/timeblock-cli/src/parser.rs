use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use chrono_english::{parse_date_string, Dialect};
use chrono_tz::Tz;
use timeblock_core::recurrence::RecurrenceRule;
use timeblock_core::timezone::{first_of_month, local_date, normalize};

use crate::cli::Frequency;

/// Reads a point in time. Exact forms (`2024-03-04T09:00`, RFC 3339) go
/// through the core normalizer so DST gaps are rejected; anything else
/// (`tomorrow 9am`, `next friday 14:00`) is read as English relative to `now`.
pub fn parse_when(input: &str, tz: Tz, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if let Ok(instant) = normalize(input, tz) {
        return Ok(instant);
    }
    parse_date_string(input.trim(), now.with_timezone(&tz), Dialect::Uk)
        .map(|local| local.with_timezone(&Utc))
        .map_err(|e| anyhow!("Failed to parse time '{}': {}", input, e))
}

/// Reads a calendar day in `tz`.
pub fn parse_date(input: &str, tz: Tz, now: DateTime<Utc>) -> Result<NaiveDate> {
    let today = local_date(now, tz);
    match input.trim().to_lowercase().as_str() {
        "" | "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        "yesterday" => Ok(today - Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .or_else(|_| parse_date_string(other, now.with_timezone(&tz), Dialect::Uk).map(|dt| dt.date_naive()))
            .map_err(|_| anyhow!("Failed to parse date '{}'", input)),
    }
}

/// First day of a `YYYY-MM` month, or of the current local month when absent.
pub fn parse_month(input: Option<&str>, tz: Tz, now: DateTime<Utc>) -> Result<NaiveDate> {
    match input.map(str::trim) {
        None | Some("") => Ok(first_of_month(local_date(now, tz))),
        Some(month) => NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d")
            .map_err(|_| anyhow!("Failed to parse month '{}', expected YYYY-MM", month)),
    }
}

/// Block length like `45`, `45m`, `2h` or `1h30m`. A bare number is minutes.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() {
        bail!("Duration cannot be empty");
    }
    if let Ok(minutes) = trimmed.parse::<i64>() {
        return positive(Duration::minutes(minutes), input);
    }

    let mut total = Duration::zero();
    let mut digits = String::new();
    for c in trimmed.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'h' | 'm' if !digits.is_empty() => {
                let value: i64 = digits.parse()?;
                total = total + if c == 'h' { Duration::hours(value) } else { Duration::minutes(value) };
                digits.clear();
            }
            _ => bail!("Invalid duration '{}'. Use forms like 45m, 2h or 1h30m", input),
        }
    }
    if !digits.is_empty() {
        bail!("Invalid duration '{}'. Missing unit after {}", input, digits);
    }
    positive(total, input)
}

fn positive(duration: Duration, input: &str) -> Result<Duration> {
    if duration <= Duration::zero() {
        bail!("Duration '{}' must be positive", input);
    }
    Ok(duration)
}

/// Comma separated weekdays (`mon,wed,fri`) as 0 = Sunday .. 6 = Saturday.
pub fn parse_weekdays(input: &str) -> Result<Vec<u8>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<Weekday>()
                .map(|day| day.num_days_from_sunday() as u8)
                .map_err(|_| anyhow!("Unknown weekday '{}'", part))
        })
        .collect()
}

/// Builds a rule from the `--every/--interval/--on/--until` flags.
/// `--on` alone implies a weekly rule.
pub fn build_rule(
    every: Option<Frequency>,
    interval: Option<i32>,
    on: Option<&str>,
    until: Option<&str>,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<Option<RecurrenceRule>> {
    let frequency = match (every, on) {
        (Some(frequency), _) => frequency,
        (None, Some(_)) => Frequency::Weekly,
        (None, None) => {
            if interval.is_some() || until.is_some() {
                bail!("--interval and --until need --every or --on");
            }
            return Ok(None);
        }
    };

    let interval = interval.unwrap_or(1);
    let mut rule = match frequency {
        Frequency::Daily => {
            if on.is_some() {
                bail!("--on only applies to weekly blocks");
            }
            RecurrenceRule::daily(interval)
        }
        Frequency::Weekly => RecurrenceRule::weekly(interval),
    };
    if let Some(on) = on {
        rule = rule.on_days(parse_weekdays(on)?);
    }
    if let Some(until) = until {
        rule = rule.until(parse_date(until, tz, now)?);
    }
    Ok(Some(rule))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};
    use rstest::rstest;
    use timeblock_core::recurrence::Frequency as RuleFrequency;

    fn now() -> DateTime<Utc> {
        // Monday
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_when_exact_forms_use_timezone() {
        let berlin = chrono_tz::Europe::Berlin;
        assert_eq!(
            parse_when("2024-03-05T09:00", berlin, now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap()
        );
        assert_eq!(
            parse_when("2024-03-05T09:00:00Z", berlin, now()).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_when_rejects_dst_gap() {
        assert!(parse_when("2024-03-31T02:30", chrono_tz::Europe::Berlin, now()).is_err());
    }

    #[rstest]
    #[case(Some("2024-02"), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())]
    #[case(Some(" 2023-12 "), NaiveDate::from_ymd_opt(2023, 12, 1).unwrap())]
    #[case(None, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())]
    fn test_parse_month(#[case] input: Option<&str>, #[case] expected: NaiveDate) {
        assert_eq!(parse_month(input, Tz::UTC, now()).unwrap(), expected);
    }

    #[rstest]
    #[case("2024-13")]
    #[case("March")]
    #[case("2024-03-04")]
    fn test_parse_month_rejects_other_forms(#[case] input: &str) {
        assert!(parse_month(Some(input), Tz::UTC, now()).is_err());
    }

    #[test]
    fn test_parse_when_english() {
        let parsed = parse_when("next friday 8pm", Tz::UTC, now()).unwrap();
        assert!(parsed > now());
        assert_eq!(parsed.weekday(), Weekday::Fri);
        assert_eq!(parsed.hour(), 20);
        assert!(parse_when("whenever", Tz::UTC, now()).is_err());
    }

    #[rstest]
    #[case("today", NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())]
    #[case("Tomorrow", NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())]
    #[case("yesterday", NaiveDate::from_ymd_opt(2024, 3, 3).unwrap())]
    #[case("2024-12-25", NaiveDate::from_ymd_opt(2024, 12, 25).unwrap())]
    fn test_parse_date(#[case] input: &str, #[case] expected: NaiveDate) {
        assert_eq!(parse_date(input, Tz::UTC, now()).unwrap(), expected);
    }

    #[test]
    fn test_parse_date_follows_local_day() {
        // 12:00 UTC is already the 5th in Auckland
        let date = parse_date("today", chrono_tz::Pacific::Auckland, now()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[rstest]
    #[case("45", 45)]
    #[case("45m", 45)]
    #[case("2h", 120)]
    #[case("1h30m", 90)]
    #[case(" 1H ", 60)]
    fn test_parse_duration(#[case] input: &str, #[case] minutes: i64) {
        assert_eq!(parse_duration(input).unwrap(), Duration::minutes(minutes));
    }

    #[rstest]
    #[case("")]
    #[case("0")]
    #[case("-5")]
    #[case("1x")]
    #[case("1h30")]
    #[case("h")]
    fn test_parse_duration_rejects(#[case] input: &str) {
        assert!(parse_duration(input).is_err());
    }

    #[test]
    fn test_parse_weekdays() {
        assert_eq!(parse_weekdays("mon, wed,Fri").unwrap(), vec![1, 3, 5]);
        assert_eq!(parse_weekdays("sunday,saturday").unwrap(), vec![0, 6]);
        assert!(parse_weekdays("mon,funday").is_err());
    }

    #[test]
    fn test_build_rule_variants() {
        assert_eq!(build_rule(None, None, None, None, Tz::UTC, now()).unwrap(), None);

        let weekly = build_rule(None, Some(2), Some("tue,thu"), Some("2024-04-30"), Tz::UTC, now())
            .unwrap()
            .unwrap();
        assert_eq!(weekly.frequency, RuleFrequency::Weekly);
        assert_eq!(weekly.interval, 2);
        assert_eq!(weekly.days_of_week, vec![2, 4]);
        assert_eq!(weekly.end_date, NaiveDate::from_ymd_opt(2024, 4, 30));

        let daily = build_rule(Some(Frequency::Daily), None, None, None, Tz::UTC, now())
            .unwrap()
            .unwrap();
        assert_eq!(daily, RecurrenceRule::daily(1));
    }

    #[test]
    fn test_build_rule_rejects_inconsistent_flags() {
        assert!(build_rule(Some(Frequency::Daily), None, Some("mon"), None, Tz::UTC, now()).is_err());
        assert!(build_rule(None, Some(2), None, None, Tz::UTC, now()).is_err());
    }
}
