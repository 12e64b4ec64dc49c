use chrono_tz::Tz;
use timeblock_core::error::CoreError;
use timeblock_core::timezone::validate_timezone;

/// Detect system timezone
pub fn detect_system_timezone() -> String {
    if let Ok(tz) = std::env::var("TZ") {
        if !tz.is_empty() && validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    if let Ok(tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    "UTC".to_string()
}

const COMMON_TIMEZONES: &[&str] = &[
    "UTC",
    "America/New_York",
    "America/Chicago",
    "America/Denver",
    "America/Los_Angeles",
    "America/Sao_Paulo",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Europe/Istanbul",
    "Asia/Dubai",
    "Asia/Kolkata",
    "Asia/Shanghai",
    "Asia/Tokyo",
    "Australia/Sydney",
    "Pacific/Auckland",
];

/// Common timezones whose name shares a fragment with `invalid`.
pub fn suggest_timezone(invalid: &str) -> Vec<&'static str> {
    let invalid_lower = invalid.to_lowercase();
    let mut matches: Vec<_> = COMMON_TIMEZONES
        .iter()
        .copied()
        .filter(|tz| {
            tz.split('/')
                .any(|part| part.to_lowercase().contains(&invalid_lower) || invalid_lower.contains(&part.to_lowercase()))
        })
        .collect();
    matches.truncate(5);
    matches
}

/// Resolves a configured timezone name, with suggestions when it is unknown.
pub fn resolve_timezone(name: &str) -> Result<Tz, CoreError> {
    validate_timezone(name).map_err(|_| {
        let suggestions = suggest_timezone(name);
        if suggestions.is_empty() {
            CoreError::InvalidTimezone(format!(
                "'{}'. Use IANA names like 'America/New_York'",
                name
            ))
        } else {
            CoreError::InvalidTimezone(format!("'{}'. Did you mean: {}?", name, suggestions.join(", ")))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_timezone() {
        assert_eq!(resolve_timezone("Asia/Tokyo").unwrap(), chrono_tz::Asia::Tokyo);
        match resolve_timezone("Berlin") {
            Err(CoreError::InvalidTimezone(msg)) => assert!(msg.contains("Europe/Berlin")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_detected_timezone_is_valid() {
        assert!(validate_timezone(&detect_system_timezone()).is_ok());
    }
}
