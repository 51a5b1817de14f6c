use std::{str::FromStr, time::Duration};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a strictly positive number from an optional string. Missing, malformed or zero values yield `None`, so that
/// callers can log the problem and fall back to their own default.
pub fn parse_positive<T>(value: Option<&str>) -> Option<T>
where T: FromStr + PartialOrd + Default {
    value.and_then(|s| s.trim().parse::<T>().ok()).filter(|v| *v > T::default())
}

/// Parse a whole number of seconds into a [`Duration`]. Zero is a valid value here (e.g. to disable a grace period).
pub fn parse_seconds(value: Option<&str>) -> Option<Duration> {
    value.and_then(|s| s.trim().parse::<u64>().ok()).map(Duration::from_secs)
}
