//! Interval text parsing.
//!
//! Intervals are written as one or more `<integer><unit>` pairs with no
//! separators, e.g. `45m`, `1h30m`, `2d4h`. Units are `s`, `m`, `h` and `d`
//! (case-insensitive). Input is either parsed completely or rejected.

use thiserror::Error;

/// Seconds per minute.
const MINUTE: u64 = 60;
/// Seconds per hour.
const HOUR: u64 = 60 * MINUTE;
/// Seconds per day.
const DAY: u64 = 24 * HOUR;

/// Reasons an interval string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    /// Nothing left after trimming.
    #[error("interval is empty")]
    Empty,

    /// Text does not match `(<digits><unit>)+`.
    #[error("invalid interval '{0}': use combinations like '1h30m', '2d4h' or '45m'")]
    InvalidFormat(String),

    /// The total does not fit in 64 bits of seconds.
    #[error("interval '{0}' is too large")]
    Overflow(String),

    /// The pairs add up to zero seconds.
    #[error("interval must be at least one second")]
    Zero,
}

/// Seconds represented by one unit character.
const fn unit_seconds(unit: char) -> Option<u64> {
    match unit {
        's' => Some(1),
        'm' => Some(MINUTE),
        'h' => Some(HOUR),
        'd' => Some(DAY),
        _ => None,
    }
}

/// Parses an interval such as `1h30m` into seconds.
///
/// # Errors
///
/// Returns an error if the input is empty, contains anything other than
/// `<digits><unit>` pairs, overflows, or totals zero seconds.
///
/// # Examples
///
/// ```
/// use foldwatch::interval::parse_interval;
///
/// assert_eq!(parse_interval("1h30m").unwrap(), 5400);
/// assert_eq!(parse_interval(" 2D ").unwrap(), 172_800);
/// assert!(parse_interval("1x").is_err());
/// ```
pub fn parse_interval(input: &str) -> Result<u64, IntervalError> {
    let text = input.trim().to_ascii_lowercase();
    if text.is_empty() {
        return Err(IntervalError::Empty);
    }

    let invalid = || IntervalError::InvalidFormat(input.trim().to_string());
    let overflow = || IntervalError::Overflow(input.trim().to_string());

    let mut total: u64 = 0;
    let mut number: Option<u64> = None;

    for ch in text.chars() {
        if let Some(digit) = ch.to_digit(10) {
            let current = number.unwrap_or(0);
            let next = current
                .checked_mul(10)
                .and_then(|n| n.checked_add(u64::from(digit)))
                .ok_or_else(overflow)?;
            number = Some(next);
        } else {
            let multiplier = unit_seconds(ch).ok_or_else(invalid)?;
            let value = number.take().ok_or_else(invalid)?;
            let seconds = value.checked_mul(multiplier).ok_or_else(overflow)?;
            total = total.checked_add(seconds).ok_or_else(overflow)?;
        }
    }

    // Trailing digits without a unit
    if number.is_some() {
        return Err(invalid());
    }

    if total == 0 {
        return Err(IntervalError::Zero);
    }

    Ok(total)
}

/// Renders an interval using the largest unit that divides it exactly.
///
/// ```
/// use foldwatch::interval::label;
///
/// assert_eq!(label(172_800), "2 days");
/// assert_eq!(label(5400), "90 minutes");
/// assert_eq!(label(45), "45 sec");
/// ```
#[must_use]
pub fn label(seconds: u64) -> String {
    if seconds > 0 && seconds % DAY == 0 {
        format!("{} days", seconds / DAY)
    } else if seconds > 0 && seconds % HOUR == 0 {
        format!("{} hours", seconds / HOUR)
    } else if seconds > 0 && seconds % MINUTE == 0 {
        format!("{} minutes", seconds / MINUTE)
    } else {
        format!("{seconds} sec")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1h30m", 5400)]
    #[case("2d", 172_800)]
    #[case("45m", 2700)]
    #[case("30s", 30)]
    #[case("2d4h", 187_200)]
    #[case("1H30M", 5400)]
    #[case("  10m  ", 600)]
    #[case("1m1m", 120)]
    #[case("007s", 7)]
    fn test_parse_valid(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(parse_interval(input), Ok(expected));
    }

    #[rstest]
    #[case("1x")]
    #[case("h")]
    #[case("10")]
    #[case("1h30")]
    #[case("1h 30m")]
    #[case("1.5h")]
    #[case("-1m")]
    #[case("m10")]
    fn test_parse_rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            parse_interval(input),
            Err(IntervalError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_interval(""), Err(IntervalError::Empty));
        assert_eq!(parse_interval("   "), Err(IntervalError::Empty));
    }

    #[test]
    fn test_parse_zero_total() {
        assert_eq!(parse_interval("0s"), Err(IntervalError::Zero));
        assert_eq!(parse_interval("0d0h"), Err(IntervalError::Zero));
    }

    #[test]
    fn test_parse_overflow() {
        assert!(matches!(
            parse_interval("99999999999999999999s"),
            Err(IntervalError::Overflow(_))
        ));
        assert!(matches!(
            parse_interval("999999999999999d"),
            Err(IntervalError::Overflow(_))
        ));
    }

    #[rstest]
    #[case(86_400, "1 days")]
    #[case(7200, "2 hours")]
    #[case(60, "1 minutes")]
    #[case(90, "90 sec")]
    #[case(5400, "90 minutes")]
    fn test_label(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(label(seconds), expected);
    }
}
