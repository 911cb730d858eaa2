//! Human-readable duration strings such as `"10 minutes"` or `"1 hour 30 min"`

use std::time::Duration;
use thiserror::Error;

/// Errors from [`parse_duration`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DurationParseError {
    /// Nothing to parse
    #[error("Empty duration")]
    Empty,

    /// A quantity was not a whole number
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// A quantity had no unit after it
    #[error("Missing unit after {0}")]
    MissingUnit(u64),

    /// Unrecognized unit name
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// The total does not fit in a `Duration`
    #[error("Duration overflow")]
    Overflow,
}

fn unit_seconds(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
        "m" | "min" | "mins" | "minute" | "minutes" => Some(60),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(3600),
        "d" | "day" | "days" => Some(86_400),
        "w" | "week" | "weeks" => Some(604_800),
        _ => None,
    }
}

/// Parse a sequence of `<quantity> <unit>` pairs into a [`Duration`]
///
/// The quantity and unit may be written together (`"10m"`) or apart
/// (`"10 minutes"`). Pairs are summed.
///
/// # Examples
///
/// ```
/// use backstroke_domain::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("10 minutes").unwrap(), Duration::from_secs(600));
/// assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationParseError> {
    let mut tokens = input.split_whitespace().peekable();
    if tokens.peek().is_none() {
        return Err(DurationParseError::Empty);
    }

    let mut total: u64 = 0;
    while let Some(token) = tokens.next() {
        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(token.len());
        let (digits, attached_unit) = token.split_at(split);

        let quantity: u64 = digits
            .parse()
            .map_err(|_| DurationParseError::InvalidQuantity(token.to_string()))?;

        let unit = if attached_unit.is_empty() {
            tokens.next().ok_or(DurationParseError::MissingUnit(quantity))?
        } else {
            attached_unit
        };

        let per_unit =
            unit_seconds(unit).ok_or_else(|| DurationParseError::UnknownUnit(unit.to_string()))?;

        total = quantity
            .checked_mul(per_unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or(DurationParseError::Overflow)?;
    }

    Ok(Duration::from_secs(total))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: attached and detached units parse identically
        #[test]
        fn test_spacing_is_irrelevant(n in 0u64..1_000_000, unit in "(s|m|h|d|minutes|hours)") {
            let apart = parse_duration(&format!("{} {}", n, unit));
            let together = parse_duration(&format!("{}{}", n, unit));
            prop_assert_eq!(apart, together);
        }

        /// Property: pairs sum
        #[test]
        fn test_pairs_are_additive(a in 0u64..100_000, b in 0u64..100_000) {
            let combined = parse_duration(&format!("{} hours {} seconds", a, b)).unwrap();
            prop_assert_eq!(combined, Duration::from_secs(a * 3600 + b));
        }
    }
}
