//! `@every <duration>` grammar: `1h30m`, `500ms`, `90s`, …
//!
//! Hand-rolled digit-accumulate/unit-dispatch state machine, the same shape
//! as the teacher's `parse_cooldown` (`crates/rules/src/scheduler/cron.rs`)
//! but covering the six units spec.md names (`h m s ms us ns`) instead of
//! `parse_cooldown`'s four (`d h m s`), and rejecting a bare trailing number
//! instead of treating it as seconds — `@every`'s grammar requires an
//! explicit unit on every component.

use std::time::Duration;

use crate::error::DurationParseError;

/// Parse a composed duration string like `1h30m` or `500ms` into a
/// `Duration`. Every numeric component must carry one of the six supported
/// unit suffixes; a bare number or a dangling number with no unit is an
/// error.
pub fn parse_every_duration(s: &str) -> Result<Duration, DurationParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let mut total = Duration::ZERO;
    let mut chars = s.char_indices().peekable();
    let mut component_start = 0usize;

    while let Some(&(digit_start, c)) = chars.peek() {
        if !c.is_ascii_digit() {
            return Err(DurationParseError::MissingMagnitude(s[component_start..].to_string()));
        }
        let mut digit_end = digit_start;
        while let Some(&(idx, c)) = chars.peek() {
            if c.is_ascii_digit() {
                digit_end = idx + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let magnitude: u64 = s[digit_start..digit_end]
            .parse()
            .map_err(|_| DurationParseError::MissingMagnitude(s[digit_start..digit_end].to_string()))?;

        let unit_start = digit_end;
        let mut unit_end = unit_start;
        while let Some(&(idx, c)) = chars.peek() {
            if c.is_ascii_alphabetic() {
                unit_end = idx + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        if unit_end == unit_start {
            return Err(DurationParseError::MissingUnit(s[component_start..].to_string()));
        }
        let unit = &s[unit_start..unit_end];
        let component = match unit {
            "ns" => Duration::from_nanos(magnitude),
            "us" => Duration::from_micros(magnitude),
            "ms" => Duration::from_millis(magnitude),
            "s" => Duration::from_secs(magnitude),
            "m" => Duration::from_secs(magnitude.saturating_mul(60)),
            "h" => Duration::from_secs(magnitude.saturating_mul(3_600)),
            other => return Err(DurationParseError::UnknownUnit(other.to_string())),
        };
        total += component;
        component_start = unit_end;
    }

    if total.is_zero() {
        return Err(DurationParseError::NonPositive);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_hour() {
        assert_eq!(parse_every_duration("1h").unwrap(), Duration::from_secs(3_600));
    }

    #[test]
    fn composed_hour_minutes() {
        assert_eq!(
            parse_every_duration("1h30m").unwrap(),
            Duration::from_secs(3_600 + 30 * 60)
        );
    }

    #[test]
    fn milliseconds() {
        assert_eq!(parse_every_duration("500ms").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn rounds_down_to_whole_seconds_when_used_by_constant_delay() {
        // @every 500ms rounds to zero whole seconds — caller (ConstantDelay::new)
        // rejects this; the duration parser itself just returns the raw value.
        assert_eq!(parse_every_duration("500ms").unwrap().as_secs(), 0);
    }

    #[test]
    fn empty_is_an_error() {
        assert_eq!(parse_every_duration(""), Err(DurationParseError::Empty));
        assert_eq!(parse_every_duration("   "), Err(DurationParseError::Empty));
    }

    #[test]
    fn bare_number_with_no_unit_is_an_error() {
        assert!(matches!(
            parse_every_duration("120"),
            Err(DurationParseError::MissingUnit(_))
        ));
    }

    #[test]
    fn unknown_unit_is_an_error() {
        assert!(matches!(
            parse_every_duration("5d"),
            Err(DurationParseError::UnknownUnit(u)) if u == "d"
        ));
    }

    #[test]
    fn complex_composition() {
        assert_eq!(
            parse_every_duration("2h15m30s500ms").unwrap(),
            Duration::from_secs(2 * 3_600 + 15 * 60 + 30) + Duration::from_millis(500)
        );
    }
}
