//! The cron-expression schedule: six-field bitmask matching plus the
//! descriptor (`@hourly`) and fixed-interval (`@every`) shorthands.
//!
//! This is the most algorithmically involved piece of the crate — see
//! `SPEC_FULL.md` §4.1–4.2 for the full field grammar and the day-matching
//! ambiguity rule this module resolves.

mod duration;
mod parser;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Timelike};

use crate::error::ParseError;
use crate::time_util::ceil_to_next_second;

use self::parser::{dow_names, month_names, parse_field};
use super::{ConstantDelay, Schedule};

pub use duration::parse_every_duration;

/// A six-field cron schedule: second, minute, hour, day-of-month, month,
/// day-of-week, each a `u64` bitmask (bit *i* set ⇒ value *i* permitted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    seconds: u64,
    minutes: u64,
    hours: u64,
    dom: u64,
    months: u64,
    dow: u64,
    /// Whether the original day-of-month field was `*`/`?` (unconstrained).
    dom_star: bool,
    /// Whether the original day-of-week field was `*`/`?` (unconstrained).
    dow_star: bool,
}

/// Search horizon: give up and report the schedule exhausted after this
/// many years from the instant `next` was asked about.
const YEAR_HORIZON: i32 = 5;

impl CronSchedule {
    fn day_matches(&self, t: &DateTime<Local>) -> bool {
        let dom_match = self.dom & (1 << t.day()) != 0;
        let dow_match = self.dow & (1 << t.weekday().num_days_from_sunday()) != 0;
        if !self.dom_star && !self.dow_star {
            dom_match || dow_match
        } else {
            dom_match && dow_match
        }
    }
}

/// Spring-forward DST gaps (e.g. `2:00`-`3:00` skipped) make some
/// calendar-valid (y, mo, d, h, mi, s) combinations denote no local instant
/// at all. Rather than treat that as "never" — which would silently drop a
/// job permanently — nudge forward second by second until a local instant
/// exists, same as the source's normal (non-leap-aware) calendar arithmetic.
/// Bounded at two hours, comfortably past any real-world DST jump.
const DST_GAP_SEARCH_LIMIT: i64 = 2 * 3600;

fn build(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Option<DateTime<Local>> {
    let naive = NaiveDate::from_ymd_opt(y, mo, d)?.and_hms_opt(h, mi, s)?;
    for offset in 0..=DST_GAP_SEARCH_LIMIT {
        match Local.from_local_datetime(&(naive + Duration::seconds(offset))) {
            chrono::LocalResult::Single(t) => return Some(t),
            chrono::LocalResult::Ambiguous(earliest, _) => return Some(earliest),
            chrono::LocalResult::None => continue,
        }
    }
    None
}

fn advance_month(t: DateTime<Local>) -> Option<DateTime<Local>> {
    let (y, m) = if t.month() == 12 { (t.year() + 1, 1) } else { (t.year(), t.month() + 1) };
    build(y, m, 1, 0, 0, 0)
}

fn advance_day(t: DateTime<Local>) -> Option<DateTime<Local>> {
    let next_date = t.date_naive().succ_opt()?;
    build(next_date.year(), next_date.month(), next_date.day(), 0, 0, 0)
}

fn advance_hour(t: DateTime<Local>) -> Option<DateTime<Local>> {
    if t.hour() == 23 {
        advance_day(t)
    } else {
        build(t.year(), t.month(), t.day(), t.hour() + 1, 0, 0)
    }
}

fn advance_minute(t: DateTime<Local>) -> Option<DateTime<Local>> {
    if t.minute() == 59 {
        advance_hour(t)
    } else {
        build(t.year(), t.month(), t.day(), t.hour(), t.minute() + 1, 0)
    }
}

fn advance_second(t: DateTime<Local>) -> Option<DateTime<Local>> {
    if t.second() == 59 {
        advance_minute(t)
    } else {
        build(t.year(), t.month(), t.day(), t.hour(), t.minute(), t.second() + 1)
    }
}

impl Schedule for CronSchedule {
    fn next(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        let limit_year = after.year() + YEAR_HORIZON;
        let mut t = ceil_to_next_second(after);

        loop {
            if t.year() > limit_year {
                return None;
            }

            if self.months & (1 << t.month()) == 0 {
                t = advance_month(t)?;
                continue;
            }

            if !self.day_matches(&t) {
                t = advance_day(t)?;
                continue;
            }

            if self.hours & (1 << t.hour()) == 0 {
                t = advance_hour(t)?;
                continue;
            }

            if self.minutes & (1 << t.minute()) == 0 {
                t = advance_minute(t)?;
                continue;
            }

            if self.seconds & (1 << t.second()) == 0 {
                t = advance_second(t)?;
                continue;
            }

            return Some(t);
        }
    }

    fn snapshot(&self) -> std::sync::Arc<dyn Schedule> {
        std::sync::Arc::new(self.clone())
    }
}

/// Result of parsing a schedule spec: either a calendar cron schedule or a
/// fixed interval (`@every`).
pub enum ParsedSchedule {
    Cron(CronSchedule),
    ConstantDelay(ConstantDelay),
}

impl Schedule for ParsedSchedule {
    fn next(&self, after: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            ParsedSchedule::Cron(c) => c.next(after),
            ParsedSchedule::ConstantDelay(c) => c.next(after),
        }
    }

    fn snapshot(&self) -> std::sync::Arc<dyn Schedule> {
        match self {
            ParsedSchedule::Cron(c) => c.snapshot(),
            ParsedSchedule::ConstantDelay(c) => c.snapshot(),
        }
    }
}

/// Descriptor shortcuts (`@hourly`, `@yearly`, …) expand to this six-field
/// cron expression before field-level parsing.
fn expand_descriptor(spec: &str) -> Option<&'static str> {
    match spec {
        "@yearly" | "@annually" => Some("0 0 0 1 1 *"),
        "@monthly" => Some("0 0 0 1 * *"),
        "@weekly" => Some("0 0 0 * * 0"),
        "@daily" | "@midnight" => Some("0 0 0 * * *"),
        "@hourly" => Some("0 0 * * * *"),
        _ => None,
    }
}

/// Parse a schedule spec — a descriptor, `@every <duration>`, or an explicit
/// six-field cron expression — into a [`ParsedSchedule`].
///
/// See `SPEC_FULL.md` §4.1 for the full grammar.
pub fn parse(spec: &str) -> Result<ParsedSchedule, ParseError> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(rest) = trimmed.strip_prefix("@every ") {
        let duration = parse_every_duration(rest)?;
        let delay = ConstantDelay::new(duration).map_err(ParseError::Duration)?;
        return Ok(ParsedSchedule::ConstantDelay(delay));
    }

    if trimmed.starts_with('@') {
        let expanded = expand_descriptor(trimmed)
            .ok_or_else(|| ParseError::UnknownDescriptor(trimmed.to_string()))?;
        return parse_six_fields(expanded).map(ParsedSchedule::Cron);
    }

    parse_six_fields(trimmed).map(ParsedSchedule::Cron)
}

fn parse_six_fields(expr: &str) -> Result<CronSchedule, ParseError> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(ParseError::WrongFieldCount(fields.len()));
    }

    let second = parse_field("second", fields[0], 0, 59, &[], false, false)?;
    let minute = parse_field("minute", fields[1], 0, 59, &[], false, false)?;
    let hour = parse_field("hour", fields[2], 0, 23, &[], false, false)?;
    let dom = parse_field("day-of-month", fields[3], 1, 31, &[], true, false)?;
    let month = parse_field("month", fields[4], 1, 12, month_names(), false, false)?;
    let dow = parse_field("day-of-week", fields[5], 0, 6, dow_names(), true, true)?;

    Ok(CronSchedule {
        seconds: second.mask,
        minutes: minute.mask,
        hours: hour.mask,
        dom: dom.mask,
        months: month.mask,
        dow: dow.mask,
        dom_star: dom.star,
        dow_star: dow.star,
    })
}
