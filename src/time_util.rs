//! Second-alignment helpers shared by the schedule variants.
//!
//! All calendar arithmetic in this crate happens in `chrono::Local`, matching
//! spec.md §6's "no time-zone parameter is accepted" rule.

use chrono::{DateTime, Duration, Local, Timelike};

/// Drop the sub-second component of `t`, rounding down.
pub(crate) fn floor_to_second(t: DateTime<Local>) -> DateTime<Local> {
    t - Duration::nanoseconds(t.nanosecond() as i64 % 1_000_000_000)
}

/// The next whole-second boundary strictly later than `t`.
///
/// Equivalent to `floor_to_second(t) + 1s`: if `t` already sits on a second
/// boundary this still advances by a full second, so the result is always
/// strictly greater than `t` — never equal to it.
pub(crate) fn ceil_to_next_second(t: DateTime<Local>) -> DateTime<Local> {
    floor_to_second(t) + Duration::seconds(1)
}
