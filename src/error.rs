use thiserror::Error;

/// Failures raised while turning a textual schedule spec into a [`crate::Schedule`].
///
/// Covers both the six-field cron grammar and the `@every <duration>` grammar;
/// see [`crate::schedule::cron::parse`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown descriptor {0:?}")]
    UnknownDescriptor(String),

    #[error("expected 6 whitespace-separated fields (second minute hour day-of-month month day-of-week), got {0}")]
    WrongFieldCount(usize),

    #[error("field {field:?} value {value:?} is out of range {min}-{max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("field {field:?}: {token:?} is not a valid value, range, step, or list element")]
    BadToken { field: &'static str, token: String },

    #[error("field {field:?}: range {0}-{1} is invalid ({0} > {1})", .start, .end)]
    BadRange { field: &'static str, start: i64, end: i64 },

    #[error("field {field:?}: step must be >= 1, got {step}")]
    BadStep { field: &'static str, step: i64 },

    #[error("'?' is only permitted in the day-of-month or day-of-week field")]
    QuestionMarkOutsideDayField,

    #[error("empty schedule spec")]
    Empty,

    #[error("invalid @every duration: {0}")]
    Duration(#[from] DurationParseError),
}

/// Failures specific to the `@every <duration>` grammar.
///
/// Kept distinct from [`ParseError`]'s cron-field variants: the duration
/// grammar has no field name to report a position against, and a clear,
/// dedicated message reads better than shoehorning it into `BadToken`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("empty duration")]
    Empty,

    #[error("{0:?} is not a recognized duration unit (expected h, m, s, ms, us, or ns)")]
    UnknownUnit(String),

    #[error("{0:?} has a number with no unit suffix")]
    MissingUnit(String),

    #[error("duration component {0:?} has no leading digits")]
    MissingMagnitude(String),

    #[error("duration rounds down to zero seconds, which is not a valid interval")]
    NonPositive,
}
