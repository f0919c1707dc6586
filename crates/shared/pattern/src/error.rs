use tempora_ports::TimeError;
use thiserror::Error;

/// Errors raised while parsing a recurrence pattern
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Empty pattern")]
    Empty,

    #[error("Not a cron rule: {0}")]
    Cron(String),

    #[error("Not an iCal recurrence rule: {0}")]
    Ical(String),

    #[error("Not an ISO-8601 instant or duration: {0}")]
    Iso(String),

    /// Every interpretation failed; carries the pattern and each reason
    #[error("Unrecognized pattern '{pattern}': {reasons:?}")]
    Unrecognized {
        pattern: String,
        reasons: Vec<String>,
    },
}

pub type PatternResult<T> = std::result::Result<T, PatternError>;

impl From<PatternError> for TimeError {
    fn from(err: PatternError) -> Self {
        match err {
            PatternError::Unrecognized { pattern, reasons } => TimeError::PatternParse {
                pattern,
                reason: reasons.join("; "),
            },
            other => TimeError::PatternParse {
                pattern: String::new(),
                reason: other.to_string(),
            },
        }
    }
}
