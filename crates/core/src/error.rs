use thiserror::Error;

/// Validation failures for user-supplied scheduled-update input.
///
/// These are rejected at create/update time and never stored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("interval must be at least 1, got {0}")]
    NonPositiveInterval(u32),

    #[error("day_of_week must be 0-6, got {0}")]
    DayOfWeekOutOfRange(u8),

    #[error("day_of_month must be 1-31, got {0}")]
    DayOfMonthOutOfRange(u8),

    #[error("specific_time must be HH:MM, got '{0}'")]
    BadSpecificTime(String),

    #[error("custom frequency requires a cron expression")]
    MissingCronExpression,

    #[error("invalid cron expression '{expression}': {reason}")]
    BadCronExpression { expression: String, reason: String },
}
