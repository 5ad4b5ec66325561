//! Scheduled-update data model.
//!
//! A [`ScheduledUpdate`] is one user-declared refresh job: which content
//! bases to refresh, on what recurrence, with what item filters. The
//! scheduler crate owns all mutation of `last_run`/`next_run`/`run_history`.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{ContentBaseId, ContentItemId};
use crate::error::ValidationError;

/// Maximum retained run-history entries per scheduled update.
pub const MAX_RUN_HISTORY: usize = 10;

/// Items untouched for longer than this are "outdated" for `only_outdated`.
pub const STALENESS_DAYS: i64 = 7;

// ── Default value functions ──────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_interval() -> u32 {
    1
}

// ── Recurrence ───────────────────────────────────────────────────────

/// How often a scheduled update repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Hourly => write!(f, "hourly"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Custom => write!(f, "custom"),
        }
    }
}

/// Declarative description of how often and when a job repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceSpec {
    pub frequency: Frequency,
    /// Number of frequency-units between runs (>= 1).
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// 0 = Sunday .. 6 = Saturday; weekly only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    /// 1-31, clamped to the target month; monthly only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
    /// "HH:MM", applied to daily/weekly/monthly results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_time: Option<String>,
    /// Cron expression; custom frequency only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

impl RecurrenceSpec {
    /// Field-level validation (ranges, time format, cron presence).
    ///
    /// The cron expression's syntax is checked by the scheduler crate,
    /// which owns the cron evaluator; here we only require its presence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval == 0 {
            return Err(ValidationError::NonPositiveInterval(self.interval));
        }
        if let Some(dow) = self.day_of_week {
            if dow > 6 {
                return Err(ValidationError::DayOfWeekOutOfRange(dow));
            }
        }
        if let Some(dom) = self.day_of_month {
            if dom == 0 || dom > 31 {
                return Err(ValidationError::DayOfMonthOutOfRange(dom));
            }
        }
        if let Some(time) = &self.specific_time {
            parse_specific_time(time)
                .ok_or_else(|| ValidationError::BadSpecificTime(time.clone()))?;
        }
        if self.frequency == Frequency::Custom
            && self
                .cron_expression
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .is_none()
        {
            return Err(ValidationError::MissingCronExpression);
        }
        Ok(())
    }
}

/// Parse an "HH:MM" time-of-day string.
pub fn parse_specific_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

// ── Refresh options ──────────────────────────────────────────────────

/// Item-selection options for one scheduled update.
///
/// All three source-type flags false is treated as "no restriction" —
/// observable behavior of the original system, preserved on purpose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOptions {
    #[serde(default = "default_true")]
    pub refresh_urls: bool,
    #[serde(default = "default_true")]
    pub refresh_pdfs: bool,
    #[serde(default = "default_true")]
    pub refresh_youtube_videos: bool,
    /// Restrict to items last updated more than the staleness threshold ago.
    #[serde(default)]
    pub only_outdated: bool,
    /// Item must carry at least one of these tags; empty = filter disabled.
    #[serde(default)]
    pub specific_tags: Vec<String>,
    /// Only these item ids are eligible; empty = filter disabled.
    #[serde(default)]
    pub specific_item_ids: Vec<ContentItemId>,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            refresh_urls: true,
            refresh_pdfs: true,
            refresh_youtube_videos: true,
            only_outdated: false,
            specific_tags: Vec::new(),
            specific_item_ids: Vec::new(),
        }
    }
}

// ── Run records ──────────────────────────────────────────────────────

/// Immutable log entry describing one execution's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp: DateTime<Utc>,
    pub items_processed: u64,
    pub success: bool,
    pub triggered_manually: bool,
}

/// Aggregate outcome of one execution pass, returned to manual callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub message: String,
    pub items_processed: u64,
}

// ── Scheduled update ─────────────────────────────────────────────────

/// One user-declared recurring refresh job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledUpdate {
    pub id: Uuid,
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Content bases this job refreshes; empty is legal (no-op runs).
    #[serde(default)]
    pub target_base_ids: Vec<ContentBaseId>,
    pub name: String,
    pub recurrence: RecurrenceSpec,
    pub active: bool,
    #[serde(default)]
    pub options: RefreshOptions,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    /// None only when the recurrence could not produce a next occurrence;
    /// such records are never selected as due.
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    /// Most-recent last, capped at [`MAX_RUN_HISTORY`].
    #[serde(default)]
    pub run_history: Vec<RunRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload for a scheduled update (id/timestamps assigned by the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScheduledUpdate {
    pub owner_id: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub target_base_ids: Vec<ContentBaseId>,
    pub name: String,
    pub recurrence: RecurrenceSpec,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub options: RefreshOptions,
}

/// Partial-update payload; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduledUpdatePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub agent_id: Option<Option<String>>,
    #[serde(default)]
    pub target_base_ids: Option<Vec<ContentBaseId>>,
    #[serde(default)]
    pub recurrence: Option<RecurrenceSpec>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub options: Option<RefreshOptions>,
}
