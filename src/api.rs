//! Public API surface for the scheduling core.
//!
//! This file consolidates the typed domain entities shared between the
//! service layer, the repository layer and embedding applications.
//! All types derive Serialize/Deserialize for JSON serialization.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Default session length when a template does not specify one.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Class template identifier (database primary key).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub i64);

/// Class occurrence identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OccurrenceId(pub i64);

/// Enrollment identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnrollmentId(pub i64);

/// Client identifier, owned by the member directory collaborator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub i64);

macro_rules! impl_id {
    ($name:ident) => {
        impl $name {
            pub fn new(value: i64) -> Self {
                $name(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

impl_id!(TemplateId);
impl_id!(OccurrenceId);
impl_id!(EnrollmentId);
impl_id!(ClientId);

/// Recurrence definition for a class.
///
/// A template describes when a class repeats (weekday set + time of day)
/// and over which date range. Expansion turns it into concrete
/// [`ClassOccurrence`] rows; see `services::expander`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassTemplate {
    /// Database id; `None` before first insert.
    pub id: Option<TemplateId>,
    /// Group-session title. Ignored for display when `client_id` is set.
    #[serde(default)]
    pub title: String,
    /// Owning student for single-student templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    /// Wall-clock start time in the business timezone.
    pub time_of_day: NaiveTime,
    /// Session length in minutes.
    #[serde(default = "default_duration")]
    pub duration_minutes: i64,
    /// Weekdays on which the class repeats.
    pub weekdays: Vec<Weekday>,
    /// First date (inclusive) on which occurrences may exist.
    pub start_date: NaiveDate,
    /// Last date (inclusive); open-ended when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

fn default_duration() -> i64 {
    DEFAULT_DURATION_MINUTES
}

impl ClassTemplate {
    /// Validate the recurrence date range.
    ///
    /// A template whose start date lies after its end date is rejected
    /// before any expansion occurs.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(end) = self.end_date {
            if self.start_date > end {
                return Err(format!(
                    "Template start date {} is after end date {}",
                    self.start_date, end
                ));
            }
        }
        if self.weekdays.is_empty() {
            return Err("Template weekday set is empty".to_string());
        }
        if self.duration_minutes <= 0 {
            return Err("Template duration must be positive".to_string());
        }
        Ok(())
    }

    /// Whether `date` falls inside the recurrence range and weekday set.
    pub fn covers(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        if date < self.start_date {
            return false;
        }
        if let Some(end) = self.end_date {
            if date > end {
                return false;
            }
        }
        self.weekdays.contains(&date.weekday())
    }
}

/// One dated, timed class session.
///
/// Created either ad hoc or by template expansion. Capacity is a
/// business-wide setting (`config::EngineSettings`), not stored per row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassOccurrence {
    pub id: Option<OccurrenceId>,
    /// Absolute start instant, timezone-resolved at creation.
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: i64,
    /// Single-student session owner, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    /// Display title ("session with {name}" for single-student sessions).
    #[serde(default)]
    pub title: String,
    /// Generating template, when materialized by expansion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
    #[serde(default)]
    pub notes: String,
}

impl ClassOccurrence {
    /// Whether the session has already started at `now`.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now
    }
}

/// Attendance lifecycle status of an enrollment.
///
/// `Scheduled` is the initial state; `Present`/`Absent` are set when the
/// session is taken. Administrative correction is a direct overwrite,
/// not a guarded transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Scheduled,
    Present,
    Absent,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AttendanceStatus::Scheduled => "scheduled",
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(Self::Scheduled),
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(format!("Unknown attendance status: {}", other)),
        }
    }
}

/// A client enrolled in a class occurrence.
///
/// Invariant: a given client appears at most once per occurrence; the
/// repository enforces this on insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: Option<EnrollmentId>,
    pub occurrence_id: OccurrenceId,
    pub client_id: ClientId,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
}

/// Displacement-priority tier of a client, read from the member directory.
///
/// Pay-per-session clients rank highest and may displace subsidized
/// enrollees from a full class; subsidized tier B ranks lowest and is
/// displaced first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentTier {
    PayPerSession,
    SubsidizedA,
    SubsidizedB,
}

impl EnrollmentTier {
    /// Priority rank; lower is higher priority.
    pub fn rank(&self) -> u8 {
        match self {
            EnrollmentTier::PayPerSession => 0,
            EnrollmentTier::SubsidizedA => 1,
            EnrollmentTier::SubsidizedB => 2,
        }
    }

    /// Whether an enrollee of this tier may be bumped from a full class.
    pub fn is_displaceable(&self) -> bool {
        !matches!(self, EnrollmentTier::PayPerSession)
    }
}

/// Directory-side view of a client. The core only reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientRecord {
    pub id: ClientId,
    pub name: String,
    pub tier: EnrollmentTier,
}

/// Inclusive date window used for template expansion and queries.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, String> {
        if from > to {
            return Err(format!("Window start {} is after window end {}", from, to));
        }
        Ok(Self { from, to })
    }

    /// Iterate the dates of the window, inclusive on both ends.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let mut current = Some(self.from);
        let to = self.to;
        std::iter::from_fn(move || {
            let date = current?;
            if date > to {
                return None;
            }
            current = date.succ_opt();
            Some(date)
        })
    }
}

/// Partial patch applied to an occurrence (edits, template propagation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OccurrencePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OccurrencePatch {
    pub fn is_empty(&self) -> bool {
        self.starts_at.is_none()
            && self.title.is_none()
            && self.duration_minutes.is_none()
            && self.notes.is_none()
    }
}
