use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::domain::{AttendanceRecord, AttendanceType};

pub const OUTSIDE_GEOFENCE: &str = "You must be in the office geofence to check out.";
pub const MINIMUM_WORK_HOURS: f64 = 4.5;
pub const FULL_DAY_HOURS: f64 = 8.0;

/// Whether the check-out control is offered for today's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum CheckoutGate {
    NotCheckedIn,
    AlreadyCheckedOut,
    Enabled,
    Disabled { reason: &'static str },
}

impl CheckoutGate {
    /// Office check-ins can only be closed from inside the geofence; other types always can.
    pub fn evaluate(record: Option<&AttendanceRecord>, in_range: bool) -> Self {
        match record {
            None => Self::NotCheckedIn,
            Some(record) if record.check_in_time.is_none() => Self::NotCheckedIn,
            Some(record) if record.is_checked_out() => Self::AlreadyCheckedOut,
            Some(record) if record.attendance_type == AttendanceType::Office && !in_range => {
                Self::Disabled {
                    reason: OUTSIDE_GEOFENCE,
                }
            }
            Some(_) => Self::Enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Dashboard card describing today's attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodaySummary {
    pub label: &'static str,
    pub timing: String,
    pub attendance_type: Option<AttendanceType>,
}

impl TodaySummary {
    pub fn from_record(record: Option<&AttendanceRecord>) -> Self {
        let Some(record) = record else {
            return Self::not_marked();
        };
        let Some(check_in) = record.check_in_time else {
            return Self::not_marked();
        };

        match record.check_out_time {
            Some(check_out) => Self {
                label: "Completed",
                timing: format!("{} - {}", clock(check_in), clock(check_out)),
                attendance_type: Some(record.attendance_type),
            },
            None => Self {
                label: "Checked In",
                timing: format!("Since {}", clock(check_in)),
                attendance_type: Some(record.attendance_type),
            },
        }
    }

    fn not_marked() -> Self {
        Self {
            label: "Not Marked",
            timing: String::new(),
            attendance_type: None,
        }
    }
}

fn clock(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Hours between check-in and a proposed check-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkSpan {
    pub hours: f64,
}

impl WorkSpan {
    pub fn between(check_in: NaiveDateTime, check_out: NaiveDateTime) -> Self {
        let seconds = (check_out - check_in).num_seconds().max(0);
        Self {
            hours: seconds as f64 / 3600.0,
        }
    }

    pub fn since(date: NaiveDate, check_in: NaiveTime, now: NaiveDateTime) -> Self {
        Self::between(date.and_time(check_in), now)
    }

    pub fn is_too_short(&self) -> bool {
        self.hours < MINIMUM_WORK_HOURS
    }

    pub fn is_half_day(&self) -> bool {
        !self.is_too_short() && self.hours < FULL_DAY_HOURS
    }
}

/// Result of a check-out attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    Blocked { gate: CheckoutGate },
    TooEarly { worked_hours: f64 },
    Recorded { message: String, half_day: bool },
    Failed { message: String },
}

impl CheckoutOutcome {
    pub fn recorded(receipt_half_day: bool, work_hours: Option<f64>) -> Self {
        let mut message = "Check-out recorded successfully!".to_string();
        if let (true, Some(hours)) = (receipt_half_day, work_hours) {
            message.push_str(&format!(" (Marked as half day - {hours:.1} hours)"));
        }
        Self::Recorded {
            message,
            half_day: receipt_half_day,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Blocked {
                gate: CheckoutGate::Disabled { reason },
            } => reason.to_string(),
            Self::Blocked {
                gate: CheckoutGate::AlreadyCheckedOut,
            } => "Already checked out for today".to_string(),
            Self::Blocked { .. } => "No check-in record found for today".to_string(),
            Self::TooEarly { .. } => format!(
                "You cannot check out before completing {MINIMUM_WORK_HOURS} hours of work."
            ),
            Self::Recorded { message, .. } | Self::Failed { message } => message.clone(),
        }
    }
}
