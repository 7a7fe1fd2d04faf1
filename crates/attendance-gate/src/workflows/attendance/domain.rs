use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::workflows::geofence::{Coordinates, OfficeId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub String);

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Signed-in employee as far as attendance is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub department: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceType {
    Office,
    Wfh,
    Client,
}

impl AttendanceType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Office => "office",
            Self::Wfh => "wfh",
            Self::Client => "client",
        }
    }

    /// Only office attendance is gated by the office geofence.
    pub fn uses_geofence(&self) -> bool {
        matches!(self, Self::Office)
    }

    /// Attendance status recorded with a check-in of this type.
    pub fn check_in_status(&self) -> &'static str {
        match self {
            Self::Office => "present",
            other => other.label(),
        }
    }
}

/// Latest attendance record for one employee and day, owned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub check_in_time: Option<NaiveTime>,
    #[serde(default)]
    pub check_out_time: Option<NaiveTime>,
    #[serde(rename = "type")]
    pub attendance_type: AttendanceType,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub office_id: Option<OfficeId>,
    #[serde(default)]
    pub office_name: Option<String>,
}

impl AttendanceRecord {
    pub fn is_checked_out(&self) -> bool {
        self.check_out_time.is_some()
    }
}

/// Photo captured on the attendance screen, as a data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureArtifact(pub String);

impl CaptureArtifact {
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Check-in payload for the backend's `mark-attendance` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSubmission {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_clock_time")]
    pub check_in: NaiveTime,
    #[serde(rename = "type")]
    pub attendance_type: AttendanceType,
    pub status: &'static str,
    pub office_id: Option<OfficeId>,
    pub location: Option<Coordinates>,
    pub photo: CaptureArtifact,
}

/// Check-out payload for the backend's `check-out` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_clock_time")]
    pub check_out: NaiveTime,
    pub location: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutReceipt {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_half_day: bool,
    #[serde(default)]
    pub work_hours: Option<f64>,
}

fn serialize_clock_time<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(&time.format("%H:%M:%S"))
}
