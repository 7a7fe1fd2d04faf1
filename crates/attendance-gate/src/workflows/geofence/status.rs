use serde::Serialize;

use super::domain::{GeofenceErrorKind, GeofenceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Success,
    Warning,
    Error,
}

/// Control offered next to the status so the user can recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryAffordance {
    None,
    /// Re-run the evaluation.
    RetryLink,
    /// Trigger one explicit acquisition so the host shows its permission prompt.
    EnableLocation,
    /// Permission is blocked; explain how to unblock it in the host settings.
    PermissionHelp,
}

/// User-facing rendering of a geofence result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationStatus {
    pub label: &'static str,
    pub detail: String,
    pub tone: StatusTone,
    pub affordance: RetryAffordance,
}

pub const PERMISSION_HELP: &str = "Location is blocked by your browser for this site. \
Allow location in the site settings and reload; location needs http://localhost or HTTPS.";

impl GeofenceResult {
    pub fn status(&self) -> LocationStatus {
        if let Some(kind) = self.error_kind {
            return error_status(kind);
        }

        let detail = match (&self.nearest_office, self.distance_meters) {
            (Some(office), Some(meters)) => format!("{} • {} m", office.name, meters.round()),
            _ => String::new(),
        };

        if self.in_range {
            LocationStatus {
                label: "In Office Range",
                detail,
                tone: StatusTone::Success,
                affordance: RetryAffordance::None,
            }
        } else {
            LocationStatus {
                label: "Out of Range",
                detail,
                tone: StatusTone::Warning,
                affordance: RetryAffordance::RetryLink,
            }
        }
    }
}

fn error_status(kind: GeofenceErrorKind) -> LocationStatus {
    let (label, detail, tone, affordance) = match kind {
        GeofenceErrorKind::NoOfficesConfigured => (
            "No offices",
            "",
            StatusTone::Warning,
            RetryAffordance::RetryLink,
        ),
        GeofenceErrorKind::PermissionDenied => (
            "Location permission denied",
            PERMISSION_HELP,
            StatusTone::Error,
            RetryAffordance::PermissionHelp,
        ),
        GeofenceErrorKind::PermissionRequired => (
            "Location permission needed",
            "Enable location to check your office range",
            StatusTone::Warning,
            RetryAffordance::EnableLocation,
        ),
        GeofenceErrorKind::PositionUnavailable => (
            "Location unavailable",
            "Try moving or check GPS/network",
            StatusTone::Warning,
            RetryAffordance::RetryLink,
        ),
        GeofenceErrorKind::Timeout => (
            "Location timed out",
            "Retry; go near a window",
            StatusTone::Warning,
            RetryAffordance::RetryLink,
        ),
        GeofenceErrorKind::Unknown => (
            "Location error",
            "Retry or check permissions",
            StatusTone::Warning,
            RetryAffordance::RetryLink,
        ),
    };

    LocationStatus {
        label,
        detail: detail.to_string(),
        tone,
        affordance,
    }
}
