use serde::{Deserialize, Serialize};

pub const DEFAULT_MONTHLY_LIMIT: u64 = 1;

/// Body of the backend's `wfh-eligibility` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WfhEligibility {
    #[serde(default)]
    pub current_count: u64,
    #[serde(default)]
    pub max_limit: Option<u64>,
    #[serde(default)]
    pub can_request: Option<bool>,
}

/// Whether WFH may be selected this month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "availability", rename_all = "snake_case")]
pub enum WfhAvailability {
    Available {
        used: u64,
        limit: u64,
    },
    /// Quota exhausted; an extension request can still be filed.
    LimitReached {
        used: u64,
        limit: u64,
    },
    /// The quota could not be checked; selection stays open.
    #[default]
    LimitUnknown,
}

impl WfhAvailability {
    /// Assess the quota. `None` means the eligibility lookup failed.
    ///
    /// The configured limit wins over the backend's `max_limit`.
    pub fn assess(eligibility: Option<&WfhEligibility>, limit: u64) -> Self {
        let Some(eligibility) = eligibility else {
            return Self::LimitUnknown;
        };

        let used = eligibility.current_count;
        if used >= limit || eligibility.can_request == Some(false) {
            Self::LimitReached { used, limit }
        } else {
            Self::Available { used, limit }
        }
    }

    pub fn allows_selection(&self) -> bool {
        !matches!(self, Self::LimitReached { .. })
    }

    pub fn can_request_extension(&self) -> bool {
        matches!(self, Self::LimitReached { .. })
    }

    pub fn label(&self) -> String {
        match self {
            Self::Available { used, limit } => format!("Available ({used}/{limit})"),
            Self::LimitReached { used, limit } => format!("Limit reached ({used}/{limit})"),
            Self::LimitUnknown => "Available (limit unknown)".to_string(),
        }
    }
}
