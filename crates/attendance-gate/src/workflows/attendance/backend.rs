use async_trait::async_trait;
use chrono::NaiveDate;

use super::domain::{
    AttendanceRecord, AttendanceSubmission, CheckoutReceipt, CheckoutRequest, EmployeeId,
};
use super::wfh::WfhEligibility;

/// Attendance endpoints of the HR backend.
#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    async fn today_attendance(
        &self,
        employee: &EmployeeId,
    ) -> Result<Option<AttendanceRecord>, BackendError>;

    async fn wfh_eligibility(
        &self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<WfhEligibility, BackendError>;

    async fn mark_attendance(&self, submission: &AttendanceSubmission) -> Result<(), BackendError>;

    async fn check_out(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt, BackendError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("attendance backend unavailable: {0}")]
    Unavailable(String),
    /// The backend answered but refused; `message` is meant for the user.
    #[error("attendance backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("malformed attendance backend payload: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Text suitable for a user notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Unavailable(_) | Self::Malformed(_) => {
                "Attendance service is unavailable. Please retry.".to_string()
            }
        }
    }
}
