//! Attendance screen workflow: type/office selection, capture, submission and check-out.

pub mod backend;
pub mod checkout;
pub mod controller;
pub mod domain;
pub mod flow;
pub mod http;
pub mod router;
pub mod wfh;

#[cfg(test)]
mod tests;

pub use backend::{AttendanceBackend, BackendError};
pub use checkout::{CheckoutGate, CheckoutOutcome, TodaySummary, WorkSpan, OUTSIDE_GEOFENCE};
pub use controller::{AttendanceFlowController, TodayView};
pub use domain::{
    AttendanceRecord, AttendanceSubmission, AttendanceType, CaptureArtifact, CheckoutReceipt,
    CheckoutRequest, Employee, EmployeeId,
};
pub use flow::{
    AttendanceFlow, FlowEvent, FlowNotice, FlowState, FlowTransition, OfficeSelection,
};
pub use http::HttpAttendanceApi;
pub use router::{
    attendance_router, AttendanceApi, CheckoutGateResponse, CheckoutResponse, DeviceReport,
    EmployeePayload, FlowCommand, FlowPayload, FlowResponse,
};
pub use wfh::{WfhAvailability, WfhEligibility, DEFAULT_MONTHLY_LIMIT};
