use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::workflows::attendance::{
    AttendanceApi, AttendanceBackend, AttendanceFlow, AttendanceFlowController, AttendanceRecord,
    AttendanceSubmission, AttendanceType, BackendError, CaptureArtifact, CheckoutReceipt,
    CheckoutRequest, Employee, EmployeeId, FlowEvent, OfficeSelection, WfhAvailability,
    WfhEligibility,
};
use crate::workflows::geofence::{
    AcquisitionSettings, GeofenceEvaluator, LocationProvider, Office, OfficeDirectory,
    OfficeFetchError, OfficeId, OfficeRegistry, PermissionProbe, PermissionState, PositionAcquirer,
    PositionCallback, PositionOptions,
};

pub(super) fn employee() -> Employee {
    Employee {
        id: EmployeeId("E-104".to_string()),
        department: "IT".to_string(),
    }
}

pub(super) fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date")
}

pub(super) fn afternoon() -> NaiveDateTime {
    day().and_hms_opt(15, 30, 0).expect("valid time")
}

pub(super) fn late_morning() -> NaiveDateTime {
    day().and_hms_opt(11, 0, 0).expect("valid time")
}

/// Early next morning, for night shifts.
pub(super) fn after_midnight() -> NaiveDateTime {
    day()
        .succ_opt()
        .and_then(|next| next.and_hms_opt(7, 0, 0))
        .expect("valid time")
}

pub(super) fn photo() -> CaptureArtifact {
    CaptureArtifact("data:image/jpeg;base64,/9j/4AAQ".to_string())
}

pub(super) fn selection(in_range: bool) -> OfficeSelection {
    OfficeSelection {
        office_id: OfficeId("HQ".to_string()),
        name: "Head Office".to_string(),
        in_range,
    }
}

pub(super) fn open_record(attendance_type: AttendanceType) -> AttendanceRecord {
    AttendanceRecord {
        date: Some(day()),
        check_in_time: NaiveTime::from_hms_opt(9, 0, 0),
        check_out_time: None,
        attendance_type,
        status: attendance_type.check_in_status().to_string(),
        office_id: None,
        office_name: None,
    }
}

/// Drive a fresh flow through `events`, panicking on any notice.
pub(super) fn flow_through(events: Vec<FlowEvent>) -> AttendanceFlow {
    events
        .into_iter()
        .fold(AttendanceFlow::new(), |flow, event| {
            let transition = flow.transition(event);
            assert!(
                transition.notice.is_none(),
                "unexpected notice {:?}",
                transition.notice
            );
            transition.flow
        })
}

pub(super) fn ready_office_flow() -> AttendanceFlow {
    flow_through(vec![
        FlowEvent::SelectType {
            attendance_type: AttendanceType::Office,
            wfh: WfhAvailability::default(),
        },
        FlowEvent::SelectOffice {
            office: selection(true),
        },
        FlowEvent::Proceed,
        FlowEvent::Capture { photo: photo() },
    ])
}

#[derive(Default)]
pub(super) struct MemoryBackend {
    pub(super) today: Mutex<Option<AttendanceRecord>>,
    pub(super) eligibility: Mutex<Option<WfhEligibility>>,
    pub(super) reject_submissions: Mutex<Option<String>>,
    pub(super) submissions: Mutex<Vec<AttendanceSubmission>>,
    pub(super) checkouts: Mutex<Vec<CheckoutRequest>>,
    pub(super) half_day: Mutex<Option<f64>>,
}

impl MemoryBackend {
    pub(super) fn with_today(record: AttendanceRecord) -> Arc<Self> {
        let backend = Self::default();
        *backend.today.lock().expect("backend mutex poisoned") = Some(record);
        Arc::new(backend)
    }

    pub(super) fn submissions(&self) -> Vec<AttendanceSubmission> {
        self.submissions
            .lock()
            .expect("backend mutex poisoned")
            .clone()
    }

    pub(super) fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.checkouts.lock().expect("backend mutex poisoned").clone()
    }
}

#[async_trait]
impl AttendanceBackend for MemoryBackend {
    async fn today_attendance(
        &self,
        _employee: &EmployeeId,
    ) -> Result<Option<AttendanceRecord>, BackendError> {
        Ok(self.today.lock().expect("backend mutex poisoned").clone())
    }

    async fn wfh_eligibility(
        &self,
        _employee: &EmployeeId,
        _date: NaiveDate,
    ) -> Result<WfhEligibility, BackendError> {
        self.eligibility
            .lock()
            .expect("backend mutex poisoned")
            .clone()
            .ok_or_else(|| BackendError::Unavailable("eligibility offline".to_string()))
    }

    async fn mark_attendance(&self, submission: &AttendanceSubmission) -> Result<(), BackendError> {
        if let Some(message) = self
            .reject_submissions
            .lock()
            .expect("backend mutex poisoned")
            .clone()
        {
            return Err(BackendError::Rejected {
                status: 400,
                message,
            });
        }
        self.submissions
            .lock()
            .expect("backend mutex poisoned")
            .push(submission.clone());
        Ok(())
    }

    async fn check_out(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt, BackendError> {
        self.checkouts
            .lock()
            .expect("backend mutex poisoned")
            .push(request.clone());
        let half_day = *self.half_day.lock().expect("backend mutex poisoned");
        Ok(CheckoutReceipt {
            success: true,
            message: Some("Checked out successfully".to_string()),
            is_half_day: half_day.is_some(),
            work_hours: half_day,
        })
    }
}

struct StaticOffices(Vec<Office>);

#[async_trait]
impl OfficeDirectory for StaticOffices {
    async fn fetch_offices(&self, _department: &str) -> Result<Vec<Office>, OfficeFetchError> {
        Ok(self.0.clone())
    }
}

struct SilentProvider;

impl LocationProvider for SilentProvider {
    fn request_position(&self, _options: PositionOptions, _callback: PositionCallback) {}
}

struct PromptPermission;

#[async_trait]
impl PermissionProbe for PromptPermission {
    async fn probe(&self) -> PermissionState {
        PermissionState::Prompt
    }
}

pub(super) fn head_office() -> Office {
    Office {
        id: OfficeId("HQ".to_string()),
        name: "Head Office".to_string(),
        address: "MG Road".to_string(),
        latitude: 12.9716,
        longitude: 77.5946,
        radius_meters: 150.0,
        department: None,
        active: true,
    }
}

/// Attendance endpoints over `backend`, with the head office as the only office.
pub(super) fn api(backend: Arc<MemoryBackend>) -> Arc<AttendanceApi> {
    let registry = OfficeRegistry::new(Arc::new(StaticOffices(vec![head_office()])));
    Arc::new(
        AttendanceApi::new(backend, Arc::new(registry), AcquisitionSettings::default(), 1)
            .with_clock(afternoon),
    )
}

pub(super) fn controller(backend: Arc<MemoryBackend>) -> AttendanceFlowController {
    let geofence = GeofenceEvaluator::new(
        Arc::new(OfficeRegistry::new(Arc::new(StaticOffices(Vec::new())))),
        Arc::new(PromptPermission),
        Arc::new(PositionAcquirer::new(
            Arc::new(SilentProvider),
            AcquisitionSettings::default(),
        )),
    );
    AttendanceFlowController::new(employee(), backend, Arc::new(geofence), 1)
        .with_clock(afternoon)
}
