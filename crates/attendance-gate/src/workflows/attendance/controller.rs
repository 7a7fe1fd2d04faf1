use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use super::backend::AttendanceBackend;
use super::checkout::{CheckoutGate, CheckoutOutcome, TodaySummary, WorkSpan};
use super::domain::{
    AttendanceRecord, AttendanceSubmission, AttendanceType, CaptureArtifact, CheckoutRequest,
    Employee,
};
use super::flow::{AttendanceFlow, FlowEvent, FlowNotice, FlowState, FlowTransition};
use super::wfh::WfhAvailability;
use crate::workflows::geofence::{
    Coordinates, EvaluationRequest, GeofenceEvaluator, GeofenceResult, OfficeChoice, OfficeChoices,
    OfficeId,
};

fn local_clock() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Today's record with the dashboard card and check-out gate derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayView {
    pub record: Option<AttendanceRecord>,
    pub summary: TodaySummary,
    pub checkout: CheckoutGate,
}

impl TodayView {
    pub fn new(record: Option<AttendanceRecord>, in_range: bool) -> Self {
        let summary = TodaySummary::from_record(record.as_ref());
        let checkout = CheckoutGate::evaluate(record.as_ref(), in_range);
        Self {
            record,
            summary,
            checkout,
        }
    }
}

/// Drives one employee's attendance screen against the backend and the geofence engine.
pub struct AttendanceFlowController {
    employee: Employee,
    backend: Arc<dyn AttendanceBackend>,
    geofence: Arc<GeofenceEvaluator>,
    wfh_monthly_limit: u64,
    clock: fn() -> NaiveDateTime,
}

impl AttendanceFlowController {
    pub fn new(
        employee: Employee,
        backend: Arc<dyn AttendanceBackend>,
        geofence: Arc<GeofenceEvaluator>,
        wfh_monthly_limit: u64,
    ) -> Self {
        Self {
            employee,
            backend,
            geofence,
            wfh_monthly_limit,
            clock: local_clock,
        }
    }

    /// Replace the local wall clock used for check-in and check-out times.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn employee(&self) -> &Employee {
        &self.employee
    }

    /// Screen entry always starts from a clean flow.
    pub fn enter_screen(&self) -> AttendanceFlow {
        AttendanceFlow::new()
    }

    /// Refetch the department's offices so this screen sees the backend's current list.
    pub async fn refresh_offices(&self) {
        self.geofence
            .registry()
            .refresh(&self.employee.department)
            .await;
    }

    pub async fn geofence(&self, request: EvaluationRequest) -> GeofenceResult {
        self.geofence.evaluate_with(request).await
    }

    pub async fn wfh_availability(&self) -> WfhAvailability {
        let today = (self.clock)().date();
        match self.backend.wfh_eligibility(&self.employee.id, today).await {
            Ok(eligibility) => WfhAvailability::assess(Some(&eligibility), self.wfh_monthly_limit),
            Err(err) => {
                warn!(employee = %self.employee.id, error = %err, "wfh eligibility lookup failed");
                WfhAvailability::assess(None, self.wfh_monthly_limit)
            }
        }
    }

    pub async fn select_type(
        &self,
        flow: AttendanceFlow,
        attendance_type: AttendanceType,
    ) -> FlowTransition {
        let wfh = match attendance_type {
            AttendanceType::Wfh => self.wfh_availability().await,
            _ => WfhAvailability::default(),
        };
        flow.transition(FlowEvent::SelectType {
            attendance_type,
            wfh,
        })
    }

    /// Offices offered after choosing office attendance, refetched every time.
    pub async fn office_choices(&self) -> OfficeChoices {
        self.geofence.office_choices(&self.employee.department).await
    }

    pub fn select_office(&self, flow: AttendanceFlow, choice: &OfficeChoice) -> FlowTransition {
        flow.transition(FlowEvent::SelectOffice {
            office: choice.into(),
        })
    }

    /// Select an office by id, judging its geofence against `at` at selection time.
    ///
    /// Without a position the office counts as out of range.
    pub async fn select_office_at(
        &self,
        flow: AttendanceFlow,
        office_id: &OfficeId,
        at: Option<Coordinates>,
    ) -> FlowTransition {
        let offices = self
            .geofence
            .registry()
            .load(&self.employee.department)
            .await;
        let Some(office) = offices.iter().find(|office| &office.id == office_id) else {
            warn!(employee = %self.employee.id, office = %office_id, "unknown office selected");
            return FlowTransition {
                flow,
                notice: Some(FlowNotice::OfficeUnavailable {
                    office_id: office_id.clone(),
                }),
            };
        };

        let choice = match at {
            Some(at) => OfficeChoice::measured(office, at),
            None => OfficeChoice::unmeasured(office),
        };
        self.select_office(flow, &choice)
    }

    pub fn proceed(&self, flow: AttendanceFlow) -> FlowTransition {
        flow.transition(FlowEvent::Proceed)
    }

    pub fn capture(&self, flow: AttendanceFlow, photo: CaptureArtifact) -> FlowTransition {
        flow.transition(FlowEvent::Capture { photo })
    }

    pub fn retake(&self, flow: AttendanceFlow) -> FlowTransition {
        flow.transition(FlowEvent::Retake)
    }

    /// Submit the check-in. A failed submission returns the flow to capture for a retry.
    ///
    /// `location` is only sent with office and client check-ins.
    pub async fn submit(
        &self,
        flow: AttendanceFlow,
        location: Option<Coordinates>,
    ) -> FlowTransition {
        let submitting = flow.transition(FlowEvent::Submit);
        if submitting.flow.state() != FlowState::Submitting {
            return submitting;
        }

        let flow = submitting.flow;
        let Some(submission) = self.submission(&flow, location) else {
            return flow.transition(FlowEvent::SubmitFailed {
                message: "Please select WFH / Office / Client".to_string(),
            });
        };

        match self.backend.mark_attendance(&submission).await {
            Ok(()) => {
                info!(
                    employee = %self.employee.id,
                    attendance_type = submission.attendance_type.label(),
                    office = ?submission.office_id,
                    "attendance marked"
                );
                flow.transition(FlowEvent::SubmitSucceeded)
            }
            Err(err) => {
                warn!(employee = %self.employee.id, error = %err, "attendance submission failed");
                flow.transition(FlowEvent::SubmitFailed {
                    message: err.user_message(),
                })
            }
        }
    }

    fn submission(
        &self,
        flow: &AttendanceFlow,
        location: Option<Coordinates>,
    ) -> Option<AttendanceSubmission> {
        let attendance_type = flow.attendance_type()?;
        let photo = flow.capture()?.clone();
        let office_id = match attendance_type {
            AttendanceType::Office => Some(flow.office()?.office_id.clone()),
            _ => None,
        };
        let now = (self.clock)();

        Some(AttendanceSubmission {
            employee_id: self.employee.id.clone(),
            date: now.date(),
            check_in: now.time(),
            attendance_type,
            status: attendance_type.check_in_status(),
            office_id,
            location: location.filter(|_| attendance_type != AttendanceType::Wfh),
            photo,
        })
    }

    /// Today's card and check-out gate. Lookup failures read as "not marked".
    pub async fn today(&self, in_range: bool) -> TodayView {
        let record = match self.backend.today_attendance(&self.employee.id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(employee = %self.employee.id, error = %err, "today's attendance lookup failed");
                None
            }
        };
        TodayView::new(record, in_range)
    }

    /// Check out today's open record when the gate allows it.
    pub async fn check_out(
        &self,
        in_range: bool,
        location: Option<Coordinates>,
    ) -> CheckoutOutcome {
        let record = match self.backend.today_attendance(&self.employee.id).await {
            Ok(record) => record,
            Err(err) => {
                return CheckoutOutcome::Failed {
                    message: err.user_message(),
                }
            }
        };

        let gate = CheckoutGate::evaluate(record.as_ref(), in_range);
        let (Some(record), true) = (record, gate.is_enabled()) else {
            info!(employee = %self.employee.id, ?gate, "check-out blocked");
            return CheckoutOutcome::Blocked { gate };
        };

        let now = (self.clock)();
        // a shift past midnight is still closed against the day it started
        let shift_date = record.date.unwrap_or(now.date());
        if let Some(check_in) = record.check_in_time {
            let span = WorkSpan::since(shift_date, check_in, now);
            if span.is_too_short() {
                return CheckoutOutcome::TooEarly {
                    worked_hours: span.hours,
                };
            }
        }

        let request = CheckoutRequest {
            employee_id: self.employee.id.clone(),
            date: shift_date,
            check_out: now.time(),
            location,
        };
        match self.backend.check_out(&request).await {
            Ok(receipt) => {
                info!(employee = %self.employee.id, half_day = receipt.is_half_day, "checked out");
                CheckoutOutcome::recorded(receipt.is_half_day, receipt.work_hours)
            }
            Err(err) => {
                warn!(employee = %self.employee.id, error = %err, "check-out failed");
                CheckoutOutcome::Failed {
                    message: err.user_message(),
                }
            }
        }
    }
}
