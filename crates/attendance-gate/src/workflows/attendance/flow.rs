//! Check-in flow for the attendance screen.
//!
//! [`AttendanceFlow`] is a value: each [`FlowEvent`] consumes the current flow and returns
//! the next one, plus an optional [`FlowNotice`] for the user. Events that do not apply to
//! the current state leave the flow untouched.
//!
//! Flows and events are built on the server only: neither deserializes, so a client can
//! never hand in a state or a geofence verdict.

use serde::{Deserialize, Serialize};

use super::domain::{AttendanceType, CaptureArtifact};
use super::wfh::WfhAvailability;
use crate::workflows::geofence::{OfficeChoice, OfficeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    Idle,
    TypeSelected,
    OfficeSelected,
    ReadyForCapture,
    Submitting,
    Complete,
}

impl FlowState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::TypeSelected => "type_selected",
            Self::OfficeSelected => "office_selected",
            Self::ReadyForCapture => "ready_for_capture",
            Self::Submitting => "submitting",
            Self::Complete => "complete",
        }
    }
}

/// Office picked for office attendance, with its geofence verdict at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OfficeSelection {
    pub office_id: OfficeId,
    pub name: String,
    pub in_range: bool,
}

impl From<&OfficeChoice> for OfficeSelection {
    fn from(choice: &OfficeChoice) -> Self {
        Self {
            office_id: choice.office.id.clone(),
            name: choice.office.name.clone(),
            in_range: choice.in_range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    SelectType {
        attendance_type: AttendanceType,
        wfh: WfhAvailability,
    },
    SelectOffice {
        office: OfficeSelection,
    },
    Proceed,
    Capture {
        photo: CaptureArtifact,
    },
    Submit,
    SubmitSucceeded,
    SubmitFailed {
        message: String,
    },
    /// Screen re-entry.
    Reset,
    /// Discard the capture and start over.
    Retake,
}

impl FlowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectType { .. } => "select_type",
            Self::SelectOffice { .. } => "select_office",
            Self::Proceed => "proceed",
            Self::Capture { .. } => "capture",
            Self::Submit => "submit",
            Self::SubmitSucceeded => "submit_succeeded",
            Self::SubmitFailed { .. } => "submit_failed",
            Self::Reset => "reset",
            Self::Retake => "retake",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum FlowNotice {
    TypeRequired,
    OfficeRequired,
    NotInOfficeRange { office_id: OfficeId },
    OfficeUnavailable { office_id: OfficeId },
    WfhLimitReached { used: u64, limit: u64 },
    CaptureRequired,
    Submitted,
    SubmitFailed { message: String },
    OutOfOrder { state: FlowState, event: &'static str },
}

impl FlowNotice {
    pub fn message(&self) -> String {
        match self {
            Self::TypeRequired => "Please select WFH / Office / Client".to_string(),
            Self::OfficeRequired => "Please select an office".to_string(),
            Self::NotInOfficeRange { .. } => "You are not within office range.".to_string(),
            Self::OfficeUnavailable { office_id } => {
                format!("Office {office_id} is not available for your department")
            }
            Self::WfhLimitReached { used, limit } => {
                format!("WFH limit reached for this month ({used}/{limit}). Request an extension instead.")
            }
            Self::CaptureRequired => "Please capture a photo".to_string(),
            Self::Submitted => "Attendance marked successfully".to_string(),
            Self::SubmitFailed { message } => message.clone(),
            Self::OutOfOrder { state, event } => {
                format!("'{event}' is not available while the flow is {}", state.label())
            }
        }
    }

    /// Whether the notice reports a problem rather than progress.
    pub fn is_warning(&self) -> bool {
        !matches!(self, Self::Submitted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowTransition {
    pub flow: AttendanceFlow,
    pub notice: Option<FlowNotice>,
}

/// Selections made on the attendance screen so far.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AttendanceFlow {
    state: FlowState,
    attendance_type: Option<AttendanceType>,
    office: Option<OfficeSelection>,
    capture: Option<CaptureArtifact>,
}

impl AttendanceFlow {
    /// Fresh flow for a screen entry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn attendance_type(&self) -> Option<AttendanceType> {
        self.attendance_type
    }

    pub fn office(&self) -> Option<&OfficeSelection> {
        self.office.as_ref()
    }

    pub fn capture(&self) -> Option<&CaptureArtifact> {
        self.capture.as_ref()
    }

    pub fn transition(self, event: FlowEvent) -> FlowTransition {
        let state = self.state;
        match (state, event) {
            (_, FlowEvent::Reset | FlowEvent::Retake) => Self::new().settle(),

            (
                FlowState::Idle | FlowState::TypeSelected,
                FlowEvent::SelectType {
                    attendance_type,
                    wfh,
                },
            ) => {
                if attendance_type == AttendanceType::Wfh {
                    if let WfhAvailability::LimitReached { used, limit } = wfh {
                        return self.refuse(FlowNotice::WfhLimitReached { used, limit });
                    }
                }
                Self {
                    state: FlowState::TypeSelected,
                    attendance_type: Some(attendance_type),
                    office: None,
                    capture: None,
                }
                .settle()
            }

            (FlowState::TypeSelected | FlowState::OfficeSelected, FlowEvent::SelectOffice { office })
                if self.attendance_type == Some(AttendanceType::Office) =>
            {
                Self {
                    state: FlowState::OfficeSelected,
                    office: Some(office),
                    ..self
                }
                .settle()
            }

            (FlowState::Idle, FlowEvent::Proceed) => self.refuse(FlowNotice::TypeRequired),

            (FlowState::TypeSelected, FlowEvent::Proceed) => {
                let selected = self.attendance_type;
                match selected {
                    Some(AttendanceType::Office) => self.refuse(FlowNotice::OfficeRequired),
                    Some(_) => self.advance(FlowState::ReadyForCapture),
                    None => self.refuse(FlowNotice::TypeRequired),
                }
            }

            (FlowState::OfficeSelected, FlowEvent::Proceed) => {
                let verdict = self
                    .office
                    .as_ref()
                    .map(|office| (office.in_range, office.office_id.clone()));
                match verdict {
                    Some((true, _)) => self.advance(FlowState::ReadyForCapture),
                    Some((false, office_id)) => {
                        self.refuse(FlowNotice::NotInOfficeRange { office_id })
                    }
                    None => self.refuse(FlowNotice::OfficeRequired),
                }
            }

            (FlowState::ReadyForCapture, FlowEvent::Capture { photo }) => {
                if photo.is_empty() {
                    return self.refuse(FlowNotice::CaptureRequired);
                }
                Self {
                    capture: Some(photo),
                    ..self
                }
                .settle()
            }

            (FlowState::ReadyForCapture, FlowEvent::Submit) => {
                if self.capture.is_none() {
                    return self.refuse(FlowNotice::CaptureRequired);
                }
                self.advance(FlowState::Submitting)
            }

            (FlowState::Submitting, FlowEvent::SubmitSucceeded) => FlowTransition {
                flow: Self {
                    state: FlowState::Complete,
                    ..self
                },
                notice: Some(FlowNotice::Submitted),
            },

            // selections and capture survive so the user can resubmit
            (FlowState::Submitting, FlowEvent::SubmitFailed { message }) => FlowTransition {
                flow: Self {
                    state: FlowState::ReadyForCapture,
                    ..self
                },
                notice: Some(FlowNotice::SubmitFailed { message }),
            },

            (state, event) => {
                let event = event.name();
                self.refuse(FlowNotice::OutOfOrder { state, event })
            }
        }
    }

    fn advance(self, state: FlowState) -> FlowTransition {
        Self { state, ..self }.settle()
    }

    fn settle(self) -> FlowTransition {
        FlowTransition {
            flow: self,
            notice: None,
        }
    }

    fn refuse(self, notice: FlowNotice) -> FlowTransition {
        FlowTransition {
            flow: self,
            notice: Some(notice),
        }
    }
}
