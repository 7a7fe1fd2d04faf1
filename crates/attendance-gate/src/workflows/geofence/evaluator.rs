use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use super::distance::distance_between;
use super::domain::{
    Coordinates, GeofenceErrorKind, GeofenceResult, Office, PermissionState, Position,
};
use super::permission::PermissionProbe;
use super::position::{PositionAcquirer, PositionFailure};
use super::registry::OfficeRegistry;

/// What caused an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationTrigger {
    /// Dashboard load or another background refresh; never prompts the user.
    #[default]
    Passive,
    /// The user pressed an enable/retry control.
    UserInitiated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub department: String,
    /// Host permission already known to the caller; probed when absent.
    pub permission: Option<PermissionState>,
    pub trigger: EvaluationTrigger,
}

impl EvaluationRequest {
    pub fn passive(department: impl Into<String>) -> Self {
        Self {
            department: department.into(),
            permission: None,
            trigger: EvaluationTrigger::Passive,
        }
    }

    pub fn user_initiated(department: impl Into<String>) -> Self {
        Self {
            department: department.into(),
            permission: None,
            trigger: EvaluationTrigger::UserInitiated,
        }
    }

    pub fn with_permission(mut self, permission: PermissionState) -> Self {
        self.permission = Some(permission);
        self
    }
}

/// Distance from a position to one office and whether that office's geofence contains it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficeProximity {
    pub office: Office,
    pub distance_meters: f64,
    pub in_range: bool,
}

impl OfficeProximity {
    pub fn measure(office: &Office, at: Coordinates) -> Self {
        let distance_meters = distance_between(at, office.coordinates());
        Self {
            office: office.clone(),
            distance_meters,
            in_range: distance_meters <= office.radius_meters,
        }
    }
}

/// Nearest office to `at`; the first office wins ties.
pub fn nearest_office(offices: &[Office], at: Coordinates) -> Option<(&Office, f64)> {
    let mut nearest: Option<(&Office, f64)> = None;
    for office in offices {
        let meters = distance_between(at, office.coordinates());
        match nearest {
            Some((_, best)) if meters >= best => {}
            _ => nearest = Some((office, meters)),
        }
    }
    nearest
}

/// Resolves permission, position and offices into one [`GeofenceResult`].
pub struct GeofenceEvaluator {
    registry: Arc<OfficeRegistry>,
    permissions: Arc<dyn PermissionProbe>,
    acquirer: Arc<PositionAcquirer>,
}

impl GeofenceEvaluator {
    pub fn new(
        registry: Arc<OfficeRegistry>,
        permissions: Arc<dyn PermissionProbe>,
        acquirer: Arc<PositionAcquirer>,
    ) -> Self {
        Self {
            registry,
            permissions,
            acquirer,
        }
    }

    pub fn registry(&self) -> &Arc<OfficeRegistry> {
        &self.registry
    }

    pub fn permission_changes(&self) -> Option<watch::Receiver<PermissionState>> {
        self.permissions.subscribe()
    }

    /// Passive evaluation for a dashboard load.
    pub async fn evaluate(&self, department: &str) -> GeofenceResult {
        self.evaluate_with(EvaluationRequest::passive(department))
            .await
    }

    pub async fn evaluate_with(&self, request: EvaluationRequest) -> GeofenceResult {
        let EvaluationRequest {
            department,
            permission,
            trigger,
        } = request;

        let offices = self.registry.load(&department).await;
        if offices.is_empty() {
            debug!(%department, "no eligible offices; skipping location work");
            return GeofenceResult::no_offices(permission);
        }

        let permission = match permission {
            Some(known) => known,
            None => self.permissions.probe().await,
        };

        let (options, permission_on_fix) = match (permission, trigger) {
            (PermissionState::Denied, _) => {
                return GeofenceResult::failed(GeofenceErrorKind::PermissionDenied, permission);
            }
            (PermissionState::Granted, _) => (self.acquirer.settings().opportunistic(), permission),
            (PermissionState::Prompt | PermissionState::Unsupported, EvaluationTrigger::Passive) => {
                debug!(permission = permission.label(), "waiting for the user to enable location");
                return GeofenceResult::failed(GeofenceErrorKind::PermissionRequired, permission);
            }
            // a fix answering an explicit request means the prompt was accepted
            (PermissionState::Prompt, EvaluationTrigger::UserInitiated) => (
                self.acquirer.settings().explicit_request(),
                PermissionState::Granted,
            ),
            (PermissionState::Unsupported, EvaluationTrigger::UserInitiated) => {
                (self.acquirer.settings().explicit_request(), permission)
            }
        };

        match self.acquirer.acquire(options).await {
            Ok(position) => locate(&offices, &position, permission_on_fix),
            Err(PositionFailure::PermissionDenied) => {
                GeofenceResult::failed(GeofenceErrorKind::PermissionDenied, PermissionState::Denied)
            }
            Err(failure) => {
                debug!(error = %failure, "position acquisition failed");
                GeofenceResult::failed(failure.into(), permission)
            }
        }
    }

    /// Distances from the current position to every office serving `department`.
    ///
    /// Offices are refetched; without a usable fix the list carries no distances.
    pub async fn office_choices(&self, department: &str) -> OfficeChoices {
        let offices = self.registry.refresh(department).await;
        let permission = self.permissions.probe().await;

        let position = match permission {
            PermissionState::Granted => self
                .acquirer
                .acquire(self.acquirer.settings().opportunistic())
                .await
                .ok(),
            _ => None,
        };

        match position {
            Some(position) => OfficeChoices {
                permission,
                located: true,
                offices: offices
                    .iter()
                    .map(|office| OfficeChoice::measured(office, position.coordinates()))
                    .collect(),
            },
            None => OfficeChoices {
                permission,
                located: false,
                offices: offices.iter().map(OfficeChoice::unmeasured).collect(),
            },
        }
    }
}

fn locate(offices: &[Office], position: &Position, permission: PermissionState) -> GeofenceResult {
    match nearest_office(offices, position.coordinates()) {
        Some((office, meters)) => {
            let result = GeofenceResult::located(office.clone(), meters, permission);
            debug!(
                office = %office.id,
                distance_m = meters.round(),
                in_range = result.in_range,
                "nearest office resolved"
            );
            result
        }
        None => GeofenceResult::failed(GeofenceErrorKind::NoOfficesConfigured, permission),
    }
}

/// Office offered on the attendance screen once the employee picks office work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficeChoice {
    pub office: Office,
    pub distance_meters: Option<f64>,
    pub in_range: bool,
}

impl OfficeChoice {
    pub fn measured(office: &Office, at: Coordinates) -> Self {
        let proximity = OfficeProximity::measure(office, at);
        Self {
            office: proximity.office,
            distance_meters: Some(proximity.distance_meters),
            in_range: proximity.in_range,
        }
    }

    pub fn unmeasured(office: &Office) -> Self {
        Self {
            office: office.clone(),
            distance_meters: None,
            in_range: false,
        }
    }

    pub fn range_label(&self) -> String {
        match self.distance_meters {
            Some(meters) if self.in_range => format!("In Range ({}m)", meters.round()),
            Some(meters) => format!("Out of Range ({}m)", meters.round()),
            None => "Location check unavailable".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfficeChoices {
    pub permission: PermissionState,
    pub located: bool,
    pub offices: Vec<OfficeChoice>,
}
