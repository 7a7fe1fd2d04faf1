//! Office geofence evaluation: permission probing, one-shot position acquisition,
//! office lookup and nearest-office distance resolution.

pub mod distance;
pub mod domain;
pub mod evaluator;
pub mod monitor;
pub mod permission;
pub mod position;
pub mod registry;
pub mod router;
pub mod status;

#[cfg(test)]
mod tests;

pub use distance::{distance, distance_between, EARTH_RADIUS_METERS};
pub use domain::{
    Coordinates, GeofenceErrorKind, GeofenceResult, Office, OfficeId, PermissionState, Position,
};
pub use evaluator::{
    nearest_office, EvaluationRequest, EvaluationTrigger, GeofenceEvaluator, OfficeChoice,
    OfficeChoices, OfficeProximity,
};
pub use monitor::{EvaluationTicket, GeofenceMonitor, Publication};
pub use permission::{PermissionProbe, PermissionWatch, UnsupportedPermissions};
pub use position::{
    AcquisitionSettings, LocationProvider, PositionAcquirer, PositionCallback, PositionFailure,
    PositionOptions, ProviderError, ReportedCoords, ReportedFix, ReportedFixProvider,
};
pub use registry::{OfficeDirectory, OfficeFetchError, OfficeRegistry};
pub use router::{geofence_router, EvaluatePayload, EvaluateResponse, GeofenceApi};
pub use status::{LocationStatus, RetryAffordance, StatusTone};
