pub mod attendance;
pub mod geofence;
