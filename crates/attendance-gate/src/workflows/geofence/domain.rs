use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a registered office as issued by the attendance backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OfficeId(pub String);

impl fmt::Display for OfficeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for OfficeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match LooseScalar::deserialize(deserializer)? {
            LooseScalar::Integer(value) => Ok(Self(value.to_string())),
            LooseScalar::Float(value) => Ok(Self(value.to_string())),
            LooseScalar::Text(value) => Ok(Self(value)),
            LooseScalar::Flag(_) => Err(serde::de::Error::custom("office id cannot be a boolean")),
        }
    }
}

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components fall inside the ranges the distance formula is defined for.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Registered office with the circular geofence drawn around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub address: String,
    #[serde(deserialize_with = "deserialize_degrees")]
    pub latitude: f64,
    #[serde(deserialize_with = "deserialize_degrees")]
    pub longitude: f64,
    #[serde(default, deserialize_with = "deserialize_radius")]
    pub radius_meters: f64,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(
        default = "default_active",
        alias = "is_active",
        deserialize_with = "deserialize_flag"
    )]
    pub active: bool,
}

impl Office {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Offices without a department tag were already scoped by the directory's own filter.
    pub fn serves(&self, department: &str) -> bool {
        match &self.department {
            Some(own) => own.trim().eq_ignore_ascii_case(department.trim()),
            None => true,
        }
    }

    pub fn is_eligible_for(&self, department: &str) -> bool {
        self.active && self.serves(department)
    }
}

/// Single position fix reported by the device location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
    pub timestamp_ms: i64,
}

impl Position {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Location permission as reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
    /// The host exposes no permission query; only an acquisition attempt reveals the state.
    Unsupported,
}

impl PermissionState {
    pub fn from_host(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "granted" => Self::Granted,
            "denied" => Self::Denied,
            "prompt" => Self::Prompt,
            _ => Self::Unsupported,
        }
    }

    pub fn needs_user_action(&self) -> bool {
        matches!(self, Self::Prompt | Self::Unsupported)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Prompt => "prompt",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Reason a geofence evaluation could not produce a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceErrorKind {
    PermissionDenied,
    /// Permission was never granted and the evaluation was not user initiated.
    PermissionRequired,
    PositionUnavailable,
    Timeout,
    /// No active office serves the department; office fetch failures land here too.
    NoOfficesConfigured,
    Unknown,
}

/// Outcome of one geofence evaluation.
///
/// Either `nearest_office`/`distance_meters` are populated or `error_kind` is, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceResult {
    pub in_range: bool,
    pub nearest_office: Option<Office>,
    pub distance_meters: Option<f64>,
    /// `None` when the evaluation ended before the permission was consulted.
    pub permission: Option<PermissionState>,
    pub error_kind: Option<GeofenceErrorKind>,
}

impl GeofenceResult {
    pub fn located(office: Office, distance_meters: f64, permission: PermissionState) -> Self {
        let in_range = distance_meters <= office.radius_meters;
        Self {
            in_range,
            nearest_office: Some(office),
            distance_meters: Some(distance_meters),
            permission: Some(permission),
            error_kind: None,
        }
    }

    pub fn failed(error_kind: GeofenceErrorKind, permission: PermissionState) -> Self {
        Self {
            in_range: false,
            nearest_office: None,
            distance_meters: None,
            permission: Some(permission),
            error_kind: Some(error_kind),
        }
    }

    /// No office serves the department; reports only a permission the caller already knew.
    pub fn no_offices(permission: Option<PermissionState>) -> Self {
        Self {
            permission,
            ..Self::failed(GeofenceErrorKind::NoOfficesConfigured, PermissionState::Unsupported)
        }
    }

    pub fn is_located(&self) -> bool {
        self.error_kind.is_none()
    }
}

fn default_active() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseScalar {
    Flag(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

fn deserialize_degrees<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match LooseScalar::deserialize(deserializer)? {
        LooseScalar::Integer(value) => Ok(value as f64),
        LooseScalar::Float(value) => Ok(value),
        LooseScalar::Text(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|err| serde::de::Error::custom(format!("invalid coordinate '{raw}': {err}"))),
        LooseScalar::Flag(_) => Err(serde::de::Error::custom("coordinate cannot be a boolean")),
    }
}

fn deserialize_radius<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let radius = match Option::<LooseScalar>::deserialize(deserializer)? {
        None => 0.0,
        Some(LooseScalar::Integer(value)) => value as f64,
        Some(LooseScalar::Float(value)) => value,
        Some(LooseScalar::Text(raw)) => raw.trim().parse::<f64>().unwrap_or(0.0),
        Some(LooseScalar::Flag(_)) => 0.0,
    };

    if radius.is_finite() && radius > 0.0 {
        Ok(radius)
    } else {
        Ok(0.0)
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match LooseScalar::deserialize(deserializer)? {
        LooseScalar::Flag(value) => Ok(value),
        LooseScalar::Integer(value) => Ok(value != 0),
        LooseScalar::Float(value) => Ok(value != 0.0),
        LooseScalar::Text(raw) => Ok(matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        )),
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
