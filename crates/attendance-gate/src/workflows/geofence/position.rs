//! One-shot position acquisition over a callback-style location provider.
//!
//! The provider may answer with a fix, answer with a classified error, or never answer at
//! all. [`PositionAcquirer::acquire`] races those against an outer guard timer and settles
//! exactly once: the first completion claims the settle slot and every later callback
//! finds it empty.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::domain::{GeofenceErrorKind, Position};

pub const PROVIDER_TIMEOUT: Duration = Duration::from_millis(7_000);
pub const GUARD_TIMEOUT: Duration = Duration::from_millis(8_000);
pub const OPPORTUNISTIC_MAX_AGE: Duration = Duration::from_millis(60_000);

/// Request options forwarded to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
}

/// Timer settings for acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionSettings {
    pub provider_timeout: Duration,
    pub guard_timeout: Duration,
    pub opportunistic_max_age: Duration,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            provider_timeout: PROVIDER_TIMEOUT,
            guard_timeout: GUARD_TIMEOUT,
            opportunistic_max_age: OPPORTUNISTIC_MAX_AGE,
        }
    }
}

impl AcquisitionSettings {
    /// Options for an acquisition the user asked for: always a fresh sensor read.
    pub fn explicit_request(&self) -> PositionOptions {
        PositionOptions {
            enable_high_accuracy: true,
            timeout_ms: duration_ms(self.provider_timeout),
            maximum_age_ms: 0,
        }
    }

    /// Options for background checks, which accept a recent cached fix.
    pub fn opportunistic(&self) -> PositionOptions {
        PositionOptions {
            enable_high_accuracy: true,
            timeout_ms: duration_ms(self.provider_timeout),
            maximum_age_ms: duration_ms(self.opportunistic_max_age),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Classified acquisition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PositionFailure {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("position request timed out")]
    Timeout,
    #[error("unknown location error")]
    Unknown,
}

impl PositionFailure {
    /// Map the provider's numeric error code (1, 2, 3) onto the failure taxonomy.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            _ => Self::Unknown,
        }
    }
}

impl From<PositionFailure> for GeofenceErrorKind {
    fn from(value: PositionFailure) -> Self {
        match value {
            PositionFailure::PermissionDenied => GeofenceErrorKind::PermissionDenied,
            PositionFailure::PositionUnavailable => GeofenceErrorKind::PositionUnavailable,
            PositionFailure::Timeout => GeofenceErrorKind::Timeout,
            PositionFailure::Unknown => GeofenceErrorKind::Unknown,
        }
    }
}

/// Error object delivered by the provider's error callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    pub code: u16,
    #[serde(default)]
    pub message: Option<String>,
}

type Outcome = Result<Position, PositionFailure>;

#[derive(Debug)]
struct SettleSlot {
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl SettleSlot {
    fn claim(&self) -> Option<oneshot::Sender<Outcome>> {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn is_empty(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Handle the provider uses to answer a position request.
///
/// Clones share one settle slot, so success and error callbacks can be held separately.
#[derive(Debug, Clone)]
pub struct PositionCallback {
    slot: Arc<SettleSlot>,
}

impl PositionCallback {
    fn new(sender: oneshot::Sender<Outcome>) -> Self {
        Self {
            slot: Arc::new(SettleSlot {
                sender: Mutex::new(Some(sender)),
            }),
        }
    }

    /// Deliver a fix. Returns `false` when the request had already settled.
    pub fn resolve(&self, position: Position) -> bool {
        self.settle(Ok(position))
    }

    /// Deliver a classified provider error. Returns `false` when already settled.
    pub fn reject(&self, error: ProviderError) -> bool {
        self.settle(Err(PositionFailure::from_code(error.code)))
    }

    pub fn is_settled(&self) -> bool {
        self.slot.is_empty()
    }

    fn settle(&self, outcome: Outcome) -> bool {
        match self.slot.claim() {
            Some(sender) => {
                // receiver gone means the acquire future was dropped; the claim still counts
                let _ = sender.send(outcome);
                true
            }
            None => {
                debug!("discarding late location callback");
                false
            }
        }
    }

    /// Claim the slot on behalf of the guard timer.
    fn expire(&self) -> bool {
        self.slot.claim().is_some()
    }
}

/// Callback-style device location capability.
pub trait LocationProvider: Send + Sync {
    /// Start a one-shot request; answer through `callback` at most once, from any task.
    fn request_position(&self, options: PositionOptions, callback: PositionCallback);
}

/// Device reply already captured by a client, replayed as a provider answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportedFix {
    Fix {
        coords: ReportedCoords,
        timestamp: i64,
    },
    Error(ProviderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportedCoords {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl ReportedCoords {
    pub fn at(&self, timestamp_ms: i64) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy: self.accuracy,
            timestamp_ms,
        }
    }
}

impl ReportedFix {
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Fix { coords, timestamp } => Some(coords.at(*timestamp)),
            Self::Error(_) => None,
        }
    }
}

/// Provider that answers immediately with a reply captured elsewhere.
///
/// With no reply on hand it reports the position as unavailable.
#[derive(Debug, Clone, Default)]
pub struct ReportedFixProvider {
    reply: Option<ReportedFix>,
}

impl ReportedFixProvider {
    pub fn new(reply: Option<ReportedFix>) -> Self {
        Self { reply }
    }
}

impl LocationProvider for ReportedFixProvider {
    fn request_position(&self, _options: PositionOptions, callback: PositionCallback) {
        let Some(reply) = &self.reply else {
            callback.reject(ProviderError {
                code: 2,
                message: Some("no position reported".to_string()),
            });
            return;
        };

        match reply {
            ReportedFix::Fix { coords, timestamp } => {
                callback.resolve(coords.at(*timestamp));
            }
            ReportedFix::Error(error) => {
                callback.reject(error.clone());
            }
        }
    }
}

fn system_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Acquires single fixes, remembering the last one for cache-tolerant requests.
pub struct PositionAcquirer {
    provider: Arc<dyn LocationProvider>,
    settings: AcquisitionSettings,
    last_fix: Mutex<Option<Position>>,
    clock: fn() -> i64,
}

impl PositionAcquirer {
    pub fn new(provider: Arc<dyn LocationProvider>, settings: AcquisitionSettings) -> Self {
        Self {
            provider,
            settings,
            last_fix: Mutex::new(None),
            clock: system_clock_ms,
        }
    }

    /// Replace the millisecond wall clock used to age cached fixes.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &AcquisitionSettings {
        &self.settings
    }

    /// Request one fix. Resolves exactly once, within the guard timeout.
    pub async fn acquire(&self, options: PositionOptions) -> Result<Position, PositionFailure> {
        if let Some(cached) = self.cached_fix(options.maximum_age_ms) {
            debug!(
                age_ms = (self.clock)() - cached.timestamp_ms,
                "serving cached position fix"
            );
            return Ok(cached);
        }

        let (sender, mut receiver) = oneshot::channel();
        let callback = PositionCallback::new(sender);
        self.provider.request_position(options, callback.clone());

        let outcome = match tokio::time::timeout(self.settings.guard_timeout, &mut receiver).await
        {
            Ok(Ok(outcome)) => outcome,
            // every sender clone is held by `callback` for the whole wait
            Ok(Err(_)) => Err(PositionFailure::Unknown),
            Err(_) => {
                if callback.expire() {
                    warn!(
                        guard_ms = duration_ms(self.settings.guard_timeout),
                        "location provider never answered; guard timer fired"
                    );
                    Err(PositionFailure::Timeout)
                } else {
                    // the provider claimed the slot just before the timer did
                    receiver.await.unwrap_or(Err(PositionFailure::Unknown))
                }
            }
        };

        if let Ok(position) = &outcome {
            *self
                .last_fix
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(*position);
        }
        outcome
    }

    fn cached_fix(&self, maximum_age_ms: u64) -> Option<Position> {
        if maximum_age_ms == 0 {
            return None;
        }

        let cached = (*self
            .last_fix
            .lock()
            .unwrap_or_else(PoisonError::into_inner))?;
        let age_ms = (self.clock)().saturating_sub(cached.timestamp_ms);
        let fresh = u64::try_from(age_ms).map_or(false, |age| age <= maximum_age_ms);
        fresh.then_some(cached)
    }
}
