use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::geofence::{
    AcquisitionSettings, GeofenceEvaluator, LocationProvider, Office, OfficeDirectory,
    OfficeFetchError, OfficeId, OfficeRegistry, PermissionProbe, PermissionState, Position,
    PositionAcquirer, PositionCallback, PositionOptions, ProviderError,
};

pub(super) fn office(id: &str, latitude: f64, longitude: f64, radius_meters: f64) -> Office {
    Office {
        id: OfficeId(id.to_string()),
        name: format!("Office {id}"),
        address: format!("{id} Street"),
        latitude,
        longitude,
        radius_meters,
        department: Some("IT".to_string()),
        active: true,
    }
}

pub(super) fn position(latitude: f64, longitude: f64) -> Position {
    Position {
        latitude,
        longitude,
        accuracy: Some(10.0),
        timestamp_ms: chrono::Utc::now().timestamp_millis(),
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    offices: Mutex<Vec<Office>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryDirectory {
    pub(super) fn with(offices: Vec<Office>) -> Arc<Self> {
        Arc::new(Self {
            offices: Mutex::new(offices),
            ..Self::default()
        })
    }

    pub(super) fn failing() -> Arc<Self> {
        let directory = Self::default();
        directory.failing.store(true, Ordering::SeqCst);
        Arc::new(directory)
    }

    pub(super) fn replace(&self, offices: Vec<Office>) {
        *self.offices.lock().expect("directory mutex poisoned") = offices;
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OfficeDirectory for MemoryDirectory {
    async fn fetch_offices(&self, _department: &str) -> Result<Vec<Office>, OfficeFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(OfficeFetchError::Unavailable("backend offline".to_string()));
        }
        Ok(self
            .offices
            .lock()
            .expect("directory mutex poisoned")
            .clone())
    }
}

pub(super) enum Reply {
    Fix(Position),
    Code(u16),
    After(Duration, Position),
}

/// Provider answering each request with the next queued reply; an empty queue never answers.
#[derive(Default)]
pub(super) struct QueuedProvider {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<PositionOptions>>,
}

impl QueuedProvider {
    pub(super) fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub(super) fn fix(position: Position) -> Arc<Self> {
        Self::new(vec![Reply::Fix(position)])
    }

    pub(super) fn push(&self, reply: Reply) {
        self.replies
            .lock()
            .expect("provider mutex poisoned")
            .push_back(reply);
    }

    pub(super) fn calls(&self) -> usize {
        self.seen.lock().expect("provider mutex poisoned").len()
    }

    pub(super) fn seen(&self) -> Vec<PositionOptions> {
        self.seen.lock().expect("provider mutex poisoned").clone()
    }
}

impl LocationProvider for QueuedProvider {
    fn request_position(&self, options: PositionOptions, callback: PositionCallback) {
        self.seen
            .lock()
            .expect("provider mutex poisoned")
            .push(options);
        let next = self
            .replies
            .lock()
            .expect("provider mutex poisoned")
            .pop_front();
        match next {
            Some(Reply::Fix(position)) => {
                callback.resolve(position);
            }
            Some(Reply::Code(code)) => {
                callback.reject(ProviderError {
                    code,
                    message: None,
                });
            }
            Some(Reply::After(delay, position)) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    callback.resolve(position);
                });
            }
            None => {}
        }
    }
}

pub(super) struct FixedPermission(pub(super) PermissionState);

#[async_trait]
impl PermissionProbe for FixedPermission {
    async fn probe(&self) -> PermissionState {
        self.0
    }
}

pub(super) fn evaluator(
    directory: Arc<MemoryDirectory>,
    permissions: Arc<dyn PermissionProbe>,
    provider: Arc<QueuedProvider>,
) -> GeofenceEvaluator {
    GeofenceEvaluator::new(
        Arc::new(OfficeRegistry::new(directory)),
        permissions,
        Arc::new(PositionAcquirer::new(
            provider,
            AcquisitionSettings::default(),
        )),
    )
}

pub(super) fn granted() -> Arc<dyn PermissionProbe> {
    Arc::new(FixedPermission(PermissionState::Granted))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
