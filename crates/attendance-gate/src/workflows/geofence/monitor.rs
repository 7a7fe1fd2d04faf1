use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::domain::GeofenceResult;
use super::evaluator::{EvaluationRequest, EvaluationTrigger, GeofenceEvaluator};

/// Token issued to each evaluation; only the newest one may publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EvaluationTicket(pub u64);

/// What happened to a finished evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Publication {
    Published(GeofenceResult),
    /// A newer evaluation was issued while this one ran; its result was discarded.
    Superseded {
        ticket: EvaluationTicket,
        latest: EvaluationTicket,
    },
}

impl Publication {
    pub fn result(&self) -> Option<&GeofenceResult> {
        match self {
            Self::Published(result) => Some(result),
            Self::Superseded { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct Published {
    ticket: Option<EvaluationTicket>,
    result: Option<GeofenceResult>,
}

/// Dashboard-session holder of the current geofence status for one employee.
///
/// Overlapping refreshes are allowed to run; whichever finishes, only the result of the
/// most recently issued ticket is kept.
pub struct GeofenceMonitor {
    evaluator: Arc<GeofenceEvaluator>,
    department: String,
    issued: AtomicU64,
    published: Mutex<Published>,
}

impl GeofenceMonitor {
    pub fn new(evaluator: Arc<GeofenceEvaluator>, department: impl Into<String>) -> Self {
        Self {
            evaluator,
            department: department.into(),
            issued: AtomicU64::new(0),
            published: Mutex::new(Published::default()),
        }
    }

    pub fn issue(&self) -> EvaluationTicket {
        EvaluationTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn latest_ticket(&self) -> EvaluationTicket {
        EvaluationTicket(self.issued.load(Ordering::SeqCst))
    }

    pub fn latest(&self) -> Option<GeofenceResult> {
        self.lock().result.clone()
    }

    pub fn published_ticket(&self) -> Option<EvaluationTicket> {
        self.lock().ticket
    }

    /// Run a fresh evaluation and publish it unless a newer one was issued meanwhile.
    pub async fn refresh(&self, trigger: EvaluationTrigger) -> Publication {
        let ticket = self.issue();
        let request = EvaluationRequest {
            department: self.department.clone(),
            permission: None,
            trigger,
        };
        let result = self.evaluator.evaluate_with(request).await;
        self.publish(ticket, result)
    }

    pub fn publish(&self, ticket: EvaluationTicket, result: GeofenceResult) -> Publication {
        let mut published = self.lock();
        let latest = self.latest_ticket();
        if ticket != latest {
            warn!(
                ticket = ticket.0,
                latest = latest.0,
                "discarding geofence result from a superseded evaluation"
            );
            return Publication::Superseded { ticket, latest };
        }

        info!(
            ticket = ticket.0,
            in_range = result.in_range,
            error = ?result.error_kind,
            "geofence status published"
        );
        published.ticket = Some(ticket);
        published.result = Some(result.clone());
        Publication::Published(result)
    }

    /// Re-evaluate whenever the host reports a permission change.
    ///
    /// Returns `None` when the probe cannot deliver change notifications.
    pub fn watch_permission(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let mut changes = self.evaluator.permission_changes()?;
        let monitor = Arc::clone(self);

        Some(tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let state = *changes.borrow_and_update();
                info!(permission = state.label(), "re-evaluating geofence after permission change");
                monitor.refresh(EvaluationTrigger::Passive).await;
            }
        }))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Published> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
