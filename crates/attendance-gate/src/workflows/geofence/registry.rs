use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::domain::Office;

/// Source of registered offices (the attendance backend's office listing).
#[async_trait]
pub trait OfficeDirectory: Send + Sync {
    async fn fetch_offices(&self, department: &str) -> Result<Vec<Office>, OfficeFetchError>;
}

/// Failure fetching the office listing.
#[derive(Debug, thiserror::Error)]
pub enum OfficeFetchError {
    #[error("office directory unavailable: {0}")]
    Unavailable(String),
    #[error("office directory rejected the request: {0}")]
    Rejected(String),
    #[error("malformed office payload: {0}")]
    Malformed(String),
}

/// Session-scoped, read-through cache of the offices serving each department.
///
/// Fetch failures degrade to an empty list and are not cached, so the next load retries.
pub struct OfficeRegistry {
    directory: Arc<dyn OfficeDirectory>,
    cache: Mutex<HashMap<String, Arc<[Office]>>>,
}

impl OfficeRegistry {
    pub fn new(directory: Arc<dyn OfficeDirectory>) -> Self {
        Self {
            directory,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Active offices for `department`, served from the session cache when present.
    pub async fn load(&self, department: &str) -> Arc<[Office]> {
        if let Some(cached) = self.cached(department) {
            debug!(%department, offices = cached.len(), "office registry cache hit");
            return cached;
        }
        self.refresh(department).await
    }

    /// Bypass the cache, fetch again and remember the result.
    pub async fn refresh(&self, department: &str) -> Arc<[Office]> {
        match self.directory.fetch_offices(department).await {
            Ok(offices) => {
                let eligible: Arc<[Office]> = offices
                    .into_iter()
                    .filter(|office| office.is_eligible_for(department))
                    .collect();
                debug!(%department, offices = eligible.len(), "office registry refreshed");
                self.lock().insert(cache_key(department), eligible.clone());
                eligible
            }
            Err(err) => {
                warn!(%department, error = %err, "office fetch failed; treating as no eligible offices");
                Arc::from(Vec::new())
            }
        }
    }

    pub fn invalidate(&self) {
        self.lock().clear();
    }

    fn cached(&self, department: &str) -> Option<Arc<[Office]>> {
        self.lock().get(&cache_key(department)).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<[Office]>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn cache_key(department: &str) -> String {
    department.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::geofence::domain::OfficeId;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn office(id: &str, department: Option<&str>, active: bool) -> Office {
        Office {
            id: OfficeId(id.to_string()),
            name: format!("Office {id}"),
            address: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            radius_meters: 100.0,
            department: department.map(str::to_string),
            active,
        }
    }

    #[derive(Default)]
    struct CountingDirectory {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    #[async_trait]
    impl OfficeDirectory for CountingDirectory {
        async fn fetch_offices(&self, _department: &str) -> Result<Vec<Office>, OfficeFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(OfficeFetchError::Unavailable("connection refused".to_string()));
            }
            Ok(vec![
                office("A", Some("IT"), true),
                office("B", Some("IT"), false),
                office("C", Some("Finance"), true),
                office("D", None, true),
            ])
        }
    }

    #[tokio::test]
    async fn load_keeps_active_offices_for_department() {
        let registry = OfficeRegistry::new(Arc::new(CountingDirectory::default()));

        let offices = registry.load("IT").await;
        let ids: Vec<_> = offices.iter().map(|office| office.id.0.as_str()).collect();

        assert_eq!(ids, vec!["A", "D"]);
    }

    #[tokio::test]
    async fn load_is_cached_per_department_until_invalidated() {
        let directory = Arc::new(CountingDirectory::default());
        let registry = OfficeRegistry::new(directory.clone());

        registry.load("IT").await;
        registry.load("it").await;
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);

        registry.load("Finance").await;
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);

        registry.invalidate();
        registry.load("IT").await;
        assert_eq!(directory.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_empty_and_is_retried() {
        let directory = Arc::new(CountingDirectory::default());
        directory.failing.store(true, Ordering::SeqCst);
        let registry = OfficeRegistry::new(directory.clone());

        assert!(registry.load("IT").await.is_empty());

        directory.failing.store(false, Ordering::SeqCst);
        assert_eq!(registry.load("IT").await.len(), 2);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_bypasses_cache() {
        let directory = Arc::new(CountingDirectory::default());
        let registry = OfficeRegistry::new(directory.clone());

        registry.load("IT").await;
        registry.refresh("IT").await;

        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }
}
