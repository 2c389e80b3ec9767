use leader_election::{new_err, ErrorKind, LeaseBackend, ResourceKey, Result};
use parking_lot::RwLock;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct ActiveLease {
    lease_id: String,
    duration: Duration,
    expires_at: Instant,
}

#[derive(Clone, Debug, Default)]
struct StoredResource {
    document: Vec<u8>,
    lease: Option<ActiveLease>,
}

impl StoredResource {
    fn live_lease(&self, now: Instant) -> Option<&ActiveLease> {
        self.lease.as_ref().filter(|lease| lease.expires_at > now)
    }
}

#[derive(Debug, Default)]
struct LeaseStoreState {
    resources: HashMap<ResourceKey, StoredResource>,
    fail_document_writes: bool,
}

/// Shared in-memory lease service. Leases expire on the wall clock, so a
/// holder that stops renewing loses the lease exactly like against a real
/// blob store.
#[derive(Clone, Debug, Default)]
pub struct MemoryLeaseStore {
    state: Arc<RwLock<LeaseStoreState>>,
}

impl MemoryLeaseStore {
    pub fn new() -> MemoryLeaseStore {
        MemoryLeaseStore::default()
    }

    /// New client connection. Each connection can be cut off separately.
    pub fn connect(&self) -> MemoryLeaseConnection {
        MemoryLeaseConnection {
            store: self.clone(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Makes every document write fail with `Unavailable`, leases keep working.
    pub fn fail_document_writes(&self, fail: bool) {
        self.state.write().fail_document_writes = fail;
    }

    pub fn document(&self, key: &ResourceKey) -> Option<Vec<u8>> {
        self.state
            .read()
            .resources
            .get(key)
            .map(|resource| resource.document.clone())
    }

    /// Id of the unexpired lease on the resource.
    pub fn live_lease_id(&self, key: &ResourceKey) -> Option<String> {
        self.state
            .read()
            .resources
            .get(key)
            .and_then(|resource| resource.live_lease(Instant::now()))
            .map(|lease| lease.lease_id.clone())
    }
}

/// Client side of [`MemoryLeaseStore`]. Clones share the availability switch.
#[derive(Clone, Debug)]
pub struct MemoryLeaseConnection {
    store: MemoryLeaseStore,
    available: Arc<AtomicBool>,
}

impl MemoryLeaseConnection {
    /// `false` simulates a network partition between this client and the store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn check_available(&self, key: &ResourceKey) -> Result<()> {
        if self.is_available() {
            return Ok(());
        }

        new_err(
            ErrorKind::Unavailable,
            format!("Lease store is unreachable for {}", key),
            "connection is down".to_string(),
        )
    }
}

fn missing<T>(key: &ResourceKey) -> Result<T> {
    new_err(
        ErrorKind::ResourceMissing,
        format!("Resource {} does not exist", key),
        String::new(),
    )
}

impl LeaseBackend for MemoryLeaseConnection {
    fn acquire_lease(&self, key: &ResourceKey, duration: Duration) -> Result<String> {
        self.check_available(key)?;

        let now = Instant::now();
        let mut state = self.store.state.write();
        let resource = match state.resources.get_mut(key) {
            Some(resource) => resource,
            None => return missing(key),
        };

        if let Some(lease) = resource.live_lease(now) {
            return new_err(
                ErrorKind::AlreadyHeld,
                format!("Resource {} is already leased", key),
                format!("lease {}", lease.lease_id),
            );
        }

        let lease_id = uuid::Uuid::new_v4().to_string();
        resource.lease = Some(ActiveLease {
            lease_id: lease_id.clone(),
            duration,
            expires_at: now + duration,
        });
        trace!("Lease {} granted on {} for {:?}", lease_id, key, duration);

        Ok(lease_id)
    }

    fn renew_lease(&self, key: &ResourceKey, lease_id: &str) -> Result<()> {
        self.check_available(key)?;

        let now = Instant::now();
        let mut state = self.store.state.write();
        let lease = state
            .resources
            .get_mut(key)
            .and_then(|resource| resource.lease.as_mut())
            .filter(|lease| lease.lease_id == lease_id);

        match lease {
            Some(lease) if lease.expires_at > now => {
                lease.expires_at = now + lease.duration;
                Ok(())
            }
            Some(_) => new_err(
                ErrorKind::Expired,
                format!("Lease {} on {} has expired", lease_id, key),
                String::new(),
            ),
            None => new_err(
                ErrorKind::NotFound,
                format!("Lease {} on {} is unknown", lease_id, key),
                String::new(),
            ),
        }
    }

    fn release_lease(&self, key: &ResourceKey, lease_id: &str) -> Result<()> {
        self.check_available(key)?;

        let mut state = self.store.state.write();
        if let Some(resource) = state.resources.get_mut(key) {
            let owned = resource
                .lease
                .as_ref()
                .map_or(false, |lease| lease.lease_id == lease_id);
            if owned {
                resource.lease = None;
                trace!("Lease {} on {} released", lease_id, key);
            }
        }

        Ok(())
    }

    fn create_document(&self, key: &ResourceKey, content: &[u8]) -> Result<()> {
        self.check_available(key)?;

        let mut state = self.store.state.write();
        if state.resources.contains_key(key) {
            return new_err(
                ErrorKind::AlreadyExists,
                format!("Resource {} already exists", key),
                String::new(),
            );
        }

        state.resources.insert(
            key.clone(),
            StoredResource {
                document: content.to_vec(),
                lease: None,
            },
        );

        Ok(())
    }

    fn read_document(&self, key: &ResourceKey) -> Result<Vec<u8>> {
        self.check_available(key)?;

        match self.store.state.read().resources.get(key) {
            Some(resource) => Ok(resource.document.clone()),
            None => missing(key),
        }
    }

    fn write_document(
        &self,
        key: &ResourceKey,
        content: &[u8],
        lease_id: Option<&str>,
    ) -> Result<()> {
        self.check_available(key)?;

        let now = Instant::now();
        let mut state = self.store.state.write();
        if state.fail_document_writes {
            return new_err(
                ErrorKind::Unavailable,
                format!("Document write to {} failed", key),
                "writes are disabled".to_string(),
            );
        }

        let resource = match state.resources.get_mut(key) {
            Some(resource) => resource,
            None => return missing(key),
        };

        let live_id = resource.live_lease(now).map(|lease| lease.lease_id.clone());
        match (live_id, lease_id) {
            (Some(live), Some(given)) if live == given => {}
            (Some(live), _) => {
                return new_err(
                    ErrorKind::AlreadyHeld,
                    format!("Resource {} is leased by another client", key),
                    format!("lease {}", live),
                )
            }
            (None, Some(given)) => {
                return new_err(
                    ErrorKind::Expired,
                    format!("Lease {} on {} is no longer held", given, key),
                    String::new(),
                )
            }
            (None, None) => {}
        }

        resource.document = content.to_vec();

        Ok(())
    }
}
