use std::time::Duration;

use chrono::Utc;

use crate::backend::{LeaseBackend, LeaseHandle, NodeId, ResourceKey};
use crate::errors::{ElectionError, ErrorKind, Result};
use crate::lease::leader_record::LeadershipDocument;

/// Lease strategy side of the backend boundary. No election logic lives here.
#[derive(Debug)]
pub struct LeaseAdapter<B: LeaseBackend> {
    backend: B,
    key: ResourceKey,
    node_id: NodeId,
}

impl<B: LeaseBackend> LeaseAdapter<B> {
    pub fn new(backend: B, key: ResourceKey, node_id: NodeId) -> LeaseAdapter<B> {
        LeaseAdapter {
            backend,
            key,
            node_id,
        }
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Creates the leased document when it is missing. Losing the creation
    /// race to another node counts as success.
    pub fn ensure_resource(&self) -> Result<()> {
        match self.backend.read_document(&self.key) {
            Ok(_) => {
                debug!("Election resource {} already exists", self.key);
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::ResourceMissing => {}
            Err(err) => return Err(normalize(err, &[])),
        }

        let content = LeadershipDocument::new(self.node_id.clone(), Utc::now()).to_bytes()?;
        match self.backend.create_document(&self.key, &content) {
            Ok(()) => {
                info!("Node {} created election resource {}", self.node_id, self.key);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!("Election resource {} was created concurrently", self.key);
                Ok(())
            }
            Err(err) => Err(normalize(err, &[])),
        }
    }

    pub fn acquire(&self, duration: Duration) -> Result<LeaseHandle> {
        let lease_id = self
            .backend
            .acquire_lease(&self.key, duration)
            .map_err(|err| normalize(err, &[ErrorKind::AlreadyHeld, ErrorKind::ResourceMissing]))?;

        Ok(LeaseHandle::new(lease_id, Utc::now()))
    }

    pub fn renew(&self, handle: &LeaseHandle) -> Result<()> {
        self.backend
            .renew_lease(&self.key, handle.lease_id())
            .map_err(|err| {
                normalize(
                    err,
                    &[ErrorKind::Expired, ErrorKind::NotFound, ErrorKind::ResourceMissing],
                )
            })
    }

    /// Idempotent: a lease that already expired or was taken over is released.
    pub fn release(&self, handle: &LeaseHandle) -> Result<()> {
        match self.backend.release_lease(&self.key, handle.lease_id()) {
            Ok(()) => Ok(()),
            Err(err)
                if err.kind() == ErrorKind::Expired
                    || err.kind() == ErrorKind::NotFound
                    || err.kind() == ErrorKind::ResourceMissing =>
            {
                debug!("Lease {} was no longer held: {}", handle.lease_id(), err);
                Ok(())
            }
            Err(err) => Err(normalize(err, &[])),
        }
    }

    /// Last leader recorded in the leadership document. Best effort: the
    /// record may lag behind the lease.
    pub fn read_current_holder(&self) -> Result<Option<NodeId>> {
        let document = self.read_document().map_err(|err| {
            if err.kind() == ErrorKind::ResourceMissing {
                ElectionError::new(
                    ErrorKind::NotFound,
                    format!("No leadership record at {}", self.key),
                    err.to_string(),
                )
            } else {
                err
            }
        })?;

        Ok(document.current_leader().map(|entry| entry.node_id.clone()))
    }

    pub fn read_document(&self) -> Result<LeadershipDocument> {
        let content = self
            .backend
            .read_document(&self.key)
            .map_err(|err| normalize(err, &[ErrorKind::ResourceMissing]))?;

        LeadershipDocument::from_bytes(&content)
    }

    /// Writes the document conditioned on holding `handle`.
    pub fn write_document(&self, document: &LeadershipDocument, handle: &LeaseHandle) -> Result<()> {
        let content = document.to_bytes()?;

        self.backend
            .write_document(&self.key, &content, Some(handle.lease_id()))
            .map_err(|err| {
                normalize(
                    err,
                    &[ErrorKind::AlreadyHeld, ErrorKind::Expired, ErrorKind::ResourceMissing],
                )
            })
    }
}

/// Keeps the semantic kinds an operation may legitimately report and folds
/// everything else into `Unavailable`.
pub(crate) fn normalize(err: ElectionError, expected: &[ErrorKind]) -> ElectionError {
    if err.kind() == ErrorKind::Unavailable || expected.contains(&err.kind()) {
        return err;
    }

    ElectionError::new(
        ErrorKind::Unavailable,
        "Unexpected backend failure".to_string(),
        err.to_string(),
    )
}
