//! Capability surface of the coordination backend.
//!
//! Production backends (blob storage leases, ZooKeeper-like trees) implement
//! [`LeaseBackend`] or [`RankBackend`]. The election code only talks to them
//! through [`LeaseAdapter`] and [`RankAdapter`], which normalize failures into
//! [`ErrorKind`](crate::ErrorKind) values.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;

use crate::errors::Result;

pub mod lease_adapter;
pub mod rank_adapter;

pub use lease_adapter::LeaseAdapter;
pub use rank_adapter::RankAdapter;

pub type NodeId = String;

/// Location of the leased resource: a caller-chosen name within a
/// caller-chosen namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Raw exclusive-lease primitives plus the document attached to the leased
/// resource.
///
/// Expected failure kinds:
/// - `acquire_lease`: `AlreadyHeld`, `ResourceMissing`, `Unavailable`
/// - `renew_lease`: `Expired`, `NotFound`, `Unavailable`
/// - `create_document`: `AlreadyExists`, `Unavailable`
/// - `read_document`: `ResourceMissing`, `Unavailable`
/// - `write_document`: `AlreadyHeld` (leased and no matching lease id),
///   `Expired`, `ResourceMissing`, `Unavailable`
pub trait LeaseBackend: Send + 'static {
    fn acquire_lease(&self, key: &ResourceKey, duration: Duration) -> Result<String>;
    fn renew_lease(&self, key: &ResourceKey, lease_id: &str) -> Result<()>;
    /// Releasing a lease that is no longer held succeeds.
    fn release_lease(&self, key: &ResourceKey, lease_id: &str) -> Result<()>;

    fn create_document(&self, key: &ResourceKey, content: &[u8]) -> Result<()>;
    fn read_document(&self, key: &ResourceKey) -> Result<Vec<u8>>;
    fn write_document(&self, key: &ResourceKey, content: &[u8], lease_id: Option<&str>)
        -> Result<()>;
}

/// Connection state changes reported by a rank backend session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    /// The connection dropped; ephemeral nodes survive until the session expires.
    Suspended,
    Reconnected,
    /// The session expired and all of its ephemeral nodes were removed.
    Lost,
}

/// Raw ordered ephemeral registration primitives.
///
/// Expected failure kinds:
/// - `create_path`: `AlreadyExists`, `Unavailable`
/// - `create_ephemeral_sequential`: `ResourceMissing`, `Unavailable`
/// - `read`, `delete`: `NotFound`, `Unavailable`
pub trait RankBackend: Send + 'static {
    fn create_path(&self, path: &str) -> Result<()>;
    /// Creates `<parent>/<prefix><sequence>` owned by this session and returns
    /// the child name.
    fn create_ephemeral_sequential(&self, parent: &str, prefix: &str, payload: &[u8])
        -> Result<String>;
    fn children(&self, parent: &str) -> Result<Vec<String>>;
    fn read(&self, path: &str) -> Result<Vec<u8>>;
    fn delete(&self, path: &str) -> Result<()>;
    /// One-shot watch: the receiver gets a message when `path` is deleted,
    /// immediately when it does not exist.
    fn watch_deletion(&self, path: &str) -> Result<Receiver<()>>;
    fn session_events(&self) -> Receiver<SessionEvent>;
}

/// Proof of holding the lease. Invalid after release or expiry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LeaseHandle {
    lease_id: String,
    acquired_at: DateTime<Utc>,
}

impl LeaseHandle {
    pub fn new(lease_id: String, acquired_at: DateTime<Utc>) -> LeaseHandle {
        LeaseHandle {
            lease_id,
            acquired_at,
        }
    }

    pub fn lease_id(&self) -> &str {
        &self.lease_id
    }

    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }
}

/// Ephemeral ordered registration. Tokens order by their numeric suffix and
/// then by name, so the lowest token is the leader.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RankToken {
    name: String,
    sequence: Option<u64>,
}

impl RankToken {
    pub fn new(name: impl Into<String>) -> RankToken {
        let name = name.into();
        let digits = name
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .count();
        let sequence = name[name.len() - digits..].parse::<u64>().ok();

        RankToken { name, sequence }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }
}

impl fmt::Display for RankToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Ord for RankToken {
    fn cmp(&self, other: &Self) -> Ordering {
        // Tokens without a sequence suffix sort after every sequenced token.
        match (self.sequence, other.sequence) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.name.cmp(&other.name)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.name.cmp(&other.name),
        }
    }
}

impl PartialOrd for RankToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
