use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::{LeaseAdapter, LeaseBackend, LeaseHandle, NodeId};
use crate::errors::Result;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderEntry {
    pub node_id: NodeId,
    pub acquired_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_id: Option<String>,
}

/// Shared document stored in the leased resource. The `leaders` list is an
/// append-only trail; the lease itself decides who leads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadershipDocument {
    pub created_at: DateTime<Utc>,
    pub created_by: NodeId,
    #[serde(default)]
    pub leaders: Vec<LeaderEntry>,
}

impl LeadershipDocument {
    pub fn new(created_by: NodeId, created_at: DateTime<Utc>) -> LeadershipDocument {
        LeadershipDocument {
            created_at,
            created_by,
            leaders: Vec::new(),
        }
    }

    pub fn from_bytes(content: &[u8]) -> Result<LeadershipDocument> {
        Ok(serde_json::from_slice(content)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn current_leader(&self) -> Option<&LeaderEntry> {
        self.leaders.last()
    }

    pub fn append(&mut self, entry: LeaderEntry) {
        self.leaders.push(entry);
    }
}

/// Appends the new leader to the leadership document under the lease.
///
/// Never fails: a lost update is logged, leadership granted by the lease
/// stands regardless.
pub fn record_leadership<B: LeaseBackend>(
    adapter: &LeaseAdapter<B>,
    node_id: &str,
    handle: &LeaseHandle,
) {
    match append_entry(adapter, node_id, handle) {
        Ok(()) => debug!("Node {} recorded its leadership", node_id),
        Err(err) => warn!(
            "Node {} could not update the leadership record, keeping leadership: {}",
            node_id, err
        ),
    }
}

fn append_entry<B: LeaseBackend>(
    adapter: &LeaseAdapter<B>,
    node_id: &str,
    handle: &LeaseHandle,
) -> Result<()> {
    let mut document = adapter.read_document()?;

    document.append(LeaderEntry {
        node_id: node_id.to_string(),
        acquired_at: handle.acquired_at(),
        lease_id: Some(handle.lease_id().to_string()),
    });

    adapter.write_document(&document, handle)
}
