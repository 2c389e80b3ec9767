use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossbeam_channel::Sender;
use parking_lot::RwLock;

use crate::backend::NodeId;
use crate::leadership::node_leadership_fsm::NodeLeadershipFsm;
use crate::leadership::{ElectionState, Transition};

/// Point-in-time view of a node's election state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionStatus {
    pub node_id: NodeId,
    pub state: ElectionState,
    /// Best-effort, may be stale.
    pub current_leader: Option<NodeId>,
    /// Last successful renewal (lease) or evaluation of a live registration (rank).
    pub last_renewal: Option<DateTime<Utc>>,
    pub last_transition: DateTime<Utc>,
}

impl ElectionStatus {
    pub fn is_leader(&self) -> bool {
        self.state == ElectionState::Leader
    }
}

pub type ProtectedStatus = Arc<RwLock<ElectionStatus>>;

/// Single writer of the status snapshot. Owned by the driving loop; readers
/// hold the `ProtectedStatus` and the change receiver.
#[derive(Debug)]
pub struct StatusPublisher {
    status: ProtectedStatus,
    leadership_changes_tx: Sender<ElectionState>,
}

impl StatusPublisher {
    pub fn new(status: ProtectedStatus, leadership_changes_tx: Sender<ElectionState>) -> StatusPublisher {
        StatusPublisher {
            status,
            leadership_changes_tx,
        }
    }

    pub fn publish(&self, fsm: &NodeLeadershipFsm, transition: Transition) {
        *self.status.write() = fsm.snapshot();

        if let Transition::Changed { from, to } = transition {
            info!("Node {} Status changed from {} to {}", fsm.node_id(), from, to);

            if self.leadership_changes_tx.send(to).is_err() {
                trace!("Node {} has no leadership change listeners", fsm.node_id());
            }
        }
    }
}
