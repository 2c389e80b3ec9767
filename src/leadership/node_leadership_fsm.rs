use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::backend::{LeaseHandle, NodeId};
use crate::leadership::status::ElectionStatus;
use crate::leadership::{ElectionState, LeadershipEvent, Transition};

/// Election state of a single node. Pure: it never calls the backend, the
/// driving loop feeds it the outcome of every backend interaction.
#[derive(Clone, Debug)]
pub struct NodeLeadershipFsm {
    node_id: NodeId,
    state: ElectionState,
    lease: Option<LeaseHandle>,
    current_leader: Option<NodeId>,
    last_renewal: Option<DateTime<Utc>>,
    last_transition: DateTime<Utc>,
}

impl NodeLeadershipFsm {
    pub fn new(node_id: NodeId, now: DateTime<Utc>) -> NodeLeadershipFsm {
        NodeLeadershipFsm {
            node_id,
            state: ElectionState::Follower,
            lease: None,
            current_leader: None,
            last_renewal: None,
            last_transition: now,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn state(&self) -> ElectionState {
        self.state
    }

    pub fn is_leader(&self) -> bool {
        self.state == ElectionState::Leader
    }

    /// The lease held while leader.
    pub fn lease(&self) -> Option<&LeaseHandle> {
        self.lease.as_ref()
    }

    /// True when the last successful renewal is older than a lease lifetime:
    /// renewing is pointless then, the lease has to be acquired again.
    pub fn lease_lapsed(&self, now: DateTime<Utc>, lease_duration: Duration) -> bool {
        if !self.is_leader() {
            return false;
        }

        match (self.last_renewal, chrono::Duration::from_std(lease_duration)) {
            (Some(renewed_at), Ok(lifetime)) => renewed_at + lifetime <= now,
            _ => true,
        }
    }

    pub fn handle_event(&mut self, event: LeadershipEvent, now: DateTime<Utc>) -> Transition {
        let from = self.state;
        if from == ElectionState::Stopped {
            return Transition::Unchanged(from);
        }

        let to = match (from, event) {
            (_, LeadershipEvent::StopRequested) => {
                self.lease = None;
                if from == ElectionState::Leader {
                    self.current_leader = None;
                }
                ElectionState::Stopped
            }
            (_, LeadershipEvent::LeaseAcquired(handle)) => {
                self.lease = Some(handle);
                self.current_leader = Some(self.node_id.clone());
                self.last_renewal = Some(now);
                ElectionState::Leader
            }
            (ElectionState::Follower, LeadershipEvent::AcquireRejected { holder }) => {
                // A record naming this node is stale: the lease says otherwise.
                self.current_leader = holder.filter(|holder| *holder != self.node_id);
                ElectionState::Follower
            }
            (ElectionState::Leader, LeadershipEvent::LeaseRenewed) => {
                self.last_renewal = Some(now);
                ElectionState::Leader
            }
            (ElectionState::Leader, LeadershipEvent::AcquireRejected { .. })
            | (ElectionState::Leader, LeadershipEvent::RenewalFailed(_))
            | (ElectionState::Leader, LeadershipEvent::Relinquished)
            | (ElectionState::Leader, LeadershipEvent::ConnectionLost) => {
                self.lease = None;
                self.current_leader = None;
                ElectionState::Follower
            }
            (_, LeadershipEvent::RankEvaluated { lowest: true, .. }) => {
                self.current_leader = Some(self.node_id.clone());
                self.last_renewal = Some(now);
                ElectionState::Leader
            }
            (_, LeadershipEvent::RankEvaluated { lowest: false, leader }) => {
                self.current_leader = leader;
                self.last_renewal = Some(now);
                ElectionState::Follower
            }
            (ElectionState::Follower, LeadershipEvent::ConnectionLost) => {
                self.current_leader = None;
                ElectionState::Follower
            }
            (state, _) => state,
        };

        self.state = to;
        if from == to {
            Transition::Unchanged(to)
        } else {
            self.last_transition = now;
            Transition::Changed { from, to }
        }
    }

    pub fn snapshot(&self) -> ElectionStatus {
        ElectionStatus {
            node_id: self.node_id.clone(),
            state: self.state,
            current_leader: self.current_leader.clone(),
            last_renewal: self.last_renewal,
            last_transition: self.last_transition,
        }
    }
}
