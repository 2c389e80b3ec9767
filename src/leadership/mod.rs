use derive_more::Display;

use crate::backend::{LeaseHandle, NodeId};
use crate::errors::ErrorKind;

pub mod node_leadership_fsm;
pub mod ranking;
pub mod status;


#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum ElectionState {
    Follower,
    Leader,
    /// Terminal.
    Stopped,
}

/// Outcome of a backend interaction, fed to the leadership state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeadershipEvent {
    LeaseAcquired(LeaseHandle),
    /// Another node holds the lease; `holder` is its best-known identity.
    AcquireRejected { holder: Option<NodeId> },
    LeaseRenewed,
    RenewalFailed(ErrorKind),
    /// Voluntary step-down while running.
    Relinquished,
    RankEvaluated {
        lowest: bool,
        leader: Option<NodeId>,
    },
    /// The rank backend connection is unusable; the registration may be gone.
    ConnectionLost,
    StopRequested,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Unchanged(ElectionState),
    Changed {
        from: ElectionState,
        to: ElectionState,
    },
}

impl Transition {
    pub fn state(&self) -> ElectionState {
        match *self {
            Transition::Unchanged(state) => state,
            Transition::Changed { to, .. } => to,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Transition::Changed { .. })
    }
}
