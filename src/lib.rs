//! # Leader election client
//!
//! Exactly one node at a time is leader, with failover when the leader stops
//! renewing its claim. Two strategies over a coordination backend:
//!
//! - lease: holding a time-bounded exclusive lease on a shared resource
//!   ([`start_lease_election`]),
//! - rank: owning the lowest ephemeral sequential token
//!   ([`start_rank_election`]).
//!
//! The backend is supplied by the caller through [`LeaseBackend`] or
//! [`RankBackend`].

#![warn(missing_debug_implementations, unsafe_code)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate crossbeam_channel;

mod backend;
mod common;
mod errors;
mod leadership;
mod lease;
mod node;
mod rank;

pub use backend::{
    LeaseAdapter, LeaseBackend, LeaseHandle, NodeId, RankAdapter, RankBackend, RankToken,
    ResourceKey, SessionEvent,
};
pub use errors::{new_err, ElectionError, ErrorKind, Result};
pub use leadership::node_leadership_fsm::NodeLeadershipFsm;
pub use leadership::ranking::{rank_position, RankPosition};
pub use leadership::status::ElectionStatus;
pub use leadership::{ElectionState, LeadershipEvent, Transition};
pub use lease::leader_record::{LeaderEntry, LeadershipDocument};
pub use node::configuration::{generate_node_id, ElectionConfiguration, ElectionTimings};
pub use node::{start_lease_election, start_rank_election, ElectionWorker};
