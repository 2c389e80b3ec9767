//! Lease strategy: holding the exclusive lease on the election resource
//! means being the leader.

pub mod leader_record;
pub mod renewal_loop;
