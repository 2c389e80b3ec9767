#[macro_use]
extern crate log;
extern crate crossbeam_channel;
extern crate leader_election;

mod memory_lease;
mod memory_rank;

pub use memory_lease::{MemoryLeaseConnection, MemoryLeaseStore};
pub use memory_rank::{MemoryRankSession, MemoryRankStore};
