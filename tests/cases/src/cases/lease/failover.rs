use election_modules::MemoryLeaseStore;
use leader_election::ElectionState;
use std::time::{Duration, Instant};

use crate::steps;

/// A leader that silently stops renewing is replaced once its lease runs out.
pub fn run() {
    let store = MemoryLeaseStore::new();
    let cluster = steps::cluster::start_lease_cluster(&store, 3);

    let old_leader = cluster.find_a_leader(steps::get_failover_bound());
    let changes_rx = cluster.workers[old_leader].leadership_changes();

    // The crashed node can no longer reach the store.
    cluster.clients[old_leader].set_available(false);
    let crashed_at = Instant::now();

    // Only a polling margin on top of lease + 2 periods.
    let margin = Duration::from_millis(50);
    let replaced = steps::wait_until(steps::get_failover_bound() + margin, || {
        cluster.leaders().iter().any(|idx| *idx != old_leader)
    });
    assert!(replaced, "no failover within {:?}", steps::get_failover_bound());
    info!("Failover took {:?}", crashed_at.elapsed());

    assert!(steps::wait_for_state(
        &changes_rx,
        ElectionState::Follower,
        Duration::from_millis(100)
    ));
    assert!(!cluster.workers[old_leader].is_leader());

    // Once reachable again the old leader stays a follower.
    cluster.clients[old_leader].set_available(true);
    cluster.assert_single_leader_for(Duration::from_secs(1));
    assert!(!cluster.workers[old_leader].is_leader());

    cluster.terminate();
}
