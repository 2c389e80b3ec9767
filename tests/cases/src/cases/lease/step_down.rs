use election_modules::MemoryLeaseStore;
use leader_election::ElectionState;
use std::time::Duration;

use crate::steps;

/// A stepping-down leader hands the lease back and sits out one period, so
/// the follower takes over.
pub fn run() {
    let store = MemoryLeaseStore::new();
    let cluster = steps::cluster::start_lease_cluster(&store, 2);

    let leader = cluster.find_a_leader(steps::get_failover_bound());
    let follower = 1 - leader;
    let leader_changes = cluster.workers[leader].leadership_changes();
    let follower_changes = cluster.workers[follower].leadership_changes();

    cluster.workers[leader].step_down();
    assert!(steps::wait_for_state(
        &leader_changes,
        ElectionState::Follower,
        Duration::from_secs(1)
    ));

    let period = steps::get_timings().renewal_period();
    assert!(steps::wait_for_state(
        &follower_changes,
        ElectionState::Leader,
        period + Duration::from_millis(50)
    ));

    cluster.assert_single_leader_for(Duration::from_secs(1));
    assert_eq!(cluster.leaders(), vec![follower]);

    cluster.terminate();
}
