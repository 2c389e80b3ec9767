use election_modules::MemoryLeaseStore;
use leader_election::ElectionState;
use std::time::Duration;

use crate::steps;

/// A partitioned leader demotes itself before the lease can be granted to
/// anyone else, so the cluster never observes two leaders.
pub fn run() {
    let store = MemoryLeaseStore::new();
    let cluster = steps::cluster::start_lease_cluster(&store, 3);

    let isolated = cluster.find_a_leader(steps::get_failover_bound());
    cluster.clients[isolated].set_available(false);

    let timings = steps::get_timings();
    let demoted = steps::wait_until(timings.renewal_period() + Duration::from_millis(200), || {
        cluster.workers[isolated].state() == ElectionState::Follower
    });
    assert!(demoted, "partitioned leader kept leading");

    // Nobody else may lead before the old lease expired.
    assert!(cluster.leaders().is_empty());
    assert!(store.live_lease_id(&steps::get_resource_key()).is_some());

    // Throughout the takeover there is at most one leader.
    cluster.assert_single_leader_for(steps::get_failover_bound());
    let new_leader = cluster.find_a_leader(Duration::from_millis(500));
    assert_ne!(new_leader, isolated);

    // While isolated the node keeps failing and stays a follower.
    cluster.assert_single_leader_for(Duration::from_secs(1));
    assert_eq!(cluster.workers[isolated].state(), ElectionState::Follower);

    cluster.terminate();
}
