use election_modules::MemoryLeaseStore;
use leader_election::{ErrorKind, LeaseAdapter};
use rayon::prelude::*;
use std::time::Duration;

use crate::steps;

pub fn run() {
    concurrent_acquires();
    running_nodes();
}

/// Exactly one of many simultaneous acquisitions wins, the rest see contention.
fn concurrent_acquires() {
    let store = MemoryLeaseStore::new();
    LeaseAdapter::new(store.connect(), steps::get_resource_key(), "creator".to_string())
        .ensure_resource()
        .expect("resource is created");

    let results: Vec<_> = (0..16)
        .into_par_iter()
        .map(|idx| {
            let adapter = LeaseAdapter::new(
                store.connect(),
                steps::get_resource_key(),
                format!("contender-{}", idx),
            );
            adapter.acquire(Duration::from_secs(10))
        })
        .collect();

    let winners = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(winners, 1);

    for result in results.iter().filter(|result| result.is_err()) {
        let kind = result.as_ref().err().map(|err| err.kind());
        assert_eq!(kind, Some(ErrorKind::AlreadyHeld));
    }
}

/// Running election loops never report two leaders.
fn running_nodes() {
    let store = MemoryLeaseStore::new();
    let cluster = steps::cluster::start_lease_cluster(&store, 4);

    let leader = cluster.find_a_leader(steps::get_failover_bound());
    info!("Leader elected: {}", cluster.workers[leader].node_id());

    cluster.assert_single_leader_for(Duration::from_secs(2));
    assert_eq!(cluster.leaders(), vec![leader]);

    let status = cluster.workers[leader].status();
    assert_eq!(status.current_leader.as_deref(), Some(cluster.workers[leader].node_id()));
    assert!(status.last_renewal.is_some());

    cluster.terminate();
}
