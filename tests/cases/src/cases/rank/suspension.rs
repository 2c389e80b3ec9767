use election_modules::MemoryRankStore;
use leader_election::ElectionState;
use std::time::Duration;

use crate::steps;

/// A suspended leader stops acting as leader at once. Its token survives, so
/// nobody replaces it, and it leads again after reconnecting.
pub fn run() {
    let store = MemoryRankStore::new();
    let cluster = steps::cluster::start_rank_cluster(&store, 2);

    let leader = cluster.find_a_leader(Duration::from_secs(1));
    let changes_rx = cluster.workers[leader].leadership_changes();

    cluster.clients[leader].suspend();
    assert!(steps::wait_for_state(
        &changes_rx,
        ElectionState::Follower,
        Duration::from_secs(1)
    ));

    steps::sleep_ms(500);
    assert!(cluster.leaders().is_empty());
    assert_eq!(store.children(&steps::get_election_path()).len(), 2);

    cluster.clients[leader].reconnect();
    assert!(steps::wait_for_state(
        &changes_rx,
        ElectionState::Leader,
        Duration::from_secs(1)
    ));
    assert_eq!(cluster.leaders(), vec![leader]);

    cluster.terminate();
}
