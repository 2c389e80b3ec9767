use election_modules::MemoryRankStore;
use leader_election::ElectionState;
use std::time::Duration;

use crate::steps;

/// An expired leader session loses its token: the successor takes over and
/// the old leader re-registers at the end of the queue.
pub fn run() {
    let store = MemoryRankStore::new();
    let cluster = steps::cluster::start_rank_cluster(&store, 3);

    let old_leader = cluster.find_a_leader(Duration::from_secs(1));
    let old_leader_changes = cluster.workers[old_leader].leadership_changes();
    let successor_changes = cluster.workers[old_leader + 1].leadership_changes();

    cluster.clients[old_leader].expire();

    assert!(steps::wait_for_state(
        &old_leader_changes,
        ElectionState::Follower,
        Duration::from_secs(1)
    ));
    assert!(steps::wait_for_state(
        &successor_changes,
        ElectionState::Leader,
        Duration::from_secs(1)
    ));

    let path = steps::get_election_path();
    let re_registered = steps::wait_until(Duration::from_secs(1), || store.children(&path).len() == 3);
    assert!(re_registered, "expired node did not register again");

    cluster.assert_single_leader_for(Duration::from_millis(500));
    assert_eq!(cluster.leaders(), vec![old_leader + 1]);
    assert_eq!(
        cluster.workers[old_leader].status().current_leader.as_deref(),
        Some(cluster.workers[old_leader + 1].node_id())
    );

    cluster.terminate();
}
