use election_modules::MemoryRankStore;
use leader_election::ElectionState;
use std::time::Duration;

use crate::steps;

/// The leader gives up its token and queues again at the back; only its
/// direct successor reacts.
pub fn run() {
    let store = MemoryRankStore::new();
    let cluster = steps::cluster::start_rank_cluster(&store, 3);
    let path = steps::get_election_path();

    let leader = cluster.find_a_leader(Duration::from_secs(1));
    assert_eq!(leader, 0);
    let tokens_before = store.children(&path);

    let leader_changes = cluster.workers[0].leadership_changes();
    let successor_changes = cluster.workers[1].leadership_changes();
    let bystander_changes = cluster.workers[2].leadership_changes();

    cluster.workers[0].step_down();

    assert!(steps::wait_for_state(
        &leader_changes,
        ElectionState::Follower,
        Duration::from_secs(1)
    ));
    assert!(steps::wait_for_state(
        &successor_changes,
        ElectionState::Leader,
        Duration::from_secs(1)
    ));

    let requeued = steps::wait_until(Duration::from_secs(1), || {
        let tokens = store.children(&path);
        tokens.len() == 3 && !tokens_before.contains(&tokens[2])
    });
    assert!(requeued, "stepped down node did not register again");

    let tokens_after = store.children(&path);
    assert_eq!(tokens_after[..2], tokens_before[1..]);

    cluster.assert_single_leader_for(Duration::from_millis(300));
    assert_eq!(cluster.leaders(), vec![1]);
    assert!(bystander_changes.try_recv().is_err());
    assert_eq!(cluster.workers[2].state(), ElectionState::Follower);

    cluster.terminate();
}
