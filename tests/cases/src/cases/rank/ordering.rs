use election_modules::MemoryRankStore;
use leader_election::{ElectionState, RankAdapter};
use std::time::Duration;

use crate::steps;

pub fn run() {
    token_order_decides();
    successor_takes_over();
}

/// Tokens registered out of order still elect the lowest sequence.
fn token_order_decides() {
    let store = MemoryRankStore::new();
    let path = steps::get_election_path();
    let adapter = RankAdapter::new(store.connect(), path.clone(), "node_".to_string(), "probe".to_string());
    adapter.ensure_election_path().expect("path is created");

    let first = adapter.register().expect("registered");
    let second = adapter.register().expect("registered");
    let third = adapter.register().expect("registered");

    let live = adapter.list_live_tokens().expect("tokens are listed");
    assert_eq!(live, vec![first.clone(), second.clone(), third]);

    adapter.unregister(&first).expect("token removed");
    let live = adapter.list_live_tokens().expect("tokens are listed");
    assert_eq!(live[0], second);
}

/// When the leader leaves, only its direct successor reacts.
fn successor_takes_over() {
    let store = MemoryRankStore::new();
    let mut cluster = steps::cluster::start_rank_cluster(&store, 3);

    let leader = cluster.find_a_leader(Duration::from_secs(1));
    assert_eq!(leader, 0);

    let successor_changes = cluster.workers[1].leadership_changes();
    let bystander_changes = cluster.workers[2].leadership_changes();
    let bystander_status = cluster.workers[2].status();

    cluster.stop_node(0);

    assert!(steps::wait_for_state(
        &successor_changes,
        ElectionState::Leader,
        Duration::from_secs(1)
    ));
    assert_eq!(cluster.leaders(), vec![0]);
    assert_eq!(cluster.workers[0].node_id(), "rank-node-1");

    // The third node watches the second one and sees nothing happen.
    steps::sleep_ms(200);
    let bystander = &cluster.workers[1];
    assert!(bystander_changes.try_recv().is_err());
    assert_eq!(bystander.status().last_transition, bystander_status.last_transition);
    assert_eq!(bystander.state(), ElectionState::Follower);
    assert_eq!(store.children(&steps::get_election_path()).len(), 2);

    cluster.terminate();
}
