use election_modules::MemoryRankStore;
use leader_election::RankAdapter;
use rayon::prelude::*;

use crate::steps;

/// Concurrent path creation succeeds everywhere and registration works
/// against the result.
pub fn run() {
    let store = MemoryRankStore::new();

    let adapters: Vec<_> = (0..10)
        .map(|idx| {
            RankAdapter::new(
                store.connect(),
                steps::get_election_path(),
                "node_".to_string(),
                format!("bootstrap-node-{}", idx),
            )
        })
        .collect();

    let results: Vec<_> = adapters
        .par_iter()
        .map(|adapter| adapter.ensure_election_path())
        .collect();
    for result in results {
        result.expect("bootstrap succeeds");
    }

    let token = adapters[3].register().expect("registration succeeds");
    assert_eq!(token.sequence(), Some(0));
    assert_eq!(
        adapters[7].read_token_owner(&token).expect("token is readable"),
        "bootstrap-node-3"
    );
}
