use election_modules::{MemoryLeaseConnection, MemoryLeaseStore, MemoryRankSession, MemoryRankStore};
use leader_election::{start_lease_election, start_rank_election, ElectionState, ElectionWorker};
use std::time::Duration;

use crate::steps;

/// Election participants together with their backend clients, kept for
/// fault injection.
pub struct CaseCluster<C> {
    pub workers: Vec<ElectionWorker>,
    pub clients: Vec<C>,
}

pub fn start_lease_cluster(store: &MemoryLeaseStore, size: usize) -> CaseCluster<MemoryLeaseConnection> {
    let mut cluster = CaseCluster {
        workers: Vec::new(),
        clients: Vec::new(),
    };

    for idx in 0..size {
        let connection = store.connect();
        let config = steps::get_configuration(&format!("lease-node-{}", idx));
        let worker = start_lease_election(config, connection.clone()).expect("valid configuration");

        cluster.workers.push(worker);
        cluster.clients.push(connection);
    }

    cluster
}

/// Starts nodes one by one, each registered before the next one starts, so
/// tokens follow the node order.
pub fn start_rank_cluster(store: &MemoryRankStore, size: usize) -> CaseCluster<MemoryRankSession> {
    let mut cluster = CaseCluster {
        workers: Vec::new(),
        clients: Vec::new(),
    };

    for idx in 0..size {
        let session = store.connect();
        let config = steps::get_configuration(&format!("rank-node-{}", idx));
        let worker = start_rank_election(config, session.clone()).expect("valid configuration");

        let registered = steps::wait_until(Duration::from_secs(2), || {
            store.children(&steps::get_election_path()).len() == idx + 1
        });
        assert!(registered, "node {} did not register", idx);

        cluster.workers.push(worker);
        cluster.clients.push(session);
    }

    cluster
}

impl<C> CaseCluster<C> {
    pub fn leaders(&self) -> Vec<usize> {
        self.workers
            .iter()
            .enumerate()
            .filter(|(_, worker)| worker.is_leader())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn find_a_leader(&self, timeout: Duration) -> usize {
        let found = steps::wait_until(timeout, || self.leaders().len() == 1);
        assert!(found, "no leader elected within {:?}", timeout);

        self.leaders()[0]
    }

    /// Fails when two nodes claim leadership at the same time.
    pub fn assert_single_leader_for(&self, duration: Duration) {
        let overlap = steps::wait_until(duration, || self.leaders().len() > 1);
        assert!(!overlap, "split brain: leaders {:?}", self.leaders());
    }

    pub fn stop_node(&mut self, idx: usize) {
        let worker = self.workers.remove(idx);
        self.clients.remove(idx);

        let status = worker.stop().expect("worker stops in time");
        assert_eq!(status.state, ElectionState::Stopped);
    }

    pub fn terminate(self) {
        for worker in self.workers {
            if let Err(err) = worker.stop() {
                error!("{}", err);
            }
        }
    }
}
