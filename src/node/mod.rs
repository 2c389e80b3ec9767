use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use crate::backend::{LeaseAdapter, LeaseBackend, RankAdapter, RankBackend, ResourceKey};
use crate::common::{self, Worker};
use crate::errors::{new_err, ErrorKind, Result};
use crate::leadership::node_leadership_fsm::NodeLeadershipFsm;
use crate::leadership::status::{ElectionStatus, ProtectedStatus, StatusPublisher};
use crate::leadership::ElectionState;
use crate::lease::renewal_loop::{run_renewal_loop, RenewalLoopParams};
use crate::rank::watch_loop::{run_watch_loop, WatchLoopParams};

pub mod configuration;

use configuration::ElectionConfiguration;

/// A running election participant. The background loop owns the state
/// machine; this handle only reads snapshots and sends commands.
#[derive(Debug)]
pub struct ElectionWorker {
    node_id: String,
    worker: Worker,
    status: ProtectedStatus,
    leadership_changes_rx: Receiver<ElectionState>,
    step_down_tx: Sender<()>,
    stop_timeout: Duration,
}

impl ElectionWorker {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn status(&self) -> ElectionStatus {
        self.status.read().clone()
    }

    pub fn state(&self) -> ElectionState {
        self.status.read().state
    }

    pub fn is_leader(&self) -> bool {
        self.status.read().is_leader()
    }

    /// False once the election loop has exited.
    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Receives every state the node enters. Clones share one queue.
    pub fn leadership_changes(&self) -> Receiver<ElectionState> {
        self.leadership_changes_rx.clone()
    }

    /// Gives up leadership without leaving the election.
    pub fn step_down(&self) {
        if self.step_down_tx.send(()).is_err() {
            warn!("Node {} election loop is not running", self.node_id);
        }
    }

    /// Stops the loop, releasing leadership when held, and waits up to the
    /// configured stop timeout for it to exit.
    pub fn stop(self) -> Result<ElectionStatus> {
        info!("Node {} termination requested", self.node_id);

        let status = self.status.clone();
        if !self.worker.stop(self.stop_timeout) {
            return new_err(
                ErrorKind::StopTimeout,
                format!("Election loop of node {} did not stop", self.node_id),
                format!("waited {:?}", self.stop_timeout),
            );
        }

        info!("Node {} left the election", self.node_id);
        let final_status = status.read().clone();
        Ok(final_status)
    }
}

struct Plumbing {
    fsm: NodeLeadershipFsm,
    publisher: StatusPublisher,
    status: ProtectedStatus,
    leadership_changes_rx: Receiver<ElectionState>,
    step_down_tx: Sender<()>,
    step_down_rx: Receiver<()>,
}

fn plumbing(node_id: &str) -> Plumbing {
    let fsm = NodeLeadershipFsm::new(node_id.to_string(), Utc::now());
    let status = Arc::new(RwLock::new(fsm.snapshot()));

    let (leadership_changes_tx, leadership_changes_rx): (Sender<ElectionState>, Receiver<ElectionState>) =
        crossbeam_channel::unbounded();
    let (step_down_tx, step_down_rx): (Sender<()>, Receiver<()>) = crossbeam_channel::unbounded();

    Plumbing {
        fsm,
        publisher: StatusPublisher::new(status.clone(), leadership_changes_tx),
        status,
        leadership_changes_rx,
        step_down_tx,
        step_down_rx,
    }
}

/// Joins the lease election for `config.namespace`/`config.resource_name`.
/// Only configuration errors are fatal; backend failures are retried by the loop.
pub fn start_lease_election<B: LeaseBackend>(
    config: ElectionConfiguration,
    backend: B,
) -> Result<ElectionWorker> {
    config.validate()?;

    let key = ResourceKey {
        namespace: config.namespace.clone(),
        name: config.resource_name.clone(),
    };
    let adapter = LeaseAdapter::new(backend, key, config.node_id.clone());
    if let Err(err) = adapter.ensure_resource() {
        warn!(
            "Cannot verify election resource {}, will retry: {}",
            adapter.key(),
            err
        );
    }

    let plumbing = plumbing(&config.node_id);
    let worker = common::run_worker(
        run_renewal_loop,
        RenewalLoopParams {
            adapter,
            fsm: plumbing.fsm,
            publisher: plumbing.publisher,
            timings: config.timings,
            step_down_rx: plumbing.step_down_rx,
        },
    );

    info!(
        "Node {} started (lease strategy, resource {}/{})",
        config.node_id, config.namespace, config.resource_name
    );

    Ok(ElectionWorker {
        node_id: config.node_id,
        worker,
        status: plumbing.status,
        leadership_changes_rx: plumbing.leadership_changes_rx,
        step_down_tx: plumbing.step_down_tx,
        stop_timeout: config.timings.stop_timeout,
    })
}

/// Joins the rank election under `config.election_path()`.
pub fn start_rank_election<B: RankBackend>(
    config: ElectionConfiguration,
    backend: B,
) -> Result<ElectionWorker> {
    config.validate()?;

    let adapter = RankAdapter::new(
        backend,
        config.election_path(),
        config.token_prefix.clone(),
        config.node_id.clone(),
    );
    if let Err(err) = adapter.ensure_election_path() {
        warn!(
            "Cannot verify election path {}, will retry: {}",
            adapter.election_path(),
            err
        );
    }

    let plumbing = plumbing(&config.node_id);
    let worker = common::run_worker(
        run_watch_loop,
        WatchLoopParams {
            adapter,
            fsm: plumbing.fsm,
            publisher: plumbing.publisher,
            timings: config.timings,
            step_down_rx: plumbing.step_down_rx,
        },
    );

    info!(
        "Node {} started (rank strategy, path {})",
        config.node_id,
        config.election_path()
    );

    Ok(ElectionWorker {
        node_id: config.node_id,
        worker,
        status: plumbing.status,
        leadership_changes_rx: plumbing.leadership_changes_rx,
        step_down_tx: plumbing.step_down_tx,
        stop_timeout: config.timings.stop_timeout,
    })
}
