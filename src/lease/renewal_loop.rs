use chrono::Utc;
use crossbeam_channel::Receiver;

use crate::backend::{LeaseAdapter, LeaseBackend};
use crate::common::wait_or_terminate;
use crate::errors::ErrorKind;
use crate::leadership::node_leadership_fsm::NodeLeadershipFsm;
use crate::leadership::status::StatusPublisher;
use crate::leadership::{LeadershipEvent, Transition};
use crate::lease::leader_record::record_leadership;
use crate::node::configuration::ElectionTimings;

pub struct RenewalLoopParams<B: LeaseBackend> {
    pub adapter: LeaseAdapter<B>,
    pub fsm: NodeLeadershipFsm,
    pub publisher: StatusPublisher,
    pub timings: ElectionTimings,
    pub step_down_rx: Receiver<()>,
}

/// Drives the lease strategy: renews while leader, acquires while follower,
/// one attempt per renewal period. The first attempt happens immediately.
pub fn run_renewal_loop<B: LeaseBackend>(
    mut params: RenewalLoopParams<B>,
    terminate_worker_rx: Receiver<()>,
) {
    info!("Lease renewal worker started for node {}", params.fsm.node_id());

    let period = params.timings.renewal_period();
    let step_down_rx = params.step_down_rx.clone();
    let mut skip_acquisition = false;
    loop {
        if run_tick(&mut params, &terminate_worker_rx, skip_acquisition) {
            break;
        }
        skip_acquisition = false;

        let timeout = crossbeam_channel::after(period);
        select!(
            recv(terminate_worker_rx) -> res  => {
                if res.is_err() {
                    error!("Abnormal exit for lease renewal worker");
                }
                break
            },
            recv(step_down_rx) -> res => {
                if res.is_err() {
                    error!("Step down channel closed, stopping lease renewal worker");
                    break
                }
                // Give the other nodes one period to pick the lease up.
                skip_acquisition = step_down(&mut params);
            },
            recv(timeout) -> _  => {},
        );
    }

    release_on_stop(&mut params);

    info!("Lease renewal worker stopped for node {}", params.fsm.node_id());
}

/// Returns true when termination was requested during the tick.
fn run_tick<B: LeaseBackend>(
    params: &mut RenewalLoopParams<B>,
    terminate_worker_rx: &Receiver<()>,
    skip_acquisition: bool,
) -> bool {
    if params
        .fsm
        .lease_lapsed(Utc::now(), params.timings.lease_duration)
    {
        warn!(
            "Node {} missed its renewal window, the lease must be acquired again",
            params.fsm.node_id()
        );
        apply(params, LeadershipEvent::RenewalFailed(ErrorKind::Expired));
    }

    if let Some(handle) = params.fsm.lease().cloned() {
        match params.adapter.renew(&handle) {
            Ok(()) => {
                trace!("Node {} renewed lease {}", params.fsm.node_id(), handle.lease_id());
                apply(params, LeadershipEvent::LeaseRenewed);
                return false;
            }
            Err(err) => {
                warn!("Node {} lost leadership during renewal: {}", params.fsm.node_id(), err);
                apply(params, LeadershipEvent::RenewalFailed(err.kind()));

                if wait_or_terminate(terminate_worker_rx, params.timings.failure_backoff) {
                    return true;
                }
            }
        }
    }

    if !skip_acquisition {
        try_acquire(params);
    }

    false
}

fn try_acquire<B: LeaseBackend>(params: &mut RenewalLoopParams<B>) {
    match params.adapter.acquire(params.timings.lease_duration) {
        Ok(handle) => {
            apply(params, LeadershipEvent::LeaseAcquired(handle.clone()));
            info!("Node {} is now the leader", params.fsm.node_id());

            record_leadership(&params.adapter, params.fsm.node_id(), &handle);
        }
        Err(err) => match err.kind() {
            ErrorKind::AlreadyHeld => {
                let holder = match params.adapter.read_current_holder() {
                    Ok(holder) => holder,
                    Err(err) => {
                        debug!("Cannot read the current leader: {}", err);
                        None
                    }
                };
                debug!(
                    "Node {}: lease is held by another node ({:?}). Waiting...",
                    params.fsm.node_id(),
                    holder
                );
                apply(params, LeadershipEvent::AcquireRejected { holder });
            }
            ErrorKind::ResourceMissing => {
                info!("Election resource {} is missing, creating it", params.adapter.key());
                if let Err(err) = params.adapter.ensure_resource() {
                    warn!("Cannot create election resource {}: {}", params.adapter.key(), err);
                }
            }
            _ => {
                warn!("Node {} could not acquire leadership: {}", params.fsm.node_id(), err);
            }
        },
    }
}

/// Returns true when a lease was given up.
fn step_down<B: LeaseBackend>(params: &mut RenewalLoopParams<B>) -> bool {
    let handle = match params.fsm.lease().cloned() {
        Some(handle) => handle,
        None => {
            debug!("Node {} is not the leader, nothing to step down from", params.fsm.node_id());
            return false;
        }
    };

    // Local leadership ends before the lease is handed back.
    apply(params, LeadershipEvent::Relinquished);

    match params.adapter.release(&handle) {
        Ok(()) => info!("Node {} stepped down", params.fsm.node_id()),
        Err(err) => warn!(
            "Node {} stepped down but could not release the lease: {}",
            params.fsm.node_id(),
            err
        ),
    }

    true
}

fn release_on_stop<B: LeaseBackend>(params: &mut RenewalLoopParams<B>) {
    let handle = params.fsm.lease().cloned();

    apply(params, LeadershipEvent::StopRequested);

    if let Some(handle) = handle {
        match params.adapter.release(&handle) {
            Ok(()) => info!("Node {} released leadership", params.fsm.node_id()),
            Err(err) => warn!(
                "Node {} could not release the lease, it expires on its own: {}",
                params.fsm.node_id(),
                err
            ),
        }
    }
}

fn apply<B: LeaseBackend>(params: &mut RenewalLoopParams<B>, event: LeadershipEvent) -> Transition {
    let transition = params.fsm.handle_event(event, Utc::now());
    params.publisher.publish(&params.fsm, transition);

    transition
}
