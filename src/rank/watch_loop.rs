use chrono::Utc;
use crossbeam_channel::{Receiver, RecvError};

use crate::backend::{RankAdapter, RankBackend, RankToken, SessionEvent};
use crate::errors::{new_err, ErrorKind, Result};
use crate::leadership::node_leadership_fsm::NodeLeadershipFsm;
use crate::leadership::ranking::{rank_position, RankPosition};
use crate::leadership::status::StatusPublisher;
use crate::leadership::{LeadershipEvent, Transition};
use crate::node::configuration::ElectionTimings;

pub struct WatchLoopParams<B: RankBackend> {
    pub adapter: RankAdapter<B>,
    pub fsm: NodeLeadershipFsm,
    pub publisher: StatusPublisher,
    pub timings: ElectionTimings,
    pub step_down_rx: Receiver<()>,
}

/// Tokens this node owns: the live registration, and a token whose delete
/// failed and must be retried before registering again.
#[derive(Debug, Default)]
struct Registration {
    current: Option<RankToken>,
    withdrawing: Option<RankToken>,
}

/// Drives the rank strategy. Event driven: a follower holds exactly one
/// watch, on the token right before its own, and re-evaluates when it fires.
/// Every pass of the loop replaces the previous watch.
pub fn run_watch_loop<B: RankBackend>(mut params: WatchLoopParams<B>, terminate_worker_rx: Receiver<()>) {
    info!("Rank watch worker started for node {}", params.fsm.node_id());

    let step_down_rx = params.step_down_rx.clone();
    let mut session_rx = params.adapter.session_events();
    let mut registration = Registration::default();
    loop {
        let watch_rx = match evaluate(&mut params, &mut registration) {
            Ok(watch_rx) => watch_rx,
            Err(err) => {
                warn!("Node {} cannot evaluate its rank: {}", params.fsm.node_id(), err);
                apply(&mut params, LeadershipEvent::ConnectionLost);

                let retry = crossbeam_channel::after(params.timings.failure_backoff);
                let mut session_closed = false;
                select!(
                    recv(terminate_worker_rx) -> res  => {
                        if res.is_err() {
                            error!("Abnormal exit for rank watch worker");
                        }
                        break
                    },
                    recv(session_rx) -> event => {
                        session_closed = handle_session_event(&mut params, event, &mut registration);
                    },
                    recv(retry) -> _  => {},
                );
                if session_closed {
                    session_rx = crossbeam_channel::never();
                }
                continue;
            }
        };

        let mut session_closed = false;
        select!(
            recv(terminate_worker_rx) -> res  => {
                if res.is_err() {
                    error!("Abnormal exit for rank watch worker");
                }
                break
            },
            recv(step_down_rx) -> res => {
                if res.is_err() {
                    error!("Step down channel closed, stopping rank watch worker");
                    break
                }
                step_down(&mut params, &mut registration);
            },
            recv(watch_rx) -> _ => {
                debug!("Node {} predecessor disappeared, re-evaluating", params.fsm.node_id());
            },
            recv(session_rx) -> event => {
                session_closed = handle_session_event(&mut params, event, &mut registration);
            },
        );
        if session_closed {
            session_rx = crossbeam_channel::never();
        }
    }

    unregister_on_stop(&mut params, registration);

    info!("Rank watch worker stopped for node {}", params.fsm.node_id());
}

/// Registers when needed, ranks the live tokens and returns the watch to wait
/// on: nothing for the leader, the predecessor's deletion for a follower.
fn evaluate<B: RankBackend>(
    params: &mut WatchLoopParams<B>,
    registration: &mut Registration,
) -> Result<Receiver<()>> {
    // A withdrawn token left behind would keep the lowest rank forever.
    if let Some(token) = registration.withdrawing.clone() {
        params.adapter.unregister(&token)?;
        info!("Node {} withdrew token {}", params.fsm.node_id(), token);
        registration.withdrawing = None;
    }

    // A second pass covers a token that vanished between registration and listing.
    for _ in 0..2 {
        let token = match registration.current.clone() {
            Some(token) => token,
            None => {
                let token = params.adapter.register()?;
                info!("Node {} registered as {}", params.fsm.node_id(), token);
                registration.current = Some(token.clone());
                token
            }
        };

        let live_tokens = params.adapter.list_live_tokens()?;
        match rank_position(&live_tokens, &token) {
            RankPosition::Leader => {
                apply(
                    params,
                    LeadershipEvent::RankEvaluated {
                        lowest: true,
                        leader: None,
                    },
                );
                return Ok(crossbeam_channel::never());
            }
            RankPosition::Follower {
                leader,
                predecessor,
            } => {
                let leader_id = match params.adapter.read_token_owner(&leader) {
                    Ok(node_id) => Some(node_id),
                    Err(err) => {
                        debug!("Cannot read the owner of {}: {}", leader, err);
                        None
                    }
                };
                apply(
                    params,
                    LeadershipEvent::RankEvaluated {
                        lowest: false,
                        leader: leader_id,
                    },
                );

                debug!(
                    "Node {} ({}) watching {} for failure",
                    params.fsm.node_id(),
                    token,
                    predecessor
                );
                return params.adapter.watch_disappearance(&predecessor);
            }
            RankPosition::Unregistered => {
                warn!(
                    "Node {} token {} is gone, registering again",
                    params.fsm.node_id(),
                    token
                );
                registration.current = None;
                apply(params, LeadershipEvent::ConnectionLost);
            }
        }
    }

    new_err(
        ErrorKind::NotFound,
        format!("Registration of node {} is not listed", params.fsm.node_id()),
        params.adapter.election_path().to_string(),
    )
}

/// Returns true when the backend closed the session event stream.
fn handle_session_event<B: RankBackend>(
    params: &mut WatchLoopParams<B>,
    event: std::result::Result<SessionEvent, RecvError>,
    registration: &mut Registration,
) -> bool {
    match event {
        Ok(SessionEvent::Suspended) => {
            warn!("Node {} lost its backend connection", params.fsm.node_id());
            apply(params, LeadershipEvent::ConnectionLost);
        }
        Ok(SessionEvent::Reconnected) => {
            info!("Node {} reconnected to the backend", params.fsm.node_id());
        }
        Ok(SessionEvent::Lost) => {
            warn!("Node {} session expired, its token is gone", params.fsm.node_id());
            *registration = Registration::default();
            apply(params, LeadershipEvent::ConnectionLost);
        }
        Err(_) => {
            debug!("Session events closed for node {}", params.fsm.node_id());
            return true;
        }
    }

    false
}

fn step_down<B: RankBackend>(params: &mut WatchLoopParams<B>, registration: &mut Registration) {
    if !params.fsm.is_leader() {
        debug!("Node {} is not the leader, nothing to step down from", params.fsm.node_id());
        return;
    }
    let token = match registration.current.take() {
        Some(token) => token,
        None => return,
    };

    apply(params, LeadershipEvent::Relinquished);

    // The next pass registers a fresh token at the end of the queue.
    match params.adapter.unregister(&token) {
        Ok(()) => info!("Node {} gave up token {}", params.fsm.node_id(), token),
        Err(err) => {
            warn!(
                "Node {} could not delete token {}, retrying before registering again: {}",
                params.fsm.node_id(),
                token,
                err
            );
            registration.withdrawing = Some(token);
        }
    }
}

fn unregister_on_stop<B: RankBackend>(params: &mut WatchLoopParams<B>, registration: Registration) {
    apply(params, LeadershipEvent::StopRequested);

    let tokens = registration.current.into_iter().chain(registration.withdrawing);
    for token in tokens {
        match params.adapter.unregister(&token) {
            Ok(()) => info!("Node {} withdrew token {}", params.fsm.node_id(), token),
            Err(err) => warn!(
                "Node {} could not delete token {}, it goes away with the session: {}",
                params.fsm.node_id(),
                token,
                err
            ),
        }
    }
}

fn apply<B: RankBackend>(params: &mut WatchLoopParams<B>, event: LeadershipEvent) -> Transition {
    let transition = params.fsm.handle_event(event, Utc::now());
    params.publisher.publish(&params.fsm, transition);

    transition
}
