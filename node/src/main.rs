#[macro_use]
extern crate log;
extern crate chrono;
extern crate env_logger;

use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use chrono::prelude::{DateTime, Local};
use clap::{Parser, ValueEnum};
use rand::Rng;

extern crate election_modules;
extern crate leader_election;

use election_modules::{MemoryLeaseStore, MemoryRankStore};
use leader_election::{
    start_lease_election, start_rank_election, ElectionConfiguration, ElectionTimings,
    ElectionWorker,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Strategy {
    Lease,
    Rank,
}

/// Simulates a group of nodes electing a leader over an in-memory backend.
#[derive(Debug, Parser)]
#[command()]
struct Cli {
    #[arg(short = 's', long = "strategy", value_enum, default_value = "lease")]
    strategy: Strategy,
    #[arg(short = 'n', long = "nodes", default_value_t = 3)]
    nodes: usize,
    /// Simulation length in seconds.
    #[arg(short = 'd', long = "duration", default_value_t = 60)]
    duration: u64,
    #[arg(long = "namespace", default_value = "leaderelection")]
    namespace: String,
    #[arg(long = "lease-secs", default_value_t = 6)]
    lease_secs: u64,
    /// Seconds between status reports.
    #[arg(long = "report-interval", default_value_t = 2)]
    report_interval: u64,
    /// Probability of crashing the leader at each report.
    #[arg(long = "crash-chance", default_value_t = 0.1)]
    crash_chance: f64,
    /// Seconds a crashed leader stays down.
    #[arg(long = "pause", default_value_t = 5)]
    pause: u64,
}

fn init_logger() {
    env_logger::builder()
        .format(|buf, record| {
            let now: DateTime<Local> = Local::now();
            writeln!(buf, "{:5}: {} - {}", record.level(), now.format("%H:%M:%S.%3f"), record.args())
        })
        .init();
}

enum Backend {
    Lease(MemoryLeaseStore),
    Rank(MemoryRankStore),
}

struct SimulatedNode {
    name: String,
    worker: Option<ElectionWorker>,
    down_until: Option<Instant>,
}

fn main() {
    init_logger();

    let cli = Cli::parse();
    let backend = match cli.strategy {
        Strategy::Lease => Backend::Lease(MemoryLeaseStore::new()),
        Strategy::Rank => Backend::Rank(MemoryRankStore::new()),
    };

    info!(
        "Simulating {} nodes ({:?} strategy) for {} seconds",
        cli.nodes, cli.strategy, cli.duration
    );

    let mut nodes: Vec<SimulatedNode> = (0..cli.nodes)
        .map(|idx| SimulatedNode {
            name: format!("node-{}", idx),
            worker: None,
            down_until: None,
        })
        .collect();
    for node in nodes.iter_mut() {
        node.worker = start_node(&cli, &backend, &node.name);
    }

    let mut rng = rand::thread_rng();
    let end = Instant::now() + Duration::from_secs(cli.duration);
    while Instant::now() < end {
        thread::sleep(Duration::from_secs(cli.report_interval));

        for node in nodes.iter_mut() {
            if node.down_until.map_or(false, |until| until <= Instant::now()) {
                info!("Restarting node {}", node.name);
                node.down_until = None;
                node.worker = start_node(&cli, &backend, &node.name);
            }
        }

        report(&nodes);

        if rng.gen_bool(cli.crash_chance.max(0.0).min(1.0)) {
            if let Some(node) = nodes
                .iter_mut()
                .find(|node| node.worker.as_ref().map_or(false, |worker| worker.is_leader()))
            {
                warn!("Simulating a crash of the leader {}", node.name);
                stop_node(node);
                node.down_until = Some(Instant::now() + Duration::from_secs(cli.pause));
            }
        }
    }

    for node in nodes.iter_mut() {
        stop_node(node);
    }
    info!("Simulation finished");
}

fn start_node(cli: &Cli, backend: &Backend, name: &str) -> Option<ElectionWorker> {
    let lease_duration = Duration::from_secs(cli.lease_secs);
    let config = ElectionConfiguration {
        namespace: cli.namespace.clone(),
        timings: ElectionTimings {
            lease_duration,
            min_renewal_interval: Duration::from_secs(1),
            ..ElectionTimings::default()
        },
        ..ElectionConfiguration::with_node_id(name)
    };

    let result = match backend {
        Backend::Lease(store) => start_lease_election(config, store.connect()),
        Backend::Rank(store) => start_rank_election(config, store.connect()),
    };

    match result {
        Ok(worker) => Some(worker),
        Err(err) => {
            error!("Node {} cannot join the election: {}", name, err);
            None
        }
    }
}

fn stop_node(node: &mut SimulatedNode) {
    if let Some(worker) = node.worker.take() {
        if let Err(err) = worker.stop() {
            error!("Error stopping node {}: {}", node.name, err);
        }
    }
}

fn report(nodes: &[SimulatedNode]) {
    for node in nodes {
        match &node.worker {
            Some(worker) => {
                let status = worker.status();
                let leader = status
                    .current_leader
                    .map(|leader| format!("(current leader: {})", leader))
                    .unwrap_or_default();
                info!("Node {} is {} {}", node.name, status.state, leader);
            }
            None => info!("Node {} is down", node.name),
        }
    }
}
