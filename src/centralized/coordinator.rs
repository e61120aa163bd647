//! Coordinator role (spec.md S4.4): owns OPEN and the node-id counter,
//! dispatches cost plateaus to worker ranks round-robin, and drains their
//! replies with a non-blocking probe so a wall-clock timeout can
//! preempt the wait.

use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::astar;
use crate::config::Config;
use crate::highlevel::HighLevelNode;
use crate::problem::ProblemInstance;
use crate::stats::{RunStats, RunStatus, Stats};
use crate::transport::{AsyncSendPool, Payload, PeerLink, Tag, POLL_INTERVAL};
use crate::wire;

pub const COORDINATOR_RANK: usize = 0;

/// How long the coordinator keeps reading stray replies after a wall-clock
/// timeout before giving up on them and broadcasting `TAG_TERMINATE`.
const GRACE_PERIOD: Duration = Duration::from_secs(5);

pub async fn run(
    link: &mut PeerLink,
    pool: &mut AsyncSendPool,
    problem: &ProblemInstance,
    config: &Config,
    stats: &mut Stats,
) -> RunStats {
    let start_time = Instant::now();
    let max_path_length = astar::max_path_length(&problem.map);
    let deadline =
        (config.timeout > 0.0).then(|| start_time + Duration::from_secs_f64(config.timeout));

    let workers: Vec<usize> = link.other_ranks().collect();
    let mut worker_cursor = 0usize;

    let mut open: BinaryHeap<HighLevelNode> = BinaryHeap::new();
    let mut next_id: u64 = 1;
    let mut incumbent: Option<HighLevelNode> = None;

    let status = match HighLevelNode::root(problem, max_path_length, stats) {
        None => RunStatus::Failure,
        Some(root) => {
            open.push(root);
            run_outer_loop(
                link,
                pool,
                problem,
                &workers,
                &mut worker_cursor,
                &mut open,
                &mut next_id,
                &mut incumbent,
                deadline,
                config.expand_budget,
                stats,
            )
            .await
        }
    };

    let status = if status == RunStatus::Timeout {
        drain_grace_period(link, &mut incumbent).await;
        status
    } else {
        status
    };

    link.broadcast(workers.iter().copied(), Tag::Terminate, Payload::Empty)
        .await;
    pool.wait_all().await;

    info!(?status, cost = incumbent.as_ref().map(|n| n.cost), "centralized run finished");

    RunStats {
        cost: incumbent.as_ref().map(|n| n.cost as i64).unwrap_or(-1),
        nodes_expanded: stats.high_level_expand_nodes,
        nodes_generated: stats.high_level_generate_nodes,
        conflicts: stats.conflicts_detected,
        runtime: start_time.elapsed(),
        comm_time: Duration::ZERO,
        compute_time: start_time.elapsed(),
        status,
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_outer_loop(
    link: &mut PeerLink,
    pool: &mut AsyncSendPool,
    _problem: &ProblemInstance,
    workers: &[usize],
    worker_cursor: &mut usize,
    open: &mut BinaryHeap<HighLevelNode>,
    next_id: &mut u64,
    incumbent: &mut Option<HighLevelNode>,
    deadline: Option<Instant>,
    expand_budget: Option<usize>,
    stats: &mut Stats,
) -> RunStatus {
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return RunStatus::Timeout;
        }
        if let Some(budget) = expand_budget {
            if stats.high_level_expand_nodes >= budget {
                return RunStatus::Timeout;
            }
        }

        match open.peek() {
            None => return if incumbent.is_some() { RunStatus::Success } else { RunStatus::Failure },
            Some(top) => {
                if let Some(inc) = incumbent.as_ref() {
                    if top.cost >= inc.cost {
                        return RunStatus::Success;
                    }
                }
            }
        }

        let first = open.pop().expect("just peeked Some above");
        let plateau_cost = first.cost;
        let mut plateau = vec![first];
        while let Some(top) = open.peek() {
            if top.cost == plateau_cost {
                plateau.push(open.pop().expect("just peeked Some above"));
            } else {
                break;
            }
        }

        stats.high_level_expand_nodes += plateau.len();
        debug!(plateau_size = plateau.len(), cost = plateau_cost, "dispatching plateau");

        let aux_value = incumbent.as_ref().map(|n| n.cost as i64).unwrap_or(i64::MAX);
        for node in &plateau {
            let worker = workers[*worker_cursor % workers.len()];
            *worker_cursor += 1;
            wire::send_node(pool, link, worker, Tag::Task, node, aux_value).await;
        }

        let mut outstanding = plateau.len();
        let mut timed_out = false;
        while outstanding > 0 {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                timed_out = true;
                break;
            }

            let Some(msg) = link.try_recv() else {
                pool.progress();
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            };

            match msg.tag {
                Tag::Solution => {
                    let node = wire::recv_node_given_header(link, msg).await;
                    consider_incumbent(incumbent, node);
                    outstanding -= 1;
                }
                Tag::Children => {
                    let children = wire::recv_children_given_count(link, msg).await;
                    // A worker only replies with TAG_CHILDREN after its
                    // `process_node` found a conflict in the parent node.
                    stats.conflicts_detected += 1;
                    for mut child in children {
                        child.id = *next_id;
                        *next_id += 1;
                        stats.high_level_generate_nodes += 1;
                        let pruned = incumbent.as_ref().is_some_and(|inc| child.cost >= inc.cost);
                        if pruned {
                            continue;
                        }
                        open.push(child);
                    }
                    outstanding -= 1;
                }
                other => warn!(?other, "unexpected tag on coordinator inbox"),
            }
        }

        if timed_out {
            return RunStatus::Timeout;
        }
    }
}

fn consider_incumbent(incumbent: &mut Option<HighLevelNode>, candidate: HighLevelNode) {
    let better = incumbent.as_ref().map_or(true, |inc| candidate.cost < inc.cost);
    if better {
        info!(cost = candidate.cost, "new incumbent from a worker");
        *incumbent = Some(candidate);
    }
}

async fn drain_grace_period(link: &mut PeerLink, incumbent: &mut Option<HighLevelNode>) {
    let grace_deadline = Instant::now() + GRACE_PERIOD;
    while Instant::now() < grace_deadline {
        match link.try_recv() {
            Some(msg) => match msg.tag {
                Tag::Solution => {
                    let node = wire::recv_node_given_header(link, msg).await;
                    consider_incumbent(incumbent, node);
                }
                Tag::Children => {
                    let _ = wire::recv_children_given_count(link, msg).await;
                }
                _ => {}
            },
            None => tokio::time::sleep(POLL_INTERVAL).await,
        }
    }
}
