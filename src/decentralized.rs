//! Decentralized mode (spec.md S4.6): every rank owns a local OPEN shard.
//! Children are shipped round-robin to peers over `TAG_DP_NODE`; a global
//! cost lower bound and incumbent are maintained by collective reductions
//! every round, piggy-backed on `TAG_IDLE` (local lower bound),
//! `TAG_INCUMBENT` (local best solution cost) and `TAG_TERMINATE` (local
//! deadline-exceeded flag) broadcasts — an all-gather built out of the
//! point-to-point `Transport`, since no MPI collective exists in this crate.

use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::astar;
use crate::config::Config;
use crate::highlevel::HighLevelNode;
use crate::problem::ProblemInstance;
use crate::stats::{RunStats, RunStatus, Stats};
use crate::transport::{AsyncSendPool, Payload, PeerLink, Tag};
use crate::wire;

const NO_BOUND: i64 = i64::MAX;
const NO_SOLUTION: i64 = -1;

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

    let rank = link.rank();
    let size = link.size();
    let other_ranks: Vec<usize> = link.other_ranks().collect();

    let mut open: BinaryHeap<HighLevelNode> = BinaryHeap::new();
    let mut next_id: u64 = 1;
    let mut ship_cursor = 0usize;
    let mut local_incumbent: Option<HighLevelNode> = None;
    let mut last_global_best: Option<i64> = None;

    if rank == 0 {
        if let Some(root) = HighLevelNode::root(problem, max_path_length, stats) {
            open.push(root);
        }
    }

    let status = loop {
        let local_timed_out = deadline.is_some_and(|d| Instant::now() >= d)
            || config
                .expand_budget
                .is_some_and(|b| stats.high_level_expand_nodes >= b);

        let local_lb = open.peek().map(|n| n.cost as i64).unwrap_or(NO_BOUND);
        let local_best = local_incumbent.as_ref().map(|n| n.cost as i64).unwrap_or(NO_SOLUTION);

        link.broadcast(other_ranks.iter().copied(), Tag::Idle, Payload::Count(local_lb))
            .await;
        link.broadcast(other_ranks.iter().copied(), Tag::Incumbent, Payload::Count(local_best))
            .await;
        link.broadcast(
            other_ranks.iter().copied(),
            Tag::Terminate,
            Payload::Count(local_timed_out as i64),
        )
        .await;

        let mut lbs = vec![local_lb];
        let mut bests = vec![local_best];
        let mut timeouts = vec![local_timed_out];
        let mut received = 0usize;
        let expected = 3 * other_ranks.len();

        while received < expected {
            let msg = link.recv().await.expect("peer channel closed mid-round");
            match msg.tag {
                Tag::Idle => {
                    lbs.push(count_payload(msg.payload));
                    received += 1;
                }
                Tag::Incumbent => {
                    bests.push(count_payload(msg.payload));
                    received += 1;
                }
                Tag::Terminate => {
                    timeouts.push(count_payload(msg.payload) != 0);
                    received += 1;
                }
                Tag::DpNode => {
                    let node = wire::recv_node_given_header(link, msg).await;
                    open.push(node);
                }
                other => debug!(?other, "decentralized rank ignoring unexpected tag"),
            }
        }

        let global_timeout = timeouts.iter().any(|&t| t);
        let global_lb = lbs.into_iter().min().unwrap_or(NO_BOUND);
        let global_best = bests.into_iter().filter(|&b| b >= 0).min();
        if global_best.is_some() {
            last_global_best = global_best;
        }

        if global_timeout {
            break RunStatus::Timeout;
        }
        if let Some(best) = global_best {
            if global_lb == NO_BOUND || global_lb >= best {
                break RunStatus::Success;
            }
        } else if global_lb == NO_BOUND {
            break RunStatus::Failure;
        }

        let bound = if global_lb == NO_BOUND {
            NO_BOUND
        } else {
            (config.w * global_lb as f64) as i64
        };

        if let Some(top) = open.peek() {
            if (top.cost as i64) <= bound {
                let node = open.pop().expect("just peeked Some above");
                stats.high_level_expand_nodes += 1;

                match node.conflict() {
                    None => {
                        if local_incumbent.as_ref().map_or(true, |inc| node.cost < inc.cost) {
                            info!(cost = node.cost, rank, "decentralized rank found a candidate solution");
                            local_incumbent = Some(node);
                        }
                    }
                    Some(conflict) => {
                        stats.conflicts_detected += 1;
                        for resolve_first in [true, false] {
                            let candidate_id = (rank as u64) * 1_000_000 + next_id;
                            if let Some(child) = node.make_child(
                                &conflict,
                                resolve_first,
                                problem,
                                candidate_id,
                                max_path_length,
                                stats,
                            ) {
                                next_id += 1;
                                stats.high_level_generate_nodes += 1;

                                let pruned = local_incumbent
                                    .as_ref()
                                    .is_some_and(|inc| child.cost >= inc.cost);
                                if pruned {
                                    continue;
                                }

                                let dest = ship_cursor % size;
                                ship_cursor += 1;
                                if dest == rank {
                                    open.push(child);
                                } else {
                                    wire::send_node(pool, link, dest, Tag::DpNode, &child, 0).await;
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    pool.wait_all().await;

    RunStats {
        cost: last_global_best.unwrap_or(-1),
        nodes_expanded: stats.high_level_expand_nodes,
        nodes_generated: stats.high_level_generate_nodes,
        conflicts: stats.conflicts_detected,
        runtime: start_time.elapsed(),
        comm_time: Duration::ZERO,
        compute_time: start_time.elapsed(),
        status,
    }
}

fn count_payload(payload: Payload) -> i64 {
    match payload {
        Payload::Count(n) => n,
        other => panic!("expected a Count payload in a reduction round, got {other:?}"),
    }
}
