//! Worker role (spec.md S4.5): stateless between tasks. Receives one CT
//! node at a time, expands it, and replies with either a solution or its
//! (at most two) children.

use tracing::debug;

use crate::astar;
use crate::centralized::coordinator::COORDINATOR_RANK;
use crate::highlevel::HighLevelNode;
use crate::problem::ProblemInstance;
use crate::stats::Stats;
use crate::transport::{AsyncSendPool, PeerLink, Tag, MAX_PENDING_SENDS};
use crate::wire;

pub async fn run(link: &mut PeerLink, problem: &ProblemInstance, stats: &mut Stats) {
    let max_path_length = astar::max_path_length(&problem.map);
    let mut pool = AsyncSendPool::new(MAX_PENDING_SENDS);

    loop {
        let Some(msg) = link.recv().await else {
            break;
        };

        match msg.tag {
            Tag::Terminate => break,
            Tag::Task => {
                let (node, aux_value) = wire::recv_node_given_header_with_aux(link, msg).await;
                process_node(link, &mut pool, problem, max_path_length, stats, node, aux_value).await;
            }
            other => debug!(?other, "worker ignoring unexpected tag"),
        }
    }

    pool.wait_all().await;
}

/// Recomputes the conflict for `node`, then either reports it as a
/// solution or ships its (pruned) children back to the coordinator.
async fn process_node(
    link: &PeerLink,
    pool: &mut AsyncSendPool,
    problem: &ProblemInstance,
    max_path_length: usize,
    stats: &mut Stats,
    node: HighLevelNode,
    aux_value: i64,
) {
    match node.conflict() {
        None => {
            debug!(cost = node.cost, "worker found a solution");
            wire::send_node(pool, link, COORDINATOR_RANK, Tag::Solution, &node, aux_value).await;
        }
        Some(conflict) => {
            stats.conflicts_detected += 1;
            let mut children = Vec::with_capacity(2);
            for resolve_first in [true, false] {
                if let Some(child) = node.make_child(
                    &conflict,
                    resolve_first,
                    problem,
                    0,
                    max_path_length,
                    stats,
                ) {
                    if (child.cost as i64) < aux_value {
                        children.push(child);
                    }
                }
            }
            wire::send_children(pool, link, COORDINATOR_RANK, &children, node.id).await;
        }
    }
}
