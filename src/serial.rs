//! Serial CBS: one process runs the entire high-level loop in-process.

use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::astar;
use crate::config::Config;
use crate::highlevel::HighLevelNode;
use crate::problem::ProblemInstance;
use crate::stats::{RunStats, RunStatus, Stats};

pub async fn run(problem: &ProblemInstance, config: &Config, stats: &mut Stats) -> RunStats {
    let start_time = Instant::now();
    let max_path_length = astar::max_path_length(&problem.map);
    let deadline = (config.timeout > 0.0)
        .then(|| start_time + Duration::from_secs_f64(config.timeout));

    let mut open = BinaryHeap::new();
    let mut next_id: u64 = 1;

    let status;
    let mut incumbent: Option<HighLevelNode> = None;

    match HighLevelNode::root(problem, max_path_length, stats) {
        None => status = RunStatus::Failure,
        Some(root) => {
            open.push(root);
            status = loop {
                if let Some(d) = deadline {
                    if Instant::now() >= d {
                        break RunStatus::Timeout;
                    }
                }
                if let Some(budget) = config.expand_budget {
                    if stats.high_level_expand_nodes >= budget {
                        break RunStatus::Timeout;
                    }
                }

                let Some(current) = open.pop() else {
                    break RunStatus::Failure;
                };

                match current.conflict() {
                    None => {
                        info!(cost = current.cost, "serial mode found a solution");
                        incumbent = Some(current);
                        break RunStatus::Success;
                    }
                    Some(conflict) => {
                        debug!(?conflict, node = current.id, "expanding CT node");
                        stats.high_level_expand_nodes += 1;
                        stats.conflicts_detected += 1;

                        for resolve_first in [true, false] {
                            if let Some(child) = current.make_child(
                                &conflict,
                                resolve_first,
                                problem,
                                next_id,
                                max_path_length,
                                stats,
                            ) {
                                next_id += 1;
                                stats.high_level_generate_nodes += 1;
                                open.push(child);
                            }
                        }
                    }
                }
            };
        }
    }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMap;
    use crate::problem::Agent;

    fn problem(width: usize, height: usize, occupied: Vec<bool>, agents: Vec<Agent>) -> ProblemInstance {
        ProblemInstance {
            map: GridMap::new(width, height, occupied),
            agents,
        }
    }

    /// Two agents swapping ends of a 3-cell line. There is only one middle
    /// cell for them to pass through, and no side cell to step into, so no
    /// makespan resolves the head-on conflict at (1, 0): this is the
    /// classic unsolvable swap on a path graph, not a cost-6 solution.
    #[tokio::test]
    async fn s1_trivial_head_on_swap_is_infeasible() {
        let p = problem(
            3,
            1,
            vec![false; 3],
            vec![
                Agent { id: 0, start: (0, 0).into(), goal: (2, 0).into() },
                Agent { id: 1, start: (2, 0).into(), goal: (0, 0).into() },
            ],
        );
        let mut stats = Stats::default();
        let config = Config {
            map: String::new(),
            agents: String::new(),
            timeout: 0.0,
            csv: String::new(),
            mode: crate::config::Mode::Serial,
            expanders: 4,
            ll_pool: 1,
            w: 1.0,
            expand_budget: Some(2000),
        };
        let result = run(&p, &config, &mut stats).await;
        assert_eq!(result.cost, -1);
        assert!(matches!(result.status, RunStatus::Failure | RunStatus::Timeout));
        assert!(stats.conflicts_detected >= 1);
    }

    #[tokio::test]
    async fn s2_width_one_corridor_is_infeasible() {
        let p = problem(
            1,
            3,
            vec![false; 3],
            vec![
                Agent { id: 0, start: (0, 0).into(), goal: (0, 2).into() },
                Agent { id: 1, start: (0, 2).into(), goal: (0, 0).into() },
            ],
        );
        let mut stats = Stats::default();
        let config = Config {
            map: String::new(),
            agents: String::new(),
            timeout: 0.0,
            csv: String::new(),
            mode: crate::config::Mode::Serial,
            expanders: 4,
            ll_pool: 1,
            w: 1.0,
            expand_budget: Some(2000),
        };
        let result = run(&p, &config, &mut stats).await;
        assert_eq!(result.cost, -1);
        assert!(matches!(result.status, RunStatus::Failure | RunStatus::Timeout));
    }
}
