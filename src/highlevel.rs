//! The constraint-tree node and the shared CBS expansion step (spec.md S4.3),
//! used identically by the serial, centralized and decentralized modes.

use std::cmp::Ordering;

use tracing::debug;

use crate::astar;
use crate::conflict::{detect_conflict, Conflict, ConflictKind};
use crate::constraint::{Constraint, ConstraintSet};
use crate::path::AgentPath;
use crate::problem::ProblemInstance;
use crate::stats::Stats;

/// A node in the constraint tree: a constraint set plus a joint plan
/// consistent with it. `id` is assigned monotonically by whichever peer
/// admits the node to its OPEN; `parent_id` is that admitting peer's view
/// of the expanded parent.
#[derive(Debug, Clone)]
pub struct HighLevelNode {
    pub id: u64,
    pub parent_id: Option<u64>,
    pub depth: u32,
    pub cost: usize,
    pub constraints: ConstraintSet,
    pub paths: Vec<AgentPath>,
}

impl PartialEq for HighLevelNode {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for HighLevelNode {}

// Min-heap ordering: a smaller cost is a *greater* priority, matching the
// teacher's convention of inverting `Ord` so `BinaryHeap` behaves as a
// min-heap on `cost`.
impl Ord for HighLevelNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost)
    }
}
impl PartialOrd for HighLevelNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl HighLevelNode {
    /// Builds the root node: empty constraints, one A* call per agent.
    pub fn root(problem: &ProblemInstance, max_path_length: usize, stats: &mut Stats) -> Option<Self> {
        let constraints = ConstraintSet::new();
        let mut paths = Vec::with_capacity(problem.agents.len());
        let mut cost = 0;

        for agent in &problem.agents {
            let path = astar::search(
                &problem.map,
                &constraints,
                agent.start,
                agent.goal,
                agent.id,
                max_path_length,
                &mut stats.low_level_expand_nodes,
            )?;
            cost += path.cost();
            paths.push(path);
        }

        Some(HighLevelNode {
            id: 0,
            parent_id: None,
            depth: 0,
            cost,
            constraints,
            paths,
        })
    }

    pub fn conflict(&self) -> Option<Conflict> {
        detect_conflict(&self.paths)
    }

    /// Builds the child that results from resolving `conflict` against
    /// whichever of its two agents `resolve_first` selects, replanning that
    /// agent under the extended constraint set. Returns `None` if the
    /// replanned agent has no feasible path (the sibling child is still
    /// considered separately by the caller).
    pub fn make_child(
        &self,
        conflict: &Conflict,
        resolve_first: bool,
        problem: &ProblemInstance,
        new_id: u64,
        max_path_length: usize,
        stats: &mut Stats,
    ) -> Option<HighLevelNode> {
        let agent = if resolve_first {
            conflict.agent_a
        } else {
            conflict.agent_b
        };
        let new_constraint = split_constraint(conflict, agent, resolve_first);
        let constraints = self.constraints.with_pushed(new_constraint);

        let new_path = astar::search(
            &problem.map,
            &constraints,
            problem.agents[agent].start,
            problem.agents[agent].goal,
            agent,
            max_path_length,
            &mut stats.low_level_expand_nodes,
        )?;

        let mut paths = self.paths.clone();
        let cost = self.cost - paths[agent].cost() + new_path.cost();
        paths[agent] = new_path;

        debug!(parent = self.id, new_id, agent, cost, "expand CT node");

        Some(HighLevelNode {
            id: new_id,
            parent_id: Some(self.id),
            depth: self.depth + 1,
            cost,
            constraints,
            paths,
        })
    }
}

/// The split constraint for agent `alpha` given a detected conflict, per
/// spec.md S4.3. For an edge conflict, agent `a` gets the forward
/// transition and agent `b` gets the mirrored one.
fn split_constraint(conflict: &Conflict, alpha: usize, resolve_first: bool) -> Constraint {
    match conflict.kind {
        ConflictKind::Vertex => Constraint::vertex(alpha as i64, conflict.time, conflict.position),
        ConflictKind::Edge => {
            if resolve_first {
                Constraint::edge(alpha as i64, conflict.time, conflict.position, conflict.edge_to)
            } else {
                Constraint::edge(alpha as i64, conflict.time, conflict.edge_to, conflict.position)
            }
        }
    }
}
