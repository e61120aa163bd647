//! Time-expanded, constraint-respecting single-agent A* over `(x, y, t)`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use tracing::{instrument, trace};

use crate::constraint::ConstraintSet;
use crate::grid::{GridCoord, GridMap};
use crate::path::AgentPath;

/// Lower bound on the A* time horizon, per spec.md S4.1.
pub const MIN_PATH_LENGTH: usize = 4096;

pub fn max_path_length(map: &GridMap) -> usize {
    (map.width * map.height * 4).max(MIN_PATH_LENGTH)
}

/// Arena-resident search node; `parent_idx` is an index into the same
/// arena, never a pointer, so the whole arena can be dropped as one unit
/// when the call returns.
#[derive(Debug, Clone, Copy)]
struct AStarNode {
    pos: GridCoord,
    time: usize,
    g: usize,
    parent_idx: Option<usize>,
}

/// Runs one time-expanded A* search for `agent_id` from `start` to `goal`
/// under `constraints`. Returns `None` on failure: OPEN exhausted, the
/// expansion-count safety bound tripped, or `T_max` reached without
/// admitting the goal.
#[instrument(skip(map, constraints, expanded), fields(agent_id, start = ?start, goal = ?goal))]
pub fn search(
    map: &GridMap,
    constraints: &ConstraintSet,
    start: GridCoord,
    goal: GridCoord,
    agent_id: usize,
    max_path_length: usize,
    expanded: &mut usize,
) -> Option<AgentPath> {
    let t_max = max_path_length;
    let cells = map.width * map.height;
    let safety_bound = cells * t_max;

    let mut arena: Vec<AStarNode> = Vec::new();
    let mut open: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();
    // Dense dominance table: best g seen for each (t, y, x) state.
    let mut best_g: Vec<usize> = vec![usize::MAX; t_max * cells];

    let h0 = start.manhattan(&goal);
    arena.push(AStarNode {
        pos: start,
        time: 0,
        g: 0,
        parent_idx: None,
    });
    best_g[state_index(0, start, map)] = 0;
    open.push(Reverse((h0, 0)));

    let mut popped = 0usize;

    while let Some(Reverse((_, idx))) = open.pop() {
        popped += 1;
        if popped > safety_bound {
            return None;
        }

        let current = arena[idx];
        *expanded += 1;
        trace!(?current.pos, current.time, current.g, "expand");

        if current.pos == goal && current.time >= constraints.max_time_at_goal(agent_id, goal) {
            return Some(reconstruct(&arena, idx));
        }

        if current.time + 1 >= t_max {
            continue;
        }

        for next in map.neighbors(current.pos) {
            if constraints.forbids_move(agent_id, current.pos, next, current.time) {
                continue;
            }

            let next_time = current.time + 1;
            let g_child = current.g + 1;
            let idx_table = state_index(next_time, next, map);

            if best_g[idx_table] <= g_child {
                continue;
            }
            best_g[idx_table] = g_child;

            let h = next.manhattan(&goal);
            let node_idx = arena.len();
            arena.push(AStarNode {
                pos: next,
                time: next_time,
                g: g_child,
                parent_idx: Some(idx),
            });
            open.push(Reverse((g_child + h, node_idx)));
        }
    }

    None
}

fn state_index(t: usize, c: GridCoord, map: &GridMap) -> usize {
    t * map.width * map.height + c.y * map.width + c.x
}

fn reconstruct(arena: &[AStarNode], goal_idx: usize) -> AgentPath {
    let mut steps = vec![GridCoord::new(0, 0); arena[goal_idx].time + 1];
    let mut cursor = Some(goal_idx);
    while let Some(idx) = cursor {
        let node = arena[idx];
        steps[node.time] = node.pos;
        cursor = node.parent_idx;
    }
    AgentPath::new(steps)
}
