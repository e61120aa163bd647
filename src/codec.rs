//! Flat integer+double wire encoding for CT nodes, per spec.md S6.
//!
//! Layout, sent as four messages in order on the same tag:
//!   1. header of 8 integers
//!      `[id, parent_id, depth, num_agents, constraint_count,
//!        path_int_count, constraint_int_count, aux_value]`
//!   2. one double `cost`
//!   3. if `path_int_count > 0`: per agent `[len_i, x0, y0, .., x_{len-1}, y_{len-1}]`
//!   4. if `constraint_int_count > 0` (== `constraint_count * 7`): per
//!      constraint `[agent_id, time, kind(0|1), vx, vy, ex, ey]`

use crate::constraint::{Constraint, ConstraintKind, ConstraintSet};
use crate::grid::GridCoord;
use crate::highlevel::HighLevelNode;
use crate::path::AgentPath;

pub type NodeHeader = [i64; 8];

/// An undecoded wire payload. `parent_id == -1` means "no parent" (the root).
#[derive(Debug, Clone)]
pub struct SerializedNode {
    pub header: NodeHeader,
    pub cost: f64,
    pub path_ints: Vec<i64>,
    pub constraint_ints: Vec<i64>,
}

impl SerializedNode {
    pub fn num_agents(&self) -> usize {
        self.header[3] as usize
    }

    pub fn constraint_count(&self) -> usize {
        self.header[4] as usize
    }

    pub fn path_int_count(&self) -> usize {
        self.header[5] as usize
    }

    pub fn constraint_int_count(&self) -> usize {
        self.header[6] as usize
    }

    pub fn aux_value(&self) -> i64 {
        self.header[7]
    }
}

pub fn encode(node: &HighLevelNode, aux_value: i64) -> SerializedNode {
    let mut path_ints = Vec::new();
    for path in &node.paths {
        path_ints.push(path.len() as i64);
        for step in path.steps() {
            path_ints.push(step.x as i64);
            path_ints.push(step.y as i64);
        }
    }

    let mut constraint_ints = Vec::new();
    for c in node.constraints.iter() {
        constraint_ints.push(c.agent_id);
        constraint_ints.push(c.time as i64);
        constraint_ints.push(match c.kind {
            ConstraintKind::Vertex => 0,
            ConstraintKind::Edge => 1,
        });
        constraint_ints.push(c.vertex.x as i64);
        constraint_ints.push(c.vertex.y as i64);
        constraint_ints.push(c.edge_to.x as i64);
        constraint_ints.push(c.edge_to.y as i64);
    }

    let header: NodeHeader = [
        node.id as i64,
        node.parent_id.map(|p| p as i64).unwrap_or(-1),
        node.depth as i64,
        node.paths.len() as i64,
        node.constraints.len() as i64,
        path_ints.len() as i64,
        constraint_ints.len() as i64,
        aux_value,
    ];

    SerializedNode {
        header,
        cost: node.cost as f64,
        path_ints,
        constraint_ints,
    }
}

pub fn decode(serialized: &SerializedNode) -> HighLevelNode {
    let num_agents = serialized.num_agents();
    let mut paths = Vec::with_capacity(num_agents);
    let mut cursor = 0usize;
    for _ in 0..num_agents {
        let len = serialized.path_ints[cursor] as usize;
        cursor += 1;
        let mut steps = Vec::with_capacity(len);
        for _ in 0..len {
            let x = serialized.path_ints[cursor] as usize;
            let y = serialized.path_ints[cursor + 1] as usize;
            cursor += 2;
            steps.push(GridCoord::new(x, y));
        }
        paths.push(AgentPath::new(steps));
    }

    let mut constraints = ConstraintSet::new();
    let mut ccursor = 0usize;
    for _ in 0..serialized.constraint_count() {
        let agent_id = serialized.constraint_ints[ccursor];
        let time = serialized.constraint_ints[ccursor + 1] as usize;
        let kind = serialized.constraint_ints[ccursor + 2];
        let vx = serialized.constraint_ints[ccursor + 3] as usize;
        let vy = serialized.constraint_ints[ccursor + 4] as usize;
        let ex = serialized.constraint_ints[ccursor + 5] as usize;
        let ey = serialized.constraint_ints[ccursor + 6] as usize;
        ccursor += 7;

        let c = match kind {
            0 => Constraint::vertex(agent_id, time, GridCoord::new(vx, vy)),
            _ => Constraint::edge(agent_id, time, GridCoord::new(vx, vy), GridCoord::new(ex, ey)),
        };
        constraints.push(c);
    }

    HighLevelNode {
        id: serialized.header[0] as u64,
        parent_id: if serialized.header[1] < 0 {
            None
        } else {
            Some(serialized.header[1] as u64)
        },
        depth: serialized.header[2] as u32,
        cost: serialized.cost.round() as usize,
        constraints,
        paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ALL_AGENTS;

    fn sample_node() -> HighLevelNode {
        let mut constraints = ConstraintSet::new();
        constraints.push(Constraint::vertex(0, 3, GridCoord::new(1, 1)));
        constraints.push(Constraint::edge(ALL_AGENTS, 2, GridCoord::new(0, 0), GridCoord::new(1, 0)));

        HighLevelNode {
            id: 7,
            parent_id: Some(3),
            depth: 2,
            cost: 5,
            constraints,
            paths: vec![
                AgentPath::new(vec![GridCoord::new(0, 0), GridCoord::new(1, 0)]),
                AgentPath::new(vec![GridCoord::new(2, 0), GridCoord::new(1, 0), GridCoord::new(0, 0)]),
            ],
        }
    }

    #[test]
    fn round_trip_preserves_everything_but_id_semantics() {
        let node = sample_node();
        let wire = encode(&node, 42);
        assert_eq!(wire.aux_value(), 42);

        let decoded = decode(&wire);
        assert_eq!(decoded.id, node.id);
        assert_eq!(decoded.parent_id, node.parent_id);
        assert_eq!(decoded.depth, node.depth);
        assert_eq!(decoded.cost, node.cost);
        assert_eq!(decoded.paths, node.paths);
        assert_eq!(decoded.constraints.len(), node.constraints.len());
    }

    #[test]
    fn root_has_no_parent_sentinel() {
        let mut node = sample_node();
        node.parent_id = None;
        let wire = encode(&node, 0);
        assert_eq!(wire.header[1], -1);
        assert_eq!(decode(&wire).parent_id, None);
    }
}
