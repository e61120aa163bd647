//! Per-agent vertex/edge prohibitions that the low-level search must respect.

use crate::grid::GridCoord;

/// `agent_id < 0` means "all agents"; CBS splitting never produces this,
/// but the low level honors it (spec.md Open Question 3).
pub const ALL_AGENTS: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Vertex,
    Edge,
}

/// A single prohibition. For `Vertex` constraints `edge_to` is unused and
/// set equal to `vertex`; for `Edge` constraints it is the forbidden
/// transition's destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub agent_id: i64,
    pub time: usize,
    pub kind: ConstraintKind,
    pub vertex: GridCoord,
    pub edge_to: GridCoord,
}

impl Constraint {
    pub fn vertex(agent_id: i64, time: usize, vertex: GridCoord) -> Self {
        Constraint {
            agent_id,
            time,
            kind: ConstraintKind::Vertex,
            vertex,
            edge_to: vertex,
        }
    }

    pub fn edge(agent_id: i64, time: usize, from: GridCoord, to: GridCoord) -> Self {
        Constraint {
            agent_id,
            time,
            kind: ConstraintKind::Edge,
            vertex: from,
            edge_to: to,
        }
    }

    fn applies_to(&self, agent_id: usize) -> bool {
        self.agent_id < 0 || self.agent_id as usize == agent_id
    }
}

/// Append-only ordered list of constraints. Membership is checked linearly;
/// no deduplication is required for correctness.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintSet {
    entries: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        ConstraintSet::default()
    }

    pub fn push(&mut self, c: Constraint) {
        self.entries.push(c);
    }

    pub fn with_pushed(&self, c: Constraint) -> Self {
        let mut next = self.clone();
        next.push(c);
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if moving `agent_id` from `from` at time `t` to `to` at time
    /// `t + 1` is forbidden: a Vertex constraint on `to` at `t + 1`, or an
    /// Edge constraint on the `from -> to` transition at `t`.
    pub fn forbids_move(
        &self,
        agent_id: usize,
        from: GridCoord,
        to: GridCoord,
        t: usize,
    ) -> bool {
        self.entries.iter().any(|c| {
            if !c.applies_to(agent_id) {
                return false;
            }
            match c.kind {
                ConstraintKind::Vertex => c.time == t + 1 && c.vertex == to,
                ConstraintKind::Edge => c.time == t && c.vertex == from && c.edge_to == to,
            }
        })
    }

    /// The latest time step at which `agent_id` is forbidden from sitting on
    /// `goal`, used by the low-level goal test as the earliest time it may
    /// stop there: arriving and halting any sooner would make the stored
    /// path's implicit wait-at-goal tail violate that later constraint.
    /// Constraints on other cells don't bear on this, however late, since
    /// the agent is never sitting on them once it has reached its goal.
    pub fn max_time_at_goal(&self, agent_id: usize, goal: GridCoord) -> usize {
        self.entries
            .iter()
            .filter(|c| {
                c.applies_to(agent_id) && c.kind == ConstraintKind::Vertex && c.vertex == goal
            })
            .map(|c| c.time)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_constraint_blocks_destination_at_next_step() {
        let mut set = ConstraintSet::new();
        set.push(Constraint::vertex(0, 3, GridCoord::new(1, 1)));
        assert!(set.forbids_move(0, GridCoord::new(0, 1), GridCoord::new(1, 1), 2));
        assert!(!set.forbids_move(0, GridCoord::new(0, 1), GridCoord::new(1, 1), 3));
        assert!(!set.forbids_move(1, GridCoord::new(0, 1), GridCoord::new(1, 1), 2));
    }

    #[test]
    fn edge_constraint_blocks_the_transition() {
        let mut set = ConstraintSet::new();
        let a = GridCoord::new(0, 0);
        let b = GridCoord::new(1, 0);
        set.push(Constraint::edge(2, 5, a, b));
        assert!(set.forbids_move(2, a, b, 5));
        assert!(!set.forbids_move(2, b, a, 5));
        assert!(!set.forbids_move(2, a, b, 6));
    }

    #[test]
    fn all_agents_constraint_applies_to_every_agent() {
        let mut set = ConstraintSet::new();
        set.push(Constraint::vertex(ALL_AGENTS, 1, GridCoord::new(0, 0)));
        assert!(set.forbids_move(7, GridCoord::new(0, 1), GridCoord::new(0, 0), 0));
    }
}
