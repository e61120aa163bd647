//! First pairwise vertex/edge collision in a candidate joint plan.

use crate::grid::GridCoord;
use crate::path::AgentPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    Vertex,
    Edge,
}

/// The earliest, lowest-agent-index conflict between two paths in a CT node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub agent_a: usize,
    pub agent_b: usize,
    pub time: usize,
    pub kind: ConflictKind,
    pub position: GridCoord,
    pub edge_to: GridCoord,
}

/// Scans `t = 0..max_len-1` with the outer loop on time and agent pairs
/// `(a < b)` inside, so the result is deterministically "earliest
/// conflict, then lowest agent-index pair".
pub fn detect_conflict(paths: &[AgentPath]) -> Option<Conflict> {
    let max_len = paths.iter().map(|p| p.len()).max().unwrap_or(0);
    if max_len == 0 {
        return None;
    }

    for t in 0..max_len.saturating_sub(1) {
        for a in 0..paths.len() {
            for b in (a + 1)..paths.len() {
                let pa_curr = paths[a].at(t);
                let pa_next = paths[a].at(t + 1);
                let pb_curr = paths[b].at(t);
                let pb_next = paths[b].at(t + 1);

                if pa_curr == pb_curr {
                    return Some(Conflict {
                        agent_a: a,
                        agent_b: b,
                        time: t,
                        kind: ConflictKind::Vertex,
                        position: pa_curr,
                        edge_to: pa_curr,
                    });
                }

                if pa_curr == pb_next && pb_curr == pa_next {
                    return Some(Conflict {
                        agent_a: a,
                        agent_b: b,
                        time: t,
                        kind: ConflictKind::Edge,
                        position: pa_curr,
                        edge_to: pa_next,
                    });
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_conflict_when_paths_never_meet() {
        let a = AgentPath::new(vec![GridCoord::new(0, 0), GridCoord::new(1, 0)]);
        let b = AgentPath::new(vec![GridCoord::new(0, 1), GridCoord::new(1, 1)]);
        assert!(detect_conflict(&[a, b]).is_none());
    }

    #[test]
    fn detects_vertex_conflict() {
        let a = AgentPath::new(vec![GridCoord::new(0, 0), GridCoord::new(1, 0)]);
        let b = AgentPath::new(vec![GridCoord::new(2, 0), GridCoord::new(1, 0)]);
        let c = detect_conflict(&[a, b]).unwrap();
        assert_eq!(c.kind, ConflictKind::Vertex);
        assert_eq!(c.time, 1);
        assert_eq!(c.position, GridCoord::new(1, 0));
    }

    #[test]
    fn detects_edge_conflict_swap() {
        let a = AgentPath::new(vec![GridCoord::new(0, 0), GridCoord::new(1, 0)]);
        let b = AgentPath::new(vec![GridCoord::new(1, 0), GridCoord::new(0, 0)]);
        let c = detect_conflict(&[a, b]).unwrap();
        assert_eq!(c.kind, ConflictKind::Edge);
        assert_eq!(c.time, 0);
        assert_eq!(c.position, GridCoord::new(0, 0));
        assert_eq!(c.edge_to, GridCoord::new(1, 0));
    }

    #[test]
    fn finished_agent_is_treated_as_waiting_at_goal() {
        let a = AgentPath::new(vec![GridCoord::new(0, 0)]);
        let b = AgentPath::new(vec![
            GridCoord::new(1, 0),
            GridCoord::new(0, 0),
            GridCoord::new(0, 0),
        ]);
        let c = detect_conflict(&[a, b]).unwrap();
        assert_eq!(c.kind, ConflictKind::Vertex);
        assert_eq!(c.time, 1);
    }
}
