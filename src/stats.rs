//! Run counters threaded mutably through a search, the way the teacher
//! threads `Stats` through `a_star_search` / `update_constraint`.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Timeout,
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Timeout => "timeout",
            RunStatus::Failure => "failure",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub low_level_expand_nodes: usize,
    pub high_level_expand_nodes: usize,
    pub high_level_generate_nodes: usize,
    pub conflicts_detected: usize,
}

/// Final per-run summary, consumed by `ResultWriter`.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub cost: i64,
    pub nodes_expanded: usize,
    pub nodes_generated: usize,
    pub conflicts: usize,
    pub runtime: Duration,
    pub comm_time: Duration,
    pub compute_time: Duration,
    pub status: RunStatus,
}
