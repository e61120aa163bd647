//! The external-collaborator boundary: a `ProblemInstance` is all the core
//! search engine consumes. Parsing it from files lives here so the core
//! never touches the filesystem.

use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{anyhow, bail, Context, Result};

use crate::grid::{GridCoord, GridMap};

pub const MAX_AGENTS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: usize,
    pub start: GridCoord,
    pub goal: GridCoord,
}

#[derive(Debug, Clone)]
pub struct ProblemInstance {
    pub map: GridMap,
    pub agents: Vec<Agent>,
}

impl ProblemInstance {
    pub fn load(map_path: &str, agents_path: &str) -> Result<Self> {
        let map = GridMap::from_file(map_path)?;
        let agents = load_agents_file(agents_path)?;
        for agent in &agents {
            if !map.in_bounds(agent.start) || !map.in_bounds(agent.goal) {
                bail!(
                    "agent {} has out-of-bounds start/goal for a {}x{} map",
                    agent.id,
                    map.width,
                    map.height
                );
            }
        }
        Ok(ProblemInstance { map, agents })
    }
}

/// Parses the agents file format from spec.md S6: first integer `N`
/// (1 <= N <= 40), then `N` quadruples `sx sy gx gy`.
pub fn load_agents_file(path: &str) -> Result<Vec<Agent>> {
    let file = File::open(path).with_context(|| format!("opening agents file {path}"))?;
    let reader = BufReader::new(file);
    let mut tokens = reader
        .lines()
        .collect::<std::io::Result<Vec<String>>>()?
        .join(" ")
        .split_whitespace()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .into_iter();

    let n: usize = tokens
        .next()
        .ok_or_else(|| anyhow!("agents file {path}: missing agent count"))?
        .parse()
        .with_context(|| format!("agents file {path}: bad agent count"))?;

    if !(1..=MAX_AGENTS).contains(&n) {
        bail!("agents file {path}: agent count {n} out of range [1, {MAX_AGENTS}]");
    }

    let mut agents = Vec::with_capacity(n);
    for id in 0..n {
        let mut next_usize = || -> Result<usize> {
            tokens
                .next()
                .ok_or_else(|| anyhow!("agents file {path}: truncated record for agent {id}"))?
                .parse::<usize>()
                .with_context(|| format!("agents file {path}: bad coordinate for agent {id}"))
        };
        let sx = next_usize()?;
        let sy = next_usize()?;
        let gx = next_usize()?;
        let gy = next_usize()?;
        agents.push(Agent {
            id,
            start: GridCoord::new(sx, sy),
            goal: GridCoord::new(gx, gy),
        });
    }

    Ok(agents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_agents_file() {
        let mut tmp = std::env::temp_dir();
        tmp.push("problem_agents_test.agents");
        std::fs::write(&tmp, "2\n0 0 2 0\n2 0 0 0\n").unwrap();

        let agents = load_agents_file(tmp.to_str().unwrap()).unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].start, GridCoord::new(0, 0));
        assert_eq!(agents[1].goal, GridCoord::new(0, 0));
    }

    #[test]
    fn rejects_out_of_range_agent_count() {
        let mut tmp = std::env::temp_dir();
        tmp.push("problem_agents_bad_count.agents");
        std::fs::write(&tmp, "0\n").unwrap();
        assert!(load_agents_file(tmp.to_str().unwrap()).is_err());
    }
}
