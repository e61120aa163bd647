//! Static 2D occupancy grid and its file format.

use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{anyhow, bail, Context, Result};

/// An integer grid cell. Out-of-bounds coordinates never appear in a
/// constructed `GridCoord`; bounds are enforced by `GridMap` at the point
/// where coordinates are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: usize,
    pub y: usize,
}

impl GridCoord {
    pub fn new(x: usize, y: usize) -> Self {
        GridCoord { x, y }
    }

    pub fn manhattan(&self, other: &GridCoord) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl From<(usize, usize)> for GridCoord {
    fn from(value: (usize, usize)) -> Self {
        GridCoord::new(value.0, value.1)
    }
}

/// Immutable occupancy grid, `width` x `height`, 0 = free / nonzero = obstacle.
///
/// Bounds checks precede obstacle checks everywhere in this crate: a
/// coordinate outside `[0, width) x [0, height)` is treated as an obstacle
/// without ever indexing `occupied`.
#[derive(Debug, Clone)]
pub struct GridMap {
    pub width: usize,
    pub height: usize,
    occupied: Vec<bool>,
}

impl GridMap {
    pub fn new(width: usize, height: usize, occupied: Vec<bool>) -> Self {
        assert_eq!(occupied.len(), width * height);
        GridMap {
            width,
            height,
            occupied,
        }
    }

    fn index(&self, c: GridCoord) -> usize {
        c.y * self.width + c.x
    }

    pub fn in_bounds(&self, c: GridCoord) -> bool {
        c.x < self.width && c.y < self.height
    }

    /// Out-of-bounds cells are treated as obstacles.
    pub fn is_obstacle(&self, c: GridCoord) -> bool {
        if !self.in_bounds(c) {
            return true;
        }
        self.occupied[self.index(c)]
    }

    /// Five-way branching set used by `ArenaAStar`: wait, +x, -x, +y, -y.
    pub fn neighbors(&self, c: GridCoord) -> impl Iterator<Item = GridCoord> + '_ {
        const DELTAS: [(isize, isize); 5] = [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)];
        DELTAS.iter().filter_map(move |&(dx, dy)| {
            let nx = c.x as isize + dx;
            let ny = c.y as isize + dy;
            if nx < 0 || ny < 0 {
                return None;
            }
            let candidate = GridCoord::new(nx as usize, ny as usize);
            let is_wait = dx == 0 && dy == 0;
            if !self.in_bounds(candidate) {
                return None;
            }
            if !is_wait && self.is_obstacle(candidate) {
                return None;
            }
            Some(candidate)
        })
    }

    /// Parses the map file format from spec.md S6: first line `W H`, then
    /// `W*H` single-character cells (`'0'` free, `'1'` obstacle);
    /// whitespace between cells is ignored.
    pub fn from_file(path: &str) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening map file {path}"))?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header = lines
            .next()
            .ok_or_else(|| anyhow!("map file {path} is empty"))??;
        let mut header_parts = header.split_whitespace();
        let width: usize = header_parts
            .next()
            .ok_or_else(|| anyhow!("map file {path}: missing width"))?
            .parse()
            .with_context(|| format!("map file {path}: bad width"))?;
        let height: usize = header_parts
            .next()
            .ok_or_else(|| anyhow!("map file {path}: missing height"))?
            .parse()
            .with_context(|| format!("map file {path}: bad height"))?;

        let mut occupied = Vec::with_capacity(width * height);
        for line in lines {
            let line = line?;
            for ch in line.chars() {
                if ch.is_whitespace() {
                    continue;
                }
                match ch {
                    '0' => occupied.push(false),
                    '1' => occupied.push(true),
                    other => bail!("map file {path}: invalid cell character {other:?}"),
                }
            }
        }

        if occupied.len() != width * height {
            bail!(
                "map file {path}: expected {} cells, found {}",
                width * height,
                occupied.len()
            );
        }

        Ok(GridMap::new(width, height, occupied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_free_and_obstacle_cells() {
        let mut tmp = std::env::temp_dir();
        tmp.push("grid_map_test_s4.map");
        std::fs::write(&tmp, "5 3\n00000\n00100\n00000\n").unwrap();

        let map = GridMap::from_file(tmp.to_str().unwrap()).unwrap();
        assert_eq!(map.width, 5);
        assert_eq!(map.height, 3);
        assert!(!map.is_obstacle(GridCoord::new(0, 0)));
        assert!(map.is_obstacle(GridCoord::new(2, 1)));
        assert!(map.is_obstacle(GridCoord::new(5, 0)));
    }

    #[test]
    fn neighbors_exclude_obstacles_and_out_of_bounds() {
        let map = GridMap::new(2, 1, vec![false, true]);
        let n: Vec<_> = map.neighbors(GridCoord::new(0, 0)).collect();
        assert!(n.contains(&GridCoord::new(0, 0)));
        assert!(!n.contains(&GridCoord::new(1, 0)));
    }

    #[test]
    fn rejects_malformed_cell_character() {
        let mut tmp = std::env::temp_dir();
        tmp.push("grid_map_test_bad.map");
        std::fs::write(&tmp, "2 1\nx0\n").unwrap();
        assert!(GridMap::from_file(tmp.to_str().unwrap()).is_err());
    }
}
