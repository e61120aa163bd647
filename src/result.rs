//! Append-only CSV result logging, grounded on the teacher's `stat.rs`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::error;

use crate::config::Config;
use crate::stats::RunStats;

const HEADER: &str = "map,agents,width,height,nodes_expanded,nodes_generated,conflicts,cost,runtime_sec,comm_time_sec,compute_time_sec,timeout_sec,status\n";

pub struct ResultWriter;

impl ResultWriter {
    /// Appends one row for this run, writing the header first if the file
    /// did not already exist.
    pub fn append(config: &Config, width: usize, height: usize, stats: &RunStats) -> Result<()> {
        let existed = Path::new(&config.csv).exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.csv)
            .with_context(|| format!("opening result CSV {}", config.csv))?;

        if !existed {
            if let Err(e) = file.write_all(HEADER.as_bytes()) {
                error!("failed to write CSV header to '{}': {e}", config.csv);
                return Err(e.into());
            }
        }

        let row = format!(
            "{},{},{},{},{},{},{},{},{:.6},{:.6},{:.6},{},{}\n",
            config.map,
            config.agents,
            width,
            height,
            stats.nodes_expanded,
            stats.nodes_generated,
            stats.conflicts,
            stats.cost,
            stats.runtime.as_secs_f64(),
            stats.comm_time.as_secs_f64(),
            stats.compute_time.as_secs_f64(),
            config.timeout,
            stats.status.as_str(),
        );

        if let Err(e) = file.write_all(row.as_bytes()) {
            error!("failed to write to '{}': {e}", config.csv);
            return Err(e.into());
        }

        Ok(())
    }
}
