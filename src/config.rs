use anyhow::anyhow;
use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Serial,
    Centralized,
    Decentralized,
}

#[derive(Parser, Debug)]
#[command(
    name = "Rust CBS-MAPF",
    about = "Distributed Conflict-Based MAPF solver implemented in Rust.",
    version = "1.0"
)]
pub struct Cli {
    #[arg(long, help = "Path to the map file")]
    pub map: String,

    #[arg(long, help = "Path to the agents file")]
    pub agents: String,

    #[arg(long, help = "Timeout in seconds, 0 disables", default_value_t = 60.0)]
    pub timeout: f64,

    #[arg(long, help = "Path to the result CSV file", default_value = "results.csv")]
    pub csv: String,

    #[arg(long, value_enum, help = "Execution mode", default_value_t = Mode::Serial)]
    pub mode: Mode,

    #[arg(
        long,
        help = "Number of worker ranks (centralized mode) or total ranks (decentralized mode)",
        default_value_t = 4
    )]
    pub expanders: usize,

    #[arg(
        long,
        help = "Low-level A* subgroup size per task; 1 disables subgroup dispatch",
        default_value_t = 1
    )]
    pub ll_pool: usize,

    #[arg(
        long,
        help = "Bounded-suboptimality factor for the decentralized lower bound",
        default_value_t = 1.0
    )]
    pub w: f64,

    #[arg(long, help = "Cap on high-level nodes expanded before giving up (serial mode)")]
    pub expand_budget: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub map: String,
    pub agents: String,
    pub timeout: f64,
    pub csv: String,
    pub mode: Mode,
    pub expanders: usize,
    pub ll_pool: usize,
    pub w: f64,
    pub expand_budget: Option<usize>,
}

impl Config {
    pub fn new(cli: &Cli) -> Self {
        Config {
            map: cli.map.clone(),
            agents: cli.agents.clone(),
            timeout: cli.timeout,
            csv: cli.csv.clone(),
            mode: cli.mode,
            expanders: cli.expanders,
            ll_pool: cli.ll_pool,
            w: cli.w,
            expand_budget: cli.expand_budget,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout < 0.0 {
            return Err(anyhow!("timeout must be >= 0, got {}", self.timeout));
        }

        if self.w < 1.0 {
            return Err(anyhow!("--w must be >= 1.0, got {}", self.w));
        }

        match self.mode {
            Mode::Centralized if self.expanders == 0 => {
                return Err(anyhow!("centralized mode requires at least one worker rank"));
            }
            Mode::Decentralized if self.expanders < 2 => {
                return Err(anyhow!(
                    "decentralized mode requires at least two ranks, got {}",
                    self.expanders
                ));
            }
            _ => {}
        }

        if self.ll_pool == 0 {
            return Err(anyhow!("--ll-pool must be >= 1, got {}", self.ll_pool));
        }

        Ok(())
    }
}
