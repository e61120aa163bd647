use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cbs_mapf::centralized;
use cbs_mapf::config::{Cli, Config, Mode};
use cbs_mapf::decentralized;
use cbs_mapf::problem::ProblemInstance;
use cbs_mapf::result::ResultWriter;
use cbs_mapf::serial;
use cbs_mapf::stats::{self, Stats};
use cbs_mapf::transport::{process_group, AsyncSendPool, MAX_PENDING_SENDS};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::new(&cli);
    config.validate().context("invalid configuration")?;

    let problem =
        ProblemInstance::load(&config.map, &config.agents).context("loading problem instance")?;
    info!(
        agents = problem.agents.len(),
        width = problem.map.width,
        height = problem.map.height,
        mode = ?config.mode,
        "loaded problem instance"
    );

    let runtime = tokio::runtime::Runtime::new().context("building async runtime")?;
    let run_stats = runtime.block_on(dispatch(&problem, &config));

    ResultWriter::append(&config, problem.map.width, problem.map.height, &run_stats)
        .context("writing result CSV")?;

    info!(
        status = run_stats.status.as_str(),
        cost = run_stats.cost,
        nodes_expanded = run_stats.nodes_expanded,
        runtime_sec = run_stats.runtime.as_secs_f64(),
        "run complete"
    );

    Ok(())
}

async fn dispatch(problem: &ProblemInstance, config: &Config) -> stats::RunStats {
    match config.mode {
        Mode::Serial => {
            let mut stats = Stats::default();
            serial::run(problem, config, &mut stats).await
        }
        Mode::Centralized => run_centralized(problem, config).await,
        Mode::Decentralized => run_decentralized(problem, config).await,
    }
}

/// Rank 0 is the coordinator; ranks `1..=config.expanders` are workers, each
/// driven on its own `tokio` task over the simulated process group.
async fn run_centralized(problem: &ProblemInstance, config: &Config) -> stats::RunStats {
    let size = config.expanders + 1;
    let mut links = process_group(size);
    let mut coordinator_link = links.remove(0);

    let mut worker_handles = Vec::with_capacity(links.len());
    for mut link in links {
        let problem = problem.clone();
        worker_handles.push(tokio::spawn(async move {
            let mut stats = Stats::default();
            centralized::worker::run(&mut link, &problem, &mut stats).await;
        }));
    }

    let mut stats = Stats::default();
    let mut pool = AsyncSendPool::new(MAX_PENDING_SENDS);
    let result =
        centralized::coordinator::run(&mut coordinator_link, &mut pool, problem, config, &mut stats).await;

    for handle in worker_handles {
        let _ = handle.await;
    }

    result
}

/// All `config.expanders` ranks run the same peer loop; rank 0 runs on this
/// task, the rest each on their own.
async fn run_decentralized(problem: &ProblemInstance, config: &Config) -> stats::RunStats {
    let size = config.expanders;
    let mut links = process_group(size);
    let mut own_link = links.remove(0);

    let mut handles = Vec::with_capacity(links.len());
    for mut link in links {
        let problem = problem.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            let mut stats = Stats::default();
            let mut pool = AsyncSendPool::new(MAX_PENDING_SENDS);
            decentralized::run(&mut link, &mut pool, &problem, &config, &mut stats).await
        }));
    }

    let mut stats = Stats::default();
    let mut pool = AsyncSendPool::new(MAX_PENDING_SENDS);
    let own_result = decentralized::run(&mut own_link, &mut pool, problem, config, &mut stats).await;

    for handle in handles {
        let _ = handle.await;
    }

    own_result
}
