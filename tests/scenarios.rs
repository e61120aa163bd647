//! End-to-end scenarios over `ProblemInstance::load` + each execution mode,
//! covering spec.md S8's S1/S2/S4 scenarios through the public file-format
//! boundary rather than by constructing `ProblemInstance` values by hand.

use std::io::Write;

use cbs_mapf::config::{Config, Mode};
use cbs_mapf::problem::ProblemInstance;
use cbs_mapf::stats::{RunStatus, Stats};

fn write_fixture(name: &str, map_body: &str, agents_body: &str) -> (String, String) {
    let mut map_path = std::env::temp_dir();
    map_path.push(format!("cbs_scenarios_{name}_{}.map", std::process::id()));
    let mut agents_path = std::env::temp_dir();
    agents_path.push(format!("cbs_scenarios_{name}_{}.agents", std::process::id()));

    std::fs::File::create(&map_path)
        .unwrap()
        .write_all(map_body.as_bytes())
        .unwrap();
    std::fs::File::create(&agents_path)
        .unwrap()
        .write_all(agents_body.as_bytes())
        .unwrap();

    (
        map_path.to_str().unwrap().to_string(),
        agents_path.to_str().unwrap().to_string(),
    )
}

fn base_config(map: String, agents: String) -> Config {
    Config {
        map,
        agents,
        timeout: 0.0,
        csv: std::env::temp_dir()
            .join(format!("cbs_scenarios_results_{}.csv", std::process::id()))
            .to_str()
            .unwrap()
            .to_string(),
        mode: Mode::Serial,
        expanders: 4,
        ll_pool: 1,
        w: 1.0,
        expand_budget: None,
    }
}

/// Two agents swapping ends of a 3-cell line have only one middle cell to
/// share and no side cell to step into, so this is the classic unsolvable
/// swap on a path graph: CBS must report infeasibility, not a cost-6 plan.
#[tokio::test]
async fn s1_head_on_swap_on_a_loaded_corridor_is_infeasible() {
    let (map, agents) = write_fixture("s1", "3 1\n000\n", "2\n0 0 2 0\n2 0 0 0\n");
    let problem = ProblemInstance::load(&map, &agents).unwrap();
    let mut config = base_config(map, agents);
    config.expand_budget = Some(2000);

    let mut stats = Stats::default();
    let result = cbs_mapf::serial::run(&problem, &config, &mut stats).await;

    assert_eq!(result.cost, -1);
    assert!(matches!(result.status, RunStatus::Failure | RunStatus::Timeout));
}

#[tokio::test]
async fn s2_width_one_corridor_is_infeasible_through_the_loader() {
    let (map, agents) = write_fixture("s2", "1 3\n0\n0\n0\n", "2\n0 0 0 2\n0 2 0 0\n");
    let problem = ProblemInstance::load(&map, &agents).unwrap();
    let mut config = base_config(map, agents);
    config.expand_budget = Some(2000);

    let mut stats = Stats::default();
    let result = cbs_mapf::serial::run(&problem, &config, &mut stats).await;

    assert_eq!(result.cost, -1);
    assert!(matches!(result.status, RunStatus::Failure | RunStatus::Timeout));
}

#[tokio::test]
async fn s4_four_agents_rotating_through_a_junction_is_solvable() {
    // A plus-shaped junction: four agents start on the arms and swap to
    // the opposite arm, forced to take turns through the single free
    // center cell.
    let map_body = "3 3\n101\n000\n101\n";
    let agents_body = "4\n1 0 1 2\n1 2 1 0\n0 1 2 1\n2 1 0 1\n";
    let (map, agents) = write_fixture("s4", map_body, agents_body);
    let problem = ProblemInstance::load(&map, &agents).unwrap();
    let mut config = base_config(map, agents);
    config.expand_budget = Some(20_000);

    let mut stats = Stats::default();
    let result = cbs_mapf::serial::run(&problem, &config, &mut stats).await;

    assert_eq!(result.status, RunStatus::Success);
    assert!(result.cost > 0);
}

#[tokio::test]
async fn centralized_mode_agrees_with_serial_on_s1() {
    let (map, agents) = write_fixture("s1-centralized", "3 1\n000\n", "2\n0 0 2 0\n2 0 0 0\n");
    let problem = ProblemInstance::load(&map, &agents).unwrap();
    let mut config = base_config(map, agents);
    config.mode = Mode::Centralized;
    config.expanders = 2;
    config.expand_budget = Some(2000);

    let size = config.expanders + 1;
    let mut links = cbs_mapf::transport::process_group(size);
    let mut coordinator_link = links.remove(0);

    let mut worker_handles = Vec::new();
    for mut link in links {
        let problem = problem.clone();
        worker_handles.push(tokio::spawn(async move {
            let mut stats = Stats::default();
            cbs_mapf::centralized::worker::run(&mut link, &problem, &mut stats).await;
        }));
    }

    let mut stats = Stats::default();
    let mut pool = cbs_mapf::transport::AsyncSendPool::new(cbs_mapf::transport::MAX_PENDING_SENDS);
    let result = cbs_mapf::centralized::coordinator::run(
        &mut coordinator_link,
        &mut pool,
        &problem,
        &config,
        &mut stats,
    )
    .await;

    for handle in worker_handles {
        handle.await.unwrap();
    }

    assert_eq!(result.cost, -1);
    assert!(matches!(result.status, RunStatus::Failure | RunStatus::Timeout));
}
