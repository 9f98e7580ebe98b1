//! fuzz-runner: headless invariant fuzzer for the loot economy.
//!
//! Usage:
//!   fuzz-runner 10 1000
//!   fuzz-runner 50 5000 --battle-mode --seed 12345 --db campaign.db
//!   fuzz-runner 4 200 -v --data-dir ./data --json

use anyhow::{Context, Result};
use chrono::Utc;
use lootsim_core::{
    config::GameConfig,
    fuzz::{run_campaign, CampaignConfig, Policy},
    report::{render_report, CampaignSummary},
    store::CampaignStore,
};
use std::env;
use std::time::Instant;

/// Flags that consume the following argument.
const VALUE_FLAGS: [&str; 5] = ["--seed", "--workers", "--data-dir", "--db", "--error-threshold"];

#[derive(serde::Serialize)]
struct JsonOutput<'a> {
    master_seed: u64,
    policy: &'a str,
    wall_time_ms: u128,
    summary: CampaignSummary,
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "info" }),
    )
    .init();

    let positional = positional_args(&args);
    let num_bots = positional
        .first()
        .map(|s| s.parse::<u32>())
        .transpose()
        .context("numBots must be a positive integer")?
        .unwrap_or(10);
    let actions_per_bot = positional
        .get(1)
        .map(|s| s.parse::<u64>())
        .transpose()
        .context("actionsPerBot must be a non-negative integer")?
        .unwrap_or(1000);

    let policy = if args.iter().any(|a| a == "--battle-mode") {
        Policy::Battle
    } else if args.iter().any(|a| a == "--chest-heavy") {
        Policy::ChestHeavy
    } else {
        Policy::Uniform
    };
    let seed = parse_arg(&args, "--seed", clock_seed());
    let error_threshold = parse_arg(&args, "--error-threshold", 10usize);
    let workers = args
        .windows(2)
        .find(|w| w[0] == "--workers")
        .and_then(|w| w[1].parse().ok());
    let data_dir = flag_value(&args, "--data-dir");
    let db = flag_value(&args, "--db");
    let json = args.iter().any(|a| a == "--json");

    let game = match data_dir {
        Some(dir) => GameConfig::load(dir)?,
        None => GameConfig::default(),
    };
    let campaign = CampaignConfig {
        num_bots,
        actions_per_bot,
        policy,
        verbose,
        seed,
        workers,
        error_threshold,
    };

    if !json {
        println!("Loot economy fuzzer");
        println!("  bots:      {num_bots}");
        println!("  actions:   {actions_per_bot}");
        println!("  policy:    {}", policy.name());
        println!("  seed:      {seed}");
        println!("  data_dir:  {}", data_dir.unwrap_or("(built-in)"));
        println!();
    }

    let started_at = Utc::now();
    let started = Instant::now();
    let results = run_campaign(&campaign, &game)?;
    let wall_time = started.elapsed();

    if let Some(path) = db {
        let mut store = CampaignStore::open(path)?;
        store.migrate()?;
        let campaign_id = format!("campaign-{seed}-{}", started_at.timestamp());
        store.insert_campaign(
            &campaign_id,
            seed,
            policy.name(),
            num_bots,
            actions_per_bot,
            started_at,
        )?;
        for bot in &results {
            store.record_bot(&campaign_id, bot)?;
        }
        let tally = store.bug_counts(&campaign_id)?;
        log::info!("stored {campaign_id} in {path}: {} bugs", tally.total());
    }

    if json {
        let output = JsonOutput {
            master_seed: seed,
            policy: policy.name(),
            wall_time_ms: wall_time.as_millis(),
            summary: CampaignSummary::from_results(&results),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render_report(&results));
        println!();
        println!("  wall time: {} ms", wall_time.as_millis());
        println!("  replay:    --seed {seed}");
    }

    Ok(())
}

/// Arguments that are neither flags nor flag values, in order.
fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
        } else if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
        } else if !arg.starts_with('-') {
            out.push(arg.as_str());
        }
    }
    out
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn clock_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
