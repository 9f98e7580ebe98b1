//! Fuzz campaign: determinism, scheduling independence, early stop.
//!
//! Same master seed, same campaign. Any divergence means some randomness
//! escaped the seeded streams.

use lootsim_core::{
    config::GameConfig,
    error::SimError,
    fuzz::{run_bot, run_campaign, BotResult, CampaignConfig, Policy},
    report::render_report,
    validator::{BugCategory, Severity},
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn campaign(seed: u64, policy: Policy) -> CampaignConfig {
    CampaignConfig {
        num_bots: 6,
        actions_per_bot: 400,
        policy,
        seed,
        workers: Some(3),
        ..CampaignConfig::default()
    }
}

/// Everything except wall-clock timing.
fn fingerprint(results: &[BotResult]) -> Vec<String> {
    results
        .iter()
        .map(|r| {
            format!(
                "{}|{}|{}|{}|{:?}|{}",
                r.bot_id,
                r.seed,
                r.steps,
                r.stopped_early,
                r.action_counts,
                serde_json::to_string(&r.final_state).unwrap()
            )
        })
        .collect()
}

#[test]
fn same_seed_produces_identical_campaigns() {
    init_logging();
    let game = GameConfig::default();
    for policy in [Policy::Uniform, Policy::ChestHeavy, Policy::Battle] {
        let a = run_campaign(&campaign(0xDEAD_BEEF, policy), &game).unwrap();
        let b = run_campaign(&campaign(0xDEAD_BEEF, policy), &game).unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b), "policy {} diverged", policy.name());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.bugs, y.bugs);
        }
    }
}

#[test]
fn different_seeds_diverge() {
    let game = GameConfig::default();
    let a = run_campaign(&campaign(1, Policy::Uniform), &game).unwrap();
    let b = run_campaign(&campaign(2, Policy::Uniform), &game).unwrap();
    assert_ne!(fingerprint(&a), fingerprint(&b));
}

#[test]
fn worker_count_does_not_change_results() {
    let game = GameConfig::default();
    let single = CampaignConfig { workers: Some(1), ..campaign(77, Policy::Battle) };
    let many = CampaignConfig { workers: Some(6), ..campaign(77, Policy::Battle) };

    let a = run_campaign(&single, &game).unwrap();
    let b = run_campaign(&many, &game).unwrap();
    assert_eq!(fingerprint(&a), fingerprint(&b));
    assert_eq!(a.iter().map(|r| r.bot_id).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn a_single_bot_replays_from_its_seed() {
    let game = GameConfig::default();
    let config = campaign(123, Policy::ChestHeavy);
    let results = run_campaign(&config, &game).unwrap();

    let replay = run_bot(3, config.bot_seed(3), &config, &game);
    assert_eq!(fingerprint(&results[3..4]), fingerprint(&[replay]));
}

#[test]
fn every_step_is_counted() {
    let game = GameConfig::default();
    let results = run_campaign(&campaign(5, Policy::Uniform), &game).unwrap();
    for r in &results {
        assert!(!r.stopped_early);
        assert_eq!(r.steps, 400);
        assert_eq!(r.action_counts.values().sum::<u64>(), 400);
        assert!(
            r.action_counts.keys().all(|k| !k.contains("_skipped_")),
            "skip suffixes are folded into the base name"
        );
    }
}

#[test]
fn chest_heavy_policy_mostly_opens_chests() {
    let game = GameConfig::default();
    let results = run_campaign(&campaign(9, Policy::ChestHeavy), &game).unwrap();
    let total: u64 = results.iter().map(|r| r.steps).sum();
    let chests: u64 = results
        .iter()
        .map(|r| r.action_counts.get("openChest").copied().unwrap_or(0))
        .sum();
    let share = chests as f64 / total as f64;
    assert!((0.45..0.55).contains(&share), "openChest share {share:.3}");
}

#[test]
fn bot_stops_early_at_the_error_threshold() {
    init_logging();
    let mut game = GameConfig::default();
    // Degenerate weights are an error in both areas on every step.
    game.balance.rarity_weights.0 = [0.0; 5];
    let config = CampaignConfig {
        num_bots: 2,
        actions_per_bot: 1_000,
        workers: Some(2),
        ..CampaignConfig::default()
    };

    let results = run_campaign(&config, &game).unwrap();
    for r in &results {
        assert!(r.stopped_early);
        assert_eq!(r.steps, 5);
        assert_eq!(r.count(Severity::Error), 10);
        assert!(r.bugs.iter().all(|b| b.category == BugCategory::RarityWeights));
    }

    let report = render_report(&results);
    assert!(report.contains("error:rarity_weights"), "{report}");
    assert!(report.contains("BUGS FOUND: 20 errors"), "{report}");
}

#[test]
fn empty_campaign_is_rejected() {
    let config = CampaignConfig { num_bots: 0, ..CampaignConfig::default() };
    let err = run_campaign(&config, &GameConfig::default()).unwrap_err();
    assert!(matches!(err, SimError::InvalidCampaign(_)), "got {err:?}");
}

#[test]
fn clean_campaign_reports_no_bugs() {
    let game = GameConfig::default();
    let results = run_campaign(&campaign(2024, Policy::Battle), &game).unwrap();
    let report = render_report(&results);
    assert!(report.contains("NO BUGS FOUND"), "{report}");
}
