//! The fuzz campaign runner.
//!
//! EXECUTION MODEL:
//!   - Each bot owns its state and its RNG streams. Nothing is shared but
//!     the read-only GameConfig.
//!   - Within a bot, one step is: pick action → apply → validate → record.
//!   - Bots are spread over scoped worker threads and joined at the end.
//!     Results come back ordered by bot id, whatever the scheduling.
//!   - A bot stops early once it has accumulated `error_threshold` errors.
//!     Other bots are unaffected.

use crate::{
    action::{base_action_name, ActionKind},
    action_library::apply_action,
    config::GameConfig,
    error::{SimError, SimResult},
    rng::{derive_seed, RngBank, RngStream},
    state::{create_initial_state, GameState},
    types::BotId,
    validator::{validate, BugReport, Severity},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// How a bot chooses its next action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    Uniform,
    /// openChest carries as much weight as every other action combined.
    ChestHeavy,
    /// 40% fightBattle, 30% openChest, 30% uniform over everything.
    Battle,
}

impl Policy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::ChestHeavy => "chest_heavy",
            Self::Battle => "battle",
        }
    }

    /// Weighted dispatch table over every action kind.
    pub fn table(&self) -> Vec<(ActionKind, f64)> {
        let n = ActionKind::ALL.len() as f64;
        ActionKind::ALL
            .iter()
            .map(|&kind| {
                let weight = match (self, kind) {
                    (Self::Uniform, _) => 1.0,
                    (Self::ChestHeavy, ActionKind::OpenChest) => n - 1.0,
                    (Self::ChestHeavy, _) => 1.0,
                    (Self::Battle, ActionKind::FightBattle) => 0.4 + 0.3 / n,
                    (Self::Battle, ActionKind::OpenChest) => 0.3 + 0.3 / n,
                    (Self::Battle, _) => 0.3 / n,
                };
                (kind, weight)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct CampaignConfig {
    pub num_bots: u32,
    pub actions_per_bot: u64,
    pub policy: Policy,
    pub verbose: bool,
    /// Master seed; each bot's seed is derived from it by bot id.
    pub seed: u64,
    /// Worker threads. None uses the available parallelism.
    pub workers: Option<usize>,
    pub error_threshold: usize,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            num_bots: 10,
            actions_per_bot: 1000,
            policy: Policy::Uniform,
            verbose: false,
            seed: 42,
            workers: None,
            error_threshold: 10,
        }
    }
}

impl CampaignConfig {
    pub fn bot_seed(&self, bot_id: BotId) -> u64 {
        derive_seed(self.seed, bot_id as u64)
    }
}

/// Everything one bot run produced.
#[derive(Debug, Clone)]
pub struct BotResult {
    pub bot_id: BotId,
    pub seed: u64,
    pub steps: u64,
    pub stopped_early: bool,
    pub bugs: Vec<BugReport>,
    /// Keyed by base action name; battle_won / battle_lost stay separate.
    pub action_counts: BTreeMap<String, u64>,
    pub final_state: GameState,
    pub elapsed: Duration,
}

impl BotResult {
    pub fn count(&self, severity: Severity) -> usize {
        self.bugs.iter().filter(|b| b.severity == severity).count()
    }
}

/// Run `config.num_bots` independent bots and return their results by bot id.
pub fn run_campaign(config: &CampaignConfig, game: &GameConfig) -> SimResult<Vec<BotResult>> {
    if config.num_bots == 0 {
        return Err(SimError::InvalidCampaign("num_bots must be at least 1".into()));
    }
    if config.error_threshold == 0 {
        return Err(SimError::InvalidCampaign("error_threshold must be at least 1".into()));
    }
    let workers = config
        .workers
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
        .clamp(1, config.num_bots as usize);

    log::info!(
        "campaign start: seed={} bots={} actions={} policy={} workers={workers}",
        config.seed,
        config.num_bots,
        config.actions_per_bot,
        config.policy.name()
    );

    let mut results: Vec<BotResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                scope.spawn(move || {
                    (worker as BotId..config.num_bots)
                        .step_by(workers)
                        .map(|bot_id| run_bot(bot_id, config.bot_seed(bot_id), config, game))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        // Join every handle, even after a failure, so the scope never re-panics.
        let mut all = Vec::with_capacity(config.num_bots as usize);
        let mut failed = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(batch) => all.extend(batch),
                Err(_) => failed = failed.or(Some(worker)),
            }
        }
        match failed {
            Some(worker) => Err(SimError::Other(anyhow::anyhow!("fuzz worker {worker} panicked"))),
            None => Ok(all),
        }
    })?;

    results.sort_by_key(|r| r.bot_id);
    log::info!(
        "campaign done: {} bots, {} errors",
        results.len(),
        results.iter().map(|r| r.count(Severity::Error)).sum::<usize>()
    );
    Ok(results)
}

/// Run a single bot from its seed. Replaying a seed replays the run exactly.
pub fn run_bot(bot_id: BotId, seed: u64, config: &CampaignConfig, game: &GameConfig) -> BotResult {
    let started = Instant::now();
    let bank = RngBank::new(seed);
    let mut policy_rng = bank.for_stream(RngStream::Policy);
    let mut economy_rng = bank.for_stream(RngStream::Economy);

    let table = config.policy.table();
    let weights: Vec<f64> = table.iter().map(|(_, w)| *w).collect();

    let mut state = create_initial_state();
    let mut bugs = Vec::new();
    let mut action_counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut errors = 0usize;
    let mut steps = 0u64;
    let mut stopped_early = false;

    log::debug!("bot {bot_id} start: seed={seed}");

    for step in 0..config.actions_per_bot {
        let pick = policy_rng.weighted_index(&weights).unwrap_or(0);
        let kind = table[pick].0;
        let (next, outcome) = apply_action(kind, &state, game, &mut economy_rng);
        state = next;
        steps += 1;

        let name = outcome.to_string();
        if config.verbose {
            let e = state.active_economy();
            log::debug!(
                "bot={bot_id} step={step} {name} coins={:.2} level={} items={} wave={}",
                e.coins,
                e.level,
                e.inventory.len(),
                e.battle_wave
            );
        }

        let found = validate(&state, &name, game);
        errors += found.iter().filter(|b| b.severity == Severity::Error).count();
        bugs.extend(found);
        *action_counts
            .entry(base_action_name(&name).to_string())
            .or_default() += 1;

        if errors >= config.error_threshold {
            log::warn!("bot {bot_id} stopped early at step {step}: {errors} errors");
            stopped_early = true;
            break;
        }
    }

    let elapsed = started.elapsed();
    log::info!(
        "bot {bot_id} done: steps={steps} bugs={} elapsed={}ms",
        bugs.len(),
        elapsed.as_millis()
    );

    BotResult {
        bot_id,
        seed,
        steps,
        stopped_early,
        bugs,
        action_counts,
        final_state: state,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share(policy: Policy, kind: ActionKind) -> f64 {
        let table = policy.table();
        let total: f64 = table.iter().map(|(_, w)| w).sum();
        table.iter().find(|(k, _)| *k == kind).map(|(_, w)| w / total).unwrap()
    }

    #[test]
    fn policy_shares() {
        assert!((share(Policy::ChestHeavy, ActionKind::OpenChest) - 0.5).abs() < 1e-9);
        let n = ActionKind::ALL.len() as f64;
        assert!((share(Policy::Battle, ActionKind::FightBattle) - (0.4 + 0.3 / n)).abs() < 1e-9);
        assert!((share(Policy::Battle, ActionKind::OpenChest) - (0.3 + 0.3 / n)).abs() < 1e-9);
        assert!((share(Policy::Uniform, ActionKind::Prestige) - 1.0 / n).abs() < 1e-9);
    }

    #[test]
    fn bot_seeds_differ() {
        let config = CampaignConfig::default();
        assert_ne!(config.bot_seed(0), config.bot_seed(1));
    }
}
