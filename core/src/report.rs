//! Campaign aggregation and the text report.

use crate::{
    fuzz::BotResult,
    state::{Area, Economy},
    validator::{BugReport, Severity},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Serialize)]
pub struct BugBucket {
    pub count: usize,
    pub example: BugReport,
}

/// Home-area final state averaged over bots.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FinalAverages {
    pub level: f64,
    pub coins: f64,
    pub inventory_size: f64,
    pub chests_opened: f64,
    pub rebirths: f64,
    pub prestiges: f64,
    pub pets: f64,
    pub battle_wave: f64,
    pub battle_streak: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub bots: usize,
    pub bots_stopped_early: usize,
    pub total_actions: u64,
    pub total_bugs: usize,
    pub errors: usize,
    pub warnings: usize,
    pub anomalies: usize,
    pub bot_time_ms: u128,
    /// Keyed by `severity:category`.
    pub bug_histogram: BTreeMap<String, BugBucket>,
    pub action_counts: BTreeMap<String, u64>,
    pub final_averages: FinalAverages,
    pub galaxy_unlocked: usize,
}

impl CampaignSummary {
    pub fn from_results(results: &[BotResult]) -> Self {
        let bots = results.len();
        let mut bug_histogram: BTreeMap<String, BugBucket> = BTreeMap::new();
        let mut action_counts: BTreeMap<String, u64> = BTreeMap::new();

        for bot in results {
            for bug in &bot.bugs {
                bug_histogram
                    .entry(bug.key())
                    .and_modify(|b| b.count += 1)
                    .or_insert_with(|| BugBucket { count: 1, example: bug.clone() });
            }
            for (name, count) in &bot.action_counts {
                *action_counts.entry(name.clone()).or_default() += count;
            }
        }

        let severity_total = |s: Severity| results.iter().map(|r| r.count(s)).sum::<usize>();
        let avg = |f: &dyn Fn(&BotResult) -> f64| {
            if bots == 0 {
                0.0
            } else {
                results.iter().map(f).sum::<f64>() / bots as f64
            }
        };
        fn home(r: &BotResult) -> &Economy {
            r.final_state.economy(Area::Home)
        }
        let final_averages = FinalAverages {
            level: avg(&|r| home(r).level as f64),
            coins: avg(&|r| home(r).coins),
            inventory_size: avg(&|r| home(r).inventory.len() as f64),
            chests_opened: avg(&|r| home(r).stats.total_chests_opened as f64),
            rebirths: avg(&|r| home(r).rebirth_count as f64),
            prestiges: avg(&|r| home(r).prestige_count as f64),
            pets: avg(&|r| home(r).pets.len() as f64),
            battle_wave: avg(&|r| home(r).battle_wave as f64),
            battle_streak: avg(&|r| home(r).battle_streak as f64),
        };

        Self {
            bots,
            bots_stopped_early: results.iter().filter(|r| r.stopped_early).count(),
            total_actions: results.iter().map(|r| r.steps).sum(),
            total_bugs: results.iter().map(|r| r.bugs.len()).sum(),
            errors: severity_total(Severity::Error),
            warnings: severity_total(Severity::Warning),
            anomalies: severity_total(Severity::Anomaly),
            bot_time_ms: results.iter().map(|r| r.elapsed.as_millis()).sum(),
            bug_histogram,
            action_counts,
            final_averages,
            galaxy_unlocked: results.iter().filter(|r| r.final_state.galaxy_unlocked).count(),
        }
    }

    /// "NO BUGS FOUND" or a severity breakdown.
    pub fn verdict(&self) -> String {
        if self.total_bugs == 0 {
            "NO BUGS FOUND".to_string()
        } else {
            format!(
                "BUGS FOUND: {} errors, {} warnings, {} anomalies",
                self.errors, self.warnings, self.anomalies
            )
        }
    }
}

/// Render the campaign as a text report.
pub fn render_report(results: &[BotResult]) -> String {
    let summary = CampaignSummary::from_results(results);
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "=== FUZZ CAMPAIGN ===");
    let _ = writeln!(out, "  bots:           {}", summary.bots);
    let _ = writeln!(out, "  stopped early:  {}", summary.bots_stopped_early);
    let _ = writeln!(out, "  total actions:  {}", summary.total_actions);
    let _ = writeln!(out, "  total bugs:     {}", summary.total_bugs);
    let _ = writeln!(out, "  bot time:       {} ms", summary.bot_time_ms);
    let _ = writeln!(out);

    let _ = writeln!(out, "=== BUGS BY TYPE ===");
    if summary.bug_histogram.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (key, bucket) in &summary.bug_histogram {
        let _ = writeln!(out, "  {key:<28} {:>8}", bucket.count);
        let _ = writeln!(
            out,
            "      e.g. [{}] {} (after {})",
            bucket.example.area.name(),
            bucket.example.message,
            bucket.example.action
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "=== ACTION FREQUENCY ===");
    let mut actions: Vec<_> = summary.action_counts.iter().collect();
    actions.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
    for (name, count) in actions {
        let pct = if summary.total_actions == 0 {
            0.0
        } else {
            *count as f64 / summary.total_actions as f64 * 100.0
        };
        let _ = writeln!(out, "  {name:<24} {count:>8}  {pct:>5.1}%");
    }
    let _ = writeln!(out);

    let f = &summary.final_averages;
    let _ = writeln!(out, "=== AVERAGE FINAL STATE (home area) ===");
    let _ = writeln!(out, "  level:          {:.1}", f.level);
    let _ = writeln!(out, "  coins:          {:.2}", f.coins);
    let _ = writeln!(out, "  inventory:      {:.1}", f.inventory_size);
    let _ = writeln!(out, "  chests opened:  {:.1}", f.chests_opened);
    let _ = writeln!(out, "  rebirths:       {:.2}", f.rebirths);
    let _ = writeln!(out, "  prestiges:      {:.2}", f.prestiges);
    let _ = writeln!(out, "  pets:           {:.2}", f.pets);
    let _ = writeln!(out, "  battle wave:    {:.1}", f.battle_wave);
    let _ = writeln!(out, "  battle streak:  {:.1}", f.battle_streak);
    let _ = writeln!(out, "  galaxy unlocked: {}/{}", summary.galaxy_unlocked, summary.bots);
    let _ = writeln!(out);

    let _ = writeln!(out, "=== VERDICT ===");
    let _ = writeln!(out, "{}", summary.verdict());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{state::create_initial_state, validator::BugCategory};
    use std::time::Duration;

    fn bot(bot_id: u32, bugs: Vec<BugReport>) -> BotResult {
        let mut action_counts = BTreeMap::new();
        action_counts.insert("openChest".to_string(), 3);
        action_counts.insert("rebirth".to_string(), 1);
        BotResult {
            bot_id,
            seed: bot_id as u64,
            steps: 4,
            stopped_early: false,
            bugs,
            action_counts,
            final_state: create_initial_state(),
            elapsed: Duration::from_millis(5),
        }
    }

    fn bug(severity: Severity, category: BugCategory) -> BugReport {
        BugReport {
            severity,
            category,
            message: "coins is negative: -1".into(),
            action: "sellItem".into(),
            area: Area::Home,
        }
    }

    #[test]
    fn clean_campaign_reports_no_bugs() {
        let report = render_report(&[bot(0, vec![]), bot(1, vec![])]);
        assert!(report.contains("NO BUGS FOUND"), "{report}");
        assert!(report.contains("openChest"));

        let summary = CampaignSummary::from_results(&[bot(0, vec![]), bot(1, vec![])]);
        assert_eq!(summary.total_actions, 8);
        assert_eq!(summary.action_counts["openChest"], 6);
        assert_eq!(summary.final_averages.level, 1.0);
        assert_eq!(summary.bot_time_ms, 10);
    }

    #[test]
    fn bugs_are_grouped_by_severity_and_category() {
        let results = [
            bot(0, vec![bug(Severity::Error, BugCategory::Negative)]),
            bot(1, vec![
                bug(Severity::Error, BugCategory::Negative),
                bug(Severity::Warning, BugCategory::OrphanedSlot),
            ]),
        ];
        let summary = CampaignSummary::from_results(&results);
        assert_eq!(summary.bug_histogram["error:negative"].count, 2);
        assert_eq!(summary.bug_histogram["warning:orphaned_slot"].count, 1);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.verdict(), "BUGS FOUND: 2 errors, 1 warnings, 0 anomalies");

        let report = render_report(&results);
        assert!(report.contains("error:negative"));
        assert!(report.contains("(after sellItem)"));
    }

    #[test]
    fn final_averages_read_the_home_economy() {
        let mut rich = bot(0, vec![]);
        let [home, galaxy] = &mut rich.final_state.areas;
        home.coins = 30.0;
        home.level = 5;
        galaxy.coins = 1_000.0;
        let summary = CampaignSummary::from_results(&[rich, bot(1, vec![])]);
        assert_eq!(summary.final_averages.coins, 15.0);
        assert_eq!(summary.final_averages.level, 3.0);
    }

    #[test]
    fn empty_campaign_does_not_divide_by_zero() {
        let summary = CampaignSummary::from_results(&[]);
        assert_eq!(summary.final_averages.coins, 0.0);
        assert!(render_report(&[]).contains("NO BUGS FOUND"));
    }
}
