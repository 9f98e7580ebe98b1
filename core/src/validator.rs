//! Invariant validator.
//!
//! Inspects a state after every action and turns each violation into a
//! typed BugReport. Nothing here panics or returns Err: a broken state is
//! data for the report, not a fault.
//!
//! Severity:
//!   error    a real invariant breach
//!   warning  a transient inconsistency expected to self-correct
//!   anomaly  a scale concern (unbounded growth), not a correctness failure

use crate::{
    config::GameConfig,
    state::{Area, Economy, GameState},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Largest integer a double holds exactly.
pub const MAX_SAFE_COINS: f64 = 9_007_199_254_740_991.0;
pub const INVENTORY_ANOMALY_SIZE: usize = 10_000;
pub const HISTORY_ANOMALY_SIZE: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Anomaly,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Anomaly => "anomaly",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugCategory {
    Nan,
    Negative,
    Overflow,
    InvalidItem,
    DuplicateId,
    InvalidEgg,
    InvalidPet,
    LuckBounds,
    RarityWeights,
    LevelProgression,
    FeatureState,
    OrphanedSlot,
    PetReference,
    InventorySize,
    HistorySize,
}

impl BugCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nan => "nan",
            Self::Negative => "negative",
            Self::Overflow => "overflow",
            Self::InvalidItem => "invalid_item",
            Self::DuplicateId => "duplicate_id",
            Self::InvalidEgg => "invalid_egg",
            Self::InvalidPet => "invalid_pet",
            Self::LuckBounds => "luck_bounds",
            Self::RarityWeights => "rarity_weights",
            Self::LevelProgression => "level_progression",
            Self::FeatureState => "feature_state",
            Self::OrphanedSlot => "orphaned_slot",
            Self::PetReference => "pet_reference",
            Self::InventorySize => "inventory_size",
            Self::HistorySize => "history_size",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugReport {
    pub severity: Severity,
    pub category: BugCategory,
    pub message: String,
    /// The action name that produced the inspected state.
    pub action: String,
    pub area: Area,
}

impl BugReport {
    /// Histogram key, `severity:category`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.severity, self.category.name())
    }
}

/// Run every check against both areas of `state`.
pub fn validate(state: &GameState, action: &str, config: &GameConfig) -> Vec<BugReport> {
    let mut bugs = Vec::new();
    for area in [Area::Home, Area::Galaxy] {
        let mut checker = Checker { bugs: &mut bugs, action, area };
        checker.check_economy(state.economy(area), config);
    }
    bugs
}

struct Checker<'a> {
    bugs: &'a mut Vec<BugReport>,
    action: &'a str,
    area: Area,
}

impl Checker<'_> {
    fn report(&mut self, severity: Severity, category: BugCategory, message: String) {
        self.bugs.push(BugReport {
            severity,
            category,
            message,
            action: self.action.to_string(),
            area: self.area,
        });
    }

    fn error(&mut self, category: BugCategory, message: String) {
        self.report(Severity::Error, category, message);
    }

    fn check_economy(&mut self, e: &Economy, config: &GameConfig) {
        self.check_numbers(e);
        self.check_inventory(e);
        self.check_eggs(e);
        self.check_pets(e, config);
        self.check_upgrades(e, config);
        self.check_features(e);
        self.check_battle_slots(e);
        self.check_sizes(e);
    }

    /// A non-finite value is reported as NaN and skips the sign check.
    fn check_amount(&mut self, name: &str, value: f64) {
        if !value.is_finite() {
            self.error(BugCategory::Nan, format!("{name} is not finite: {value}"));
        } else if value < 0.0 {
            self.error(BugCategory::Negative, format!("{name} is negative: {value}"));
        }
    }

    fn check_numbers(&mut self, e: &Economy) {
        self.check_amount("coins", e.coins);
        self.check_amount("xp", e.xp);
        self.check_amount("stats.total_coins_earned", e.stats.total_coins_earned);
        if e.coins.is_finite() && e.coins > MAX_SAFE_COINS {
            self.error(BugCategory::Overflow, format!("coins exceed safe range: {}", e.coins));
        }
        if e.level < 1 {
            self.error(BugCategory::Negative, format!("level below 1: {}", e.level));
        }
        if e.battle_wave < 1 {
            self.error(BugCategory::Negative, format!("battle wave below 1: {}", e.battle_wave));
        }
    }

    fn check_inventory(&mut self, e: &Economy) {
        let mut seen = HashSet::new();
        for item in &e.inventory {
            if item.id.is_empty() {
                self.error(
                    BugCategory::InvalidItem,
                    format!("item '{}' has an empty id", item.name),
                );
            } else if !seen.insert(item.id.as_str()) {
                self.error(BugCategory::DuplicateId, format!("duplicate item id {}", item.id));
            }
            if item.stats.kind() != item.category.stat_kind() {
                self.error(
                    BugCategory::InvalidItem,
                    format!(
                        "item {} has {:?} stats for category {:?}",
                        item.id,
                        item.stats.kind(),
                        item.category
                    ),
                );
            }
            for (stat, value) in item.stats.values() {
                self.check_amount(&format!("item {} {stat}", item.id), value);
            }
        }
    }

    fn check_eggs(&mut self, e: &Economy) {
        let mut seen = HashSet::new();
        for egg in &e.eggs {
            if egg.id.is_empty() {
                self.error(BugCategory::InvalidEgg, format!("{} egg has an empty id", egg.rarity));
            } else if !seen.insert(egg.id.as_str()) {
                self.error(BugCategory::InvalidEgg, format!("duplicate egg id {}", egg.id));
            }
        }
    }

    fn check_pets(&mut self, e: &Economy, config: &GameConfig) {
        for pet in &e.pets {
            if pet.count == 0 {
                self.error(BugCategory::InvalidPet, format!("pet {} has count 0", pet.id));
            }
            if !pet.bonus.is_finite() || pet.bonus < 0.0 {
                self.error(
                    BugCategory::InvalidPet,
                    format!("pet {} has bonus {}", pet.id, pet.bonus),
                );
            }
        }
        let max = config.balance.max_equipped_pets;
        if e.equipped_pets.len() > max {
            self.error(
                BugCategory::PetReference,
                format!("{} pets equipped, limit is {max}", e.equipped_pets.len()),
            );
        }
        let mut seen = HashSet::new();
        for id in &e.equipped_pets {
            if !seen.insert(id.as_str()) {
                self.error(BugCategory::PetReference, format!("pet {id} equipped twice"));
            }
            if !e.pets.iter().any(|p| &p.id == id) {
                self.error(BugCategory::PetReference, format!("equipped pet {id} does not exist"));
            }
        }
    }

    fn check_upgrades(&mut self, e: &Economy, config: &GameConfig) {
        let b = &config.balance;
        for (slot, level) in e.luck.levels.iter().enumerate() {
            if *level > b.luck_max_level {
                self.error(
                    BugCategory::LuckBounds,
                    format!("luck upgrade {} at level {level}, max {}", slot + 1, b.luck_max_level),
                );
            }
        }
        let weights = e.chest_weights(b);
        let total = weights.total();
        if !total.is_finite() || total <= 0.0 || weights.0.iter().any(|w| *w < 0.0) {
            self.error(
                BugCategory::RarityWeights,
                format!("chest weights degenerate: {:?}", weights.0),
            );
        }
        if e.xp.is_finite() && e.xp >= b.xp_to_next(e.level) {
            self.error(
                BugCategory::LevelProgression,
                format!("xp {} reaches next level at level {} without leveling", e.xp, e.level),
            );
        }
    }

    fn check_features(&mut self, e: &Economy) {
        if !e.has_auto_sell && !e.auto_sell_rarities.is_empty() {
            self.error(
                BugCategory::FeatureState,
                format!(
                    "{} auto-sell rarities selected without auto-sell",
                    e.auto_sell_rarities.len()
                ),
            );
        }
    }

    fn check_battle_slots(&mut self, e: &Economy) {
        for (index, slot) in e.battle_slots.iter().enumerate() {
            if let Some(id) = slot {
                if e.item(id).is_none() {
                    self.report(
                        Severity::Warning,
                        BugCategory::OrphanedSlot,
                        format!("battle slot {index} points at missing item {id}"),
                    );
                }
            }
        }
    }

    fn check_sizes(&mut self, e: &Economy) {
        if e.inventory.len() > INVENTORY_ANOMALY_SIZE {
            self.report(
                Severity::Anomaly,
                BugCategory::InventorySize,
                format!("inventory holds {} items", e.inventory.len()),
            );
        }
        if e.drops_history.len() > HISTORY_ANOMALY_SIZE {
            self.report(
                Severity::Anomaly,
                BugCategory::HistorySize,
                format!("drop history holds {} entries", e.drops_history.len()),
            );
        }
    }
}
