//! Static game configuration: balance constants and the loot catalog.
//!
//! Loaded once per campaign and shared read-only by every bot.
//! `GameConfig::default()` is the built-in balance; `load()` reads the same
//! shape from JSON so balance passes don't need a rebuild.

use crate::{
    error::{SimError, SimResult},
    loot::{
        Category, ItemTemplate, LootTable, LootTableEntry, Rarity, RarityWeights, StatRange,
        StatRanges,
    },
};
use serde::{Deserialize, Serialize};

/// `round(base * growth^level, 2)` cost curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostCurve {
    pub base: f64,
    pub growth: f64,
}

impl CostCurve {
    pub fn cost_at(&self, level: u32) -> f64 {
        crate::loot::round_to(self.base * self.growth.powi(level as i32), 2)
    }
}

/// Weight moved from Common to `to` for every level of a luck upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightShift {
    pub to: Rarity,
    pub per_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuckUpgradeConfig {
    pub cost: CostCurve,
    pub shifts: Vec<WeightShift>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxConfig {
    pub cost: f64,
    /// Applied to Rare, Epic and Legendary weights while the box is held.
    pub high_tier_multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResetConfig {
    pub rebirth_base_requirement: f64,
    pub rebirth_requirement_growth: f64,
    pub rebirth_bonus: f64,
    pub prestige_tokens_per_rank: u32,
    pub prestige_bonus: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnemyCurve {
    pub base: f64,
    pub per_wave: f64,
    pub variance_ratio: f64,
    pub slot_bonus: f64,
    pub floor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Wave 1 is tuned separately so fresh players can win.
    pub first_wave: EnemyCurve,
    pub later_waves: EnemyCurve,
    pub slots_to_win: usize,
    pub base_coins: f64,
    pub early_wave_bonus: f64,
    pub streak_step: f64,
    pub streak_cap: f64,
    pub drop_chance_base: f64,
    pub drop_chance_per_wave: f64,
    pub drop_chance_cap: f64,
    pub epic_drop_wave: u32,
    pub epic_drop_chance: f64,
    pub legendary_drop_wave: u32,
    pub legendary_drop_chance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub rarity_weights: RarityWeights,
    pub chest_base_coins: f64,
    pub chest_xp: [f64; 5],
    pub xp_curve: CostCurve,
    pub level_up_coin_bonus: f64,
    pub coin_generator: CostCurve,
    pub generator_income_per_level: f64,
    pub luck: [LuckUpgradeConfig; 3],
    pub luck_max_level: u32,
    pub common_weight_floor: f64,
    /// Bronze, silver, gold.
    pub boxes: [BoxConfig; 3],
    pub auto_open_cost: f64,
    pub auto_sell_cost: f64,
    pub pets_cost: f64,
    pub egg_upgrade_costs: [f64; 5],
    pub egg_chance: f64,
    pub pet_bonus_base: [f64; 5],
    pub max_equipped_pets: usize,
    pub resets: ResetConfig,
    pub battle: BattleConfig,
    pub drops_history_cap: usize,
    pub galaxy_unlock_level: u32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        let luck_curve = |base| CostCurve { base, growth: 1.07 };
        Self {
            rarity_weights: RarityWeights::default(),
            chest_base_coins: 1.0,
            chest_xp: [1.0, 2.0, 4.0, 8.0, 20.0],
            xp_curve: CostCurve { base: 10.0, growth: 1.15 },
            level_up_coin_bonus: 5.0,
            coin_generator: CostCurve { base: 3.0, growth: 1.05 },
            generator_income_per_level: 0.5,
            luck: [
                LuckUpgradeConfig {
                    cost: luck_curve(15.0),
                    shifts: vec![WeightShift { to: Rarity::Uncommon, per_level: 3.0 }],
                },
                LuckUpgradeConfig {
                    cost: luck_curve(40.0),
                    shifts: vec![WeightShift { to: Rarity::Rare, per_level: 2.0 }],
                },
                LuckUpgradeConfig {
                    cost: luck_curve(100.0),
                    shifts: vec![
                        WeightShift { to: Rarity::Epic, per_level: 0.5 },
                        WeightShift { to: Rarity::Legendary, per_level: 0.25 },
                    ],
                },
            ],
            luck_max_level: 4,
            common_weight_floor: 10.0,
            boxes: [
                BoxConfig { cost: 50.0, high_tier_multiplier: 1.25 },
                BoxConfig { cost: 150.0, high_tier_multiplier: 1.5 },
                BoxConfig { cost: 400.0, high_tier_multiplier: 2.0 },
            ],
            auto_open_cost: 100.0,
            auto_sell_cost: 75.0,
            pets_cost: 250.0,
            egg_upgrade_costs: [20.0, 50.0, 100.0, 250.0, 500.0],
            egg_chance: 0.10,
            pet_bonus_base: [0.02, 0.04, 0.07, 0.12, 0.20],
            max_equipped_pets: 6,
            resets: ResetConfig {
                rebirth_base_requirement: 200.0,
                rebirth_requirement_growth: 1.25,
                rebirth_bonus: 0.1,
                prestige_tokens_per_rank: 5,
                prestige_bonus: 1.0,
            },
            battle: BattleConfig {
                first_wave: EnemyCurve {
                    base: 25.0,
                    per_wave: 0.0,
                    variance_ratio: 0.4,
                    slot_bonus: 3.0,
                    floor: 15.0,
                },
                later_waves: EnemyCurve {
                    base: 50.0,
                    per_wave: 20.0,
                    variance_ratio: 0.6,
                    slot_bonus: 8.0,
                    floor: 30.0,
                },
                slots_to_win: 3,
                base_coins: 5.0,
                early_wave_bonus: 3.0,
                streak_step: 0.10,
                streak_cap: 1.0,
                drop_chance_base: 0.20,
                drop_chance_per_wave: 0.02,
                drop_chance_cap: 0.50,
                epic_drop_wave: 5,
                epic_drop_chance: 0.30,
                legendary_drop_wave: 10,
                legendary_drop_chance: 0.10,
            },
            drops_history_cap: 1000,
            galaxy_unlock_level: 10,
        }
    }
}

impl BalanceConfig {
    /// XP needed to go from `level` to `level + 1`.
    pub fn xp_to_next(&self, level: u32) -> f64 {
        (self.xp_curve.base * self.xp_curve.growth.powi(level.saturating_sub(1) as i32)).floor()
    }

    pub fn generator_cost(&self, level: u32) -> f64 {
        self.coin_generator.cost_at(level)
    }

    /// Cost of the next level of luck upgrade `slot` (0-based).
    pub fn luck_cost(&self, slot: usize, level: u32) -> f64 {
        self.luck[slot].cost.cost_at(level)
    }

    pub fn rebirth_requirement(&self, rebirth_count: u32) -> f64 {
        let r = &self.resets;
        let growth = r.rebirth_requirement_growth.powi(rebirth_count as i32);
        (r.rebirth_base_requirement * growth).floor()
    }

    pub fn prestige_requirement(&self, prestige_count: u32) -> u32 {
        self.resets.prestige_tokens_per_rank * (prestige_count + 1)
    }

    /// `1 + rebirthBonus + prestigeBonus`.
    pub fn reset_multiplier(&self, rebirth_count: u32, prestige_count: u32) -> f64 {
        1.0 + rebirth_count as f64 * self.resets.rebirth_bonus
            + prestige_count as f64 * self.resets.prestige_bonus
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameConfig {
    pub balance: BalanceConfig,
    pub loot_table: LootTable,
}

impl GameConfig {
    /// Load `balance.json` and `loot_table.json` from `data_dir`.
    pub fn load(data_dir: &str) -> SimResult<Self> {
        let balance: BalanceConfig = read_json(&format!("{data_dir}/balance.json"))?;
        let loot_table: LootTable = read_json(&format!("{data_dir}/loot_table.json"))?;
        let config = Self { balance, loot_table };
        config.check()?;
        log::info!(
            "loaded config from {data_dir}: {} loot templates",
            config.loot_table.entries.len()
        );
        Ok(config)
    }

    /// Reject catalogs the generator cannot serve.
    pub fn check(&self) -> SimResult<()> {
        let invalid = |reason: String| SimError::Config {
            path: "loot_table".into(),
            reason,
        };
        for rarity in Rarity::ALL {
            if !self.loot_table.supports(rarity) {
                return Err(invalid(format!("no template allows rarity {rarity}")));
            }
        }
        for entry in &self.loot_table.entries {
            if entry.stat_ranges.kind() != entry.template.category.stat_kind() {
                return Err(invalid(format!(
                    "{}: stat ranges do not match category {:?}",
                    entry.template.name, entry.template.category
                )));
            }
            if entry.stat_ranges.ranges().iter().any(|r| !r.is_valid()) {
                return Err(invalid(format!("{}: invalid stat range", entry.template.name)));
            }
        }
        self.balance.check()
    }
}

impl BalanceConfig {
    /// Reject curves and amounts the action library cannot run on.
    pub fn check(&self) -> SimResult<()> {
        let invalid = |reason: String| SimError::Config {
            path: "balance".into(),
            reason,
        };
        let weights = &self.rarity_weights;
        if !(weights.total() > 0.0) || weights.0.iter().any(|w| !is_amount(*w)) {
            return Err(invalid(
                "rarity weights must be finite, non-negative and sum above zero".into(),
            ));
        }

        let xp = &self.xp_curve;
        if !(xp.growth.is_finite() && xp.growth >= 1.0) || !(self.xp_to_next(1) >= 1.0) {
            return Err(invalid(format!(
                "xp curve base {} growth {} never levels up",
                xp.base, xp.growth
            )));
        }

        let mut curves = vec![("coin_generator", self.coin_generator)];
        curves.extend(self.luck.iter().map(|l| ("luck", l.cost)));
        for (name, curve) in curves {
            if !is_amount(curve.base) || !is_amount(curve.growth) {
                return Err(invalid(format!("{name} cost curve must be finite and non-negative")));
            }
        }

        let shifts = self.luck.iter().flat_map(|l| &l.shifts).map(|s| s.per_level);
        let boxes = self.boxes.iter().flat_map(|b| [b.cost, b.high_tier_multiplier]);
        let r = &self.resets;
        let amounts = [
            self.chest_base_coins,
            self.level_up_coin_bonus,
            self.generator_income_per_level,
            self.common_weight_floor,
            self.auto_open_cost,
            self.auto_sell_cost,
            self.pets_cost,
            r.rebirth_base_requirement,
            r.rebirth_requirement_growth,
            r.rebirth_bonus,
            r.prestige_bonus,
        ];
        let bad = amounts
            .into_iter()
            .chain(self.chest_xp)
            .chain(self.egg_upgrade_costs)
            .chain(self.pet_bonus_base)
            .chain(shifts)
            .chain(boxes)
            .any(|v| !is_amount(v));
        if bad {
            return Err(invalid(
                "costs, multipliers and luck shifts must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}

fn is_amount(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> SimResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| SimError::Config {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| SimError::Config {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

impl Default for LootTable {
    #[rustfmt::skip]
    fn default() -> Self {
        use Rarity::*;
        let weapon = |name: &str,
                      description: &str,
                      category: Category,
                      rarities: &[Rarity],
                      ranges: [(f64, f64); 4]| {
            let [d, f, a, m] = ranges.map(|(lo, hi)| StatRange::new(lo, hi));
            LootTableEntry {
                template: ItemTemplate {
                    name: name.into(),
                    description: description.into(),
                    category,
                },
                stat_ranges: StatRanges::Weapon {
                    damage: d,
                    fire_rate: f,
                    accuracy: a,
                    magazine_size: m,
                },
                allowed_rarities: rarities.to_vec(),
            }
        };
        let armor = |name: &str,
                     description: &str,
                     rarities: &[Rarity],
                     defense: (f64, f64),
                     mobility: (f64, f64)| LootTableEntry {
            template: ItemTemplate {
                name: name.into(),
                description: description.into(),
                category: Category::Armor,
            },
            stat_ranges: StatRanges::Armor {
                defense: StatRange::new(defense.0, defense.1),
                mobility: StatRange::new(mobility.0, mobility.1),
            },
            allowed_rarities: rarities.to_vec(),
        };
        let shield = |name: &str,
                      description: &str,
                      rarities: &[Rarity],
                      capacity: (f64, f64),
                      recharge: (f64, f64)| LootTableEntry {
            template: ItemTemplate {
                name: name.into(),
                description: description.into(),
                category: Category::Shield,
            },
            stat_ranges: StatRanges::Shield {
                capacity: StatRange::new(capacity.0, capacity.1),
                recharge_rate: StatRange::new(recharge.0, recharge.1),
            },
            allowed_rarities: rarities.to_vec(),
        };

        LootTable {
            entries: vec![
                weapon("Sidearm", "Reliable backup pistol.", Category::Pistol,
                    &[Common, Uncommon, Rare], [(8.0, 14.0), (3.0, 5.0), (60.0, 80.0), (8.0, 15.0)]),
                weapon("Hand Cannon", "Kicks like a mule.", Category::Pistol,
                    &[Rare, Epic, Legendary], [(20.0, 32.0), (1.0, 2.0), (55.0, 75.0), (5.0, 8.0)]),
                weapon("Pulse Carbine", "Short bursts, steady aim.", Category::Rifle,
                    &[Common, Uncommon], [(10.0, 16.0), (5.0, 8.0), (65.0, 80.0), (24.0, 36.0)]),
                weapon("Battle Rifle", "Standard issue for the front line.", Category::Rifle,
                    &[Uncommon, Rare, Epic], [(15.0, 24.0), (4.0, 7.0), (70.0, 90.0), (20.0, 30.0)]),
                weapon("Buzzsaw", "Empties a magazine in a heartbeat.", Category::Smg,
                    &[Common, Uncommon, Rare], [(6.0, 10.0), (10.0, 15.0), (45.0, 65.0), (30.0, 45.0)]),
                weapon("Scattergun", "Point it in the general direction.", Category::Shotgun,
                    &[Common, Uncommon, Rare, Epic], [(25.0, 40.0), (1.0, 2.0), (30.0, 50.0), (4.0, 8.0)]),
                weapon("Longshot", "One shot, one problem solved.", Category::Sniper,
                    &[Rare, Epic, Legendary], [(45.0, 70.0), (0.5, 1.0), (90.0, 99.0), (3.0, 6.0)]),
                weapon("Rocket Launcher", "Area denial, personally delivered.", Category::Heavy,
                    &[Epic, Legendary], [(80.0, 120.0), (0.3, 0.6), (50.0, 70.0), (1.0, 4.0)]),
                armor("Padded Vest", "Better than a t-shirt.",
                    &[Common, Uncommon], (5.0, 10.0), (8.0, 12.0)),
                armor("Plated Carapace", "Heavy plates, heavy feet.",
                    &[Rare, Epic, Legendary], (15.0, 30.0), (3.0, 7.0)),
                shield("Bubble Shield", "Pops eventually.",
                    &[Common, Uncommon, Rare], (20.0, 40.0), (2.0, 5.0)),
                shield("Aegis Projector", "A wall you can carry.",
                    &[Epic, Legendary], (60.0, 100.0), (6.0, 10.0)),
            ],
        }
    }
}
