//! Loot catalog types and the weighted loot generator.
//!
//! Generation is three draws against one RNG stream:
//!   1. rarity, by weighted selection over the five tiers
//!   2. template, uniformly among entries allowing that rarity
//!   3. stats, uniform within each range, scaled by the rarity multiplier
//!      and rounded to one decimal
//!
//! An empty eligible set is the only failure; callers treat it as "no drop".

use crate::{rng::SimRng, types::EntityId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    /// Position in the total order, 0 for Common.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The next tier up, None for Legendary.
    pub fn next(self) -> Option<Rarity> {
        Rarity::ALL.get(self.index() + 1).copied()
    }

    /// Stat scaling applied when rolling an item of this rarity.
    pub fn stat_multiplier(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.15,
            Rarity::Rare => 1.3,
            Rarity::Epic => 1.5,
            Rarity::Legendary => 1.8,
        }
    }

    /// Battle power scaling.
    pub fn power_multiplier(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.5,
            Rarity::Rare => 2.5,
            Rarity::Epic => 4.0,
            Rarity::Legendary => 7.0,
        }
    }

    pub fn sell_price(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 2.0,
            Rarity::Rare => 3.0,
            Rarity::Epic => 5.0,
            Rarity::Legendary => 10.0,
        }
    }

    fn name_prefixes(self) -> &'static [&'static str] {
        match self {
            Rarity::Common => &["Rusty", "Worn", "Standard", "Surplus"],
            Rarity::Uncommon => &["Polished", "Sturdy", "Tuned"],
            Rarity::Rare => &["Refined", "Precise", "Hardened"],
            Rarity::Epic => &["Vicious", "Masterwork", "Exalted"],
            Rarity::Legendary => &["Mythic", "Eternal", "Godforged"],
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pistol,
    Rifle,
    Smg,
    Shotgun,
    Sniper,
    Heavy,
    Armor,
    Shield,
    Consumable,
    Mod,
}

impl Category {
    /// Which stat shape items of this category carry.
    pub fn stat_kind(self) -> StatKind {
        match self {
            Category::Armor => StatKind::Armor,
            Category::Shield => StatKind::Shield,
            _ => StatKind::Weapon,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Weapon,
    Armor,
    Shield,
}

/// Concrete rolled stats. The variant follows the item's category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemStats {
    Weapon {
        damage: f64,
        fire_rate: f64,
        accuracy: f64,
        magazine_size: f64,
    },
    Armor {
        defense: f64,
        mobility: f64,
    },
    Shield {
        capacity: f64,
        recharge_rate: f64,
    },
}

impl ItemStats {
    pub fn kind(&self) -> StatKind {
        match self {
            ItemStats::Weapon { .. } => StatKind::Weapon,
            ItemStats::Armor { .. } => StatKind::Armor,
            ItemStats::Shield { .. } => StatKind::Shield,
        }
    }

    /// Named stat values, for validation and display.
    pub fn values(&self) -> Vec<(&'static str, f64)> {
        match *self {
            ItemStats::Weapon { damage, fire_rate, accuracy, magazine_size } => vec![
                ("damage", damage),
                ("fire_rate", fire_rate),
                ("accuracy", accuracy),
                ("magazine_size", magazine_size),
            ],
            ItemStats::Armor { defense, mobility } => {
                vec![("defense", defense), ("mobility", mobility)]
            }
            ItemStats::Shield { capacity, recharge_rate } => {
                vec![("capacity", capacity), ("recharge_rate", recharge_rate)]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootItem {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub rarity: Rarity,
    pub stats: ItemStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatRange {
    pub min: f64,
    pub max: f64,
}

impl StatRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
    }

    fn roll(&self, multiplier: f64, rng: &mut SimRng) -> f64 {
        round_to(rng.range_f64(self.min, self.max) * multiplier, 1)
    }
}

/// Per-stat ranges for a template, shaped like the stats they produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatRanges {
    Weapon {
        damage: StatRange,
        fire_rate: StatRange,
        accuracy: StatRange,
        magazine_size: StatRange,
    },
    Armor {
        defense: StatRange,
        mobility: StatRange,
    },
    Shield {
        capacity: StatRange,
        recharge_rate: StatRange,
    },
}

impl StatRanges {
    pub fn kind(&self) -> StatKind {
        match self {
            StatRanges::Weapon { .. } => StatKind::Weapon,
            StatRanges::Armor { .. } => StatKind::Armor,
            StatRanges::Shield { .. } => StatKind::Shield,
        }
    }

    pub fn ranges(&self) -> Vec<StatRange> {
        match *self {
            StatRanges::Weapon { damage, fire_rate, accuracy, magazine_size } => {
                vec![damage, fire_rate, accuracy, magazine_size]
            }
            StatRanges::Armor { defense, mobility } => vec![defense, mobility],
            StatRanges::Shield { capacity, recharge_rate } => vec![capacity, recharge_rate],
        }
    }

    fn roll(&self, rarity: Rarity, rng: &mut SimRng) -> ItemStats {
        let m = rarity.stat_multiplier();
        match self {
            StatRanges::Weapon { damage, fire_rate, accuracy, magazine_size } => ItemStats::Weapon {
                damage: damage.roll(m, rng),
                fire_rate: fire_rate.roll(m, rng),
                accuracy: accuracy.roll(m, rng),
                magazine_size: magazine_size.roll(m, rng),
            },
            StatRanges::Armor { defense, mobility } => ItemStats::Armor {
                defense: defense.roll(m, rng),
                mobility: mobility.roll(m, rng),
            },
            StatRanges::Shield { capacity, recharge_rate } => ItemStats::Shield {
                capacity: capacity.roll(m, rng),
                recharge_rate: recharge_rate.roll(m, rng),
            },
        }
    }
}

/// Cosmetic part of a template: everything except rarity and stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    pub name: String,
    pub description: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootTableEntry {
    pub template: ItemTemplate,
    pub stat_ranges: StatRanges,
    pub allowed_rarities: Vec<Rarity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootTable {
    pub entries: Vec<LootTableEntry>,
}

impl LootTable {
    pub fn eligible(&self, rarity: Rarity) -> Vec<&LootTableEntry> {
        self.entries
            .iter()
            .filter(|e| e.allowed_rarities.contains(&rarity))
            .collect()
    }

    pub fn supports(&self, rarity: Rarity) -> bool {
        self.entries.iter().any(|e| e.allowed_rarities.contains(&rarity))
    }
}

/// Drop weights for the five tiers, indexed by `Rarity::index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RarityWeights(pub [f64; 5]);

impl Default for RarityWeights {
    fn default() -> Self {
        RarityWeights([67.0, 20.0, 10.0, 2.0, 1.0])
    }
}

impl RarityWeights {
    pub fn get(&self, rarity: Rarity) -> f64 {
        self.0[rarity.index()]
    }

    pub fn set(&mut self, rarity: Rarity, weight: f64) {
        self.0[rarity.index()] = weight;
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Draw a rarity. Falls back to Common when every weight is zero.
    pub fn draw(&self, rng: &mut SimRng) -> Rarity {
        rng.weighted_index(&self.0)
            .map(|i| Rarity::ALL[i])
            .unwrap_or(Rarity::Common)
    }
}

/// Roll one item with a weighted rarity.
///
/// Returns None only when the catalog has no entry for the drawn rarity.
pub fn generate_loot(
    table: &LootTable,
    weights: &RarityWeights,
    rng: &mut SimRng,
) -> Option<LootItem> {
    let rarity = weights.draw(rng);
    generate_loot_with_guaranteed_rarity(rarity, table, rng)
}

/// Roll one item of a fixed rarity, or None if no template supports it.
pub fn generate_loot_with_guaranteed_rarity(
    rarity: Rarity,
    table: &LootTable,
    rng: &mut SimRng,
) -> Option<LootItem> {
    let eligible = table.eligible(rarity);
    if eligible.is_empty() {
        log::warn!("loot table has no template for rarity {rarity}");
        return None;
    }
    let entry = eligible[rng.index(eligible.len())];
    let stats = entry.stat_ranges.roll(rarity, rng);
    let prefixes = rarity.name_prefixes();
    let prefix = prefixes[rng.index(prefixes.len())];

    Some(LootItem {
        id: format!("item-{}", rng.uuid()),
        name: format!("{prefix} {}", entry.template.name),
        description: entry.template.description.clone(),
        category: entry.template.category,
        rarity,
        stats,
    })
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
