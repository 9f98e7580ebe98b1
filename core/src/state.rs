//! The economy snapshot.
//!
//! One `Economy` holds everything a player can own or progress in an area.
//! `GameState` carries two of them (home and galaxy) and a pointer to the
//! active one; actions only ever touch the active economy.
//!
//! RULE: States are values. Actions clone, modify the clone, return it.

use crate::{
    config::BalanceConfig,
    loot::{LootItem, Rarity, RarityWeights},
    types::{EntityId, BATTLE_SLOTS},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxTier {
    Bronze,
    Silver,
    Gold,
}

impl BoxTier {
    pub fn index(self) -> usize {
        self as usize
    }

    /// The tier that can be bought while holding `current`.
    pub fn next_after(current: Option<BoxTier>) -> Option<BoxTier> {
        match current {
            None => Some(BoxTier::Bronze),
            Some(BoxTier::Bronze) => Some(BoxTier::Silver),
            Some(BoxTier::Silver) => Some(BoxTier::Gold),
            Some(BoxTier::Gold) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LuckUpgrades {
    /// Levels of luck upgrades 1, 2 and 3.
    pub levels: [u32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LifetimeStats {
    pub total_chests_opened: u64,
    pub total_coins_earned: f64,
    pub legendaries_found: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Egg {
    pub id: EntityId,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetType {
    Dog,
    Cat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: EntityId,
    pub name: String,
    pub pet_type: PetType,
    pub rarity: Rarity,
    /// Dogs add this to the coin multiplier, cats to the XP multiplier.
    pub bonus: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropRecord {
    pub item_id: EntityId,
    pub name: String,
    pub rarity: Rarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Economy {
    pub level: u32,
    pub xp: f64,
    pub coins: f64,
    pub inventory: Vec<LootItem>,
    pub coin_generator_level: u32,
    pub luck: LuckUpgrades,
    pub stats: LifetimeStats,
    pub purchased_box: Option<BoxTier>,
    pub has_auto_open: bool,
    pub has_auto_sell: bool,
    pub auto_sell_rarities: BTreeSet<Rarity>,
    pub has_pets: bool,
    pub rebirth_tokens: u32,
    pub rebirth_count: u32,
    pub prestige_count: u32,
    pub egg_upgrades: BTreeMap<Rarity, bool>,
    pub eggs: Vec<Egg>,
    pub pets: Vec<Pet>,
    pub equipped_pets: Vec<EntityId>,
    /// Newest first.
    pub drops_history: VecDeque<DropRecord>,
    pub battle_wave: u32,
    pub battle_slots: [Option<EntityId>; BATTLE_SLOTS],
    pub battle_streak: u32,
}

impl Default for Economy {
    fn default() -> Self {
        Self::new()
    }
}

impl Economy {
    pub fn new() -> Self {
        Self {
            level: 1,
            xp: 0.0,
            coins: 0.0,
            inventory: Vec::new(),
            coin_generator_level: 0,
            luck: LuckUpgrades::default(),
            stats: LifetimeStats::default(),
            purchased_box: None,
            has_auto_open: false,
            has_auto_sell: false,
            auto_sell_rarities: BTreeSet::new(),
            has_pets: false,
            rebirth_tokens: 0,
            rebirth_count: 0,
            prestige_count: 0,
            egg_upgrades: Rarity::ALL.iter().map(|r| (*r, false)).collect(),
            eggs: Vec::new(),
            pets: Vec::new(),
            equipped_pets: Vec::new(),
            drops_history: VecDeque::new(),
            battle_wave: 1,
            battle_slots: Default::default(),
            battle_streak: 0,
        }
    }

    /// Chest rarity weights after luck upgrades and the held box.
    pub fn chest_weights(&self, balance: &BalanceConfig) -> RarityWeights {
        let mut weights = balance.rarity_weights;
        for (slot, level) in self.luck.levels.iter().enumerate() {
            for shift in &balance.luck[slot].shifts {
                let wanted = shift.per_level * *level as f64;
                let available =
                    (weights.get(Rarity::Common) - balance.common_weight_floor).max(0.0);
                let moved = wanted.min(available);
                weights.set(Rarity::Common, weights.get(Rarity::Common) - moved);
                weights.set(shift.to, weights.get(shift.to) + moved);
            }
        }
        if let Some(tier) = self.purchased_box {
            let m = balance.boxes[tier.index()].high_tier_multiplier;
            for rarity in [Rarity::Rare, Rarity::Epic, Rarity::Legendary] {
                weights.set(rarity, weights.get(rarity) * m);
            }
        }
        weights
    }

    pub fn item(&self, id: &str) -> Option<&LootItem> {
        self.inventory.iter().find(|i| i.id == id)
    }

    pub fn is_in_battle_slot(&self, id: &str) -> bool {
        self.battle_slots.iter().flatten().any(|slot| slot == id)
    }

    pub fn filled_slots(&self) -> usize {
        self.battle_slots.iter().flatten().count()
    }

    /// Remove items by id and clear any battle slot that pointed at them.
    pub fn remove_items(&mut self, ids: &[EntityId]) -> Vec<LootItem> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.inventory)
            .into_iter()
            .partition(|item| ids.contains(&item.id));
        self.inventory = kept;
        for slot in self.battle_slots.iter_mut() {
            if slot.as_ref().is_some_and(|id| ids.contains(id)) {
                *slot = None;
            }
        }
        removed
    }

    /// Add coins from any source and count them as earned.
    pub fn credit(&mut self, amount: f64) {
        if amount <= 0.0 || !amount.is_finite() {
            return;
        }
        self.coins = crate::loot::round_to(self.coins + amount, 2);
        self.stats.total_coins_earned =
            crate::loot::round_to(self.stats.total_coins_earned + amount, 2);
    }

    /// Take `cost` if affordable. Returns false and leaves coins alone otherwise.
    pub fn try_debit(&mut self, cost: f64) -> bool {
        if !(cost >= 0.0) || self.coins < cost {
            return false;
        }
        self.coins = crate::loot::round_to(self.coins - cost, 2).max(0.0);
        true
    }

    /// Record a drop, newest first, keeping at most `cap` entries.
    pub fn record_drop(&mut self, item: &LootItem, cap: usize) {
        self.drops_history.push_front(DropRecord {
            item_id: item.id.clone(),
            name: item.name.clone(),
            rarity: item.rarity,
        });
        self.drops_history.truncate(cap);
        if item.rarity == Rarity::Legendary {
            self.stats.legendaries_found += 1;
        }
    }

    /// Record and keep an item.
    pub fn acquire(&mut self, item: LootItem, cap: usize) {
        self.record_drop(&item, cap);
        self.inventory.push(item);
    }

    /// Summed (coin, xp) bonuses of equipped pets.
    pub fn pet_bonuses(&self) -> (f64, f64) {
        self.equipped_pets
            .iter()
            .filter_map(|id| self.pets.iter().find(|p| &p.id == id))
            .fold((0.0, 0.0), |(coin, xp), pet| {
                let bonus = pet.bonus * pet.count as f64;
                match pet.pet_type {
                    PetType::Dog => (coin + bonus, xp),
                    PetType::Cat => (coin, xp + bonus),
                }
            })
    }

    /// Zero the progress a rebirth takes away. Counters are the caller's job.
    pub fn reset_progress(&mut self) {
        self.coins = 0.0;
        self.xp = 0.0;
        self.level = 1;
        self.inventory.clear();
        self.coin_generator_level = 0;
        self.luck = LuckUpgrades::default();
        self.purchased_box = None;
        self.eggs.clear();
        self.battle_wave = 1;
        self.battle_slots = Default::default();
        self.battle_streak = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Home,
    Galaxy,
}

impl Area {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Area::Home => "home",
            Area::Galaxy => "galaxy",
        }
    }

    pub fn other(self) -> Area {
        match self {
            Area::Home => Area::Galaxy,
            Area::Galaxy => Area::Home,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub areas: [Economy; 2],
    pub active: Area,
    pub galaxy_unlocked: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            areas: [Economy::new(), Economy::new()],
            active: Area::Home,
            galaxy_unlocked: false,
        }
    }

    pub fn economy(&self, area: Area) -> &Economy {
        &self.areas[area.index()]
    }

    pub fn active_economy(&self) -> &Economy {
        self.economy(self.active)
    }

    pub fn active_economy_mut(&mut self) -> &mut Economy {
        &mut self.areas[self.active.index()]
    }
}

/// A fresh state for one bot run.
pub fn create_initial_state() -> GameState {
    GameState::new()
}
