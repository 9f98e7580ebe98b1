//! Wave battle resolution.
//!
//! Five slots face five enemies. Shields never win a slot; their power is
//! pooled and subtracted from every enemy instead. Armor wins ties, weapons
//! must beat the enemy outright. The battle is won on `slots_to_win` slots.
//!
//! resolve_battle() only reads the economy. The caller applies the result.

use crate::{
    config::{BattleConfig, GameConfig},
    loot::{generate_loot_with_guaranteed_rarity, round_to, ItemStats, LootItem, Rarity},
    rng::SimRng,
    state::Economy,
    types::{EntityId, BATTLE_SLOTS},
};
use serde::{Deserialize, Serialize};

/// Scalar strength of an item. Negative for shields.
pub fn power(item: &LootItem) -> f64 {
    let m = item.rarity.power_multiplier();
    match item.stats {
        ItemStats::Shield { capacity, recharge_rate } => {
            -(capacity * 3.0 + recharge_rate * 2.0) * m
        }
        ItemStats::Armor { defense, mobility } => (defense * 4.0 + mobility) * m,
        ItemStats::Weapon { damage, fire_rate, accuracy, magazine_size } => {
            (damage * 2.0 + fire_rate + accuracy * 0.5 + magazine_size * 0.3) * m
        }
    }
}

/// Enemy strength facing `slot` on `wave`, before shield reduction.
pub fn enemy_power(wave: u32, slot: usize, battle: &BattleConfig, rng: &mut SimRng) -> f64 {
    let curve = if wave <= 1 { &battle.first_wave } else { &battle.later_waves };
    let base = curve.base + wave.saturating_sub(1) as f64 * curve.per_wave;
    let variance = curve.variance_ratio * base;
    let roll = rng.next_f64() * variance - variance / 2.0;
    (base + roll + slot as f64 * curve.slot_bonus).max(curve.floor)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotResult {
    pub item_id: Option<EntityId>,
    pub item_power: f64,
    /// Enemy power after shield reduction.
    pub enemy_power: f64,
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    pub won: bool,
    pub slots: Vec<SlotResult>,
    pub slots_won: usize,
    pub shield_reduction: f64,
    /// Streak after this battle.
    pub streak: u32,
    pub coins_earned: f64,
    pub drop: Option<LootItem>,
}

/// Fight the economy's current wave with whatever sits in the battle slots.
///
/// Slots pointing at items no longer in the inventory count as empty.
pub fn resolve_battle(economy: &Economy, config: &GameConfig, rng: &mut SimRng) -> BattleResult {
    let battle = &config.balance.battle;
    let wave = economy.battle_wave;
    let slotted: Vec<Option<&LootItem>> = economy
        .battle_slots
        .iter()
        .map(|slot| slot.as_deref().and_then(|id| economy.item(id)))
        .collect();

    let shield_reduction: f64 = slotted
        .iter()
        .flatten()
        .filter(|item| matches!(item.stats, ItemStats::Shield { .. }))
        .map(|item| power(item).abs())
        .sum();

    let mut slots = Vec::with_capacity(BATTLE_SLOTS);
    for (index, item) in slotted.iter().enumerate() {
        let effective_enemy = (enemy_power(wave, index, battle, rng) - shield_reduction).max(0.0);
        let (item_power, won) = match item {
            None => (0.0, false),
            Some(item) => {
                let p = power(item);
                let won = match item.stats {
                    ItemStats::Shield { .. } => false,
                    ItemStats::Armor { .. } => p >= effective_enemy,
                    ItemStats::Weapon { .. } => p > effective_enemy,
                };
                (p, won)
            }
        };
        slots.push(SlotResult {
            item_id: item.map(|i| i.id.clone()),
            item_power,
            enemy_power: effective_enemy,
            won,
        });
    }

    let slots_won = slots.iter().filter(|s| s.won).count();
    let won = slots_won >= battle.slots_to_win;

    if !won {
        return BattleResult {
            won,
            slots,
            slots_won,
            shield_reduction,
            streak: 0,
            coins_earned: 0.0,
            drop: None,
        };
    }

    let streak = economy.battle_streak + 1;
    let coins_earned = victory_coins(wave, streak, economy, config);
    let drop = roll_battle_drop(wave, config, rng);

    BattleResult {
        won,
        slots,
        slots_won,
        shield_reduction,
        streak,
        coins_earned,
        drop,
    }
}

fn victory_coins(wave: u32, streak: u32, economy: &Economy, config: &GameConfig) -> f64 {
    let battle = &config.balance.battle;
    let mut base = battle.base_coins + wave as f64;
    if wave <= 3 {
        base += (4 - wave) as f64 * battle.early_wave_bonus;
    }
    let streak_bonus = (streak as f64 * battle.streak_step).min(battle.streak_cap);
    let resets = config
        .balance
        .reset_multiplier(economy.rebirth_count, economy.prestige_count);
    round_to(base * resets * (1.0 + streak_bonus), 2)
}

fn roll_battle_drop(wave: u32, config: &GameConfig, rng: &mut SimRng) -> Option<LootItem> {
    let battle = &config.balance.battle;
    let chance = (battle.drop_chance_base + wave as f64 * battle.drop_chance_per_wave)
        .min(battle.drop_chance_cap);
    if !rng.chance(chance) {
        return None;
    }
    let rarity = if wave >= battle.legendary_drop_wave && rng.chance(battle.legendary_drop_chance) {
        Rarity::Legendary
    } else if wave >= battle.epic_drop_wave && rng.chance(battle.epic_drop_chance) {
        Rarity::Epic
    } else {
        Rarity::Rare
    };
    generate_loot_with_guaranteed_rarity(rarity, &config.loot_table, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loot::Category;

    fn weapon(id: &str, damage: f64) -> LootItem {
        LootItem {
            id: id.into(),
            name: "Test Gun".into(),
            description: String::new(),
            category: Category::Rifle,
            rarity: Rarity::Common,
            stats: ItemStats::Weapon {
                damage,
                fire_rate: 0.0,
                accuracy: 0.0,
                magazine_size: 0.0,
            },
        }
    }

    #[test]
    fn power_formulas() {
        assert_eq!(power(&weapon("a", 10.0)), 20.0);

        let mut armor = weapon("b", 0.0);
        armor.category = Category::Armor;
        armor.rarity = Rarity::Rare;
        armor.stats = ItemStats::Armor { defense: 10.0, mobility: 2.0 };
        assert_eq!(power(&armor), 105.0);

        let mut shield = weapon("c", 0.0);
        shield.category = Category::Shield;
        shield.stats = ItemStats::Shield { capacity: 10.0, recharge_rate: 1.0 };
        assert_eq!(power(&shield), -32.0);
    }

    #[test]
    fn enemy_power_bounds() {
        let battle = GameConfig::default().balance.battle;
        let mut rng = SimRng::new(9);
        for _ in 0..500 {
            let p = enemy_power(1, 0, &battle, &mut rng);
            assert!((20.0..=30.0).contains(&p));
            let p = enemy_power(3, 4, &battle, &mut rng);
            // base 90, ±27, +32
            assert!((95.0..=149.0).contains(&p));
        }
    }

    #[test]
    fn first_wave_floor_holds() {
        let mut battle = GameConfig::default().balance.battle;
        battle.first_wave.base = 0.0;
        let mut rng = SimRng::new(2);
        assert_eq!(enemy_power(1, 0, &battle, &mut rng), 15.0);
    }
}
