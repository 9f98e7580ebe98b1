//! The action library: every economy transition as a pure function.
//!
//! RULES:
//!   - apply_action() never mutates its input. It clones, changes the clone,
//!     and returns it with an outcome.
//!   - Preconditions are checked before any change. A failed precondition is
//!     a skip, and a skipped action returns the input state unchanged.
//!   - Balances never go negative: anything that costs coins goes through
//!     Economy::try_debit.
//!   - All randomness comes from the caller's economy stream.

use crate::{
    action::{ActionKind, ActionOutcome, ActionResult, SkipReason},
    battle::resolve_battle,
    config::{BalanceConfig, GameConfig},
    loot::{generate_loot, generate_loot_with_guaranteed_rarity, round_to, Rarity},
    rng::SimRng,
    state::{BoxTier, Economy, Egg, GameState, Pet, PetType},
    types::{EntityId, BATTLE_SLOTS},
};

/// Apply one action to the active area of `state`.
pub fn apply_action(
    kind: ActionKind,
    state: &GameState,
    config: &GameConfig,
    rng: &mut SimRng,
) -> (GameState, ActionOutcome) {
    let b = &config.balance;
    let mut next = state.clone();
    let outcome = match kind {
        ActionKind::SwitchArea => switch_area(&mut next, b),
        ActionKind::OpenChest => open_chest(next.active_economy_mut(), config, rng),
        ActionKind::SellItem => sell_item(next.active_economy_mut(), rng),
        ActionKind::BulkSell => bulk_sell(next.active_economy_mut(), rng),
        ActionKind::MergeItems => merge_items(next.active_economy_mut(), config, rng),
        ActionKind::UpgradeCoinGenerator => upgrade_coin_generator(next.active_economy_mut(), b),
        ActionKind::UpgradeLuck1 => upgrade_luck(next.active_economy_mut(), b, 0),
        ActionKind::UpgradeLuck2 => upgrade_luck(next.active_economy_mut(), b, 1),
        ActionKind::UpgradeLuck3 => upgrade_luck(next.active_economy_mut(), b, 2),
        ActionKind::BuyBox => buy_box(next.active_economy_mut(), b),
        ActionKind::BuyAutoOpen => {
            buy_feature(kind, next.active_economy_mut(), b.auto_open_cost, |e| &mut e.has_auto_open)
        }
        ActionKind::BuyAutoSell => {
            buy_feature(kind, next.active_economy_mut(), b.auto_sell_cost, |e| &mut e.has_auto_sell)
        }
        ActionKind::BuyPets => {
            buy_feature(kind, next.active_economy_mut(), b.pets_cost, |e| &mut e.has_pets)
        }
        ActionKind::BuyEggUpgrade => buy_egg_upgrade(next.active_economy_mut(), b),
        ActionKind::HatchEgg => hatch_egg(next.active_economy_mut(), b, rng),
        ActionKind::EquipPet => equip_pet(next.active_economy_mut(), b, rng),
        ActionKind::UnequipPet => unequip_pet(next.active_economy_mut(), rng),
        ActionKind::EquipWeapon => equip_weapon(next.active_economy_mut(), rng),
        ActionKind::FightBattle => fight_battle(next.active_economy_mut(), config, rng),
        ActionKind::Rebirth => rebirth(next.active_economy_mut(), b),
        ActionKind::Prestige => prestige(next.active_economy_mut(), b),
        ActionKind::CollectIdleCoins => collect_idle_coins(next.active_economy_mut(), b),
        ActionKind::ToggleAutoSellRarity => toggle_auto_sell_rarity(next.active_economy_mut(), rng),
    };
    if outcome.is_skipped() {
        return (state.clone(), outcome);
    }
    (next, outcome)
}

// ── Chests and inventory ───────────────────────────────────────────

fn open_chest(e: &mut Economy, config: &GameConfig, rng: &mut SimRng) -> ActionOutcome {
    let kind = ActionKind::OpenChest;
    let b = &config.balance;
    let weights = e.chest_weights(b);
    let Some(item) = generate_loot(&config.loot_table, &weights, rng) else {
        return ActionOutcome::skipped(kind, SkipReason::NoTemplate);
    };

    e.stats.total_chests_opened += 1;
    let resets = b.reset_multiplier(e.rebirth_count, e.prestige_count);
    let (pet_coins, pet_xp) = e.pet_bonuses();

    gain_xp(e, b.chest_xp[item.rarity.index()] * (1.0 + pet_xp), b, resets);
    e.credit(b.chest_base_coins * resets * (1.0 + pet_coins));

    if e.has_auto_sell && e.auto_sell_rarities.contains(&item.rarity) {
        e.record_drop(&item, b.drops_history_cap);
        e.credit(item.rarity.sell_price());
    } else {
        e.acquire(item, b.drops_history_cap);
    }

    roll_egg(e, b, rng);
    ActionOutcome::applied(kind)
}

/// Add XP and cascade level-ups, each paying `level * bonus` coins.
fn gain_xp(e: &mut Economy, amount: f64, b: &BalanceConfig, resets: f64) {
    e.xp = round_to(e.xp + amount, 2);
    loop {
        let needed = b.xp_to_next(e.level);
        if !(needed > 0.0) || e.xp < needed {
            break;
        }
        e.xp = round_to(e.xp - needed, 2).max(0.0);
        e.level += 1;
        e.credit(e.level as f64 * b.level_up_coin_bonus * resets);
    }
}

/// One egg per chest at most: highest upgraded rarity is checked first.
fn roll_egg(e: &mut Economy, b: &BalanceConfig, rng: &mut SimRng) {
    let upgraded: Vec<Rarity> = Rarity::ALL
        .iter()
        .rev()
        .copied()
        .filter(|r| e.egg_upgrades.get(r).copied().unwrap_or(false))
        .collect();
    for rarity in upgraded {
        if rng.chance(b.egg_chance) {
            e.eggs.push(Egg {
                id: format!("egg-{}", rng.uuid()),
                rarity,
            });
            break;
        }
    }
}

fn sell_item(e: &mut Economy, rng: &mut SimRng) -> ActionOutcome {
    let kind = ActionKind::SellItem;
    if e.inventory.is_empty() {
        return ActionOutcome::skipped(kind, SkipReason::NoTarget);
    }
    let id = e.inventory[rng.index(e.inventory.len())].id.clone();
    let proceeds: f64 = e
        .remove_items(&[id])
        .iter()
        .map(|item| item.rarity.sell_price())
        .sum();
    e.credit(proceeds);
    ActionOutcome::applied(kind)
}

/// Sell every unslotted item of one randomly chosen rarity.
fn bulk_sell(e: &mut Economy, rng: &mut SimRng) -> ActionOutcome {
    let kind = ActionKind::BulkSell;
    let mut present: Vec<Rarity> = e
        .inventory
        .iter()
        .filter(|item| !e.is_in_battle_slot(&item.id))
        .map(|item| item.rarity)
        .collect();
    present.sort();
    present.dedup();
    if present.is_empty() {
        return ActionOutcome::skipped(kind, SkipReason::NoTarget);
    }
    let rarity = present[rng.index(present.len())];
    let ids: Vec<EntityId> = e
        .inventory
        .iter()
        .filter(|item| item.rarity == rarity && !e.is_in_battle_slot(&item.id))
        .map(|item| item.id.clone())
        .collect();
    let proceeds: f64 = e
        .remove_items(&ids)
        .iter()
        .map(|item| item.rarity.sell_price())
        .sum();
    e.credit(proceeds);
    ActionOutcome::applied(kind)
}

fn merge_items(e: &mut Economy, config: &GameConfig, rng: &mut SimRng) -> ActionOutcome {
    let candidates: Vec<Rarity> = Rarity::ALL
        .iter()
        .copied()
        .filter(|r| r.next().is_some() && unslotted_of(e, *r).len() >= 3)
        .collect();
    if candidates.is_empty() {
        return ActionOutcome::skipped(ActionKind::MergeItems, SkipReason::NoTarget);
    }
    let rarity = candidates[rng.index(candidates.len())];
    merge_rarity(e, rarity, config, rng)
}

/// Merge three unslotted items of `rarity` into one of the next tier.
///
/// Legendary has no next tier and is rejected. The three inputs are only
/// removed once the upgraded item exists.
pub fn merge_rarity(
    e: &mut Economy,
    rarity: Rarity,
    config: &GameConfig,
    rng: &mut SimRng,
) -> ActionOutcome {
    let kind = ActionKind::MergeItems;
    let Some(target) = rarity.next() else {
        return ActionOutcome::skipped(kind, SkipReason::MaxLevel);
    };
    let inputs: Vec<EntityId> = unslotted_of(e, rarity).into_iter().take(3).collect();
    if inputs.len() < 3 {
        return ActionOutcome::skipped(kind, SkipReason::NoTarget);
    }
    let Some(merged) = generate_loot_with_guaranteed_rarity(target, &config.loot_table, rng) else {
        return ActionOutcome::skipped(kind, SkipReason::NoTemplate);
    };
    e.remove_items(&inputs);
    e.acquire(merged, config.balance.drops_history_cap);
    ActionOutcome::applied(kind)
}

fn unslotted_of(e: &Economy, rarity: Rarity) -> Vec<EntityId> {
    e.inventory
        .iter()
        .filter(|item| item.rarity == rarity && !e.is_in_battle_slot(&item.id))
        .map(|item| item.id.clone())
        .collect()
}

// ── Upgrades ───────────────────────────────────────────────────────

fn upgrade_coin_generator(e: &mut Economy, b: &BalanceConfig) -> ActionOutcome {
    let kind = ActionKind::UpgradeCoinGenerator;
    if !e.try_debit(b.generator_cost(e.coin_generator_level)) {
        return ActionOutcome::skipped(kind, SkipReason::Insufficient);
    }
    e.coin_generator_level += 1;
    ActionOutcome::applied(kind)
}

fn upgrade_luck(e: &mut Economy, b: &BalanceConfig, slot: usize) -> ActionOutcome {
    let kind = [ActionKind::UpgradeLuck1, ActionKind::UpgradeLuck2, ActionKind::UpgradeLuck3][slot];
    let level = e.luck.levels[slot];
    if level >= b.luck_max_level {
        return ActionOutcome::skipped(kind, SkipReason::MaxLevel);
    }
    if !e.try_debit(b.luck_cost(slot, level)) {
        return ActionOutcome::skipped(kind, SkipReason::Insufficient);
    }
    e.luck.levels[slot] += 1;
    ActionOutcome::applied(kind)
}

/// Boxes are bought in order; only the highest held tier counts.
fn buy_box(e: &mut Economy, b: &BalanceConfig) -> ActionOutcome {
    let kind = ActionKind::BuyBox;
    let Some(tier) = BoxTier::next_after(e.purchased_box) else {
        return ActionOutcome::skipped(kind, SkipReason::Owned);
    };
    if !e.try_debit(b.boxes[tier.index()].cost) {
        return ActionOutcome::skipped(kind, SkipReason::Insufficient);
    }
    e.purchased_box = Some(tier);
    ActionOutcome::applied(kind)
}

fn buy_feature(
    kind: ActionKind,
    e: &mut Economy,
    cost: f64,
    flag: impl Fn(&mut Economy) -> &mut bool,
) -> ActionOutcome {
    if *flag(e) {
        return ActionOutcome::skipped(kind, SkipReason::Owned);
    }
    if !e.try_debit(cost) {
        return ActionOutcome::skipped(kind, SkipReason::Insufficient);
    }
    *flag(e) = true;
    ActionOutcome::applied(kind)
}

/// Buys the cheapest egg upgrade not yet owned.
fn buy_egg_upgrade(e: &mut Economy, b: &BalanceConfig) -> ActionOutcome {
    let kind = ActionKind::BuyEggUpgrade;
    if !e.has_pets {
        return ActionOutcome::skipped(kind, SkipReason::Locked);
    }
    let Some(rarity) = Rarity::ALL
        .iter()
        .copied()
        .find(|r| !e.egg_upgrades.get(r).copied().unwrap_or(false))
    else {
        return ActionOutcome::skipped(kind, SkipReason::Owned);
    };
    if !e.try_debit(b.egg_upgrade_costs[rarity.index()]) {
        return ActionOutcome::skipped(kind, SkipReason::Insufficient);
    }
    e.egg_upgrades.insert(rarity, true);
    ActionOutcome::applied(kind)
}

// ── Pets ───────────────────────────────────────────────────────────

fn hatch_egg(e: &mut Economy, b: &BalanceConfig, rng: &mut SimRng) -> ActionOutcome {
    let kind = ActionKind::HatchEgg;
    if e.eggs.is_empty() {
        return ActionOutcome::skipped(kind, SkipReason::NoTarget);
    }
    let egg = e.eggs.remove(rng.index(e.eggs.len()));
    let pet_type = if rng.chance(0.5) { PetType::Dog } else { PetType::Cat };
    let bonus = round_to(
        b.pet_bonus_base[egg.rarity.index()] * rng.range_f64(0.8, 1.2),
        3,
    );

    if let Some(existing) = e
        .pets
        .iter_mut()
        .find(|p| p.pet_type == pet_type && p.rarity == egg.rarity)
    {
        existing.count += 1;
    } else {
        let species = match pet_type {
            PetType::Dog => "Dog",
            PetType::Cat => "Cat",
        };
        e.pets.push(Pet {
            id: format!("pet-{}", rng.uuid()),
            name: format!("{} {species}", capitalize(&egg.rarity.to_string())),
            pet_type,
            rarity: egg.rarity,
            bonus,
            count: 1,
        });
    }
    ActionOutcome::applied(kind)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn equip_pet(e: &mut Economy, b: &BalanceConfig, rng: &mut SimRng) -> ActionOutcome {
    let kind = ActionKind::EquipPet;
    let candidates: Vec<EntityId> = e
        .pets
        .iter()
        .filter(|p| !e.equipped_pets.contains(&p.id))
        .map(|p| p.id.clone())
        .collect();
    if candidates.is_empty() {
        return ActionOutcome::skipped(kind, SkipReason::NoTarget);
    }
    if e.equipped_pets.len() >= b.max_equipped_pets {
        return ActionOutcome::skipped(kind, SkipReason::MaxLevel);
    }
    let id = candidates[rng.index(candidates.len())].clone();
    e.equipped_pets.push(id);
    ActionOutcome::applied(kind)
}

fn unequip_pet(e: &mut Economy, rng: &mut SimRng) -> ActionOutcome {
    let kind = ActionKind::UnequipPet;
    if e.equipped_pets.is_empty() {
        return ActionOutcome::skipped(kind, SkipReason::NoTarget);
    }
    e.equipped_pets.remove(rng.index(e.equipped_pets.len()));
    ActionOutcome::applied(kind)
}

// ── Battle ─────────────────────────────────────────────────────────

/// Put a random item into a random slot, moving it if already slotted.
fn equip_weapon(e: &mut Economy, rng: &mut SimRng) -> ActionOutcome {
    let kind = ActionKind::EquipWeapon;
    if e.inventory.is_empty() {
        return ActionOutcome::skipped(kind, SkipReason::NoTarget);
    }
    let id = e.inventory[rng.index(e.inventory.len())].id.clone();
    let slot = rng.index(BATTLE_SLOTS);
    for s in e.battle_slots.iter_mut() {
        if s.as_deref() == Some(id.as_str()) {
            *s = None;
        }
    }
    e.battle_slots[slot] = Some(id);
    ActionOutcome::applied(kind)
}

fn fight_battle(e: &mut Economy, config: &GameConfig, rng: &mut SimRng) -> ActionOutcome {
    let kind = ActionKind::FightBattle;
    if e.filled_slots() == 0 {
        return ActionOutcome::skipped(kind, SkipReason::NoTarget);
    }
    let result = resolve_battle(e, config, rng);
    if !result.won {
        e.battle_streak = 0;
        return ActionOutcome { kind, result: ActionResult::BattleLost };
    }
    e.battle_wave += 1;
    e.battle_streak = result.streak;
    e.credit(result.coins_earned);
    if let Some(item) = result.drop {
        e.acquire(item, config.balance.drops_history_cap);
    }
    ActionOutcome { kind, result: ActionResult::BattleWon }
}

// ── Resets ─────────────────────────────────────────────────────────

/// Keeps pets, purchased features, egg upgrades, lifetime stats and history.
fn rebirth(e: &mut Economy, b: &BalanceConfig) -> ActionOutcome {
    let kind = ActionKind::Rebirth;
    if e.coins < b.rebirth_requirement(e.rebirth_count) {
        return ActionOutcome::skipped(kind, SkipReason::Insufficient);
    }
    e.reset_progress();
    e.rebirth_tokens += 1;
    e.rebirth_count += 1;
    ActionOutcome::applied(kind)
}

fn prestige(e: &mut Economy, b: &BalanceConfig) -> ActionOutcome {
    let kind = ActionKind::Prestige;
    if e.rebirth_tokens < b.prestige_requirement(e.prestige_count) {
        return ActionOutcome::skipped(kind, SkipReason::Requirement);
    }
    e.reset_progress();
    e.rebirth_tokens = 0;
    e.rebirth_count = 0;
    e.prestige_count += 1;
    ActionOutcome::applied(kind)
}

// ── Idle, settings, areas ──────────────────────────────────────────

fn collect_idle_coins(e: &mut Economy, b: &BalanceConfig) -> ActionOutcome {
    let kind = ActionKind::CollectIdleCoins;
    if e.coin_generator_level == 0 {
        return ActionOutcome::skipped(kind, SkipReason::NoTarget);
    }
    let resets = b.reset_multiplier(e.rebirth_count, e.prestige_count);
    e.credit(e.coin_generator_level as f64 * b.generator_income_per_level * resets);
    ActionOutcome::applied(kind)
}

fn toggle_auto_sell_rarity(e: &mut Economy, rng: &mut SimRng) -> ActionOutcome {
    let kind = ActionKind::ToggleAutoSellRarity;
    if !e.has_auto_sell {
        return ActionOutcome::skipped(kind, SkipReason::Locked);
    }
    let rarity = Rarity::ALL[rng.index(Rarity::ALL.len())];
    if !e.auto_sell_rarities.remove(&rarity) {
        e.auto_sell_rarities.insert(rarity);
    }
    ActionOutcome::applied(kind)
}

fn switch_area(state: &mut GameState, b: &BalanceConfig) -> ActionOutcome {
    let kind = ActionKind::SwitchArea;
    if !state.galaxy_unlocked {
        if state.active_economy().level < b.galaxy_unlock_level {
            return ActionOutcome::skipped(kind, SkipReason::Locked);
        }
        state.galaxy_unlocked = true;
    }
    state.active = state.active.other();
    ActionOutcome::applied(kind)
}
