//! Battle engine: slot resolution, win threshold, rewards.

use lootsim_core::{
    action::{ActionKind, ActionResult},
    action_library::apply_action,
    battle::{enemy_power, resolve_battle},
    config::GameConfig,
    loot::{Category, ItemStats, LootItem, Rarity},
    rng::SimRng,
    state::{create_initial_state, Economy, GameState},
};

fn weapon(id: &str, damage: f64) -> LootItem {
    LootItem {
        id: id.into(),
        name: "Test Rifle".into(),
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

fn shield(id: &str, capacity: f64) -> LootItem {
    LootItem {
        id: id.into(),
        name: "Test Shield".into(),
        description: String::new(),
        category: Category::Shield,
        rarity: Rarity::Common,
        stats: ItemStats::Shield { capacity, recharge_rate: 0.0 },
    }
}

/// Put `items` into slots 0.. of a fresh economy.
fn equipped(items: Vec<LootItem>) -> GameState {
    let mut state = create_initial_state();
    let e = state.active_economy_mut();
    for (slot, item) in items.into_iter().enumerate() {
        e.battle_slots[slot] = Some(item.id.clone());
        e.inventory.push(item);
    }
    state
}

#[test]
fn five_strong_weapons_win_wave_one() {
    let config = GameConfig::default();
    let items = (0..5).map(|n| weapon(&format!("w{n}"), 500.0)).collect();
    let state = equipped(items);
    let mut rng = SimRng::new(1);

    let (next, outcome) = apply_action(ActionKind::FightBattle, &state, &config, &mut rng);
    assert_eq!(outcome.result, ActionResult::BattleWon);
    assert_eq!(outcome.to_string(), "battle_won");

    let e = next.active_economy();
    assert_eq!(e.battle_wave, 2);
    assert_eq!(e.battle_streak, 1);
    // (5 + wave 1 + 3 early-wave steps * 3) * streak bonus 1.1
    assert_eq!(e.coins, 16.5);
}

#[test]
fn one_huge_weapon_alone_cannot_win() {
    let config = GameConfig::default();
    let mut state = equipped(vec![weapon("big", 500.0)]);
    state.active_economy_mut().battle_streak = 4;
    let mut rng = SimRng::new(2);

    let (next, outcome) = apply_action(ActionKind::FightBattle, &state, &config, &mut rng);
    assert_eq!(outcome.to_string(), "battle_lost");
    let e = next.active_economy();
    assert_eq!(e.battle_wave, 1);
    assert_eq!(e.battle_streak, 0, "a loss resets the streak");
    assert_eq!(e.coins, 0.0);
}

#[test]
fn empty_slots_skip_the_fight() {
    let config = GameConfig::default();
    let state = create_initial_state();
    let mut rng = SimRng::new(3);

    let (next, outcome) = apply_action(ActionKind::FightBattle, &state, &config, &mut rng);
    assert_eq!(outcome.to_string(), "fightBattle_skipped_no_target");
    assert_eq!(next, state);
}

#[test]
fn shields_never_win_a_slot() {
    let config = GameConfig::default();
    let items = (0..5).map(|n| shield(&format!("s{n}"), 1_000.0)).collect();
    let state = equipped(items);
    let mut rng = SimRng::new(4);

    let result = resolve_battle(state.active_economy(), &config, &mut rng);
    assert!(!result.won);
    assert_eq!(result.slots_won, 0);
    assert_eq!(result.shield_reduction, 15_000.0);
    assert!(result.slots.iter().all(|s| s.enemy_power == 0.0));
}

#[test]
fn shields_weaken_every_enemy() {
    let config = GameConfig::default();
    // 3 weak weapons would lose wave one; a big shield carries them.
    let state = equipped(vec![
        shield("s", 100.0),
        weapon("a", 1.0),
        weapon("b", 1.0),
        weapon("c", 1.0),
    ]);
    let mut rng = SimRng::new(5);

    let result = resolve_battle(state.active_economy(), &config, &mut rng);
    assert_eq!(result.shield_reduction, 300.0);
    assert_eq!(result.slots_won, 3);
    assert!(result.won);
}

#[test]
fn orphaned_slots_fight_empty_handed() {
    let config = GameConfig::default();
    let mut state = equipped((0..3).map(|n| weapon(&format!("w{n}"), 500.0)).collect());
    {
        let e: &mut Economy = state.active_economy_mut();
        e.battle_slots[3] = Some("item-gone".into());
        e.battle_slots[4] = Some("item-also-gone".into());
    }
    let mut rng = SimRng::new(6);

    let result = resolve_battle(state.active_economy(), &config, &mut rng);
    assert!(result.won);
    assert_eq!(result.slots_won, 3);
    assert_eq!(result.slots[3].item_id, None);
    assert!(!result.slots[4].won);
}

#[test]
fn later_waves_scale_and_respect_the_floor() {
    let config = GameConfig::default();
    let battle = &config.balance.battle;
    let mut rng = SimRng::new(7);

    for _ in 0..1_000 {
        let wave_one = enemy_power(1, 0, battle, &mut rng);
        assert!((20.0..=30.0).contains(&wave_one), "wave 1 slot 0: {wave_one}");

        // base 50 + 9 * 20 = 230, variance ±69, slot 4 adds 32.
        let wave_ten = enemy_power(10, 4, battle, &mut rng);
        assert!((193.0..=331.0).contains(&wave_ten), "wave 10 slot 4: {wave_ten}");
    }
}

#[test]
fn winning_streak_bonus_is_capped() {
    let config = GameConfig::default();
    let mut state = equipped((0..5).map(|n| weapon(&format!("w{n}"), 5_000.0)).collect());
    {
        let e = state.active_economy_mut();
        e.battle_wave = 20;
        e.battle_streak = 30;
    }
    let mut rng = SimRng::new(8);

    let result = resolve_battle(state.active_economy(), &config, &mut rng);
    assert!(result.won);
    assert_eq!(result.streak, 31);
    // (5 + 20) doubled by the capped streak bonus.
    assert_eq!(result.coins_earned, 50.0);
}
