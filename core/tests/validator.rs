//! Validator: every injected corruption is caught with the right severity.

use lootsim_core::{
    config::GameConfig,
    loot::{generate_loot_with_guaranteed_rarity, ItemStats, Rarity},
    rng::SimRng,
    state::{create_initial_state, Area, GameState, Pet, PetType},
    validator::{validate, BugCategory, BugReport, Severity, INVENTORY_ANOMALY_SIZE},
};

fn check(state: &GameState) -> Vec<BugReport> {
    validate(state, "test_action", &GameConfig::default())
}

fn has(bugs: &[BugReport], severity: Severity, category: BugCategory) -> bool {
    bugs.iter().any(|b| b.severity == severity && b.category == category)
}

fn with_items(n: usize) -> GameState {
    let config = GameConfig::default();
    let mut rng = SimRng::new(n as u64);
    let mut state = create_initial_state();
    for _ in 0..n {
        let item =
            generate_loot_with_guaranteed_rarity(Rarity::Common, &config.loot_table, &mut rng)
                .unwrap();
        state.active_economy_mut().inventory.push(item);
    }
    state
}

#[test]
fn fresh_state_is_clean() {
    assert!(check(&create_initial_state()).is_empty());
    assert!(check(&with_items(20)).is_empty());
}

#[test]
fn nan_and_negative_coins_are_errors() {
    let mut state = create_initial_state();
    state.active_economy_mut().coins = f64::NAN;
    let bugs = check(&state);
    assert!(has(&bugs, Severity::Error, BugCategory::Nan), "{bugs:?}");
    assert_eq!(bugs[0].action, "test_action");
    assert_eq!(bugs[0].key(), "error:nan");

    state.active_economy_mut().coins = -0.5;
    assert!(has(&check(&state), Severity::Error, BugCategory::Negative));
}

#[test]
fn coins_past_the_exact_integer_range_overflow() {
    let mut state = create_initial_state();
    state.active_economy_mut().coins = 2f64.powi(60);
    assert!(has(&check(&state), Severity::Error, BugCategory::Overflow));
}

#[test]
fn duplicate_item_ids_are_errors() {
    let mut state = with_items(2);
    let e = state.active_economy_mut();
    e.inventory[1].id = e.inventory[0].id.clone();
    assert!(has(&check(&state), Severity::Error, BugCategory::DuplicateId));
}

#[test]
fn empty_item_id_is_invalid() {
    let mut state = with_items(1);
    state.active_economy_mut().inventory[0].id.clear();
    assert!(has(&check(&state), Severity::Error, BugCategory::InvalidItem));
}

#[test]
fn nan_item_stat_is_caught() {
    let mut state = with_items(1);
    let item = &mut state.active_economy_mut().inventory[0];
    item.stats = match item.stats {
        ItemStats::Weapon { fire_rate, accuracy, magazine_size, .. } => {
            ItemStats::Weapon { damage: f64::NAN, fire_rate, accuracy, magazine_size }
        }
        ItemStats::Armor { mobility, .. } => {
            ItemStats::Armor { defense: f64::NAN, mobility }
        }
        ItemStats::Shield { recharge_rate, .. } => {
            ItemStats::Shield { capacity: f64::NAN, recharge_rate }
        }
    };
    assert!(has(&check(&state), Severity::Error, BugCategory::Nan));
}

#[test]
fn orphaned_battle_slot_is_only_a_warning() {
    let mut state = create_initial_state();
    state.active_economy_mut().battle_slots[2] = Some("item-missing".into());
    let bugs = check(&state);
    assert_eq!(bugs.len(), 1, "{bugs:?}");
    assert_eq!(bugs[0].severity, Severity::Warning);
    assert_eq!(bugs[0].category, BugCategory::OrphanedSlot);
}

#[test]
fn oversized_inventory_is_an_anomaly() {
    let state = with_items(INVENTORY_ANOMALY_SIZE + 1);
    let bugs = check(&state);
    assert_eq!(bugs.len(), 1, "{bugs:?}");
    assert_eq!(bugs[0].severity, Severity::Anomaly);
    assert_eq!(bugs[0].category, BugCategory::InventorySize);
}

#[test]
fn luck_beyond_max_is_out_of_bounds() {
    let mut state = create_initial_state();
    state.active_economy_mut().luck.levels[1] = 5;
    assert!(has(&check(&state), Severity::Error, BugCategory::LuckBounds));
}

#[test]
fn zero_weights_are_degenerate() {
    let mut config = GameConfig::default();
    config.balance.rarity_weights.0 = [0.0; 5];
    let bugs = validate(&create_initial_state(), "openChest", &config);
    assert!(has(&bugs, Severity::Error, BugCategory::RarityWeights));
}

#[test]
fn unspent_level_up_is_a_progression_error() {
    let mut state = create_initial_state();
    state.active_economy_mut().xp = 10.0;
    assert!(has(&check(&state), Severity::Error, BugCategory::LevelProgression));
}

#[test]
fn auto_sell_selection_without_the_feature() {
    let mut state = create_initial_state();
    state.active_economy_mut().auto_sell_rarities.insert(Rarity::Common);
    assert!(has(&check(&state), Severity::Error, BugCategory::FeatureState));
}

#[test]
fn equipped_pets_must_exist_and_stay_under_the_limit() {
    let mut state = create_initial_state();
    let e = state.active_economy_mut();
    e.equipped_pets.push("pet-ghost".into());
    assert!(has(&check(&state), Severity::Error, BugCategory::PetReference));

    let e = state.active_economy_mut();
    e.equipped_pets.clear();
    for n in 0..7 {
        let id = format!("pet-{n}");
        e.pets.push(Pet {
            id: id.clone(),
            name: "Common Dog".into(),
            pet_type: PetType::Dog,
            rarity: Rarity::Common,
            bonus: 0.02,
            count: 1,
        });
        e.equipped_pets.push(id);
    }
    let bugs = check(&state);
    assert_eq!(bugs.len(), 1, "{bugs:?}");
    assert_eq!(bugs[0].category, BugCategory::PetReference);
}

#[test]
fn bugs_name_the_area_they_were_found_in() {
    let mut state = create_initial_state();
    state.areas[Area::Galaxy.index()].coins = -1.0;
    let bugs = check(&state);
    assert_eq!(bugs.len(), 1, "{bugs:?}");
    assert_eq!(bugs[0].area, Area::Galaxy);
}
