use serde::{Deserialize, Serialize};
use std::fmt;

/// Every player-causable economy transition.
/// Variants are appended only, never removed or reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    // ── Chests and inventory ──────────────────────
    OpenChest,
    SellItem,
    BulkSell,
    MergeItems,

    // ── Upgrades ──────────────────────────────────
    UpgradeCoinGenerator,
    UpgradeLuck1,
    UpgradeLuck2,
    UpgradeLuck3,
    BuyBox,
    BuyAutoOpen,
    BuyAutoSell,

    // ── Pets ──────────────────────────────────────
    BuyPets,
    BuyEggUpgrade,
    HatchEgg,
    EquipPet,
    UnequipPet,

    // ── Battle ────────────────────────────────────
    EquipWeapon,
    FightBattle,

    // ── Resets ────────────────────────────────────
    Rebirth,
    Prestige,

    // ── Idle, settings, areas ─────────────────────
    CollectIdleCoins,
    ToggleAutoSellRarity,
    SwitchArea,
}

impl ActionKind {
    pub const ALL: [ActionKind; 23] = [
        ActionKind::OpenChest,
        ActionKind::SellItem,
        ActionKind::BulkSell,
        ActionKind::MergeItems,
        ActionKind::UpgradeCoinGenerator,
        ActionKind::UpgradeLuck1,
        ActionKind::UpgradeLuck2,
        ActionKind::UpgradeLuck3,
        ActionKind::BuyBox,
        ActionKind::BuyAutoOpen,
        ActionKind::BuyAutoSell,
        ActionKind::BuyPets,
        ActionKind::BuyEggUpgrade,
        ActionKind::HatchEgg,
        ActionKind::EquipPet,
        ActionKind::UnequipPet,
        ActionKind::EquipWeapon,
        ActionKind::FightBattle,
        ActionKind::Rebirth,
        ActionKind::Prestige,
        ActionKind::CollectIdleCoins,
        ActionKind::ToggleAutoSellRarity,
        ActionKind::SwitchArea,
    ];

    /// Stable action name used in reports and the store.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenChest => "openChest",
            Self::SellItem => "sellItem",
            Self::BulkSell => "bulkSell",
            Self::MergeItems => "mergeItems",
            Self::UpgradeCoinGenerator => "upgradeCoinGenerator",
            Self::UpgradeLuck1 => "upgradeLuck1",
            Self::UpgradeLuck2 => "upgradeLuck2",
            Self::UpgradeLuck3 => "upgradeLuck3",
            Self::BuyBox => "buyBox",
            Self::BuyAutoOpen => "buyAutoOpen",
            Self::BuyAutoSell => "buyAutoSell",
            Self::BuyPets => "buyPets",
            Self::BuyEggUpgrade => "buyEggUpgrade",
            Self::HatchEgg => "hatchEgg",
            Self::EquipPet => "equipPet",
            Self::UnequipPet => "unequipPet",
            Self::EquipWeapon => "equipWeapon",
            Self::FightBattle => "fightBattle",
            Self::Rebirth => "rebirth",
            Self::Prestige => "prestige",
            Self::CollectIdleCoins => "collectIdleCoins",
            Self::ToggleAutoSellRarity => "toggleAutoSellRarity",
            Self::SwitchArea => "switchArea",
        }
    }
}

/// Why an action turned into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Insufficient,
    Locked,
    MaxLevel,
    Owned,
    NoTarget,
    NoTemplate,
    Requirement,
}

impl SkipReason {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Insufficient => "insufficient",
            Self::Locked => "locked",
            Self::MaxLevel => "max_level",
            Self::Owned => "owned",
            Self::NoTarget => "no_target",
            Self::NoTemplate => "no_template",
            Self::Requirement => "requirement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum ActionResult {
    Applied,
    Skipped(SkipReason),
    BattleWon,
    BattleLost,
}

/// What happened when an action was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    pub result: ActionResult,
}

impl ActionOutcome {
    pub fn applied(kind: ActionKind) -> Self {
        Self { kind, result: ActionResult::Applied }
    }

    pub fn skipped(kind: ActionKind, reason: SkipReason) -> Self {
        Self { kind, result: ActionResult::Skipped(reason) }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.result, ActionResult::Skipped(_))
    }

    /// Aggregation key: the base action name with any skip suffix dropped,
    /// except battle results which stay distinct.
    pub fn label(&self) -> &'static str {
        match self.result {
            ActionResult::BattleWon => "battle_won",
            ActionResult::BattleLost => "battle_lost",
            _ => self.kind.name(),
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.result {
            ActionResult::Skipped(reason) => {
                write!(f, "{}_skipped_{}", self.kind.name(), reason.name())
            }
            _ => f.write_str(self.label()),
        }
    }
}

/// Strip a `_skipped_<reason>` suffix from a rendered action name.
pub fn base_action_name(name: &str) -> &str {
    name.split("_skipped_").next().unwrap_or(name)
}
