//! Shared primitive types used across the economy.

/// A stable, unique identifier for an item, egg or pet.
pub type EntityId = String;

/// Index of a bot within a campaign.
pub type BotId = u32;

/// Number of battle slots in the wave formation.
pub const BATTLE_SLOTS: usize = 5;
