//! Loot-game economy simulation and invariant fuzzer.
//!
//! A bot drives a GameState through random player actions; after each one
//! the validator inspects the result. Everything a bot does is derived from
//! its seed, so any finding replays exactly.

pub mod action;
pub mod action_library;
pub mod battle;
pub mod config;
pub mod error;
pub mod fuzz;
pub mod loot;
pub mod report;
pub mod rng;
pub mod state;
pub mod store;
pub mod types;
pub mod validator;

pub use action::{ActionKind, ActionOutcome, ActionResult, SkipReason};
pub use action_library::apply_action;
pub use config::GameConfig;
pub use error::{SimError, SimResult};
pub use fuzz::{run_bot, run_campaign, BotResult, CampaignConfig, Policy};
pub use report::{render_report, CampaignSummary};
pub use state::{create_initial_state, GameState};
pub use validator::{validate, BugReport, Severity};
