pub mod fixtures;
pub mod setup;

// Re-export main utilities for use by test files
pub use fixtures::{battle_log, club, profile, BattleBuilder};
pub use setup::{league_evening, off_day, TestSetup, TestSetupBuilder};
