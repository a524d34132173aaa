//! Turns raw battle log entries into ranked team battle records.

pub mod classification;
mod errors;
pub mod models;
mod parser;

pub use classification::{classify, MatchClass};
pub use errors::ParseError;
pub use models::{Participant, ParsedBattle};
pub use parser::{
    match_id, outcome_from_result, parse_battle, parse_battle_log, parse_battle_time,
    RANKED_TEAM_BATTLE,
};
