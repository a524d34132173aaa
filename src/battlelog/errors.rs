use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unreadable battle time {0:?}")]
    InvalidBattleTime(String),

    #[error("Player {0} is not on either team")]
    SubjectNotInBattle(String),

    #[error("Player {0} has no brawler in this battle")]
    MissingBrawler(String),
}
