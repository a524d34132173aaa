mod memory;
pub mod models;
mod postgres;
pub mod repository;

pub use memory::InMemoryStore;
pub use models::{
    BattleType, BrawlerModel, ClubModel, ClubStanding, ClubType, MapModel, MatchIssueModel,
    MatchModel, Outcome, Participation, PlayerHistoryModel, PlayerModel,
    CLUB_ELIGIBILITY_TROPHIES, PLACEHOLDER_PLAYER_NAME,
};
pub use postgres::PostgresStore;
pub use repository::{
    ClubRepository, HistoryRepository, MatchRepository, PlayerRepository, ReferenceRepository,
    Store,
};
