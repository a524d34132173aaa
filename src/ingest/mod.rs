//! Battle log ingestion.
//!
//! A batch fetches profiles and battle logs for many players at once, stores
//! every new ranked match exactly once, and writes the refreshed players in a
//! single bulk update.

mod builder;
mod cache;
mod materialize;
pub mod service;
mod tickets;

pub use builder::PlayerUpdateBuilder;
pub use cache::ReferenceCache;
pub use materialize::{materialize_battles, MatchMaterializer, MaterializeReport};
pub use service::{BatchReport, IngestSettings, IngestionService, SweepReport};
pub use tickets::{remaining_tickets, tickets_spent};
