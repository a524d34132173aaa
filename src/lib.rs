// Library crate for the club league tracker
// This file exposes the public API for the binary and integration tests

pub mod api;
pub mod battlelog;
pub mod calendar;
pub mod config;
pub mod history;
pub mod ingest;
pub mod lookup;
pub mod rating;
pub mod shared;
pub mod store;
pub mod tag;

// Re-export commonly used types for easier access in tests
pub use api::{BrawlStarsClient, GameApi, InMemoryGameApi};
pub use config::Config;
pub use history::HistoryService;
pub use ingest::{IngestSettings, IngestionService};
pub use lookup::{ClubFilter, LookupService, Page, SearchResult};
pub use rating::{RatingService, SaveMode};
pub use shared::{AppError, AppState};
pub use store::{InMemoryStore, PostgresStore, Store};
