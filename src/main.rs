use brawlclub::{
    AppError, AppState, BrawlStarsClient, Config, HistoryService, IngestSettings,
    IngestionService, InMemoryStore, LookupService, PostgresStore, RatingService, SaveMode,
    SearchResult, Store,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "brawlclub", about = "Club league tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh every stale player
    UpdateAll {
        /// Ignore staleness and remaining tickets
        #[arg(long)]
        force: bool,
    },
    /// Refresh one player, tracking them if new
    UpdatePlayer { tag: String },
    /// Refresh a club and its roster
    UpdateClub { tag: String },
    /// Track every member of known clubs
    DiscoverPlayers,
    /// Append a history snapshot for every player
    SnapshotHistory,
    /// Recompute and save one player's rating
    RatePlayer { tag: String },
    /// Resolve a tag to a player or club
    Search { tag: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brawlclub=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), AppError> {
    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PostgresStore::connect(url).await?),
        None => {
            warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };
    let api = Arc::new(BrawlStarsClient::from_config(&config)?);
    let state = AppState::new(store.clone(), api);

    let rating = Arc::new(RatingService::builder(store.clone()).build()?);
    let ingestion = Arc::new(IngestionService::new(
        &state,
        rating.clone(),
        IngestSettings::from_config(&config),
    ));

    let now = Utc::now();
    match command {
        Command::UpdateAll { force } => {
            let report = ingestion.update_all(now, force).await?;
            info!(
                league_active = report.league_active,
                candidates = report.candidates,
                batches = report.batches,
                failed_batches = report.failed_batches,
                players_updated = report.players_updated,
                "Sweep finished"
            );
        }
        Command::UpdatePlayer { tag } => {
            let player = ingestion.ingest_player(&tag, now).await?;
            info!(
                player_tag = %player.player_tag,
                trophies = player.trophy_count,
                rating = player.brawlclub_rating,
                "Player updated"
            );
        }
        Command::UpdateClub { tag } => {
            let club = ingestion.ingest_club_members(&tag, now).await?;
            info!(club_tag = %club.club_tag, name = %club.club_name, "Club updated");
        }
        Command::DiscoverPlayers => {
            let created = ingestion.discover_new_players(now).await?;
            info!(created, "Discovery finished");
        }
        Command::SnapshotHistory => {
            let written = HistoryService::new(store).snapshot_all_players(now).await?;
            info!(written, "History snapshots written");
        }
        Command::RatePlayer { tag } => {
            let tag = brawlclub::tag::normalize(&tag)?;
            let player = rating.update_rating(&tag, now, SaveMode::Immediate).await?;
            info!(
                player_tag = %player.player_tag,
                rating = player.brawlclub_rating,
                win_rate = player.club_league_winrate,
                play_rate = player.club_league_playrate,
                teamplay_rate = player.club_league_teamplay_rate,
                "Rating saved"
            );
        }
        Command::Search { tag } => match LookupService::new(&state, ingestion).search(&tag, now).await? {
            SearchResult::Player(player) => {
                info!(player_tag = %player.player_tag, name = %player.player_name, "Found player");
            }
            SearchResult::Club(club) => {
                info!(club_tag = %club.club_tag, name = %club.club_name, "Found club");
            }
        },
    }

    Ok(())
}
