use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use super::models::{
    BattleType, BrawlerModel, ClubModel, ClubStanding, ClubType, MapModel, MatchIssueModel,
    MatchModel, Outcome, Participation, PlayerHistoryModel, PlayerModel,
};
use super::repository::{
    ClubRepository, HistoryRepository, MatchRepository, PlayerRepository, ReferenceRepository,
};
use crate::shared::AppError;

const PLAYER_COLUMNS: &str = "player_tag, player_name, trophy_count, club_tag, level, \
    total_3v3_wins, solo_wins, duo_wins, total_club_war_trophy_count, brawlclub_rating, \
    club_league_winrate, club_league_playrate, club_league_teamplay_rate, tracking_start, \
    last_updated, has_been_searched, number_of_available_tickets";

const CLUB_COLUMNS: &str = "club_tag, club_name, club_description, club_type, trophies, \
    required_trophies, has_been_searched, last_updated";

const MATCH_COLUMNS: &str = "match_id, mode, map_id, battle_type, date";

const ISSUE_COLUMNS: &str = "match_id, player_tag, brawler_id, outcome, trophies_won, \
    is_star_player, played_with_clubmate";

const HISTORY_COLUMNS: &str = "player_tag, trophy_count, total_club_war_trophy_count, \
    brawlclub_rating, club_league_winrate, club_league_playrate, club_league_teamplay_rate, \
    snapshot_date";

/// Bind parameters Postgres accepts in a single statement.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Rows of `columns` that fit in one multi-row INSERT.
fn rows_per_insert(columns: &str) -> usize {
    (MAX_BIND_PARAMS / columns.split(',').count()).max(1)
}

fn db_error(operation: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| {
        warn!(error = %e, operation, "Database operation failed");
        AppError::DatabaseError(e.to_string())
    }
}

fn parse_column<T: FromStr>(row: &PgRow, column: &str) -> Result<T, AppError> {
    let raw: String = row.get(column);
    T::from_str(&raw).map_err(|_| {
        warn!(column, value = %raw, "Unrecognised value stored in column");
        AppError::DatabaseError(format!("Unrecognised {column} value: {raw}"))
    })
}

fn club_from_row(row: &PgRow) -> Result<ClubModel, AppError> {
    Ok(ClubModel {
        club_tag: row.get("club_tag"),
        club_name: row.get("club_name"),
        club_description: row.get("club_description"),
        club_type: parse_column::<ClubType>(row, "club_type")?,
        trophies: row.get("trophies"),
        required_trophies: row.get("required_trophies"),
        has_been_searched: row.get("has_been_searched"),
        last_updated: row.get("last_updated"),
    })
}

fn insert_players(rows: &[PlayerModel]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO players ({PLAYER_COLUMNS}) "));
    builder.push_values(rows, |mut row, player| {
        row.push_bind(&player.player_tag)
            .push_bind(&player.player_name)
            .push_bind(player.trophy_count)
            .push_bind(&player.club_tag)
            .push_bind(player.level)
            .push_bind(player.total_3v3_wins)
            .push_bind(player.solo_wins)
            .push_bind(player.duo_wins)
            .push_bind(player.total_club_war_trophy_count)
            .push_bind(player.brawlclub_rating)
            .push_bind(player.club_league_winrate)
            .push_bind(player.club_league_playrate)
            .push_bind(player.club_league_teamplay_rate)
            .push_bind(player.tracking_start)
            .push_bind(player.last_updated)
            .push_bind(player.has_been_searched)
            .push_bind(player.number_of_available_tickets);
    });
    builder
}

fn insert_clubs(rows: &[ClubModel]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO clubs ({CLUB_COLUMNS}) "));
    builder.push_values(rows, |mut row, club| {
        row.push_bind(&club.club_tag)
            .push_bind(&club.club_name)
            .push_bind(&club.club_description)
            .push_bind(club.club_type.to_string())
            .push_bind(club.trophies)
            .push_bind(club.required_trophies)
            .push_bind(club.has_been_searched)
            .push_bind(club.last_updated);
    });
    builder
}

fn insert_matches(rows: &[MatchModel]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO matches ({MATCH_COLUMNS}) "));
    builder.push_values(rows, |mut row, new_match| {
        row.push_bind(&new_match.match_id)
            .push_bind(&new_match.mode)
            .push_bind(new_match.map_id)
            .push_bind(new_match.battle_type.to_string())
            .push_bind(new_match.date);
    });
    builder
}

fn insert_match_issues(rows: &[MatchIssueModel]) -> QueryBuilder<'_, Postgres> {
    let mut builder =
        QueryBuilder::new(format!("INSERT INTO match_issues ({ISSUE_COLUMNS}) "));
    builder.push_values(rows, |mut row, issue| {
        row.push_bind(&issue.match_id)
            .push_bind(&issue.player_tag)
            .push_bind(issue.brawler_id)
            .push_bind(issue.outcome.to_string())
            .push_bind(issue.trophies_won)
            .push_bind(issue.is_star_player)
            .push_bind(issue.played_with_clubmate);
    });
    builder
}

fn insert_player_history(rows: &[PlayerHistoryModel]) -> QueryBuilder<'_, Postgres> {
    let mut builder =
        QueryBuilder::new(format!("INSERT INTO player_history ({HISTORY_COLUMNS}) "));
    builder.push_values(rows, |mut row, snapshot| {
        row.push_bind(&snapshot.player_tag)
            .push_bind(snapshot.trophy_count)
            .push_bind(snapshot.total_club_war_trophy_count)
            .push_bind(snapshot.brawlclub_rating)
            .push_bind(snapshot.club_league_winrate)
            .push_bind(snapshot.club_league_playrate)
            .push_bind(snapshot.club_league_teamplay_rate)
            .push_bind(snapshot.snapshot_date);
    });
    builder
}

/// PostgreSQL implementation of every repository trait
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(db_error("connect"))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to run migrations");
                AppError::DatabaseError(e.to_string())
            })?;

        info!("Connected to database and applied migrations");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl PlayerRepository for PostgresStore {
    #[instrument(skip(self))]
    async fn get_player(&self, player_tag: &str) -> Result<Option<PlayerModel>, AppError> {
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE player_tag = $1"
        ))
        .bind(player_tag)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_player"))
    }

    async fn get_players(&self, player_tags: &[String]) -> Result<Vec<PlayerModel>, AppError> {
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE player_tag = ANY($1)"
        ))
        .bind(player_tags)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("get_players"))
    }

    async fn list_players(&self) -> Result<Vec<PlayerModel>, AppError> {
        sqlx::query_as::<_, PlayerModel>(&format!("SELECT {PLAYER_COLUMNS} FROM players"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_players"))
    }

    async fn existing_player_tags(
        &self,
        player_tags: &[String],
    ) -> Result<HashSet<String>, AppError> {
        let rows = sqlx::query("SELECT player_tag FROM players WHERE player_tag = ANY($1)")
            .bind(player_tags)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("existing_player_tags"))?;
        Ok(rows.iter().map(|row| row.get("player_tag")).collect())
    }

    #[instrument(skip(self, players), fields(count = players.len()))]
    async fn create_players(&self, players: &[PlayerModel]) -> Result<u64, AppError> {
        if players.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_error("create_players"))?;
        let mut inserted = 0;
        for chunk in players.chunks(rows_per_insert(PLAYER_COLUMNS)) {
            let mut builder = insert_players(chunk);
            inserted += builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db_error("create_players"))?
                .rows_affected();
        }
        tx.commit().await.map_err(db_error("create_players"))?;

        debug!(rows = inserted, "Players inserted");
        Ok(inserted)
    }

    #[instrument(skip(self, players), fields(count = players.len()))]
    async fn bulk_update_players(&self, players: &[PlayerModel]) -> Result<u64, AppError> {
        if players.is_empty() {
            return Ok(0);
        }

        let tags: Vec<&str> = players.iter().map(|p| p.player_tag.as_str()).collect();
        let names: Vec<&str> = players.iter().map(|p| p.player_name.as_str()).collect();
        let trophies: Vec<i32> = players.iter().map(|p| p.trophy_count).collect();
        let clubs: Vec<Option<String>> = players.iter().map(|p| p.club_tag.clone()).collect();
        let levels: Vec<i32> = players.iter().map(|p| p.level).collect();
        let wins_3v3: Vec<i32> = players.iter().map(|p| p.total_3v3_wins).collect();
        let solo: Vec<i32> = players.iter().map(|p| p.solo_wins).collect();
        let duo: Vec<i32> = players.iter().map(|p| p.duo_wins).collect();
        let war: Vec<i32> = players
            .iter()
            .map(|p| p.total_club_war_trophy_count)
            .collect();
        let ratings: Vec<f64> = players.iter().map(|p| p.brawlclub_rating).collect();
        let winrates: Vec<f64> = players.iter().map(|p| p.club_league_winrate).collect();
        let playrates: Vec<f64> = players.iter().map(|p| p.club_league_playrate).collect();
        let teamplay: Vec<f64> = players
            .iter()
            .map(|p| p.club_league_teamplay_rate)
            .collect();
        let updated: Vec<Option<DateTime<Utc>>> = players.iter().map(|p| p.last_updated).collect();
        let searched: Vec<bool> = players.iter().map(|p| p.has_been_searched).collect();
        let tickets: Vec<i32> = players
            .iter()
            .map(|p| p.number_of_available_tickets)
            .collect();

        let result = sqlx::query(
            "UPDATE players AS p SET
                player_name = u.player_name,
                trophy_count = u.trophy_count,
                club_tag = u.club_tag,
                level = u.level,
                total_3v3_wins = u.total_3v3_wins,
                solo_wins = u.solo_wins,
                duo_wins = u.duo_wins,
                total_club_war_trophy_count = u.total_club_war_trophy_count,
                brawlclub_rating = u.brawlclub_rating,
                club_league_winrate = u.club_league_winrate,
                club_league_playrate = u.club_league_playrate,
                club_league_teamplay_rate = u.club_league_teamplay_rate,
                last_updated = u.last_updated,
                has_been_searched = u.has_been_searched,
                number_of_available_tickets = u.number_of_available_tickets
            FROM UNNEST(
                $1::text[], $2::text[], $3::int4[], $4::text[], $5::int4[], $6::int4[],
                $7::int4[], $8::int4[], $9::int4[], $10::float8[], $11::float8[],
                $12::float8[], $13::float8[], $14::timestamptz[], $15::bool[], $16::int4[]
            ) AS u(
                player_tag, player_name, trophy_count, club_tag, level, total_3v3_wins,
                solo_wins, duo_wins, total_club_war_trophy_count, brawlclub_rating,
                club_league_winrate, club_league_playrate, club_league_teamplay_rate,
                last_updated, has_been_searched, number_of_available_tickets
            )
            WHERE p.player_tag = u.player_tag",
        )
        .bind(&tags)
        .bind(&names)
        .bind(&trophies)
        .bind(&clubs)
        .bind(&levels)
        .bind(&wins_3v3)
        .bind(&solo)
        .bind(&duo)
        .bind(&war)
        .bind(&ratings)
        .bind(&winrates)
        .bind(&playrates)
        .bind(&teamplay)
        .bind(&updated)
        .bind(&searched)
        .bind(&tickets)
        .execute(&self.pool)
        .await
        .map_err(db_error("bulk_update_players"))?;

        debug!(rows = result.rows_affected(), "Players updated");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn reset_all_tickets(&self) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE players SET number_of_available_tickets = 0")
            .execute(&self.pool)
            .await
            .map_err(db_error("reset_all_tickets"))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn replenish_tickets(
        &self,
        updated_before: DateTime<Utc>,
        tickets: i32,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE players SET number_of_available_tickets = $2
             WHERE last_updated IS NULL OR last_updated < $1",
        )
        .bind(updated_before)
        .bind(tickets)
        .execute(&self.pool)
        .await
        .map_err(db_error("replenish_tickets"))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn stale_player_tags(
        &self,
        updated_before: DateTime<Utc>,
        require_tickets: bool,
    ) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            "SELECT player_tag FROM players
             WHERE (last_updated IS NULL OR last_updated <= $1)
               AND ($2 = FALSE OR number_of_available_tickets > 0)
             ORDER BY brawlclub_rating DESC, last_updated ASC NULLS FIRST",
        )
        .bind(updated_before)
        .bind(require_tickets)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("stale_player_tags"))?;
        Ok(rows.iter().map(|row| row.get("player_tag")).collect())
    }

    async fn club_members(&self, club_tag: &str) -> Result<Vec<PlayerModel>, AppError> {
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE club_tag = $1
             ORDER BY brawlclub_rating DESC"
        ))
        .bind(club_tag)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("club_members"))
    }

    #[instrument(skip(self, roster), fields(roster_size = roster.len()))]
    async fn detach_former_members(
        &self,
        club_tag: &str,
        roster: &[String],
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE players SET club_tag = NULL
             WHERE club_tag = $1 AND NOT (player_tag = ANY($2))",
        )
        .bind(club_tag)
        .bind(roster)
        .execute(&self.pool)
        .await
        .map_err(db_error("detach_former_members"))?;
        Ok(result.rows_affected())
    }

    async fn top_players(&self, limit: usize, offset: usize) -> Result<Vec<PlayerModel>, AppError> {
        sqlx::query_as::<_, PlayerModel>(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players
             ORDER BY brawlclub_rating DESC, trophy_count DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("top_players"))
    }

    async fn mark_player_searched(&self, player_tag: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE players SET has_been_searched = TRUE WHERE player_tag = $1")
            .bind(player_tag)
            .execute(&self.pool)
            .await
            .map_err(db_error("mark_player_searched"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Player {player_tag}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ClubRepository for PostgresStore {
    #[instrument(skip(self))]
    async fn get_club(&self, club_tag: &str) -> Result<Option<ClubModel>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {CLUB_COLUMNS} FROM clubs WHERE club_tag = $1"
        ))
        .bind(club_tag)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("get_club"))?;

        row.as_ref().map(club_from_row).transpose()
    }

    async fn list_club_tags(&self) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query("SELECT club_tag FROM clubs")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_club_tags"))?;
        Ok(rows.iter().map(|row| row.get("club_tag")).collect())
    }

    async fn existing_club_tags(&self, club_tags: &[String]) -> Result<HashSet<String>, AppError> {
        let rows = sqlx::query("SELECT club_tag FROM clubs WHERE club_tag = ANY($1)")
            .bind(club_tags)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("existing_club_tags"))?;
        Ok(rows.iter().map(|row| row.get("club_tag")).collect())
    }

    #[instrument(skip(self, clubs), fields(count = clubs.len()))]
    async fn create_clubs(&self, clubs: &[ClubModel]) -> Result<u64, AppError> {
        if clubs.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_error("create_clubs"))?;
        let mut inserted = 0;
        for chunk in clubs.chunks(rows_per_insert(CLUB_COLUMNS)) {
            let mut builder = insert_clubs(chunk);
            inserted += builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db_error("create_clubs"))?
                .rows_affected();
        }
        tx.commit().await.map_err(db_error("create_clubs"))?;
        Ok(inserted)
    }

    #[instrument(skip(self, club), fields(club_tag = %club.club_tag))]
    async fn upsert_club(&self, club: &ClubModel) -> Result<bool, AppError> {
        let row = sqlx::query(&format!(
            "INSERT INTO clubs ({CLUB_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (club_tag) DO UPDATE SET
                club_name = EXCLUDED.club_name,
                club_description = EXCLUDED.club_description,
                club_type = EXCLUDED.club_type,
                trophies = EXCLUDED.trophies,
                required_trophies = EXCLUDED.required_trophies,
                has_been_searched = clubs.has_been_searched OR EXCLUDED.has_been_searched,
                last_updated = EXCLUDED.last_updated
             RETURNING (xmax = 0) AS created"
        ))
        .bind(&club.club_tag)
        .bind(&club.club_name)
        .bind(&club.club_description)
        .bind(club.club_type.to_string())
        .bind(club.trophies)
        .bind(club.required_trophies)
        .bind(club.has_been_searched)
        .bind(club.last_updated)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("upsert_club"))?;

        Ok(row.get("created"))
    }

    #[instrument(skip(self))]
    async fn delete_club(&self, club_tag: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM clubs WHERE club_tag = $1")
            .bind(club_tag)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_club"))?;

        if result.rows_affected() == 0 {
            warn!(club_tag = %club_tag, "Club not found for deletion");
            return Err(AppError::NotFound(format!("Club {club_tag}")));
        }
        Ok(())
    }

    async fn club_standings(&self) -> Result<Vec<ClubStanding>, AppError> {
        let rows = sqlx::query(
            "SELECT c.club_tag, c.club_name, c.club_description, c.club_type, c.trophies,
                    c.required_trophies, c.has_been_searched, c.last_updated,
                    COUNT(p.player_tag) AS member_count,
                    COALESCE(AVG(p.brawlclub_rating), 0)::float8 AS average_rating,
                    COALESCE(SUM(p.trophy_count), 0)::int8 AS total_member_trophies
             FROM clubs c
             LEFT JOIN players p ON p.club_tag = c.club_tag
             GROUP BY c.club_tag",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("club_standings"))?;

        rows.iter()
            .map(|row| {
                let member_count: i64 = row.get("member_count");
                Ok(ClubStanding {
                    club: club_from_row(row)?,
                    member_count: member_count as usize,
                    average_rating: row.get("average_rating"),
                    total_member_trophies: row.get("total_member_trophies"),
                })
            })
            .collect()
    }

    async fn mark_club_searched(&self, club_tag: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE clubs SET has_been_searched = TRUE WHERE club_tag = $1")
            .bind(club_tag)
            .execute(&self.pool)
            .await
            .map_err(db_error("mark_club_searched"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Club {club_tag}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ReferenceRepository for PostgresStore {
    async fn list_brawlers(&self) -> Result<Vec<BrawlerModel>, AppError> {
        sqlx::query_as::<_, BrawlerModel>("SELECT id, name FROM brawlers")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_brawlers"))
    }

    #[instrument(skip(self))]
    async fn get_or_create_brawler(&self, name: &str) -> Result<BrawlerModel, AppError> {
        sqlx::query("INSERT INTO brawlers (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(db_error("insert_brawler"))?;

        sqlx::query_as::<_, BrawlerModel>("SELECT id, name FROM brawlers WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("get_brawler"))
    }

    async fn list_maps(&self) -> Result<Vec<MapModel>, AppError> {
        sqlx::query_as::<_, MapModel>("SELECT id, name FROM maps")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_maps"))
    }

    #[instrument(skip(self))]
    async fn get_or_create_map(&self, name: &str) -> Result<MapModel, AppError> {
        sqlx::query("INSERT INTO maps (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(db_error("insert_map"))?;

        sqlx::query_as::<_, MapModel>("SELECT id, name FROM maps WHERE name = $1")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("get_map"))
    }
}

#[async_trait]
impl MatchRepository for PostgresStore {
    async fn existing_match_ids(&self, match_ids: &[String]) -> Result<HashSet<String>, AppError> {
        let rows = sqlx::query("SELECT match_id FROM matches WHERE match_id = ANY($1)")
            .bind(match_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("existing_match_ids"))?;
        Ok(rows.iter().map(|row| row.get("match_id")).collect())
    }

    #[instrument(skip(self, matches), fields(count = matches.len()))]
    async fn create_matches(&self, matches: &[MatchModel]) -> Result<u64, AppError> {
        if matches.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_error("create_matches"))?;
        let mut inserted = 0;
        for chunk in matches.chunks(rows_per_insert(MATCH_COLUMNS)) {
            let mut builder = insert_matches(chunk);
            inserted += builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db_error("create_matches"))?
                .rows_affected();
        }
        tx.commit().await.map_err(db_error("create_matches"))?;
        Ok(inserted)
    }

    async fn existing_issue_keys(
        &self,
        keys: &[(String, String)],
    ) -> Result<HashSet<(String, String)>, AppError> {
        if keys.is_empty() {
            return Ok(HashSet::new());
        }

        let (match_ids, player_tags): (Vec<&str>, Vec<&str>) = keys
            .iter()
            .map(|(match_id, player_tag)| (match_id.as_str(), player_tag.as_str()))
            .unzip();

        let rows = sqlx::query(
            "SELECT mi.match_id, mi.player_tag
             FROM match_issues mi
             JOIN UNNEST($1::text[], $2::text[]) AS k(match_id, player_tag)
               ON mi.match_id = k.match_id AND mi.player_tag = k.player_tag",
        )
        .bind(&match_ids)
        .bind(&player_tags)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("existing_issue_keys"))?;

        Ok(rows
            .iter()
            .map(|row| (row.get("match_id"), row.get("player_tag")))
            .collect())
    }

    #[instrument(skip(self, issues), fields(count = issues.len()))]
    async fn create_match_issues(&self, issues: &[MatchIssueModel]) -> Result<u64, AppError> {
        if issues.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_error("create_match_issues"))?;
        let mut inserted = 0;
        for chunk in issues.chunks(rows_per_insert(ISSUE_COLUMNS)) {
            let mut builder = insert_match_issues(chunk);
            inserted += builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db_error("create_match_issues"))?
                .rows_affected();
        }
        tx.commit().await.map_err(db_error("create_match_issues"))?;
        Ok(inserted)
    }

    #[instrument(skip(self, player_tags), fields(count = player_tags.len()))]
    async fn participations_since(
        &self,
        player_tags: &[String],
        since: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<Participation>>, AppError> {
        let rows = sqlx::query(
            "SELECT mi.player_tag, mi.outcome, mi.played_with_clubmate, m.battle_type, m.date
             FROM match_issues mi
             JOIN matches m ON m.match_id = mi.match_id
             WHERE mi.player_tag = ANY($1) AND m.date >= $2",
        )
        .bind(player_tags)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("participations_since"))?;

        let mut by_player: HashMap<String, Vec<Participation>> = HashMap::new();
        for row in &rows {
            by_player
                .entry(row.get("player_tag"))
                .or_default()
                .push(Participation {
                    outcome: parse_column::<Outcome>(row, "outcome")?,
                    played_with_clubmate: row.get("played_with_clubmate"),
                    battle_type: parse_column::<BattleType>(row, "battle_type")?,
                    date: row.get("date"),
                });
        }
        Ok(by_player)
    }
}

#[async_trait]
impl HistoryRepository for PostgresStore {
    #[instrument(skip(self, snapshots), fields(count = snapshots.len()))]
    async fn create_history(&self, snapshots: &[PlayerHistoryModel]) -> Result<u64, AppError> {
        if snapshots.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_error("create_history"))?;
        let mut inserted = 0;
        for chunk in snapshots.chunks(rows_per_insert(HISTORY_COLUMNS)) {
            let mut builder = insert_player_history(chunk);
            inserted += builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db_error("create_history"))?
                .rows_affected();
        }
        tx.commit().await.map_err(db_error("create_history"))?;
        Ok(inserted)
    }

    async fn recent_history(
        &self,
        player_tag: &str,
        limit: usize,
    ) -> Result<Vec<PlayerHistoryModel>, AppError> {
        sqlx::query_as::<_, PlayerHistoryModel>(
            "SELECT * FROM (
                SELECT player_tag, trophy_count, total_club_war_trophy_count, brawlclub_rating,
                       club_league_winrate, club_league_playrate, club_league_teamplay_rate,
                       snapshot_date
                FROM player_history
                WHERE player_tag = $1
                ORDER BY snapshot_date DESC
                LIMIT $2
             ) recent
             ORDER BY snapshot_date ASC",
        )
        .bind(player_tag)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("recent_history"))
    }
}
