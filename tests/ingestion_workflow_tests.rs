use brawlclub::{
    store::{
        BattleType, ClubModel, ClubRepository, HistoryRepository, Outcome, PlayerModel,
        PlayerRepository,
    },
    AppError, HistoryService, SaveMode, SearchResult,
};
use chrono::{Duration, TimeZone, Utc};

mod utils;

use utils::*;

fn tags(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|t| t.to_string()).collect()
}

/// Stores a player whose rating window opened early on the league Wednesday.
async fn pre_track(setup: &TestSetup, tag: &str) {
    let origin = Utc.with_ymd_and_hms(2022, 10, 26, 0, 30, 0).unwrap();
    setup
        .store
        .create_players(&[PlayerModel::new(tag.to_string(), origin)])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ranked_victory_is_materialized() {
    let setup = TestSetupBuilder::new()
        .with_player(
            profile("#P1", 30616, Some("#C1")),
            battle_log(vec![BattleBuilder::ranked("#P1").build()]),
        )
        .with_club(club("#C1"), &["#P1"])
        .build();

    let report = setup
        .ingestion
        .ingest_batch(&tags(&["#P1"]), league_evening())
        .await
        .unwrap();

    assert_eq!(report.matches_created, 1);
    assert_eq!(report.issues_created, 1);
    assert_eq!(setup.store.match_count(), 1);
    assert_eq!(setup.store.match_issue_count(), 1);

    let battle_time = Utc.with_ymd_and_hms(2022, 10, 26, 17, 45, 24).unwrap();
    let played = setup
        .store
        .get_match(&format!("P1{}", battle_time.timestamp()))
        .expect("match stored under the star player id");
    assert_eq!(played.battle_type, BattleType::PowerMatch);
    assert_eq!(played.battle_type.to_string(), "Power Match");
    assert_eq!(played.date, battle_time);

    let issues = setup.store.issues_for("#P1");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].outcome, Outcome::Win);
    assert_eq!(issues[0].trophies_won, 9);
    assert!(issues[0].played_with_clubmate);
    assert!(issues[0].is_star_player);

    let player = setup.store.get_player("#P1").await.unwrap().unwrap();
    assert_eq!(player.trophy_count, 30616);
    assert_eq!(player.club_tag.as_deref(), Some("#C1"));
    assert_eq!(player.player_name, "Player P1");
    assert_eq!(player.last_updated, Some(league_evening()));
    // 4 tickets granted on Wednesday, one power match played
    assert_eq!(player.number_of_available_tickets, 2);
}

#[tokio::test]
async fn test_reingesting_same_log_creates_nothing_new() {
    let log = battle_log(vec![
        BattleBuilder::ranked("#P1").build(),
        BattleBuilder::ranked("#P1")
            .with_result("defeat", 2)
            .with_star_player("#OPP1")
            .at("20221026T180000.000Z")
            .build(),
        BattleBuilder::ranked("#P1").with_type("friendly").build(),
    ]);
    let setup = TestSetupBuilder::new()
        .with_player(profile("#P1", 30616, None), log)
        .build();

    setup
        .ingestion
        .ingest_batch(&tags(&["#P1"]), league_evening())
        .await
        .unwrap();
    let second = setup
        .ingestion
        .ingest_batch(&tags(&["#P1"]), league_evening())
        .await
        .unwrap();

    assert_eq!(second.matches_created, 0);
    assert_eq!(second.issues_created, 0);
    assert_eq!(setup.store.match_count(), 2);
    assert_eq!(setup.store.match_issue_count(), 2);
}

#[tokio::test]
async fn test_clubmates_share_one_match() {
    let setup = TestSetupBuilder::new()
        .with_player(
            profile("#P1", 30000, Some("#C1")),
            battle_log(vec![BattleBuilder::ranked("#P1")
                .with_teammates(&["#P2", "#MATE2"])
                .build()]),
        )
        .with_player(
            profile("#P2", 25000, Some("#C1")),
            battle_log(vec![BattleBuilder::ranked("#P2")
                .with_teammates(&["#P1", "#MATE2"])
                .with_star_player("#P1")
                .build()]),
        )
        .with_club(club("#C1"), &["#P1", "#P2"])
        .build();

    setup
        .ingestion
        .ingest_batch(&tags(&["#P1", "#P2"]), league_evening())
        .await
        .unwrap();

    assert_eq!(setup.store.match_count(), 1);
    assert_eq!(setup.store.match_issue_count(), 2);
    assert!(!setup.store.issues_for("#P2")[0].is_star_player);
}

#[tokio::test]
async fn test_new_club_shared_by_fifty_players_is_created_once() {
    let mut builder = TestSetupBuilder::new().with_club(club("#NEWCLUB"), &[]);
    let members: Vec<String> = (0..50).map(|i| format!("#M{i}")).collect();
    for tag in &members {
        builder = builder.with_player(profile(tag, 10000, Some("#NEWCLUB")), battle_log(vec![]));
    }
    let setup = builder.build();

    let report = setup
        .ingestion
        .ingest_batch(&members, league_evening())
        .await
        .unwrap();

    assert_eq!(report.clubs_created, 1);
    assert_eq!(report.players_created, 50);
    assert_eq!(setup.store.club_count(), 1);
    assert_eq!(setup.api.call_count("club_info"), 1);
    assert_eq!(
        setup.store.club_members("#NEWCLUB").await.unwrap().len(),
        50
    );
}

#[tokio::test]
async fn test_unfetchable_player_is_left_out_of_batch() {
    let setup = TestSetupBuilder::new()
        .with_player(profile("#GOOD", 5000, None), battle_log(vec![]))
        .with_player(profile("#BAD", 5000, None), battle_log(vec![]))
        .with_failing("#BAD")
        .build();

    let report = setup
        .ingestion
        .ingest_batch(&tags(&["#GOOD", "#BAD"]), league_evening())
        .await
        .unwrap();

    assert_eq!(report.requested, 2);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.players_updated, 1);
    assert!(setup.store.get_player("#BAD").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rating_follows_league_activity() {
    let setup = TestSetupBuilder::new()
        .with_player(
            profile("#P1", 30616, Some("#C1")),
            battle_log(vec![BattleBuilder::ranked("#P1").build()]),
        )
        .with_club(club("#C1"), &["#P1"])
        .build();
    pre_track(&setup, "#P1").await;

    setup
        .ingestion
        .ingest_batch(&tags(&["#P1"]), league_evening())
        .await
        .unwrap();

    let player = setup.store.get_player("#P1").await.unwrap().unwrap();
    // 8 tickets out since tracking started, 2 spent on a won power match with a clubmate
    assert_eq!(player.club_league_playrate, 0.25);
    assert_eq!(player.club_league_winrate, 1.0);
    assert_eq!(player.club_league_teamplay_rate, 1.0);
    assert!((player.brawlclub_rating - 62.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_ineligible_player_keeps_zero_rating() {
    let setup = TestSetupBuilder::new()
        .with_player(
            profile("#LOW", 500, Some("#C1")),
            battle_log(vec![BattleBuilder::ranked("#LOW").build()]),
        )
        .with_club(club("#C1"), &["#LOW"])
        .build();
    pre_track(&setup, "#LOW").await;

    let report = setup
        .ingestion
        .ingest_batch(&tags(&["#LOW"]), league_evening())
        .await
        .unwrap();
    assert_eq!(report.players_rated, 0);

    let stored = setup.store.get_player("#LOW").await.unwrap().unwrap();
    let returned = setup
        .rating
        .update_rating("#LOW", league_evening(), SaveMode::Immediate)
        .await
        .unwrap();
    assert_eq!(returned, stored);
    assert_eq!(returned.brawlclub_rating, 0.0);
}

#[tokio::test]
async fn test_club_ingestion_detaches_former_members() {
    let setup = TestSetupBuilder::new()
        .with_player(profile("#P1", 20000, Some("#C1")), battle_log(vec![]))
        .with_player(profile("#P2", 21000, Some("#C1")), battle_log(vec![]))
        .with_club(club("#C1"), &["#P1", "#P2"])
        .build();

    let now = league_evening();
    setup
        .store
        .create_clubs(&[ClubModel::from_info(&club("#C1"), now - Duration::days(3))])
        .await
        .unwrap();
    let mut former = PlayerModel::new("#OLD".to_string(), now - Duration::days(30));
    former.club_tag = Some("#C1".to_string());
    setup.store.create_players(&[former]).await.unwrap();

    let stored_club = setup.ingestion.ingest_club_members("c1", now).await.unwrap();

    assert_eq!(stored_club.club_tag, "#C1");
    let old = setup.store.get_player("#OLD").await.unwrap().unwrap();
    assert_eq!(old.club_tag, None);

    let mut members: Vec<String> = setup
        .store
        .club_members("#C1")
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.player_tag)
        .collect();
    members.sort();
    assert_eq!(members, vec!["#P1", "#P2"]);
}

#[tokio::test]
async fn test_discovery_adds_placeholder_members() {
    let setup = TestSetupBuilder::new()
        .with_club(club("#C1"), &["#KNOWN", "#NEW1", "#NEW2"])
        .build();
    let now = league_evening();
    setup
        .store
        .create_clubs(&[ClubModel::from_info(&club("#C1"), now)])
        .await
        .unwrap();
    setup
        .store
        .create_players(&[PlayerModel::new("#KNOWN".to_string(), now)])
        .await
        .unwrap();

    let created = setup.ingestion.discover_new_players(now).await.unwrap();

    assert_eq!(created, 2);
    let fresh = setup.store.get_player("#NEW1").await.unwrap().unwrap();
    assert_eq!(fresh.player_name, "Not Fetched Yet");
    assert_eq!(fresh.club_tag.as_deref(), Some("#C1"));
    assert_eq!(fresh.tracking_start, now);
}

#[tokio::test]
async fn test_sweep_outside_league_resets_tickets_and_fetches_nobody() {
    let setup = TestSetupBuilder::new()
        .with_player(profile("#P1", 5000, None), battle_log(vec![]))
        .build();
    let mut player = PlayerModel::new("#P1".to_string(), off_day() - Duration::days(10));
    player.number_of_available_tickets = 3;
    setup.store.create_players(&[player]).await.unwrap();

    let report = setup.ingestion.update_all(off_day(), false).await.unwrap();

    assert!(!report.league_active);
    assert_eq!(report.candidates, 0);
    assert_eq!(setup.api.call_count("player_profile"), 0);
    let stored = setup.store.get_player("#P1").await.unwrap().unwrap();
    assert_eq!(stored.number_of_available_tickets, 0);
}

#[tokio::test]
async fn test_forced_sweep_refreshes_everyone_in_batches() {
    let setup = TestSetupBuilder::new()
        .with_player(profile("#P1", 5000, None), battle_log(vec![]))
        .with_player(profile("#P2", 6000, None), battle_log(vec![]))
        .with_player(profile("#P3", 7000, None), battle_log(vec![]))
        .with_batch_size(2)
        .build();
    let now = league_evening();
    let players: Vec<PlayerModel> = ["#P1", "#P2", "#P3"]
        .iter()
        .map(|tag| {
            let mut player = PlayerModel::new(tag.to_string(), now - Duration::days(2));
            player.last_updated = Some(now - Duration::minutes(5));
            player
        })
        .collect();
    setup.store.create_players(&players).await.unwrap();

    let lazy = setup.ingestion.update_all(now, false).await.unwrap();
    assert_eq!(lazy.candidates, 0);

    let forced = setup.ingestion.update_all(now, true).await.unwrap();
    assert!(forced.league_active);
    assert_eq!(forced.candidates, 3);
    assert_eq!(forced.batches, 2);
    assert_eq!(forced.failed_batches, 0);
    assert_eq!(forced.players_updated, 3);
    let refreshed = setup.store.get_player("#P3").await.unwrap().unwrap();
    assert_eq!(refreshed.trophy_count, 7000);
}

#[tokio::test]
async fn test_search_tracks_unknown_club() {
    let setup = TestSetupBuilder::new()
        .with_player(profile("#P1", 20000, Some("#CLUBX")), battle_log(vec![]))
        .with_club(club("#CLUBX"), &["#P1"])
        .build();

    let found = setup
        .lookup
        .search(" clubx ", league_evening())
        .await
        .unwrap();

    match found {
        SearchResult::Club(club) => {
            assert_eq!(club.club_tag, "#CLUBX");
            assert!(club.has_been_searched);
        }
        other => panic!("expected a club, got {other:?}"),
    }
    let stored = setup.store.get_club("#CLUBX").await.unwrap().unwrap();
    assert!(stored.has_been_searched);
    assert_eq!(
        setup.lookup.club_members("#CLUBX").await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_search_rejects_malformed_tag() {
    let setup = TestSetupBuilder::new().build();
    let result = setup.lookup.search("#NOT A TAG!", league_evening()).await;
    assert!(matches!(result, Err(AppError::InvalidTag(_))));
}

#[tokio::test]
async fn test_history_area_graph_keeps_latest_points() {
    let setup = TestSetupBuilder::new()
        .with_player(profile("#P1", 30616, None), battle_log(vec![]))
        .build();
    setup
        .ingestion
        .ingest_player("#p1", league_evening())
        .await
        .unwrap();

    let history = HistoryService::new(setup.store.clone());
    for day in 0..10 {
        let written = history
            .snapshot_all_players(league_evening() + Duration::days(day))
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    let graph = history.area_graph("p1").await.unwrap();
    assert_eq!(graph.len(), 8);
    assert_eq!(graph[0].snapshot_date, league_evening() + Duration::days(2));
    assert_eq!(graph[7].snapshot_date, league_evening() + Duration::days(9));
    assert!(graph.iter().all(|point| point.trophy_count == 30616));
    assert_eq!(
        setup.store.recent_history("#P1", 100).await.unwrap().len(),
        10
    );
}
