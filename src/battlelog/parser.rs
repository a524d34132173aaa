use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};

use super::{
    classification::classify,
    models::{Participant, ParsedBattle},
    ParseError,
};
use crate::api::models::{BattleEntry, BattleLog};
use crate::store::Outcome;
use crate::tag;

/// Battle type of ranked team battles, the only ones that count.
pub const RANKED_TEAM_BATTLE: &str = "teamRanked";

const BATTLE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.fZ";

pub fn parse_battle_time(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(raw, BATTLE_TIME_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| ParseError::InvalidBattleTime(raw.to_string()))
}

/// Deterministic id shared by every participant of the same match.
pub fn match_id(star_player_tag: &str, battle_time: DateTime<Utc>) -> String {
    format!("{}{}", tag::bare(star_player_tag), battle_time.timestamp())
}

pub fn outcome_from_result(result: Option<&str>) -> Outcome {
    match result {
        Some("victory") => Outcome::Win,
        Some("defeat") => Outcome::Loss,
        Some("draw") => Outcome::Draw,
        _ => Outcome::Unknown,
    }
}

/// Parses one entry of `player_tag`'s battle log.
///
/// Returns `Ok(None)` for anything other than a ranked team battle with a
/// trophy change.
pub fn parse_battle(player_tag: &str, entry: &BattleEntry) -> Result<Option<ParsedBattle>, ParseError> {
    let battle = &entry.battle;
    if battle.battle_type.as_deref() != Some(RANKED_TEAM_BATTLE) {
        return Ok(None);
    }
    let trophy_change = match battle.trophy_change {
        Some(change) if change != 0 => change,
        _ => return Ok(None),
    };

    let subject_team = battle
        .teams
        .iter()
        .position(|team| team.iter().any(|p| p.tag == player_tag))
        .ok_or_else(|| ParseError::SubjectNotInBattle(player_tag.to_string()))?;

    let outcome = outcome_from_result(battle.result.as_deref());
    let winning_team = match outcome {
        Outcome::Win => Some(subject_team),
        // Ranked battles always have exactly two teams
        Outcome::Loss if battle.teams.len() == 2 => Some(1 - subject_team),
        _ => None,
    }
    .map(|index| battle.teams[index].iter().map(|p| p.tag.clone()).collect());

    let participants: Vec<Participant> = battle
        .teams
        .iter()
        .flatten()
        .map(|p| Participant {
            tag: p.tag.clone(),
            brawler: p.brawler.as_ref().map(|b| b.name.clone()),
        })
        .collect();

    let brawler = participants
        .iter()
        .find(|p| p.tag == player_tag)
        .and_then(|p| p.brawler.clone())
        .ok_or_else(|| ParseError::MissingBrawler(player_tag.to_string()))?;

    let star_player_tag = match &battle.star_player {
        Some(star) => star.tag.clone(),
        None => {
            // Lowest tag keeps the id identical from every participant's log
            let fallback = participants
                .iter()
                .map(|p| p.tag.as_str())
                .min()
                .unwrap_or(player_tag)
                .to_string();
            debug!(player_tag = %player_tag, fallback = %fallback, "Battle has no star player");
            fallback
        }
    };

    let battle_time = parse_battle_time(&entry.battle_time)?;
    let class = classify(outcome, trophy_change);

    Ok(Some(ParsedBattle {
        match_id: match_id(&star_player_tag, battle_time),
        player_tag: player_tag.to_string(),
        outcome,
        trophy_change,
        map: entry.event.map.clone(),
        mode: entry.event.mode.clone().or_else(|| battle.mode.clone()),
        battle_time,
        is_star_player: star_player_tag == player_tag,
        star_player_tag: tag::bare(&star_player_tag).to_string(),
        brawler,
        battle_type: class.battle_type,
        played_with_clubmate: class.played_with_clubmate,
        participants,
        winning_team,
    }))
}

/// Parses every relevant entry of a log. Malformed entries are logged and skipped.
pub fn parse_battle_log(player_tag: &str, log: &BattleLog) -> Vec<ParsedBattle> {
    log.items
        .iter()
        .filter_map(|entry| match parse_battle(player_tag, entry) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(player_tag = %player_tag, error = %err, "Skipping malformed battle");
                None
            }
        })
        .collect()
}
