//! Concurrent fetches for many tags at once.
//!
//! Results are keyed by the tag that was requested, never by arrival order.
//! A failed or missing response only drops that tag from the result.

use futures::{stream, StreamExt};
use std::collections::HashMap;
use tracing::{info, warn};

use super::{
    models::{BattleLog, ClubInfo, PlayerProfile},
    GameApi,
};

/// Profile and battle log of one player, fetched together.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub tag: String,
    pub profile: PlayerProfile,
    pub battle_log: BattleLog,
}

pub async fn fetch_player_snapshots(
    api: &dyn GameApi,
    tags: &[String],
    max_in_flight: usize,
) -> HashMap<String, PlayerSnapshot> {
    let responses: Vec<_> = stream::iter(tags)
        .map(|tag| async move {
            let (profile, log) = futures::join!(api.player_profile(tag), api.battle_log(tag));
            (tag, profile, log)
        })
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;

    let mut snapshots = HashMap::with_capacity(responses.len());
    for (tag, profile, log) in responses {
        let profile = match profile {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                info!(player_tag = %tag, "Player not found, skipping");
                continue;
            }
            Err(err) => {
                warn!(player_tag = %tag, error = %err, "Profile request failed or was throttled, skipping");
                continue;
            }
        };

        let battle_log = match log {
            Ok(Some(log)) => log,
            Ok(None) => {
                info!(player_tag = %tag, "Battle log not found");
                BattleLog::default()
            }
            Err(err) => {
                warn!(player_tag = %tag, error = %err, "Battle log request failed, skipping");
                continue;
            }
        };

        snapshots.insert(
            tag.clone(),
            PlayerSnapshot {
                tag: tag.clone(),
                profile,
                battle_log,
            },
        );
    }

    snapshots
}

pub async fn fetch_clubs(
    api: &dyn GameApi,
    club_tags: &[String],
    max_in_flight: usize,
) -> HashMap<String, ClubInfo> {
    let responses: Vec<_> = stream::iter(club_tags)
        .map(|tag| async move { (tag, api.club_info(tag).await) })
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;

    responses
        .into_iter()
        .filter_map(|(tag, response)| match response {
            Ok(Some(club)) => Some((tag.clone(), club)),
            Ok(None) => {
                info!(club_tag = %tag, "Club not found");
                None
            }
            Err(err) => {
                warn!(club_tag = %tag, error = %err, "Club request failed, skipping");
                None
            }
        })
        .collect()
}

pub async fn fetch_member_tags(
    api: &dyn GameApi,
    club_tags: &[String],
    max_in_flight: usize,
) -> HashMap<String, Vec<String>> {
    let responses: Vec<_> = stream::iter(club_tags)
        .map(|tag| async move { (tag, api.club_members(tag).await) })
        .buffer_unordered(max_in_flight.max(1))
        .collect()
        .await;

    responses
        .into_iter()
        .filter_map(|(tag, response)| match response {
            Ok(Some(members)) => Some((
                tag.clone(),
                members.items.into_iter().map(|member| member.tag).collect(),
            )),
            Ok(None) => {
                info!(club_tag = %tag, "Club members not found");
                None
            }
            Err(err) => {
                warn!(club_tag = %tag, error = %err, "Club members request failed, skipping");
                None
            }
        })
        .collect()
}
