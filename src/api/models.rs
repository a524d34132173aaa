use serde::{Deserialize, Serialize};

use crate::store::ClubType;

fn not_fetched() -> String {
    "Undefined".to_string()
}

/// `GET /players/{tag}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub tag: String,
    #[serde(default = "not_fetched")]
    pub name: String,
    #[serde(default)]
    pub trophies: i32,
    #[serde(default, rename = "expLevel")]
    pub exp_level: i32,
    // Clubless players come back with `"club": {}`
    #[serde(default)]
    pub club: Option<ClubRef>,
    #[serde(default, rename = "3vs3Victories")]
    pub three_vs_three_victories: i32,
    #[serde(default, rename = "soloVictories")]
    pub solo_victories: i32,
    #[serde(default, rename = "duoVictories")]
    pub duo_victories: i32,
}

impl PlayerProfile {
    pub fn club_tag(&self) -> Option<&str> {
        self.club.as_ref().and_then(|club| club.tag.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClubRef {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// `GET /players/{tag}/battlelog`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleLog {
    #[serde(default)]
    pub items: Vec<BattleEntry>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl BattleLog {
    pub fn is_not_found(&self) -> bool {
        self.reason.as_deref() == Some("notFound")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleEntry {
    #[serde(rename = "battleTime")]
    pub battle_time: String,
    #[serde(default)]
    pub event: BattleEvent,
    #[serde(default)]
    pub battle: BattleDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleEvent {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub map: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleDetails {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, rename = "type")]
    pub battle_type: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default, rename = "trophyChange")]
    pub trophy_change: Option<i32>,
    #[serde(default, rename = "starPlayer")]
    pub star_player: Option<BattlePlayer>,
    #[serde(default)]
    pub teams: Vec<Vec<BattlePlayer>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattlePlayer {
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brawler: Option<BrawlerRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrawlerRef {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub power: Option<i32>,
    #[serde(default)]
    pub trophies: Option<i32>,
}

/// `GET /clubs/{tag}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubInfo {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub club_type: ClubType,
    #[serde(default)]
    pub trophies: i32,
    #[serde(default, rename = "requiredTrophies")]
    pub required_trophies: i32,
}

/// `GET /clubs/{tag}/members`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClubMembers {
    #[serde(default)]
    pub items: Vec<ClubMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubMember {
    pub tag: String,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_defaults_missing_fields() {
        let profile: PlayerProfile = serde_json::from_value(json!({
            "tag": "#9090YYGQ",
            "name": "Jean",
            "trophies": 30616,
            "club": {}
        }))
        .unwrap();

        assert_eq!(profile.exp_level, 0);
        assert_eq!(profile.three_vs_three_victories, 0);
        assert_eq!(profile.club_tag(), None);
    }

    #[test]
    fn profile_without_tag_is_rejected() {
        let throttled = json!({ "reason": "accessDenied", "message": "Invalid authorization" });
        assert!(serde_json::from_value::<PlayerProfile>(throttled).is_err());
    }

    #[test]
    fn club_description_defaults_to_empty() {
        let club: ClubInfo = serde_json::from_value(json!({
            "tag": "#P0GVGVRP",
            "name": "Club",
            "type": "inviteOnly",
            "trophies": 800000,
            "requiredTrophies": 25000
        }))
        .unwrap();

        assert_eq!(club.description, "");
        assert_eq!(club.club_type, ClubType::InviteOnly);
    }

    #[test]
    fn battle_log_not_found_marker() {
        let log: BattleLog = serde_json::from_value(json!({ "reason": "notFound" })).unwrap();
        assert!(log.is_not_found());
        assert!(log.items.is_empty());
    }
}
