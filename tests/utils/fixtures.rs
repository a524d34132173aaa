use brawlclub::api::{BattleEntry, BattleLog, ClubInfo, PlayerProfile};
use serde_json::{json, Value};

// ============================================================================
// API payload builders
// ============================================================================

pub fn profile(tag: &str, trophies: i32, club_tag: Option<&str>) -> PlayerProfile {
    let club = match club_tag {
        Some(club_tag) => json!({ "tag": club_tag, "name": "Club" }),
        None => json!({}),
    };
    serde_json::from_value(json!({
        "tag": tag,
        "name": format!("Player {}", tag.trim_start_matches('#')),
        "trophies": trophies,
        "expLevel": 150,
        "3vs3Victories": 5000,
        "soloVictories": 300,
        "duoVictories": 400,
        "club": club
    }))
    .unwrap()
}

pub fn club(tag: &str) -> ClubInfo {
    serde_json::from_value(json!({
        "tag": tag,
        "name": format!("Club {}", tag.trim_start_matches('#')),
        "description": "club league every week",
        "type": "open",
        "trophies": 800000,
        "requiredTrophies": 20000
    }))
    .unwrap()
}

fn team_player(tag: &str, brawler: &str) -> Value {
    json!({
        "tag": tag,
        "name": tag,
        "brawler": { "id": 16000000, "name": brawler, "power": 11, "trophies": 750 }
    })
}

/// Builds one battle log entry of a 3v3 match the subject played in.
pub struct BattleBuilder {
    subject: String,
    teammates: Vec<String>,
    opponents: Vec<String>,
    battle_type: String,
    result: String,
    trophy_change: i32,
    star_player: Option<String>,
    battle_time: String,
    map: String,
}

impl BattleBuilder {
    pub fn ranked(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            teammates: vec!["#MATE1".to_string(), "#MATE2".to_string()],
            opponents: vec!["#OPP1".to_string(), "#OPP2".to_string(), "#OPP3".to_string()],
            battle_type: "teamRanked".to_string(),
            result: "victory".to_string(),
            trophy_change: 9,
            star_player: Some(subject.to_string()),
            battle_time: "20221026T174524.000Z".to_string(),
            map: "Hard Rock Mine".to_string(),
        }
    }

    pub fn with_teammates(mut self, teammates: &[&str]) -> Self {
        self.teammates = teammates.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_type(mut self, battle_type: &str) -> Self {
        self.battle_type = battle_type.to_string();
        self
    }

    pub fn with_result(mut self, result: &str, trophy_change: i32) -> Self {
        self.result = result.to_string();
        self.trophy_change = trophy_change;
        self
    }

    pub fn with_star_player(mut self, star_player: &str) -> Self {
        self.star_player = Some(star_player.to_string());
        self
    }

    pub fn at(mut self, battle_time: &str) -> Self {
        self.battle_time = battle_time.to_string();
        self
    }

    pub fn build(self) -> BattleEntry {
        let ours: Vec<Value> = std::iter::once(&self.subject)
            .chain(&self.teammates)
            .map(|tag| team_player(tag, "SHELLY"))
            .collect();
        let theirs: Vec<Value> = self
            .opponents
            .iter()
            .map(|tag| team_player(tag, "COLT"))
            .collect();

        let mut battle = json!({
            "mode": "gemGrab",
            "type": self.battle_type,
            "result": self.result,
            "duration": 120,
            "trophyChange": self.trophy_change,
            "teams": [ours, theirs]
        });
        if let Some(star) = &self.star_player {
            battle["starPlayer"] = team_player(star, "SHELLY");
        }

        serde_json::from_value(json!({
            "battleTime": self.battle_time,
            "event": { "id": 15000007, "mode": "gemGrab", "map": self.map },
            "battle": battle
        }))
        .unwrap()
    }
}

pub fn battle_log(entries: Vec<BattleEntry>) -> BattleLog {
    BattleLog {
        items: entries,
        reason: None,
    }
}
