use serde::Deserialize;

// Account V1 response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub puuid: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub tag_line: String,
}

// Match V5 response
#[derive(Debug, Deserialize)]
pub struct MatchDto {
    pub metadata: MatchMetadata,
    pub info: MatchInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub match_id: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    /// Seconds when `game_end_timestamp` is present, milliseconds otherwise
    /// (matches played before patch 11.20).
    pub game_duration: i64,
    #[serde(default)]
    pub game_creation: i64,
    #[serde(default)]
    pub game_start_timestamp: Option<i64>,
    #[serde(default)]
    pub game_end_timestamp: Option<i64>,
    #[serde(default)]
    pub queue_id: i32,
    pub participants: Vec<ParticipantDto>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub puuid: String,
    pub champion_name: String,
    pub team_id: i32,
    pub win: bool,
    #[serde(default)]
    pub team_position: String, // TOP, JUNGLE, MIDDLE, BOTTOM, UTILITY
    #[serde(default)]
    pub kills: u32,
    #[serde(default)]
    pub deaths: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub total_minions_killed: u32,
    #[serde(default)]
    pub neutral_minions_killed: u32,
    #[serde(default)]
    pub gold_earned: u32,
    #[serde(default)]
    pub total_damage_dealt_to_champions: u32,
    #[serde(default)]
    pub total_damage_taken: u32,
    #[serde(default)]
    pub vision_score: u32,
    #[serde(default)]
    pub wards_placed: u32,
    #[serde(default)]
    pub wards_killed: u32,
    #[serde(default)]
    pub double_kills: u32,
    #[serde(default)]
    pub triple_kills: u32,
    #[serde(default)]
    pub quadra_kills: u32,
    #[serde(default)]
    pub penta_kills: u32,
}
