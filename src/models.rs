//! Persisted rows: roster players, matches, per-match player stats and
//! champion-pool entries. Every row is owned by one organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tenant slug. Passed explicitly to every read and write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(slug: impl Into<String>) -> Self {
        OrganizationId(slug.into())
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrganizationId {
    fn from(slug: &str) -> Self {
        OrganizationId(slug.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Top,
    Jungle,
    Mid,
    Adc,
    Support,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Top, Role::Jungle, Role::Mid, Role::Adc, Role::Support];

    /// Maps Riot's `teamPosition` values (TOP, JUNGLE, MIDDLE, BOTTOM, UTILITY).
    pub fn from_riot_position(position: &str) -> Option<Self> {
        match position {
            "TOP" => Some(Role::Top),
            "JUNGLE" => Some(Role::Jungle),
            "MIDDLE" | "MID" => Some(Role::Mid),
            "BOTTOM" | "ADC" => Some(Role::Adc),
            "UTILITY" | "SUPPORT" => Some(Role::Support),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Top => "top",
            Role::Jungle => "jungle",
            Role::Mid => "mid",
            Role::Adc => "adc",
            Role::Support => "support",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Role::Top),
            "jungle" | "jg" => Ok(Role::Jungle),
            "mid" | "middle" => Ok(Role::Mid),
            "adc" | "bot" | "bottom" => Ok(Role::Adc),
            "support" | "sup" | "utility" => Ok(Role::Support),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Official,
    Scrim,
    Tournament,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchType::Official => "official",
            MatchType::Scrim => "scrim",
            MatchType::Tournament => "tournament",
        };
        f.write_str(name)
    }
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "official" => Ok(MatchType::Official),
            "scrim" => Ok(MatchType::Scrim),
            "tournament" => Ok(MatchType::Tournament),
            other => Err(format!("unknown match type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Blue,
    Red,
}

impl Side {
    /// Riot uses team id 100 for blue and 200 for red.
    pub fn from_team_id(team_id: i32) -> Self {
        if team_id == 200 {
            Side::Red
        } else {
            Side::Blue
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub organization_id: OrganizationId,
    pub summoner_name: String,
    pub role: Role,
    #[serde(default)]
    pub puuid: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Match details supplied at import or manual-entry time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMatch {
    pub match_type: MatchType,
    #[serde(default)]
    pub opponent: Option<String>,
    pub game_start: DateTime<Utc>,
    #[serde(default)]
    pub game_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    pub victory: bool,
    pub side: Side,
    #[serde(default)]
    pub our_score: u32,
    #[serde(default)]
    pub opponent_score: u32,
    #[serde(default)]
    pub riot_match_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub organization_id: OrganizationId,
    pub match_type: MatchType,
    pub opponent: Option<String>,
    pub game_start: DateTime<Utc>,
    pub game_end: Option<DateTime<Utc>>,
    pub duration_secs: Option<u32>,
    pub victory: bool,
    pub side: Side,
    pub our_score: u32,
    pub opponent_score: u32,
    pub riot_match_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn from_new(
        id: MatchId,
        organization_id: OrganizationId,
        new: NewMatch,
        created_at: DateTime<Utc>,
    ) -> Self {
        MatchRecord {
            id,
            organization_id,
            match_type: new.match_type,
            opponent: new.opponent,
            game_start: new.game_start,
            game_end: new.game_end,
            duration_secs: new.duration_secs,
            victory: new.victory,
            side: new.side,
            our_score: new.our_score,
            opponent_score: new.opponent_score,
            riot_match_id: new.riot_match_id,
            created_at,
        }
    }
}

/// Raw per-match counters. Anything absent in the input counts as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatCounters {
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub cs: u32,
    pub gold: u32,
    pub damage_dealt: u32,
    pub damage_taken: u32,
    pub vision_score: u32,
    pub wards_placed: u32,
    pub wards_killed: u32,
    pub double_kills: u32,
    pub triple_kills: u32,
    pub quadra_kills: u32,
    pub penta_kills: u32,
    /// Fraction (0.0 to 1.0) of the team's champion damage.
    pub damage_share: f64,
}

/// One player's line for a match, before derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStat {
    pub player_id: PlayerId,
    pub champion: String,
    /// Falls back to the player's roster role.
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(flatten)]
    pub counters: StatCounters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerMatchStat {
    pub organization_id: OrganizationId,
    pub match_id: MatchId,
    pub player_id: PlayerId,
    pub champion: String,
    pub role: Role,
    #[serde(flatten)]
    pub counters: StatCounters,
    #[serde(default)]
    pub kda_ratio: f64,
    #[serde(default)]
    pub cs_per_min: Option<f64>,
    #[serde(default)]
    pub gold_per_min: Option<f64>,
    #[serde(default)]
    pub performance_score: f64,
}

impl PlayerMatchStat {
    /// Builds an underived row; `StatAggregator::derive` fills the rest.
    pub fn new(
        organization_id: OrganizationId,
        match_id: MatchId,
        player_id: PlayerId,
        champion: String,
        role: Role,
        counters: StatCounters,
    ) -> Self {
        PlayerMatchStat {
            organization_id,
            match_id,
            player_id,
            champion,
            role,
            counters,
            kda_ratio: 0.0,
            cs_per_min: None,
            gold_per_min: None,
            performance_score: 0.0,
        }
    }
}

/// Running aggregates for one (player, champion) pair.
///
/// Only sums are stored; averages are derived on read so an update is O(1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChampionPoolEntry {
    pub organization_id: OrganizationId,
    pub player_id: PlayerId,
    pub champion: String,
    pub games_played: u32,
    pub games_won: u32,
    pub kda_sum: f64,
    pub cs_per_min_sum: f64,
    /// Games that had a known duration and therefore a CS/min value.
    pub cs_per_min_samples: u32,
    pub damage_share_sum: f64,
    pub last_played: Option<DateTime<Utc>>,
}

impl ChampionPoolEntry {
    pub fn new(organization_id: OrganizationId, player_id: PlayerId, champion: String) -> Self {
        ChampionPoolEntry {
            organization_id,
            player_id,
            champion,
            games_played: 0,
            games_won: 0,
            kda_sum: 0.0,
            cs_per_min_sum: 0.0,
            cs_per_min_samples: 0,
            damage_share_sum: 0.0,
            last_played: None,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.games_won as f64 / self.games_played as f64
        }
    }

    pub fn average_kda(&self) -> f64 {
        mean(self.kda_sum, self.games_played)
    }

    pub fn average_cs_per_min(&self) -> f64 {
        mean(self.cs_per_min_sum, self.cs_per_min_samples)
    }

    pub fn average_damage_share(&self) -> f64 {
        mean(self.damage_share_sum, self.games_played)
    }
}

fn mean(sum: f64, count: u32) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("MID".parse::<Role>().unwrap(), Role::Mid);
        assert_eq!("bot".parse::<Role>().unwrap(), Role::Adc);
        assert!("coach".parse::<Role>().is_err());
        assert_eq!(Role::from_riot_position("UTILITY"), Some(Role::Support));
        assert_eq!(Role::from_riot_position(""), None);
    }

    #[test]
    fn test_missing_counters_default_to_zero() {
        let stat: NewStat =
            serde_json::from_str(r#"{"player_id": 3, "champion": "Ahri", "kills": 4}"#).unwrap();
        assert_eq!(stat.counters.kills, 4);
        assert_eq!(stat.counters.deaths, 0);
        assert_eq!(stat.counters.damage_share, 0.0);
        assert!(stat.role.is_none());
    }

    #[test]
    fn test_empty_pool_entry_averages() {
        let entry = ChampionPoolEntry::new("org".into(), PlayerId(1), "Ahri".to_string());
        assert_eq!(entry.win_rate(), 0.0);
        assert_eq!(entry.average_kda(), 0.0);
        assert_eq!(entry.average_cs_per_min(), 0.0);
    }

    #[test]
    fn test_side_from_team_id() {
        assert_eq!(Side::from_team_id(100), Side::Blue);
        assert_eq!(Side::from_team_id(200), Side::Red);
    }
}
