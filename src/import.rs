//! Turning external match data into store commits: Riot Match-V5 games and
//! hand-written JSON entries.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::api::models::{MatchDto, ParticipantDto};
use crate::error::AppError;
use crate::models::*;
use crate::store::MatchStore;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub match_type: MatchType,
    pub opponent: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            match_type: MatchType::Official,
            opponent: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<MatchId>,
    pub skipped: usize,
}

/// A match with its player lines, as written by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualEntry {
    #[serde(rename = "match")]
    pub game: NewMatch,
    #[serde(default)]
    pub stats: Vec<NewStat>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ManualFile {
    Many(Vec<ManualEntry>),
    One(ManualEntry),
}

/// Reads a JSON file holding one entry or an array of entries.
pub fn load_manual_entries(path: &Path) -> Result<Vec<ManualEntry>, AppError> {
    let content = fs::read_to_string(path)?;
    let parsed: ManualFile = serde_json::from_str(&content)
        .map_err(|e| AppError::JsonError(format!("Failed to parse {}: {}", path.display(), e)))?;

    Ok(match parsed {
        ManualFile::Many(entries) => entries,
        ManualFile::One(entry) => vec![entry],
    })
}

pub struct MatchImporter;

impl MatchImporter {
    /// Converts a Riot match into a commit for the organization's roster
    /// players found in it (matched by PUUID).
    pub fn from_riot(
        store: &MatchStore,
        organization: &OrganizationId,
        dto: &MatchDto,
        options: &ImportOptions,
    ) -> Result<(NewMatch, Vec<NewStat>), AppError> {
        let match_id = &dto.metadata.match_id;
        let roster: Vec<(&ParticipantDto, &Player)> = dto
            .info
            .participants
            .iter()
            .filter_map(|p| store.player_by_puuid(organization, &p.puuid).map(|player| (p, player)))
            .collect();

        let Some((first, _)) = roster.first() else {
            return Err(AppError::NoRosterParticipants(match_id.clone()));
        };
        let our_team = first.team_id;

        let team_kills = |ours: bool| -> u32 {
            dto.info
                .participants
                .iter()
                .filter(|p| (p.team_id == our_team) == ours)
                .map(|p| p.kills)
                .sum()
        };
        let team_damage: u64 = dto
            .info
            .participants
            .iter()
            .filter(|p| p.team_id == our_team)
            .map(|p| p.total_damage_dealt_to_champions as u64)
            .sum();

        let mut stats = Vec::with_capacity(roster.len());
        for (participant, player) in &roster {
            if participant.team_id != our_team {
                warn!(
                    "{} played on the other side of {}, skipping",
                    player.summoner_name, match_id
                );
                continue;
            }
            stats.push(NewStat {
                player_id: player.id,
                champion: participant.champion_name.clone(),
                role: Role::from_riot_position(&participant.team_position),
                counters: counters_from(participant, team_damage),
            });
        }

        let info = &dto.info;
        let duration_secs = if info.game_end_timestamp.is_some() {
            info.game_duration
        } else {
            info.game_duration / 1000
        };
        let started_ms = info.game_start_timestamp.unwrap_or(info.game_creation);
        let game_start = DateTime::<Utc>::from_timestamp_millis(started_ms)
            .ok_or_else(|| AppError::ApiError(format!("Bad start timestamp in {}", match_id)))?;
        let game_end = info
            .game_end_timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis);

        let new_match = NewMatch {
            match_type: options.match_type,
            opponent: options.opponent.clone(),
            game_start,
            game_end,
            duration_secs: u32::try_from(duration_secs).ok().filter(|d| *d > 0),
            victory: first.win,
            side: Side::from_team_id(our_team),
            our_score: team_kills(true),
            opponent_score: team_kills(false),
            riot_match_id: Some(match_id.clone()),
        };

        Ok((new_match, stats))
    }

    /// Converts and commits a Riot match, refusing games already imported.
    pub fn import_riot(
        store: &mut MatchStore,
        organization: &OrganizationId,
        dto: &MatchDto,
        options: &ImportOptions,
    ) -> Result<MatchId, AppError> {
        if store.has_riot_match(organization, &dto.metadata.match_id) {
            return Err(AppError::DuplicateMatch(dto.metadata.match_id.clone()));
        }

        let (new_match, stats) = Self::from_riot(store, organization, dto, options)?;
        let id = store.record_match(organization, new_match, stats)?;
        info!("Imported {} as match {}", dto.metadata.match_id, id);
        Ok(id)
    }

    /// Fetches and commits each Riot match in turn, saving the store after
    /// every commit so a failure partway keeps what was already imported.
    /// Duplicates and games without roster players are skipped.
    pub fn import_riot_batch<F, P>(
        store: &mut MatchStore,
        organization: &OrganizationId,
        match_ids: &[String],
        options: &ImportOptions,
        mut fetch: F,
        mut on_progress: P,
    ) -> Result<ImportReport, AppError>
    where
        F: FnMut(&str) -> Result<MatchDto, AppError>,
        P: FnMut(),
    {
        let mut report = ImportReport::default();

        for match_id in match_ids {
            let dto = fetch(match_id)?;
            match Self::import_riot(store, organization, &dto, options) {
                Ok(id) => {
                    store.save()?;
                    report.imported.push(id);
                }
                Err(e @ (AppError::DuplicateMatch(_) | AppError::NoRosterParticipants(_))) => {
                    warn!("Skipping {}: {}", match_id, e);
                    report.skipped += 1;
                }
                Err(e) => return Err(e),
            }
            on_progress();
        }

        Ok(report)
    }

    pub fn import_manual(
        store: &mut MatchStore,
        organization: &OrganizationId,
        entries: Vec<ManualEntry>,
    ) -> Result<Vec<MatchId>, AppError> {
        entries
            .into_iter()
            .map(|entry| store.record_match(organization, entry.game, entry.stats))
            .collect()
    }
}

fn counters_from(p: &ParticipantDto, team_damage: u64) -> StatCounters {
    let damage_share = if team_damage == 0 {
        0.0
    } else {
        p.total_damage_dealt_to_champions as f64 / team_damage as f64
    };

    StatCounters {
        kills: p.kills,
        deaths: p.deaths,
        assists: p.assists,
        cs: p.total_minions_killed + p.neutral_minions_killed,
        gold: p.gold_earned,
        damage_dealt: p.total_damage_dealt_to_champions,
        damage_taken: p.total_damage_taken,
        vision_score: p.vision_score,
        wards_placed: p.wards_placed,
        wards_killed: p.wards_killed,
        double_kills: p.double_kills,
        triple_kills: p.triple_kills,
        quadra_kills: p.quadra_kills,
        penta_kills: p.penta_kills,
        damage_share,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn participant(puuid: &str, champion: &str, team_id: i32, win: bool, position: &str, kills: u32, damage: u32) -> serde_json::Value {
        json!({
            "puuid": puuid,
            "championName": champion,
            "teamId": team_id,
            "win": win,
            "teamPosition": position,
            "kills": kills,
            "deaths": 2,
            "assists": 6,
            "totalMinionsKilled": 200,
            "neutralMinionsKilled": 10,
            "goldEarned": 11000,
            "totalDamageDealtToChampions": damage,
            "visionScore": 25,
            "doubleKills": 1
        })
    }

    fn riot_match(with_end: bool) -> MatchDto {
        let duration: i64 = if with_end { 1800 } else { 1_800_000 };
        let mut info = json!({
            "gameDuration": duration,
            "gameCreation": 1_773_000_000_000i64,
            "gameStartTimestamp": 1_773_000_060_000i64,
            "queueId": 420,
            "participants": [
                participant("p-mid", "Ahri", 100, true, "MIDDLE", 5, 20000),
                participant("p-top", "Gnar", 100, true, "", 2, 10000),
                participant("x1", "Jinx", 100, true, "BOTTOM", 3, 10000),
                participant("x2", "Zed", 200, false, "MIDDLE", 4, 15000),
                participant("x3", "Lee Sin", 200, false, "JUNGLE", 1, 5000),
            ]
        });
        if with_end {
            info["gameEndTimestamp"] = json!(1_773_001_860_000i64);
        }
        serde_json::from_value(json!({
            "metadata": { "matchId": "NA1_5000", "participants": [] },
            "info": info
        }))
        .unwrap()
    }

    fn roster() -> (MatchStore, OrganizationId, PlayerId, PlayerId) {
        let org = OrganizationId::from("org");
        let mut store = MatchStore::new();
        let mid = store.add_player(&org, "Faker", Role::Mid, Some("p-mid".to_string())).id;
        let top = store.add_player(&org, "Zeus", Role::Top, Some("p-top".to_string())).id;
        (store, org, mid, top)
    }

    #[test]
    fn test_from_riot_builds_roster_lines() {
        let (store, org, mid, top) = roster();
        let (game, stats) = MatchImporter::from_riot(&store, &org, &riot_match(true), &ImportOptions::default()).unwrap();

        assert!(game.victory);
        assert_eq!(game.side, Side::Blue);
        assert_eq!(game.duration_secs, Some(1800));
        assert_eq!(game.our_score, 10);
        assert_eq!(game.opponent_score, 5);
        assert_eq!(game.riot_match_id.as_deref(), Some("NA1_5000"));
        assert!(game.game_end.is_some());

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].player_id, mid);
        assert_eq!(stats[0].role, Some(Role::Mid));
        assert_eq!(stats[0].counters.cs, 210);
        assert_eq!(stats[0].counters.damage_share, 0.5);
        // No position from Riot, falls back to the roster role at commit.
        assert_eq!(stats[1].player_id, top);
        assert_eq!(stats[1].role, None);
    }

    #[test]
    fn test_legacy_duration_in_milliseconds() {
        let (store, org, _, _) = roster();
        let (game, _) = MatchImporter::from_riot(&store, &org, &riot_match(false), &ImportOptions::default()).unwrap();
        assert_eq!(game.duration_secs, Some(1800));
        assert!(game.game_end.is_none());
    }

    #[test]
    fn test_import_riot_commits_once() {
        let (mut store, org, mid, top) = roster();
        let dto = riot_match(true);

        let id = MatchImporter::import_riot(&mut store, &org, &dto, &ImportOptions::default()).unwrap();
        assert_eq!(store.match_record(&org, id).unwrap().match_type, MatchType::Official);
        assert_eq!(store.rows(&org).count(), 2);
        assert_eq!(store.champion_pool_entry(&org, mid, "Ahri").unwrap().games_played, 1);
        let gnar = store.rows(&org).find(|(_, s)| s.player_id == top).unwrap().1;
        assert_eq!(gnar.role, Role::Top);

        assert!(matches!(
            MatchImporter::import_riot(&mut store, &org, &dto, &ImportOptions::default()),
            Err(AppError::DuplicateMatch(_))
        ));
    }

    #[test]
    fn test_batch_keeps_matches_saved_before_a_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prostaff.json");
        let org = OrganizationId::from("org");
        let mut store = MatchStore::load(&path).unwrap();
        store.add_player(&org, "Faker", Role::Mid, Some("p-mid".to_string()));

        let ids: Vec<String> = vec!["NA1_1".into(), "NA1_1".into(), "NA1_2".into(), "NA1_3".into()];
        let mut fetched = 0;
        let result = MatchImporter::import_riot_batch(
            &mut store,
            &org,
            &ids,
            &ImportOptions::default(),
            |id| {
                if id == "NA1_3" {
                    return Err(AppError::HttpError("connection reset".to_string()));
                }
                let mut dto = riot_match(true);
                dto.metadata.match_id = id.to_string();
                Ok(dto)
            },
            || fetched += 1,
        );

        assert!(matches!(result, Err(AppError::HttpError(_))));
        assert_eq!(fetched, 3);

        let reloaded = MatchStore::load(&path).unwrap();
        assert_eq!(reloaded.matches(&org).count(), 2);
        assert!(reloaded.has_riot_match(&org, "NA1_2"));
    }

    #[test]
    fn test_no_roster_players() {
        let store = MatchStore::new();
        let result = MatchImporter::from_riot(&store, &"org".into(), &riot_match(true), &ImportOptions::default());
        assert!(matches!(result, Err(AppError::NoRosterParticipants(_))));
    }

    #[test]
    fn test_load_manual_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("scrim.json");
        fs::write(
            &path,
            r#"{
                "match": {
                    "match_type": "scrim",
                    "opponent": "DRX",
                    "game_start": "2026-03-20T18:00:00Z",
                    "duration_secs": 1800,
                    "victory": true,
                    "side": "red"
                },
                "stats": [
                    { "player_id": 1, "champion": "Ahri", "kills": 10, "deaths": 2, "assists": 5, "cs": 200 }
                ]
            }"#,
        )
        .unwrap();

        let entries = load_manual_entries(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].game.match_type, MatchType::Scrim);

        let (mut store, org, mid, _) = roster();
        let ids = MatchImporter::import_manual(&mut store, &org, entries).unwrap();
        assert_eq!(ids.len(), 1);

        let (_, stat) = store.rows(&org).next().unwrap();
        assert_eq!(stat.player_id, mid);
        assert_eq!(stat.kda_ratio, 7.5);
        assert_eq!(stat.cs_per_min, Some(6.67));
        assert_eq!(stat.counters.vision_score, 0);
    }
}
