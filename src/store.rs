use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analysis::champion_pool::ChampionPoolTracker;
use crate::analysis::stat_aggregator::StatAggregator;
use crate::error::AppError;
use crate::models::*;

/// Local relational store: every table lives in one JSON document.
///
/// Writes go through `&mut self`, so a commit (match, its stats and the
/// champion-pool updates) is applied by a single writer. Each commit
/// validates everything up front and only then mutates, so a rejected
/// commit leaves the store untouched.
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchStore {
    #[serde(skip)]
    path: Option<PathBuf>,
    pub last_updated: DateTime<Utc>,
    next_player_id: u64,
    next_match_id: u64,
    players: Vec<Player>,
    matches: Vec<MatchRecord>,
    stats: Vec<PlayerMatchStat>,
    champion_pools: ChampionPoolTracker,
}

impl Default for MatchStore {
    fn default() -> Self {
        MatchStore {
            path: None,
            last_updated: Utc::now(),
            next_player_id: 1,
            next_match_id: 1,
            players: Vec::new(),
            matches: Vec::new(),
            stats: Vec::new(),
            champion_pools: ChampionPoolTracker::new(),
        }
    }
}

impl MatchStore {
    /// In-memory store with no backing file.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut store = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str::<MatchStore>(&content)
                .map_err(|e| AppError::JsonError(format!("Failed to parse store: {}", e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No store at {:?}, starting empty", path);
                MatchStore::default()
            }
            Err(e) => return Err(e.into()),
        };

        // Hand-edited files may be out of order; lookups binary search by id.
        store.matches.sort_by_key(|m| m.id);
        store.path = Some(path.to_path_buf());
        debug!(
            "Loaded store from {:?}: {} players, {} matches, {} stats",
            path,
            store.players.len(),
            store.matches.len(),
            store.stats.len()
        );
        Ok(store)
    }

    pub fn save(&self) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::JsonError(format!("Failed to serialize store: {}", e)))?;
        fs::write(path, json)?;

        debug!("Saved store to {:?}", path);
        Ok(())
    }

    pub fn add_player(
        &mut self,
        organization: &OrganizationId,
        summoner_name: &str,
        role: Role,
        puuid: Option<String>,
    ) -> &Player {
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        self.players.push(Player {
            id,
            organization_id: organization.clone(),
            summoner_name: summoner_name.to_string(),
            role,
            puuid,
            created_at: Utc::now(),
        });
        self.last_updated = Utc::now();

        info!("Added player {} ({}) to {}", summoner_name, id, organization);
        &self.players[self.players.len() - 1]
    }

    pub fn players<'a>(&'a self, organization: &OrganizationId) -> impl Iterator<Item = &'a Player> + 'a {
        let organization = organization.clone();
        self.players
            .iter()
            .filter(move |p| p.organization_id == organization)
    }

    /// Looks up a player, refusing players owned by another organization.
    pub fn player(&self, organization: &OrganizationId, id: PlayerId) -> Result<&Player, AppError> {
        let player = self
            .players
            .iter()
            .find(|p| p.id == id)
            .ok_or(AppError::PlayerNotFound(id))?;

        if &player.organization_id != organization {
            return Err(AppError::ForeignPlayer {
                player: id,
                organization: organization.clone(),
            });
        }
        Ok(player)
    }

    pub fn player_by_puuid(&self, organization: &OrganizationId, puuid: &str) -> Option<&Player> {
        self.players(organization)
            .find(|p| p.puuid.as_deref() == Some(puuid))
    }

    pub fn set_puuid(&mut self, organization: &OrganizationId, id: PlayerId, puuid: String) -> Result<(), AppError> {
        self.player(organization, id)?;
        if let Some(player) = self.players.iter_mut().find(|p| p.id == id) {
            player.puuid = Some(puuid);
            self.last_updated = Utc::now();
        }
        Ok(())
    }

    pub fn matches<'a>(&'a self, organization: &OrganizationId) -> impl Iterator<Item = &'a MatchRecord> + 'a {
        let organization = organization.clone();
        self.matches
            .iter()
            .filter(move |m| m.organization_id == organization)
    }

    /// Match ids are handed out in increasing order, matches are never
    /// removed and `load` sorts the table, so it stays sorted by id.
    fn match_by_id(&self, id: MatchId) -> Option<&MatchRecord> {
        self.matches
            .binary_search_by_key(&id, |m| m.id)
            .ok()
            .map(|idx| &self.matches[idx])
    }

    pub fn match_record(&self, organization: &OrganizationId, id: MatchId) -> Result<&MatchRecord, AppError> {
        self.match_by_id(id)
            .filter(|m| &m.organization_id == organization)
            .ok_or(AppError::MatchNotFound(id))
    }

    pub fn has_riot_match(&self, organization: &OrganizationId, riot_match_id: &str) -> bool {
        self.matches(organization)
            .any(|m| m.riot_match_id.as_deref() == Some(riot_match_id))
    }

    /// Stats joined with their match, in row order.
    pub fn rows<'a>(
        &'a self,
        organization: &OrganizationId,
    ) -> impl Iterator<Item = (&'a MatchRecord, &'a PlayerMatchStat)> + 'a {
        let organization = organization.clone();
        self.stats
            .iter()
            .filter(move |s| s.organization_id == organization)
            .filter_map(move |s| self.match_by_id(s.match_id).map(|m| (m, s)))
    }

    /// Commits a match together with its player lines.
    pub fn record_match(
        &mut self,
        organization: &OrganizationId,
        new_match: NewMatch,
        new_stats: Vec<NewStat>,
    ) -> Result<MatchId, AppError> {
        if let Some(riot_id) = &new_match.riot_match_id {
            if self.has_riot_match(organization, riot_id) {
                return Err(AppError::DuplicateMatch(riot_id.clone()));
            }
        }

        let match_id = MatchId(self.next_match_id);
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(new_stats.len());
        for new_stat in new_stats {
            let player = self.player(organization, new_stat.player_id)?;
            if !seen.insert(new_stat.player_id) {
                return Err(AppError::DuplicateStat {
                    player: new_stat.player_id,
                    match_id,
                });
            }
            let role = new_stat.role.unwrap_or(player.role);
            resolved.push((new_stat, role));
        }

        let now = Utc::now();
        self.next_match_id += 1;
        let game = MatchRecord::from_new(match_id, organization.clone(), new_match, now);
        let stat_count = resolved.len();

        for (new_stat, role) in resolved {
            self.commit_stat(&game, new_stat, role);
        }
        self.matches.push(game);
        self.last_updated = now;

        info!(
            "Recorded match {} for {} with {} player stats",
            match_id, organization, stat_count
        );
        Ok(match_id)
    }

    /// Adds one player line to an existing match.
    pub fn add_stat(
        &mut self,
        organization: &OrganizationId,
        match_id: MatchId,
        new_stat: NewStat,
    ) -> Result<&PlayerMatchStat, AppError> {
        let game = self.match_record(organization, match_id)?.clone();
        let role = new_stat.role.unwrap_or(self.player(organization, new_stat.player_id)?.role);

        if self
            .stats
            .iter()
            .any(|s| s.match_id == match_id && s.player_id == new_stat.player_id)
        {
            return Err(AppError::DuplicateStat {
                player: new_stat.player_id,
                match_id,
            });
        }

        self.commit_stat(&game, new_stat, role);
        self.last_updated = Utc::now();
        Ok(&self.stats[self.stats.len() - 1])
    }

    fn commit_stat(&mut self, game: &MatchRecord, new_stat: NewStat, role: Role) {
        let mut stat = PlayerMatchStat::new(
            game.organization_id.clone(),
            game.id,
            new_stat.player_id,
            new_stat.champion,
            role,
            new_stat.counters,
        );
        StatAggregator::derive(&mut stat, game);
        self.champion_pools.record(&stat, game);

        debug!(
            "Stat for {} on {}: kda {:.2}, score {:.2}",
            stat.player_id, stat.champion, stat.kda_ratio, stat.performance_score
        );
        self.stats.push(stat);
    }

    pub fn champion_pool<'a>(
        &'a self,
        organization: &'a OrganizationId,
        player: PlayerId,
    ) -> impl Iterator<Item = &'a ChampionPoolEntry> + 'a {
        self.champion_pools.for_player(organization, player)
    }

    pub fn champion_pool_entry(
        &self,
        organization: &OrganizationId,
        player: PlayerId,
        champion: &str,
    ) -> Option<&ChampionPoolEntry> {
        self.champion_pools.get(organization, player, champion)
    }

    /// Recomputes every champion-pool entry from the full stat history.
    pub fn rebuild_champion_pools(&mut self) -> usize {
        let rebuilt = ChampionPoolTracker::rebuild(&self.stats, |s| self.match_by_id(s.match_id));
        let count = rebuilt.len();
        self.champion_pools = rebuilt;
        self.last_updated = Utc::now();

        info!("Rebuilt {} champion pool entries", count);
        count
    }
}
