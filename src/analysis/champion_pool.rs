use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{ChampionPoolEntry, MatchRecord, OrganizationId, PlayerId, PlayerMatchStat};

type PoolKey = (OrganizationId, PlayerId, String);

/// Per (player, champion) running aggregates, kept up to date as stats
/// are committed.
///
/// Entries are stored in insertion order and persisted as a plain list;
/// the key index is rebuilt on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ChampionPoolEntry>", into = "Vec<ChampionPoolEntry>")]
pub struct ChampionPoolTracker {
    entries: Vec<ChampionPoolEntry>,
    index: HashMap<PoolKey, usize>,
}

impl From<Vec<ChampionPoolEntry>> for ChampionPoolTracker {
    fn from(entries: Vec<ChampionPoolEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| ((e.organization_id.clone(), e.player_id, e.champion.clone()), i))
            .collect();
        ChampionPoolTracker { entries, index }
    }
}

impl From<ChampionPoolTracker> for Vec<ChampionPoolEntry> {
    fn from(tracker: ChampionPoolTracker) -> Self {
        tracker.entries
    }
}

impl ChampionPoolTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find-or-create the entry for the stat's (player, champion) and fold
    /// the stat into its running sums. Expects `stat` to be derived already.
    pub fn record(&mut self, stat: &PlayerMatchStat, game: &MatchRecord) -> &ChampionPoolEntry {
        let key = (stat.organization_id.clone(), stat.player_id, stat.champion.clone());
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                self.entries.push(ChampionPoolEntry::new(
                    stat.organization_id.clone(),
                    stat.player_id,
                    stat.champion.clone(),
                ));
                let idx = self.entries.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };

        let entry = &mut self.entries[idx];
        entry.games_played += 1;
        if game.victory {
            entry.games_won += 1;
        }
        entry.kda_sum += stat.kda_ratio;
        if let Some(cs_per_min) = stat.cs_per_min {
            entry.cs_per_min_sum += cs_per_min;
            entry.cs_per_min_samples += 1;
        }
        entry.damage_share_sum += stat.counters.damage_share;
        entry.last_played = match entry.last_played {
            Some(previous) if previous >= game.game_start => Some(previous),
            _ => Some(game.game_start),
        };

        entry
    }

    /// Rebuilds every entry from full history.
    ///
    /// `lookup` resolves a stat's match; stats whose match cannot be found
    /// are skipped.
    pub fn rebuild<'a, I, F>(stats: I, lookup: F) -> Self
    where
        I: IntoIterator<Item = &'a PlayerMatchStat>,
        F: Fn(&PlayerMatchStat) -> Option<&'a MatchRecord>,
    {
        let mut tracker = ChampionPoolTracker::new();
        for stat in stats {
            if let Some(game) = lookup(stat) {
                tracker.record(stat, game);
            }
        }
        tracker
    }

    pub fn get(&self, organization: &OrganizationId, player: PlayerId, champion: &str) -> Option<&ChampionPoolEntry> {
        self.index
            .get(&(organization.clone(), player, champion.to_string()))
            .map(|&idx| &self.entries[idx])
    }

    pub fn for_player<'a>(
        &'a self,
        organization: &'a OrganizationId,
        player: PlayerId,
    ) -> impl Iterator<Item = &'a ChampionPoolEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| &e.organization_id == organization && e.player_id == player)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
