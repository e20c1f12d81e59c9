//! Organization-scoped analytics over a filtered match window.
//!
//! Every view is one pass over the joined (match, stat) rows folded into
//! `MetricTotals` buckets keyed by player, role or nothing at all, the
//! in-memory counterpart of a `GROUP BY` query.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use tracing::debug;

use crate::error::AppError;
use crate::models::{
    MatchId, MatchRecord, MatchType, OrganizationId, PlayerId, PlayerMatchStat, Role,
};
use crate::store::MatchStore;

use super::grading::{ChampionMastery, PerformanceGradingEngine};
use super::stat_aggregator::round2;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;
const TREND_WINDOW: usize = 5;

type Row<'a> = (&'a MatchRecord, &'a PlayerMatchStat);

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeWindow {
    /// Inclusive calendar dates.
    Range { start: NaiveDate, end: NaiveDate },
    DaysBack(u32),
    #[default]
    Default,
}

impl TimeWindow {
    /// Resolves to a half-open `[from, to)` interval.
    pub fn resolve(&self, now: DateTime<Utc>, default_days: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
        let days_back = |days: u32| -> Result<_, AppError> {
            if days == 0 {
                return Err(AppError::InvalidWindow("days back must be greater than 0".to_string()));
            }
            let from = Duration::try_days(days as i64)
                .and_then(|back| now.checked_sub_signed(back))
                .ok_or_else(|| AppError::InvalidWindow(format!("{} days back is out of range", days)))?;
            Ok((from, now + Duration::seconds(1)))
        };

        match self {
            TimeWindow::Range { start, end } => {
                if start > end {
                    return Err(AppError::InvalidWindow(format!("{} is after {}", start, end)));
                }
                let from = start.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
                let to = end
                    .succ_opt()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| d.and_utc());
                match (from, to) {
                    (Some(from), Some(to)) => Ok((from, to)),
                    _ => Err(AppError::InvalidWindow(format!("{}..{} is out of range", start, end))),
                }
            }
            TimeWindow::DaysBack(days) => days_back(*days),
            TimeWindow::Default => days_back(default_days),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsQuery {
    pub window: TimeWindow,
    pub opponent: Option<String>,
    pub match_type: Option<MatchType>,
    pub player_id: Option<PlayerId>,
}

impl AnalyticsQuery {
    pub fn new(window: TimeWindow) -> Self {
        AnalyticsQuery {
            window,
            ..Self::default()
        }
    }

    fn matches(&self, game: &MatchRecord, stat: &PlayerMatchStat, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
        if game.game_start < from || game.game_start >= to {
            return false;
        }
        if let Some(opponent) = &self.opponent {
            let same = game
                .opponent
                .as_deref()
                .is_some_and(|o| o.eq_ignore_ascii_case(opponent));
            if !same {
                return false;
            }
        }
        if self.match_type.is_some_and(|t| t != game.match_type) {
            return false;
        }
        if self.player_id.is_some_and(|p| p != stat.player_id) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Multikills {
    pub double_kills: u32,
    pub triple_kills: u32,
    pub quadra_kills: u32,
    pub penta_kills: u32,
}

/// Running sums for one group of rows.
#[derive(Debug, Clone, Default)]
struct MetricTotals {
    games: u32,
    wins: u32,
    kills: u64,
    deaths: u64,
    assists: u64,
    damage: u64,
    damage_taken: u64,
    gold: u64,
    cs: u64,
    vision: u64,
    wards_placed: u64,
    wards_killed: u64,
    damage_share: f64,
    performance: f64,
    cs_per_min: f64,
    gold_per_min: f64,
    timed_games: u32,
    duration_mins: f64,
    multikills: Multikills,
}

impl MetricTotals {
    fn add(&mut self, game: &MatchRecord, stat: &PlayerMatchStat) {
        let c = &stat.counters;
        self.games += 1;
        if game.victory {
            self.wins += 1;
        }
        self.kills += c.kills as u64;
        self.deaths += c.deaths as u64;
        self.assists += c.assists as u64;
        self.damage += c.damage_dealt as u64;
        self.damage_taken += c.damage_taken as u64;
        self.gold += c.gold as u64;
        self.cs += c.cs as u64;
        self.vision += c.vision_score as u64;
        self.wards_placed += c.wards_placed as u64;
        self.wards_killed += c.wards_killed as u64;
        self.damage_share += c.damage_share;
        self.performance += stat.performance_score;

        if let (Some(cs), Some(gold), Some(secs)) = (stat.cs_per_min, stat.gold_per_min, game.duration_secs) {
            self.cs_per_min += cs;
            self.gold_per_min += gold;
            self.timed_games += 1;
            self.duration_mins += secs as f64 / 60.0;
        }

        self.multikills.double_kills += c.double_kills;
        self.multikills.triple_kills += c.triple_kills;
        self.multikills.quadra_kills += c.quadra_kills;
        self.multikills.penta_kills += c.penta_kills;
    }

    fn per_game(&self, total: f64) -> f64 {
        ratio(total, self.games as f64)
    }

    fn summary(&self) -> MetricSummary {
        MetricSummary {
            games: self.games,
            wins: self.wins,
            win_rate: round2(ratio(self.wins as f64, self.games as f64)),
            kda: round2((self.kills + self.assists) as f64 / self.deaths.max(1) as f64),
            avg_kills: round2(self.per_game(self.kills as f64)),
            avg_deaths: round2(self.per_game(self.deaths as f64)),
            avg_assists: round2(self.per_game(self.assists as f64)),
            avg_damage: round2(self.per_game(self.damage as f64)),
            avg_damage_taken: round2(self.per_game(self.damage_taken as f64)),
            avg_gold: round2(self.per_game(self.gold as f64)),
            avg_cs: round2(self.per_game(self.cs as f64)),
            avg_cs_per_min: round2(ratio(self.cs_per_min, self.timed_games as f64)),
            avg_gold_per_min: round2(ratio(self.gold_per_min, self.timed_games as f64)),
            avg_vision_score: round2(self.per_game(self.vision as f64)),
            avg_wards_placed: round2(self.per_game(self.wards_placed as f64)),
            avg_wards_killed: round2(self.per_game(self.wards_killed as f64)),
            avg_damage_share: round2(self.per_game(self.damage_share)),
            avg_performance_score: round2(self.per_game(self.performance)),
            multikills: self.multikills,
        }
    }

    /// Vision score per minute, over games with a known duration.
    fn vision_per_min(&self, rows: &[Row<'_>], player: PlayerId) -> f64 {
        let timed_vision: u64 = rows
            .iter()
            .filter(|(g, s)| s.player_id == player && g.duration_secs.is_some_and(|d| d > 0))
            .map(|(_, s)| s.counters.vision_score as u64)
            .sum();
        round2(ratio(timed_vision as f64, self.duration_mins))
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Folds rows into per-key totals. Groups come out in first-seen row order.
fn group_by<K, F>(rows: &[Row<'_>], key: F) -> Vec<(K, MetricTotals)>
where
    K: Eq + Hash + Clone,
    F: Fn(&MatchRecord, &PlayerMatchStat) -> K,
{
    let mut groups: Vec<(K, MetricTotals)> = Vec::new();
    let mut index: HashMap<K, usize> = HashMap::new();

    for (game, stat) in rows {
        let k = key(game, stat);
        let idx = *index.entry(k.clone()).or_insert_with(|| {
            groups.push((k, MetricTotals::default()));
            groups.len() - 1
        });
        groups[idx].1.add(game, stat);
    }

    groups
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub games: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub kda: f64,
    pub avg_kills: f64,
    pub avg_deaths: f64,
    pub avg_assists: f64,
    pub avg_damage: f64,
    pub avg_damage_taken: f64,
    pub avg_gold: f64,
    pub avg_cs: f64,
    pub avg_cs_per_min: f64,
    pub avg_gold_per_min: f64,
    pub avg_vision_score: f64,
    pub avg_wards_placed: f64,
    pub avg_wards_killed: f64,
    pub avg_damage_share: f64,
    pub avg_performance_score: f64,
    pub multikills: Multikills,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub summoner_name: String,
    pub role: Option<Role>,
    #[serde(flatten)]
    pub metrics: MetricSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamAverages {
    pub matches_played: u32,
    pub matches_won: u32,
    pub win_rate: f64,
    /// Averages over every player line in the window.
    pub per_player: MetricSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPlayer {
    pub rank: usize,
    pub player_id: PlayerId,
    pub summoner_name: String,
    pub games: u32,
    pub kda: f64,
    pub avg_performance_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRanking {
    pub role: Role,
    pub players: Vec<RankedPlayer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub match_id: MatchId,
    pub played_at: DateTime<Utc>,
    pub champion: String,
    pub victory: bool,
    pub kda: f64,
    pub performance_score: f64,
    /// Mean KDA of this game and up to four before it.
    pub rolling_kda: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdaTrend {
    pub player_id: PlayerId,
    pub average_kda: f64,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionSummary {
    pub player_id: PlayerId,
    pub summoner_name: String,
    pub games: u32,
    pub avg_vision_score: f64,
    pub avg_wards_placed: f64,
    pub avg_wards_killed: f64,
    pub vision_per_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaningSummary {
    pub player_id: PlayerId,
    pub summoner_name: String,
    pub role: Option<Role>,
    pub games: u32,
    pub avg_cs: f64,
    pub avg_cs_per_min: f64,
    pub avg_gold: f64,
    pub avg_gold_per_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerComparison {
    pub player_id: PlayerId,
    pub summoner_name: String,
    pub games: u32,
    pub performance_score: f64,
    pub performance_delta: f64,
    pub performance_percentile: f64,
    pub kda: f64,
    pub kda_delta: f64,
    pub kda_percentile: f64,
    pub damage_share: f64,
    pub damage_share_delta: f64,
    pub damage_share_percentile: f64,
    pub vision_score: f64,
    pub vision_delta: f64,
    pub vision_percentile: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamComparison {
    pub team: MetricSummary,
    pub players: Vec<PlayerComparison>,
}

/// Share (0-100) of the other values strictly below `value`. A lone value
/// ranks at 100.
fn percentile_rank(value: f64, all: &[f64]) -> f64 {
    if all.len() <= 1 {
        return 100.0;
    }
    let below = all.iter().filter(|v| **v < value).count();
    round2(below as f64 / (all.len() - 1) as f64 * 100.0)
}

fn sort_desc<T, F: Fn(&T) -> f64>(items: &mut [T], key: F) {
    // sort_by is stable: equal keys keep row order
    items.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(std::cmp::Ordering::Equal));
}

pub struct AnalyticsQueryService<'a> {
    store: &'a MatchStore,
    default_days: u32,
}

impl<'a> AnalyticsQueryService<'a> {
    pub fn new(store: &'a MatchStore) -> Self {
        AnalyticsQueryService {
            store,
            default_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_default_days(mut self, days: u32) -> Self {
        self.default_days = days;
        self
    }

    fn rows(&self, org: &OrganizationId, query: &AnalyticsQuery, now: DateTime<Utc>) -> Result<Vec<Row<'a>>, AppError> {
        let (from, to) = query.window.resolve(now, self.default_days)?;
        let rows: Vec<Row<'a>> = self
            .store
            .rows(org)
            .filter(|(game, stat)| query.matches(game, stat, from, to))
            .collect();

        debug!("{} rows for {} between {} and {}", rows.len(), org, from, to);
        Ok(rows)
    }

    fn name_and_role(&self, org: &OrganizationId, player: PlayerId) -> (String, Option<Role>) {
        match self.store.player(org, player) {
            Ok(p) => (p.summoner_name.clone(), Some(p.role)),
            Err(_) => ("unknown".to_string(), None),
        }
    }

    pub fn player_summaries(
        &self,
        org: &OrganizationId,
        query: &AnalyticsQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<PlayerSummary>, AppError> {
        let rows = self.rows(org, query, now)?;
        Ok(self.summarize_players(org, &rows))
    }

    fn summarize_players(&self, org: &OrganizationId, rows: &[Row<'_>]) -> Vec<PlayerSummary> {
        group_by(rows, |_, s| s.player_id)
            .into_iter()
            .map(|(player_id, totals)| {
                let (summoner_name, role) = self.name_and_role(org, player_id);
                PlayerSummary {
                    player_id,
                    summoner_name,
                    role,
                    metrics: totals.summary(),
                }
            })
            .collect()
    }

    pub fn team_averages(
        &self,
        org: &OrganizationId,
        query: &AnalyticsQuery,
        now: DateTime<Utc>,
    ) -> Result<TeamAverages, AppError> {
        let rows = self.rows(org, query, now)?;
        Ok(Self::average_team(&rows))
    }

    fn average_team(rows: &[Row<'_>]) -> TeamAverages {
        let per_player = group_by(rows, |_, _| ())
            .pop()
            .map(|(_, totals)| totals.summary())
            .unwrap_or_default();

        let mut seen = HashMap::new();
        for (game, _) in rows {
            seen.entry(game.id).or_insert(game.victory);
        }
        let matches_played = seen.len() as u32;
        let matches_won = seen.values().filter(|won| **won).count() as u32;

        TeamAverages {
            matches_played,
            matches_won,
            win_rate: round2(ratio(matches_won as f64, matches_played as f64)),
            per_player,
        }
    }

    /// All five roles, each with its players by average performance score.
    /// A player is ranked under the role they actually played.
    pub fn role_rankings(
        &self,
        org: &OrganizationId,
        query: &AnalyticsQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoleRanking>, AppError> {
        let rows = self.rows(org, query, now)?;
        let groups = group_by(&rows, |_, s| (s.role, s.player_id));

        Ok(Role::ALL
            .iter()
            .map(|&role| {
                let mut entries: Vec<(PlayerId, MetricSummary)> = groups
                    .iter()
                    .filter(|((r, _), _)| *r == role)
                    .map(|((_, p), totals)| (*p, totals.summary()))
                    .collect();
                sort_desc(&mut entries, |(_, m)| m.avg_performance_score);

                let players = entries
                    .into_iter()
                    .enumerate()
                    .map(|(i, (player_id, m))| RankedPlayer {
                        rank: i + 1,
                        player_id,
                        summoner_name: self.name_and_role(org, player_id).0,
                        games: m.games,
                        kda: m.kda,
                        avg_performance_score: m.avg_performance_score,
                    })
                    .collect();

                RoleRanking { role, players }
            })
            .collect())
    }

    pub fn kda_trend(
        &self,
        org: &OrganizationId,
        player: PlayerId,
        query: &AnalyticsQuery,
        now: DateTime<Utc>,
    ) -> Result<KdaTrend, AppError> {
        self.store.player(org, player)?;
        let query = AnalyticsQuery {
            player_id: Some(player),
            ..query.clone()
        };
        let mut rows = self.rows(org, &query, now)?;
        rows.sort_by_key(|(game, _)| game.game_start);

        let mut points: Vec<TrendPoint> = Vec::with_capacity(rows.len());
        for (i, (game, stat)) in rows.iter().enumerate() {
            let start = (i + 1).saturating_sub(TREND_WINDOW);
            let window = &rows[start..=i];
            let rolling = window.iter().map(|(_, s)| s.kda_ratio).sum::<f64>() / window.len() as f64;

            points.push(TrendPoint {
                match_id: game.id,
                played_at: game.game_start,
                champion: stat.champion.clone(),
                victory: game.victory,
                kda: stat.kda_ratio,
                performance_score: stat.performance_score,
                rolling_kda: round2(rolling),
            });
        }

        let average_kda = round2(ratio(
            points.iter().map(|p| p.kda).sum(),
            points.len() as f64,
        ));

        Ok(KdaTrend {
            player_id: player,
            average_kda,
            points,
        })
    }

    pub fn vision_analysis(
        &self,
        org: &OrganizationId,
        query: &AnalyticsQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<VisionSummary>, AppError> {
        let rows = self.rows(org, query, now)?;
        let mut vision: Vec<VisionSummary> = group_by(&rows, |_, s| s.player_id)
            .into_iter()
            .map(|(player_id, totals)| {
                let m = totals.summary();
                VisionSummary {
                    player_id,
                    summoner_name: self.name_and_role(org, player_id).0,
                    games: m.games,
                    avg_vision_score: m.avg_vision_score,
                    avg_wards_placed: m.avg_wards_placed,
                    avg_wards_killed: m.avg_wards_killed,
                    vision_per_min: totals.vision_per_min(&rows, player_id),
                }
            })
            .collect();

        sort_desc(&mut vision, |v| v.avg_vision_score);
        Ok(vision)
    }

    pub fn laning_analysis(
        &self,
        org: &OrganizationId,
        query: &AnalyticsQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<LaningSummary>, AppError> {
        let rows = self.rows(org, query, now)?;
        let mut laning: Vec<LaningSummary> = self
            .summarize_players(org, &rows)
            .into_iter()
            .map(|p| LaningSummary {
                player_id: p.player_id,
                summoner_name: p.summoner_name,
                role: p.role,
                games: p.metrics.games,
                avg_cs: p.metrics.avg_cs,
                avg_cs_per_min: p.metrics.avg_cs_per_min,
                avg_gold: p.metrics.avg_gold,
                avg_gold_per_min: p.metrics.avg_gold_per_min,
            })
            .collect();

        sort_desc(&mut laning, |l| l.avg_cs_per_min);
        Ok(laning)
    }

    /// Each player against the team average, with percentile ranks among
    /// the players in the window.
    pub fn team_comparison(
        &self,
        org: &OrganizationId,
        query: &AnalyticsQuery,
        now: DateTime<Utc>,
    ) -> Result<TeamComparison, AppError> {
        let rows = self.rows(org, query, now)?;
        let team = Self::average_team(&rows).per_player;
        let players = self.summarize_players(org, &rows);

        let column = |f: fn(&MetricSummary) -> f64| -> Vec<f64> { players.iter().map(|p| f(&p.metrics)).collect() };
        let performance = column(|m| m.avg_performance_score);
        let kda = column(|m| m.kda);
        let damage = column(|m| m.avg_damage_share);
        let vision = column(|m| m.avg_vision_score);

        let mut comparisons: Vec<PlayerComparison> = players
            .iter()
            .map(|p| {
                let m = &p.metrics;
                PlayerComparison {
                    player_id: p.player_id,
                    summoner_name: p.summoner_name.clone(),
                    games: m.games,
                    performance_score: m.avg_performance_score,
                    performance_delta: round2(m.avg_performance_score - team.avg_performance_score),
                    performance_percentile: percentile_rank(m.avg_performance_score, &performance),
                    kda: m.kda,
                    kda_delta: round2(m.kda - team.kda),
                    kda_percentile: percentile_rank(m.kda, &kda),
                    damage_share: m.avg_damage_share,
                    damage_share_delta: round2(m.avg_damage_share - team.avg_damage_share),
                    damage_share_percentile: percentile_rank(m.avg_damage_share, &damage),
                    vision_score: m.avg_vision_score,
                    vision_delta: round2(m.avg_vision_score - team.avg_vision_score),
                    vision_percentile: percentile_rank(m.avg_vision_score, &vision),
                }
            })
            .collect();

        sort_desc(&mut comparisons, |c| c.performance_score);
        Ok(TeamComparison {
            team,
            players: comparisons,
        })
    }

    /// The player's whole champion pool (not windowed), most played first,
    /// then by mastery score.
    pub fn champion_mastery(&self, org: &OrganizationId, player: PlayerId) -> Result<Vec<ChampionMastery>, AppError> {
        self.store.player(org, player)?;
        let mut mastery: Vec<ChampionMastery> = self
            .store
            .champion_pool(org, player)
            .map(PerformanceGradingEngine::champion_mastery)
            .collect();

        mastery.sort_by(|a, b| {
            b.games_played.cmp(&a.games_played).then(
                b.mastery_score
                    .partial_cmp(&a.mastery_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        Ok(mastery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::grading::Grade;
    use crate::models::StatCounters;
    use crate::store::tests::{line, new_match};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 28, 12, 0, 0).unwrap()
    }

    struct Fixture {
        store: MatchStore,
        org: OrganizationId,
        top: PlayerId,
        mid: PlayerId,
        sup: PlayerId,
    }

    fn fixture() -> Fixture {
        let org = OrganizationId::from("t1");
        let mut store = MatchStore::new();
        let top = store.add_player(&org, "Zeus", Role::Top, None).id;
        let mid = store.add_player(&org, "Faker", Role::Mid, None).id;
        let sup = store.add_player(&org, "Keria", Role::Support, None).id;

        store
            .record_match(
                &org,
                new_match(true, 10),
                vec![line(top, "Gnar", 4, 2, 4), line(mid, "Ahri", 2, 1, 0)],
            )
            .unwrap();
        store
            .record_match(
                &org,
                new_match(false, 12),
                vec![line(top, "Jax", 1, 4, 1), line(mid, "Ahri", 2, 1, 2)],
            )
            .unwrap();

        let mut scrim = new_match(true, 20);
        scrim.match_type = MatchType::Scrim;
        scrim.opponent = Some("Gen.G".to_string());
        store.record_match(&org, scrim, vec![line(mid, "Orianna", 8, 0, 4)]).unwrap();

        // Outside the default window.
        let mut old = new_match(true, 1);
        old.game_start = Utc.with_ymd_and_hms(2025, 12, 1, 18, 0, 0).unwrap();
        store.record_match(&org, old, vec![line(mid, "Ahri", 0, 9, 0)]).unwrap();

        // Another organization's data must never leak in.
        let rival = OrganizationId::from("geng");
        let chovy = store.add_player(&rival, "Chovy", Role::Mid, None).id;
        store
            .record_match(&rival, new_match(true, 15), vec![line(chovy, "Azir", 10, 0, 10)])
            .unwrap();

        Fixture { store, org, top, mid, sup }
    }

    #[test]
    fn test_window_resolution() {
        let (from, to) = TimeWindow::Default.resolve(now(), 30).unwrap();
        assert_eq!(from, now() - Duration::days(30));
        assert!(to > now());

        let range = TimeWindow::Range {
            start: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
        };
        let (from, to) = range.resolve(now(), 30).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(to, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());

        assert!(TimeWindow::DaysBack(0).resolve(now(), 30).is_err());
        let backwards = TimeWindow::Range {
            start: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            end: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        };
        assert!(matches!(backwards.resolve(now(), 30), Err(AppError::InvalidWindow(_))));
    }

    #[test]
    fn test_window_past_calendar_range() {
        assert!(matches!(
            TimeWindow::DaysBack(200_000_000).resolve(now(), 30),
            Err(AppError::InvalidWindow(_))
        ));
        assert!(matches!(
            TimeWindow::Default.resolve(now(), u32::MAX),
            Err(AppError::InvalidWindow(_))
        ));
    }

    #[test]
    fn test_player_summaries() {
        let f = fixture();
        let service = AnalyticsQueryService::new(&f.store);
        let summaries = service.player_summaries(&f.org, &AnalyticsQuery::default(), now()).unwrap();

        // First-seen row order, only players with games in the window.
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].player_id, f.top);
        let faker = &summaries[1];
        assert_eq!(faker.player_id, f.mid);
        assert_eq!(faker.summoner_name, "Faker");
        assert_eq!(faker.metrics.games, 3);
        assert_eq!(faker.metrics.wins, 2);
        // (12 + 6) / max(2, 1)
        assert_eq!(faker.metrics.kda, 9.0);
        assert_eq!(faker.metrics.avg_kills, 4.0);
        assert_eq!(faker.metrics.avg_cs_per_min, 8.0);
        assert_eq!(faker.metrics.avg_vision_score, 30.0);
    }

    #[test]
    fn test_filters() {
        let f = fixture();
        let service = AnalyticsQueryService::new(&f.store);

        let scrims = AnalyticsQuery {
            match_type: Some(MatchType::Scrim),
            ..AnalyticsQuery::default()
        };
        let summaries = service.player_summaries(&f.org, &scrims, now()).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].metrics.games, 1);

        let vs_geng = AnalyticsQuery {
            opponent: Some("gen.g".to_string()),
            ..AnalyticsQuery::default()
        };
        assert_eq!(service.player_summaries(&f.org, &vs_geng, now()).unwrap().len(), 1);

        let only_top = AnalyticsQuery {
            player_id: Some(f.top),
            ..AnalyticsQuery::default()
        };
        let summaries = service.player_summaries(&f.org, &only_top, now()).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].player_id, f.top);

        let whole_history = AnalyticsQuery::new(TimeWindow::DaysBack(365));
        let summaries = service.player_summaries(&f.org, &whole_history, now()).unwrap();
        assert_eq!(summaries[1].metrics.games, 4);
    }

    #[test]
    fn test_team_averages() {
        let f = fixture();
        let service = AnalyticsQueryService::new(&f.store);
        let team = service.team_averages(&f.org, &AnalyticsQuery::default(), now()).unwrap();

        assert_eq!(team.matches_played, 3);
        assert_eq!(team.matches_won, 2);
        assert_eq!(team.win_rate, 0.67);
        assert_eq!(team.per_player.games, 5);
        // kills 17, assists 11, deaths 8
        assert_eq!(team.per_player.kda, 3.5);
    }

    #[test]
    fn test_team_averages_empty_window() {
        let f = fixture();
        let service = AnalyticsQueryService::new(&f.store);
        let empty = AnalyticsQuery::new(TimeWindow::Range {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
        });

        let team = service.team_averages(&f.org, &empty, now()).unwrap();
        assert_eq!(team, TeamAverages::default());
        assert!(service.player_summaries(&f.org, &empty, now()).unwrap().is_empty());

        let unknown_org = OrganizationId::from("nobody");
        let team = service.team_averages(&unknown_org, &AnalyticsQuery::default(), now()).unwrap();
        assert_eq!(team.per_player, MetricSummary::default());
    }

    #[test]
    fn test_role_rankings() {
        let f = fixture();
        let service = AnalyticsQueryService::new(&f.store);
        let rankings = service.role_rankings(&f.org, &AnalyticsQuery::default(), now()).unwrap();

        assert_eq!(rankings.len(), 5);
        assert_eq!(rankings.iter().map(|r| r.role).collect::<Vec<_>>(), Role::ALL.to_vec());

        let top = &rankings[0];
        assert_eq!(top.players.len(), 1);
        assert_eq!(top.players[0].player_id, f.top);
        assert_eq!(top.players[0].rank, 1);

        let support = &rankings[4];
        assert!(support.players.is_empty());
        assert!(rankings.iter().all(|r| r.players.iter().all(|p| p.player_id != f.sup)));
    }

    #[test]
    fn test_role_rankings_order_and_ties() {
        let org = OrganizationId::from("org");
        let mut store = MatchStore::new();
        let a = store.add_player(&org, "A", Role::Mid, None).id;
        let b = store.add_player(&org, "B", Role::Mid, None).id;
        let c = store.add_player(&org, "C", Role::Mid, None).id;

        // b and c tie, a is best; ties keep the order they first appeared.
        store.record_match(&org, new_match(false, 20), vec![line(b, "Ahri", 1, 1, 1)]).unwrap();
        store.record_match(&org, new_match(false, 21), vec![line(c, "Ahri", 1, 1, 1)]).unwrap();
        store.record_match(&org, new_match(true, 22), vec![line(a, "Ahri", 9, 1, 1)]).unwrap();

        let service = AnalyticsQueryService::new(&store);
        let rankings = service.role_rankings(&org, &AnalyticsQuery::default(), now()).unwrap();
        let order: Vec<PlayerId> = rankings[2].players.iter().map(|p| p.player_id).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn test_kda_trend() {
        let f = fixture();
        let service = AnalyticsQueryService::new(&f.store);
        let trend = service
            .kda_trend(&f.org, f.mid, &AnalyticsQuery::default(), now())
            .unwrap();

        let kdas: Vec<f64> = trend.points.iter().map(|p| p.kda).collect();
        assert_eq!(kdas, vec![2.0, 4.0, 12.0]);
        let rolling: Vec<f64> = trend.points.iter().map(|p| p.rolling_kda).collect();
        assert_eq!(rolling, vec![2.0, 3.0, 6.0]);
        assert_eq!(trend.average_kda, 6.0);

        assert!(matches!(
            service.kda_trend(&"geng".into(), f.mid, &AnalyticsQuery::default(), now()),
            Err(AppError::ForeignPlayer { .. })
        ));
    }

    #[test]
    fn test_vision_and_laning() {
        let org = OrganizationId::from("org");
        let mut store = MatchStore::new();
        let sup = store.add_player(&org, "Keria", Role::Support, None).id;
        let adc = store.add_player(&org, "Gumayusi", Role::Adc, None).id;

        let mut ward_line = line(sup, "Thresh", 0, 1, 10);
        ward_line.counters = StatCounters {
            vision_score: 90,
            wards_placed: 40,
            wards_killed: 8,
            cs: 30,
            ..ward_line.counters
        };
        store
            .record_match(&org, new_match(true, 20), vec![ward_line, line(adc, "Jinx", 7, 1, 3)])
            .unwrap();

        let service = AnalyticsQueryService::new(&store);
        let vision = service.vision_analysis(&org, &AnalyticsQuery::default(), now()).unwrap();
        assert_eq!(vision[0].player_id, sup);
        assert_eq!(vision[0].avg_wards_placed, 40.0);
        assert_eq!(vision[0].vision_per_min, 3.0);

        let laning = service.laning_analysis(&org, &AnalyticsQuery::default(), now()).unwrap();
        assert_eq!(laning[0].player_id, adc);
        assert_eq!(laning[0].avg_cs_per_min, 8.0);
        assert_eq!(laning[1].avg_cs_per_min, 1.0);
    }

    #[test]
    fn test_team_comparison_percentiles() {
        let f = fixture();
        let service = AnalyticsQueryService::new(&f.store);
        let comparison = service.team_comparison(&f.org, &AnalyticsQuery::default(), now()).unwrap();

        assert_eq!(comparison.players.len(), 2);
        let best = &comparison.players[0];
        assert_eq!(best.player_id, f.mid);
        assert_eq!(best.performance_percentile, 100.0);
        assert_eq!(best.kda_percentile, 100.0);
        assert!(best.performance_delta > 0.0);

        let worst = &comparison.players[1];
        assert_eq!(worst.performance_percentile, 0.0);
        assert!(worst.performance_delta < 0.0);
    }

    #[test]
    fn test_percentile_rank() {
        assert_eq!(percentile_rank(5.0, &[5.0]), 100.0);
        assert_eq!(percentile_rank(1.0, &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(percentile_rank(2.0, &[1.0, 2.0, 3.0]), 50.0);
        assert_eq!(percentile_rank(3.0, &[1.0, 2.0, 3.0]), 100.0);
    }

    #[test]
    fn test_champion_mastery() {
        let f = fixture();
        let service = AnalyticsQueryService::new(&f.store);
        let mastery = service.champion_mastery(&f.org, f.mid).unwrap();

        assert_eq!(mastery.len(), 2);
        let ahri = &mastery[0];
        assert_eq!(ahri.champion, "Ahri");
        assert_eq!(ahri.games_played, 3);
        // (2.0 + 4.0 + 0.0) / 3
        assert_eq!(ahri.average_kda, 2.0);

        let orianna = &mastery[1];
        // 100 * 0.6 + 12 * 4 = 108
        assert_eq!(orianna.grade, Grade::S);
    }
}
