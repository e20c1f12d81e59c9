use crate::models::{MatchRecord, PlayerMatchStat, StatCounters};

const KDA_CAP: f64 = 40.0;
const CS_CAP: f64 = 20.0;
const DAMAGE_CAP: f64 = 20.0;
const VISION_CAP: f64 = 10.0;
const VICTORY_BONUS: f64 = 10.0;
const MAX_SCORE: f64 = 100.0;

/// Derived per-match fields for one player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedStats {
    pub kda_ratio: f64,
    pub cs_per_min: Option<f64>,
    pub gold_per_min: Option<f64>,
    pub performance_score: f64,
}

pub struct StatAggregator;

impl StatAggregator {
    /// (kills + assists) / max(deaths, 1), rounded to 2 decimals.
    pub fn kda_ratio(kills: u32, deaths: u32, assists: u32) -> f64 {
        let deaths = deaths.max(1) as f64;
        round2((kills as f64 + assists as f64) / deaths)
    }

    /// Rate per minute, or `None` when the duration is unknown or zero.
    pub fn per_minute(value: u32, duration_secs: Option<u32>) -> Option<f64> {
        match duration_secs {
            Some(secs) if secs > 0 => Some(round2(value as f64 / (secs as f64 / 60.0))),
            _ => None,
        }
    }

    /// Composite 0-100 score:
    /// - KDA: up to 40 (`kda * 10`)
    /// - CS/min: up to 20 (`cs_per_min * 2.5`)
    /// - damage share: up to 20 (`share * 100 * 0.8`)
    /// - vision: up to 10 (`vision / 100 * 10`)
    /// - flat 10 for a win
    pub fn performance_score(
        kda_ratio: f64,
        cs_per_min: Option<f64>,
        damage_share: f64,
        vision_score: u32,
        victory: bool,
    ) -> f64 {
        let kda = capped(kda_ratio * 10.0, KDA_CAP);
        let cs = capped(cs_per_min.unwrap_or(0.0) * 2.5, CS_CAP);
        let damage = capped(damage_share * 100.0 * 0.8, DAMAGE_CAP);
        let vision = capped(vision_score as f64 / 100.0 * 10.0, VISION_CAP);
        let bonus = if victory { VICTORY_BONUS } else { 0.0 };

        round2((kda + cs + damage + vision + bonus).min(MAX_SCORE))
    }

    pub fn compute(counters: &StatCounters, duration_secs: Option<u32>, victory: bool) -> DerivedStats {
        let kda_ratio = Self::kda_ratio(counters.kills, counters.deaths, counters.assists);
        let cs_per_min = Self::per_minute(counters.cs, duration_secs);
        let gold_per_min = Self::per_minute(counters.gold, duration_secs);
        let performance_score = Self::performance_score(
            kda_ratio,
            cs_per_min,
            counters.damage_share,
            counters.vision_score,
            victory,
        );

        DerivedStats {
            kda_ratio,
            cs_per_min,
            gold_per_min,
            performance_score,
        }
    }

    /// Fills the derived fields of `stat` from its counters and the match.
    pub fn derive(stat: &mut PlayerMatchStat, game: &MatchRecord) {
        let derived = Self::compute(&stat.counters, game.duration_secs, game.victory);
        stat.kda_ratio = derived.kda_ratio;
        stat.cs_per_min = derived.cs_per_min;
        stat.gold_per_min = derived.gold_per_min;
        stat.performance_score = derived.performance_score;
    }
}

/// Clamps a score term into `[0, cap]`. NaN collapses to 0.
fn capped(value: f64, cap: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, cap)
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
