//! Letter grading of continuous scores.
//!
//! Every cut point lives in a [`BucketLadder`] table so the thresholds are
//! plain data that can be inspected and tested.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{ChampionPoolEntry, PlayerId, Role};

use super::query::PlayerSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::S => write!(f, "S"),
            Grade::A => write!(f, "A"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
            Grade::D => write!(f, "D"),
        }
    }
}

/// Ordered `(lower_bound, value)` steps, highest bound first. A value maps
/// to the first step whose bound it reaches, otherwise to `floor`.
#[derive(Debug, Clone, Copy)]
pub struct BucketLadder<T: Copy + 'static> {
    pub steps: &'static [(f64, T)],
    pub floor: T,
}

impl<T: Copy + 'static> BucketLadder<T> {
    pub const fn new(steps: &'static [(f64, T)], floor: T) -> Self {
        BucketLadder { steps, floor }
    }

    pub fn bucket(&self, value: f64) -> T {
        self.steps
            .iter()
            .find(|(bound, _)| value >= *bound)
            .map(|(_, v)| *v)
            .unwrap_or(self.floor)
    }
}

pub const KDA_BUCKETS: BucketLadder<u8> =
    BucketLadder::new(&[(4.0, 5), (3.0, 4), (2.0, 3), (1.0, 2)], 1);

pub const CS_PER_MIN_BUCKETS: BucketLadder<u8> =
    BucketLadder::new(&[(8.0, 5), (7.0, 4), (6.0, 3), (5.0, 2)], 1);

pub const DAMAGE_SHARE_BUCKETS: BucketLadder<u8> =
    BucketLadder::new(&[(0.30, 5), (0.25, 4), (0.20, 3), (0.15, 2)], 1);

pub const VISION_BUCKETS: BucketLadder<u8> =
    BucketLadder::new(&[(50.0, 5), (35.0, 4), (25.0, 3), (15.0, 2)], 1);

/// Overall average of the four 1-5 sub-scores.
pub const OVERALL_GRADES: BucketLadder<Grade> = BucketLadder::new(
    &[(4.5, Grade::S), (3.5, Grade::A), (2.5, Grade::B), (1.5, Grade::C)],
    Grade::D,
);

/// Champion mastery score (0-100 scale).
pub const MASTERY_GRADES: BucketLadder<Grade> = BucketLadder::new(
    &[(80.0, Grade::S), (70.0, Grade::A), (60.0, Grade::B), (50.0, Grade::C)],
    Grade::D,
);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub kda: u8,
    pub cs: u8,
    pub damage: u8,
    pub vision: u8,
}

impl SubScores {
    pub fn average(&self) -> f64 {
        (self.kda + self.cs + self.damage + self.vision) as f64 / 4.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerGrade {
    pub player_id: PlayerId,
    pub summoner_name: String,
    pub role: Option<Role>,
    pub games: u32,
    pub sub_scores: SubScores,
    pub overall: f64,
    pub grade: Grade,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChampionMastery {
    pub champion: String,
    pub games_played: u32,
    pub games_won: u32,
    pub win_rate: f64,
    pub average_kda: f64,
    pub average_cs_per_min: f64,
    pub average_damage_share: f64,
    pub mastery_score: f64,
    pub grade: Grade,
}

pub struct PerformanceGradingEngine;

impl PerformanceGradingEngine {
    pub fn sub_scores(kda: f64, cs_per_min: f64, damage_share: f64, vision_score: f64) -> SubScores {
        SubScores {
            kda: KDA_BUCKETS.bucket(kda),
            cs: CS_PER_MIN_BUCKETS.bucket(cs_per_min),
            damage: DAMAGE_SHARE_BUCKETS.bucket(damage_share),
            vision: VISION_BUCKETS.bucket(vision_score),
        }
    }

    pub fn overall_grade(average: f64) -> Grade {
        OVERALL_GRADES.bucket(average)
    }

    pub fn grade_player(summary: &PlayerSummary) -> PlayerGrade {
        let m = &summary.metrics;
        let sub_scores = Self::sub_scores(m.kda, m.avg_cs_per_min, m.avg_damage_share, m.avg_vision_score);
        let overall = sub_scores.average();

        PlayerGrade {
            player_id: summary.player_id,
            summoner_name: summary.summoner_name.clone(),
            role: summary.role,
            games: m.games,
            sub_scores,
            overall,
            grade: Self::overall_grade(overall),
        }
    }

    pub fn grade_players(summaries: &[PlayerSummary]) -> Vec<PlayerGrade> {
        summaries.iter().map(Self::grade_player).collect()
    }

    /// `win_rate * 100 * 0.6 + avg_kda * 10 * 0.4`
    pub fn mastery_score(win_rate: f64, average_kda: f64) -> f64 {
        win_rate * 100.0 * 0.6 + average_kda * 10.0 * 0.4
    }

    pub fn mastery_grade(win_rate: f64, average_kda: f64) -> Grade {
        MASTERY_GRADES.bucket(Self::mastery_score(win_rate, average_kda))
    }

    pub fn champion_mastery(entry: &ChampionPoolEntry) -> ChampionMastery {
        let win_rate = entry.win_rate();
        let average_kda = entry.average_kda();
        let mastery_score = Self::mastery_score(win_rate, average_kda);

        ChampionMastery {
            champion: entry.champion.clone(),
            games_played: entry.games_played,
            games_won: entry.games_won,
            win_rate,
            average_kda,
            average_cs_per_min: entry.average_cs_per_min(),
            average_damage_share: entry.average_damage_share(),
            mastery_score,
            grade: MASTERY_GRADES.bucket(mastery_score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::query::MetricSummary;

    #[test]
    fn test_kda_buckets() {
        assert_eq!(KDA_BUCKETS.bucket(0.0), 1);
        assert_eq!(KDA_BUCKETS.bucket(0.99), 1);
        assert_eq!(KDA_BUCKETS.bucket(1.0), 2);
        assert_eq!(KDA_BUCKETS.bucket(2.5), 3);
        assert_eq!(KDA_BUCKETS.bucket(3.99), 4);
        assert_eq!(KDA_BUCKETS.bucket(4.0), 5);
        assert_eq!(KDA_BUCKETS.bucket(25.0), 5);
    }

    #[test]
    fn test_ladders_are_descending() {
        for ladder in [KDA_BUCKETS, CS_PER_MIN_BUCKETS, DAMAGE_SHARE_BUCKETS, VISION_BUCKETS] {
            assert!(ladder.steps.windows(2).all(|w| w[0].0 > w[1].0));
            assert!(ladder.steps.windows(2).all(|w| w[0].1 > w[1].1));
        }
    }

    #[test]
    fn test_overall_grade_cut_points() {
        assert_eq!(PerformanceGradingEngine::overall_grade(5.0), Grade::S);
        assert_eq!(PerformanceGradingEngine::overall_grade(4.5), Grade::S);
        assert_eq!(PerformanceGradingEngine::overall_grade(4.25), Grade::A);
        assert_eq!(PerformanceGradingEngine::overall_grade(3.5), Grade::A);
        assert_eq!(PerformanceGradingEngine::overall_grade(2.5), Grade::B);
        assert_eq!(PerformanceGradingEngine::overall_grade(1.5), Grade::C);
        assert_eq!(PerformanceGradingEngine::overall_grade(1.25), Grade::D);
    }

    #[test]
    fn test_sub_scores_average() {
        let scores = PerformanceGradingEngine::sub_scores(4.2, 7.5, 0.22, 10.0);
        assert_eq!(
            scores,
            SubScores {
                kda: 5,
                cs: 4,
                damage: 3,
                vision: 1
            }
        );
        assert_eq!(scores.average(), 3.25);
        assert_eq!(PerformanceGradingEngine::overall_grade(scores.average()), Grade::B);
    }

    #[test]
    fn test_grade_player_from_summary() {
        let summary = PlayerSummary {
            player_id: PlayerId(7),
            summoner_name: "Faker".to_string(),
            role: Some(Role::Mid),
            metrics: MetricSummary {
                games: 12,
                kda: 4.5,
                avg_cs_per_min: 8.4,
                avg_damage_share: 0.31,
                avg_vision_score: 28.0,
                ..MetricSummary::default()
            },
        };

        let graded = PerformanceGradingEngine::grade_player(&summary);
        // (5 + 5 + 5 + 3) / 4
        assert_eq!(graded.overall, 4.5);
        assert_eq!(graded.grade, Grade::S);
        assert_eq!(graded.games, 12);

        let empty = PlayerSummary {
            metrics: MetricSummary::default(),
            ..summary
        };
        assert_eq!(PerformanceGradingEngine::grade_player(&empty).grade, Grade::D);
    }

    #[test]
    fn test_mastery_grade() {
        // 0.8 * 60 + 5.0 * 4 = 68
        assert!((PerformanceGradingEngine::mastery_score(0.8, 5.0) - 68.0).abs() < 1e-9);
        assert_eq!(PerformanceGradingEngine::mastery_grade(0.8, 5.0), Grade::B);
        assert_eq!(PerformanceGradingEngine::mastery_grade(1.0, 6.0), Grade::S);
        assert_eq!(PerformanceGradingEngine::mastery_grade(0.0, 0.0), Grade::D);
    }

    #[test]
    fn test_mastery_grade_is_monotonic() {
        // Grade derives Ord with S first, so "not worse" means <=.
        let kdas = [0.0, 0.5, 1.0, 2.0, 3.5, 5.0, 8.0, 12.0];
        let rates = [0.0, 0.1, 0.25, 0.4, 0.5, 0.65, 0.8, 1.0];

        for &kda in &kdas {
            for pair in rates.windows(2) {
                let lower = PerformanceGradingEngine::mastery_grade(pair[0], kda);
                let higher = PerformanceGradingEngine::mastery_grade(pair[1], kda);
                assert!(higher <= lower, "win rate {:?} at kda {}", pair, kda);
            }
        }
        for &rate in &rates {
            for pair in kdas.windows(2) {
                let lower = PerformanceGradingEngine::mastery_grade(rate, pair[0]);
                let higher = PerformanceGradingEngine::mastery_grade(rate, pair[1]);
                assert!(higher <= lower, "kda {:?} at win rate {}", pair, rate);
            }
        }
    }
}
