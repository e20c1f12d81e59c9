use crate::analysis::grading::{ChampionMastery, Grade, PlayerGrade};
use crate::analysis::query::{
    KdaTrend, LaningSummary, PlayerSummary, RoleRanking, TeamAverages, TeamComparison, VisionSummary,
};
use crate::models::Player;
use colored::*;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct PlayerRow {
    id: String,
    name: String,
    role: String,
    puuid: String,
}

#[derive(Tabled)]
struct SummaryRow {
    player: String,
    role: String,
    games: String,
    #[tabled(rename = "W/L")]
    record: String,
    #[tabled(rename = "KDA")]
    kda: String,
    #[tabled(rename = "CS/min")]
    cs_per_min: String,
    damage: String,
    #[tabled(rename = "dmg %")]
    damage_share: String,
    vision: String,
    score: String,
    multikills: String,
}

#[derive(Tabled)]
struct RankRow {
    rank: String,
    player: String,
    games: String,
    #[tabled(rename = "KDA")]
    kda: String,
    score: String,
}

#[derive(Tabled)]
struct GradeRow {
    player: String,
    role: String,
    games: String,
    #[tabled(rename = "KDA")]
    kda: String,
    #[tabled(rename = "CS")]
    cs: String,
    damage: String,
    vision: String,
    overall: String,
    grade: String,
}

#[derive(Tabled)]
struct MasteryRow {
    champion: String,
    games: String,
    win_rate: String,
    #[tabled(rename = "avg KDA")]
    kda: String,
    #[tabled(rename = "CS/min")]
    cs_per_min: String,
    #[tabled(rename = "dmg %")]
    damage_share: String,
    mastery: String,
    grade: String,
}

#[derive(Tabled)]
struct TrendRow {
    date: String,
    champion: String,
    result: String,
    #[tabled(rename = "KDA")]
    kda: String,
    rolling: String,
    score: String,
}

#[derive(Tabled)]
struct VisionRow {
    player: String,
    games: String,
    vision: String,
    #[tabled(rename = "vision/min")]
    per_min: String,
    placed: String,
    killed: String,
}

#[derive(Tabled)]
struct LaningRow {
    player: String,
    role: String,
    games: String,
    #[tabled(rename = "CS")]
    cs: String,
    #[tabled(rename = "CS/min")]
    cs_per_min: String,
    gold: String,
    #[tabled(rename = "gold/min")]
    gold_per_min: String,
}

#[derive(Tabled)]
struct ComparisonRow {
    player: String,
    games: String,
    score: String,
    #[tabled(rename = "vs team")]
    score_delta: String,
    #[tabled(rename = "pct")]
    score_pct: String,
    #[tabled(rename = "KDA")]
    kda: String,
    #[tabled(rename = "KDA pct")]
    kda_pct: String,
    #[tabled(rename = "dmg pct")]
    damage_pct: String,
    #[tabled(rename = "vision pct")]
    vision_pct: String,
}

fn header(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}\n", "=".repeat(60).cyan());
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}\n", table);
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

fn signed(value: f64) -> String {
    let text = format!("{:+.2}", value);
    if value > 0.0 {
        text.green().to_string()
    } else if value < 0.0 {
        text.red().to_string()
    } else {
        text
    }
}

fn colored_grade(grade: Grade) -> String {
    let text = grade.to_string();
    match grade {
        Grade::S => text.magenta().bold().to_string(),
        Grade::A => text.green().bold().to_string(),
        Grade::B => text.cyan().to_string(),
        Grade::C => text.yellow().to_string(),
        Grade::D => text.red().to_string(),
    }
}

pub fn display_error(error: &str) {
    eprintln!("{} {}", "❌ Error:".red().bold(), error);
}

pub fn display_info(message: &str) {
    println!("{} {}", "ℹ️".cyan(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn display_players(players: &[&Player]) {
    header("👥 ROSTER");

    if players.is_empty() {
        println!("{}", "No players yet, add one with `player add`".yellow());
        return;
    }

    let rows = players
        .iter()
        .map(|p| PlayerRow {
            id: p.id.0.to_string(),
            name: p.summoner_name.clone(),
            role: p.role.to_string(),
            puuid: p.puuid.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();
    print_table::<PlayerRow>(rows);
}

pub fn display_player_summaries(summaries: &[PlayerSummary]) {
    header("📊 PLAYER SUMMARIES");

    if summaries.is_empty() {
        println!("{}", "No matches in this window".yellow());
        return;
    }

    let rows = summaries
        .iter()
        .map(|s| {
            let m = &s.metrics;
            let mk = &m.multikills;
            SummaryRow {
                player: s.summoner_name.clone(),
                role: s.role.map(|r| r.to_string()).unwrap_or_default(),
                games: m.games.to_string(),
                record: format!("{}/{}", m.wins, m.games - m.wins),
                kda: format!("{:.2}", m.kda),
                cs_per_min: format!("{:.2}", m.avg_cs_per_min),
                damage: format!("{:.0}", m.avg_damage),
                damage_share: percent(m.avg_damage_share),
                vision: format!("{:.1}", m.avg_vision_score),
                score: format!("{:.2}", m.avg_performance_score),
                multikills: format!(
                    "{}/{}/{}/{}",
                    mk.double_kills, mk.triple_kills, mk.quadra_kills, mk.penta_kills
                ),
            }
        })
        .collect();
    print_table::<SummaryRow>(rows);
}

pub fn display_team_averages(team: &TeamAverages) {
    header("🏆 TEAM AVERAGES");

    let m = &team.per_player;
    println!(
        "{} {} W / {} L ({:.1}% WR)",
        "📈 Matches:".bold(),
        team.matches_won.to_string().green(),
        (team.matches_played - team.matches_won).to_string().red(),
        team.win_rate * 100.0
    );
    println!("• KDA: {:.2}", m.kda);
    println!("• CS/min: {:.2}  Gold/min: {:.2}", m.avg_cs_per_min, m.avg_gold_per_min);
    println!("• Damage: {:.0}  Vision: {:.1}", m.avg_damage, m.avg_vision_score);
    println!("• Performance score: {:.2}\n", m.avg_performance_score);
}

pub fn display_role_rankings(rankings: &[RoleRanking]) {
    header("🥇 ROLE RANKINGS");

    for ranking in rankings {
        println!("{}", ranking.role.to_string().to_uppercase().bold().yellow());
        if ranking.players.is_empty() {
            println!("  {}\n", "no games".dimmed());
            continue;
        }

        let rows = ranking
            .players
            .iter()
            .map(|p| RankRow {
                rank: format!("#{}", p.rank),
                player: p.summoner_name.clone(),
                games: p.games.to_string(),
                kda: format!("{:.2}", p.kda),
                score: format!("{:.2}", p.avg_performance_score),
            })
            .collect();
        print_table::<RankRow>(rows);
    }
}

pub fn display_grades(grades: &[PlayerGrade]) {
    header("📝 PERFORMANCE GRADES");

    if grades.is_empty() {
        println!("{}", "No matches in this window".yellow());
        return;
    }

    let rows = grades
        .iter()
        .map(|g| GradeRow {
            player: g.summoner_name.clone(),
            role: g.role.map(|r| r.to_string()).unwrap_or_default(),
            games: g.games.to_string(),
            kda: g.sub_scores.kda.to_string(),
            cs: g.sub_scores.cs.to_string(),
            damage: g.sub_scores.damage.to_string(),
            vision: g.sub_scores.vision.to_string(),
            overall: format!("{:.2}", g.overall),
            grade: colored_grade(g.grade),
        })
        .collect();
    print_table::<GradeRow>(rows);

    println!("{}", "Interpretation".bold().yellow());
    println!("• Each column is a 1-5 bucket; overall is their mean");
    println!("• S ≥ 4.5, A ≥ 3.5, B ≥ 2.5, C ≥ 1.5, otherwise D\n");
}

pub fn display_champion_mastery(player_name: &str, mastery: &[ChampionMastery]) {
    header(&format!("🎮 Champion pool for {}", player_name));

    if mastery.is_empty() {
        println!("{}", "No champions played yet".yellow());
        return;
    }

    let rows = mastery
        .iter()
        .map(|c| MasteryRow {
            champion: c.champion.clone(),
            games: format!("{} ({}W)", c.games_played, c.games_won),
            win_rate: percent(c.win_rate),
            kda: format!("{:.2}", c.average_kda),
            cs_per_min: format!("{:.2}", c.average_cs_per_min),
            damage_share: percent(c.average_damage_share),
            mastery: format!("{:.1}", c.mastery_score),
            grade: colored_grade(c.grade),
        })
        .collect();
    print_table::<MasteryRow>(rows);

    if let Some(best) = mastery.iter().min_by_key(|c| c.grade) {
        println!(
            "{} {} ({} over {} games)\n",
            "Signature pick:".bold(),
            best.champion,
            best.grade,
            best.games_played
        );
    }
}

pub fn display_kda_trend(player_name: &str, trend: &KdaTrend) {
    header(&format!("📈 KDA trend for {}", player_name));

    if trend.points.is_empty() {
        println!("{}", "No matches in this window".yellow());
        return;
    }

    let rows = trend
        .points
        .iter()
        .map(|p| TrendRow {
            date: p.played_at.format("%Y-%m-%d").to_string(),
            champion: p.champion.clone(),
            result: if p.victory {
                "WIN".green().to_string()
            } else {
                "LOSS".red().to_string()
            },
            kda: format!("{:.2}", p.kda),
            rolling: format!("{:.2}", p.rolling_kda),
            score: format!("{:.2}", p.performance_score),
        })
        .collect();
    print_table::<TrendRow>(rows);

    println!("{} {:.2}\n", "Average KDA:".bold(), trend.average_kda);
}

pub fn display_vision(vision: &[VisionSummary]) {
    header("👁 VISION");

    if vision.is_empty() {
        println!("{}", "No matches in this window".yellow());
        return;
    }

    let rows = vision
        .iter()
        .map(|v| VisionRow {
            player: v.summoner_name.clone(),
            games: v.games.to_string(),
            vision: format!("{:.1}", v.avg_vision_score),
            per_min: format!("{:.2}", v.vision_per_min),
            placed: format!("{:.1}", v.avg_wards_placed),
            killed: format!("{:.1}", v.avg_wards_killed),
        })
        .collect();
    print_table::<VisionRow>(rows);
}

pub fn display_laning(laning: &[LaningSummary]) {
    header("🌾 LANING");

    if laning.is_empty() {
        println!("{}", "No matches in this window".yellow());
        return;
    }

    let rows = laning
        .iter()
        .map(|l| LaningRow {
            player: l.summoner_name.clone(),
            role: l.role.map(|r| r.to_string()).unwrap_or_default(),
            games: l.games.to_string(),
            cs: format!("{:.1}", l.avg_cs),
            cs_per_min: format!("{:.2}", l.avg_cs_per_min),
            gold: format!("{:.0}", l.avg_gold),
            gold_per_min: format!("{:.1}", l.avg_gold_per_min),
        })
        .collect();
    print_table::<LaningRow>(rows);
}

pub fn display_team_comparison(comparison: &TeamComparison) {
    header("⚖️ TEAM COMPARISON");

    if comparison.players.is_empty() {
        println!("{}", "No matches in this window".yellow());
        return;
    }

    let rows = comparison
        .players
        .iter()
        .map(|c| ComparisonRow {
            player: c.summoner_name.clone(),
            games: c.games.to_string(),
            score: format!("{:.2}", c.performance_score),
            score_delta: signed(c.performance_delta),
            score_pct: format!("{:.0}", c.performance_percentile),
            kda: format!("{:.2}", c.kda),
            kda_pct: format!("{:.0}", c.kda_percentile),
            damage_pct: format!("{:.0}", c.damage_share_percentile),
            vision_pct: format!("{:.0}", c.vision_percentile),
        })
        .collect();
    print_table::<ComparisonRow>(rows);

    println!("{}", "Analysis".bold().yellow());
    println!(
        "• Team average performance score: {:.2}",
        comparison.team.avg_performance_score
    );
    println!("• Percentiles rank each player against the rest of the roster in this window\n");
}
