use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prostaff_stats::analysis::grading::PerformanceGradingEngine;
use prostaff_stats::analysis::query::{AnalyticsQuery, AnalyticsQueryService, TimeWindow};
use prostaff_stats::api::client::RiotApiClient;
use prostaff_stats::config::Config;
use prostaff_stats::display::output::*;
use prostaff_stats::import::{load_manual_entries, ImportOptions, MatchImporter};
use prostaff_stats::models::{MatchType, OrganizationId, PlayerId, Role};
use prostaff_stats::store::MatchStore;

#[derive(Parser, Debug)]
#[command(name = "prostaff-stats")]
#[command(about = "Match statistics and performance analytics for esports rosters", long_about = None)]
struct Cli {
    /// Organization slug every command is scoped to
    #[arg(short, long, global = true, default_value = "default")]
    org: String,

    /// Data directory (overrides PROSTAFF_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (overrides PROSTAFF_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print analytics as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage the roster
    #[command(subcommand)]
    Player(PlayerCommand),

    /// Import recent games of a Riot account into the store
    Import {
        /// Riot Game Name
        game_name: String,

        /// Riot Tag (tag line)
        tag_line: String,

        /// Region (default: RIOT_REGION or na1)
        #[arg(short, long)]
        region: Option<String>,

        /// Number of recent matches to fetch (max: 100)
        #[arg(short, long, default_value = "20")]
        matches: usize,

        #[arg(long)]
        opponent: Option<String>,

        #[arg(long, default_value = "official")]
        match_type: MatchType,
    },

    /// Record matches from a JSON file (one entry or an array)
    Record { file: PathBuf },

    /// Player summaries, team averages and role rankings
    Summary(WindowArgs),

    /// A player's champion pool with mastery grades
    Pool {
        #[arg(short, long)]
        player: u64,
    },

    /// Letter grades per player
    Grades(WindowArgs),

    /// Per-match KDA with a rolling average
    Trend(WindowArgs),

    /// Vision score and ward stats
    Vision(WindowArgs),

    /// CS and gold stats
    Laning(WindowArgs),

    /// Each player against the team average
    Compare(WindowArgs),

    /// Recompute every champion pool from match history
    RebuildPools,
}

#[derive(Subcommand, Debug)]
enum PlayerCommand {
    /// Add a player to the roster
    Add {
        summoner_name: String,

        #[arg(short, long)]
        role: Role,

        /// Riot PUUID, used to match imported games
        #[arg(long)]
        puuid: Option<String>,
    },

    /// List the roster
    List,

    /// Look up a Riot account and store its PUUID on a player
    Link {
        player: u64,
        game_name: String,
        tag_line: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct WindowArgs {
    /// Look back this many days (default: PROSTAFF_DEFAULT_DAYS)
    #[arg(short, long, conflicts_with_all = ["from", "to"])]
    days: Option<u32>,

    /// First day of an explicit range (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of an explicit range, inclusive (default: today)
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,

    #[arg(long)]
    opponent: Option<String>,

    #[arg(long)]
    match_type: Option<MatchType>,

    #[arg(short, long)]
    player: Option<u64>,
}

impl WindowArgs {
    fn query(&self) -> AnalyticsQuery {
        let window = match (self.from, self.to, self.days) {
            (Some(start), to, _) => TimeWindow::Range {
                start,
                end: to.unwrap_or_else(|| Utc::now().date_naive()),
            },
            (None, _, Some(days)) => TimeWindow::DaysBack(days),
            (None, _, None) => TimeWindow::Default,
        };

        AnalyticsQuery {
            window,
            opponent: self.opponent.clone(),
            match_type: self.match_type,
            player_id: self.player.map(PlayerId),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_tracing(&config.log_level);

    let org = OrganizationId::new(cli.org);
    let store_path = config.store_path();
    let mut store = MatchStore::load(&store_path)
        .with_context(|| format!("Failed to open data file {}", store_path.display()))?;

    match cli.command {
        Command::Player(command) => run_player(command, &mut store, &org, &config),
        Command::Import {
            game_name,
            tag_line,
            region,
            matches,
            opponent,
            match_type,
        } => {
            if let Some(region) = region {
                config.region = region;
            }
            let options = ImportOptions { match_type, opponent };
            run_import(&mut store, &org, &config, &game_name, &tag_line, matches, &options)
        }
        Command::Record { file } => {
            let entries = load_manual_entries(&file)?;
            let ids = MatchImporter::import_manual(&mut store, &org, entries)
                .with_context(|| format!("Failed to record matches from {}", file.display()))?;
            store.save().context("Failed to save data file")?;
            display_success(&format!("Recorded {} matches", ids.len()));
            Ok(())
        }
        Command::Pool { player } => {
            let service = AnalyticsQueryService::new(&store);
            let mastery = service.champion_mastery(&org, PlayerId(player))?;
            if cli.json {
                return print_json(&mastery);
            }
            let name = &store.player(&org, PlayerId(player))?.summoner_name;
            display_champion_mastery(name, &mastery);
            Ok(())
        }
        Command::RebuildPools => {
            let count = store.rebuild_champion_pools();
            store.save().context("Failed to save data file")?;
            display_success(&format!("Rebuilt {} champion pool entries", count));
            Ok(())
        }
        analytics => run_analytics(analytics, &store, &org, &config, cli.json),
    }
}

fn run_player(command: PlayerCommand, store: &mut MatchStore, org: &OrganizationId, config: &Config) -> Result<()> {
    match command {
        PlayerCommand::Add {
            summoner_name,
            role,
            puuid,
        } => {
            let id = store.add_player(org, &summoner_name, role, puuid).id;
            store.save().context("Failed to save data file")?;
            display_success(&format!("Added {} as player {}", summoner_name, id));
        }
        PlayerCommand::List => {
            let players: Vec<_> = store.players(org).collect();
            display_players(&players);
        }
        PlayerCommand::Link {
            player,
            game_name,
            tag_line,
        } => {
            let id = PlayerId(player);
            store.player(org, id)?;

            let client = RiotApiClient::new(config)?;
            let account = client.get_account(&game_name, &tag_line)?;
            store.set_puuid(org, id, account.puuid)?;
            store.save().context("Failed to save data file")?;
            display_success(&format!("Linked player {} to {}#{}", id, game_name, tag_line));
        }
    }
    Ok(())
}

fn run_import(
    store: &mut MatchStore,
    org: &OrganizationId,
    config: &Config,
    game_name: &str,
    tag_line: &str,
    count: usize,
    options: &ImportOptions,
) -> Result<()> {
    let client = RiotApiClient::new(config)?;

    display_info(&format!(
        "Fetching games for {}#{} in region {}",
        game_name, tag_line, config.region
    ));
    let account = client.get_account(game_name, tag_line)?;
    if store.player_by_puuid(org, &account.puuid).is_none() {
        bail!(
            "{}#{} is not on the {} roster, link it with `player link` first",
            game_name,
            tag_line,
            org
        );
    }

    let match_ids = client.get_match_ids(&account.puuid, count)?;
    let new_ids: Vec<String> = match_ids
        .into_iter()
        .filter(|id| !store.has_riot_match(org, id))
        .collect();

    if new_ids.is_empty() {
        display_success("⚡ Already up to date (no new matches)");
        return Ok(());
    }
    display_success(&format!("✨ Found {} new matches", new_ids.len()));

    let pb = ProgressBar::new(new_ids.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Importing match details");

    let report = MatchImporter::import_riot_batch(
        store,
        org,
        &new_ids,
        options,
        |match_id| client.get_match(match_id),
        || pb.inc(1),
    );
    pb.finish_and_clear();
    let report = report.context("Import stopped, matches committed so far were saved")?;

    display_success(&format!(
        "Imported {} of {} matches ({} skipped)",
        report.imported.len(),
        new_ids.len(),
        report.skipped
    ));
    Ok(())
}

fn run_analytics(command: Command, store: &MatchStore, org: &OrganizationId, config: &Config, json: bool) -> Result<()> {
    let service = AnalyticsQueryService::new(store).with_default_days(config.default_days);
    let now = Utc::now();

    match command {
        Command::Summary(window) => {
            let query = window.query();
            let summaries = service.player_summaries(org, &query, now)?;
            let team = service.team_averages(org, &query, now)?;
            let rankings = service.role_rankings(org, &query, now)?;
            if json {
                return print_json(&serde_json::json!({
                    "players": summaries,
                    "team": team,
                    "roles": rankings,
                }));
            }
            display_player_summaries(&summaries);
            display_team_averages(&team);
            display_role_rankings(&rankings);
        }
        Command::Grades(window) => {
            let summaries = service.player_summaries(org, &window.query(), now)?;
            let grades = PerformanceGradingEngine::grade_players(&summaries);
            if json {
                return print_json(&grades);
            }
            display_grades(&grades);
        }
        Command::Trend(window) => {
            let Some(player) = window.player.map(PlayerId) else {
                bail!("trend needs --player");
            };
            let trend = service.kda_trend(org, player, &window.query(), now)?;
            if json {
                return print_json(&trend);
            }
            display_kda_trend(&store.player(org, player)?.summoner_name, &trend);
        }
        Command::Vision(window) => {
            let vision = service.vision_analysis(org, &window.query(), now)?;
            if json {
                return print_json(&vision);
            }
            display_vision(&vision);
        }
        Command::Laning(window) => {
            let laning = service.laning_analysis(org, &window.query(), now)?;
            if json {
                return print_json(&laning);
            }
            display_laning(&laning);
        }
        Command::Compare(window) => {
            let comparison = service.team_comparison(org, &window.query(), now)?;
            if json {
                return print_json(&comparison);
            }
            display_team_comparison(&comparison);
        }
        other => bail!("{:?} is not an analytics command", other),
    }
    Ok(())
}
