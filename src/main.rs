//! Basketball league data pipeline CLI
//!
//! Syncs rosters, schedules, and box scores into SQLite, then rebuilds and
//! exports per-league averages tables.

use clap::{Parser, Subcommand};
use hoops::sync::ScrapeMode;
use hoops::{Config, Result};

#[derive(Parser)]
#[command(name = "hoops")]
#[command(about = "Basketball league scraping and averages pipeline", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// List configured leagues
    Leagues,
    /// Sync players, schedule, and new games, then rebuild averages
    Sync {
        /// League id or code (default: all active leagues)
        #[arg(long)]
        league: Option<String>,
        /// Scrape mode: full or quick (default: from config)
        #[arg(long)]
        mode: Option<String>,
        /// Directory of pre-captured JSON site data
        #[arg(long, default_value = "captures")]
        captures: String,
    },
    /// Rebuild the averages tables from the stored event log
    Averages {
        /// League id or code (default: all active leagues)
        #[arg(long)]
        league: Option<String>,
    },
    /// Export the averages tables to CSV
    Export {
        /// League id or code (default: all active leagues)
        #[arg(long)]
        league: Option<String>,
    },
    /// Show database status per league
    Status,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Leagues => commands::leagues(&config),
        Commands::Sync {
            league,
            mode,
            captures,
        } => commands::sync(&config, league, mode, &captures),
        Commands::Averages { league } => commands::averages(&config, league),
        Commands::Export { league } => commands::export(&config, league),
        Commands::Status => commands::status(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use hoops::aliases::TeamAliasResolver;
    use hoops::data::{export, CaptureCollector, Database};
    use hoops::pipeline::Pipeline;
    use hoops::process::{compute_averages, AveragesReport};
    use hoops::{HoopsError, LeagueConfig};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("captures")?;
        println!("Created data/ and captures/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to configure leagues", config_path);
        println!("  2. Place the curated team table at {}", config.data.teams_csv_path);
        println!("  3. Run 'hoops sync' to ingest captured site data");
        println!("  4. Run 'hoops export' to write the averages tables");

        Ok(())
    }

    pub fn leagues(config: &Config) -> Result<()> {
        println!("Configured leagues");
        println!("───────────────────────────────");
        for league in &config.leagues {
            println!(
                "  [{}] {} — {} ({}), season {}{}",
                league.league_id,
                league.code,
                league.name_en,
                league.country,
                league.season,
                if league.active { "" } else { " [inactive]" }
            );
        }
        Ok(())
    }

    /// Leagues selected by `--league`, or all active ones
    fn selected_leagues<'a>(
        config: &'a Config,
        league: Option<String>,
    ) -> Result<Vec<&'a LeagueConfig>> {
        match league {
            Some(key) => config
                .find_league(&key)
                .map(|l| vec![l])
                .ok_or(HoopsError::UnknownLeague(key)),
            None => Ok(config.active_leagues()),
        }
    }

    pub fn sync(
        config: &Config,
        league: Option<String>,
        mode: Option<String>,
        captures: &str,
    ) -> Result<()> {
        let mode: ScrapeMode = mode.unwrap_or_else(|| config.scrape.mode.clone()).parse()?;
        let db = Database::open(&config.data.database_path)?;
        // A missing team table would flood the data with synthetic entries,
        // so refuse to sync without it
        let resolver = TeamAliasResolver::load(&config.data.teams_csv_path)?;
        let collector = CaptureCollector::new(captures);
        let pipeline = Pipeline::new(&collector, &db, &resolver, config);

        println!("Syncing in {} mode ({} curated teams)", mode, resolver.team_count());

        let mut failures = 0;
        for league in selected_leagues(config, league)? {
            match pipeline.run_league(league, mode) {
                Ok(summary) => {
                    println!(
                        "  {}: {} players fetched ({} skipped), {} games fetched ({} skipped), {} score corrections",
                        summary.league_code,
                        summary.players_fetched,
                        summary.players_skipped,
                        summary.games_fetched,
                        summary.games_skipped,
                        summary.score_corrections,
                    );
                }
                Err(e) => {
                    eprintln!("  {}: failed: {}", league.code, e);
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            return Err(HoopsError::Collector {
                league: format!("{} league(s)", failures),
                message: "sync incomplete".to_string(),
            });
        }
        Ok(())
    }

    pub fn averages(config: &Config, league: Option<String>) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let resolver = TeamAliasResolver::load(&config.data.teams_csv_path)?;

        for league in selected_leagues(config, league)? {
            let player_lines = db.get_player_lines(league.id())?;
            let team_lines = db.get_team_lines(league.id())?;
            let report = compute_averages(&player_lines, &team_lines, &resolver, league.id());
            db.replace_averages(league.id(), &report)?;
            println!(
                "  {}: {} players, {} teams averaged",
                league.code,
                report.players.len(),
                report.teams.len()
            );
        }
        Ok(())
    }

    pub fn export(config: &Config, league: Option<String>) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let folder = std::path::Path::new(&config.data.export_folder);

        for league in selected_leagues(config, league)? {
            let report = AveragesReport {
                players: db.get_player_averages(league.id())?,
                teams: db.get_team_averages(league.id())?,
                opponents: db.get_opponent_averages(league.id())?,
            };
            let files = export::export_averages(&report, folder, &league.code)?;
            for file in files {
                println!("  wrote {}", file);
            }
        }
        Ok(())
    }

    pub fn status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path: {}", config.data.database_path);
        for league in &config.leagues {
            let stats = db.get_stats(league.id())?;
            println!(
                "  {}: {} players, {} scheduled games, {} scraped games, {} player lines",
                league.code,
                stats.player_count,
                stats.scheduled_games,
                stats.scraped_games,
                stats.player_line_count,
            );
        }
        Ok(())
    }
}
