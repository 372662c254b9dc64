//! Basketball league data pipeline
//!
//! Turns raw box-score and roster records scraped from league websites into a
//! normalized, de-duplicated dataset: stable entity identities, team-name
//! resolution against a curated alias table, incremental sync decisions, shot
//! stat normalization, and per-entity averages with rankings.

pub mod aliases;
pub mod data;
pub mod identity;
pub mod pipeline;
pub mod process;
pub mod stats;
pub mod sync;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use stats::StatLine;

/// Numeric identifier for a league, as assigned in the curated team table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeagueId(pub i64);

impl fmt::Display for LeagueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player as stored between runs.
///
/// `player_id` is the 12-hex digest from [`identity::player_id`]; a player
/// without a known birth date is only unique within their league.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPlayer {
    pub player_id: String,
    pub name: String,
    pub league_id: LeagueId,
    /// Curated numeric team id; `None` when the team alias was unresolved
    pub team_id: Option<i64>,
    pub date_of_birth: String,
    pub height: String,
    pub jersey_number: String,
    /// Season history as loaded from storage, metadata columns included.
    /// `None` when no history record exists for the player.
    pub history: Option<BTreeMap<String, String>>,
}

/// One scheduled (or played) game from the league's downloadable schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleGame {
    /// `"{league_id}_{site_code}"`, reverse-parseable
    pub game_id: String,
    pub league_id: LeagueId,
    pub site_code: String,
    pub round: Option<u32>,
    /// DD/MM/YYYY after normalization
    pub date: Option<String>,
    pub time: Option<String>,
    /// Canonical home team name
    pub home_team: String,
    /// Canonical away team name
    pub away_team: String,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub arena: Option<String>,
}

/// One player's line in one game (event log row, append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerGameLine {
    pub game_id: String,
    pub player_id: String,
    pub player_name: String,
    /// Canonical team name
    pub team: String,
    pub team_id: Option<i64>,
    pub league_id: LeagueId,
    /// 1 when the player started the game, 0 otherwise
    pub starter: Option<u32>,
    pub stats: StatLine,
}

/// One team's line in one game (event log row, append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamGameLine {
    pub game_id: String,
    /// Canonical team name
    pub team: String,
    pub team_id: Option<i64>,
    pub league_id: LeagueId,
    pub stats: StatLine,
}

/// Per-quarter scoring for one team in one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterLine {
    pub game_id: String,
    pub team: String,
    pub league_id: LeagueId,
    pub quarters: Vec<i64>,
    pub overtime: Option<i64>,
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum HoopsError {
    #[error("Curated team alias source missing or empty: {0}")]
    MissingAliasSource(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Collector failed for league {league}: {message}")]
    Collector { league: String, message: String },

    #[error("Unknown league: {0}")]
    UnknownLeague(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, HoopsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub scrape: ScrapeConfig,
    pub data: DataConfig,
    pub leagues: Vec<LeagueConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Politeness delay between consecutive fetches, milliseconds
    pub delay_ms: u64,
    pub timeout_secs: u64,
    pub retry_attempts: u32,
    /// Default scrape mode: "full" or "quick"
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub teams_csv_path: String,
    pub export_folder: String,
}

/// One league entry in the configured league table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueConfig {
    pub league_id: i64,
    /// Short code used in filenames and log prefixes
    pub code: String,
    pub name: String,
    pub name_en: String,
    pub country: String,
    /// Season in "YYYY-YY" form
    pub season: String,
    pub url: String,
    pub active: bool,
}

impl LeagueConfig {
    pub fn id(&self) -> LeagueId {
        LeagueId(self.league_id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scrape: ScrapeConfig {
                delay_ms: 1000,
                timeout_secs: 10,
                retry_attempts: 3,
                mode: "quick".to_string(),
            },
            data: DataConfig {
                database_path: "data/hoops.db".to_string(),
                teams_csv_path: "data/teams.csv".to_string(),
                export_folder: "data/export".to_string(),
            },
            leagues: vec![
                LeagueConfig {
                    league_id: 1,
                    code: "leumit".to_string(),
                    name: "ליגה לאומית".to_string(),
                    name_en: "National League".to_string(),
                    country: "Israel".to_string(),
                    season: current_season(),
                    url: "https://ibasketball.co.il/league/2".to_string(),
                    active: true,
                },
                LeagueConfig {
                    league_id: 2,
                    code: "artzit-north".to_string(),
                    name: "ליגה ארצית צפון".to_string(),
                    name_en: "National North League".to_string(),
                    country: "Israel".to_string(),
                    season: current_season(),
                    url: "https://ibasketball.co.il/league/3".to_string(),
                    active: false,
                },
            ],
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HoopsError::Config(format!("Failed to read config file {}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| HoopsError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HoopsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Active leagues in configuration order
    pub fn active_leagues(&self) -> Vec<&LeagueConfig> {
        self.leagues.iter().filter(|l| l.active).collect()
    }

    /// Find a league by numeric id or code
    pub fn find_league(&self, key: &str) -> Option<&LeagueConfig> {
        self.leagues
            .iter()
            .find(|l| l.league_id.to_string() == key || l.code == key)
    }
}

/// Current season in "YYYY-YY" form, rolling over on the calendar year
pub fn current_season() -> String {
    use chrono::Datelike;
    let year = chrono::Local::now().year();
    format!("{}-{:02}", year, (year + 1) % 100)
}
