//! SQLite storage for players, schedules, the per-game event log, and the
//! derived averages tables
//!
//! Game stat rows are append-only: once a game's lines are written they are
//! never updated in place. The three averages tables are the opposite — they
//! are replaced wholesale per league on every aggregation pass.

use crate::stats::StatLine;
use crate::sync::PlayerLookup;
use crate::{
    HoopsError, LeagueId, PlayerGameLine, QuarterLine, Result, ScheduleGame, StoredPlayer,
    TeamGameLine,
};
use crate::process::{AveragesReport, OpponentAverage, PlayerAverage, TeamAverage};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

/// What the store holds for a player id
#[derive(Debug)]
pub enum StoredPlayerState {
    Missing,
    /// A row exists but its history payload would not parse
    Corrupted,
    Found(StoredPlayer),
}

impl StoredPlayerState {
    pub fn as_lookup(&self) -> PlayerLookup<'_> {
        match self {
            StoredPlayerState::Missing => PlayerLookup::Missing,
            StoredPlayerState::Corrupted => PlayerLookup::Corrupted,
            StoredPlayerState::Found(player) => PlayerLookup::Found(player),
        }
    }
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                player_id TEXT NOT NULL,
                league_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                team_id INTEGER,
                date_of_birth TEXT NOT NULL DEFAULT '',
                height TEXT NOT NULL DEFAULT '',
                jersey_number TEXT NOT NULL DEFAULT '',
                history TEXT,
                PRIMARY KEY (player_id, league_id)
            );

            CREATE TABLE IF NOT EXISTS schedule (
                game_id TEXT PRIMARY KEY,
                league_id INTEGER NOT NULL,
                site_code TEXT NOT NULL,
                round INTEGER,
                date TEXT,
                time TEXT,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                home_score INTEGER,
                away_score INTEGER,
                arena TEXT
            );

            CREATE TABLE IF NOT EXISTS player_lines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id TEXT NOT NULL,
                player_id TEXT NOT NULL,
                player_name TEXT NOT NULL,
                team TEXT NOT NULL,
                team_id INTEGER,
                league_id INTEGER NOT NULL,
                starter INTEGER,
                stats TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS team_lines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id TEXT NOT NULL,
                team TEXT NOT NULL,
                team_id INTEGER,
                league_id INTEGER NOT NULL,
                stats TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS quarter_lines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id TEXT NOT NULL,
                team TEXT NOT NULL,
                league_id INTEGER NOT NULL,
                quarters TEXT NOT NULL DEFAULT '[]',
                overtime INTEGER
            );

            CREATE TABLE IF NOT EXISTS player_averages (
                player_id TEXT NOT NULL,
                player_name TEXT NOT NULL,
                team TEXT NOT NULL,
                team_id INTEGER,
                league_id INTEGER NOT NULL,
                games_played INTEGER NOT NULL,
                games_started INTEGER NOT NULL,
                stats TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS team_averages (
                team TEXT NOT NULL,
                team_id INTEGER,
                league_id INTEGER NOT NULL,
                games_played INTEGER NOT NULL,
                stats TEXT NOT NULL DEFAULT '{}',
                pts_allowed REAL,
                pts_allowed_rank INTEGER,
                ranks TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS opponent_averages (
                team TEXT NOT NULL,
                team_id INTEGER,
                league_id INTEGER NOT NULL,
                games_played INTEGER NOT NULL,
                stats TEXT NOT NULL DEFAULT '{}',
                ranks TEXT NOT NULL DEFAULT '{}'
            );

            CREATE INDEX IF NOT EXISTS idx_schedule_league ON schedule(league_id);
            CREATE INDEX IF NOT EXISTS idx_player_lines_game ON player_lines(game_id);
            CREATE INDEX IF NOT EXISTS idx_player_lines_league ON player_lines(league_id);
            CREATE INDEX IF NOT EXISTS idx_team_lines_game ON team_lines(game_id);
            CREATE INDEX IF NOT EXISTS idx_team_lines_league ON team_lines(league_id);
            "#,
        )?;
        Ok(())
    }

    // ==================== Player Operations ====================

    /// Insert or replace a player record
    pub fn upsert_player(&self, player: &StoredPlayer) -> Result<()> {
        let history_json = match &player.history {
            Some(history) => Some(to_json(history)?),
            None => None,
        };
        self.conn.execute(
            r#"
            INSERT INTO players (player_id, league_id, name, team_id,
                                 date_of_birth, height, jersey_number, history)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(player_id, league_id) DO UPDATE SET
                name = excluded.name,
                team_id = excluded.team_id,
                date_of_birth = excluded.date_of_birth,
                height = excluded.height,
                jersey_number = excluded.jersey_number,
                history = excluded.history
            "#,
            params![
                player.player_id,
                player.league_id.0,
                player.name,
                player.team_id,
                player.date_of_birth,
                player.height,
                player.jersey_number,
                history_json,
            ],
        )?;
        Ok(())
    }

    /// Look up a player, distinguishing "not stored" from "stored but
    /// unreadable" so sync decisions can treat the latter as a re-fetch
    pub fn get_player(&self, player_id: &str, league: LeagueId) -> Result<StoredPlayerState> {
        let row: Option<(String, Option<i64>, String, String, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT name, team_id, date_of_birth, height, jersey_number, history
                 FROM players WHERE player_id = ?1 AND league_id = ?2",
                params![player_id, league.0],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()?;

        let (name, team_id, date_of_birth, height, jersey_number, history_json) = match row {
            Some(row) => row,
            None => return Ok(StoredPlayerState::Missing),
        };

        let history = match history_json {
            None => None,
            Some(json) => match serde_json::from_str::<BTreeMap<String, String>>(&json) {
                Ok(history) => Some(history),
                Err(e) => {
                    log::warn!("Unreadable history for player {}: {}", player_id, e);
                    return Ok(StoredPlayerState::Corrupted);
                }
            },
        };

        Ok(StoredPlayerState::Found(StoredPlayer {
            player_id: player_id.to_string(),
            name,
            league_id: league,
            team_id,
            date_of_birth,
            height,
            jersey_number,
            history,
        }))
    }

    /// Player ids listed for a league
    pub fn get_league_player_ids(&self, league: LeagueId) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT player_id FROM players WHERE league_id = ?1 ORDER BY player_id")?;
        let ids = stmt
            .query_map(params![league.0], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // ==================== Schedule Operations ====================

    /// Insert or update a schedule entry
    pub fn upsert_schedule_game(&self, game: &ScheduleGame) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO schedule (game_id, league_id, site_code, round, date, time,
                                  home_team, away_team, home_score, away_score, arena)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(game_id) DO UPDATE SET
                round = COALESCE(excluded.round, round),
                date = COALESCE(excluded.date, date),
                time = COALESCE(excluded.time, time),
                home_team = excluded.home_team,
                away_team = excluded.away_team,
                home_score = COALESCE(excluded.home_score, home_score),
                away_score = COALESCE(excluded.away_score, away_score),
                arena = COALESCE(excluded.arena, arena)
            "#,
            params![
                game.game_id,
                game.league_id.0,
                game.site_code,
                game.round,
                game.date,
                game.time,
                game.home_team,
                game.away_team,
                game.home_score,
                game.away_score,
                game.arena,
            ],
        )?;
        Ok(())
    }

    /// All schedule entries for a league
    pub fn get_schedule(&self, league: LeagueId) -> Result<Vec<ScheduleGame>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, site_code, round, date, time, home_team, away_team,
                    home_score, away_score, arena
             FROM schedule WHERE league_id = ?1 ORDER BY game_id",
        )?;
        let games = stmt
            .query_map(params![league.0], |row| {
                Ok(ScheduleGame {
                    game_id: row.get(0)?,
                    league_id: league,
                    site_code: row.get(1)?,
                    round: row.get(2)?,
                    date: row.get(3)?,
                    time: row.get(4)?,
                    home_team: row.get(5)?,
                    away_team: row.get(6)?,
                    home_score: row.get(7)?,
                    away_score: row.get(8)?,
                    arena: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(games)
    }

    /// Overwrite only the final score of a stored schedule entry
    pub fn update_schedule_score(
        &self,
        game_id: &str,
        home_score: i64,
        away_score: i64,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE schedule SET home_score = ?2, away_score = ?3 WHERE game_id = ?1",
            params![game_id, home_score, away_score],
        )?;
        Ok(())
    }

    // ==================== Event Log Operations ====================

    /// Whether any stat lines were already recorded for a game
    pub fn game_exists(&self, game_id: &str) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM team_lines WHERE game_id = ?1)
                    OR EXISTS(SELECT 1 FROM player_lines WHERE game_id = ?1)",
            params![game_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Append a game's stat lines to the event log in one transaction
    pub fn insert_game_lines(
        &self,
        players: &[PlayerGameLine],
        teams: &[TeamGameLine],
        quarters: &[QuarterLine],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for line in players {
            tx.execute(
                "INSERT INTO player_lines (game_id, player_id, player_name, team,
                                           team_id, league_id, starter, stats)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    line.game_id,
                    line.player_id,
                    line.player_name,
                    line.team,
                    line.team_id,
                    line.league_id.0,
                    line.starter,
                    to_json(&line.stats)?,
                ],
            )?;
        }
        for line in teams {
            tx.execute(
                "INSERT INTO team_lines (game_id, team, team_id, league_id, stats)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    line.game_id,
                    line.team,
                    line.team_id,
                    line.league_id.0,
                    to_json(&line.stats)?,
                ],
            )?;
        }
        for line in quarters {
            tx.execute(
                "INSERT INTO quarter_lines (game_id, team, league_id, quarters, overtime)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    line.game_id,
                    line.team,
                    line.league_id.0,
                    to_json(&line.quarters)?,
                    line.overtime,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Full player event log for a league
    pub fn get_player_lines(&self, league: LeagueId) -> Result<Vec<PlayerGameLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, player_id, player_name, team, team_id, starter, stats
             FROM player_lines WHERE league_id = ?1 ORDER BY id",
        )?;
        let lines = stmt
            .query_map(params![league.0], |row| {
                let stats_json: String = row.get(6)?;
                Ok(PlayerGameLine {
                    game_id: row.get(0)?,
                    player_id: row.get(1)?,
                    player_name: row.get(2)?,
                    team: row.get(3)?,
                    team_id: row.get(4)?,
                    league_id: league,
                    starter: row.get(5)?,
                    stats: stat_line_from_json(&stats_json),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Full team event log for a league
    pub fn get_team_lines(&self, league: LeagueId) -> Result<Vec<TeamGameLine>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, team, team_id, stats
             FROM team_lines WHERE league_id = ?1 ORDER BY id",
        )?;
        let lines = stmt
            .query_map(params![league.0], |row| {
                let stats_json: String = row.get(3)?;
                Ok(TeamGameLine {
                    game_id: row.get(0)?,
                    team: row.get(1)?,
                    team_id: row.get(2)?,
                    league_id: league,
                    stats: stat_line_from_json(&stats_json),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    // ==================== Averages Operations ====================

    /// Replace a league's three derived tables wholesale
    pub fn replace_averages(&self, league: LeagueId, report: &AveragesReport) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM player_averages WHERE league_id = ?1",
            params![league.0],
        )?;
        tx.execute(
            "DELETE FROM team_averages WHERE league_id = ?1",
            params![league.0],
        )?;
        tx.execute(
            "DELETE FROM opponent_averages WHERE league_id = ?1",
            params![league.0],
        )?;

        for avg in &report.players {
            tx.execute(
                "INSERT INTO player_averages (player_id, player_name, team, team_id,
                                              league_id, games_played, games_started, stats)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    avg.player_id,
                    avg.player_name,
                    avg.team,
                    avg.team_id,
                    avg.league_id.0,
                    avg.games_played,
                    avg.games_started,
                    to_json(&avg.stats)?,
                ],
            )?;
        }
        for avg in &report.teams {
            tx.execute(
                "INSERT INTO team_averages (team, team_id, league_id, games_played,
                                            stats, pts_allowed, pts_allowed_rank, ranks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    avg.team,
                    avg.team_id,
                    avg.league_id.0,
                    avg.games_played,
                    to_json(&avg.stats)?,
                    avg.pts_allowed,
                    avg.pts_allowed_rank,
                    to_json(&avg.ranks)?,
                ],
            )?;
        }
        for avg in &report.opponents {
            tx.execute(
                "INSERT INTO opponent_averages (team, team_id, league_id, games_played,
                                                stats, ranks)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    avg.team,
                    avg.team_id,
                    avg.league_id.0,
                    avg.games_played,
                    to_json(&avg.stats)?,
                    to_json(&avg.ranks)?,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_player_averages(&self, league: LeagueId) -> Result<Vec<PlayerAverage>> {
        let mut stmt = self.conn.prepare(
            "SELECT player_id, player_name, team, team_id, games_played, games_started, stats
             FROM player_averages WHERE league_id = ?1 ORDER BY player_id",
        )?;
        let averages = stmt
            .query_map(params![league.0], |row| {
                let stats_json: String = row.get(6)?;
                Ok(PlayerAverage {
                    player_id: row.get(0)?,
                    player_name: row.get(1)?,
                    team: row.get(2)?,
                    team_id: row.get(3)?,
                    league_id: league,
                    games_played: row.get(4)?,
                    games_started: row.get(5)?,
                    stats: stat_line_from_json(&stats_json),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(averages)
    }

    pub fn get_team_averages(&self, league: LeagueId) -> Result<Vec<TeamAverage>> {
        let mut stmt = self.conn.prepare(
            "SELECT team, team_id, games_played, stats, pts_allowed, pts_allowed_rank, ranks
             FROM team_averages WHERE league_id = ?1 ORDER BY team",
        )?;
        let averages = stmt
            .query_map(params![league.0], |row| {
                let stats_json: String = row.get(3)?;
                let ranks_json: String = row.get(6)?;
                Ok(TeamAverage {
                    team: row.get(0)?,
                    team_id: row.get(1)?,
                    league_id: league,
                    games_played: row.get(2)?,
                    stats: stat_line_from_json(&stats_json),
                    pts_allowed: row.get(4)?,
                    pts_allowed_rank: row.get(5)?,
                    ranks: ranks_from_json(&ranks_json),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(averages)
    }

    pub fn get_opponent_averages(&self, league: LeagueId) -> Result<Vec<OpponentAverage>> {
        let mut stmt = self.conn.prepare(
            "SELECT team, team_id, games_played, stats, ranks
             FROM opponent_averages WHERE league_id = ?1 ORDER BY team",
        )?;
        let averages = stmt
            .query_map(params![league.0], |row| {
                let stats_json: String = row.get(3)?;
                let ranks_json: String = row.get(4)?;
                Ok(OpponentAverage {
                    team: row.get(0)?,
                    team_id: row.get(1)?,
                    league_id: league,
                    games_played: row.get(2)?,
                    stats: stat_line_from_json(&stats_json),
                    ranks: ranks_from_json(&ranks_json),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(averages)
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self, league: LeagueId) -> Result<DatabaseStats> {
        let player_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM players WHERE league_id = ?1",
            params![league.0],
            |row| row.get(0),
        )?;
        let scheduled_games: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM schedule WHERE league_id = ?1",
            params![league.0],
            |row| row.get(0),
        )?;
        let scraped_games: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT game_id) FROM team_lines WHERE league_id = ?1",
            params![league.0],
            |row| row.get(0),
        )?;
        let player_line_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM player_lines WHERE league_id = ?1",
            params![league.0],
            |row| row.get(0),
        )?;

        Ok(DatabaseStats {
            player_count: player_count as usize,
            scheduled_games: scheduled_games as usize,
            scraped_games: scraped_games as usize,
            player_line_count: player_line_count as usize,
        })
    }
}

/// Per-league database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub player_count: usize,
    pub scheduled_games: usize,
    pub scraped_games: usize,
    pub player_line_count: usize,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| HoopsError::Parse(e.to_string()))
}

/// A stat payload that fails to parse yields an empty line rather than
/// aborting a whole-league read
fn stat_line_from_json(json: &str) -> StatLine {
    serde_json::from_str(json).unwrap_or_else(|e| {
        log::warn!("Unreadable stat payload: {}", e);
        StatLine::new()
    })
}

fn ranks_from_json(json: &str) -> BTreeMap<String, u32> {
    serde_json::from_str(json).unwrap_or_else(|e| {
        log::warn!("Unreadable ranks payload: {}", e);
        BTreeMap::new()
    })
}
