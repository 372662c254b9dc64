//! Per-league sync runs: players, schedule, game sheets, then averages
//!
//! The [`Collector`] trait is the seam to the league websites; everything on
//! this side of it is deterministic and testable against canned captures. A
//! run never fails a whole invocation because one league broke — failures are
//! isolated per league and reported in the summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use crate::aliases::TeamAliasResolver;
use crate::data::Database;
use crate::identity;
use crate::process::{self, shots::RawShotFields};
use crate::stats::{StatCol, StatLine};
use crate::sync::{self, ScrapeMode};
use crate::{
    Config, HoopsError, LeagueConfig, PlayerGameLine, QuarterLine, Result, ScheduleGame,
    StoredPlayer, TeamGameLine,
};

/// A player row from a league's roster listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerListing {
    pub name: String,
    pub date_of_birth: Option<String>,
    /// Raw team name as it appears on the listing page
    pub team: Option<String>,
}

/// Detail fields captured from a player's own page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerCapture {
    pub date_of_birth: String,
    pub height: String,
    pub jersey_number: String,
    pub team: Option<String>,
    pub history: Option<BTreeMap<String, String>>,
}

/// A raw schedule row before team-name resolution and date normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub site_code: String,
    pub round: Option<u32>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub arena: Option<String>,
}

/// One player's raw line from a game sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPlayerLine {
    pub player_name: String,
    pub date_of_birth: Option<String>,
    /// Raw team name
    pub team: String,
    pub starter: Option<u32>,
    pub minutes: Option<String>,
    pub shots: RawShotFields,
    pub stats: StatLine,
}

/// One team's raw totals line from a game sheet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTeamLine {
    pub team: String,
    pub shots: RawShotFields,
    pub stats: StatLine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQuarterLine {
    pub team: String,
    pub quarters: Vec<i64>,
    pub overtime: Option<i64>,
}

/// Everything captured from one game's box-score page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameSheet {
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
    pub player_lines: Vec<RawPlayerLine>,
    pub team_lines: Vec<RawTeamLine>,
    pub quarters: Vec<RawQuarterLine>,
}

/// Trait for league-site collectors
pub trait Collector {
    /// Roster listing for a league's current season
    fn fetch_player_listings(&self, league: &LeagueConfig) -> Result<Vec<PlayerListing>>;

    /// Detail capture for one listed player
    fn fetch_player(&self, league: &LeagueConfig, listing: &PlayerListing)
        -> Result<PlayerCapture>;

    /// The league's full schedule
    fn fetch_schedule(&self, league: &LeagueConfig) -> Result<Vec<ScheduleRow>>;

    /// Box-score sheet for one game
    fn fetch_game(&self, league: &LeagueConfig, site_code: &str) -> Result<GameSheet>;
}

/// Retry a collector operation with exponential backoff
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_error = None;
    for attempt in 0..max_attempts {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                log::warn!("Attempt {} failed: {}", attempt + 1, e);
                last_error = Some(e);
                if attempt < max_attempts - 1 {
                    let delay = Duration::from_millis(100 * 2u64.pow(attempt));
                    thread::sleep(delay);
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| HoopsError::Parse("no attempts made".to_string())))
}

/// Outcome counts for one league run
#[derive(Debug, Clone, Default)]
pub struct LeagueSummary {
    pub league_code: String,
    pub players_fetched: usize,
    pub players_skipped: usize,
    pub games_fetched: usize,
    pub games_skipped: usize,
    pub score_corrections: usize,
}

/// Drives a [`Collector`] through one or more league syncs
pub struct Pipeline<'a, C: Collector> {
    collector: &'a C,
    db: &'a Database,
    resolver: &'a TeamAliasResolver,
    config: &'a Config,
}

impl<'a, C: Collector> Pipeline<'a, C> {
    pub fn new(
        collector: &'a C,
        db: &'a Database,
        resolver: &'a TeamAliasResolver,
        config: &'a Config,
    ) -> Self {
        Pipeline {
            collector,
            db,
            resolver,
            config,
        }
    }

    /// Sync every active league; one league's failure never aborts the rest
    pub fn run_active_leagues(&self, mode: ScrapeMode) -> Vec<(String, Result<LeagueSummary>)> {
        let mut results = Vec::new();
        for league in self.config.active_leagues() {
            log::info!("Syncing league {} ({})", league.code, league.name_en);
            let result = self.run_league(league, mode);
            if let Err(e) = &result {
                log::error!("League {} failed: {}", league.code, e);
            }
            results.push((league.code.clone(), result));
        }
        results
    }

    /// Full sync of one league: players, schedule, new games, then a
    /// from-scratch averages rebuild
    pub fn run_league(&self, league: &LeagueConfig, mode: ScrapeMode) -> Result<LeagueSummary> {
        let mut summary = LeagueSummary {
            league_code: league.code.clone(),
            ..Default::default()
        };

        self.sync_players(league, mode, &mut summary)?;
        self.sync_schedule_and_games(league, &mut summary)?;
        self.rebuild_averages(league)?;

        log::info!(
            "League {}: {} players fetched ({} skipped), {} games fetched ({} skipped), {} score corrections",
            league.code,
            summary.players_fetched,
            summary.players_skipped,
            summary.games_fetched,
            summary.games_skipped,
            summary.score_corrections,
        );
        Ok(summary)
    }

    fn sync_players(
        &self,
        league: &LeagueConfig,
        mode: ScrapeMode,
        summary: &mut LeagueSummary,
    ) -> Result<()> {
        let attempts = self.config.scrape.retry_attempts;
        let listings = with_retry(|| self.collector.fetch_player_listings(league), attempts)?;
        log::info!("League {}: {} players listed", league.code, listings.len());

        for listing in &listings {
            let player_id =
                identity::player_id(&listing.name, listing.date_of_birth.as_deref(), league.id());
            let state = self.db.get_player(&player_id, league.id())?;
            let decision = sync::player_needs_fetch(mode, state.as_lookup());
            log::debug!(
                "Player {} ({}): fetch={} ({})",
                listing.name,
                player_id,
                decision.fetch,
                decision.reason
            );
            if !decision.fetch {
                summary.players_skipped += 1;
                continue;
            }

            let capture = match with_retry(|| self.collector.fetch_player(league, listing), attempts)
            {
                Ok(capture) => capture,
                Err(e) => {
                    // One unreachable player page must not sink the league
                    log::warn!("Skipping player {}: {}", listing.name, e);
                    continue;
                }
            };

            let team = capture.team.clone().or_else(|| listing.team.clone());
            let team_id = team
                .as_deref()
                .and_then(|t| self.resolver.resolve(t, league.id()).team_id);
            self.db.upsert_player(&StoredPlayer {
                player_id: player_id.clone(),
                name: listing.name.clone(),
                league_id: league.id(),
                team_id,
                date_of_birth: capture.date_of_birth,
                height: capture.height,
                jersey_number: capture.jersey_number,
                history: capture.history,
            })?;
            summary.players_fetched += 1;
            self.pause();
        }
        Ok(())
    }

    fn sync_schedule_and_games(
        &self,
        league: &LeagueConfig,
        summary: &mut LeagueSummary,
    ) -> Result<()> {
        let attempts = self.config.scrape.retry_attempts;
        let rows = with_retry(|| self.collector.fetch_schedule(league), attempts)?;
        log::info!("League {}: {} scheduled games", league.code, rows.len());

        for row in &rows {
            self.db.upsert_schedule_game(&self.schedule_game(league, row))?;
        }

        for game in self.db.get_schedule(league.id())? {
            let decision = sync::game_needs_fetch(self.db.game_exists(&game.game_id)?);
            log::debug!("Game {}: fetch={} ({})", game.game_id, decision.fetch, decision.reason);
            if !decision.fetch {
                summary.games_skipped += 1;
                continue;
            }

            let sheet = match with_retry(
                || self.collector.fetch_game(league, &game.site_code),
                attempts,
            ) {
                Ok(sheet) => sheet,
                Err(e) => {
                    log::warn!("Skipping game {}: {}", game.game_id, e);
                    continue;
                }
            };

            if let Some(correction) =
                sync::score_correction(&game, sheet.home_score, sheet.away_score)
            {
                log::info!(
                    "Score correction for {}: {:?} -> {:?}",
                    correction.game_id,
                    correction.stored,
                    correction.scraped
                );
                self.db.update_schedule_score(
                    &correction.game_id,
                    correction.scraped.0,
                    correction.scraped.1,
                )?;
                summary.score_corrections += 1;
            }

            self.record_game(league, &game.game_id, sheet)?;
            summary.games_fetched += 1;
            self.pause();
        }
        Ok(())
    }

    /// Normalize a game sheet's lines and append them to the event log
    fn record_game(&self, league: &LeagueConfig, game_id: &str, sheet: GameSheet) -> Result<()> {
        let mut player_lines = Vec::with_capacity(sheet.player_lines.len());
        for mut raw in sheet.player_lines {
            process::normalize_shot_stats(&mut raw.shots, &mut raw.stats);
            if let Some(minutes) = &raw.minutes {
                raw.stats.set(
                    StatCol::Min,
                    f64::from(process::normalize::normalize_minutes(minutes)),
                );
            }
            let entry = self.resolver.resolve(&raw.team, league.id());
            player_lines.push(PlayerGameLine {
                game_id: game_id.to_string(),
                player_id: identity::player_id(
                    &raw.player_name,
                    raw.date_of_birth.as_deref(),
                    league.id(),
                ),
                player_name: raw.player_name,
                team: entry.canonical_name,
                team_id: entry.team_id,
                league_id: league.id(),
                starter: raw.starter,
                stats: raw.stats,
            });
        }

        let mut team_lines = Vec::with_capacity(sheet.team_lines.len());
        for mut raw in sheet.team_lines {
            process::normalize_shot_stats(&mut raw.shots, &mut raw.stats);
            let entry = self.resolver.resolve(&raw.team, league.id());
            team_lines.push(TeamGameLine {
                game_id: game_id.to_string(),
                team: entry.canonical_name,
                team_id: entry.team_id,
                league_id: league.id(),
                stats: raw.stats,
            });
        }

        let quarter_lines: Vec<QuarterLine> = sheet
            .quarters
            .into_iter()
            .map(|raw| QuarterLine {
                game_id: game_id.to_string(),
                team: self
                    .resolver
                    .resolve(&raw.team, league.id())
                    .canonical_name,
                league_id: league.id(),
                quarters: raw.quarters,
                overtime: raw.overtime,
            })
            .collect();

        self.db
            .insert_game_lines(&player_lines, &team_lines, &quarter_lines)
    }

    /// Rebuild and store the league's three averages tables from the full
    /// event log
    pub fn rebuild_averages(&self, league: &LeagueConfig) -> Result<()> {
        let player_lines = self.db.get_player_lines(league.id())?;
        let team_lines = self.db.get_team_lines(league.id())?;
        let report =
            process::compute_averages(&player_lines, &team_lines, self.resolver, league.id());
        log::info!(
            "League {}: averages rebuilt for {} players, {} teams",
            league.code,
            report.players.len(),
            report.teams.len()
        );
        self.db.replace_averages(league.id(), &report)
    }

    fn schedule_game(&self, league: &LeagueConfig, row: &ScheduleRow) -> ScheduleGame {
        let home = self.resolver.resolve(&row.home_team, league.id());
        let away = self.resolver.resolve(&row.away_team, league.id());
        ScheduleGame {
            game_id: identity::game_id(league.id(), &row.site_code),
            league_id: league.id(),
            site_code: row.site_code.clone(),
            round: row.round,
            date: row.date.as_deref().and_then(process::normalize::normalize_date),
            time: row.time.clone(),
            home_team: home.canonical_name,
            away_team: away.canonical_name,
            home_score: row.home_score,
            away_score: row.away_score,
            arena: row.arena.clone(),
        }
    }

    fn pause(&self) {
        if self.config.scrape.delay_ms > 0 {
            thread::sleep(Duration::from_millis(self.config.scrape.delay_ms));
        }
    }
}
