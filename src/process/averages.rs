//! Per-entity averages and rankings from the per-league event log
//!
//! All three derived tables (player, team, opponent) are rebuilt from scratch
//! from the full event log on every invocation — never incrementally merged —
//! so average and rank values always reflect the complete, current log.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::aliases::TeamAliasResolver;
use crate::stats::{possessions, round1, shooting_pct, StatCol, StatLine};
use crate::{LeagueId, PlayerGameLine, TeamGameLine};

/// Averaged line for one player on one team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAverage {
    pub player_id: String,
    pub player_name: String,
    pub team: String,
    /// Re-attached from the curated mapping, not from per-row ids
    pub team_id: Option<i64>,
    pub league_id: LeagueId,
    pub games_played: u32,
    pub games_started: u32,
    pub stats: StatLine,
}

/// Averaged line for one team, with per-column league ranks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamAverage {
    pub team: String,
    pub team_id: Option<i64>,
    pub league_id: LeagueId,
    pub games_played: u32,
    pub stats: StatLine,
    /// Average points conceded, threaded in from the opponent table
    pub pts_allowed: Option<f64>,
    pub pts_allowed_rank: Option<u32>,
    /// Rank per column name, min convention (ties share; next rank skips)
    pub ranks: BTreeMap<String, u32>,
}

/// What a team's opponents averaged against it. Stat columns are keyed by the
/// underlying stat; exports prefix them with `opp_`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentAverage {
    pub team: String,
    pub team_id: Option<i64>,
    pub league_id: LeagueId,
    pub games_played: u32,
    pub stats: StatLine,
    pub ranks: BTreeMap<String, u32>,
}

/// The three derived tables for one league
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragesReport {
    pub players: Vec<PlayerAverage>,
    pub teams: Vec<TeamAverage>,
    pub opponents: Vec<OpponentAverage>,
}

/// Compute player, team, and opponent averages from the full event log.
///
/// Team ids on the output rows come from the resolver's curated mapping,
/// guarding against stale or missing ids on individual game rows.
pub fn compute_averages(
    player_lines: &[PlayerGameLine],
    team_lines: &[TeamGameLine],
    resolver: &TeamAliasResolver,
    league: LeagueId,
) -> AveragesReport {
    let players = player_averages(player_lines, resolver, league);
    let opponents = opponent_averages(team_lines, resolver, league);
    let teams = team_averages(team_lines, &opponents, resolver, league);
    AveragesReport {
        players,
        teams,
        opponents,
    }
}

// ==================== Accumulation ====================

/// Per-column running mean; columns absent from a row do not dilute the mean
#[derive(Debug, Default)]
struct ColumnMeans {
    sums: BTreeMap<StatCol, (f64, u32)>,
}

impl ColumnMeans {
    fn add(&mut self, stats: &StatLine, cols: &[StatCol]) {
        for &col in cols {
            if let Some(value) = stats.get(col) {
                let entry = self.sums.entry(col).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
    }

    fn means(&self) -> StatLine {
        let mut line = StatLine::new();
        for (&col, &(sum, count)) in &self.sums {
            if count > 0 {
                line.set(col, sum / count as f64);
            }
        }
        line
    }
}

/// Derive the four shooting percentages from mean makes/attempts.
/// Percentages on averaged counts, never averaged per-game percentages.
fn add_percentages(stats: &mut StatLine) {
    let pairs = [
        (StatCol::TwoPtm, StatCol::TwoPta, StatCol::TwoPtPct),
        (StatCol::ThreePtm, StatCol::ThreePta, StatCol::ThreePtPct),
        (StatCol::Fgm, StatCol::Fga, StatCol::FgPct),
        (StatCol::Ftm, StatCol::Fta, StatCol::FtPct),
    ];
    for (made, attempted, pct) in pairs {
        if stats.has(made) || stats.has(attempted) {
            stats.set(
                pct,
                shooting_pct(stats.get_or_zero(made), stats.get_or_zero(attempted)),
            );
        }
    }
}

/// Possession estimate from mean counts, only when all inputs are present
fn add_possessions(stats: &mut StatLine) {
    if let (Some(fga), Some(fta), Some(off), Some(to)) = (
        stats.get(StatCol::Fga),
        stats.get(StatCol::Fta),
        stats.get(StatCol::Off),
        stats.get(StatCol::To),
    ) {
        stats.set(StatCol::Possessions, possessions(fga, fta, off, to));
    }
}

/// Display rounding for every averaged column. Possessions keep their
/// 2-decimal contract and are exempt.
fn round_means(stats: &mut StatLine) {
    for col in StatCol::ALL {
        if col == StatCol::Possessions {
            continue;
        }
        if let Some(value) = stats.get(col) {
            stats.set(col, round1(value));
        }
    }
}

// ==================== Players ====================

fn player_averages(
    lines: &[PlayerGameLine],
    resolver: &TeamAliasResolver,
    league: LeagueId,
) -> Vec<PlayerAverage> {
    // (player_id, player_name, team) → accumulator; BTreeMap keeps output
    // order deterministic across runs
    let mut groups: BTreeMap<(String, String, String), (ColumnMeans, u32, u32)> = BTreeMap::new();

    for line in lines {
        let key = (
            line.player_id.clone(),
            line.player_name.clone(),
            line.team.clone(),
        );
        let entry = groups.entry(key).or_default();
        entry.0.add(&line.stats, &StatCol::PLAYER_COLS);
        entry.1 += 1;
        entry.2 += line.starter.unwrap_or(0);
    }

    groups
        .into_iter()
        .map(|((player_id, player_name, team), (acc, games, started))| {
            let mut stats = acc.means();
            add_percentages(&mut stats);
            round_means(&mut stats);
            let team_id = resolver.team_id_for(&team, league);
            PlayerAverage {
                player_id,
                player_name,
                team,
                team_id,
                league_id: league,
                games_played: games,
                games_started: started,
                stats,
            }
        })
        .collect()
}

// ==================== Teams ====================

fn team_averages(
    lines: &[TeamGameLine],
    opponents: &[OpponentAverage],
    resolver: &TeamAliasResolver,
    league: LeagueId,
) -> Vec<TeamAverage> {
    let mut groups: BTreeMap<String, (ColumnMeans, u32)> = BTreeMap::new();

    for line in lines {
        let entry = groups.entry(line.team.clone()).or_default();
        entry.0.add(&line.stats, &StatCol::TEAM_COLS);
        entry.1 += 1;
    }

    let mut teams: Vec<TeamAverage> = groups
        .into_iter()
        .map(|(team, (acc, games))| {
            let mut stats = acc.means();
            add_possessions(&mut stats);
            add_percentages(&mut stats);
            round_means(&mut stats);
            let team_id = resolver.team_id_for(&team, league);
            TeamAverage {
                team,
                team_id,
                league_id: league,
                games_played: games,
                stats,
                pts_allowed: None,
                pts_allowed_rank: None,
                ranks: BTreeMap::new(),
            }
        })
        .collect();

    for &col in &StatCol::HIGHER_BETTER {
        rank_column(&mut teams, col, true);
    }
    for &col in &StatCol::LOWER_BETTER {
        rank_column(&mut teams, col, false);
    }

    // Thread pts_allowed in from the opponent table
    for team in &mut teams {
        if let Some(opp) = opponents.iter().find(|o| o.team == team.team) {
            team.pts_allowed = opp.stats.get(StatCol::Pts);
            team.pts_allowed_rank = opp.ranks.get(StatCol::Pts.name()).copied();
        }
    }

    teams
}

fn rank_column(teams: &mut [TeamAverage], col: StatCol, descending: bool) {
    let values: Vec<(usize, f64)> = teams
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.stats.get(col).map(|v| (i, v)))
        .collect();
    for (i, rank) in min_ranks(&values, descending) {
        teams[i].ranks.insert(col.name().to_string(), rank);
    }
}

/// Competition ("min") ranking: tied entities share the lowest rank of the
/// tie; the next distinct value is offset by the tie size
fn min_ranks(values: &[(usize, f64)], descending: bool) -> Vec<(usize, u32)> {
    values
        .iter()
        .map(|&(i, v)| {
            let better = values
                .iter()
                .filter(|&&(_, other)| if descending { other > v } else { other < v })
                .count();
            (i, better as u32 + 1)
        })
        .collect()
}

// ==================== Opponents ====================

fn opponent_averages(
    lines: &[TeamGameLine],
    resolver: &TeamAliasResolver,
    league: LeagueId,
) -> Vec<OpponentAverage> {
    // Pair up each game's two team rows and attribute one side's raw stats
    // to the other as against-stats
    let mut by_game: BTreeMap<&str, Vec<&TeamGameLine>> = BTreeMap::new();
    for line in lines {
        by_game.entry(line.game_id.as_str()).or_default().push(line);
    }

    let mut groups: BTreeMap<String, (ColumnMeans, u32)> = BTreeMap::new();
    for (game_id, rows) in by_game {
        if rows.len() != 2 {
            if rows.len() > 2 {
                log::warn!("Game {} has {} team rows, expected 2", game_id, rows.len());
            }
            continue;
        }
        for (own, other) in [(rows[0], rows[1]), (rows[1], rows[0])] {
            let entry = groups.entry(own.team.clone()).or_default();
            entry.0.add(&other.stats, &StatCol::OPP_COLS);
            entry.1 += 1;
        }
    }

    let mut opponents: Vec<OpponentAverage> = groups
        .into_iter()
        .map(|(team, (acc, games))| {
            let mut stats = acc.means();
            add_percentages(&mut stats);
            add_possessions(&mut stats);
            round_means(&mut stats);
            let team_id = resolver.team_id_for(&team, league);
            OpponentAverage {
                team,
                team_id,
                league_id: league,
                games_played: games,
                stats,
                ranks: BTreeMap::new(),
            }
        })
        .collect();

    // Allowing less is better, so against-columns rank ascending — except
    // forced turnovers, where more is better
    for col in opponent_rank_columns() {
        let descending = col == StatCol::To;
        let values: Vec<(usize, f64)> = opponents
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.stats.get(col).map(|v| (i, v)))
            .collect();
        for (i, rank) in min_ranks(&values, descending) {
            opponents[i].ranks.insert(col.name().to_string(), rank);
        }
    }

    opponents
}

/// Every column that can appear in an opponent table
fn opponent_rank_columns() -> Vec<StatCol> {
    let mut cols = StatCol::OPP_COLS.to_vec();
    cols.extend([
        StatCol::TwoPtPct,
        StatCol::ThreePtPct,
        StatCol::FgPct,
        StatCol::FtPct,
        StatCol::Possessions,
    ]);
    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::TeamAliasResolver;

    fn resolver() -> TeamAliasResolver {
        let curated = "\
Team_ID,League_ID,Team_Name,short_name,name_variations,bg_color,text_color
101,1,Alpha,ALP,Alpha,,
202,1,Beta,BET,Beta,,
303,1,Gamma,GAM,Gamma,,
";
        TeamAliasResolver::from_reader(curated.as_bytes()).unwrap()
    }

    fn team_line(game: &str, team: &str, cols: &[(StatCol, f64)]) -> TeamGameLine {
        let mut stats = StatLine::new();
        for &(col, v) in cols {
            stats.set(col, v);
        }
        TeamGameLine {
            game_id: game.to_string(),
            team: team.to_string(),
            team_id: None,
            league_id: LeagueId(1),
            stats,
        }
    }

    fn player_line(
        game: &str,
        id: &str,
        name: &str,
        team: &str,
        pts: f64,
        starter: u32,
    ) -> PlayerGameLine {
        let mut stats = StatLine::new();
        stats.set(StatCol::Pts, pts);
        PlayerGameLine {
            game_id: game.to_string(),
            player_id: id.to_string(),
            player_name: name.to_string(),
            team: team.to_string(),
            team_id: None,
            league_id: LeagueId(1),
            starter: Some(starter),
            stats,
        }
    }

    #[test]
    fn test_player_averages_grouping() {
        let lines = vec![
            player_line("1_1", "p1", "Dan Levi", "Alpha", 10.0, 1),
            player_line("1_2", "p1", "Dan Levi", "Alpha", 20.0, 0),
            player_line("1_1", "p2", "Ron Cohen", "Beta", 8.0, 1),
        ];
        let report = compute_averages(&lines, &[], &resolver(), LeagueId(1));

        assert_eq!(report.players.len(), 2);
        let dan = &report.players[0];
        assert_eq!(dan.player_name, "Dan Levi");
        assert_eq!(dan.games_played, 2);
        assert_eq!(dan.games_started, 1);
        assert_eq!(dan.stats.get(StatCol::Pts), Some(15.0));
        // team_id re-attached from the curated mapping
        assert_eq!(dan.team_id, Some(101));
    }

    #[test]
    fn test_mean_skips_absent_columns() {
        let mut with_reb = player_line("1_1", "p1", "Dan Levi", "Alpha", 10.0, 0);
        with_reb.stats.set(StatCol::Reb, 5.0);
        let without_reb = player_line("1_2", "p1", "Dan Levi", "Alpha", 20.0, 0);
        let report = compute_averages(&[with_reb, without_reb], &[], &resolver(), LeagueId(1));
        // reb averaged over the single row that carried it
        assert_eq!(report.players[0].stats.get(StatCol::Reb), Some(5.0));
    }

    #[test]
    fn test_team_possessions_and_pcts() {
        let lines = vec![
            team_line(
                "1_1",
                "Alpha",
                &[
                    (StatCol::Pts, 80.0),
                    (StatCol::Fga, 20.0),
                    (StatCol::Fta, 10.0),
                    (StatCol::Off, 5.0),
                    (StatCol::To, 8.0),
                    (StatCol::TwoPtm, 10.0),
                    (StatCol::TwoPta, 20.0),
                ],
            ),
            team_line("1_1", "Beta", &[(StatCol::Pts, 75.0)]),
        ];
        let report = compute_averages(&[], &lines, &resolver(), LeagueId(1));
        let alpha = report.teams.iter().find(|t| t.team == "Alpha").unwrap();
        // 20 + 0.44*10 - 5 + 8 = 27.4
        assert_eq!(alpha.stats.get(StatCol::Possessions), Some(27.4));
        assert_eq!(alpha.stats.get(StatCol::TwoPtPct), Some(50.0));

        let beta = report.teams.iter().find(|t| t.team == "Beta").unwrap();
        assert_eq!(beta.stats.get(StatCol::Possessions), None);
    }

    #[test]
    fn test_rank_min_convention() {
        let lines = vec![
            team_line("1_1", "Alpha", &[(StatCol::Pts, 10.0)]),
            team_line("1_1", "Beta", &[(StatCol::Pts, 10.0)]),
            team_line("1_2", "Gamma", &[(StatCol::Pts, 8.0)]),
            team_line("1_2", "Alpha", &[(StatCol::Pts, 10.0)]),
        ];
        // Means: Alpha 10, Beta 10, Gamma 8
        let report = compute_averages(&[], &lines, &resolver(), LeagueId(1));
        let rank = |team: &str| {
            report
                .teams
                .iter()
                .find(|t| t.team == team)
                .unwrap()
                .ranks["pts"]
        };
        assert_eq!(rank("Alpha"), 1);
        assert_eq!(rank("Beta"), 1);
        assert_eq!(rank("Gamma"), 3);
    }

    #[test]
    fn test_lower_better_ranks_ascending() {
        let lines = vec![
            team_line("1_1", "Alpha", &[(StatCol::To, 12.0)]),
            team_line("1_1", "Beta", &[(StatCol::To, 9.0)]),
        ];
        let report = compute_averages(&[], &lines, &resolver(), LeagueId(1));
        let beta = report.teams.iter().find(|t| t.team == "Beta").unwrap();
        let alpha = report.teams.iter().find(|t| t.team == "Alpha").unwrap();
        assert_eq!(beta.ranks["to"], 1);
        assert_eq!(alpha.ranks["to"], 2);
    }

    #[test]
    fn test_opponent_attribution() {
        let lines = vec![
            team_line("1_1", "Alpha", &[(StatCol::Pts, 80.0), (StatCol::To, 10.0)]),
            team_line("1_1", "Beta", &[(StatCol::Pts, 70.0), (StatCol::To, 15.0)]),
            team_line("1_2", "Alpha", &[(StatCol::Pts, 90.0), (StatCol::To, 12.0)]),
            team_line("1_2", "Beta", &[(StatCol::Pts, 60.0), (StatCol::To, 13.0)]),
        ];
        let report = compute_averages(&[], &lines, &resolver(), LeagueId(1));

        let alpha = report.opponents.iter().find(|o| o.team == "Alpha").unwrap();
        // Alpha's opponents scored 70 and 60
        assert_eq!(alpha.stats.get(StatCol::Pts), Some(65.0));
        assert_eq!(alpha.games_played, 2);

        // Allowing fewer points ranks first
        assert_eq!(alpha.ranks["pts"], 1);
        let beta = report.opponents.iter().find(|o| o.team == "Beta").unwrap();
        assert_eq!(beta.ranks["pts"], 2);

        // Forcing more turnovers ranks first: Alpha forces 14, Beta 11
        assert_eq!(alpha.ranks["to"], 1);
        assert_eq!(beta.ranks["to"], 2);
    }

    #[test]
    fn test_pts_allowed_threaded_into_team_table() {
        let lines = vec![
            team_line("1_1", "Alpha", &[(StatCol::Pts, 80.0)]),
            team_line("1_1", "Beta", &[(StatCol::Pts, 70.0)]),
        ];
        let report = compute_averages(&[], &lines, &resolver(), LeagueId(1));
        let alpha = report.teams.iter().find(|t| t.team == "Alpha").unwrap();
        assert_eq!(alpha.pts_allowed, Some(70.0));
        assert_eq!(alpha.pts_allowed_rank, Some(1));
    }

    #[test]
    fn test_games_with_one_team_row_skipped_for_opponents() {
        let lines = vec![
            team_line("1_1", "Alpha", &[(StatCol::Pts, 80.0)]),
            team_line("1_1", "Beta", &[(StatCol::Pts, 70.0)]),
            team_line("1_3", "Alpha", &[(StatCol::Pts, 99.0)]),
        ];
        let report = compute_averages(&[], &lines, &resolver(), LeagueId(1));
        let alpha = report.opponents.iter().find(|o| o.team == "Alpha").unwrap();
        assert_eq!(alpha.games_played, 1);
        // but the half game still counts toward the team's own averages
        let team = report.teams.iter().find(|t| t.team == "Alpha").unwrap();
        assert_eq!(team.games_played, 2);
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let players = vec![
            player_line("1_1", "p1", "Dan Levi", "Alpha", 10.0, 1),
            player_line("1_1", "p2", "Ron Cohen", "Beta", 8.0, 0),
        ];
        let teams = vec![
            team_line("1_1", "Alpha", &[(StatCol::Pts, 80.0), (StatCol::To, 10.0)]),
            team_line("1_1", "Beta", &[(StatCol::Pts, 70.0), (StatCol::To, 15.0)]),
        ];
        let r = resolver();
        let a = compute_averages(&players, &teams, &r, LeagueId(1));
        let b = compute_averages(&players, &teams, &r, LeagueId(1));
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_unresolved_team_gets_null_id() {
        let lines = vec![
            team_line("1_1", "Nowhere FC", &[(StatCol::Pts, 50.0)]),
            team_line("1_1", "Alpha", &[(StatCol::Pts, 60.0)]),
        ];
        let report = compute_averages(&[], &lines, &resolver(), LeagueId(1));
        let nowhere = report.teams.iter().find(|t| t.team == "Nowhere FC").unwrap();
        assert_eq!(nowhere.team_id, None);
    }
}
