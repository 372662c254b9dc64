//! CSV export of the derived averages tables
//!
//! One file per table per league, named `{code}_player_averages.csv` and so
//! on. Rank columns ride directly after the stat they rank; points allowed
//! sits after the team's own points columns.

use crate::process::{AveragesReport, OpponentAverage, PlayerAverage, TeamAverage};
use crate::stats::StatCol;
use crate::Result;
use std::io::Write;
use std::path::Path;

/// Write all three averages tables for a league under `folder`
pub fn export_averages(report: &AveragesReport, folder: &Path, code: &str) -> Result<Vec<String>> {
    std::fs::create_dir_all(folder)?;
    let mut written = Vec::new();

    let path = folder.join(format!("{}_player_averages.csv", code));
    write_player_averages(&report.players, std::fs::File::create(&path)?)?;
    written.push(path.display().to_string());

    let path = folder.join(format!("{}_team_averages.csv", code));
    write_team_averages(&report.teams, std::fs::File::create(&path)?)?;
    written.push(path.display().to_string());

    let path = folder.join(format!("{}_opponent_averages.csv", code));
    write_opponent_averages(&report.opponents, std::fs::File::create(&path)?)?;
    written.push(path.display().to_string());

    Ok(written)
}

/// Stat columns of a player table, in export order
fn player_export_cols() -> Vec<StatCol> {
    let mut cols = StatCol::PLAYER_COLS.to_vec();
    cols.extend([
        StatCol::FgPct,
        StatCol::TwoPtPct,
        StatCol::ThreePtPct,
        StatCol::FtPct,
    ]);
    cols
}

/// Stat columns of a team or opponent table, in export order
fn team_export_cols() -> Vec<StatCol> {
    let mut cols = StatCol::TEAM_COLS.to_vec();
    cols.extend([
        StatCol::FgPct,
        StatCol::TwoPtPct,
        StatCol::ThreePtPct,
        StatCol::FtPct,
        StatCol::Possessions,
    ]);
    cols
}

fn opponent_export_cols() -> Vec<StatCol> {
    let mut cols = StatCol::OPP_COLS.to_vec();
    cols.extend([
        StatCol::FgPct,
        StatCol::TwoPtPct,
        StatCol::ThreePtPct,
        StatCol::FtPct,
        StatCol::Possessions,
    ]);
    cols
}

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

fn int(value: Option<i64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

fn rank(ranks: &std::collections::BTreeMap<String, u32>, col: StatCol) -> String {
    ranks
        .get(col.name())
        .map(|r| r.to_string())
        .unwrap_or_default()
}

pub fn write_player_averages<W: Write>(players: &[PlayerAverage], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let cols = player_export_cols();

    let mut header = vec![
        "player_id".to_string(),
        "player_name".to_string(),
        "team".to_string(),
        "team_id".to_string(),
        "league_id".to_string(),
        "games_played".to_string(),
        "games_started".to_string(),
    ];
    header.extend(cols.iter().map(|c| c.name().to_string()));
    csv_writer.write_record(&header)?;

    for avg in players {
        let mut record = vec![
            avg.player_id.clone(),
            avg.player_name.clone(),
            avg.team.clone(),
            int(avg.team_id),
            avg.league_id.to_string(),
            avg.games_played.to_string(),
            avg.games_started.to_string(),
        ];
        record.extend(cols.iter().map(|&c| number(avg.stats.get(c))));
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_team_averages<W: Write>(teams: &[TeamAverage], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let cols = team_export_cols();

    let mut header = vec![
        "team".to_string(),
        "team_id".to_string(),
        "league_id".to_string(),
        "games_played".to_string(),
    ];
    for &col in &cols {
        header.push(col.name().to_string());
        header.push(format!("{}_rank", col.name()));
        if col == StatCol::Pts {
            header.push("pts_allowed".to_string());
            header.push("pts_allowed_rank".to_string());
        }
    }
    csv_writer.write_record(&header)?;

    for avg in teams {
        let mut record = vec![
            avg.team.clone(),
            int(avg.team_id),
            avg.league_id.to_string(),
            avg.games_played.to_string(),
        ];
        for &col in &cols {
            record.push(number(avg.stats.get(col)));
            record.push(rank(&avg.ranks, col));
            if col == StatCol::Pts {
                record.push(number(avg.pts_allowed));
                record.push(
                    avg.pts_allowed_rank
                        .map(|r| r.to_string())
                        .unwrap_or_default(),
                );
            }
        }
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_opponent_averages<W: Write>(opponents: &[OpponentAverage], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let cols = opponent_export_cols();

    let mut header = vec![
        "team".to_string(),
        "team_id".to_string(),
        "league_id".to_string(),
        "games_played".to_string(),
    ];
    for &col in &cols {
        header.push(format!("opp_{}", col.name()));
        header.push(format!("opp_{}_rank", col.name()));
    }
    csv_writer.write_record(&header)?;

    for avg in opponents {
        let mut record = vec![
            avg.team.clone(),
            int(avg.team_id),
            avg.league_id.to_string(),
            avg.games_played.to_string(),
        ];
        for &col in &cols {
            record.push(number(avg.stats.get(col)));
            record.push(rank(&avg.ranks, col));
        }
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::StatLine;
    use crate::LeagueId;
    use std::collections::BTreeMap;

    fn csv_lines(bytes: Vec<u8>) -> Vec<String> {
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_player_export_layout() {
        let mut stats = StatLine::new();
        stats.set(StatCol::Pts, 15.5);
        stats.set(StatCol::FgPct, 48.3);
        let players = vec![PlayerAverage {
            player_id: "abc123def456".to_string(),
            player_name: "Dan Levi".to_string(),
            team: "Maccabi Haifa".to_string(),
            team_id: Some(101),
            league_id: LeagueId(1),
            games_played: 4,
            games_started: 2,
            stats,
        }];

        let mut out = Vec::new();
        write_player_averages(&players, &mut out).unwrap();
        let lines = csv_lines(out);

        assert!(lines[0].starts_with("player_id,player_name,team,team_id,league_id"));
        assert!(lines[0].contains(",pts,"));
        assert!(lines[0].ends_with("fg_pct,2pt_pct,3pt_pct,ft_pct"));
        assert!(lines[1].starts_with("abc123def456,Dan Levi,Maccabi Haifa,101,1,4,2"));
        assert!(lines[1].contains("15.5"));
    }

    #[test]
    fn test_team_export_interleaves_ranks_and_pts_allowed() {
        let mut stats = StatLine::new();
        stats.set(StatCol::Pts, 81.3);
        let teams = vec![TeamAverage {
            team: "Maccabi Haifa".to_string(),
            team_id: Some(101),
            league_id: LeagueId(1),
            games_played: 10,
            stats,
            pts_allowed: Some(71.2),
            pts_allowed_rank: Some(1),
            ranks: BTreeMap::from([("pts".to_string(), 2)]),
        }];

        let mut out = Vec::new();
        write_team_averages(&teams, &mut out).unwrap();
        let lines = csv_lines(out);

        // rank follows its stat; pts_allowed pair follows the pts pair
        assert!(lines[0].contains("pts,pts_rank,pts_allowed,pts_allowed_rank,2ptm,2ptm_rank"));
        assert!(lines[1].contains("81.3,2,71.2,1"));
    }

    #[test]
    fn test_opponent_export_prefixes_columns() {
        let mut stats = StatLine::new();
        stats.set(StatCol::Pts, 71.2);
        let opponents = vec![OpponentAverage {
            team: "Maccabi Haifa".to_string(),
            team_id: Some(101),
            league_id: LeagueId(1),
            games_played: 10,
            stats,
            ranks: BTreeMap::from([("pts".to_string(), 1)]),
        }];

        let mut out = Vec::new();
        write_opponent_averages(&opponents, &mut out).unwrap();
        let lines = csv_lines(out);

        assert!(lines[0].contains("opp_pts,opp_pts_rank"));
        assert!(lines[1].contains("71.2,1"));
    }

    #[test]
    fn test_absent_values_export_empty() {
        let teams = vec![TeamAverage {
            team: "Hapoel Galil".to_string(),
            team_id: None,
            league_id: LeagueId(1),
            games_played: 0,
            stats: StatLine::new(),
            pts_allowed: None,
            pts_allowed_rank: None,
            ranks: BTreeMap::new(),
        }];

        let mut out = Vec::new();
        write_team_averages(&teams, &mut out).unwrap();
        let lines = csv_lines(out);
        assert!(lines[1].starts_with("Hapoel Galil,,1,0,,,,"));
    }
}
