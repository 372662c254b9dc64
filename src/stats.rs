//! Statistical column model shared by the normalizer and the aggregator
//!
//! The scraped sources carry a fixed universe of numeric box-score columns,
//! not all of which appear in every league. [`StatCol`] names that universe
//! once; [`StatLine`] stores a value per column so records stay typed instead
//! of passing untyped key-value maps around.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every numeric box-score column the pipeline recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatCol {
    Min,
    Pts,
    TwoPtm,
    TwoPta,
    ThreePtm,
    ThreePta,
    Fgm,
    Fga,
    Ftm,
    Fta,
    Def,
    Off,
    Reb,
    Pf,
    Pfa,
    Stl,
    To,
    Ast,
    Blk,
    Blka,
    Rate,
    SecondChancePts,
    BenchPts,
    FastBreakPts,
    PointsInPaint,
    PtsOffTurnovers,
    FgPct,
    TwoPtPct,
    ThreePtPct,
    FtPct,
    Possessions,
}

impl StatCol {
    pub const COUNT: usize = 31;

    /// All columns, in canonical storage order
    pub const ALL: [StatCol; Self::COUNT] = [
        StatCol::Min,
        StatCol::Pts,
        StatCol::TwoPtm,
        StatCol::TwoPta,
        StatCol::ThreePtm,
        StatCol::ThreePta,
        StatCol::Fgm,
        StatCol::Fga,
        StatCol::Ftm,
        StatCol::Fta,
        StatCol::Def,
        StatCol::Off,
        StatCol::Reb,
        StatCol::Pf,
        StatCol::Pfa,
        StatCol::Stl,
        StatCol::To,
        StatCol::Ast,
        StatCol::Blk,
        StatCol::Blka,
        StatCol::Rate,
        StatCol::SecondChancePts,
        StatCol::BenchPts,
        StatCol::FastBreakPts,
        StatCol::PointsInPaint,
        StatCol::PtsOffTurnovers,
        StatCol::FgPct,
        StatCol::TwoPtPct,
        StatCol::ThreePtPct,
        StatCol::FtPct,
        StatCol::Possessions,
    ];

    /// Counting columns averaged for player lines
    pub const PLAYER_COLS: [StatCol; 21] = [
        StatCol::Pts,
        StatCol::TwoPtm,
        StatCol::TwoPta,
        StatCol::ThreePtm,
        StatCol::ThreePta,
        StatCol::Fgm,
        StatCol::Fga,
        StatCol::Ftm,
        StatCol::Fta,
        StatCol::Def,
        StatCol::Off,
        StatCol::Reb,
        StatCol::Pf,
        StatCol::Pfa,
        StatCol::Stl,
        StatCol::To,
        StatCol::Ast,
        StatCol::Blk,
        StatCol::Blka,
        StatCol::Rate,
        StatCol::Min,
    ];

    /// Counting columns averaged for team lines
    pub const TEAM_COLS: [StatCol; 25] = [
        StatCol::Pts,
        StatCol::TwoPtm,
        StatCol::TwoPta,
        StatCol::ThreePtm,
        StatCol::ThreePta,
        StatCol::Fgm,
        StatCol::Fga,
        StatCol::Ftm,
        StatCol::Fta,
        StatCol::Def,
        StatCol::Off,
        StatCol::Reb,
        StatCol::Pf,
        StatCol::Pfa,
        StatCol::Stl,
        StatCol::To,
        StatCol::Ast,
        StatCol::Blk,
        StatCol::Blka,
        StatCol::Rate,
        StatCol::SecondChancePts,
        StatCol::BenchPts,
        StatCol::FastBreakPts,
        StatCol::PointsInPaint,
        StatCol::PtsOffTurnovers,
    ];

    /// Team columns attributed to the opposing side when building opponent
    /// averages. Bench points and fouls drawn are not meaningful as
    /// against-stats and are excluded.
    pub const OPP_COLS: [StatCol; 23] = [
        StatCol::Pts,
        StatCol::TwoPtm,
        StatCol::TwoPta,
        StatCol::ThreePtm,
        StatCol::ThreePta,
        StatCol::Fgm,
        StatCol::Fga,
        StatCol::Ftm,
        StatCol::Fta,
        StatCol::Def,
        StatCol::Off,
        StatCol::Reb,
        StatCol::Pf,
        StatCol::Stl,
        StatCol::To,
        StatCol::Ast,
        StatCol::Blk,
        StatCol::Blka,
        StatCol::Rate,
        StatCol::SecondChancePts,
        StatCol::FastBreakPts,
        StatCol::PointsInPaint,
        StatCol::PtsOffTurnovers,
    ];

    /// Team-average columns ranked in descending order (more is better)
    pub const HIGHER_BETTER: [StatCol; 27] = [
        StatCol::Pts,
        StatCol::Fgm,
        StatCol::Fga,
        StatCol::FgPct,
        StatCol::TwoPtm,
        StatCol::TwoPta,
        StatCol::TwoPtPct,
        StatCol::ThreePtm,
        StatCol::ThreePta,
        StatCol::ThreePtPct,
        StatCol::Ftm,
        StatCol::Fta,
        StatCol::FtPct,
        StatCol::Def,
        StatCol::Off,
        StatCol::Reb,
        StatCol::Ast,
        StatCol::Stl,
        StatCol::Blk,
        StatCol::Pfa,
        StatCol::Rate,
        StatCol::SecondChancePts,
        StatCol::BenchPts,
        StatCol::FastBreakPts,
        StatCol::PointsInPaint,
        StatCol::PtsOffTurnovers,
        StatCol::Possessions,
    ];

    /// Team-average columns ranked in ascending order (less is better)
    pub const LOWER_BETTER: [StatCol; 3] = [StatCol::To, StatCol::Pf, StatCol::Blka];

    /// Column name as it appears in scraped data and exported tables
    pub fn name(self) -> &'static str {
        match self {
            StatCol::Min => "min",
            StatCol::Pts => "pts",
            StatCol::TwoPtm => "2ptm",
            StatCol::TwoPta => "2pta",
            StatCol::ThreePtm => "3ptm",
            StatCol::ThreePta => "3pta",
            StatCol::Fgm => "fgm",
            StatCol::Fga => "fga",
            StatCol::Ftm => "ftm",
            StatCol::Fta => "fta",
            StatCol::Def => "def",
            StatCol::Off => "off",
            StatCol::Reb => "reb",
            StatCol::Pf => "pf",
            StatCol::Pfa => "pfa",
            StatCol::Stl => "stl",
            StatCol::To => "to",
            StatCol::Ast => "ast",
            StatCol::Blk => "blk",
            StatCol::Blka => "blka",
            StatCol::Rate => "rate",
            StatCol::SecondChancePts => "second_chance_pts",
            StatCol::BenchPts => "bench_pts",
            StatCol::FastBreakPts => "fast_break_pts",
            StatCol::PointsInPaint => "points_in_paint",
            StatCol::PtsOffTurnovers => "pts_off_turnovers",
            StatCol::FgPct => "fg_pct",
            StatCol::TwoPtPct => "2pt_pct",
            StatCol::ThreePtPct => "3pt_pct",
            StatCol::FtPct => "ft_pct",
            StatCol::Possessions => "possessions",
        }
    }

    pub fn from_name(name: &str) -> Option<StatCol> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(0)
    }
}

impl fmt::Display for StatCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per recognized column; absent columns stay `None`.
///
/// Serialized as a name-to-value map so irregular payloads round-trip through
/// JSON storage without a column for every field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct StatLine {
    values: [Option<f64>; StatCol::COUNT],
}

impl StatLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, col: StatCol) -> Option<f64> {
        self.values[col.index()]
    }

    /// Value with the original's missing-as-zero convention
    pub fn get_or_zero(&self, col: StatCol) -> f64 {
        self.get(col).unwrap_or(0.0)
    }

    pub fn set(&mut self, col: StatCol, value: f64) {
        self.values[col.index()] = Some(value);
    }

    pub fn has(&self, col: StatCol) -> bool {
        self.get(col).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.is_none())
    }
}

impl From<BTreeMap<String, f64>> for StatLine {
    fn from(map: BTreeMap<String, f64>) -> Self {
        let mut line = StatLine::new();
        for (name, value) in map {
            // Unrecognized columns are dropped; the curated universe is fixed
            if let Some(col) = StatCol::from_name(&name) {
                line.set(col, value);
            }
        }
        line
    }
}

impl From<StatLine> for BTreeMap<String, f64> {
    fn from(line: StatLine) -> Self {
        let mut map = BTreeMap::new();
        for col in StatCol::ALL {
            if let Some(value) = line.get(col) {
                map.insert(col.name().to_string(), value);
            }
        }
        map
    }
}

/// Round to one decimal, the display convention for all averaged columns
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimals, used only for possession estimates
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Shooting percentage with the stored rounding convention:
/// `round(100 * made / attempted, 1)` when attempts exist, else `0.0`
pub fn shooting_pct(made: f64, attempted: f64) -> f64 {
    if attempted > 0.0 {
        round1(100.0 * made / attempted)
    } else {
        0.0
    }
}

/// Possession estimate `FGA + 0.44 * FTA - OFF + TO`, rounded to 2 decimals
pub fn possessions(fga: f64, fta: f64, off: f64, to: f64) -> f64 {
    round2(fga + 0.44 * fta - off + to)
}
