//! Shot-stat normalization: compound "made-attempted" strings to typed fields
//!
//! The box-score markup carries shooting stats as single strings like
//! `"7-12"`. This module splits them into made/attempted columns, derives the
//! combined field-goal totals, and computes the four shooting percentages.

use serde::{Deserialize, Serialize};

use crate::stats::{shooting_pct, StatCol, StatLine};

/// Compound shot strings as scraped, before splitting.
///
/// Fields are consumed when split, which is what makes the normalizer
/// idempotent: on a second pass there is nothing left to split.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawShotFields {
    /// Two-point shots, "made-attempted"
    pub two_pt: Option<String>,
    /// Three-point shots, "made-attempted"
    pub three_pt: Option<String>,
    /// Free throws, "made-attempted"
    pub ft: Option<String>,
}

impl RawShotFields {
    pub fn is_consumed(&self) -> bool {
        self.two_pt.is_none() && self.three_pt.is_none() && self.ft.is_none()
    }
}

/// Split compound shot strings into numeric columns and derive totals and
/// percentages.
///
/// A raw field without the `-` separator is left in place and produces no
/// numeric columns — callers must not assume the split fields exist when the
/// source lacked the pattern. Each split part parses as an integer only when
/// it is all decimal digits; anything else counts as 0.
pub fn normalize_shot_stats(raw: &mut RawShotFields, stats: &mut StatLine) {
    split_pair(&mut raw.two_pt, StatCol::TwoPtm, StatCol::TwoPta, stats);
    split_pair(&mut raw.three_pt, StatCol::ThreePtm, StatCol::ThreePta, stats);
    split_pair(&mut raw.ft, StatCol::Ftm, StatCol::Fta, stats);

    // Combined field goals: 2pt + 3pt
    let fgm = stats.get_or_zero(StatCol::TwoPtm) + stats.get_or_zero(StatCol::ThreePtm);
    let fga = stats.get_or_zero(StatCol::TwoPta) + stats.get_or_zero(StatCol::ThreePta);
    stats.set(StatCol::Fgm, fgm);
    stats.set(StatCol::Fga, fga);

    stats.set(
        StatCol::TwoPtPct,
        shooting_pct(
            stats.get_or_zero(StatCol::TwoPtm),
            stats.get_or_zero(StatCol::TwoPta),
        ),
    );
    stats.set(
        StatCol::ThreePtPct,
        shooting_pct(
            stats.get_or_zero(StatCol::ThreePtm),
            stats.get_or_zero(StatCol::ThreePta),
        ),
    );
    stats.set(StatCol::FgPct, shooting_pct(fgm, fga));
    stats.set(
        StatCol::FtPct,
        shooting_pct(
            stats.get_or_zero(StatCol::Ftm),
            stats.get_or_zero(StatCol::Fta),
        ),
    );
}

fn split_pair(raw: &mut Option<String>, made: StatCol, attempted: StatCol, stats: &mut StatLine) {
    let value = match raw {
        Some(v) if v.contains('-') => v.clone(),
        _ => return,
    };
    let (made_part, att_part) = value.split_once('-').unwrap_or(("", ""));
    stats.set(made, parse_count(made_part));
    stats.set(attempted, parse_count(att_part));
    *raw = None;
}

/// Digits-only integer parse; anything else is 0
fn parse_count(part: &str) -> f64 {
    let part = part.trim();
    if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
        part.parse::<u32>().unwrap_or(0) as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_all_three_pairs() {
        let mut raw = RawShotFields {
            two_pt: Some("7-12".to_string()),
            three_pt: Some("2-6".to_string()),
            ft: Some("5-5".to_string()),
        };
        let mut stats = StatLine::new();
        normalize_shot_stats(&mut raw, &mut stats);

        assert!(raw.is_consumed());
        assert_eq!(stats.get(StatCol::TwoPtm), Some(7.0));
        assert_eq!(stats.get(StatCol::TwoPta), Some(12.0));
        assert_eq!(stats.get(StatCol::ThreePtm), Some(2.0));
        assert_eq!(stats.get(StatCol::ThreePta), Some(6.0));
        assert_eq!(stats.get(StatCol::Ftm), Some(5.0));
        assert_eq!(stats.get(StatCol::Fta), Some(5.0));
        // fgm = 2ptm + 3ptm, fga = 2pta + 3pta
        assert_eq!(stats.get(StatCol::Fgm), Some(9.0));
        assert_eq!(stats.get(StatCol::Fga), Some(18.0));
        assert_eq!(stats.get(StatCol::TwoPtPct), Some(58.3));
        assert_eq!(stats.get(StatCol::ThreePtPct), Some(33.3));
        assert_eq!(stats.get(StatCol::FgPct), Some(50.0));
        assert_eq!(stats.get(StatCol::FtPct), Some(100.0));
    }

    #[test]
    fn test_zero_attempts_yield_zero_pct() {
        let mut raw = RawShotFields {
            two_pt: Some("0-0".to_string()),
            ..Default::default()
        };
        let mut stats = StatLine::new();
        normalize_shot_stats(&mut raw, &mut stats);
        assert_eq!(stats.get(StatCol::TwoPtPct), Some(0.0));
        assert_eq!(stats.get(StatCol::FgPct), Some(0.0));
    }

    #[test]
    fn test_missing_separator_leaves_field() {
        let mut raw = RawShotFields {
            two_pt: Some("DNP".to_string()),
            ..Default::default()
        };
        let mut stats = StatLine::new();
        normalize_shot_stats(&mut raw, &mut stats);
        // unsplit field stays, no numeric columns injected for it
        assert_eq!(raw.two_pt.as_deref(), Some("DNP"));
        assert_eq!(stats.get(StatCol::TwoPtm), None);
        assert_eq!(stats.get(StatCol::TwoPta), None);
    }

    #[test]
    fn test_non_numeric_parts_default_to_zero() {
        let mut raw = RawShotFields {
            two_pt: Some("x-12".to_string()),
            ..Default::default()
        };
        let mut stats = StatLine::new();
        normalize_shot_stats(&mut raw, &mut stats);
        assert_eq!(stats.get(StatCol::TwoPtm), Some(0.0));
        assert_eq!(stats.get(StatCol::TwoPta), Some(12.0));
    }

    #[test]
    fn test_idempotent() {
        let mut raw = RawShotFields {
            two_pt: Some("7-12".to_string()),
            three_pt: Some("2-6".to_string()),
            ft: Some("5-5".to_string()),
        };
        let mut stats = StatLine::new();
        normalize_shot_stats(&mut raw, &mut stats);

        let raw_after = raw.clone();
        let stats_after = stats.clone();
        normalize_shot_stats(&mut raw, &mut stats);
        assert_eq!(raw, raw_after);
        assert_eq!(stats, stats_after);
    }

    #[test]
    fn test_whitespace_tolerated() {
        let mut raw = RawShotFields {
            two_pt: Some(" 3 - 8 ".to_string()),
            ..Default::default()
        };
        let mut stats = StatLine::new();
        normalize_shot_stats(&mut raw, &mut stats);
        assert_eq!(stats.get(StatCol::TwoPtm), Some(3.0));
        assert_eq!(stats.get(StatCol::TwoPta), Some(8.0));
    }
}
