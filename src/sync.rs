//! Sync-state decisions: which entities must be (re-)fetched, and why
//!
//! Stateless decision functions; the caller supplies the entity's last-known
//! stored record (or "not found" / "unreadable"). The engine leans toward
//! re-fetching over blocking: a corrupted stored record is a fetch, not an
//! error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{HoopsError, ScheduleGame, StoredPlayer};

/// Scrape mode governing decision strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrapeMode {
    /// Thorough pass: re-validate existing players and fill missing fields
    Full,
    /// Daily pass: new players and new games only
    Quick,
}

impl fmt::Display for ScrapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeMode::Full => write!(f, "full"),
            ScrapeMode::Quick => write!(f, "quick"),
        }
    }
}

impl FromStr for ScrapeMode {
    type Err = HoopsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(ScrapeMode::Full),
            "quick" => Ok(ScrapeMode::Quick),
            other => Err(HoopsError::Parse(format!("Unknown scrape mode: {}", other))),
        }
    }
}

/// Outcome of a sync-state evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncDecision {
    pub fetch: bool,
    pub reason: &'static str,
}

impl SyncDecision {
    fn fetch(reason: &'static str) -> Self {
        SyncDecision { fetch: true, reason }
    }

    fn skip(reason: &'static str) -> Self {
        SyncDecision {
            fetch: false,
            reason,
        }
    }
}

/// What the store knows about a player
#[derive(Debug)]
pub enum PlayerLookup<'a> {
    /// No stored record exists
    Missing,
    /// A record exists but could not be read or parsed
    Corrupted,
    Found(&'a StoredPlayer),
}

/// Metadata columns carried inside a stored season-history record; anything
/// outside this set is a season entry.
pub const HISTORY_METADATA_KEYS: [&str; 8] = [
    "Name",
    "Current Team",
    "Date Of Birth",
    "Height",
    "Number",
    "player_id",
    "team_id",
    "league_id",
];

/// Decide whether a player must be (re-)fetched.
///
/// New and unreadable players always fetch. Existing players are skipped in
/// quick mode; in full mode any missing detail field or an empty season
/// history forces a re-fetch.
pub fn player_needs_fetch(mode: ScrapeMode, lookup: PlayerLookup<'_>) -> SyncDecision {
    let player = match lookup {
        PlayerLookup::Missing => return SyncDecision::fetch("new player"),
        PlayerLookup::Corrupted => return SyncDecision::fetch("corrupted file"),
        PlayerLookup::Found(player) => player,
    };

    if mode == ScrapeMode::Quick {
        return SyncDecision::skip("existing player (quick mode)");
    }

    if player.date_of_birth.trim().is_empty() {
        return SyncDecision::fetch("Missing DOB");
    }
    if player.height.trim().is_empty() {
        return SyncDecision::fetch("Missing Height");
    }
    if player.jersey_number.trim().is_empty() {
        return SyncDecision::fetch("Missing Number");
    }

    let history = match &player.history {
        None => return SyncDecision::fetch("no season history"),
        Some(history) => history,
    };
    let has_seasons = history.iter().any(|(key, value)| {
        !HISTORY_METADATA_KEYS.contains(&key.as_str()) && !value.trim().is_empty()
    });
    if !has_seasons {
        return SyncDecision::fetch("no season history data");
    }

    SyncDecision::skip("complete data")
}

/// Decide whether a game must be fetched. Existence check only: a game
/// already in the per-league event log is skipped regardless of mode.
pub fn game_needs_fetch(already_scraped: bool) -> SyncDecision {
    if already_scraped {
        SyncDecision::skip("already scraped")
    } else {
        SyncDecision::fetch("new game")
    }
}

/// A final-score disagreement between a stored schedule entry and a freshly
/// scraped page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreCorrection {
    pub game_id: String,
    pub stored: (Option<i64>, Option<i64>),
    pub scraped: (i64, i64),
}

/// Compare a freshly scraped final score against the stored schedule entry.
///
/// A correction is reported only when the page carries a complete score that
/// disagrees with (or fills in) the stored one. The per-game stat and quarter
/// records of an already-scraped game are never retroactively altered; only
/// the schedule entry is overwritten.
pub fn score_correction(
    stored: &ScheduleGame,
    scraped_home: Option<i64>,
    scraped_away: Option<i64>,
) -> Option<ScoreCorrection> {
    let (home, away) = (scraped_home?, scraped_away?);
    if stored.home_score == Some(home) && stored.away_score == Some(away) {
        return None;
    }
    Some(ScoreCorrection {
        game_id: stored.game_id.clone(),
        stored: (stored.home_score, stored.away_score),
        scraped: (home, away),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LeagueId;
    use std::collections::BTreeMap;

    fn complete_player() -> StoredPlayer {
        let mut history = BTreeMap::new();
        history.insert("Name".to_string(), "Dan Levi".to_string());
        history.insert("2023-24".to_string(), "Maccabi Haifa (National)".to_string());
        StoredPlayer {
            player_id: "abc123def456".to_string(),
            name: "Dan Levi".to_string(),
            league_id: LeagueId(1),
            team_id: Some(101),
            date_of_birth: "01/01/1995".to_string(),
            height: "1.98".to_string(),
            jersey_number: "7".to_string(),
            history: Some(history),
        }
    }

    #[test]
    fn test_new_player_always_fetches() {
        for mode in [ScrapeMode::Full, ScrapeMode::Quick] {
            let d = player_needs_fetch(mode, PlayerLookup::Missing);
            assert!(d.fetch);
            assert_eq!(d.reason, "new player");
        }
    }

    #[test]
    fn test_quick_mode_skips_existing() {
        let player = complete_player();
        let d = player_needs_fetch(ScrapeMode::Quick, PlayerLookup::Found(&player));
        assert!(!d.fetch);
        assert_eq!(d.reason, "existing player (quick mode)");
    }

    #[test]
    fn test_full_mode_complete_player_skipped() {
        let player = complete_player();
        let d = player_needs_fetch(ScrapeMode::Full, PlayerLookup::Found(&player));
        assert!(!d.fetch);
        assert_eq!(d.reason, "complete data");
    }

    #[test]
    fn test_full_mode_missing_fields() {
        let mut player = complete_player();
        player.date_of_birth = String::new();
        let d = player_needs_fetch(ScrapeMode::Full, PlayerLookup::Found(&player));
        assert_eq!((d.fetch, d.reason), (true, "Missing DOB"));

        let mut player = complete_player();
        player.height = "  ".to_string();
        let d = player_needs_fetch(ScrapeMode::Full, PlayerLookup::Found(&player));
        assert_eq!((d.fetch, d.reason), (true, "Missing Height"));

        let mut player = complete_player();
        player.jersey_number = String::new();
        let d = player_needs_fetch(ScrapeMode::Full, PlayerLookup::Found(&player));
        assert_eq!((d.fetch, d.reason), (true, "Missing Number"));
    }

    #[test]
    fn test_full_mode_history_checks() {
        let mut player = complete_player();
        player.history = None;
        let d = player_needs_fetch(ScrapeMode::Full, PlayerLookup::Found(&player));
        assert_eq!((d.fetch, d.reason), (true, "no season history"));

        // Only metadata keys and blank seasons: counts as no history data
        let mut player = complete_player();
        let mut history = BTreeMap::new();
        history.insert("Name".to_string(), "Dan Levi".to_string());
        history.insert("team_id".to_string(), "101".to_string());
        history.insert("2023-24".to_string(), "  ".to_string());
        player.history = Some(history);
        let d = player_needs_fetch(ScrapeMode::Full, PlayerLookup::Found(&player));
        assert_eq!((d.fetch, d.reason), (true, "no season history data"));
    }

    #[test]
    fn test_corrupted_record_fetches() {
        let d = player_needs_fetch(ScrapeMode::Quick, PlayerLookup::Corrupted);
        assert_eq!((d.fetch, d.reason), (true, "corrupted file"));
    }

    #[test]
    fn test_game_existence_check() {
        assert!(!game_needs_fetch(true).fetch);
        assert!(game_needs_fetch(false).fetch);
    }

    fn schedule_game(home: Option<i64>, away: Option<i64>) -> ScheduleGame {
        ScheduleGame {
            game_id: "1_12345".to_string(),
            league_id: LeagueId(1),
            site_code: "12345".to_string(),
            round: Some(3),
            date: Some("12/11/2024".to_string()),
            time: None,
            home_team: "Maccabi Haifa".to_string(),
            away_team: "Hapoel Galil".to_string(),
            home_score: home,
            away_score: away,
            arena: None,
        }
    }

    #[test]
    fn test_score_correction_on_mismatch() {
        let stored = schedule_game(Some(80), Some(75));
        let c = score_correction(&stored, Some(82), Some(75)).unwrap();
        assert_eq!(c.scraped, (82, 75));
        assert_eq!(c.stored, (Some(80), Some(75)));
    }

    #[test]
    fn test_score_correction_fills_missing() {
        let stored = schedule_game(None, None);
        let c = score_correction(&stored, Some(90), Some(88)).unwrap();
        assert_eq!(c.scraped, (90, 88));
    }

    #[test]
    fn test_no_correction_when_scores_agree_or_incomplete() {
        let stored = schedule_game(Some(80), Some(75));
        assert!(score_correction(&stored, Some(80), Some(75)).is_none());
        assert!(score_correction(&stored, Some(80), None).is_none());
        assert!(score_correction(&stored, None, Some(75)).is_none());
    }
}
