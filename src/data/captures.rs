//! Offline collector reading pre-captured JSON from a directory
//!
//! Capture layout, one subdirectory per league code:
//!
//! ```text
//! captures/
//!   leumit/
//!     players.json          Vec<PlayerListing>
//!     player_details.json   map of player name -> PlayerCapture
//!     schedule.json         Vec<ScheduleRow>
//!     games/
//!       {site_code}.json    GameSheet
//! ```
//!
//! Lets the full pipeline run and re-run against recorded site data with no
//! network in the loop.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::pipeline::{Collector, GameSheet, PlayerCapture, PlayerListing, ScheduleRow};
use crate::{HoopsError, LeagueConfig, Result};

pub struct CaptureCollector {
    root: PathBuf,
}

impl CaptureCollector {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        CaptureCollector {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn league_dir(&self, league: &LeagueConfig) -> PathBuf {
        self.root.join(&league.code)
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        league: &LeagueConfig,
        path: &Path,
    ) -> Result<T> {
        let content = std::fs::read_to_string(path).map_err(|e| HoopsError::Collector {
            league: league.code.clone(),
            message: format!("cannot read capture {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| HoopsError::Collector {
            league: league.code.clone(),
            message: format!("malformed capture {}: {}", path.display(), e),
        })
    }
}

impl Collector for CaptureCollector {
    fn fetch_player_listings(&self, league: &LeagueConfig) -> Result<Vec<PlayerListing>> {
        self.read_json(league, &self.league_dir(league).join("players.json"))
    }

    fn fetch_player(
        &self,
        league: &LeagueConfig,
        listing: &PlayerListing,
    ) -> Result<PlayerCapture> {
        let details: BTreeMap<String, PlayerCapture> =
            self.read_json(league, &self.league_dir(league).join("player_details.json"))?;
        details
            .get(&listing.name)
            .cloned()
            .ok_or_else(|| HoopsError::Collector {
                league: league.code.clone(),
                message: format!("no capture for player '{}'", listing.name),
            })
    }

    fn fetch_schedule(&self, league: &LeagueConfig) -> Result<Vec<ScheduleRow>> {
        self.read_json(league, &self.league_dir(league).join("schedule.json"))
    }

    fn fetch_game(&self, league: &LeagueConfig, site_code: &str) -> Result<GameSheet> {
        self.read_json(
            league,
            &self
                .league_dir(league)
                .join("games")
                .join(format!("{}.json", site_code)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_capture_is_collector_error() {
        let collector = CaptureCollector::new("/nonexistent/captures");
        let league = crate::Config::default().leagues[0].clone();
        match collector.fetch_schedule(&league) {
            Err(HoopsError::Collector { league, .. }) => assert_eq!(league, "leumit"),
            other => panic!("expected collector error, got {:?}", other.map(|_| ())),
        }
    }
}
