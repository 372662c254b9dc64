//! Team-name resolution against the curated alias table
//!
//! Every raw team-name string met during scraping is resolved, scoped to a
//! league, to one canonical team record. The curated source is a
//! human-maintained CSV with a pipe-delimited alias column; it is loaded once
//! per run and read-only thereafter.

use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::{HoopsError, LeagueId, Result};

const DEFAULT_BG_COLOR: &str = "#000000";
const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";

/// Composite index key. The same alias string may refer to different clubs in
/// different leagues, so the alias alone is never a valid key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AliasKey {
    pub alias: String,
    pub league: LeagueId,
}

/// One canonical team record from the curated source
#[derive(Debug, Clone, PartialEq)]
pub struct TeamAliasEntry {
    /// Curated numeric id; `None` only on the synthetic unresolved fallback
    pub team_id: Option<i64>,
    pub league_id: LeagueId,
    pub canonical_name: String,
    pub short_name: String,
    pub bg_color: String,
    pub text_color: String,
    pub aliases: Vec<String>,
}

/// Raw curated row. Header spellings vary across exports of the sheet, so the
/// serde aliases accept every variant seen in the wild.
#[derive(Debug, Deserialize)]
struct CuratedRow {
    #[serde(alias = "Team_ID", alias = "TeamID")]
    team_id: Option<i64>,
    #[serde(alias = "League_ID", alias = "LeagueID")]
    league_id: Option<i64>,
    #[serde(alias = "Team_Name", alias = "team_name", alias = "name")]
    club_name: Option<String>,
    #[serde(default, alias = "ShortName")]
    short_name: Option<String>,
    #[serde(default, alias = "variations", alias = "Variations")]
    name_variations: Option<String>,
    #[serde(default, alias = "BgColor")]
    bg_color: Option<String>,
    #[serde(default, alias = "TextColor")]
    text_color: Option<String>,
}

/// Load-once, read-only alias index
pub struct TeamAliasResolver {
    teams: Vec<TeamAliasEntry>,
    index: HashMap<AliasKey, usize>,
}

impl TeamAliasResolver {
    /// Resolver with no curated data. Every lookup degrades to the synthetic
    /// unresolved record; useful for tests and for callers that only need the
    /// fallback behavior.
    pub fn empty() -> Self {
        TeamAliasResolver {
            teams: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Load the curated alias table from a CSV file.
    ///
    /// An absent or empty source is fatal for any operation that requires
    /// team resolution, so it surfaces as [`HoopsError::MissingAliasSource`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("Curated teams file not found: {}", path.display());
            return Err(HoopsError::MissingAliasSource(path.display().to_string()));
        }
        let file = std::fs::File::open(path)?;
        let resolver = Self::from_reader(file)?;
        if resolver.teams.is_empty() {
            log::warn!("Curated teams file is empty: {}", path.display());
            return Err(HoopsError::MissingAliasSource(path.display().to_string()));
        }
        log::info!(
            "Loaded team mapping: {} teams, {} name variations",
            resolver.teams.len(),
            resolver.index.len()
        );
        Ok(resolver)
    }

    /// Build the index from any CSV reader. Rows missing a team id, league
    /// id, or canonical name are skipped, as are rows with the league-0
    /// "unassigned" sentinel. Duplicate `(alias, league)` pairs are a
    /// curation error; the later row wins and the override is logged.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut teams = Vec::new();
        let mut index: HashMap<AliasKey, usize> = HashMap::new();

        for row in csv_reader.deserialize() {
            let row: CuratedRow = row?;
            let (team_id, league_id, club_name) = match (row.team_id, row.league_id, &row.club_name)
            {
                (Some(t), Some(l), Some(n)) if !n.trim().is_empty() => (t, l, n),
                _ => continue,
            };
            if league_id == 0 {
                continue;
            }
            let league = LeagueId(league_id);

            let canonical = unescape(club_name);
            let variations_raw = row
                .name_variations
                .as_deref()
                .unwrap_or(club_name.as_str());

            let mut aliases: Vec<String> = unescape(variations_raw)
                .split('|')
                .map(|v| unescape(v.trim()))
                .filter(|v| !v.is_empty())
                .collect();
            // The canonical name always resolves to itself
            if !aliases.iter().any(|a| a == &canonical) {
                aliases.push(canonical.clone());
            }

            let entry = TeamAliasEntry {
                team_id: Some(team_id),
                league_id: league,
                canonical_name: canonical,
                short_name: row
                    .short_name
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| club_name.clone()),
                bg_color: row
                    .bg_color
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BG_COLOR.to_string()),
                text_color: row
                    .text_color
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_TEXT_COLOR.to_string()),
                aliases: aliases.clone(),
            };
            teams.push(entry);
            let slot = teams.len() - 1;

            for alias in aliases {
                let key = AliasKey {
                    alias,
                    league,
                };
                if let Some(previous) = index.insert(key.clone(), slot) {
                    log::warn!(
                        "Duplicate alias '{}' in league {}: '{}' overrides '{}'",
                        key.alias,
                        key.league,
                        teams[slot].canonical_name,
                        teams[previous].canonical_name
                    );
                }
            }
        }

        Ok(TeamAliasResolver { teams, index })
    }

    /// Resolve a raw team-name string, scoped to a league.
    ///
    /// Never fails: when no curated entry matches, a synthetic record with
    /// `team_id: None` and the raw input as canonical name is returned and a
    /// warning is logged for the curator to act on.
    pub fn resolve(&self, raw_name: &str, league: LeagueId) -> TeamAliasEntry {
        let name = unescape(raw_name);

        if let Some(entry) = self.lookup(&name, league) {
            return entry.clone();
        }
        if let Some(entry) = self.lookup(name.trim(), league) {
            return entry.clone();
        }

        log::warn!("No team mapping for '{}' in league {}", name, league);
        TeamAliasEntry {
            team_id: None,
            league_id: league,
            canonical_name: name.clone(),
            short_name: name.clone(),
            bg_color: DEFAULT_BG_COLOR.to_string(),
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            aliases: vec![name],
        }
    }

    /// Curated numeric id for a (usually already canonical) team name.
    ///
    /// Used by the aggregator to re-attach ids from the mapping instead of
    /// trusting whatever id rode along on individual game rows.
    pub fn team_id_for(&self, name: &str, league: LeagueId) -> Option<i64> {
        let id = self
            .lookup(name, league)
            .or_else(|| self.lookup(name.trim(), league))
            .and_then(|e| e.team_id);
        if id.is_none() {
            log::warn!("No team_id for '{}' in league {}", name, league);
        }
        id
    }

    /// Number of curated teams loaded
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    fn lookup(&self, alias: &str, league: LeagueId) -> Option<&TeamAliasEntry> {
        let key = AliasKey {
            alias: alias.to_string(),
            league,
        };
        self.index.get(&key).map(|&slot| &self.teams[slot])
    }
}

/// Decode HTML entities (`&quot;`, `&amp;`, …) left in scraped text
fn unescape(raw: &str) -> String {
    html_escape::decode_html_entities(raw).into_owned()
}
