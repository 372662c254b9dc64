//! Storage and export
//!
//! SQLite persistence for players, schedules, and the per-game event log,
//! plus CSV export of the derived averages tables.

pub mod captures;
pub mod database;
pub mod export;

pub use captures::CaptureCollector;
pub use database::{Database, DatabaseStats, StoredPlayerState};
