//! Record processing: field cleaning, shot-stat splitting, and aggregation

pub mod averages;
pub mod normalize;
pub mod shots;

pub use averages::{compute_averages, AveragesReport, OpponentAverage, PlayerAverage, TeamAverage};
pub use shots::{normalize_shot_stats, RawShotFields};
