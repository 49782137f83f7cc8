//! Leveling model and profile statistics
//!
//! Level is a pure function of XP (see [`level_for_xp`]); everything in this
//! module except [`load_profile_stats`] is synchronous and side-effect free.

mod levels;
mod summary;

pub use levels::{LevelProgress, level_for_xp, level_floor_xp, xp_progress};
pub use summary::{ChallengeCounts, ProfileStats, RewardCounts, load_profile_stats};
