//! XP and level system
//!
//! Level `L` starts at `100 * (L-1)^2` XP, so level 2 needs 100 XP, level 3
//! needs 400, level 4 needs 900 and so on.

use serde::{Deserialize, Serialize};

/// XP scale of the quadratic curve
const XP_PER_LEVEL_UNIT: u64 = 100;

/// Level reached with `xp` total experience. Negative XP counts as zero.
pub fn level_for_xp(xp: i64) -> u32 {
    let units = xp.max(0) as u64 / XP_PER_LEVEL_UNIT;
    let root = units.isqrt();
    u32::try_from(root).unwrap_or(u32::MAX - 1) + 1
}

/// Minimum XP for `level`. Levels below 1 are treated as level 1.
pub fn level_floor_xp(level: u32) -> i64 {
    let steps = i64::from(level.max(1) - 1);
    (XP_PER_LEVEL_UNIT as i64).saturating_mul(steps.saturating_mul(steps))
}

/// Position of a profile within its level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    pub current_level_min_xp: i64,
    pub next_level_min_xp: i64,
    /// Fraction of the current level completed, within 0.0..=1.0
    pub progress: f64,
    pub xp_to_next_level: i64,
}

/// Progress figures for `xp` measured against `level`.
///
/// `level` is usually `level_for_xp(xp)`, but a stored level may be passed;
/// the fraction is clamped either way.
pub fn xp_progress(xp: i64, level: u32) -> LevelProgress {
    let level = level.max(1);
    let floor = level_floor_xp(level);
    let ceiling = level_floor_xp(level.saturating_add(1));
    let range = ceiling - floor;

    let progress = if range > 0 {
        (xp - floor) as f64 / range as f64
    } else {
        1.0
    };

    LevelProgress {
        level,
        current_level_min_xp: floor,
        next_level_min_xp: ceiling,
        progress: progress.clamp(0.0, 1.0),
        xp_to_next_level: (ceiling - xp).max(0),
    }
}
