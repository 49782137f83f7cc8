use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an authenticated user
pub type UserId = Uuid;

/// Per-user gamification aggregate
///
/// `xp` is the single source of truth; `level` is a stored copy that is
/// reconciled after every XP change and may lag behind if that write fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub xp: i64,
    pub level: u32,
    pub streak_days: u32,
    pub last_activity_date: Option<NaiveDate>,
}

impl Profile {
    /// A fresh profile with no XP and no streak
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            xp: 0,
            level: 1,
            streak_days: 0,
            last_activity_date: None,
        }
    }
}

/// Partial profile write. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub level: Option<u32>,
    pub streak_days: Option<u32>,
    pub last_activity_date: Option<NaiveDate>,
}

impl ProfileUpdate {
    pub fn level(level: u32) -> Self {
        Self {
            level: Some(level),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.streak_days.is_none() && self.last_activity_date.is_none()
    }
}
