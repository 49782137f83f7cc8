use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::UserId;

/// Whether a reward can be used repeatedly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    Permanent,
    Consumable,
}

impl RewardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Consumable => "consumable",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "permanent" => Some(Self::Permanent),
            "consumable" => Some(Self::Consumable),
            _ => None,
        }
    }
}

/// State of a redemption record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardStatus {
    Claimed,
    Used,
    Expired,
}

impl RewardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claimed => "claimed",
            Self::Used => "used",
            Self::Expired => "expired",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "claimed" => Some(Self::Claimed),
            "used" => Some(Self::Used),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for RewardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog entry that can be bought with XP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTemplate {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Must be positive for the reward to be redeemable
    pub cost_xp: i64,
    pub is_available: bool,
    pub icon: Option<String>,
    #[serde(rename = "type")]
    pub kind: RewardKind,
}

impl RewardTemplate {
    pub fn new(title: impl Into<String>, cost_xp: i64, kind: RewardKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            cost_xp,
            is_available: true,
            icon: None,
            kind,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.is_available = false;
        self
    }
}

/// A redemption record owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReward {
    pub id: Uuid,
    pub user_id: UserId,
    pub reward_id: Uuid,
    pub status: RewardStatus,
    pub claimed_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

impl UserReward {
    pub fn new(user_id: UserId, reward_id: Uuid, status: RewardStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            reward_id,
            status,
            claimed_at: Utc::now(),
            used_at: None,
        }
    }
}

/// A redemption record joined with its catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedReward {
    #[serde(flatten)]
    pub reward: UserReward,
    pub template: Option<RewardTemplate>,
}

impl OwnedReward {
    pub fn title(&self) -> &str {
        self.template
            .as_ref()
            .map(|t| t.title.as_str())
            .unwrap_or("Recompensa")
    }
}

/// Status write for a redemption record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardUpdate {
    pub status: RewardStatus,
    pub used_at: Option<DateTime<Utc>>,
}
