use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::profile::UserId;
use super::rule::RuleKind;

/// Catalog category of a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeType {
    Daily,
    Weekly,
    Special,
    Beginner,
    /// Any category this crate does not act on
    #[serde(other)]
    Other,
}

impl ChallengeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Special => "special",
            Self::Beginner => "beginner",
            Self::Other => "other",
        }
    }

    /// Unknown categories map to [`ChallengeType::Other`]
    pub fn parse(s: &str) -> Self {
        match s {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "special" => Self::Special,
            "beginner" => Self::Beginner,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a user's challenge instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// Proposed to the user but not yet accepted
    Suggested,
    /// Accepted, no progress recorded yet
    Active,
    /// Accepted with partial progress
    InProgress,
    /// Terminal; progress is 100
    Completed,
}

impl ChallengeStatus {
    /// Statuses the automation considers in flight
    pub const OPEN: [ChallengeStatus; 2] = [ChallengeStatus::Active, ChallengeStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggested => "suggested",
            Self::Active => "active",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Parse a stored status. Legacy `pending` rows are treated as active.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "suggested" => Some(Self::Suggested),
            "active" | "pending" => Some(Self::Active),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active | Self::InProgress)
    }
}

impl std::fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable catalog entry describing a challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeTemplate {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ChallengeType,
    pub reward_xp: i64,
    pub is_active: bool,
    /// Explicit completion rule; inferred from the title when absent
    #[serde(default)]
    pub rule: Option<RuleKind>,
}

impl ChallengeTemplate {
    pub fn new(title: impl Into<String>, kind: ChallengeType, reward_xp: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            kind,
            reward_xp: reward_xp.max(0),
            is_active: true,
            rule: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_rule(mut self, rule: RuleKind) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// The rule this template completes by, explicit or inferred
    pub fn effective_rule(&self, weekly_counts_as_reflection: bool) -> Option<RuleKind> {
        self.rule
            .clone()
            .or_else(|| RuleKind::infer(&self.title, self.kind, weekly_counts_as_reflection))
    }
}

/// A user's tracked attempt at a [`ChallengeTemplate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChallenge {
    pub id: Uuid,
    pub user_id: UserId,
    pub challenge_id: Uuid,
    pub status: ChallengeStatus,
    /// Always within 0..=100
    pub progress: u8,
    pub assigned_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub auto_assigned: bool,
}

impl UserChallenge {
    pub fn new(user_id: UserId, challenge_id: Uuid, status: ChallengeStatus, auto_assigned: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            challenge_id,
            status,
            progress: 0,
            assigned_at: Utc::now(),
            completed_at: None,
            auto_assigned,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ChallengeStatus::Completed
    }

    /// The progress/status/completion triple, as written by an update
    pub fn snapshot(&self) -> ChallengeUpdate {
        ChallengeUpdate {
            progress: self.progress,
            status: self.status,
            completed_at: self.completed_at,
        }
    }

    pub fn apply(&mut self, update: &ChallengeUpdate) {
        self.progress = update.progress;
        self.status = update.status;
        self.completed_at = update.completed_at;
    }
}

/// An instance joined with its template. The template is `None` when the
/// catalog row has been removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeInstance {
    #[serde(flatten)]
    pub challenge: UserChallenge,
    pub template: Option<ChallengeTemplate>,
}

impl ChallengeInstance {
    pub fn title(&self) -> Option<&str> {
        self.template
            .as_ref()
            .map(|t| t.title.as_str())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn reward_xp(&self) -> i64 {
        self.template.as_ref().map(|t| t.reward_xp).unwrap_or(0)
    }
}

/// Progress write for a challenge instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeUpdate {
    pub progress: u8,
    pub status: ChallengeStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_and_legacy_pending() {
        for status in [
            ChallengeStatus::Suggested,
            ChallengeStatus::Active,
            ChallengeStatus::InProgress,
            ChallengeStatus::Completed,
        ] {
            assert_eq!(ChallengeStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ChallengeStatus::from_str("pending"), Some(ChallengeStatus::Active));
        assert_eq!(ChallengeStatus::from_str("claimed"), None);
    }

    #[test]
    fn test_template_serde_uses_type_key() {
        let template = ChallengeTemplate::new("Racha de 3 días", ChallengeType::Daily, 20);
        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json["type"], "daily");

        let parsed: ChallengeTemplate = serde_json::from_value(serde_json::json!({
            "id": template.id,
            "title": "Algo nuevo",
            "description": "",
            "type": "seasonal",
            "reward_xp": 5,
            "is_active": true
        }))
        .unwrap();
        assert_eq!(parsed.kind, ChallengeType::Other);
        assert!(parsed.rule.is_none());
    }

    #[test]
    fn test_blank_title_is_unresolvable() {
        let mut template = ChallengeTemplate::new("   ", ChallengeType::Daily, 10);
        let instance = ChallengeInstance {
            challenge: UserChallenge::new(Uuid::new_v4(), template.id, ChallengeStatus::Active, false),
            template: Some(template.clone()),
        };
        assert_eq!(instance.title(), None);

        template.title = "Primera conversación".to_string();
        let instance = ChallengeInstance {
            template: Some(template),
            ..instance
        };
        assert_eq!(instance.title(), Some("Primera conversación"));
    }
}
