//! Completion rules attached to challenge templates
//!
//! Catalog rows written before rules existed carry no rule; for those the
//! rule is inferred once from the title, e.g. "Racha de 7 días" becomes
//! `Streak { days: 7 }`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::challenge::ChallengeType;
use crate::text::normalize;

/// Default user-message count for a deep conversation
pub const DEEP_CONVERSATION_MESSAGES: usize = 10;

/// Default number of distinct emotion words for the explorer challenge
pub const EMOTIONAL_EXPLORER_WORDS: usize = 3;

static STREAK_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"racha de (\d+)").expect("valid streak pattern"));

/// How a challenge decides it is complete
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// At least one user message in the transcript
    FirstConversation,
    /// At least `min_user_messages` user messages
    DeepConversation { min_user_messages: usize },
    /// At least `min_distinct` distinct emotion words across user messages
    EmotionalExplorer { min_distinct: usize },
    /// Profile streak of at least `days`
    Streak { days: u32 },
    /// Reflective vocabulary or long, thoughtful messages
    Reflection,
    /// Completed by activity events whose keywords intersect `keywords`
    Activity { keywords: Vec<String> },
    /// Never completed automatically
    Manual,
}

impl RuleKind {
    /// Derive a rule from a legacy template title.
    ///
    /// Weekly templates only map to [`RuleKind::Reflection`] when
    /// `weekly_counts_as_reflection` is set; otherwise the title must mention
    /// "reflexión".
    pub fn infer(title: &str, kind: ChallengeType, weekly_counts_as_reflection: bool) -> Option<Self> {
        let title = normalize(title);
        if title.trim().is_empty() {
            return None;
        }

        if title.contains("primera conversacion") {
            return Some(Self::FirstConversation);
        }
        if title.contains("conversacion profunda") {
            return Some(Self::DeepConversation {
                min_user_messages: DEEP_CONVERSATION_MESSAGES,
            });
        }
        if title.contains("explorador emocional") {
            return Some(Self::EmotionalExplorer {
                min_distinct: EMOTIONAL_EXPLORER_WORDS,
            });
        }
        if let Some(days) = STREAK_TITLE
            .captures(&title)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
        {
            return Some(Self::Streak { days });
        }
        if title.contains("reflexion") || (weekly_counts_as_reflection && kind == ChallengeType::Weekly) {
            return Some(Self::Reflection);
        }

        None
    }

    /// Short label for listings
    pub fn label(&self) -> String {
        match self {
            Self::FirstConversation => "first conversation".to_string(),
            Self::DeepConversation { min_user_messages } => {
                format!("{} user messages", min_user_messages)
            }
            Self::EmotionalExplorer { min_distinct } => format!("{} emotions named", min_distinct),
            Self::Streak { days } => format!("{}-day streak", days),
            Self::Reflection => "reflection".to_string(),
            Self::Activity { keywords } => format!("activity: {}", keywords.join(", ")),
            Self::Manual => "manual".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_accented_titles() {
        assert_eq!(
            RuleKind::infer("Primera Conversación", ChallengeType::Beginner, false),
            Some(RuleKind::FirstConversation)
        );
        assert_eq!(
            RuleKind::infer("Conversación profunda", ChallengeType::Special, false),
            Some(RuleKind::DeepConversation { min_user_messages: 10 })
        );
        assert_eq!(
            RuleKind::infer("Explorador emocional", ChallengeType::Daily, false),
            Some(RuleKind::EmotionalExplorer { min_distinct: 3 })
        );
    }

    #[test]
    fn test_infer_streak_days_from_title() {
        assert_eq!(
            RuleKind::infer("Racha de 7 días", ChallengeType::Weekly, false),
            Some(RuleKind::Streak { days: 7 })
        );
        assert_eq!(
            RuleKind::infer("RACHA DE 3", ChallengeType::Daily, false),
            Some(RuleKind::Streak { days: 3 })
        );
        assert_eq!(
            RuleKind::infer("Racha de 30 días", ChallengeType::Special, false),
            Some(RuleKind::Streak { days: 30 })
        );
    }

    #[test]
    fn test_weekly_reflection_overlap_is_opt_in() {
        assert_eq!(RuleKind::infer("Caminata semanal", ChallengeType::Weekly, false), None);
        assert_eq!(
            RuleKind::infer("Caminata semanal", ChallengeType::Weekly, true),
            Some(RuleKind::Reflection)
        );
        assert_eq!(
            RuleKind::infer("Reflexión del día", ChallengeType::Daily, false),
            Some(RuleKind::Reflection)
        );
    }

    #[test]
    fn test_infer_blank_title() {
        assert_eq!(RuleKind::infer("", ChallengeType::Weekly, true), None);
    }

    #[test]
    fn test_rule_serde_is_tagged() {
        let rule = RuleKind::Streak { days: 7 };
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(json, r#"{"kind":"streak","days":7}"#);
        let back: RuleKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }
}
