//! Challenge rule evaluation
//!
//! A pure decision: given an in-flight challenge, the chat transcript, the
//! profile snapshot and an optional activity event, should the challenge be
//! marked complete? Activity matching is tried first, then the template's
//! [`RuleKind`].

use serde::{Deserialize, Serialize};

use crate::domain::{ActivityEvent, ActivityKind, ChallengeInstance, ChatMessage, Profile, RuleKind};
use crate::text::{EMOTION_KEYWORDS, REFLECTION_KEYWORDS, contains_any_phrase, normalize, tokenize};

/// Title words that tie a challenge to reward redemption
const REDEMPTION_TITLE_WORDS: [&str; 3] = ["recompensa", "canje", "premio"];

fn default_reflection_min_keywords() -> usize {
    3
}

fn default_long_message_chars() -> usize {
    200
}

fn default_long_message_count() -> usize {
    2
}

/// Tunables for rule evaluation (the `[rules]` config section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOptions {
    /// Treat every weekly template without an explicit rule as a reflection
    /// challenge
    #[serde(default)]
    pub weekly_counts_as_reflection: bool,

    /// Distinct reflection words that complete a reflection on their own
    #[serde(default = "default_reflection_min_keywords")]
    pub reflection_min_keywords: usize,

    /// Normalized length of a "long" user message
    #[serde(default = "default_long_message_chars")]
    pub long_message_chars: usize,

    /// Long user messages that, with one reflection word, complete a reflection
    #[serde(default = "default_long_message_count")]
    pub long_message_count: usize,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            weekly_counts_as_reflection: false,
            reflection_min_keywords: default_reflection_min_keywords(),
            long_message_chars: default_long_message_chars(),
            long_message_count: default_long_message_count(),
        }
    }
}

/// Decides whether a challenge is satisfied
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluator {
    options: RuleOptions,
}

impl RuleEvaluator {
    pub fn new(options: RuleOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RuleOptions {
        &self.options
    }

    /// Whether `instance` should be marked complete.
    ///
    /// A missing profile counts as a zero-day streak. An instance without a
    /// resolvable title never completes.
    pub fn should_complete(
        &self,
        instance: &ChallengeInstance,
        messages: &[ChatMessage],
        profile: Option<&Profile>,
        activity: Option<&ActivityEvent>,
    ) -> bool {
        let (Some(title), Some(template)) = (instance.title(), instance.template.as_ref()) else {
            return false;
        };
        let title = normalize(title);
        let rule = template.effective_rule(self.options.weekly_counts_as_reflection);

        if let Some(event) = activity {
            if activity_matches(instance, &title, rule.as_ref(), event) {
                return true;
            }
        }

        match rule {
            Some(rule) => self.rule_satisfied(&rule, messages, profile),
            None => false,
        }
    }

    fn rule_satisfied(&self, rule: &RuleKind, messages: &[ChatMessage], profile: Option<&Profile>) -> bool {
        match rule {
            RuleKind::FirstConversation => messages.iter().any(ChatMessage::is_user),
            RuleKind::DeepConversation { min_user_messages } => {
                messages.iter().filter(|m| m.is_user()).count() >= *min_user_messages
            }
            RuleKind::EmotionalExplorer { min_distinct } => {
                let tokens = user_tokens(messages);
                EMOTION_KEYWORDS.hits(&tokens).len() >= *min_distinct
            }
            RuleKind::Streak { days } => profile.map(|p| p.streak_days).unwrap_or(0) >= *days,
            RuleKind::Reflection => self.is_reflective(messages),
            // Only an activity event completes these
            RuleKind::Activity { .. } | RuleKind::Manual => false,
        }
    }

    fn is_reflective(&self, messages: &[ChatMessage]) -> bool {
        let tokens = user_tokens(messages);
        let hits = REFLECTION_KEYWORDS.hits(&tokens).len();
        if hits >= self.options.reflection_min_keywords {
            return true;
        }

        let long_messages = messages
            .iter()
            .filter(|m| m.is_user())
            .filter(|m| normalize(&m.content).chars().count() >= self.options.long_message_chars)
            .count();
        hits >= 1 && long_messages >= self.options.long_message_count
    }
}

fn user_tokens(messages: &[ChatMessage]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.is_user())
        .flat_map(|m| tokenize(&m.content))
        .collect()
}

/// Activity-driven completion, checked before the template rule
fn activity_matches(
    instance: &ChallengeInstance,
    title: &str,
    rule: Option<&RuleKind>,
    event: &ActivityEvent,
) -> bool {
    let template_id = instance.challenge.challenge_id;
    let instance_id = instance.challenge.id;

    match event.kind {
        ActivityKind::Custom if event.metadata.target_id.is_some() => {
            event.targets(template_id, instance_id)
        }
        ActivityKind::RewardRedeemed => {
            event.targets(template_id, instance_id) || contains_any_phrase(title, &REDEMPTION_TITLE_WORDS)
        }
        _ => {
            let keywords = event_keywords(event);
            if contains_any_phrase(title, &keywords) {
                return true;
            }
            match rule {
                Some(RuleKind::Activity { keywords: wanted }) => wanted
                    .iter()
                    .map(|w| normalize(w))
                    .any(|w| !w.trim().is_empty() && keywords.contains(&w)),
                _ => false,
            }
        }
    }
}

/// Static keywords for the event type plus its tags, normalized
fn event_keywords(event: &ActivityEvent) -> Vec<String> {
    event
        .kind
        .keywords()
        .iter()
        .map(|k| k.to_string())
        .chain(event.metadata.tags.iter().map(|t| normalize(t).trim().to_string()))
        .filter(|k| !k.is_empty())
        .collect()
}
