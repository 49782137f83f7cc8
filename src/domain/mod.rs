//! Core domain types for Bubble Quest

mod activity;
mod challenge;
mod message;
mod profile;
mod reward;
mod rule;

pub use activity::{ActivityEvent, ActivityKind, ActivityMetadata};
pub use challenge::{
    ChallengeInstance, ChallengeStatus, ChallengeTemplate, ChallengeType, ChallengeUpdate,
    UserChallenge,
};
pub use message::{ChatMessage, ChatRole};
pub use profile::{Profile, ProfileUpdate, UserId};
pub use reward::{OwnedReward, RewardKind, RewardStatus, RewardTemplate, RewardUpdate, UserReward};
pub use rule::{DEEP_CONVERSATION_MESSAGES, EMOTIONAL_EXPLORER_WORDS, RuleKind};
