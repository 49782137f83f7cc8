//! Profile statistics aggregation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::levels::{LevelProgress, level_for_xp, xp_progress};
use crate::domain::{ChallengeStatus, Profile, RewardStatus};
use crate::error::{GamificationError, Result};
use crate::store::BackingStore;

/// Challenge tallies for a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeCounts {
    /// Accepted and not yet completed
    pub active: usize,
    pub completed: usize,
    /// Every row, suggested ones included
    pub total: usize,
}

impl ChallengeCounts {
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ChallengeStatus>,
    {
        statuses.into_iter().fold(Self::default(), |mut acc, status| {
            match status {
                ChallengeStatus::Completed => acc.completed += 1,
                ChallengeStatus::Active | ChallengeStatus::InProgress => acc.active += 1,
                ChallengeStatus::Suggested => {}
            }
            acc.total += 1;
            acc
        })
    }
}

/// Reward tallies for a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardCounts {
    pub claimed: usize,
    pub used: usize,
    /// Catalog entries that can currently be redeemed
    pub available_templates: usize,
}

impl RewardCounts {
    pub fn tally<I>(statuses: I, available_templates: usize) -> Self
    where
        I: IntoIterator<Item = RewardStatus>,
    {
        statuses.into_iter().fold(
            Self {
                available_templates,
                ..Self::default()
            },
            |mut acc, status| {
                match status {
                    RewardStatus::Claimed => acc.claimed += 1,
                    RewardStatus::Used => acc.used += 1,
                    RewardStatus::Expired => {}
                }
                acc
            },
        )
    }
}

/// Everything the profile screen shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStats {
    /// `None` until the profile row exists
    pub profile: Option<Profile>,
    pub level: u32,
    pub xp: i64,
    pub streak_days: u32,
    pub last_activity_date: Option<NaiveDate>,
    pub progress: LevelProgress,
    pub challenge_counts: ChallengeCounts,
    pub reward_counts: RewardCounts,
}

impl ProfileStats {
    /// Assemble stats from already-fetched rows. The level is derived from
    /// XP, never taken from the stored copy.
    pub fn compute(
        profile: Option<Profile>,
        challenge_statuses: impl IntoIterator<Item = ChallengeStatus>,
        reward_statuses: impl IntoIterator<Item = RewardStatus>,
        available_templates: usize,
    ) -> Self {
        let xp = profile.as_ref().map(|p| p.xp).unwrap_or(0);
        let level = level_for_xp(xp);

        Self {
            level,
            xp,
            streak_days: profile.as_ref().map(|p| p.streak_days).unwrap_or(0),
            last_activity_date: profile.as_ref().and_then(|p| p.last_activity_date),
            progress: xp_progress(xp, level),
            challenge_counts: ChallengeCounts::tally(challenge_statuses),
            reward_counts: RewardCounts::tally(reward_statuses, available_templates),
            profile,
        }
    }
}

/// Load and aggregate the session user's stats
pub async fn load_profile_stats(store: &dyn BackingStore) -> Result<ProfileStats> {
    let user_id = store.current_user().await?.ok_or(GamificationError::Auth)?;

    let (profile, challenges, rewards, templates) = tokio::try_join!(
        store.get_profile(user_id),
        store.challenge_instances(user_id, &[]),
        store.user_rewards(user_id),
        store.reward_templates(true),
    )?;

    Ok(ProfileStats::compute(
        profile,
        challenges.iter().map(|c| c.challenge.status),
        rewards.iter().map(|r| r.reward.status),
        templates.len(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_challenge_counts() {
        let counts = ChallengeCounts::tally([
            ChallengeStatus::Active,
            ChallengeStatus::InProgress,
            ChallengeStatus::Completed,
            ChallengeStatus::Suggested,
            ChallengeStatus::from_str("pending").unwrap(),
        ]);
        assert_eq!(
            counts,
            ChallengeCounts {
                active: 3,
                completed: 1,
                total: 5
            }
        );
    }

    #[test]
    fn test_reward_counts_keep_available_templates() {
        let counts = RewardCounts::tally(
            [RewardStatus::Claimed, RewardStatus::Used, RewardStatus::Expired, RewardStatus::Claimed],
            4,
        );
        assert_eq!(counts.claimed, 2);
        assert_eq!(counts.used, 1);
        assert_eq!(counts.available_templates, 4);
    }

    #[test]
    fn test_level_derived_from_xp_not_stored_level() {
        let mut profile = Profile::new(Uuid::new_v4());
        profile.xp = 450;
        profile.level = 1;
        let stats = ProfileStats::compute(Some(profile), [], [], 0);
        assert_eq!(stats.level, 3);
        assert_eq!(stats.progress.current_level_min_xp, 400);
        assert_eq!(stats.progress.next_level_min_xp, 900);
        assert_eq!(stats.progress.xp_to_next_level, 450);
    }

    #[test]
    fn test_missing_profile_defaults() {
        let stats = ProfileStats::compute(None, [], [], 2);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.xp, 0);
        assert_eq!(stats.streak_days, 0);
        assert_eq!(stats.progress.progress, 0.0);
        assert_eq!(stats.reward_counts.available_templates, 2);
    }
}
