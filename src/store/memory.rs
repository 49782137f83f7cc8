//! Process-local backing store

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use chrono::Local;
use uuid::Uuid;

use super::{BackingStore, StoreError, StoreResult, TemplateFilter, advance_streak};
use crate::domain::{
    ChallengeInstance, ChallengeStatus, ChallengeTemplate, ChallengeUpdate, OwnedReward, Profile,
    ProfileUpdate, RewardStatus, RewardTemplate, RewardUpdate, UserChallenge, UserId, UserReward,
};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<UserId, Profile>,
    challenge_templates: Vec<ChallengeTemplate>,
    challenges: Vec<UserChallenge>,
    reward_templates: Vec<RewardTemplate>,
    rewards: Vec<UserReward>,
}

impl Tables {
    fn join_challenge(&self, challenge: &UserChallenge) -> ChallengeInstance {
        ChallengeInstance {
            challenge: challenge.clone(),
            template: self
                .challenge_templates
                .iter()
                .find(|t| t.id == challenge.challenge_id)
                .cloned(),
        }
    }
}

/// In-memory [`BackingStore`] with an explicit session user.
///
/// Every call takes one lock, so each call is atomic just like a single
/// remote round trip.
#[derive(Debug, Default)]
pub struct MemoryStore {
    session: RwLock<Option<UserId>>,
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with `user_id` signed in and an empty profile
    pub fn with_user(user_id: UserId) -> Self {
        let store = Self::new();
        store.sign_in(user_id);
        if let Ok(mut tables) = store.tables() {
            tables.profiles.insert(user_id, Profile::new(user_id));
        }
        store
    }

    pub fn sign_in(&self, user_id: UserId) {
        if let Ok(mut session) = self.session.write() {
            *session = Some(user_id);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut session) = self.session.write() {
            *session = None;
        }
    }

    /// Overwrite a profile row as-is
    pub fn put_profile(&self, profile: Profile) -> StoreResult<()> {
        self.tables()?.profiles.insert(profile.id, profile);
        Ok(())
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn current_user(&self) -> StoreResult<Option<UserId>> {
        let session = self.session.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(*session)
    }

    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>> {
        Ok(self.tables()?.profiles.get(&user_id).cloned())
    }

    async fn ensure_profile(&self, user_id: UserId) -> StoreResult<Profile> {
        let mut tables = self.tables()?;
        Ok(tables
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile::new(user_id))
            .clone())
    }

    async fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()> {
        let mut tables = self.tables()?;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::missing("profiles", user_id))?;
        if let Some(level) = update.level {
            profile.level = level;
        }
        if let Some(streak_days) = update.streak_days {
            profile.streak_days = streak_days;
        }
        if let Some(date) = update.last_activity_date {
            profile.last_activity_date = Some(date);
        }
        Ok(())
    }

    async fn adjust_xp(&self, user_id: UserId, delta: i64) -> StoreResult<i64> {
        let mut tables = self.tables()?;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::missing("profiles", user_id))?;
        let new_xp = profile.xp.saturating_add(delta);
        if new_xp < 0 {
            return Err(StoreError::Constraint(format!(
                "xp would drop to {} for {}",
                new_xp, user_id
            )));
        }
        profile.xp = new_xp;
        Ok(new_xp)
    }

    async fn refresh_streak(&self, user_id: UserId) -> StoreResult<()> {
        let today = Local::now().date_naive();
        let mut tables = self.tables()?;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::missing("profiles", user_id))?;
        profile.streak_days = advance_streak(profile.streak_days, profile.last_activity_date, today);
        profile.last_activity_date = Some(today);
        Ok(())
    }

    async fn challenge_templates(&self, filter: &TemplateFilter) -> StoreResult<Vec<ChallengeTemplate>> {
        let tables = self.tables()?;
        let matching = tables
            .challenge_templates
            .iter()
            .filter(|t| filter.matches(t))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn challenge_template(&self, id: Uuid) -> StoreResult<Option<ChallengeTemplate>> {
        Ok(self
            .tables()?
            .challenge_templates
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn insert_challenge_template(&self, template: &ChallengeTemplate) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.challenge_templates.retain(|t| t.id != template.id);
        tables.challenge_templates.push(template.clone());
        Ok(())
    }

    async fn challenge_instances(
        &self,
        user_id: UserId,
        statuses: &[ChallengeStatus],
    ) -> StoreResult<Vec<ChallengeInstance>> {
        let tables = self.tables()?;
        let mut instances: Vec<ChallengeInstance> = tables
            .challenges
            .iter()
            .filter(|c| c.user_id == user_id)
            .filter(|c| statuses.is_empty() || statuses.contains(&c.status))
            .map(|c| tables.join_challenge(c))
            .collect();
        instances.sort_by(|a, b| b.challenge.assigned_at.cmp(&a.challenge.assigned_at));
        Ok(instances)
    }

    async fn challenge_instance(&self, id: Uuid) -> StoreResult<Option<ChallengeInstance>> {
        let tables = self.tables()?;
        Ok(tables
            .challenges
            .iter()
            .find(|c| c.id == id)
            .map(|c| tables.join_challenge(c)))
    }

    async fn update_challenge_instance(&self, id: Uuid, update: &ChallengeUpdate) -> StoreResult<()> {
        if update.progress > 100 {
            return Err(StoreError::Constraint(format!(
                "progress {} out of range",
                update.progress
            )));
        }
        let mut tables = self.tables()?;
        let challenge = tables
            .challenges
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::missing("user_challenges", id))?;
        challenge.apply(update);
        Ok(())
    }

    async fn insert_challenge_instance(
        &self,
        user_id: UserId,
        template_id: Uuid,
        status: ChallengeStatus,
        auto_assigned: bool,
    ) -> StoreResult<UserChallenge> {
        let mut tables = self.tables()?;
        if !tables.challenge_templates.iter().any(|t| t.id == template_id) {
            return Err(StoreError::Constraint(format!(
                "unknown challenge template {}",
                template_id
            )));
        }
        let challenge = UserChallenge::new(user_id, template_id, status, auto_assigned);
        tables.challenges.push(challenge.clone());
        Ok(challenge)
    }

    async fn reward_templates(&self, available_only: bool) -> StoreResult<Vec<RewardTemplate>> {
        Ok(self
            .tables()?
            .reward_templates
            .iter()
            .filter(|t| !available_only || t.is_available)
            .cloned()
            .collect())
    }

    async fn reward_template(&self, id: Uuid) -> StoreResult<Option<RewardTemplate>> {
        Ok(self
            .tables()?
            .reward_templates
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn insert_reward_template(&self, template: &RewardTemplate) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.reward_templates.retain(|t| t.id != template.id);
        tables.reward_templates.push(template.clone());
        Ok(())
    }

    async fn insert_user_reward(
        &self,
        user_id: UserId,
        reward_id: Uuid,
        status: RewardStatus,
    ) -> StoreResult<UserReward> {
        let mut tables = self.tables()?;
        if !tables.reward_templates.iter().any(|t| t.id == reward_id) {
            return Err(StoreError::Constraint(format!(
                "unknown reward template {}",
                reward_id
            )));
        }
        let reward = UserReward::new(user_id, reward_id, status);
        tables.rewards.push(reward.clone());
        Ok(reward)
    }

    async fn user_rewards(&self, user_id: UserId) -> StoreResult<Vec<OwnedReward>> {
        let tables = self.tables()?;
        let mut owned: Vec<OwnedReward> = tables
            .rewards
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| OwnedReward {
                reward: r.clone(),
                template: tables
                    .reward_templates
                    .iter()
                    .find(|t| t.id == r.reward_id)
                    .cloned(),
            })
            .collect();
        owned.sort_by(|a, b| b.reward.claimed_at.cmp(&a.reward.claimed_at));
        Ok(owned)
    }

    async fn user_reward(&self, id: Uuid) -> StoreResult<Option<UserReward>> {
        Ok(self.tables()?.rewards.iter().find(|r| r.id == id).cloned())
    }

    async fn update_user_reward(&self, id: Uuid, update: &RewardUpdate) -> StoreResult<()> {
        let mut tables = self.tables()?;
        let reward = tables
            .rewards
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::missing("user_rewards", id))?;
        reward.status = update.status;
        reward.used_at = update.used_at;
        Ok(())
    }
}
