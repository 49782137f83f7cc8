//! Shared test utilities: a fault-injecting store and fixtures

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Local;
use uuid::Uuid;

use bubble_quest::store::{BackingStore, MemoryStore, StoreError, StoreResult, TemplateFilter};
use bubble_quest::{
    ChallengeInstance, ChallengeStatus, ChallengeTemplate, ChallengeType, ChallengeUpdate,
    GamificationManager, OwnedReward, Profile, ProfileUpdate, RewardKind, RewardStatus,
    RewardTemplate, RewardUpdate, UserChallenge, UserId, UserReward,
};
use bubble_quest::assignment::AssignmentOptions;
use bubble_quest::rules::RuleOptions;

/// Which calls should fail
#[derive(Debug, Default)]
pub struct Faults {
    /// `adjust_xp` with a positive delta (awards and refunds)
    pub credits: bool,
    /// `adjust_xp` with a negative delta
    pub debits: bool,
    pub insert_user_reward: bool,
    /// Successful `update_challenge_instance` calls before every later one fails
    pub updates_before_failure: Option<usize>,
    /// `update_challenge_instance` for these instance ids
    pub update_ids: HashSet<Uuid>,
    /// `insert_challenge_instance` for these template ids
    pub insert_templates: HashSet<Uuid>,
    pub challenge_instances: bool,
    pub refresh_streak: bool,
}

/// [`MemoryStore`] wrapper whose calls fail on demand
pub struct FaultyStore {
    pub inner: MemoryStore,
    faults: Mutex<Faults>,
    updates: Mutex<usize>,
    xp_calls: Mutex<Vec<i64>>,
}

impl FaultyStore {
    pub fn with_user(user_id: UserId) -> Self {
        Self {
            inner: MemoryStore::with_user(user_id),
            faults: Mutex::new(Faults::default()),
            updates: Mutex::new(0),
            xp_calls: Mutex::new(Vec::new()),
        }
    }

    /// Change the active faults
    pub fn inject(&self, f: impl FnOnce(&mut Faults)) {
        f(&mut self.faults.lock().unwrap());
    }

    pub fn clear(&self) {
        *self.faults.lock().unwrap() = Faults::default();
    }

    /// Every delta passed to `adjust_xp`, failed or not
    pub fn xp_calls(&self) -> Vec<i64> {
        self.xp_calls.lock().unwrap().clone()
    }

    fn injected(what: &str) -> StoreError {
        StoreError::Unavailable(format!("injected {} failure", what))
    }
}

#[async_trait]
impl BackingStore for FaultyStore {
    async fn current_user(&self) -> StoreResult<Option<UserId>> {
        self.inner.current_user().await
    }

    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>> {
        self.inner.get_profile(user_id).await
    }

    async fn ensure_profile(&self, user_id: UserId) -> StoreResult<Profile> {
        self.inner.ensure_profile(user_id).await
    }

    async fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()> {
        self.inner.update_profile(user_id, update).await
    }

    async fn adjust_xp(&self, user_id: UserId, delta: i64) -> StoreResult<i64> {
        self.xp_calls.lock().unwrap().push(delta);
        let fail = {
            let faults = self.faults.lock().unwrap();
            (delta > 0 && faults.credits) || (delta < 0 && faults.debits)
        };
        if fail {
            return Err(Self::injected("adjust_xp"));
        }
        self.inner.adjust_xp(user_id, delta).await
    }

    async fn refresh_streak(&self, user_id: UserId) -> StoreResult<()> {
        if self.faults.lock().unwrap().refresh_streak {
            return Err(Self::injected("refresh_streak"));
        }
        self.inner.refresh_streak(user_id).await
    }

    async fn challenge_templates(&self, filter: &TemplateFilter) -> StoreResult<Vec<ChallengeTemplate>> {
        self.inner.challenge_templates(filter).await
    }

    async fn challenge_template(&self, id: Uuid) -> StoreResult<Option<ChallengeTemplate>> {
        self.inner.challenge_template(id).await
    }

    async fn insert_challenge_template(&self, template: &ChallengeTemplate) -> StoreResult<()> {
        self.inner.insert_challenge_template(template).await
    }

    async fn challenge_instances(
        &self,
        user_id: UserId,
        statuses: &[ChallengeStatus],
    ) -> StoreResult<Vec<ChallengeInstance>> {
        if self.faults.lock().unwrap().challenge_instances {
            return Err(Self::injected("challenge_instances"));
        }
        self.inner.challenge_instances(user_id, statuses).await
    }

    async fn challenge_instance(&self, id: Uuid) -> StoreResult<Option<ChallengeInstance>> {
        self.inner.challenge_instance(id).await
    }

    async fn update_challenge_instance(&self, id: Uuid, update: &ChallengeUpdate) -> StoreResult<()> {
        let fail = {
            let faults = self.faults.lock().unwrap();
            let mut updates = self.updates.lock().unwrap();
            let exhausted = faults.updates_before_failure.is_some_and(|n| *updates >= n);
            *updates += 1;
            exhausted || faults.update_ids.contains(&id)
        };
        if fail {
            return Err(Self::injected("update_challenge_instance"));
        }
        self.inner.update_challenge_instance(id, update).await
    }

    async fn insert_challenge_instance(
        &self,
        user_id: UserId,
        template_id: Uuid,
        status: ChallengeStatus,
        auto_assigned: bool,
    ) -> StoreResult<UserChallenge> {
        if self.faults.lock().unwrap().insert_templates.contains(&template_id) {
            return Err(Self::injected("insert_challenge_instance"));
        }
        self.inner
            .insert_challenge_instance(user_id, template_id, status, auto_assigned)
            .await
    }

    async fn reward_templates(&self, available_only: bool) -> StoreResult<Vec<RewardTemplate>> {
        self.inner.reward_templates(available_only).await
    }

    async fn reward_template(&self, id: Uuid) -> StoreResult<Option<RewardTemplate>> {
        self.inner.reward_template(id).await
    }

    async fn insert_reward_template(&self, template: &RewardTemplate) -> StoreResult<()> {
        self.inner.insert_reward_template(template).await
    }

    async fn insert_user_reward(
        &self,
        user_id: UserId,
        reward_id: Uuid,
        status: RewardStatus,
    ) -> StoreResult<UserReward> {
        if self.faults.lock().unwrap().insert_user_reward {
            return Err(Self::injected("insert_user_reward"));
        }
        self.inner.insert_user_reward(user_id, reward_id, status).await
    }

    async fn user_rewards(&self, user_id: UserId) -> StoreResult<Vec<OwnedReward>> {
        self.inner.user_rewards(user_id).await
    }

    async fn user_reward(&self, id: Uuid) -> StoreResult<Option<UserReward>> {
        self.inner.user_reward(id).await
    }

    async fn update_user_reward(&self, id: Uuid, update: &RewardUpdate) -> StoreResult<()> {
        self.inner.update_user_reward(id, update).await
    }
}

/// A signed-in user over a fault-injecting store, and a manager using it
pub struct Harness {
    pub user: UserId,
    pub store: Arc<FaultyStore>,
    pub manager: GamificationManager,
}

impl Harness {
    pub fn new() -> Self {
        let user = Uuid::new_v4();
        let store = Arc::new(FaultyStore::with_user(user));
        let manager = GamificationManager::new(store.clone(), RuleOptions::default(), AssignmentOptions::default());
        Self { user, store, manager }
    }

    pub async fn profile(&self) -> Profile {
        self.store.get_profile(self.user).await.unwrap().unwrap()
    }

    pub async fn fund(&self, xp: i64) {
        self.store.inner.adjust_xp(self.user, xp).await.unwrap();
    }

    /// Overwrite the streak; the last activity is today so a refresh keeps it
    pub async fn set_streak(&self, days: u32) {
        let mut profile = self.profile().await;
        profile.streak_days = days;
        profile.last_activity_date = Some(Local::now().date_naive());
        self.store.inner.put_profile(profile).unwrap();
    }

    /// Insert a template and an active instance of it; returns the instance id
    pub async fn assign(&self, template: ChallengeTemplate) -> Uuid {
        self.store.insert_challenge_template(&template).await.unwrap();
        self.store
            .insert_challenge_instance(self.user, template.id, ChallengeStatus::Active, false)
            .await
            .unwrap()
            .id
    }

    pub async fn challenge(&self, id: Uuid) -> ChallengeInstance {
        self.store.challenge_instance(id).await.unwrap().unwrap()
    }

    pub async fn reward(&self, title: &str, cost_xp: i64) -> Uuid {
        let template = RewardTemplate::new(title, cost_xp, RewardKind::Permanent);
        self.store.insert_reward_template(&template).await.unwrap();
        template.id
    }
}

pub fn template(title: &str, kind: ChallengeType, reward_xp: i64) -> ChallengeTemplate {
    ChallengeTemplate::new(title, kind, reward_xp)
}
