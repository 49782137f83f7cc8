//! Backing store seam
//!
//! Everything the gamification core reads or writes goes through
//! [`BackingStore`]. Each call is a suspension point; implementations must
//! make every single call atomic on its own, nothing more.
//!
//! Two implementations ship with the crate:
//! - [`MemoryStore`]: process-local maps, used by tests and embedding hosts
//! - [`SqliteStore`]: a local SQLite database (`~/.bubble-quest/bubble.db`)

pub mod catalog;
mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{
    ChallengeInstance, ChallengeStatus, ChallengeTemplate, ChallengeType, ChallengeUpdate,
    OwnedReward, Profile, ProfileUpdate, RewardStatus, RewardTemplate, RewardUpdate,
    UserChallenge, UserId, UserReward,
};

/// Errors produced by a backing store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    /// A write addressed a row that does not exist
    #[error("No {table} row with id {id}")]
    MissingRow { table: &'static str, id: String },

    /// A write was refused because it would break a row invariant
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// The store could not be reached or refused the call
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be decoded
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn missing(table: &'static str, id: impl ToString) -> Self {
        Self::MissingRow {
            table,
            id: id.to_string(),
        }
    }
}

/// Result alias for store calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Selection of challenge templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    pub active_only: bool,
    /// Empty means any type
    pub kinds: Vec<ChallengeType>,
    pub limit: Option<usize>,
}

impl TemplateFilter {
    pub fn active() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    pub fn of_kinds(mut self, kinds: &[ChallengeType]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, template: &ChallengeTemplate) -> bool {
        (!self.active_only || template.is_active)
            && (self.kinds.is_empty() || self.kinds.contains(&template.kind))
    }
}

/// Opaque persistence used by the gamification core
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// The authenticated user of this session, if any
    async fn current_user(&self) -> StoreResult<Option<UserId>>;

    // -- Profiles ----------------------------------------------------------

    async fn get_profile(&self, user_id: UserId) -> StoreResult<Option<Profile>>;

    /// Create the profile if missing and return it
    async fn ensure_profile(&self, user_id: UserId) -> StoreResult<Profile>;

    async fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()>;

    /// Atomically add `delta` (negative to debit) and return the new balance.
    ///
    /// Fails with [`StoreError::Constraint`] instead of letting XP go below zero.
    async fn adjust_xp(&self, user_id: UserId, delta: i64) -> StoreResult<i64>;

    /// Recompute streak days and last activity date from the current date
    async fn refresh_streak(&self, user_id: UserId) -> StoreResult<()>;

    // -- Challenge catalog -------------------------------------------------

    async fn challenge_templates(&self, filter: &TemplateFilter) -> StoreResult<Vec<ChallengeTemplate>>;

    async fn challenge_template(&self, id: Uuid) -> StoreResult<Option<ChallengeTemplate>>;

    async fn insert_challenge_template(&self, template: &ChallengeTemplate) -> StoreResult<()>;

    // -- Challenge instances -----------------------------------------------

    /// The user's instances joined with templates, newest first. An empty
    /// `statuses` slice selects every status.
    async fn challenge_instances(
        &self,
        user_id: UserId,
        statuses: &[ChallengeStatus],
    ) -> StoreResult<Vec<ChallengeInstance>>;

    async fn challenge_instance(&self, id: Uuid) -> StoreResult<Option<ChallengeInstance>>;

    async fn update_challenge_instance(&self, id: Uuid, update: &ChallengeUpdate) -> StoreResult<()>;

    async fn insert_challenge_instance(
        &self,
        user_id: UserId,
        template_id: Uuid,
        status: ChallengeStatus,
        auto_assigned: bool,
    ) -> StoreResult<UserChallenge>;

    // -- Reward catalog and ledger -----------------------------------------

    async fn reward_templates(&self, available_only: bool) -> StoreResult<Vec<RewardTemplate>>;

    async fn reward_template(&self, id: Uuid) -> StoreResult<Option<RewardTemplate>>;

    async fn insert_reward_template(&self, template: &RewardTemplate) -> StoreResult<()>;

    async fn insert_user_reward(
        &self,
        user_id: UserId,
        reward_id: Uuid,
        status: RewardStatus,
    ) -> StoreResult<UserReward>;

    /// The user's redemption records joined with templates, newest first
    async fn user_rewards(&self, user_id: UserId) -> StoreResult<Vec<OwnedReward>>;

    async fn user_reward(&self, id: Uuid) -> StoreResult<Option<UserReward>>;

    async fn update_user_reward(&self, id: Uuid, update: &RewardUpdate) -> StoreResult<()>;
}

/// Streak length after activity on `today`.
///
/// Activity on the same day keeps the count, activity on the following day
/// extends it, anything else starts over at 1.
pub fn advance_streak(current: u32, last_activity: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_activity {
        Some(last) if last == today => current.max(1),
        Some(last) if last.succ_opt() == Some(today) => current.saturating_add(1),
        _ => 1,
    }
}
