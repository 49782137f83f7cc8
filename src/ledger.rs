//! Reward redemption ledger
//!
//! Spending XP is two writes: a debit and a redemption record. There is no
//! transaction spanning both, so a failed record insert is followed by a
//! refund of the debit.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatcher::{ActivityDispatcher, DispatchReport};
use crate::domain::{
    ActivityEvent, ActivityKind, OwnedReward, ProfileUpdate, RewardStatus, RewardTemplate,
    RewardUpdate, UserId, UserReward,
};
use crate::error::{GamificationError, Result};
use crate::events::{EventBus, GamificationEvent};
use crate::stats::level_for_xp;
use crate::store::BackingStore;

/// A successful redemption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    pub record: UserReward,
    pub title: String,
    pub cost_paid: i64,
    /// Challenges completed by the follow-up `reward_redeemed` activity
    pub dispatch: DispatchReport,
}

/// Spends XP on catalog rewards and tracks what the user owns
#[derive(Clone)]
pub struct RewardLedger {
    store: Arc<dyn BackingStore>,
    events: EventBus,
    dispatcher: ActivityDispatcher,
}

impl RewardLedger {
    pub fn new(store: Arc<dyn BackingStore>, events: EventBus, dispatcher: ActivityDispatcher) -> Self {
        Self {
            store,
            events,
            dispatcher,
        }
    }

    async fn user(&self) -> Result<UserId> {
        self.store.current_user().await?.ok_or(GamificationError::Auth)
    }

    /// Rewards that can currently be redeemed
    pub async fn catalog(&self) -> Result<Vec<RewardTemplate>> {
        Ok(self.store.reward_templates(true).await?)
    }

    /// The session user's redemption records, newest first
    pub async fn owned(&self) -> Result<Vec<OwnedReward>> {
        let user_id = self.user().await?;
        Ok(self.store.user_rewards(user_id).await?)
    }

    /// Buy `reward_id` with the session user's XP.
    ///
    /// Checks run in order: the reward exists, is available, has a positive
    /// cost, and the user can afford it. Nothing is debited unless all pass.
    pub async fn redeem(&self, reward_id: Uuid) -> Result<Redemption> {
        let user_id = self.user().await?;

        let (template, profile) = tokio::try_join!(
            self.store.reward_template(reward_id),
            self.store.get_profile(user_id),
        )?;
        let template = template.ok_or_else(|| GamificationError::not_found("reward", reward_id))?;

        if !template.is_available {
            return Err(GamificationError::RewardUnavailable(reward_id));
        }
        let cost = template.cost_xp;
        if cost <= 0 {
            return Err(GamificationError::InvalidCost(reward_id));
        }
        let available = profile.map(|p| p.xp).unwrap_or(0);
        if available < cost {
            return Err(GamificationError::InsufficientXp {
                available,
                required: cost,
            });
        }

        let balance = self.store.adjust_xp(user_id, -cost).await?;
        tracing::info!(user_id = %user_id, reward_id = %reward_id, cost, balance, "xp debited for reward");
        self.store_level(user_id, balance).await;

        let record = match self
            .store
            .insert_user_reward(user_id, reward_id, RewardStatus::Claimed)
            .await
        {
            Ok(record) => record,
            Err(insert_err) => {
                tracing::warn!(reward_id = %reward_id, error = %insert_err, "reward record insert failed, refunding");
                match self.store.adjust_xp(user_id, cost).await {
                    Ok(balance) => self.store_level(user_id, balance).await,
                    Err(refund_err) => tracing::error!(
                        user_id = %user_id,
                        reward_id = %reward_id,
                        xp = cost,
                        error = %refund_err,
                        "failed to refund xp after reward insert failure"
                    ),
                }
                return Err(insert_err.into());
            }
        };

        self.events.publish(GamificationEvent::RewardClaimed {
            record_id: record.id,
            reward_id,
            title: template.title.clone(),
            cost,
        });
        self.events.publish(GamificationEvent::ProfileUpdated { user_id });

        let event = ActivityEvent::new(ActivityKind::RewardRedeemed)
            .with_target(reward_id)
            .with_tag(template.title.clone())
            .with_extra(serde_json::json!({ "cost": cost }));
        let dispatch = self.dispatcher.process_activity(&event).await;

        Ok(Redemption {
            record,
            title: template.title,
            cost_paid: cost,
            dispatch,
        })
    }

    /// Keep the stored level in step with `balance`. A failed write is only
    /// logged; the level is derived from XP wherever it is read.
    async fn store_level(&self, user_id: UserId, balance: i64) {
        let level = level_for_xp(balance);
        if let Err(e) = self
            .store
            .update_profile(user_id, &ProfileUpdate::level(level))
            .await
        {
            tracing::warn!(user_id = %user_id, level, error = %e, "failed to store level");
        }
    }

    /// Move a redemption record to `status`.
    ///
    /// `used` stamps the use time, `claimed` clears it, `expired` keeps
    /// whatever was there. Records of other users are reported as missing.
    pub async fn update_status(&self, record_id: Uuid, status: RewardStatus) -> Result<UserReward> {
        let user_id = self.user().await?;
        let mut record = self
            .store
            .user_reward(record_id)
            .await?
            .filter(|r| r.user_id == user_id)
            .ok_or_else(|| GamificationError::not_found("reward record", record_id))?;

        let used_at = match status {
            RewardStatus::Used => Some(Utc::now()),
            RewardStatus::Claimed => None,
            RewardStatus::Expired => record.used_at,
        };
        let update = RewardUpdate { status, used_at };
        self.store.update_user_reward(record_id, &update).await?;
        tracing::info!(record_id = %record_id, status = %status, "reward status updated");

        record.status = status;
        record.used_at = used_at;

        let title = match self.store.reward_template(record.reward_id).await {
            Ok(Some(template)) => template.title,
            Ok(None) => "Recompensa".to_string(),
            Err(e) => {
                tracing::debug!(reward_id = %record.reward_id, error = %e, "reward title lookup failed");
                "Recompensa".to_string()
            }
        };
        self.events.publish(GamificationEvent::RewardStatusChanged {
            record_id,
            title,
            status,
        });
        Ok(record)
    }
}
