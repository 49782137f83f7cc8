//! Progress update coordination
//!
//! One challenge, one call: read the instance, clamp the requested
//! progress, write it, and award the template's XP if this write is the one
//! that completes the challenge. A failed award rolls the write back.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ChallengeInstance, ChallengeStatus, ChallengeUpdate, ProfileUpdate, UserId};
use crate::error::{GamificationError, Result};
use crate::events::{EventBus, GamificationEvent};
use crate::stats::level_for_xp;
use crate::store::BackingStore;

/// A level boundary crossed by an award
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub old_level: u32,
    pub new_level: u32,
    pub total_xp: i64,
}

/// Result of [`ProgressCoordinator::update_progress`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// The instance as stored after the call
    pub challenge: ChallengeInstance,
    /// XP credited by this call; 0 when nothing was awarded
    pub xp_awarded: i64,
    pub level_up: Option<LevelChange>,
}

impl ProgressUpdate {
    pub fn completed(&self) -> bool {
        self.challenge.challenge.is_completed()
    }
}

/// The write a progress request turns into
fn next_state(current: &ChallengeInstance, progress: u8) -> ChallengeUpdate {
    if progress >= 100 {
        return ChallengeUpdate {
            progress: 100,
            status: ChallengeStatus::Completed,
            completed_at: Some(Utc::now()),
        };
    }

    let status = match current.challenge.status {
        ChallengeStatus::InProgress => ChallengeStatus::InProgress,
        _ => ChallengeStatus::Active,
    };
    ChallengeUpdate {
        progress,
        status,
        completed_at: None,
    }
}

/// Applies progress changes to challenge instances
#[derive(Clone)]
pub struct ProgressCoordinator {
    store: Arc<dyn BackingStore>,
    events: EventBus,
}

impl ProgressCoordinator {
    pub fn new(store: Arc<dyn BackingStore>, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Set `challenge_id`'s progress to `progress`, clamped to 0..=100.
    ///
    /// Updating an already completed challenge is a no-op that awards
    /// nothing. If the XP award fails, the instance is restored to its
    /// previous state and the award error is returned.
    pub async fn update_progress(&self, challenge_id: Uuid, progress: i64) -> Result<ProgressUpdate> {
        let user_id = self
            .store
            .current_user()
            .await?
            .ok_or(GamificationError::Auth)?;
        let progress = progress.clamp(0, 100) as u8;

        let current = self
            .store
            .challenge_instance(challenge_id)
            .await?
            .filter(|c| c.challenge.user_id == user_id)
            .ok_or_else(|| GamificationError::not_found("challenge", challenge_id))?;

        if current.challenge.is_completed() {
            tracing::debug!(challenge_id = %challenge_id, "challenge already completed, nothing to do");
            return Ok(ProgressUpdate {
                challenge: current,
                xp_awarded: 0,
                level_up: None,
            });
        }

        let update = next_state(&current, progress);
        self.store.update_challenge_instance(challenge_id, &update).await?;
        tracing::info!(
            challenge_id = %challenge_id,
            progress = update.progress,
            status = %update.status,
            "challenge progress written"
        );

        let mut updated = current.clone();
        updated.challenge.apply(&update);

        let reward = current.reward_xp();
        let completes = update.status == ChallengeStatus::Completed;
        let mut xp_awarded = 0;
        let mut level_up = None;

        if completes && reward > 0 {
            match self.store.adjust_xp(user_id, reward).await {
                Ok(total_xp) => {
                    xp_awarded = reward;
                    level_up = self.reconcile_level(user_id, total_xp, reward).await;
                }
                Err(award_err) => {
                    tracing::warn!(
                        challenge_id = %challenge_id,
                        xp = reward,
                        error = %award_err,
                        "xp award failed, restoring challenge"
                    );
                    self.restore(challenge_id, &current).await;
                    return Err(award_err.into());
                }
            }
        }

        self.announce(&updated, xp_awarded, level_up, user_id);

        Ok(ProgressUpdate {
            challenge: updated,
            xp_awarded,
            level_up,
        })
    }

    /// Compensating write. Its own failure is logged, never returned.
    async fn restore(&self, challenge_id: Uuid, previous: &ChallengeInstance) {
        let snapshot = previous.challenge.snapshot();
        if let Err(e) = self.store.update_challenge_instance(challenge_id, &snapshot).await {
            tracing::error!(
                challenge_id = %challenge_id,
                progress = snapshot.progress,
                status = %snapshot.status,
                error = %e,
                "failed to restore challenge after xp award failure"
            );
        }
    }

    /// Store the level derived from the new XP total
    async fn reconcile_level(&self, user_id: UserId, total_xp: i64, awarded: i64) -> Option<LevelChange> {
        let old_level = level_for_xp(total_xp - awarded);
        let new_level = level_for_xp(total_xp);

        if let Err(e) = self
            .store
            .update_profile(user_id, &ProfileUpdate::level(new_level))
            .await
        {
            tracing::warn!(user_id = %user_id, level = new_level, error = %e, "failed to store level");
        }

        (new_level > old_level).then_some(LevelChange {
            old_level,
            new_level,
            total_xp,
        })
    }

    fn announce(&self, challenge: &ChallengeInstance, xp_awarded: i64, level_up: Option<LevelChange>, user_id: UserId) {
        self.events.publish(GamificationEvent::ChallengeUpdated {
            challenge_id: challenge.challenge.id,
            status: challenge.challenge.status,
            progress: challenge.challenge.progress,
        });

        if !challenge.challenge.is_completed() {
            return;
        }

        let title = challenge.title().unwrap_or("Desafío").to_string();
        self.events.publish(GamificationEvent::ChallengeCompleted {
            challenge_id: challenge.challenge.id,
            title: title.clone(),
            xp: xp_awarded,
        });

        if xp_awarded > 0 {
            self.events.publish(GamificationEvent::XpAwarded {
                amount: xp_awarded,
                reason: title,
            });
            self.events.publish(GamificationEvent::ProfileUpdated { user_id });
        }
        if let Some(change) = level_up {
            self.events.publish(GamificationEvent::LevelUp {
                old_level: change.old_level,
                new_level: change.new_level,
                total_xp: change.total_xp,
            });
        }
    }
}
