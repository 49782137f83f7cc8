//! Gamification events
//!
//! Every mutation publishes what changed. Subscribers (cache layers, the
//! notification feed, the CLI) decide what to refresh or show; nothing is
//! refreshed implicitly.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::{ChallengeStatus, RewardStatus, UserId};

/// Default channel depth; slow subscribers lag past this
const DEFAULT_CAPACITY: usize = 256;

/// Events that can happen during a gamification operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GamificationEvent {
    /// A challenge instance was written
    ChallengeUpdated {
        challenge_id: Uuid,
        status: ChallengeStatus,
        progress: u8,
    },
    /// Profile XP, level or streak changed
    ProfileUpdated { user_id: UserId },
    ChallengeCompleted {
        challenge_id: Uuid,
        title: String,
        xp: i64,
    },
    XpAwarded { amount: i64, reason: String },
    LevelUp {
        old_level: u32,
        new_level: u32,
        total_xp: i64,
    },
    ChallengeAssigned {
        challenge_id: Uuid,
        template_id: Uuid,
        title: String,
        suggested: bool,
    },
    RewardClaimed {
        record_id: Uuid,
        reward_id: Uuid,
        title: String,
        cost: i64,
    },
    RewardStatusChanged {
        record_id: Uuid,
        title: String,
        status: RewardStatus,
    },
}

impl GamificationEvent {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChallengeUpdated { .. } => "challenge_updated",
            Self::ProfileUpdated { .. } => "profile_updated",
            Self::ChallengeCompleted { .. } => "challenge_completed",
            Self::XpAwarded { .. } => "xp_awarded",
            Self::LevelUp { .. } => "level_up",
            Self::ChallengeAssigned { .. } => "challenge_assigned",
            Self::RewardClaimed { .. } => "reward_claimed",
            Self::RewardStatusChanged { .. } => "reward_status_changed",
        }
    }
}

/// Fan-out channel for [`GamificationEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GamificationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GamificationEvent> {
        self.tx.subscribe()
    }

    /// Publish to current subscribers. Having none is not an error.
    pub fn publish(&self, event: GamificationEvent) {
        tracing::trace!(event = event.name(), "publish");
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Take every event currently queued on `rx`
pub fn drain(rx: &mut broadcast::Receiver<GamificationEvent>) -> Vec<GamificationEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event subscriber lagged");
            }
            Err(_) => break,
        }
    }
    events
}
