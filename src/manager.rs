//! Gamification manager
//!
//! Wires the coordinator, dispatcher, ledger and assigner around one
//! backing store and one event bus.

use std::sync::Arc;

use uuid::Uuid;

use crate::assignment::{AssignOutcome, AssignmentOptions, BatchReport, ChallengeAssigner};
use crate::config::Config;
use crate::dispatcher::{ActivityDispatcher, DispatchReport};
use crate::domain::{ActivityEvent, ChatMessage, RewardStatus, UserReward};
use crate::error::Result;
use crate::events::{EventBus, GamificationEvent};
use crate::ledger::{Redemption, RewardLedger};
use crate::progress::{ProgressCoordinator, ProgressUpdate};
use crate::rules::{RuleEvaluator, RuleOptions};
use crate::stats::{ProfileStats, load_profile_stats};
use crate::store::BackingStore;

/// Main entry point for all gamification features
#[derive(Clone)]
pub struct GamificationManager {
    store: Arc<dyn BackingStore>,
    events: EventBus,
    coordinator: ProgressCoordinator,
    dispatcher: ActivityDispatcher,
    ledger: RewardLedger,
    assigner: ChallengeAssigner,
}

impl GamificationManager {
    pub fn new(store: Arc<dyn BackingStore>, rules: RuleOptions, assignment: AssignmentOptions) -> Self {
        let events = EventBus::new();
        let coordinator = ProgressCoordinator::new(store.clone(), events.clone());
        let dispatcher = ActivityDispatcher::new(
            store.clone(),
            RuleEvaluator::new(rules),
            coordinator.clone(),
            events.clone(),
        );
        let ledger = RewardLedger::new(store.clone(), events.clone(), dispatcher.clone());
        let assigner = ChallengeAssigner::new(store.clone(), events.clone(), assignment);

        Self {
            store,
            events,
            coordinator,
            dispatcher,
            ledger,
            assigner,
        }
    }

    pub fn from_config(store: Arc<dyn BackingStore>, config: &Config) -> Self {
        Self::new(store, config.rules.clone(), config.assignment.clone())
    }

    pub fn store(&self) -> &Arc<dyn BackingStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<GamificationEvent> {
        self.events.subscribe()
    }

    pub fn coordinator(&self) -> &ProgressCoordinator {
        &self.coordinator
    }

    pub fn dispatcher(&self) -> &ActivityDispatcher {
        &self.dispatcher
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    pub fn assigner(&self) -> &ChallengeAssigner {
        &self.assigner
    }

    // ========================================
    // SHORTCUTS
    // ========================================

    pub async fn stats(&self) -> Result<ProfileStats> {
        load_profile_stats(self.store.as_ref()).await
    }

    pub async fn update_progress(&self, challenge_id: Uuid, progress: i64) -> Result<ProgressUpdate> {
        self.coordinator.update_progress(challenge_id, progress).await
    }

    pub async fn process_chat(&self, messages: &[ChatMessage]) -> DispatchReport {
        self.dispatcher.process_chat(messages).await
    }

    pub async fn process_activity(&self, event: &ActivityEvent) -> DispatchReport {
        self.dispatcher.process_activity(event).await
    }

    pub async fn redeem(&self, reward_id: Uuid) -> Result<Redemption> {
        self.ledger.redeem(reward_id).await
    }

    pub async fn update_reward_status(&self, record_id: Uuid, status: RewardStatus) -> Result<UserReward> {
        self.ledger.update_status(record_id, status).await
    }

    pub async fn accept_challenge(&self, template_id: Uuid) -> Result<AssignOutcome> {
        self.assigner.accept(template_id).await
    }

    pub async fn assign_daily(&self) -> Result<BatchReport> {
        self.assigner.assign_daily().await
    }

    pub async fn assign_personalized(&self) -> Result<BatchReport> {
        self.assigner.assign_personalized().await
    }
}
