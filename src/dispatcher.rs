//! Activity dispatch
//!
//! Entry point for chat transcripts and activity events. Runs after
//! unrelated user actions, so it never returns an error: everything that
//! goes wrong ends up in the [`DispatchReport`] and the log.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ActivityEvent, ChallengeStatus, ChatMessage};
use crate::error::{GamificationError, ItemFailure};
use crate::events::{EventBus, GamificationEvent};
use crate::progress::{ProgressCoordinator, ProgressUpdate};
use crate::rules::RuleEvaluator;
use crate::store::BackingStore;

/// What one dispatch pass did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Open instances already at 100 progress
    pub skipped: Vec<Uuid>,
    /// Instances evaluated as not yet satisfied
    pub unmet: Vec<Uuid>,
    pub completed: Vec<ProgressUpdate>,
    /// Eligible instances whose update failed
    pub failures: Vec<ItemFailure>,
    /// Set when the pass stopped before evaluating anything
    pub aborted: Option<String>,
}

impl DispatchReport {
    fn aborted(reason: impl Into<String>) -> Self {
        Self {
            aborted: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn xp_awarded(&self) -> i64 {
        self.completed.iter().map(|u| u.xp_awarded).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.aborted.is_none()
    }
}

/// Evaluates open challenges against incoming signals
#[derive(Clone)]
pub struct ActivityDispatcher {
    store: Arc<dyn BackingStore>,
    evaluator: RuleEvaluator,
    coordinator: ProgressCoordinator,
    events: EventBus,
}

impl ActivityDispatcher {
    pub fn new(
        store: Arc<dyn BackingStore>,
        evaluator: RuleEvaluator,
        coordinator: ProgressCoordinator,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            evaluator,
            coordinator,
            events,
        }
    }

    /// Evaluate against a chat transcript only
    pub async fn process_chat(&self, messages: &[ChatMessage]) -> DispatchReport {
        self.evaluate(messages, None).await
    }

    /// Evaluate against a single activity event only
    pub async fn process_activity(&self, event: &ActivityEvent) -> DispatchReport {
        self.evaluate(&[], Some(event)).await
    }

    /// Complete every open challenge the signals satisfy.
    ///
    /// Instances are handled one at a time; a failure on one is recorded
    /// and the pass moves on to the next.
    pub async fn evaluate(&self, messages: &[ChatMessage], activity: Option<&ActivityEvent>) -> DispatchReport {
        if messages.is_empty() && activity.is_none() {
            return DispatchReport::default();
        }

        let user_id = match self.store.current_user().await {
            Ok(Some(user_id)) => user_id,
            Ok(None) => {
                tracing::debug!("dispatch skipped: no authenticated user");
                return DispatchReport::aborted(GamificationError::Auth.to_string());
            }
            Err(e) => {
                tracing::warn!(error = %e, "dispatch skipped: session lookup failed");
                return DispatchReport::aborted(e.to_string());
            }
        };

        match self.store.refresh_streak(user_id).await {
            Ok(()) => self.events.publish(GamificationEvent::ProfileUpdated { user_id }),
            Err(e) => tracing::warn!(user_id = %user_id, error = %e, "streak refresh failed"),
        }

        let fetched = tokio::try_join!(
            self.store.challenge_instances(user_id, &ChallengeStatus::OPEN),
            self.store.get_profile(user_id),
        );
        let (instances, profile) = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "dispatch fetch failed");
                return DispatchReport::aborted(e.to_string());
            }
        };

        let mut report = DispatchReport::default();
        for instance in &instances {
            let id = instance.challenge.id;
            if instance.challenge.progress >= 100 {
                report.skipped.push(id);
                continue;
            }
            if !self
                .evaluator
                .should_complete(instance, messages, profile.as_ref(), activity)
            {
                report.unmet.push(id);
                continue;
            }

            match self.coordinator.update_progress(id, 100).await {
                Ok(update) => report.completed.push(update),
                Err(e) => {
                    tracing::warn!(challenge_id = %id, error = %e, "automatic completion failed");
                    report.failures.push(ItemFailure::new(id, &e));
                }
            }
        }

        tracing::debug!(
            evaluated = instances.len(),
            completed = report.completed.len(),
            failed = report.failures.len(),
            activity = activity.map(|a| a.kind.as_str()),
            "dispatch finished"
        );
        report
    }
}
