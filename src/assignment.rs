//! Challenge assignment
//!
//! Puts challenge instances in a user's list: one at a time on request, or
//! in batches (daily set, streak-based suggestions). Batch inserts run in
//! parallel and each one succeeds or fails on its own.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ChallengeInstance, ChallengeStatus, ChallengeTemplate, ChallengeType, UserId};
use crate::error::{GamificationError, ItemFailure, Result};
use crate::events::{EventBus, GamificationEvent};
use crate::store::{BackingStore, TemplateFilter};

fn default_daily_limit() -> usize {
    3
}

fn default_personalized_limit() -> usize {
    3
}

/// Batch sizes (the `[assignment]` config section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOptions {
    #[serde(default = "default_daily_limit")]
    pub daily_limit: usize,
    #[serde(default = "default_personalized_limit")]
    pub personalized_limit: usize,
}

impl Default for AssignmentOptions {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            personalized_limit: default_personalized_limit(),
        }
    }
}

/// Result of assigning a single template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignOutcome {
    Assigned { challenge: ChallengeInstance },
    /// The user already has an open instance of the template
    AlreadyAssigned { challenge_id: Uuid },
}

/// Per-template results of a batch assignment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub assigned: Vec<ChallengeInstance>,
    /// Templates left out because the user already holds them
    pub skipped: Vec<Uuid>,
    /// Keyed by template id
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn count(&self) -> usize {
        self.assigned.len()
    }
}

/// Template types suggested for a given streak length
pub fn kinds_for_streak(streak_days: u32) -> [ChallengeType; 2] {
    if streak_days >= 7 {
        [ChallengeType::Weekly, ChallengeType::Special]
    } else if streak_days >= 3 {
        [ChallengeType::Daily, ChallengeType::Weekly]
    } else {
        [ChallengeType::Daily, ChallengeType::Beginner]
    }
}

#[derive(Clone)]
pub struct ChallengeAssigner {
    store: Arc<dyn BackingStore>,
    events: EventBus,
    options: AssignmentOptions,
}

impl ChallengeAssigner {
    pub fn new(store: Arc<dyn BackingStore>, events: EventBus, options: AssignmentOptions) -> Self {
        Self { store, events, options }
    }

    async fn user(&self) -> Result<UserId> {
        self.store.current_user().await?.ok_or(GamificationError::Auth)
    }

    /// Active challenge templates, newest first
    pub async fn available(&self) -> Result<Vec<ChallengeTemplate>> {
        Ok(self.store.challenge_templates(&TemplateFilter::active()).await?)
    }

    /// The session user's challenges with templates, newest first
    pub async fn user_challenges(&self) -> Result<Vec<ChallengeInstance>> {
        let user_id = self.user().await?;
        Ok(self.store.challenge_instances(user_id, &[]).await?)
    }

    /// The user takes on a challenge themselves
    pub async fn accept(&self, template_id: Uuid) -> Result<AssignOutcome> {
        self.assign(template_id, false).await
    }

    /// Add an active instance of `template_id` unless one is already open
    pub async fn assign(&self, template_id: Uuid, auto_assigned: bool) -> Result<AssignOutcome> {
        let user_id = self.user().await?;

        let open = self.store.challenge_instances(user_id, &ChallengeStatus::OPEN).await?;
        if let Some(existing) = open.iter().find(|c| c.challenge.challenge_id == template_id) {
            tracing::debug!(template_id = %template_id, "challenge already assigned");
            return Ok(AssignOutcome::AlreadyAssigned {
                challenge_id: existing.challenge.id,
            });
        }

        let template = self
            .store
            .challenge_template(template_id)
            .await?
            .ok_or_else(|| GamificationError::not_found("challenge template", template_id))?;
        if !template.is_active {
            return Err(GamificationError::TemplateInactive(template_id));
        }

        let challenge = self
            .store
            .insert_challenge_instance(user_id, template_id, ChallengeStatus::Active, auto_assigned)
            .await?;
        let instance = ChallengeInstance {
            challenge,
            template: Some(template),
        };
        self.announce(&instance);
        Ok(AssignOutcome::Assigned { challenge: instance })
    }

    /// Assign up to `daily_limit` active daily templates
    pub async fn assign_daily(&self) -> Result<BatchReport> {
        let user_id = self.user().await?;
        let filter = TemplateFilter::active()
            .of_kinds(&[ChallengeType::Daily])
            .limit(self.options.daily_limit);
        let (templates, open) = tokio::try_join!(
            self.store.challenge_templates(&filter),
            self.store.challenge_instances(user_id, &ChallengeStatus::OPEN),
        )?;

        let held: HashSet<Uuid> = open.iter().map(|c| c.challenge.challenge_id).collect();
        let (fresh, skipped): (Vec<_>, Vec<_>) = templates.into_iter().partition(|t| !held.contains(&t.id));

        let mut report = self.insert_batch(user_id, fresh, ChallengeStatus::Active).await;
        report.skipped = skipped.into_iter().map(|t| t.id).collect();
        tracing::info!(
            assigned = report.count(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "daily challenges assigned"
        );
        Ok(report)
    }

    /// Suggest up to `personalized_limit` templates matched to the streak
    pub async fn assign_personalized(&self) -> Result<BatchReport> {
        let user_id = self.user().await?;
        let (profile, held) = tokio::try_join!(
            self.store.get_profile(user_id),
            self.store.challenge_instances(user_id, &[]),
        )?;

        let streak = profile.map(|p| p.streak_days).unwrap_or(0);
        let kinds = kinds_for_streak(streak);
        let templates = self
            .store
            .challenge_templates(&TemplateFilter::active().of_kinds(&kinds))
            .await?;

        let held: HashSet<Uuid> = held
            .iter()
            .filter(|c| !c.challenge.is_completed())
            .map(|c| c.challenge.challenge_id)
            .collect();
        let (fresh, skipped): (Vec<_>, Vec<_>) = templates.into_iter().partition(|t| !held.contains(&t.id));
        let picked: Vec<_> = fresh.into_iter().take(self.options.personalized_limit).collect();

        let mut report = self.insert_batch(user_id, picked, ChallengeStatus::Suggested).await;
        report.skipped = skipped.into_iter().map(|t| t.id).collect();
        tracing::info!(
            streak,
            suggested = report.count(),
            failed = report.failures.len(),
            "personalized challenges suggested"
        );
        Ok(report)
    }

    async fn insert_batch(
        &self,
        user_id: UserId,
        templates: Vec<ChallengeTemplate>,
        status: ChallengeStatus,
    ) -> BatchReport {
        let inserts = templates.iter().map(|t| {
            self.store
                .insert_challenge_instance(user_id, t.id, status, true)
        });
        let results = join_all(inserts).await;

        let mut report = BatchReport::default();
        for (template, result) in templates.into_iter().zip(results) {
            match result {
                Ok(challenge) => {
                    let instance = ChallengeInstance {
                        challenge,
                        template: Some(template),
                    };
                    self.announce(&instance);
                    report.assigned.push(instance);
                }
                Err(e) => {
                    tracing::warn!(template_id = %template.id, error = %e, "challenge insert failed");
                    report
                        .failures
                        .push(ItemFailure::new(template.id, &GamificationError::from(e)));
                }
            }
        }
        report
    }

    fn announce(&self, instance: &ChallengeInstance) {
        self.events.publish(GamificationEvent::ChallengeAssigned {
            challenge_id: instance.challenge.id,
            template_id: instance.challenge.challenge_id,
            title: instance.title().unwrap_or("Desafío").to_string(),
            suggested: instance.challenge.status == ChallengeStatus::Suggested,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Profile;
    use crate::store::MemoryStore;

    async fn setup(templates: &[ChallengeTemplate]) -> (Arc<MemoryStore>, ChallengeAssigner, UserId) {
        let user = Uuid::new_v4();
        let store = Arc::new(MemoryStore::with_user(user));
        for template in templates {
            store.insert_challenge_template(template).await.unwrap();
        }
        let assigner = ChallengeAssigner::new(store.clone(), EventBus::new(), AssignmentOptions::default());
        (store, assigner, user)
    }

    #[test]
    fn test_kinds_for_streak() {
        assert_eq!(kinds_for_streak(0), [ChallengeType::Daily, ChallengeType::Beginner]);
        assert_eq!(kinds_for_streak(3), [ChallengeType::Daily, ChallengeType::Weekly]);
        assert_eq!(kinds_for_streak(7), [ChallengeType::Weekly, ChallengeType::Special]);
    }

    #[tokio::test]
    async fn test_assign_dedupes_open_instances() {
        let template = ChallengeTemplate::new("Respiración consciente", ChallengeType::Daily, 20);
        let (_, assigner, _) = setup(std::slice::from_ref(&template)).await;

        let first = assigner.accept(template.id).await.unwrap();
        let AssignOutcome::Assigned { challenge } = first else {
            panic!("expected a new assignment");
        };
        assert_eq!(challenge.challenge.status, ChallengeStatus::Active);
        assert!(!challenge.challenge.auto_assigned);

        let second = assigner.assign(template.id, true).await.unwrap();
        assert_eq!(
            second,
            AssignOutcome::AlreadyAssigned {
                challenge_id: challenge.challenge.id
            }
        );
    }

    #[tokio::test]
    async fn test_assign_inactive_and_missing() {
        let inactive = ChallengeTemplate::new("Retirado", ChallengeType::Daily, 20).inactive();
        let (_, assigner, _) = setup(std::slice::from_ref(&inactive)).await;

        assert!(matches!(
            assigner.assign(inactive.id, false).await,
            Err(GamificationError::TemplateInactive(_))
        ));
        assert!(matches!(
            assigner.assign(Uuid::new_v4(), false).await,
            Err(GamificationError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_assign_daily_respects_limit_and_holdings() {
        let templates: Vec<_> = (0..5)
            .map(|i| ChallengeTemplate::new(format!("Diario {i}"), ChallengeType::Daily, 10))
            .chain([ChallengeTemplate::new("Semanal", ChallengeType::Weekly, 10)])
            .collect();
        let (_, assigner, _) = setup(&templates).await;

        let report = assigner.assign_daily().await.unwrap();
        assert_eq!(report.count(), 3);
        assert!(report.failures.is_empty());
        assert!(report.assigned.iter().all(|c| c.challenge.auto_assigned));

        let again = assigner.assign_daily().await.unwrap();
        assert_eq!(again.count(), 0);
        assert_eq!(again.skipped.len(), 3);
    }

    #[tokio::test]
    async fn test_personalized_by_streak() {
        let templates = vec![
            ChallengeTemplate::new("Diario", ChallengeType::Daily, 10),
            ChallengeTemplate::new("Inicio", ChallengeType::Beginner, 10),
            ChallengeTemplate::new("Semanal", ChallengeType::Weekly, 10),
            ChallengeTemplate::new("Especial", ChallengeType::Special, 10),
        ];
        let (store, assigner, user) = setup(&templates).await;
        let mut profile = Profile::new(user);
        profile.streak_days = 8;
        store.put_profile(profile).unwrap();

        let report = assigner.assign_personalized().await.unwrap();
        let mut kinds: Vec<_> = report
            .assigned
            .iter()
            .filter_map(|c| c.template.as_ref().map(|t| t.kind))
            .collect();
        kinds.sort_by_key(|k| k.as_str());
        assert_eq!(kinds, vec![ChallengeType::Special, ChallengeType::Weekly]);
        assert!(report.assigned.iter().all(|c| c.challenge.status == ChallengeStatus::Suggested));

        let again = assigner.assign_personalized().await.unwrap();
        assert_eq!(again.count(), 0);
        assert_eq!(again.skipped.len(), 2);
    }
}
