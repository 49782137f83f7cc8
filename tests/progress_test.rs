//! Progress coordinator: completion, idempotence and rollback

mod common;

use bubble_quest::events::{GamificationEvent, drain};
use bubble_quest::{ChallengeStatus, ChallengeType, ErrorKind, GamificationError};
use common::{Harness, template};

#[tokio::test]
async fn test_completion_awards_once() {
    let h = Harness::new();
    let id = h.assign(template("Pausa mindful", ChallengeType::Daily, 120)).await;

    let first = h.manager.update_progress(id, 100).await.unwrap();
    assert!(first.completed());
    assert_eq!(first.xp_awarded, 120);
    assert_eq!(first.level_up.map(|l| l.new_level), Some(2));

    let again = h.manager.update_progress(id, 100).await.unwrap();
    assert_eq!(again.xp_awarded, 0);
    assert!(again.level_up.is_none());

    let lowered = h.manager.update_progress(id, 10).await.unwrap();
    assert_eq!(lowered.challenge.challenge.status, ChallengeStatus::Completed);
    assert_eq!(lowered.challenge.challenge.progress, 100);

    let profile = h.profile().await;
    assert_eq!(profile.xp, 120);
    assert_eq!(profile.level, 2);
}

#[tokio::test]
async fn test_failed_award_restores_challenge() {
    let h = Harness::new();
    let id = h.assign(template("Diario de gratitud", ChallengeType::Daily, 40)).await;
    h.manager.update_progress(id, 30).await.unwrap();
    let before = h.challenge(id).await;

    h.store.inject(|f| f.credits = true);
    let mut rx = h.manager.subscribe();
    let err = h.manager.update_progress(id, 100).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackingStore);

    let after = h.challenge(id).await;
    assert_eq!(after.challenge.status, before.challenge.status);
    assert_eq!(after.challenge.progress, 30);
    assert!(after.challenge.completed_at.is_none());
    assert_eq!(h.profile().await.xp, 0);
    assert!(drain(&mut rx).is_empty());

    h.store.clear();
    let retry = h.manager.update_progress(id, 100).await.unwrap();
    assert_eq!(retry.xp_awarded, 40);
}

#[tokio::test]
async fn test_failed_restore_still_reports_award_error() {
    let h = Harness::new();
    let id = h.assign(template("Sesión de foco", ChallengeType::Daily, 40)).await;

    // The completing write succeeds, the compensating one does not.
    h.store.inject(|f| {
        f.credits = true;
        f.updates_before_failure = Some(1);
    });
    let err = h.manager.update_progress(id, 100).await.unwrap_err();

    assert!(matches!(err, GamificationError::Store(_)));
    assert!(err.to_string().contains("adjust_xp"));
    assert_eq!(h.profile().await.xp, 0);
}

#[tokio::test]
async fn test_partial_progress_events() {
    let h = Harness::new();
    let id = h.assign(template("Respiración consciente", ChallengeType::Daily, 25)).await;
    let mut rx = h.manager.subscribe();

    let update = h.manager.update_progress(id, 250).await.unwrap();
    assert_eq!(update.challenge.challenge.progress, 100);

    let names: Vec<_> = drain(&mut rx).iter().map(GamificationEvent::name).collect();
    assert_eq!(
        names,
        vec!["challenge_updated", "challenge_completed", "xp_awarded", "profile_updated"]
    );
}
