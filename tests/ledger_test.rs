//! Reward ledger: affordability, debit-then-insert compensation, status

mod common;

use bubble_quest::stats::level_for_xp;
use bubble_quest::{ChallengeType, ErrorKind, GamificationError, RewardStatus};
use common::{Harness, template};

#[tokio::test]
async fn test_insufficient_xp_debits_nothing() {
    let h = Harness::new();
    h.fund(400).await;
    let reward = h.reward("Tema oscuro", 500).await;

    let err = h.manager.redeem(reward).await.unwrap_err();
    assert!(matches!(
        err,
        GamificationError::InsufficientXp {
            available: 400,
            required: 500
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.profile().await.xp, 400);
    assert!(h.store.xp_calls().is_empty());
}

#[tokio::test]
async fn test_exact_balance_redeems() {
    let h = Harness::new();
    h.fund(500).await;
    let reward = h.reward("Tema oscuro", 500).await;

    let redemption = h.manager.redeem(reward).await.unwrap();
    assert_eq!(redemption.cost_paid, 500);
    assert_eq!(redemption.record.status, RewardStatus::Claimed);
    assert_eq!(h.profile().await.xp, 0);
    assert_eq!(h.manager.ledger().owned().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_insert_refunds() {
    let h = Harness::new();
    h.fund(500).await;
    let reward = h.reward("Tema oscuro", 500).await;

    h.store.inject(|f| f.insert_user_reward = true);
    let err = h.manager.redeem(reward).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BackingStore);
    let profile = h.profile().await;
    assert_eq!(profile.xp, 500);
    assert_eq!(profile.level, level_for_xp(500));
    assert_eq!(h.store.xp_calls(), vec![-500, 500]);
    assert!(h.manager.ledger().owned().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_refund_still_reports_insert_error() {
    let h = Harness::new();
    h.fund(300).await;
    let reward = h.reward("Sonidos relajantes", 200).await;

    h.store.inject(|f| {
        f.insert_user_reward = true;
        f.credits = true;
    });
    let err = h.manager.redeem(reward).await.unwrap_err();

    assert!(err.to_string().contains("insert_user_reward"));
    // The debit stuck; only the log records the lost refund.
    assert_eq!(h.profile().await.xp, 100);
}

#[tokio::test]
async fn test_status_of_missing_record() {
    let h = Harness::new();
    let err = h
        .manager
        .update_reward_status(uuid::Uuid::new_v4(), RewardStatus::Used)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_use_then_expire_keeps_used_at() {
    let h = Harness::new();
    h.fund(200).await;
    let reward = h.reward("Sonidos relajantes", 150).await;
    let record = h.manager.redeem(reward).await.unwrap().record;

    let used = h.manager.update_reward_status(record.id, RewardStatus::Used).await.unwrap();
    assert!(used.used_at.is_some());

    let expired = h.manager.update_reward_status(record.id, RewardStatus::Expired).await.unwrap();
    assert_eq!(expired.used_at, used.used_at);

    let stats = h.manager.stats().await.unwrap();
    assert_eq!(stats.reward_counts.used, 0);
    assert_eq!(stats.xp, 50);
}

#[tokio::test]
async fn test_spending_lowers_stored_level() {
    let h = Harness::new();
    let id = h.assign(template("Conversación profunda", ChallengeType::Special, 500)).await;
    h.manager.update_progress(id, 100).await.unwrap();

    let earned = h.profile().await;
    assert_eq!((earned.xp, earned.level), (500, 3));

    let reward = h.reward("Tema oscuro", 500).await;
    h.manager.redeem(reward).await.unwrap();

    let spent = h.profile().await;
    assert_eq!(spent.xp, 0);
    assert_eq!(spent.level, level_for_xp(spent.xp));

    // A later award moves the level up from the reconciled value.
    let next = h.assign(template("Pausa mindful", ChallengeType::Daily, 120)).await;
    let update = h.manager.update_progress(next, 100).await.unwrap();
    assert_eq!(update.level_up.map(|l| (l.old_level, l.new_level)), Some((1, 2)));
    assert_eq!(h.profile().await.level, 2);
}
