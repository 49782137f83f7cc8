//! CLI command implementations

pub mod activity;
pub mod challenges;
pub mod init;
pub mod rewards;
pub mod status;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;

use bubble_quest::config::Config;
use bubble_quest::dispatcher::DispatchReport;
use bubble_quest::events::{GamificationEvent, drain};
use bubble_quest::notifications::NotificationFeed;
use bubble_quest::store::SqliteStore;
use bubble_quest::{ChallengeInstance, GamificationManager};

/// Everything a user-scoped command needs: the manager over the configured
/// database, and a subscription that turns events into notifications.
pub struct Session {
    pub manager: GamificationManager,
    rx: broadcast::Receiver<GamificationEvent>,
    feed: NotificationFeed,
}

impl Session {
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let (config, source) = Config::load(config_path)?;
        if let Some(source) = &source {
            tracing::debug!(path = %source.display(), "loaded config");
        }

        let store = open_store(&config)?;
        let manager = GamificationManager::from_config(Arc::new(store), &config);
        let rx = manager.subscribe();
        let feed = NotificationFeed::new(config.notifications.capacity);

        Ok(Self {
            manager,
            rx,
            feed,
        })
    }

    /// Print notifications for everything published since the last call
    pub fn flush_notifications(&mut self) {
        for event in drain(&mut self.rx) {
            tracing::debug!(event = event.name(), "received");
            self.feed.record(&event);
        }

        let unread: Vec<_> = self.feed.iter().filter(|n| !n.read).collect();
        if unread.is_empty() {
            return;
        }

        println!();
        // Feed is newest first; print in the order things happened.
        for notification in unread.iter().rev() {
            println!("  * {} {}", notification.title, notification.message);
        }
        self.feed.mark_all_read();
    }
}

/// Open the configured database with the configured user signed in
pub fn open_store(config: &Config) -> Result<SqliteStore> {
    let path = config.database_path();
    let store = SqliteStore::open(&path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

    Ok(match config.user_id {
        Some(user_id) => store.with_session(user_id),
        None => {
            tracing::warn!("no user_id configured; run `bubble-quest init` first");
            store
        }
    })
}

pub fn print_challenge(instance: &ChallengeInstance) {
    let challenge = &instance.challenge;
    println!(
        "  {} [{}] {:>3}% {} (+{} XP)",
        challenge.id,
        challenge.status,
        challenge.progress,
        instance.title().unwrap_or("Desafío"),
        instance.reward_xp()
    );
}

pub fn print_dispatch(report: &DispatchReport) {
    if let Some(reason) = &report.aborted {
        println!("Nothing evaluated: {}", reason);
        return;
    }

    if report.completed.is_empty() {
        println!("No challenges completed ({} still open).", report.unmet.len());
    } else {
        println!(
            "Completed {} challenge(s), +{} XP:",
            report.completed.len(),
            report.xp_awarded()
        );
        for update in &report.completed {
            print_challenge(&update.challenge);
        }
    }

    for failure in &report.failures {
        eprintln!("  ! {} failed ({:?}): {}", failure.id, failure.kind, failure.message);
    }
}
