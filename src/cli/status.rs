//! Status command implementation

use anyhow::Result;
use std::path::Path;

use super::Session;

/// Show level, XP and counters for the signed-in user
pub async fn status_command(config_path: Option<&Path>) -> Result<()> {
    let session = Session::open(config_path)?;
    let stats = session.manager.stats().await?;

    if stats.profile.is_none() {
        println!("No profile yet. Complete a challenge or run `bubble-quest init`.");
    }

    let bar_width = 20;
    let filled = (stats.progress.progress * bar_width as f64).round() as usize;
    println!("Level {}  ({} XP)", stats.level, stats.xp);
    println!(
        "  [{}{}] {} XP to level {}",
        "#".repeat(filled),
        "-".repeat(bar_width - filled.min(bar_width)),
        stats.progress.xp_to_next_level,
        stats.level + 1
    );

    match stats.last_activity_date {
        Some(date) => println!("  Streak: {} day(s), last active {}", stats.streak_days, date),
        None => println!("  Streak: {} day(s)", stats.streak_days),
    }

    let challenges = stats.challenge_counts;
    println!(
        "  Challenges: {} active, {} completed, {} total",
        challenges.active, challenges.completed, challenges.total
    );

    let rewards = stats.reward_counts;
    println!(
        "  Rewards: {} claimed, {} used, {} in catalog",
        rewards.claimed, rewards.used, rewards.available_templates
    );

    Ok(())
}
