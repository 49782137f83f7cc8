//! Reward commands

use anyhow::{Result, bail};
use std::path::Path;
use uuid::Uuid;

use bubble_quest::RewardStatus;

use super::{Session, print_dispatch};

/// List the catalog, or the user's redemptions with `owned`
pub async fn list_command(config_path: Option<&Path>, owned: bool) -> Result<()> {
    let session = Session::open(config_path)?;
    let ledger = session.manager.ledger();

    if owned {
        let rewards = ledger.owned().await?;
        if rewards.is_empty() {
            println!("No rewards redeemed yet.");
            return Ok(());
        }

        println!("Your rewards ({}):\n", rewards.len());
        for owned in &rewards {
            let record = &owned.reward;
            println!(
                "  {} [{}] {} (claimed {})",
                record.id,
                record.status,
                owned.title(),
                record.claimed_at.format("%Y-%m-%d")
            );
        }
        return Ok(());
    }

    let catalog = ledger.catalog().await?;
    if catalog.is_empty() {
        println!("No rewards available. Run `bubble-quest seed`.");
        return Ok(());
    }

    println!("Rewards ({}):\n", catalog.len());
    for reward in catalog {
        let icon = reward.icon.as_deref().unwrap_or(" ");
        println!("  {} {} {} ({} XP)", reward.id, icon, reward.title, reward.cost_xp);
        if !reward.description.is_empty() {
            println!("    {}", reward.description);
        }
    }
    Ok(())
}

pub async fn redeem_command(config_path: Option<&Path>, reward_id: Uuid) -> Result<()> {
    let mut session = Session::open(config_path)?;
    let redemption = session.manager.redeem(reward_id).await?;

    println!(
        "Redeemed \"{}\" for {} XP (record {})",
        redemption.title, redemption.cost_paid, redemption.record.id
    );
    if !redemption.dispatch.completed.is_empty() || !redemption.dispatch.failures.is_empty() {
        print_dispatch(&redemption.dispatch);
    }

    session.flush_notifications();
    Ok(())
}

pub async fn status_command(config_path: Option<&Path>, record_id: Uuid, status: &str) -> Result<()> {
    let Some(status) = RewardStatus::from_str(status) else {
        bail!("Unknown reward status: {} (expected claimed, used or expired)", status);
    };

    let mut session = Session::open(config_path)?;
    let record = session.manager.update_reward_status(record_id, status).await?;
    println!("{} is now {}", record.id, record.status);

    session.flush_notifications();
    Ok(())
}
