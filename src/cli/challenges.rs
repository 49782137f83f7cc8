//! Challenge commands: listing, accepting, progress and batch assignment

use anyhow::Result;
use std::path::Path;
use uuid::Uuid;

use bubble_quest::assignment::{AssignOutcome, BatchReport};

use super::{Session, print_challenge};

/// List the user's challenges, or the active catalog with `available`
pub async fn list_command(config_path: Option<&Path>, available: bool) -> Result<()> {
    let session = Session::open(config_path)?;
    let assigner = session.manager.assigner();

    if available {
        let templates = assigner.available().await?;
        if templates.is_empty() {
            println!("No challenges in the catalog. Run `bubble-quest seed`.");
            return Ok(());
        }

        println!("Available challenges ({}):\n", templates.len());
        for template in templates {
            println!(
                "  {} [{}] {} (+{} XP)",
                template.id, template.kind, template.title, template.reward_xp
            );
            if !template.description.is_empty() {
                println!("    {}", template.description);
            }
        }
        return Ok(());
    }

    let challenges = assigner.user_challenges().await?;
    if challenges.is_empty() {
        println!("No challenges yet. Try `bubble-quest challenges --available`.");
        return Ok(());
    }

    println!("Your challenges ({}):\n", challenges.len());
    for instance in &challenges {
        print_challenge(instance);
    }
    Ok(())
}

pub async fn accept_command(config_path: Option<&Path>, template_id: Uuid) -> Result<()> {
    let mut session = Session::open(config_path)?;

    match session.manager.accept_challenge(template_id).await? {
        AssignOutcome::Assigned { challenge } => {
            println!("Accepted:");
            print_challenge(&challenge);
        }
        AssignOutcome::AlreadyAssigned { challenge_id } => {
            println!("Already working on it ({}).", challenge_id);
        }
    }

    session.flush_notifications();
    Ok(())
}

pub async fn progress_command(config_path: Option<&Path>, challenge_id: Uuid, value: i64) -> Result<()> {
    let mut session = Session::open(config_path)?;
    let update = session.manager.update_progress(challenge_id, value).await?;

    print_challenge(&update.challenge);
    if update.xp_awarded > 0 {
        println!("  +{} XP", update.xp_awarded);
    }
    if let Some(change) = update.level_up {
        println!("  Level {} -> {}", change.old_level, change.new_level);
    }

    session.flush_notifications();
    Ok(())
}

pub async fn assign_daily_command(config_path: Option<&Path>) -> Result<()> {
    let mut session = Session::open(config_path)?;
    let report = session.manager.assign_daily().await?;
    print_batch("daily", &report);
    session.flush_notifications();
    Ok(())
}

pub async fn assign_personalized_command(config_path: Option<&Path>) -> Result<()> {
    let mut session = Session::open(config_path)?;
    let report = session.manager.assign_personalized().await?;
    print_batch("suggested", &report);
    session.flush_notifications();
    Ok(())
}

fn print_batch(label: &str, report: &BatchReport) {
    println!(
        "Assigned {} {} challenge(s), {} already held.",
        report.count(),
        label,
        report.skipped.len()
    );
    for instance in &report.assigned {
        print_challenge(instance);
    }
    for failure in &report.failures {
        eprintln!("  ! {} failed ({:?}): {}", failure.id, failure.kind, failure.message);
    }
}
