//! Init and seed commands

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use bubble_quest::config::{Config, LOCAL_CONFIG_PATH};
use bubble_quest::store::BackingStore;
use bubble_quest::store::catalog::default_catalog;

use super::open_store;

/// Create a config with a new user id and make sure its profile exists
pub async fn init_command(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()
            .context("Failed to resolve working directory")?
            .join(LOCAL_CONFIG_PATH),
    };

    if path.exists() && !force {
        bail!(
            "Config file already exists: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let mut config = Config::default();
    config.user_id = Some(Uuid::new_v4());
    config.database_path = Some(default_database_path(&path));
    config.save_to_file(&path)?;

    let store = open_store(&config)?;
    if let Some(user_id) = config.user_id {
        let profile = store.ensure_profile(user_id).await?;
        info!(user_id = %profile.id, "created profile");
    }

    println!("Created {}", path.display());
    println!("  user:     {}", config.user_id.unwrap_or_default());
    println!("  database: {}", config.database_path().display());
    println!("\nRun `bubble-quest seed` to install the default catalog.");

    Ok(())
}

/// Install the default challenge and reward catalog
pub async fn seed_command(config_path: Option<&Path>) -> Result<()> {
    let (config, _) = Config::load(config_path)?;
    let store = open_store(&config)?;

    let catalog = default_catalog();
    catalog.install(&store).await?;

    println!(
        "Installed {} challenges and {} rewards into {}",
        catalog.challenges.len(),
        catalog.rewards.len(),
        config.database_path().display()
    );
    Ok(())
}

/// Keep the database next to the config it belongs to
fn default_database_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|dir| dir.join("bubble.db"))
        .unwrap_or_else(|| PathBuf::from("bubble.db"))
}
