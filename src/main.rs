use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

mod cli;

#[derive(Parser)]
#[command(name = "bubble-quest")]
#[command(about = "Bubble Quest - challenges, XP and rewards for your conversations")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to .bubble-quest/config.toml, then ~/.bubble-quest/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a config file with a fresh user and an empty profile
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Install the default challenge and reward catalog
    Seed,

    /// Show level, XP, streak and counters for the signed-in user
    Status,

    /// List your challenges
    Challenges {
        /// List the active catalog instead
        #[arg(long)]
        available: bool,
    },

    /// Accept a challenge from the catalog
    Accept {
        /// Challenge template id
        template_id: Uuid,
    },

    /// Set the progress of one of your challenges (0-100)
    Progress {
        /// Challenge instance id
        challenge_id: Uuid,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Evaluate open challenges against a conversation
    Chat {
        /// User messages, in order
        #[arg(required = true)]
        messages: Vec<String>,
    },

    /// Report an in-app activity
    Activity {
        /// Activity type (e.g. breathing_exercise, gratitude_practice, custom)
        kind: String,

        /// Free-form tags matched against challenge titles
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Challenge or reward this activity points at
        #[arg(long)]
        target: Option<Uuid>,
    },

    /// List the reward catalog
    Rewards {
        /// List your redeemed rewards instead
        #[arg(long)]
        owned: bool,
    },

    /// Spend XP on a reward
    Redeem {
        /// Reward template id
        reward_id: Uuid,
    },

    /// Change the status of a redeemed reward (claimed, used, expired)
    RewardStatus {
        /// Redemption record id
        record_id: Uuid,
        status: String,
    },

    /// Assign today's daily challenges
    AssignDaily,

    /// Suggest challenges based on your streak
    AssignPersonalized,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Some(Commands::Init { force }) => {
            cli::init::init_command(config, force).await?;
        }
        Some(Commands::Seed) => {
            cli::init::seed_command(config).await?;
        }
        Some(Commands::Status) | None => {
            cli::status::status_command(config).await?;
        }
        Some(Commands::Challenges { available }) => {
            cli::challenges::list_command(config, available).await?;
        }
        Some(Commands::Accept { template_id }) => {
            cli::challenges::accept_command(config, template_id).await?;
        }
        Some(Commands::Progress {
            challenge_id,
            value,
        }) => {
            cli::challenges::progress_command(config, challenge_id, value).await?;
        }
        Some(Commands::Chat { messages }) => {
            cli::activity::chat_command(config, messages).await?;
        }
        Some(Commands::Activity { kind, tags, target }) => {
            cli::activity::activity_command(config, &kind, tags, target).await?;
        }
        Some(Commands::Rewards { owned }) => {
            cli::rewards::list_command(config, owned).await?;
        }
        Some(Commands::Redeem { reward_id }) => {
            cli::rewards::redeem_command(config, reward_id).await?;
        }
        Some(Commands::RewardStatus { record_id, status }) => {
            cli::rewards::status_command(config, record_id, &status).await?;
        }
        Some(Commands::AssignDaily) => {
            cli::challenges::assign_daily_command(config).await?;
        }
        Some(Commands::AssignPersonalized) => {
            cli::challenges::assign_personalized_command(config).await?;
        }
    }

    Ok(())
}
