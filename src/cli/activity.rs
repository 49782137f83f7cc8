//! Chat and activity commands

use anyhow::{Result, bail};
use std::path::Path;
use uuid::Uuid;

use bubble_quest::{ActivityEvent, ActivityKind, ChatMessage};

use super::{Session, print_dispatch};

/// Treat `messages` as one conversation of user messages
pub async fn chat_command(config_path: Option<&Path>, messages: Vec<String>) -> Result<()> {
    let mut session = Session::open(config_path)?;
    let history: Vec<ChatMessage> = messages.into_iter().map(ChatMessage::user).collect();

    let report = session.manager.process_chat(&history).await;
    print_dispatch(&report);
    session.flush_notifications();
    Ok(())
}

pub async fn activity_command(
    config_path: Option<&Path>,
    kind: &str,
    tags: Vec<String>,
    target: Option<Uuid>,
) -> Result<()> {
    let Some(kind) = ActivityKind::from_str(kind) else {
        let known: Vec<_> = ActivityKind::ALL.iter().map(|k| k.as_str()).collect();
        bail!("Unknown activity type: {} (expected one of: {})", kind, known.join(", "));
    };

    let mut event = ActivityEvent::new(kind);
    for tag in tags {
        event = event.with_tag(tag);
    }
    if let Some(target) = target {
        event = event.with_target(target);
    }

    let mut session = Session::open(config_path)?;
    let report = session.manager.process_activity(&event).await;
    print_dispatch(&report);
    session.flush_notifications();
    Ok(())
}
