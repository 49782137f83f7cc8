//! User-facing notifications
//!
//! Renders [`GamificationEvent`]s into the short Spanish messages the app
//! shows, and keeps a bounded feed of them with read tracking.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::RewardStatus;
use crate::events::GamificationEvent;

/// Default number of notifications kept in a feed
pub const DEFAULT_FEED_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ChallengeCompleted,
    ChallengeAssigned,
    XpGained,
    LevelUp,
    RewardClaimed,
    RewardUsed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
            metadata,
        }
    }

    /// The notification for `event`, if it is one users are told about
    pub fn from_event(event: &GamificationEvent) -> Option<Self> {
        let notification = match event {
            GamificationEvent::ChallengeCompleted { title, xp, .. } => Self::new(
                NotificationKind::ChallengeCompleted,
                "¡Desafío completado!",
                format!("Completaste \"{}\" y ganaste {} XP", title, xp),
                json!({ "challengeTitle": title, "xpGained": xp }),
            ),
            GamificationEvent::XpAwarded { amount, reason } => {
                let message = if reason.is_empty() {
                    format!("Ganaste {} XP", amount)
                } else {
                    format!("Ganaste {} XP por {}", amount, reason)
                };
                Self::new(
                    NotificationKind::XpGained,
                    "¡XP ganado!",
                    message,
                    json!({ "amount": amount, "reason": reason }),
                )
            }
            GamificationEvent::LevelUp {
                new_level, total_xp, ..
            } => Self::new(
                NotificationKind::LevelUp,
                "¡Subiste de nivel!",
                format!("Has alcanzado el nivel {} con {} XP totales", new_level, total_xp),
                json!({ "newLevel": new_level, "totalXP": total_xp }),
            ),
            GamificationEvent::ChallengeAssigned { title, suggested, .. } => {
                let (heading, message) = if *suggested {
                    ("Desafío sugerido", format!("Te sugerimos un nuevo desafío: {}", title))
                } else {
                    ("Desafío asignado", format!("Nuevo desafío añadido a tu lista: {}", title))
                };
                Self::new(
                    NotificationKind::ChallengeAssigned,
                    heading,
                    message,
                    json!({ "challengeTitle": title }),
                )
            }
            GamificationEvent::RewardClaimed { title, cost, .. } => Self::new(
                NotificationKind::RewardClaimed,
                "¡Recompensa canjeada!",
                format!("Gastaste {} XP para obtener \"{}\"", cost, title),
                json!({ "rewardTitle": title, "cost": cost }),
            ),
            GamificationEvent::RewardStatusChanged {
                title,
                status: RewardStatus::Used,
                ..
            } => Self::new(
                NotificationKind::RewardUsed,
                "¡Recompensa usada!",
                format!("Has utilizado \"{}\"", title),
                json!({ "rewardTitle": title }),
            ),
            GamificationEvent::ChallengeUpdated { .. }
            | GamificationEvent::ProfileUpdated { .. }
            | GamificationEvent::RewardStatusChanged { .. } => return None,
        };
        Some(notification)
    }
}

/// Newest-first list of the most recent notifications
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    capacity: usize,
    items: VecDeque<Notification>,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Add a notification, dropping the oldest past capacity
    pub fn push(&mut self, notification: Notification) -> Uuid {
        let id = notification.id;
        self.items.push_front(notification);
        self.items.truncate(self.capacity);
        id
    }

    /// Render and add `event`; `None` if it produces no notification
    pub fn record(&mut self, event: &GamificationEvent) -> Option<Uuid> {
        Notification::from_event(event).map(|n| self.push(n))
    }

    /// Returns false if `id` is not in the feed
    pub fn mark_read(&mut self, id: Uuid) -> bool {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        self.items.iter_mut().for_each(|n| n.read = true);
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|n| !n.read).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}
