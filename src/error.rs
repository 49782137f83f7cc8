//! Error taxonomy for gamification operations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::StoreError;

/// Broad category of a [`GamificationError`], used by callers that only need
/// to decide how to present or whether to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No authenticated user; aborts the call chain
    Auth,
    /// A challenge, reward or profile row is missing
    NotFound,
    /// The request is well-formed but not allowed
    Validation,
    /// The backing store failed
    BackingStore,
}

/// Error type for challenge, ledger and assignment operations
#[derive(Debug, thiserror::Error)]
pub enum GamificationError {
    #[error("No authenticated user")]
    Auth,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Challenge template is not active: {0}")]
    TemplateInactive(Uuid),

    #[error("Reward is not available right now: {0}")]
    RewardUnavailable(Uuid),

    #[error("Reward has no valid cost: {0}")]
    InvalidCost(Uuid),

    #[error("Not enough XP: have {available}, need {required}")]
    InsufficientXp { available: i64, required: i64 },

    #[error("Backing store error: {0}")]
    Store(#[from] StoreError),
}

impl GamificationError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::TemplateInactive(_)
            | Self::RewardUnavailable(_)
            | Self::InvalidCost(_)
            | Self::InsufficientXp { .. } => ErrorKind::Validation,
            Self::Store(_) => ErrorKind::BackingStore,
        }
    }
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, GamificationError>;

/// One failed item of a pass that keeps going after errors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Challenge instance or template the failure belongs to
    pub id: Uuid,
    pub kind: ErrorKind,
    pub message: String,
}

impl ItemFailure {
    pub fn new(id: Uuid, error: &GamificationError) -> Self {
        Self {
            id,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(GamificationError::Auth.kind(), ErrorKind::Auth);
        assert_eq!(
            GamificationError::not_found("challenge", Uuid::nil()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            GamificationError::InsufficientXp {
                available: 400,
                required: 500
            }
            .kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            GamificationError::from(StoreError::Unavailable("down".into())).kind(),
            ErrorKind::BackingStore
        );
    }

    #[test]
    fn test_messages() {
        let err = GamificationError::InsufficientXp {
            available: 400,
            required: 500,
        };
        assert_eq!(err.to_string(), "Not enough XP: have 400, need 500");
        assert_eq!(
            GamificationError::not_found("reward", "abc").to_string(),
            "reward not found: abc"
        );
    }
}
