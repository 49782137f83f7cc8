//! Bubble Quest - gamification core
//!
//! Bubble Quest turns a user's conversations and in-app activities into
//! challenge completions, XP, levels and XP-priced rewards.
//!
//! ## Flow
//!
//! 1. **Signals**: chat histories and structured [`ActivityEvent`]s reach the
//!    [`dispatcher::ActivityDispatcher`], which evaluates every open challenge
//!    with the pure [`rules::RuleEvaluator`].
//!
//! 2. **Progress**: satisfied challenges go through the
//!    [`progress::ProgressCoordinator`], the single writer of challenge state
//!    and XP awards, with compensation when a step fails halfway.
//!
//! 3. **Spending**: the [`ledger::RewardLedger`] debits XP for catalog rewards.
//!
//! Every mutation is announced on the [`events::EventBus`]. Persistence is
//! behind the [`store::BackingStore`] trait.

pub mod assignment;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod events;
pub mod ledger;
pub mod manager;
pub mod notifications;
pub mod progress;
pub mod rules;
pub mod stats;
pub mod store;
pub mod text;

pub use domain::*;
pub use error::{ErrorKind, GamificationError, ItemFailure, Result};
pub use manager::GamificationManager;
