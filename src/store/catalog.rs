//! Built-in demo catalog
//!
//! Loaded by `bubble-quest seed`. Every challenge carries an explicit rule so
//! nothing here depends on title inference.

use super::{BackingStore, StoreResult};
use crate::domain::{
    ActivityKind, ChallengeTemplate, ChallengeType, DEEP_CONVERSATION_MESSAGES,
    EMOTIONAL_EXPLORER_WORDS, RewardKind, RewardTemplate, RuleKind,
};

/// Challenge and reward templates shipped with the app
#[derive(Debug, Clone)]
pub struct Catalog {
    pub challenges: Vec<ChallengeTemplate>,
    pub rewards: Vec<RewardTemplate>,
}

impl Catalog {
    /// Insert (or refresh) every template in `store`
    pub async fn install(&self, store: &dyn BackingStore) -> StoreResult<()> {
        for template in &self.challenges {
            store.insert_challenge_template(template).await?;
        }
        for template in &self.rewards {
            store.insert_reward_template(template).await?;
        }
        tracing::info!(
            challenges = self.challenges.len(),
            rewards = self.rewards.len(),
            "installed catalog"
        );
        Ok(())
    }
}

fn activity(kind: ActivityKind) -> RuleKind {
    RuleKind::Activity {
        keywords: kind.keywords().iter().map(|k| k.to_string()).collect(),
    }
}

/// The default Spanish-language catalog
pub fn default_catalog() -> Catalog {
    let challenges = vec![
        ChallengeTemplate::new("Primera conversación", ChallengeType::Beginner, 50)
            .with_description("Escribe tu primer mensaje a Bubble")
            .with_rule(RuleKind::FirstConversation),
        ChallengeTemplate::new("Conversación profunda", ChallengeType::Special, 100)
            .with_description("Comparte 10 mensajes en una misma conversación")
            .with_rule(RuleKind::DeepConversation {
                min_user_messages: DEEP_CONVERSATION_MESSAGES,
            }),
        ChallengeTemplate::new("Explorador emocional", ChallengeType::Daily, 30)
            .with_description("Nombra al menos tres emociones distintas")
            .with_rule(RuleKind::EmotionalExplorer {
                min_distinct: EMOTIONAL_EXPLORER_WORDS,
            }),
        ChallengeTemplate::new("Racha de 3 días", ChallengeType::Daily, 40)
            .with_description("Vuelve tres días seguidos")
            .with_rule(RuleKind::Streak { days: 3 }),
        ChallengeTemplate::new("Racha de 7 días", ChallengeType::Weekly, 120)
            .with_description("Mantén tu racha durante una semana")
            .with_rule(RuleKind::Streak { days: 7 }),
        ChallengeTemplate::new("Reflexión semanal", ChallengeType::Weekly, 80)
            .with_description("Escribe sobre lo que aprendiste esta semana")
            .with_rule(RuleKind::Reflection),
        ChallengeTemplate::new("Respiración consciente", ChallengeType::Daily, 20)
            .with_description("Completa un ejercicio de respiración")
            .with_rule(activity(ActivityKind::BreathingExercise)),
        ChallengeTemplate::new("Diario de gratitud", ChallengeType::Daily, 20)
            .with_description("Anota tres cosas por las que te sientes agradecido")
            .with_rule(activity(ActivityKind::GratitudePractice)),
        ChallengeTemplate::new("Pausa mindful", ChallengeType::Beginner, 15)
            .with_description("Tómate una pausa de atención plena")
            .with_rule(activity(ActivityKind::MindfulBreak)),
        ChallengeTemplate::new("Sesión de foco", ChallengeType::Special, 60)
            .with_description("Completa una sesión de enfoque sin distracciones")
            .with_rule(activity(ActivityKind::FocusSession)),
        ChallengeTemplate::new("Canjea tu primera recompensa", ChallengeType::Special, 25)
            .with_description("Usa tu XP en la tienda de recompensas")
            .with_rule(RuleKind::Manual),
    ];

    let rewards = vec![
        RewardTemplate::new("Tema oscuro de Bubble", 150, RewardKind::Permanent)
            .with_description("Desbloquea el tema nocturno de la app")
            .with_icon("🌙"),
        RewardTemplate::new("Meditación guiada extra", 200, RewardKind::Consumable)
            .with_description("Una sesión guiada adicional")
            .with_icon("🧘"),
        RewardTemplate::new("Insignia de constancia", 500, RewardKind::Permanent)
            .with_description("Muestra tu constancia en el perfil")
            .with_icon("🏅"),
        RewardTemplate::new("Sesión con especialista", 1000, RewardKind::Consumable)
            .with_description("Próximamente")
            .with_icon("💬")
            .unavailable(),
    ];

    Catalog { challenges, rewards }
}
