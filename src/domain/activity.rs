use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of discrete user action reported outside the chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    DailyCheckIn,
    GuidedReflection,
    BreathingExercise,
    GratitudePractice,
    MindfulBreak,
    FocusSession,
    RewardRedeemed,
    Custom,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 8] = [
        ActivityKind::DailyCheckIn,
        ActivityKind::GuidedReflection,
        ActivityKind::BreathingExercise,
        ActivityKind::GratitudePractice,
        ActivityKind::MindfulBreak,
        ActivityKind::FocusSession,
        ActivityKind::RewardRedeemed,
        ActivityKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DailyCheckIn => "daily_check_in",
            Self::GuidedReflection => "guided_reflection",
            Self::BreathingExercise => "breathing_exercise",
            Self::GratitudePractice => "gratitude_practice",
            Self::MindfulBreak => "mindful_break",
            Self::FocusSession => "focus_session",
            Self::RewardRedeemed => "reward_redeemed",
            Self::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Static vocabulary that links this activity to challenge titles.
    ///
    /// Entries are already accent-free and lower-case.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::DailyCheckIn => &["check-in", "check in", "registro", "animo", "diario"],
            Self::GuidedReflection => &["reflexion", "reflexiona", "introspeccion", "escritura"],
            Self::BreathingExercise => &["respiracion", "respirar", "respira", "calma"],
            Self::GratitudePractice => &["gratitud", "agradecimiento", "agradece"],
            Self::MindfulBreak => &["pausa", "mindful", "descanso", "atencion plena"],
            Self::FocusSession => &["enfoque", "concentracion", "foco", "sesion de foco"],
            Self::RewardRedeemed | Self::Custom => &[],
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Optional payload carried by an [`ActivityEvent`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetadata {
    /// Free-form tags, matched like static keywords
    #[serde(default)]
    pub tags: Vec<String>,
    /// Challenge template/instance or reward template this event points at
    #[serde(default)]
    pub target_id: Option<Uuid>,
    /// Anything else the producer wants to attach
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Ephemeral signal produced by a UI action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default)]
    pub metadata: ActivityMetadata,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind) -> Self {
        Self {
            kind,
            metadata: ActivityMetadata::default(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata.tags.push(tag.into());
        self
    }

    pub fn with_target(mut self, target_id: Uuid) -> Self {
        self.metadata.target_id = Some(target_id);
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.metadata.extra = Some(extra);
        self
    }

    /// Whether `target_id` points at either of the given ids
    pub fn targets(&self, template_id: Uuid, instance_id: Uuid) -> bool {
        self.metadata
            .target_id
            .is_some_and(|t| t == template_id || t == instance_id)
    }
}
