use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Phase of a multi-turn dialogue. There is no terminal stage; every stage
/// can be re-entered on any turn based on keyword re-classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Greeting,
    LocationSetup,
    HealthAssessment,
    ClinicSearch,
    SymptomCheck,
    ServiceSelection,
    ClinicDetails,
    FollowUp,
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Greeting
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Gynecology,
    StiTesting,
    FamilyPlanning,
    EmergencyContraception,
    PregnancyCare,
}

impl ServiceType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceType::Gynecology => "gynecology",
            ServiceType::StiTesting => "STI testing",
            ServiceType::FamilyPlanning => "family planning",
            ServiceType::EmergencyContraception => "emergency contraception",
            ServiceType::PregnancyCare => "pregnancy care",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    Formal,
    Casual,
    Friendly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub language: Option<String>,
    pub communication_style: CommunicationStyle,
    pub privacy_level: Urgency,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            language: None,
            communication_style: CommunicationStyle::Friendly,
            privacy_level: Urgency::Medium,
        }
    }
}

/// Per-turn conversational context extracted from the user's messages.
///
/// `symptoms` is turn-transient: each extraction pass replaces the previous
/// list wholesale. Long-term symptom tracking lives on the health profile,
/// which unions instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub intent: Option<String>,
    pub location: Option<Location>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub service_type: Option<ServiceType>,
    pub urgency: Option<Urgency>,
    pub selected_clinic: Option<String>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(default)]
    pub user_preferences: UserPreferences,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    pub conversation_id: String,
    pub user_id: String,
    pub last_updated: DateTime<Utc>,
    pub message_count: u64,
}

/// Dialogue state for one (user, conversation) pair. Created lazily on first
/// contact, mutated every turn, never deleted (reset re-initializes in place).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub stage: Stage,
    pub context: ConversationContext,
    pub metadata: ConversationMetadata,
}

impl ConversationState {
    pub fn new(user_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            stage: Stage::Greeting,
            context: ConversationContext::default(),
            metadata: ConversationMetadata {
                conversation_id: conversation_id.into(),
                user_id: user_id.into(),
                last_updated: Utc::now(),
                message_count: 0,
            },
        }
    }

    /// Fixed follow-up prompts for the current stage, with a generic
    /// fallback for stages that have no dedicated list.
    pub fn follow_up_questions(&self) -> Vec<String> {
        let questions: &[&str] = match self.stage {
            Stage::Greeting => &[
                "What type of health services are you looking for?",
                "Do you need help finding a clinic?",
                "Are you experiencing any symptoms?",
            ],
            Stage::LocationSetup => &[
                "What type of health services do you need?",
                "Are you looking for general or specialized care?",
                "Do you have any specific symptoms?",
            ],
            Stage::HealthAssessment => &[
                "How long have you had these symptoms?",
                "Are the symptoms mild, moderate, or severe?",
                "Would you like me to help you find a clinic?",
            ],
            Stage::ClinicSearch => &[
                "What type of services are you looking for?",
                "Do you prefer a specific area?",
                "Are you looking for affordable options?",
            ],
            Stage::ServiceSelection => &[
                "Would you like the closest clinics or highly-rated ones?",
                "Do you need emergency services?",
                "Would you like information about costs?",
            ],
            Stage::ClinicDetails => &[
                "Would you like contact information?",
                "Do you need directions to the clinic?",
                "Would you like to know about their services?",
            ],
            Stage::SymptomCheck | Stage::FollowUp => &[
                "How can I help you further?",
                "Do you have any other questions?",
                "Would you like information about other services?",
            ],
        };
        questions.iter().map(|q| q.to_string()).collect()
    }
}
