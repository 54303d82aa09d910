use rand::Rng;
use std::sync::Arc;

use crate::location::format_location;
use crate::state::{ConversationState, Stage, Urgency};

/// Uniform index selection. The greeting template pick is the only
/// non-determinism in the core, so it lives behind this trait and tests
/// inject a fixed implementation.
pub trait Chooser: Send + Sync {
    fn pick(&self, len: usize) -> usize;
}

pub struct RandomChooser;

impl Chooser for RandomChooser {
    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Always picks the given index (modulo length).
pub struct FixedChooser(pub usize);

impl Chooser for FixedChooser {
    fn pick(&self, len: usize) -> usize {
        self.0 % len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composed {
    pub response: String,
    pub follow_up: Vec<String>,
}

const GREETING_TEMPLATES: &[&str] = &[
    "Hello! 👋 I'm your Obrin Health assistant, here to support your sexual and reproductive health. What's on your mind today?",
    "Hi there! 🌸 I'm here to help with any questions about your reproductive health journey. How can I assist you?",
    "Welcome! 💙 I'm your confidential SRH support. Feel free to ask anything about your health - I'm here to help without judgment.",
];

const GREETING_FOLLOW_UPS: &[&str] = &[
    "Tell me about any symptoms or concerns you have",
    "Ask about menstrual health, contraception, or STIs",
    "Share what's on your mind - I'm here to listen",
];

/// Foregrounded ahead of all other content when urgency is high in the
/// clinic-search and service-selection stages, and ahead of clinic listings.
pub(crate) const URGENT_BANNER: &str = "⚠️ Based on your symptoms, this may need prompt attention. \
                             Please consider urgent medical care first - visit the nearest \
                             emergency clinic or call emergency services if symptoms worsen.\n\n";

/// Chooses stage-specific response text as a pure function of conversation
/// state, aside from the injected greeting-template chooser.
pub struct ResponseComposer {
    chooser: Arc<dyn Chooser>,
}

impl ResponseComposer {
    pub fn new(chooser: Arc<dyn Chooser>) -> Self {
        Self { chooser }
    }

    pub fn compose(&self, message: &str, state: &ConversationState) -> Composed {
        match state.stage {
            Stage::Greeting => self.greeting(state),
            Stage::LocationSetup => self.location_setup(state),
            Stage::HealthAssessment => self.health_assessment(message, state),
            Stage::ClinicSearch => self.clinic_search(state),
            Stage::SymptomCheck => self.symptom_check(state),
            Stage::ServiceSelection => self.service_selection(state),
            Stage::ClinicDetails => self.clinic_details(state),
            Stage::FollowUp => self.follow_up(state),
        }
    }

    fn greeting(&self, state: &ConversationState) -> Composed {
        let follow_up = GREETING_FOLLOW_UPS.iter().map(|s| s.to_string()).collect();

        if let Some(location) = &state.context.location {
            return Composed {
                response: format!(
                    "Welcome back! I remember you're in {}. How can I help with your health today? 💙",
                    format_location(location)
                ),
                follow_up,
            };
        }

        let index = self.chooser.pick(GREETING_TEMPLATES.len());
        Composed {
            response: GREETING_TEMPLATES[index].to_string(),
            follow_up,
        }
    }

    fn location_setup(&self, state: &ConversationState) -> Composed {
        if let Some(location) = &state.context.location {
            return Composed {
                response: format!(
                    "Perfect! I have your location as {}.\n\n\
                     What type of health services are you looking for today?\n\
                     • 🏥 General clinics\n\
                     • 🩺 Specialized care (gynecology, STI testing, etc.)\n\
                     • 💊 Emergency services\n\
                     • 📋 Health information",
                    format_location(location)
                ),
                follow_up: state.follow_up_questions(),
            };
        }

        Composed {
            response: crate::location::location_instructions(),
            follow_up: vec![
                "You can say \"I'm in Lagos\" or \"Ogudu area\"".to_string(),
                "Or share coordinates like \"6.6051, 3.3958\"".to_string(),
            ],
        }
    }

    fn health_assessment(&self, message: &str, state: &ConversationState) -> Composed {
        let lower = message.to_lowercase();

        if lower.contains("early pregnancy symptoms")
            || (lower.contains("symptoms")
                && state.context.service_type == Some(crate::state::ServiceType::PregnancyCare))
        {
            return Composed {
                response: "Here are the common early pregnancy symptoms to look out for: 🤰\n\n\
                           *Most Common Early Signs:*\n\
                           • *Missed period* - Usually the first sign\n\
                           • *Nausea/morning sickness* - Often starts around 6 weeks\n\
                           • *Breast tenderness* - Feeling sore or swollen\n\
                           • *Fatigue* - Feeling unusually tired\n\
                           • *Frequent urination* - Need to pee more often\n\
                           • *Mood changes* - Feeling more emotional\n\n\
                           *When to Take a Test:*\n\
                           • Wait at least 1 week after missed period for most accurate results\n\
                           • Home pregnancy tests are about 99% accurate when used correctly\n\n\
                           *Remember:* Every person is different - you might have all, some, or \
                           none of these symptoms.\n\n\
                           Would you like me to help you understand what to do next? 💙"
                    .to_string(),
                follow_up: vec![
                    "Do you think you might be pregnant?".to_string(),
                    "Would you like to know about pregnancy tests?".to_string(),
                    "Do you need help finding prenatal care?".to_string(),
                ],
            };
        }

        if (lower.contains("pregnancy") || lower.contains("pregnant"))
            && state.metadata.message_count <= 1
        {
            return Composed {
                response: "I'm here to help with pregnancy-related questions. 🤰\n\n\
                           Could you tell me more about what you'd like to know? For example:\n\
                           • Early pregnancy symptoms\n\
                           • What to expect during pregnancy\n\
                           • Prenatal care information\n\
                           • Concerns about possible pregnancy\n\n\
                           Feel free to share - this is a safe, judgment-free space."
                    .to_string(),
                follow_up: vec![
                    "Tell me more about your specific concerns".to_string(),
                    "What symptoms are you experiencing?".to_string(),
                    "How can I best support you right now?".to_string(),
                ],
            };
        }

        if !state.context.symptoms.is_empty() {
            return Composed {
                response: format!(
                    "I understand you're experiencing {}.\n\n\
                     To help you better, could you tell me:\n\
                     • How long have you had these symptoms?\n\
                     • Are they mild, moderate, or severe?\n\
                     • Have you experienced anything like this before?\n\n\
                     Based on your answers, I can provide guidance and let you know if you \
                     should consider seeing a healthcare provider. 🤔",
                    state.context.symptoms.join(", ")
                ),
                follow_up: state.follow_up_questions(),
            };
        }

        Composed {
            response: "I'm here to help with your sexual and reproductive health concerns.\n\n\
                       Could you describe what you're experiencing? For example:\n\
                       • \"I have pregnancy symptoms\"\n\
                       • \"Unusual discharge\"\n\
                       • \"Missed my period\"\n\
                       • \"Questions about contraception\"\n\
                       • \"Concerns about STIs\"\n\n\
                       Take your time - I'm here to listen and help. 💙"
                .to_string(),
            follow_up: vec![
                "What symptoms or concerns do you have?".to_string(),
                "Tell me more about what brought you here today".to_string(),
                "How can I best support your health needs?".to_string(),
            ],
        }
    }

    fn clinic_search(&self, state: &ConversationState) -> Composed {
        let urgent = state.context.urgency == Some(Urgency::High);
        let body = if let Some(service_type) = state.context.service_type {
            format!(
                "Great! I found some {} clinics near you.\n\n\
                 Would you like me to:\n\
                 • 📍 Show you the closest 3 clinics\n\
                 • ⭐ Show only highly-rated clinics\n\
                 • 💰 Show clinics with affordable services\n\
                 • 📞 Get contact information for specific clinics\n\n\
                 Just let me know what's most important to you!",
                service_type.display_name()
            )
        } else {
            "I can help you find the right clinic!\n\n\
             What type of services are you looking for?\n\
             • 🏥 General health check\n\
             • 🩺 Women's health (gynecology, family planning)\n\
             • 🔬 STI testing and treatment\n\
             • 🤰 Pregnancy care\n\
             • 💊 Emergency contraception\n\n\
             Tell me what you need, and I'll find the best options for you!"
                .to_string()
        };

        Composed {
            response: if urgent {
                format!("{URGENT_BANNER}{body}")
            } else {
                body
            },
            follow_up: state.follow_up_questions(),
        }
    }

    fn symptom_check(&self, state: &ConversationState) -> Composed {
        if state.context.urgency == Some(Urgency::High) {
            return Composed {
                response: "⚠️ Based on your symptoms, this may need prompt attention.\n\n\
                           I recommend:\n\
                           1. 🚨 Seek medical care within 24 hours\n\
                           2. 📞 Call emergency services if symptoms worsen\n\
                           3. 🏥 Visit the nearest emergency clinic\n\n\
                           Would you like me to:\n\
                           • Find the closest emergency clinic?\n\
                           • Provide more information about your symptoms?\n\
                           • Help you prepare for your medical visit?\n\n\
                           Your health is important - let's get you the care you need! 💙"
                    .to_string(),
                follow_up: vec![
                    "Would you like me to find the closest emergency clinic?".to_string(),
                    "Do you need more information about your symptoms?".to_string(),
                    "Would you like help preparing for your medical visit?".to_string(),
                ],
            };
        }

        let symptoms = if state.context.symptoms.is_empty() {
            "your symptoms".to_string()
        } else {
            state.context.symptoms.join(", ")
        };

        Composed {
            response: format!(
                "I understand your concerns about {symptoms}.\n\n\
                 Let me ask a few questions to better assess your situation:\n\
                 • When did these symptoms start?\n\
                 • Are they getting better, worse, or staying the same?\n\
                 • Do you have any other symptoms?\n\
                 • Have you taken any medications recently?\n\n\
                 This will help me provide the most accurate guidance. 🤔"
            ),
            follow_up: vec![
                "When did these symptoms start?".to_string(),
                "Are they getting better, worse, or staying the same?".to_string(),
                "Would you like me to help you find a clinic?".to_string(),
            ],
        }
    }

    fn service_selection(&self, state: &ConversationState) -> Composed {
        let urgent = state.context.urgency == Some(Urgency::High);
        let service = state
            .context
            .service_type
            .map(|s| s.display_name())
            .unwrap_or("healthcare");

        let body = format!(
            "Perfect! I'll help you find {service} services.\n\n\
             Based on your location, I can:\n\
             • 📍 Show you the closest clinics\n\
             • ⭐ Show highly-rated options\n\
             • 💰 Show affordable services\n\
             • 📞 Provide contact information\n\n\
             What's most important to you - proximity, quality, or cost?"
        );

        Composed {
            response: if urgent {
                format!("{URGENT_BANNER}{body}")
            } else {
                body
            },
            follow_up: state.follow_up_questions(),
        }
    }

    fn clinic_details(&self, state: &ConversationState) -> Composed {
        Composed {
            response: "I'd be happy to provide more details about the clinics!\n\n\
                       What specific information would you like?\n\
                       • 📞 Contact information and phone numbers\n\
                       • 🗺️ Directions and how to get there\n\
                       • 💰 Consultation fees and costs\n\
                       • 🕒 Operating hours and availability\n\
                       • 🏥 Services offered and specializations\n\n\
                       Just let me know what's most helpful for you!"
                .to_string(),
            follow_up: state.follow_up_questions(),
        }
    }

    fn follow_up(&self, state: &ConversationState) -> Composed {
        Composed {
            response: format!(
                "Thank you for sharing that information!\n\n\
                 Based on what you've told me, here's what I recommend:\n{}\n\n\
                 Is there anything else I can help you with today? Maybe:\n\
                 • 📚 Information about your health concern?\n\
                 • 🏥 Finding other types of clinics?\n\
                 • 📅 Setting up follow-up reminders?\n\n\
                 I'm here whenever you need support! 🌸",
                recommendations(state)
            ),
            follow_up: vec![
                "Would you like information about your health concern?".to_string(),
                "Do you need help finding other types of clinics?".to_string(),
                "Would you like to set up follow-up reminders?".to_string(),
            ],
        }
    }
}

fn recommendations(state: &ConversationState) -> &'static str {
    if state.context.urgency == Some(Urgency::High) {
        return "🚨 *Immediate Action Recommended:*\n\
                • Seek medical care within 24 hours\n\
                • Monitor symptoms closely\n\
                • Contact emergency services if symptoms worsen";
    }
    if state.context.service_type.is_some() {
        return "🏥 *Clinic Recommendations:*\n\
                • I found clinics near you for the service you need\n\
                • Consider factors like distance, ratings, and cost\n\
                • Don't hesitate to ask questions during your visit";
    }
    "💡 *General Guidance:*\n\
     • Your symptoms are common and treatable\n\
     • Early intervention leads to better outcomes\n\
     • Don't hesitate to seek professional care"
}
