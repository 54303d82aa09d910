use chrono::Utc;
use tracing::debug;

use crate::state::{ConversationState, ServiceType, Stage, Urgency};

const GREETING_KEYWORDS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

const LOCATION_KEYWORDS: &[&str] = &["location", "where", "near", "in ", "area", "place"];

const HEALTH_KEYWORDS: &[&str] = &[
    "symptom",
    "pain",
    "feel",
    "experiencing",
    "concern",
    "problem",
];

const CLINIC_KEYWORDS: &[&str] = &[
    "clinic",
    "hospital",
    "doctor",
    "medical",
    "healthcare",
    "treatment",
];

const SYMPTOM_CHECK_KEYWORDS: &[&str] = &["sti", "std", "infection", "discharge", "burning", "itching"];

const SERVICE_KEYWORDS: &[&str] = &[
    "gynecology",
    "family planning",
    "sti testing",
    "emergency",
    "contraception",
];

const DETAIL_KEYWORDS: &[&str] = &[
    "tell me more",
    "details",
    "information",
    "about",
    "contact",
    "phone",
];

/// Vocabulary for per-turn symptom extraction.
const SYMPTOM_VOCABULARY: &[&str] = &[
    "pain",
    "discharge",
    "burning",
    "itching",
    "bleeding",
    "cramps",
    "fever",
    "swelling",
    "irregular",
    "missed period",
    "nausea",
    "fatigue",
    "headache",
    "back pain",
    "abdominal pain",
];

fn matches_any(message: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| message.contains(kw))
}

/// Stage keyword sets tested in fixed priority order; the first matching set
/// wins. `None` means no set matched and the caller keeps the current stage.
fn classify_stage(message: &str) -> Option<Stage> {
    if matches_any(message, GREETING_KEYWORDS) {
        Some(Stage::Greeting)
    } else if matches_any(message, LOCATION_KEYWORDS) {
        Some(Stage::LocationSetup)
    } else if matches_any(message, HEALTH_KEYWORDS) {
        Some(Stage::HealthAssessment)
    } else if matches_any(message, CLINIC_KEYWORDS) {
        Some(Stage::ClinicSearch)
    } else if matches_any(message, SYMPTOM_CHECK_KEYWORDS) {
        Some(Stage::SymptomCheck)
    } else if matches_any(message, SERVICE_KEYWORDS) {
        Some(Stage::ServiceSelection)
    } else if matches_any(message, DETAIL_KEYWORDS) {
        Some(Stage::ClinicDetails)
    } else {
        None
    }
}

/// Whether any stage keyword set matches the message. A matched turn gets a
/// stage-specific reply even when the stage it maps to is the current one;
/// only unmatched text is free-form.
pub fn matches_stage_keyword(message: &str) -> bool {
    classify_stage(&message.to_lowercase()).is_some()
}

/// Three-tier urgency test. Always overwrites the previous urgency.
fn extract_urgency(message: &str) -> Urgency {
    if matches_any(message, &["urgent", "emergency", "immediate"]) {
        Urgency::High
    } else if matches_any(message, &["soon", "quick"]) {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Fixed ordered service-type groups, first match wins. No match keeps the
/// previous value.
fn extract_service_type(message: &str) -> Option<ServiceType> {
    if message.contains("gynecology") {
        Some(ServiceType::Gynecology)
    } else if message.contains("sti") || message.contains("std") {
        Some(ServiceType::StiTesting)
    } else if message.contains("family planning") || message.contains("contraception") {
        Some(ServiceType::FamilyPlanning)
    } else if message.contains("emergency contraception") {
        Some(ServiceType::EmergencyContraception)
    } else if message.contains("pregnancy") {
        Some(ServiceType::PregnancyCare)
    } else {
        None
    }
}

/// Every vocabulary word contained in the message, in vocabulary order.
pub fn extract_symptoms(message: &str) -> Vec<String> {
    let lower = message.to_lowercase();
    SYMPTOM_VOCABULARY
        .iter()
        .filter(|s| lower.contains(**s))
        .map(|s| s.to_string())
        .collect()
}

/// Re-classify one inbound message against the current state and return the
/// updated state. State flows in and out explicitly; nothing is mutated
/// through shared references.
pub fn analyze_message(message: &str, current: &ConversationState) -> ConversationState {
    let lower = message.to_lowercase();
    let mut updated = current.clone();

    updated.metadata.message_count += 1;
    updated.metadata.last_updated = Utc::now();

    updated.stage = classify_stage(&lower).unwrap_or(current.stage);
    updated.context.urgency = Some(extract_urgency(&lower));

    if let Some(service_type) = extract_service_type(&lower) {
        updated.context.service_type = Some(service_type);
    }

    // Turn-transient: a new extraction replaces the previous list.
    let symptoms = extract_symptoms(&lower);
    if !symptoms.is_empty() {
        updated.context.symptoms = symptoms;
    }

    debug!(
        stage = ?updated.stage,
        urgency = ?updated.context.urgency,
        service_type = ?updated.context.service_type,
        symptoms = ?updated.context.symptoms,
        message_count = updated.metadata.message_count,
        "message classified"
    );

    updated
}
