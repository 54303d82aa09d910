use serde::{Deserialize, Serialize};

use crate::state::Urgency;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    General,
    Sti,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomAssessment {
    pub possible_conditions: Vec<String>,
    pub urgency: Urgency,
    pub recommendations: Vec<String>,
    pub referral_needed: bool,
    pub testing_recommended: Vec<String>,
}

/// Symptom substring → candidate condition, STI path.
const STI_CONDITIONS: &[(&str, &str)] = &[
    ("discharge", "Chlamydia or Gonorrhea"),
    ("burning", "Urinary Tract Infection (UTI)"),
    ("itching", "Yeast Infection or Bacterial Vaginosis"),
    ("pain", "Pelvic Inflammatory Disease (PID)"),
];

const GENERAL_CONDITIONS: &[(&str, &str)] = &[
    ("cramp", "Menstrual cramps or dysmenorrhea"),
    ("irregular", "Irregular menstrual cycle"),
    ("heavy", "Heavy menstrual bleeding"),
];

const HIGH_URGENCY_SYMPTOMS: &[&str] = &["severe pain", "fever", "heavy bleeding", "swelling"];
const MEDIUM_URGENCY_SYMPTOMS: &[&str] = &["burning", "discharge", "itching", "pain"];
const REFERRAL_SYMPTOMS: &[&str] = &["pain", "discharge", "burning", "itching", "bleeding"];

const TEST_MAP: &[(&str, &str)] = &[
    ("discharge", "STI testing (chlamydia, gonorrhea)"),
    ("burning", "Urine test for UTI"),
    ("itching", "Vaginal swab for yeast infection"),
];

fn any_symptom_contains(symptoms: &[String], needle: &str) -> bool {
    symptoms.iter().any(|s| s.to_lowercase().contains(needle))
}

fn conditions_for(symptoms: &[String], table: &[(&str, &str)], fallback: &str) -> Vec<String> {
    let matched: Vec<String> = table
        .iter()
        .filter(|(needle, _)| any_symptom_contains(symptoms, needle))
        .map(|(_, condition)| condition.to_string())
        .collect();
    if matched.is_empty() {
        vec![fallback.to_string()]
    } else {
        matched
    }
}

fn determine_urgency(symptoms: &[String]) -> Urgency {
    if HIGH_URGENCY_SYMPTOMS
        .iter()
        .any(|needle| any_symptom_contains(symptoms, needle))
    {
        Urgency::High
    } else if MEDIUM_URGENCY_SYMPTOMS
        .iter()
        .any(|needle| any_symptom_contains(symptoms, needle))
    {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Map extracted symptoms to candidate conditions, an urgency tier,
/// recommendations and suggested tests.
pub fn assess(symptoms: &[String], kind: AssessmentKind) -> SymptomAssessment {
    let (possible_conditions, recommendations, testing_recommended) = match kind {
        AssessmentKind::Sti => (
            conditions_for(
                symptoms,
                STI_CONDITIONS,
                "Sexual health concern requiring evaluation",
            ),
            vec![
                "Consult a healthcare provider for proper evaluation".to_string(),
                "Practice good hygiene".to_string(),
                "Avoid sexual activity until evaluated".to_string(),
                "Monitor symptoms for changes".to_string(),
                "Remember: STIs are treatable and nothing to be ashamed of".to_string(),
            ],
            TEST_MAP
                .iter()
                .filter(|(needle, _)| any_symptom_contains(symptoms, needle))
                .map(|(_, test)| test.to_string())
                .collect(),
        ),
        AssessmentKind::General => (
            conditions_for(
                symptoms,
                GENERAL_CONDITIONS,
                "General health concern requiring evaluation",
            ),
            vec![
                "Consult a healthcare provider for proper evaluation".to_string(),
                "Practice good hygiene".to_string(),
                "Monitor symptoms for changes".to_string(),
                "Keep track of your symptoms".to_string(),
            ],
            Vec::new(),
        ),
    };

    SymptomAssessment {
        possible_conditions,
        urgency: determine_urgency(symptoms),
        recommendations,
        referral_needed: REFERRAL_SYMPTOMS
            .iter()
            .any(|needle| any_symptom_contains(symptoms, needle)),
        testing_recommended,
    }
}

/// Render an assessment: urgency banner, numbered conditions,
/// recommendations and tests, then a clinic-referral prompt adapted to
/// whether the user's location is already known.
pub fn render(assessment: &SymptomAssessment, has_location: bool) -> String {
    let mut out = String::new();

    match assessment.urgency {
        Urgency::High => out.push_str("⚠️ These symptoms may need prompt medical attention.\n\n"),
        Urgency::Medium => {
            out.push_str("📋 These symptoms should be evaluated by a healthcare provider.\n\n")
        }
        Urgency::Low => {}
    }

    if !assessment.possible_conditions.is_empty() {
        out.push_str("Possible causes:\n");
        for (i, condition) in assessment.possible_conditions.iter().enumerate() {
            out.push_str(&format!("{}. {condition}\n", i + 1));
        }
        out.push('\n');
    }

    if !assessment.recommendations.is_empty() {
        out.push_str("💡 Recommendations:\n");
        for (i, rec) in assessment.recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {rec}\n", i + 1));
        }
        out.push('\n');
    }

    if !assessment.testing_recommended.is_empty() {
        out.push_str("🔬 Recommended testing:\n");
        for (i, test) in assessment.testing_recommended.iter().enumerate() {
            out.push_str(&format!("{}. {test}\n", i + 1));
        }
        out.push('\n');
    }

    if assessment.referral_needed {
        if has_location {
            out.push_str(
                "🏥 Would you like me to help you find nearby clinics for testing or consultation?",
            );
        } else {
            out.push_str("🏥 Please share your location so I can help you find nearby clinics.");
        }
    }

    out
}
