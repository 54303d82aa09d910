use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ObrinError, Result};

pub const CYCLE_LENGTH_RANGE: std::ops::RangeInclusive<u32> = 21..=35;
pub const PERIOD_LENGTH_RANGE: std::ops::RangeInclusive<u32> = 2..=10;
pub const REMINDER_DAYS_RANGE: std::ops::RangeInclusive<u32> = 1..=7;

/// Most recent periods kept for cycle-length estimation.
const HISTORY_CAP: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowIntensity {
    Light,
    Medium,
    Heavy,
}

impl Default for FlowIntensity {
    fn default() -> Self {
        FlowIntensity::Medium
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodEntry {
    pub date: NaiveDate,
    pub length: u32,
    pub intensity: FlowIntensity,
}

/// Per-user menstrual and general health record. At most one per user;
/// every mutator creates the profile on first use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthProfile {
    pub last_period: Option<NaiveDate>,
    pub cycle_length: Option<u32>,
    pub period_length: Option<u32>,
    #[serde(default)]
    pub flow_intensity: FlowIntensity,
    #[serde(default)]
    pub period_history: Vec<PeriodEntry>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub reminder_enabled: bool,
    pub reminder_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilityWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodPrediction {
    pub date: NaiveDate,
    /// Rounded percentage, 0-95.
    pub confidence: u32,
    pub fertility_window: FertilityWindow,
}

/// Predict the next period date and fertility window from a profile.
///
/// Returns `None` without `last_period` and `cycle_length`. With three or
/// more recorded periods the stored cycle length is replaced by the rounded
/// average of consecutive gaps; entries are sorted by date before
/// differencing so backfilled history cannot skew the estimate.
pub fn predict_next_period(profile: &HealthProfile) -> Option<PeriodPrediction> {
    let last_period = profile.last_period?;
    let stored_cycle = profile.cycle_length?;

    let mut predicted_cycle = stored_cycle as i64;
    let mut confidence = 0.70_f64;

    if profile.period_history.len() >= 3 {
        let mut dates: Vec<NaiveDate> = profile.period_history.iter().map(|e| e.date).collect();
        dates.sort_unstable();

        let gaps: Vec<i64> = dates
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_days())
            .collect();

        if !gaps.is_empty() {
            let avg = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;
            predicted_cycle = avg.round() as i64;
            confidence = f64::min(0.95, 0.70 + profile.period_history.len() as f64 * 0.05);
        }
    }

    let date = last_period + Duration::days(predicted_cycle);
    let ovulation = date - Duration::days(14);
    let prediction = PeriodPrediction {
        date,
        confidence: (confidence * 100.0).round() as u32,
        fertility_window: FertilityWindow {
            start: ovulation - Duration::days(3),
            end: ovulation + Duration::days(1),
        },
    };

    debug!(
        next_period = %prediction.date,
        confidence = prediction.confidence,
        predicted_cycle,
        history_len = profile.period_history.len(),
        "predicted next period"
    );

    Some(prediction)
}

/// Record-level health profile persistence. Upsert-by-user semantics.
#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<HealthProfile>>;
    async fn save(&self, user_id: &str, profile: HealthProfile) -> Result<()>;

    /// Every user with a stored profile, for the reminder sweep.
    async fn tracked_user_ids(&self) -> Result<Vec<String>>;
}

/// In-memory implementation of HealthStore.
pub struct InMemoryHealthStore {
    profiles: DashMap<String, HealthProfile>,
}

impl InMemoryHealthStore {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
        }
    }
}

impl Default for InMemoryHealthStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthStore for InMemoryHealthStore {
    async fn get(&self, user_id: &str) -> Result<Option<HealthProfile>> {
        Ok(self.profiles.get(user_id).map(|entry| entry.clone()))
    }

    async fn save(&self, user_id: &str, profile: HealthProfile) -> Result<()> {
        self.profiles.insert(user_id.to_string(), profile);
        Ok(())
    }

    async fn tracked_user_ids(&self) -> Result<Vec<String>> {
        Ok(self.profiles.iter().map(|entry| entry.key().clone()).collect())
    }
}

/// High-level tracker over a [`HealthStore`]. All mutators follow
/// create-or-update semantics and never error on a missing profile;
/// validated fields reject out-of-range values with user-facing guidance
/// and leave the profile untouched.
#[derive(Clone)]
pub struct HealthTracker {
    store: Arc<dyn HealthStore>,
}

impl HealthTracker {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self { store }
    }

    pub async fn profile(&self, user_id: &str) -> Result<Option<HealthProfile>> {
        self.store.get(user_id).await
    }

    pub async fn predict(&self, user_id: &str) -> Result<Option<PeriodPrediction>> {
        let profile = self.store.get(user_id).await?;
        Ok(profile.as_ref().and_then(predict_next_period))
    }

    pub async fn tracked_user_ids(&self) -> Result<Vec<String>> {
        self.store.tracked_user_ids().await
    }

    async fn load_or_default(&self, user_id: &str) -> Result<HealthProfile> {
        Ok(self.store.get(user_id).await?.unwrap_or_default())
    }

    /// Append a period to the history (FIFO-capped at 12 entries) and update
    /// the last-period fields. Missing length/intensity fall back to the
    /// profile's previous values, then to 5 days / Medium.
    pub async fn record_period(
        &self,
        user_id: &str,
        date: NaiveDate,
        length: Option<u32>,
        intensity: Option<FlowIntensity>,
    ) -> Result<HealthProfile> {
        let mut profile = self.load_or_default(user_id).await?;

        let entry = PeriodEntry {
            date,
            length: length.unwrap_or(5),
            intensity: intensity.unwrap_or_default(),
        };
        profile.period_history.push(entry);
        if profile.period_history.len() > HISTORY_CAP {
            let excess = profile.period_history.len() - HISTORY_CAP;
            profile.period_history.drain(..excess);
        }

        profile.last_period = Some(date);
        if let Some(length) = length {
            profile.period_length = Some(length);
        }
        if let Some(intensity) = intensity {
            profile.flow_intensity = intensity;
        }

        info!(user_id, date = %date, "recorded period");
        self.store.save(user_id, profile.clone()).await?;
        Ok(profile)
    }

    pub async fn set_cycle_length(&self, user_id: &str, days: u32) -> Result<HealthProfile> {
        if !CYCLE_LENGTH_RANGE.contains(&days) {
            return Err(ObrinError::cycle_length_range());
        }
        let mut profile = self.load_or_default(user_id).await?;
        profile.cycle_length = Some(days);
        self.store.save(user_id, profile.clone()).await?;
        Ok(profile)
    }

    pub async fn set_period_length(&self, user_id: &str, days: u32) -> Result<HealthProfile> {
        if !PERIOD_LENGTH_RANGE.contains(&days) {
            return Err(ObrinError::period_length_range());
        }
        let mut profile = self.load_or_default(user_id).await?;
        profile.period_length = Some(days);
        self.store.save(user_id, profile.clone()).await?;
        Ok(profile)
    }

    pub async fn set_flow_intensity(
        &self,
        user_id: &str,
        intensity: FlowIntensity,
    ) -> Result<HealthProfile> {
        let mut profile = self.load_or_default(user_id).await?;
        profile.flow_intensity = intensity;
        self.store.save(user_id, profile.clone()).await?;
        Ok(profile)
    }

    pub async fn set_reminder(
        &self,
        user_id: &str,
        enabled: bool,
        days: u32,
    ) -> Result<HealthProfile> {
        if !REMINDER_DAYS_RANGE.contains(&days) {
            return Err(ObrinError::reminder_days_range());
        }
        let mut profile = self.load_or_default(user_id).await?;
        profile.reminder_enabled = enabled;
        profile.reminder_days = Some(days);
        self.store.save(user_id, profile.clone()).await?;
        Ok(profile)
    }

    /// Long-term symptom tracking unions new symptoms into the profile,
    /// unlike the per-turn context list which is replaced each turn.
    pub async fn track_symptoms(&self, user_id: &str, symptoms: &[String]) -> Result<HealthProfile> {
        let mut profile = self.load_or_default(user_id).await?;
        for symptom in symptoms {
            if !profile.symptoms.contains(symptom) {
                profile.symptoms.push(symptom.clone());
            }
        }
        self.store.save(user_id, profile.clone()).await?;
        Ok(profile)
    }

    pub async fn add_medication(&self, user_id: &str, medication: &str) -> Result<HealthProfile> {
        let mut profile = self.load_or_default(user_id).await?;
        if !profile.medications.iter().any(|m| m == medication) {
            profile.medications.push(medication.to_string());
        }
        self.store.save(user_id, profile.clone()).await?;
        Ok(profile)
    }

    pub async fn add_allergy(&self, user_id: &str, allergy: &str) -> Result<HealthProfile> {
        let mut profile = self.load_or_default(user_id).await?;
        if !profile.allergies.iter().any(|a| a == allergy) {
            profile.allergies.push(allergy.to_string());
        }
        self.store.save(user_id, profile.clone()).await?;
        Ok(profile)
    }
}
