use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::classify::{analyze_message, matches_stage_keyword};
use crate::error::Result;
use crate::external::{
    InboundMessage, LlmResponder, MessageLog, MessageRole, Notifier, Place, PlacesLookup, User,
    UserStore, LLM_FALLBACK, PLACES_FALLBACK, TURN_FALLBACK,
};
use crate::health::HealthTracker;
use crate::location::{format_location, LocationParser};
use crate::prompt::{PromptContext, Topic};
use crate::respond::{ResponseComposer, URGENT_BANNER};
use crate::state::{ConversationState, ServiceType, Stage, Urgency};
use crate::storage::ConversationStore;
use crate::symptoms::{self, AssessmentKind};
use crate::tracking;

const DEFAULT_EXTERNAL_TIMEOUT: Duration = Duration::from_secs(10);
const CLINIC_SEARCH_RADIUS_METERS: u32 = 5_000;
const RECENT_HISTORY_LIMIT: usize = 10;

/// Per-turn pipeline: parse location → classify → predict/assess/search →
/// compose → persist → notify. One instance is shared across all users;
/// turns for the same user are serialized through a per-user mutex.
pub struct ConversationEngine {
    conversations: Arc<dyn ConversationStore>,
    users: Arc<dyn UserStore>,
    log: Arc<dyn MessageLog>,
    health: HealthTracker,
    locations: LocationParser,
    places: Arc<dyn PlacesLookup>,
    llm: Arc<dyn LlmResponder>,
    notifier: Arc<dyn Notifier>,
    composer: ResponseComposer,
    turn_guards: DashMap<String, Arc<Mutex<()>>>,
    external_timeout: Duration,
}

impl ConversationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        users: Arc<dyn UserStore>,
        log: Arc<dyn MessageLog>,
        health: HealthTracker,
        locations: LocationParser,
        places: Arc<dyn PlacesLookup>,
        llm: Arc<dyn LlmResponder>,
        notifier: Arc<dyn Notifier>,
        composer: ResponseComposer,
    ) -> Self {
        Self {
            conversations,
            users,
            log,
            health,
            locations,
            places,
            llm,
            notifier,
            composer,
            turn_guards: DashMap::new(),
            external_timeout: DEFAULT_EXTERNAL_TIMEOUT,
        }
    }

    pub fn with_external_timeout(mut self, timeout: Duration) -> Self {
        self.external_timeout = timeout;
        self
    }

    /// Process one inbound message end to end. All failures are absorbed
    /// here: the turn is abandoned and the user gets a single generic
    /// apology, delivered best-effort.
    pub async fn handle_message(&self, inbound: InboundMessage) {
        let guard = self
            .turn_guards
            .entry(inbound.sender_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let turn = guard.lock().await;

        if let Err(e) = self.run_turn(&inbound).await {
            error!(
                sender_id = %inbound.sender_id,
                message = %inbound.text,
                error = %e,
                "turn failed, sending apology"
            );
            if let Err(send_err) = self.notifier.send(&inbound.sender_id, TURN_FALLBACK).await {
                error!(sender_id = %inbound.sender_id, error = %send_err, "apology delivery failed");
            }
        }

        // Reclaim the guard once nobody else is waiting on it, so the map
        // doesn't grow with one mutex per sender ever seen. A count of two
        // means the map's clone plus ours.
        drop(turn);
        self.turn_guards
            .remove_if(&inbound.sender_id, |_, entry| Arc::strong_count(entry) == 2);
    }

    /// Daily sweep: message every tracked user whose predicted period is
    /// 3, 1 or 0 days away. Users who explicitly turned reminders off are
    /// skipped; an unconfigured profile defaults to reminders on.
    pub async fn send_period_reminders(&self, today: chrono::NaiveDate) -> Result<()> {
        for user_id in self.health.tracked_user_ids().await? {
            let Some(profile) = self.health.profile(&user_id).await? else {
                continue;
            };
            if !profile.reminder_enabled && profile.reminder_days.is_some() {
                continue;
            }
            let Some(prediction) = self.health.predict(&user_id).await? else {
                continue;
            };
            let days_until = (prediction.date - today).num_days();
            let Some(reminder) = tracking::reminder_message(days_until) else {
                continue;
            };
            let Some(user) = self.users.find_by_id(&user_id).await? else {
                continue;
            };
            if let Err(e) = self.notifier.send(&user.phone_number, &reminder).await {
                warn!(user_id = %user_id, error = %e, "reminder delivery failed");
            } else {
                info!(user_id = %user_id, days_until, "period reminder sent");
            }
        }
        Ok(())
    }

    async fn run_turn(&self, inbound: &InboundMessage) -> Result<()> {
        let user = self.users.find_or_create(&inbound.sender_id).await?;
        // One conversation per calendar day, matching record keying upstream.
        let conversation_id = Utc::now().date_naive().to_string();

        self.log
            .append(&user.id, MessageRole::User, &inbound.text)
            .await?;

        let state = self.conversations.get(&user.id, &conversation_id).await?;
        let (reply, updated) = self.reply_for(inbound, &user, state).await?;

        self.conversations.update(&updated).await?;
        self.log.append(&user.id, MessageRole::Assistant, &reply).await?;

        // Delivery failure is non-fatal for the primary path.
        if let Err(e) = self.notifier.send(&inbound.sender_id, &reply).await {
            warn!(sender_id = %inbound.sender_id, error = %e, "reply delivery failed");
        }

        info!(
            user_id = %user.id,
            stage = ?updated.stage,
            message_count = updated.metadata.message_count,
            "turn completed"
        );
        Ok(())
    }

    async fn reply_for(
        &self,
        inbound: &InboundMessage,
        user: &User,
        state: ConversationState,
    ) -> Result<(String, ConversationState)> {
        // Location extraction short-circuits the turn with a confirmation.
        let parsed = tokio::time::timeout(self.external_timeout, self.locations.parse(&inbound.text))
            .await
            .unwrap_or_else(|_| {
                warn!("location parse timed out");
                None
            });
        if let Some(location) = parsed {
            let mut updated = state;
            updated.stage = Stage::LocationSetup;
            updated.metadata.message_count += 1;
            updated.metadata.last_updated = Utc::now();
            updated.context.location = Some(location.clone());
            self.users.update_location(&user.id, &location).await?;
            info!(user_id = %user.id, location = %format_location(&location), "location captured");

            let composed = self.composer.compose(&inbound.text, &updated);
            updated.context.follow_up_questions = composed.follow_up;
            return Ok((composed.response, updated));
        }

        let stage_matched = matches_stage_keyword(&inbound.text);
        let mut updated = analyze_message(&inbound.text, &state);

        // Long-term profile tracking unions; the per-turn context list was
        // already replaced by the classifier.
        if !updated.context.symptoms.is_empty() {
            self.health
                .track_symptoms(&user.id, &updated.context.symptoms)
                .await?;
        }

        if tracking::is_tracking_message(&inbound.text) {
            let today = Utc::now().date_naive();
            let reply =
                tracking::handle_tracking_message(&self.health, &user.id, &inbound.text, today)
                    .await?;
            return Ok((reply, updated));
        }

        let reply = match updated.stage {
            Stage::SymptomCheck
                if !updated.context.symptoms.is_empty()
                    && updated.context.urgency != Some(Urgency::High) =>
            {
                let kind = assessment_kind(&inbound.text);
                let assessment = symptoms::assess(&updated.context.symptoms, kind);
                symptoms::render(&assessment, updated.context.location.is_some())
            }
            Stage::ClinicSearch if updated.context.location.is_some() => {
                let listing = self.search_clinics(&updated).await;
                // Urgent care stays ahead of any clinic listing.
                if updated.context.urgency == Some(Urgency::High) {
                    format!("{URGENT_BANNER}{listing}")
                } else {
                    listing
                }
            }
            _ if !stage_matched && state.stage != Stage::Greeting => {
                // No keyword matched at all; treat as a free-text question
                // for the LLM responder. A keyword that re-matches the
                // current stage still gets the stage-specific reply.
                self.free_text_reply(user, &updated).await?
            }
            _ => {
                let composed = self.composer.compose(&inbound.text, &updated);
                updated.context.follow_up_questions = composed.follow_up;
                composed.response
            }
        };

        Ok((reply, updated))
    }

    async fn search_clinics(&self, state: &ConversationState) -> String {
        let location = match &state.context.location {
            Some(location) => location,
            None => return PLACES_FALLBACK.to_string(),
        };
        let keyword = state.context.service_type.map(|service| service.display_name());

        let lookup = self.places.nearby(
            location.lat,
            location.lng,
            CLINIC_SEARCH_RADIUS_METERS,
            keyword,
        );
        match tokio::time::timeout(self.external_timeout, lookup).await {
            Ok(Ok(places)) if !places.is_empty() => format_clinic_list(&places),
            Ok(Ok(_)) => {
                "I can help you find healthcare services! Could you share your location or city \
                 so I can provide specific clinic recommendations? 🏥"
                    .to_string()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "places lookup failed");
                PLACES_FALLBACK.to_string()
            }
            Err(_) => {
                warn!("places lookup timed out");
                PLACES_FALLBACK.to_string()
            }
        }
    }

    async fn free_text_reply(&self, user: &User, state: &ConversationState) -> Result<String> {
        let history = self.log.recent(&user.id, RECENT_HISTORY_LIMIT).await?;
        let context = PromptContext {
            topic: topic_for(state),
            urgency: state.context.urgency,
            user_location: state.context.location.as_ref().map(format_location),
            is_new_user: state.metadata.message_count <= 1,
        };

        let completion = self.llm.complete(&history, &context);
        match tokio::time::timeout(self.external_timeout, completion).await {
            Ok(text) => Ok(text),
            Err(_) => {
                warn!(user_id = %user.id, "llm completion timed out");
                Ok(LLM_FALLBACK.to_string())
            }
        }
    }
}

fn assessment_kind(message: &str) -> AssessmentKind {
    let lower = message.to_lowercase();
    let sti_markers = ["sti", "std", "infection", "discharge", "burning", "itching"];
    if sti_markers.iter().any(|kw| lower.contains(kw)) {
        AssessmentKind::Sti
    } else {
        AssessmentKind::General
    }
}

fn topic_for(state: &ConversationState) -> Topic {
    match state.context.service_type {
        Some(ServiceType::StiTesting) => Topic::StiSymptomsAndTesting,
        Some(ServiceType::FamilyPlanning) => Topic::Contraception,
        Some(ServiceType::EmergencyContraception) => Topic::EmergencyContraception,
        Some(ServiceType::PregnancyCare) => Topic::PregnancyConcern,
        Some(ServiceType::Gynecology) | None => Topic::General,
    }
}

/// Render the top three results the way the WhatsApp reply expects them.
fn format_clinic_list(places: &[Place]) -> String {
    let listing = places
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, place)| {
            format!(
                "{}. {}\n📍 {}\n📞 {}",
                i + 1,
                place.name,
                place.address,
                place.phone.as_deref().unwrap_or("Contact available on-site")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Here are some nearby healthcare facilities:\n\n{listing}\n\n\
         Would you like more information about any of these clinics? 🏥"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{ChatMessage, InMemoryMessageLog, InMemoryUserStore};
    use crate::health::InMemoryHealthStore;
    use crate::location::{Geocoder, Location};
    use crate::respond::FixedChooser;
    use crate::storage::InMemoryConversationStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct NoopGeocoder;

    #[async_trait]
    impl Geocoder for NoopGeocoder {
        async fn geocode(&self, _query: &str) -> anyhow::Result<Option<Location>> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, recipient_id: &str, text: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((recipient_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    /// Notifier that records how many sends overlap, to show that turns
    /// for one sender never run at the same time.
    #[derive(Default)]
    struct OverlapCountingNotifier {
        active: AtomicUsize,
        max_active: AtomicUsize,
        sent: AtomicUsize,
    }

    #[async_trait]
    impl Notifier for OverlapCountingNotifier {
        async fn send(&self, _recipient_id: &str, _text: &str) -> Result<()> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct StaticLlm(&'static str);

    #[async_trait]
    impl LlmResponder for StaticLlm {
        async fn complete(&self, _history: &[ChatMessage], _context: &PromptContext) -> String {
            self.0.to_string()
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl LlmResponder for SlowLlm {
        async fn complete(&self, _history: &[ChatMessage], _context: &PromptContext) -> String {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late".to_string()
        }
    }

    struct FixedPlaces(Vec<Place>);

    #[async_trait]
    impl PlacesLookup for FixedPlaces {
        async fn nearby(
            &self,
            _lat: f64,
            _lng: f64,
            _radius_meters: u32,
            _keyword: Option<&str>,
        ) -> anyhow::Result<Vec<Place>> {
            Ok(self.0.clone())
        }
    }

    struct FailingPlaces;

    #[async_trait]
    impl PlacesLookup for FailingPlaces {
        async fn nearby(
            &self,
            _lat: f64,
            _lng: f64,
            _radius_meters: u32,
            _keyword: Option<&str>,
        ) -> anyhow::Result<Vec<Place>> {
            anyhow::bail!("quota exceeded")
        }
    }

    fn engine_with(
        llm: Arc<dyn LlmResponder>,
        places: Arc<dyn PlacesLookup>,
        notifier: Arc<RecordingNotifier>,
    ) -> ConversationEngine {
        ConversationEngine::new(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryMessageLog::new()),
            HealthTracker::new(Arc::new(InMemoryHealthStore::new())),
            LocationParser::new(Arc::new(NoopGeocoder)),
            places,
            llm,
            notifier,
            ResponseComposer::new(Arc::new(FixedChooser(0))),
        )
        .with_external_timeout(Duration::from_millis(100))
    }

    fn inbound(text: &str) -> InboundMessage {
        InboundMessage {
            sender_id: "+2348012345678".to_string(),
            text: text.to_string(),
            has_media: false,
            media_url: None,
            media_type: None,
        }
    }

    fn last_reply(notifier: &RecordingNotifier) -> String {
        notifier.sent.lock().unwrap().last().unwrap().1.clone()
    }

    #[tokio::test]
    async fn location_message_short_circuits_with_confirmation() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine_with(
            Arc::new(StaticLlm("unused")),
            Arc::new(FixedPlaces(vec![])),
            notifier.clone(),
        );

        engine.handle_message(inbound("I'm in Ogudu")).await;
        let reply = last_reply(&notifier);
        assert!(reply.contains("Perfect! I have your location as Ogudu, Lagos"));
    }

    #[tokio::test]
    async fn greeting_gets_template_reply() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine_with(
            Arc::new(StaticLlm("unused")),
            Arc::new(FixedPlaces(vec![])),
            notifier.clone(),
        );

        engine.handle_message(inbound("hello")).await;
        assert!(last_reply(&notifier).contains("Obrin Health assistant"));
    }

    #[tokio::test]
    async fn symptom_message_gets_assessment_reply() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine_with(
            Arc::new(StaticLlm("unused")),
            Arc::new(FixedPlaces(vec![])),
            notifier.clone(),
        );

        engine.handle_message(inbound("I have burning and discharge")).await;
        let reply = last_reply(&notifier);
        assert!(reply.contains("Chlamydia or Gonorrhea"));
        assert!(reply.contains("Urine test for UTI"));
        assert!(reply.contains("share your location"));
    }

    #[tokio::test]
    async fn urgent_symptom_followup_foregrounds_urgent_care() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine_with(
            Arc::new(StaticLlm("unused")),
            Arc::new(FixedPlaces(vec![])),
            notifier.clone(),
        );

        // The second message re-matches the symptom keywords while raising
        // the urgency; the urgent-care recommendation must come first.
        engine.handle_message(inbound("I have burning and discharge")).await;
        engine.handle_message(inbound("the burning is urgent")).await;
        let reply = last_reply(&notifier);
        assert!(reply.starts_with("⚠️"), "got: {reply}");
        assert!(reply.contains("Seek medical care within 24 hours"));
    }

    #[tokio::test]
    async fn urgent_clinic_search_puts_banner_ahead_of_listing() {
        let notifier = Arc::new(RecordingNotifier::default());
        let places = vec![Place {
            name: "Ikeja Family Clinic".to_string(),
            address: "12 Allen Ave, Ikeja".to_string(),
            phone: None,
            services: vec![],
            rating: None,
            distance: None,
        }];
        let engine = engine_with(
            Arc::new(StaticLlm("unused")),
            Arc::new(FixedPlaces(places)),
            notifier.clone(),
        );

        engine.handle_message(inbound("I'm in Ikeja")).await;
        engine.handle_message(inbound("I urgently need a clinic")).await;
        let reply = last_reply(&notifier);
        assert!(reply.starts_with("⚠️"), "got: {reply}");
        assert!(reply.contains("1. Ikeja Family Clinic"));
    }

    #[tokio::test]
    async fn clinic_search_with_location_lists_places() {
        let notifier = Arc::new(RecordingNotifier::default());
        let places = vec![Place {
            name: "Ikeja Family Clinic".to_string(),
            address: "12 Allen Ave, Ikeja".to_string(),
            phone: Some("+234-1-5550000".to_string()),
            services: vec![],
            rating: Some(4.4),
            distance: None,
        }];
        let engine = engine_with(
            Arc::new(StaticLlm("unused")),
            Arc::new(FixedPlaces(places)),
            notifier.clone(),
        );

        engine.handle_message(inbound("I'm in Ikeja")).await;
        engine.handle_message(inbound("find me a clinic")).await;
        let reply = last_reply(&notifier);
        assert!(reply.contains("1. Ikeja Family Clinic"));
        assert!(reply.contains("📞 +234-1-5550000"));
    }

    #[tokio::test]
    async fn places_failure_degrades_to_canned_reply() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine_with(
            Arc::new(StaticLlm("unused")),
            Arc::new(FailingPlaces),
            notifier.clone(),
        );

        engine.handle_message(inbound("I'm in Ikeja")).await;
        engine.handle_message(inbound("find me a clinic")).await;
        assert_eq!(last_reply(&notifier), PLACES_FALLBACK);
    }

    #[tokio::test]
    async fn llm_timeout_degrades_to_fallback_text() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine_with(
            Arc::new(SlowLlm),
            Arc::new(FixedPlaces(vec![])),
            notifier.clone(),
        );

        // Two unmatched messages: the second leaves the stage unchanged and
        // routes to the LLM, which times out.
        engine.handle_message(inbound("I have pain")).await;
        engine.handle_message(inbound("it started two weeks ago")).await;
        assert_eq!(last_reply(&notifier), LLM_FALLBACK);
    }

    #[tokio::test]
    async fn tracking_message_routes_to_period_engine() {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = engine_with(
            Arc::new(StaticLlm("unused")),
            Arc::new(FixedPlaces(vec![])),
            notifier.clone(),
        );

        engine
            .handle_message(inbound("My last period started 15/01/2024"))
            .await;
        let reply = last_reply(&notifier);
        assert!(reply.contains("recorded your last period as 15/01/2024"));
        assert!(reply.contains("average cycle length"));
    }

    #[tokio::test]
    async fn reminder_sweep_messages_users_three_days_out() {
        let notifier = Arc::new(RecordingNotifier::default());
        let users = Arc::new(InMemoryUserStore::new());
        let tracker = HealthTracker::new(Arc::new(InMemoryHealthStore::new()));
        let engine = ConversationEngine::new(
            Arc::new(InMemoryConversationStore::new()),
            users.clone(),
            Arc::new(InMemoryMessageLog::new()),
            tracker.clone(),
            LocationParser::new(Arc::new(NoopGeocoder)),
            Arc::new(FixedPlaces(vec![])),
            Arc::new(StaticLlm("unused")),
            notifier.clone(),
            ResponseComposer::new(Arc::new(FixedChooser(0))),
        );

        let user = users.find_or_create("+2348012345678").await.unwrap();
        let last_period = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        tracker
            .record_period(&user.id, last_period, None, None)
            .await
            .unwrap();
        tracker.set_cycle_length(&user.id, 28).await.unwrap();

        // Predicted period is 2024-01-29; three days earlier triggers it.
        let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 26).unwrap();
        engine.send_period_reminders(today).await.unwrap();

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+2348012345678");
        assert!(sent[0].1.contains("Period Reminder"));

        // A day with no matching offset sends nothing.
        drop(sent);
        let quiet_day = chrono::NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        engine.send_period_reminders(quiet_day).await.unwrap();
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_turns_for_same_user_are_serialized() {
        let notifier = Arc::new(OverlapCountingNotifier::default());
        let store = Arc::new(InMemoryConversationStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let engine = ConversationEngine::new(
            store.clone(),
            users.clone(),
            Arc::new(InMemoryMessageLog::new()),
            HealthTracker::new(Arc::new(InMemoryHealthStore::new())),
            LocationParser::new(Arc::new(NoopGeocoder)),
            Arc::new(FixedPlaces(vec![])),
            Arc::new(StaticLlm("sure")),
            notifier.clone(),
            ResponseComposer::new(Arc::new(FixedChooser(0))),
        );

        tokio::join!(
            engine.handle_message(inbound("hello")),
            engine.handle_message(inbound("I have pain")),
        );

        assert_eq!(notifier.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 2);

        let user = users.find_or_create("+2348012345678").await.unwrap();
        let conversation_id = Utc::now().date_naive().to_string();
        let state = store.get(&user.id, &conversation_id).await.unwrap();
        assert_eq!(state.metadata.message_count, 2);

        // Both turns done, nobody waiting: the guard entry is gone.
        assert!(engine.turn_guards.is_empty());
    }

    #[tokio::test]
    async fn message_count_advances_across_turns() {
        let notifier = Arc::new(RecordingNotifier::default());
        let store = Arc::new(InMemoryConversationStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let engine = ConversationEngine::new(
            store.clone(),
            users.clone(),
            Arc::new(InMemoryMessageLog::new()),
            HealthTracker::new(Arc::new(InMemoryHealthStore::new())),
            LocationParser::new(Arc::new(NoopGeocoder)),
            Arc::new(FixedPlaces(vec![])),
            Arc::new(StaticLlm("sure")),
            notifier.clone(),
            ResponseComposer::new(Arc::new(FixedChooser(0))),
        );

        engine.handle_message(inbound("hello")).await;
        engine.handle_message(inbound("hello again")).await;

        let user = users.find_or_create("+2348012345678").await.unwrap();
        let conversation_id = Utc::now().date_naive().to_string();
        let state = store.get(&user.id, &conversation_id).await.unwrap();
        assert_eq!(state.metadata.message_count, 2);
    }
}
