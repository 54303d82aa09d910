pub mod classify;
pub mod engine;
pub mod error;
pub mod external;
#[cfg(feature = "google")]
pub mod google;
pub mod health;
pub mod location;
pub mod prompt;
pub mod respond;
pub mod state;
pub mod storage;
#[cfg(feature = "postgres")]
pub mod storage_pg;
pub mod symptoms;
pub mod tracking;

// Re-export commonly used types
pub use engine::ConversationEngine;
pub use error::{ObrinError, Result};
pub use external::{
    ChatMessage, InMemoryMessageLog, InMemoryUserStore, InboundMessage, LlmResponder, MessageLog,
    MessageRole, Notifier, Place, PlacesLookup, User, UserStore,
};
pub use health::{
    FlowIntensity, HealthProfile, HealthStore, HealthTracker, InMemoryHealthStore, PeriodEntry,
    PeriodPrediction,
};
pub use location::{Geocoder, Location, LocationParser};
pub use prompt::{PromptContext, Topic};
pub use respond::{Chooser, RandomChooser, ResponseComposer};
pub use state::{ConversationState, ServiceType, Stage, Urgency};
pub use storage::{ConversationStore, InMemoryConversationStore};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use respond::FixedChooser;
    use std::sync::Arc;

    struct NoGeocoder;

    #[async_trait]
    impl Geocoder for NoGeocoder {
        async fn geocode(&self, _query: &str) -> anyhow::Result<Option<Location>> {
            Ok(None)
        }
    }

    struct EmptyPlaces;

    #[async_trait]
    impl PlacesLookup for EmptyPlaces {
        async fn nearby(
            &self,
            _lat: f64,
            _lng: f64,
            _radius_meters: u32,
            _keyword: Option<&str>,
        ) -> anyhow::Result<Vec<Place>> {
            Ok(Vec::new())
        }
    }

    struct EchoLlm;

    #[async_trait]
    impl LlmResponder for EchoLlm {
        async fn complete(&self, history: &[ChatMessage], _context: &PromptContext) -> String {
            history
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default()
        }
    }

    struct CollectingNotifier {
        sent: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for CollectingNotifier {
        async fn send(&self, _recipient_id: &str, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn full_turn_from_greeting_to_location() {
        let notifier = Arc::new(CollectingNotifier {
            sent: std::sync::Mutex::new(Vec::new()),
        });
        let engine = ConversationEngine::new(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryMessageLog::new()),
            HealthTracker::new(Arc::new(InMemoryHealthStore::new())),
            LocationParser::new(Arc::new(NoGeocoder)),
            Arc::new(EmptyPlaces),
            Arc::new(EchoLlm),
            notifier.clone(),
            ResponseComposer::new(Arc::new(FixedChooser(0))),
        );

        engine
            .handle_message(InboundMessage {
                sender_id: "+2348090000000".to_string(),
                text: "hello".to_string(),
                has_media: false,
                media_url: None,
                media_type: None,
            })
            .await;
        engine
            .handle_message(InboundMessage {
                sender_id: "+2348090000000".to_string(),
                text: "I'm in Lagos".to_string(),
                has_media: false,
                media_url: None,
                media_type: None,
            })
            .await;

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("Obrin Health"));
        assert!(sent[1].contains("Lagos"));
    }
}
