use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::location::Location;
use crate::prompt::PromptContext;

/// Canned reply when the places lookup is unavailable.
pub const PLACES_FALLBACK: &str = "I can help you find healthcare services! Please share your location, and I'll provide clinic recommendations in your area. 🏥";

/// Canned reply when the LLM responder is unavailable.
pub const LLM_FALLBACK: &str =
    "I'm experiencing some technical difficulties. Please try again in a moment.";

/// Generic apology for an unhandled failure in the turn handler.
pub const TURN_FALLBACK: &str =
    "I'm sorry, I'm having some technical difficulties. Please try again in a moment. 🤖";

/// Inbound WhatsApp message envelope, the only wire-format surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender_id: String,
    pub text: String,
    #[serde(default)]
    pub has_media: bool,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
}

/// Clinic search result. Produced fresh per query, never cached by location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub rating: Option<f32>,
    pub distance: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub phone_number: String,
    pub language: String,
    pub location: Option<Location>,
    pub city: Option<String>,
}

/// Outbound message delivery. Failures are non-fatal for the primary path.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient_id: &str, text: &str) -> Result<()>;
}

/// Black-box free-text generator. Implementations return a deterministic
/// apology string instead of erroring.
#[async_trait]
pub trait LlmResponder: Send + Sync {
    async fn complete(&self, history: &[ChatMessage], context: &PromptContext) -> String;
}

/// Black-box nearby-places lookup.
#[async_trait]
pub trait PlacesLookup: Send + Sync {
    async fn nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_meters: u32,
        keyword: Option<&str>,
    ) -> anyhow::Result<Vec<Place>>;
}

/// Users are keyed by phone number; find-or-create on first contact.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_or_create(&self, phone_number: &str) -> Result<User>;
    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>>;
    async fn update_location(&self, user_id: &str, location: &Location) -> Result<()>;
}

/// Append-only conversation message log.
#[async_trait]
pub trait MessageLog: Send + Sync {
    async fn append(&self, user_id: &str, role: MessageRole, content: &str) -> Result<()>;
    /// Most recent `limit` messages, newest first.
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<ChatMessage>>;
}

/// In-memory implementation of UserStore.
pub struct InMemoryUserStore {
    by_phone: DashMap<String, User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            by_phone: DashMap::new(),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_or_create(&self, phone_number: &str) -> Result<User> {
        let user = self
            .by_phone
            .entry(phone_number.to_string())
            .or_insert_with(|| User {
                id: Uuid::new_v4().to_string(),
                phone_number: phone_number.to_string(),
                language: "en".to_string(),
                location: None,
                city: None,
            })
            .clone();
        Ok(user)
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self
            .by_phone
            .iter()
            .find(|entry| entry.id == user_id)
            .map(|entry| entry.clone()))
    }

    async fn update_location(&self, user_id: &str, location: &Location) -> Result<()> {
        for mut entry in self.by_phone.iter_mut() {
            if entry.id == user_id {
                entry.city = location.city.clone();
                entry.location = Some(location.clone());
                break;
            }
        }
        Ok(())
    }
}

/// In-memory implementation of MessageLog.
pub struct InMemoryMessageLog {
    messages: DashMap<String, Vec<ChatMessage>>,
}

impl InMemoryMessageLog {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
        }
    }
}

impl Default for InMemoryMessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageLog for InMemoryMessageLog {
    async fn append(&self, user_id: &str, role: MessageRole, content: &str) -> Result<()> {
        self.messages
            .entry(user_id.to_string())
            .or_default()
            .push(ChatMessage {
                role,
                content: content.to_string(),
                timestamp: Utc::now(),
            });
        Ok(())
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let mut messages = self
            .messages
            .get(user_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        messages.reverse();
        messages.truncate(limit);
        Ok(messages)
    }
}
