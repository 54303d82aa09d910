use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::state::ConversationState;

/// Persistence for conversation state, keyed by (user_id, conversation_id)
/// with upsert semantics. At most one live record per key.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Return the existing state or create, persist and return a fresh one.
    async fn get(&self, user_id: &str, conversation_id: &str) -> Result<ConversationState>;

    /// Upsert by (user_id, conversation_id).
    async fn update(&self, state: &ConversationState) -> Result<()>;

    /// Re-initialize to the greeting stage in place, preserving the key.
    async fn reset(&self, user_id: &str, conversation_id: &str) -> Result<ConversationState>;
}

/// In-memory implementation of ConversationStore.
pub struct InMemoryConversationStore {
    states: DashMap<(String, String), ConversationState>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, user_id: &str, conversation_id: &str) -> Result<ConversationState> {
        let key = (user_id.to_string(), conversation_id.to_string());
        let state = self
            .states
            .entry(key)
            .or_insert_with(|| ConversationState::new(user_id, conversation_id))
            .clone();
        Ok(state)
    }

    async fn update(&self, state: &ConversationState) -> Result<()> {
        let key = (
            state.metadata.user_id.clone(),
            state.metadata.conversation_id.clone(),
        );
        self.states.insert(key, state.clone());
        Ok(())
    }

    async fn reset(&self, user_id: &str, conversation_id: &str) -> Result<ConversationState> {
        let fresh = ConversationState::new(user_id, conversation_id);
        self.update(&fresh).await?;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Stage, Urgency};

    #[tokio::test]
    async fn get_creates_lazily_and_then_returns_same_record() {
        let store = InMemoryConversationStore::new();
        let first = store.get("u1", "c1").await.unwrap();
        assert_eq!(first.stage, Stage::Greeting);

        let mut updated = first.clone();
        updated.stage = Stage::ClinicSearch;
        updated.context.urgency = Some(Urgency::High);
        store.update(&updated).await.unwrap();

        let fetched = store.get("u1", "c1").await.unwrap();
        assert_eq!(fetched.stage, Stage::ClinicSearch);
        assert_eq!(fetched.context.urgency, Some(Urgency::High));
    }

    #[tokio::test]
    async fn states_are_isolated_per_key() {
        let store = InMemoryConversationStore::new();
        let mut a = store.get("u1", "c1").await.unwrap();
        a.stage = Stage::SymptomCheck;
        store.update(&a).await.unwrap();

        let b = store.get("u1", "c2").await.unwrap();
        assert_eq!(b.stage, Stage::Greeting);
    }

    #[tokio::test]
    async fn reset_reinitializes_in_place() {
        let store = InMemoryConversationStore::new();
        let mut state = store.get("u1", "c1").await.unwrap();
        state.stage = Stage::ClinicDetails;
        state.metadata.message_count = 9;
        store.update(&state).await.unwrap();

        let fresh = store.reset("u1", "c1").await.unwrap();
        assert_eq!(fresh.stage, Stage::Greeting);
        assert_eq!(fresh.metadata.message_count, 0);
        assert_eq!(fresh.metadata.user_id, "u1");

        let fetched = store.get("u1", "c1").await.unwrap();
        assert_eq!(fetched.stage, Stage::Greeting);
    }
}
