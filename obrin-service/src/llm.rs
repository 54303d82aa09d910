use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::{Chat, Message};
use rig::providers::openrouter;
use tracing::warn;

use obrin_core::external::LLM_FALLBACK;
use obrin_core::prompt::build_system_prompt;
use obrin_core::{ChatMessage, LlmResponder, MessageRole, PromptContext};

const MODEL: &str = "openai/gpt-4o-mini";

/// LLM responder backed by OpenRouter. The system prompt is rebuilt per
/// request from the typed context, so topic guidance always reflects the
/// current conversation.
pub struct OpenRouterResponder {
    api_key: String,
}

impl OpenRouterResponder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl LlmResponder for OpenRouterResponder {
    async fn complete(&self, history: &[ChatMessage], context: &PromptContext) -> String {
        let client = openrouter::Client::new(&self.api_key);
        let agent = client
            .agent(MODEL)
            .preamble(&build_system_prompt(context))
            .build();

        // History arrives newest-first; the chat API wants chronological
        // order with the current user message as the prompt.
        let mut chronological: Vec<&ChatMessage> = history.iter().rev().collect();
        let prompt = match chronological.last() {
            Some(message) if message.role == MessageRole::User => {
                chronological.pop().map(|m| m.content.clone()).unwrap_or_default()
            }
            _ => String::new(),
        };
        let chat_history: Vec<Message> = chronological
            .into_iter()
            .map(|message| match message.role {
                MessageRole::User => Message::user(message.content.clone()),
                MessageRole::Assistant => Message::assistant(message.content.clone()),
            })
            .collect();

        match agent.chat(&prompt, chat_history).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "completion request failed");
                LLM_FALLBACK.to_string()
            }
        }
    }
}
