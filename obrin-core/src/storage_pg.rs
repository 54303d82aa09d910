//! Postgres-backed stores. Enabled by the `postgres` feature; the state and
//! profile payloads are kept as JSONB so the schema stays stable while the
//! Rust types evolve.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::{ObrinError, Result};
use crate::health::{HealthProfile, HealthStore};
use crate::state::ConversationState;
use crate::storage::ConversationStore;

fn storage_err(e: sqlx::Error) -> ObrinError {
    ObrinError::Storage(e.to_string())
}

/// Conversation state persisted in a `conversations` table, one row per
/// (user_id, conversation_id).
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                user_id TEXT NOT NULL,
                conversation_id TEXT NOT NULL,
                state JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (user_id, conversation_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn get(&self, user_id: &str, conversation_id: &str) -> Result<ConversationState> {
        let row = sqlx::query(
            "SELECT state FROM conversations WHERE user_id = $1 AND conversation_id = $2",
        )
        .bind(user_id)
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        match row {
            Some(row) => {
                let state: serde_json::Value = row.get("state");
                Ok(serde_json::from_value(state)?)
            }
            None => {
                let fresh = ConversationState::new(user_id, conversation_id);
                self.update(&fresh).await?;
                Ok(fresh)
            }
        }
    }

    async fn update(&self, state: &ConversationState) -> Result<()> {
        let payload = serde_json::to_value(state)?;
        sqlx::query(
            r#"
            INSERT INTO conversations (user_id, conversation_id, state, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (user_id, conversation_id)
            DO UPDATE SET state = EXCLUDED.state, updated_at = now()
            "#,
        )
        .bind(&state.metadata.user_id)
        .bind(&state.metadata.conversation_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn reset(&self, user_id: &str, conversation_id: &str) -> Result<ConversationState> {
        let fresh = ConversationState::new(user_id, conversation_id);
        self.update(&fresh).await?;
        Ok(fresh)
    }
}

/// Health profiles persisted in a `health_profiles` table, one row per user.
pub struct PostgresHealthStore {
    pool: PgPool,
}

impl PostgresHealthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS health_profiles (
                user_id TEXT PRIMARY KEY,
                profile JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}

#[async_trait]
impl HealthStore for PostgresHealthStore {
    async fn get(&self, user_id: &str) -> Result<Option<HealthProfile>> {
        let row = sqlx::query("SELECT profile FROM health_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        match row {
            Some(row) => {
                let profile: serde_json::Value = row.get("profile");
                Ok(Some(serde_json::from_value(profile)?))
            }
            None => Ok(None),
        }
    }

    async fn tracked_user_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT user_id FROM health_profiles")
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(rows.iter().map(|row| row.get("user_id")).collect())
    }

    async fn save(&self, user_id: &str, profile: HealthProfile) -> Result<()> {
        let payload = serde_json::to_value(&profile)?;
        sqlx::query(
            r#"
            INSERT INTO health_profiles (user_id, profile, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (user_id)
            DO UPDATE SET profile = EXCLUDED.profile, updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}
