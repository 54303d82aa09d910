mod llm;
mod whatsapp;

use axum::{
    Router,
    extract::{Form, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    routing::{get, post},
};
use obrin_core::google::{GoogleGeocoder, GooglePlaces};
use obrin_core::respond::RandomChooser;
use obrin_core::storage_pg::{PostgresConversationStore, PostgresHealthStore};
use obrin_core::{
    ConversationEngine, ConversationStore, HealthStore, HealthTracker, InMemoryConversationStore,
    InMemoryHealthStore, InMemoryMessageLog, InMemoryUserStore, InboundMessage, LocationParser,
    ResponseComposer,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{Instrument, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::llm::OpenRouterResponder;
use crate::whatsapp::TwilioNotifier;

#[derive(Clone)]
struct AppState {
    engine: Arc<ConversationEngine>,
}

/// Twilio WhatsApp webhook payload, form-encoded.
#[derive(Debug, Deserialize)]
struct TwilioWebhook {
    #[serde(rename = "From")]
    from: String,
    #[serde(rename = "Body", default)]
    body: String,
    #[serde(rename = "NumMedia", default)]
    num_media: String,
    #[serde(rename = "MediaUrl0")]
    media_url: Option<String>,
    #[serde(rename = "MediaContentType0")]
    media_type: Option<String>,
}

/// Initialize structured JSON tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "obrin_service=debug,obrin_core=debug,tower_http=debug".into());

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(
    mut request: Request<axum::body::Body>,
    next: Next,
) -> axum::response::Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

fn require_env(name: &str) -> String {
    match std::env::var(name) {
        Ok(value) => value,
        Err(_) => {
            error!("{name} not set");
            std::process::exit(1);
        }
    }
}

async fn build_stores() -> (Arc<dyn ConversationStore>, Arc<dyn HealthStore>) {
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        match PgPool::connect(&database_url).await {
            Ok(pool) => {
                info!("Using PostgreSQL storage");
                let conversations = PostgresConversationStore::new(pool.clone());
                let health = PostgresHealthStore::new(pool);
                if let Err(e) = conversations.init().await {
                    error!(error = %e, "failed to initialize conversations table");
                    std::process::exit(1);
                }
                if let Err(e) = health.init().await {
                    error!(error = %e, "failed to initialize health_profiles table");
                    std::process::exit(1);
                }
                return (Arc::new(conversations), Arc::new(health));
            }
            Err(e) => {
                error!(
                    "Failed to connect to PostgreSQL: {}. Falling back to in-memory storage.",
                    e
                );
            }
        }
    } else {
        info!("Using in-memory storage (set DATABASE_URL to use PostgreSQL)");
    }
    (
        Arc::new(InMemoryConversationStore::new()),
        Arc::new(InMemoryHealthStore::new()),
    )
}

#[tokio::main]
async fn main() {
    init_tracing();

    let openrouter_key = require_env("OPENROUTER_API_KEY");
    let twilio_sid = require_env("TWILIO_ACCOUNT_SID");
    let twilio_token = require_env("TWILIO_AUTH_TOKEN");
    let twilio_number = require_env("TWILIO_PHONE_NUMBER");

    // Location parsing degrades to the built-in gazetteer when geocoding is
    // unavailable, so a missing Maps key is a warning rather than fatal.
    let maps_key = std::env::var("GOOGLE_MAPS_API_KEY").unwrap_or_else(|_| {
        warn!("GOOGLE_MAPS_API_KEY not set, geocoder and clinic search will be degraded");
        String::new()
    });

    let (conversations, health_store) = build_stores().await;

    let engine = ConversationEngine::new(
        conversations,
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryMessageLog::new()),
        HealthTracker::new(health_store),
        LocationParser::new(Arc::new(GoogleGeocoder::new(maps_key.clone()))),
        Arc::new(GooglePlaces::new(maps_key)),
        Arc::new(OpenRouterResponder::new(openrouter_key)),
        Arc::new(TwilioNotifier::new(twilio_sid, twilio_token, twilio_number)),
        ResponseComposer::new(Arc::new(RandomChooser)),
    );

    let app_state = AppState {
        engine: Arc::new(engine),
    };

    // Daily sweep for upcoming-period reminders.
    let reminder_engine = app_state.engine.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            let today = chrono::Utc::now().date_naive();
            if let Err(e) = reminder_engine.send_period_reminders(today).await {
                error!(error = %e, "reminder sweep failed");
            }
        }
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/whatsapp/webhook", post(whatsapp_webhook))
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state);

    let listener = match tokio::net::TcpListener::bind("0.0.0.0:3000").await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to bind 0.0.0.0:3000");
            std::process::exit(1);
        }
    };

    info!("Server running on http://0.0.0.0:3000");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error");
    }
}

async fn health_check() -> &'static str {
    "OK"
}

async fn whatsapp_webhook(
    State(state): State<AppState>,
    Form(payload): Form<TwilioWebhook>,
) -> StatusCode {
    let sender_id = payload.from.replace("whatsapp:", "");
    let has_media = payload.num_media.parse::<u32>().map(|n| n > 0).unwrap_or(false);

    info!(
        sender_id = %sender_id,
        message_length = payload.body.len(),
        has_media,
        "Processing inbound WhatsApp message"
    );

    state
        .engine
        .handle_message(InboundMessage {
            sender_id,
            text: payload.body,
            has_media,
            media_url: payload.media_url,
            media_type: payload.media_type,
        })
        .await;

    StatusCode::OK
}
