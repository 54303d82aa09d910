use thiserror::Error;

/// Errors produced by the conversation core.
#[derive(Error, Debug)]
pub enum ObrinError {
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{message}")]
    OutOfRange {
        field: &'static str,
        message: String,
    },

    #[error("message delivery failed: {0}")]
    Delivery(String),

    #[error("external service error: {0}")]
    External(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ObrinError {
    /// Guidance text shown to the user when a validated field is rejected.
    pub fn cycle_length_range() -> Self {
        ObrinError::OutOfRange {
            field: "cycle_length",
            message: "A typical menstrual cycle is between 21-35 days. Please enter a number in that range.".to_string(),
        }
    }

    pub fn period_length_range() -> Self {
        ObrinError::OutOfRange {
            field: "period_length",
            message: "Periods usually last between 2-10 days. Please enter a number in that range.".to_string(),
        }
    }

    pub fn reminder_days_range() -> Self {
        ObrinError::OutOfRange {
            field: "reminder_days",
            message: "I can remind you between 1 and 7 days before your period. Please pick a number in that range.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ObrinError>;
