//! Error types used throughout the engines

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for calgrid
///
/// Grid overflow and unparseable dates at the ingestion boundary are not
/// represented here: the former silently drops events from layout output and
/// the latter falls back to the current instant.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CalendarError {
    /// The recurrence configuration could not be turned into a schedule.
    #[error("Invalid recurrence rule {rule}: {cause}")]
    InvalidRule { rule: String, cause: String },

    /// A scoped mutation referenced a series uid with no base event.
    #[error("Base series not found for uid: {0}")]
    BaseSeriesNotFound(String),

    #[error("Interchange error: {0}")]
    Interchange(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CalendarError {
    /// Build an [`CalendarError::InvalidRule`] embedding the raw rule payload.
    pub fn invalid_rule(rule: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::InvalidRule { rule: rule.into(), cause: cause.into() }
    }

    /// Stable label suitable for logging fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidRule { .. } => "invalid_rule",
            Self::BaseSeriesNotFound(_) => "base_series_not_found",
            Self::Interchange(_) => "interchange",
            Self::Config(_) => "config",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

/// Result type alias for calgrid operations
pub type Result<T> = std::result::Result<T, CalendarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rule_message_embeds_payload_and_cause() {
        let err = CalendarError::invalid_rule(r#"{"interval":0}"#, "interval must be positive");
        let message = err.to_string();

        assert!(message.contains(r#"{"interval":0}"#));
        assert!(message.contains("interval must be positive"));
        assert_eq!(err.label(), "invalid_rule");
    }

    #[test]
    fn errors_serialize_with_type_tag() {
        let err = CalendarError::BaseSeriesNotFound("abc@calgrid".to_string());
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["type"], "BaseSeriesNotFound");
        assert_eq!(json["message"], "abc@calgrid");
    }
}
