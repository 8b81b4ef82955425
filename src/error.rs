//! Error types for the research agent
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::llm::LlmError;

/// All error types that can escape the agent loop
#[derive(Debug, Error)]
pub enum ResearchError {
    /// Startup misconfiguration (bad config file, client construction)
    #[error("Setup error: {0}")]
    Setup(String),

    /// A required credential was not present in the environment
    #[error("Missing credential: environment variable {env_var} not set")]
    MissingCredential { env_var: String },

    /// Model gateway failure; ends the session
    #[error("Model gateway error: {0}")]
    Gateway(#[from] LlmError),

    /// Illegal state machine transition
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The model kept requesting tools past the configured turn cap
    #[error("Turn limit of {limit} reached without a final answer")]
    TurnLimit { limit: u32 },

    /// Session persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for research agent operations
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_error() {
        let err = ResearchError::MissingCredential {
            env_var: "TAVILY_API_KEY".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing credential: environment variable TAVILY_API_KEY not set"
        );
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = ResearchError::InvalidTransition("session already terminated".to_string());
        assert_eq!(err.to_string(), "Invalid transition: session already terminated");
    }

    #[test]
    fn test_turn_limit_error() {
        let err = ResearchError::TurnLimit { limit: 25 };
        assert_eq!(err.to_string(), "Turn limit of 25 reached without a final answer");
    }

    #[test]
    fn test_gateway_error_conversion() {
        let llm_err = LlmError::InvalidResponse("no candidates".to_string());
        let err: ResearchError = llm_err.into();
        assert!(matches!(err, ResearchError::Gateway(_)));
        assert!(err.to_string().contains("no candidates"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ResearchError = io_err.into();
        assert!(matches!(err, ResearchError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: ResearchError = json_err.into();
        assert!(matches!(err, ResearchError::Json(_)));
    }
}
