use thiserror::Error;

/// Main error type for the planning pipeline
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The generation service gave up after its retry budget.
    #[error("Generation error: {0}")]
    Generation(String),

    /// A model response could not be turned into structured data.
    #[error("Format error: {0}")]
    Format(String),

    #[error("Constraint conflicts: {}", .0.join("; "))]
    Conflict(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rate limit exceeded: retry after {retry_after}s")]
    RateLimit { retry_after: u64 },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Check if this error is worth another generation attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlannerError::Generation(_)
                | PlannerError::Http(_)
                | PlannerError::RateLimit { .. }
                | PlannerError::Timeout(_)
        )
    }

    /// Errors a stage absorbs into its fallback output instead of surfacing.
    pub fn is_stage_local(&self) -> bool {
        matches!(
            self,
            PlannerError::Generation(_)
                | PlannerError::Format(_)
                | PlannerError::Validation(_)
                | PlannerError::Serialization(_)
                | PlannerError::Timeout(_)
                | PlannerError::Http(_)
                | PlannerError::RateLimit { .. }
        )
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            PlannerError::Config(_) => "CONFIG_ERROR",
            PlannerError::Generation(_) => "GENERATION_ERROR",
            PlannerError::Format(_) => "FORMAT_ERROR",
            PlannerError::Conflict(_) => "CONSTRAINT_CONFLICT",
            PlannerError::NotFound(_) => "NOT_FOUND",
            PlannerError::Validation(_) => "VALIDATION_ERROR",
            PlannerError::Serialization(_) => "SERIALIZATION_ERROR",
            PlannerError::Timeout(_) => "TIMEOUT_ERROR",
            PlannerError::Http(_) => "HTTP_ERROR",
            PlannerError::RateLimit { .. } => "RATE_LIMIT_ERROR",
            PlannerError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// Convert to a structured error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "retryable": self.is_retryable()
            }
        });

        if let PlannerError::Conflict(conflicts) = self {
            payload["conflicts"] = serde_json::json!(conflicts);
            payload["suggestions"] =
                serde_json::json!("Please adjust your constraints and try again");
        }

        payload
    }
}
