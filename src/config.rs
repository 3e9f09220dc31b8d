//! Runtime configuration read from the environment.

use std::time::Duration;

use crate::error::{PlannerError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ADDR: &str = "0.0.0.0:5000";

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_ADVISORY_TIMEOUT_SECS: u64 = 20;

/// Settings shared by the generation client, the orchestrator and the server.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Secondary model consulted by the plan enhancer, if any.
    pub advisory_model: Option<String>,
    pub request_timeout: Duration,
    pub advisory_timeout: Duration,
    pub addr: String,
}

impl PlannerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            advisory_model: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            advisory_timeout: Duration::from_secs(DEFAULT_ADVISORY_TIMEOUT_SECS),
            addr: DEFAULT_ADDR.to_string(),
        }
    }

    /// Build from `OPENAI_API_KEY` and the optional `TRIPWEAVER_*` keys.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            PlannerError::Config(
                "OPENAI_API_KEY environment variable must be set before planning".to_string(),
            )
        })?;

        let mut config = Self::new(api_key);

        if let Ok(base_url) =
            std::env::var("OPENAI_BASE_URL").or_else(|_| std::env::var("OPENROUTER_BASE_URL"))
        {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var("TRIPWEAVER_MODEL") {
            config.model = model;
        }
        config.advisory_model = std::env::var("TRIPWEAVER_ADVISORY_MODEL")
            .ok()
            .filter(|model| !model.trim().is_empty());
        if let Some(secs) = env_secs("TRIPWEAVER_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("TRIPWEAVER_ADVISORY_TIMEOUT_SECS")? {
            config.advisory_timeout = Duration::from_secs(secs);
        }
        if let Ok(addr) = std::env::var("TRIPWEAVER_ADDR") {
            config.addr = addr;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_advisory_model(mut self, model: Option<String>) -> Self {
        self.advisory_model = model;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_advisory_timeout(mut self, timeout: Duration) -> Self {
        self.advisory_timeout = timeout;
        self
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }
}

fn env_secs(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| PlannerError::Config(format!("{key} must be a whole number of seconds: {err}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = PlannerConfig::new("key")
            .with_model("gpt-4o")
            .with_advisory_model(Some("travel-advisor".to_string()))
            .with_advisory_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.advisory_model.as_deref(), Some("travel-advisor"));
        assert_eq!(config.advisory_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
    }
}
