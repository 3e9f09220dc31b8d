use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    config::PlannerConfig,
    error::{PlannerError, Result},
    services::generation::{GenerationRequest, TextGenerator},
};

/// `TextGenerator` over any OpenAI-compatible `chat/completions` endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_timeout(api_key, base_url, model, Duration::from_secs(120))
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self> {
        Self::with_timeout(
            config.api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
            config.request_timeout,
        )
    }

    fn with_timeout(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PlannerError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST one chat completion, making at most `max_attempts` requests.
    ///
    /// 429 (honoring `Retry-After`), 5xx and transport failures are retried
    /// with exponential backoff while attempts remain.
    pub async fn chat_completion(&self, body: &Value, max_attempts: usize) -> Result<Value> {
        self.post_with_budget(body, max_attempts)
            .await
            .map_err(Attempt::into_error)
    }

    async fn post_with_budget(
        &self,
        body: &Value,
        max_attempts: usize,
    ) -> std::result::Result<Value, Attempt> {
        let attempts = max_attempts.max(1);
        let mut backoff = Duration::from_millis(250);
        let mut attempt = 1;

        loop {
            match self.post_once(body).await {
                Ok(response) => return Ok(response),
                Err(Attempt::Retry { error, retry_after }) if attempt < attempts => {
                    debug!(attempt, error = %error, "retryable failure, backing off");
                    tokio::time::sleep(retry_after.unwrap_or(backoff)).await;
                    attempt += 1;
                    backoff *= 2;
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    async fn post_once(&self, body: &Value) -> std::result::Result<Value, Attempt> {
        let response = self
            .http
            .post(build_chat_url(&self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "tripweaver")
            .json(body)
            .send()
            .await
            .map_err(|err| {
                Attempt::retry(if err.is_timeout() {
                    PlannerError::Timeout(format!("chat completion timed out: {err}"))
                } else {
                    PlannerError::Http(format!("HTTP request failed: {err}"))
                })
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let response_text = response.text().await.map_err(|err| {
            Attempt::retry(PlannerError::Http(format!("Failed to read response: {err}")))
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Attempt::Retry {
                error: PlannerError::RateLimit {
                    retry_after: retry_after.unwrap_or(1).max(1),
                },
                retry_after: retry_after.map(Duration::from_secs),
            });
        }

        if status.is_server_error() {
            return Err(Attempt::retry(PlannerError::Http(format!(
                "HTTP {status} error: {response_text}"
            ))));
        }

        let response_json: Value = serde_json::from_str(&response_text).map_err(|err| {
            Attempt::Final(PlannerError::Http(format!(
                "HTTP {status}: response was not JSON: {err}"
            )))
        })?;

        if !status.is_success() {
            let api_message = response_json
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(|value| value.as_str())
                .map(|s| s.to_string())
                .unwrap_or(response_text.clone());

            return Err(Attempt::Final(PlannerError::Http(format!(
                "HTTP {} error: {}",
                status, api_message
            ))));
        }

        if let Some(error) = response_json.get("error") {
            let error_message = error
                .get("message")
                .and_then(|value| value.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| error.to_string());
            return Err(Attempt::Final(PlannerError::Http(format!(
                "API error: {}",
                error_message
            ))));
        }

        Ok(response_json)
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let model = request.model.as_deref().unwrap_or(&self.model);
        ChatCompletionRequest::new(
            model,
            vec![
                json!({"role": "system", "content": request.system_prompt}),
                json!({"role": "user", "content": request.user_prompt}),
            ],
        )
        .with_temperature(request.temperature)
        .with_max_tokens(request.max_tokens)
        .into_value()
    }
}

/// Outcome of one failed POST.
enum Attempt {
    Retry {
        error: PlannerError,
        retry_after: Option<Duration>,
    },
    Final(PlannerError),
}

impl Attempt {
    fn retry(error: PlannerError) -> Self {
        Attempt::Retry {
            error,
            retry_after: None,
        }
    }

    fn into_error(self) -> PlannerError {
        match self {
            Attempt::Retry { error, .. } | Attempt::Final(error) => error,
        }
    }
}

fn message_content(response: &Value) -> Result<String> {
    response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(|content| content.to_string())
        .ok_or_else(|| {
            PlannerError::Format("completion response carried no message content".to_string())
        })
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    /// Exactly one POST.
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        let response = self.chat_completion(&self.request_body(request), 1).await?;
        message_content(&response)
    }

    /// HTTP-level retries count against `max_retries`, so one call never
    /// sends more than `max_retries` requests.
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let attempts = request.max_retries.max(1);
        match self.post_with_budget(&self.request_body(request), attempts).await {
            Ok(response) => message_content(&response),
            Err(Attempt::Retry { error, .. }) => {
                warn!(attempts, error = %error, "generation failed");
                Err(PlannerError::Generation(format!(
                    "gave up after {attempts} attempts: {error}"
                )))
            }
            Err(Attempt::Final(error)) => Err(error),
        }
    }
}

fn build_chat_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{}/chat/completions", trimmed)
    }
}

#[derive(Clone, Debug)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Value>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn into_value(self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
        });

        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }

        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        body
    }
}
