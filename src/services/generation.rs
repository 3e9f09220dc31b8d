use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{PlannerError, Result};

pub const DEFAULT_MAX_RETRIES: usize = 3;

/// One chat-style completion request.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Overrides the generator's configured model.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub max_retries: usize,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            model: None,
            temperature: 0.7,
            max_tokens: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Text-generation service consumed by every prompted stage.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A single attempt.
    async fn complete(&self, request: &GenerationRequest) -> Result<String>;

    /// Up to `max_retries` attempts; `Generation` once they are exhausted.
    ///
    /// An error that [`PlannerError::is_retryable`] rejects ends the loop and
    /// is returned as-is.
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let attempts = request.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.complete(request).await {
                Ok(text) => {
                    debug!(attempt, chars = text.len(), "generation succeeded");
                    return Ok(text);
                }
                Err(err) if !err.is_retryable() => {
                    warn!(attempt, error = %err, "generation failed, not retrying");
                    return Err(err);
                }
                Err(err) => {
                    warn!(attempt, attempts, error = %err, "generation attempt failed");
                    last_error = Some(err);
                }
            }
        }

        let reason = last_error
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no attempts made".to_string());
        Err(PlannerError::Generation(format!(
            "gave up after {attempts} attempts: {reason}"
        )))
    }
}

/// Scripted generator for tests and offline demos.
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{GenerationRequest, TextGenerator};
    use crate::error::{PlannerError, Result};

    enum Reply {
        Text(String),
        Fail(String),
    }

    struct Rule {
        needle: String,
        reply: Reply,
    }

    #[derive(Default)]
    struct Script {
        rules: Vec<Rule>,
        queue: VecDeque<Reply>,
        always_fail: bool,
        requests: Vec<GenerationRequest>,
    }

    /// Replies from canned text instead of a model.
    ///
    /// Each call is answered by the first rule whose needle appears in the
    /// system or user prompt; rules are reusable. Calls no rule matches take
    /// the next queued reply, and fail once the queue is empty. Every
    /// request is recorded.
    #[derive(Default)]
    pub struct ScriptedGenerator {
        script: Mutex<Script>,
    }

    impl ScriptedGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        /// A generator whose every attempt fails.
        pub fn failing() -> Self {
            let generator = Self::default();
            generator.with_script(|script| script.always_fail = true);
            generator
        }

        /// Answer any prompt containing `needle` with `response`.
        pub fn respond_when(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
            self.with_script(|script| {
                script.rules.push(Rule {
                    needle: needle.into(),
                    reply: Reply::Text(response.into()),
                })
            });
            self
        }

        /// Fail any prompt containing `needle`.
        pub fn fail_when(self, needle: impl Into<String>, error: impl Into<String>) -> Self {
            self.with_script(|script| {
                script.rules.push(Rule {
                    needle: needle.into(),
                    reply: Reply::Fail(error.into()),
                })
            });
            self
        }

        /// Queue a one-shot reply for the next unmatched call.
        pub fn then_respond(self, response: impl Into<String>) -> Self {
            self.with_script(|script| script.queue.push_back(Reply::Text(response.into())));
            self
        }

        /// Queue a one-shot failure for the next unmatched call.
        pub fn then_fail(self, error: impl Into<String>) -> Self {
            self.with_script(|script| script.queue.push_back(Reply::Fail(error.into())));
            self
        }

        pub fn requests(&self) -> Vec<GenerationRequest> {
            self.with_script(|script| script.requests.clone())
        }

        pub fn call_count(&self) -> usize {
            self.with_script(|script| script.requests.len())
        }

        /// Number of recorded calls whose prompts contain `needle`.
        pub fn calls_mentioning(&self, needle: &str) -> usize {
            self.with_script(|script| {
                script
                    .requests
                    .iter()
                    .filter(|request| mentions(request, needle))
                    .count()
            })
        }

        fn with_script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
            let mut guard = match self.script.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            f(&mut guard)
        }
    }

    fn mentions(request: &GenerationRequest, needle: &str) -> bool {
        request.system_prompt.contains(needle) || request.user_prompt.contains(needle)
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn complete(&self, request: &GenerationRequest) -> Result<String> {
            self.with_script(|script| {
                script.requests.push(request.clone());
                if script.always_fail {
                    return Err(PlannerError::Http("scripted outage".to_string()));
                }

                let matched = script
                    .rules
                    .iter()
                    .find(|rule| mentions(request, &rule.needle))
                    .map(|rule| match &rule.reply {
                        Reply::Text(text) => Ok(text.clone()),
                        Reply::Fail(error) => Err(PlannerError::Http(error.clone())),
                    });
                if let Some(reply) = matched {
                    return reply;
                }

                match script.queue.pop_front() {
                    Some(Reply::Text(text)) => Ok(text),
                    Some(Reply::Fail(error)) => Err(PlannerError::Http(error)),
                    None => Err(PlannerError::Http("no scripted reply".to_string())),
                }
            })
        }
    }
}
