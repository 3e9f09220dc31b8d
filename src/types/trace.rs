use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a traced step produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Output(Value),
    Error(String),
}

/// One timed pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub step: String,
    /// Wall-clock seconds.
    pub duration: f64,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Ordered record of one orchestration run, kept when debug mode is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub plan_id: String,
    pub user_input: Value,
    pub detail_level: String,
    pub steps: Vec<TraceStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionTrace {
    pub fn new(plan_id: impl Into<String>, user_input: Value, detail_level: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            user_input,
            detail_level: detail_level.into(),
            steps: Vec::new(),
            error: None,
        }
    }

    /// Start timing a step; finish it with [`StepTimer::output`] or [`StepTimer::error`].
    pub fn start(name: &str) -> StepTimer {
        StepTimer {
            step: name.to_string(),
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, step: TraceStep) {
        self.steps.push(step);
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.step.as_str()).collect()
    }

    /// Human-readable summary of the run.
    pub fn replay(&self) -> String {
        let mut lines = vec![
            format!("=== Plan {} ({}) ===", self.plan_id, self.detail_level),
        ];
        for (idx, step) in self.steps.iter().enumerate() {
            let status = match &step.outcome {
                StepOutcome::Output(_) => "ok".to_string(),
                StepOutcome::Error(err) => format!("error: {err}"),
            };
            lines.push(format!(
                "{}. {} [{:.2}s] {}",
                idx + 1,
                step.step,
                step.duration,
                status
            ));
        }
        if let Some(error) = &self.error {
            lines.push(format!("Run failed: {error}"));
        }
        lines.join("\n")
    }
}

/// Running clock for a step in progress.
#[derive(Debug)]
pub struct StepTimer {
    step: String,
    started: Instant,
}

impl StepTimer {
    pub fn output(self, output: Value) -> TraceStep {
        self.finish(StepOutcome::Output(output))
    }

    pub fn error(self, error: impl ToString) -> TraceStep {
        self.finish(StepOutcome::Error(error.to_string()))
    }

    fn finish(self, outcome: StepOutcome) -> TraceStep {
        TraceStep {
            step: self.step,
            duration: self.started.elapsed().as_secs_f64(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_steps_serialize_with_flat_outcome() {
        let mut trace = ExecutionTrace::new("ab12cd34", json!({"budget": 900}), "medium");
        trace.record(ExecutionTrace::start("constraint_parsing").output(json!({"duration": 3})));
        trace.record(ExecutionTrace::start("itinerary_planning").error("timed out"));

        let value = serde_json::to_value(&trace).unwrap();
        assert_eq!(value["steps"][0]["step"], "constraint_parsing");
        assert_eq!(value["steps"][0]["output"]["duration"], 3);
        assert_eq!(value["steps"][1]["error"], "timed out");
        assert!(value["steps"][1]["duration"].as_f64().unwrap() >= 0.0);
        assert_eq!(
            trace.step_names(),
            vec!["constraint_parsing", "itinerary_planning"]
        );
        assert!(trace.replay().contains("error: timed out"));
    }
}
