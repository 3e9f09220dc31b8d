use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::types::{ExecutionTrace, Plan};

/// Keyed storage for finished plans.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn get(&self, plan_id: &str) -> Option<Plan>;

    /// Insert or replace the plan stored under its own id.
    async fn put(&self, plan: Plan);

    /// Ids of every stored plan.
    async fn list(&self) -> Vec<String>;
}

/// Keyed storage for debug traces.
#[async_trait]
pub trait TraceRepository: Send + Sync {
    async fn get(&self, plan_id: &str) -> Option<ExecutionTrace>;

    async fn put(&self, trace: ExecutionTrace);
}

/// Process-lifetime plan store.
#[derive(Debug, Default)]
pub struct InMemoryPlanStore {
    plans: RwLock<HashMap<String, Plan>>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanStore {
    async fn get(&self, plan_id: &str) -> Option<Plan> {
        self.plans.read().await.get(plan_id).cloned()
    }

    async fn put(&self, plan: Plan) {
        debug!(target: "tripweaver::store", plan_id = %plan.plan_id, "storing plan");
        self.plans.write().await.insert(plan.plan_id.clone(), plan);
    }

    async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plans.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Process-lifetime trace store.
#[derive(Debug, Default)]
pub struct InMemoryTraceStore {
    traces: RwLock<HashMap<String, ExecutionTrace>>,
}

impl InMemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TraceRepository for InMemoryTraceStore {
    async fn get(&self, plan_id: &str) -> Option<ExecutionTrace> {
        self.traces.read().await.get(plan_id).cloned()
    }

    async fn put(&self, trace: ExecutionTrace) {
        debug!(target: "tripweaver::store", plan_id = %trace.plan_id, steps = trace.steps.len(), "storing trace");
        self.traces.write().await.insert(trace.plan_id.clone(), trace);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::stages::normalize;
    use crate::types::{Constraints, DetailLevel, TravelRequest};

    fn plan(id: &str) -> Plan {
        let request = TravelRequest::default();
        let parsed = normalize(&Constraints::default());
        Plan::new(id, DetailLevel::Medium, request, parsed)
    }

    #[tokio::test]
    async fn test_plan_store_round_trip() {
        let store = InMemoryPlanStore::new();
        assert!(store.get("missing").await.is_none());

        store.put(plan("b2")).await;
        store.put(plan("a1")).await;

        assert_eq!(store.get("a1").await.unwrap().plan_id, "a1");
        assert_eq!(store.list().await, vec!["a1".to_string(), "b2".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_are_all_kept() {
        let store = Arc::new(InMemoryPlanStore::new());
        let writers: Vec<_> = (0..16)
            .map(|idx| {
                let store = store.clone();
                tokio::spawn(async move { store.put(plan(&format!("plan{idx:02}"))).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap();
        }

        assert_eq!(store.list().await.len(), 16);
    }

    #[tokio::test]
    async fn test_trace_store_replaces_by_id() {
        let store = InMemoryTraceStore::new();
        store.put(ExecutionTrace::new("t1", json!({}), "full")).await;
        let mut updated = ExecutionTrace::new("t1", json!({"budget": 10}), "full");
        updated.error = Some("boom".to_string());
        store.put(updated).await;

        let trace = store.get("t1").await.unwrap();
        assert_eq!(trace.error.as_deref(), Some("boom"));
    }
}
