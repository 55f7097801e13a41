use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::actuator::ActuatorRegistry;
use crate::experiment::ChaosType;

/// Opaque blob capturing what an actuator needs to undo its mutation.
/// Tagged by `chaos_type` rather than carried as a closure so that it stays
/// serializable and auditable across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackHandle {
    pub chaos_type: ChaosType,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub undo_state: Value,
}

impl RollbackHandle {
    pub fn new(chaos_type: ChaosType, description: impl Into<String>, undo_state: Value) -> Self {
        Self {
            chaos_type,
            description: description.into(),
            created_at: Utc::now(),
            undo_state,
        }
    }
}

/// Outcome of compensating a single rollback handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub description: String,
    pub status: String,
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// LIFO rollback manager for chaos experiments.
///
/// Collects rollback handles per experiment and executes their compensate
/// actions in reverse order to restore system state after experiments or on
/// emergency stop. A failing compensate does not abort the remaining stack.
pub struct RollbackStack {
    stacks: RwLock<HashMap<String, Vec<RollbackHandle>>>,
    actuators: Arc<ActuatorRegistry>,
}

impl RollbackStack {
    pub fn new(actuators: Arc<ActuatorRegistry>) -> Self {
        Self {
            stacks: RwLock::new(HashMap::new()),
            actuators,
        }
    }

    pub async fn push(&self, experiment_id: &str, handle: RollbackHandle) {
        let mut stacks = self.stacks.write().await;
        let stack = stacks.entry(experiment_id.to_string()).or_default();
        stack.push(handle);
        tracing::info!(
            experiment_id,
            stack_size = stack.len(),
            "rollback entry pushed"
        );
    }

    /// Detach the experiment's stack and drain it in reverse-push (LIFO)
    /// order. Detaching first means any push that races with a concurrent
    /// rollback lands on a fresh stack instead of being lost or re-run.
    pub async fn rollback(&self, experiment_id: &str) -> Vec<ActionResult> {
        let stack = {
            let mut stacks = self.stacks.write().await;
            stacks.remove(experiment_id).unwrap_or_default()
        };

        let mut results = Vec::with_capacity(stack.len());
        for handle in stack.into_iter().rev() {
            let description = handle.description.clone();
            match self.actuators.compensate(&handle).await {
                Ok(result) => {
                    tracing::info!(experiment_id, %description, "rollback succeeded");
                    crate::metrics::ROLLBACK_TOTAL.with_label_values(&["success"]).inc();
                    results.push(ActionResult {
                        description,
                        status: "success".to_string(),
                        result: Some(result),
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::error!(experiment_id, %description, error = %e, "rollback failed");
                    crate::metrics::ROLLBACK_TOTAL.with_label_values(&["failed"]).inc();
                    results.push(ActionResult {
                        description,
                        status: "failed".to_string(),
                        result: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        results
    }

    /// Rollback all experiments with a non-empty stack (emergency stop path).
    pub async fn rollback_all(&self) -> HashMap<String, Vec<ActionResult>> {
        let ids = self.get_active_experiments().await;
        let mut all_results = HashMap::with_capacity(ids.len());
        for id in ids {
            let results = self.rollback(&id).await;
            all_results.insert(id, results);
        }
        all_results
    }

    pub async fn get_stack_size(&self, experiment_id: &str) -> usize {
        self.stacks
            .read()
            .await
            .get(experiment_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub async fn get_active_experiments(&self) -> Vec<String> {
        self.stacks.read().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{Actuator, ActuatorRegistry};
    use crate::error::ChaosResult;
    use crate::experiment::{ChaosType, ExperimentConfig};
    use async_trait::async_trait;
    use serde_json::json;

    struct RecordingActuator {
        order: Arc<std::sync::Mutex<Vec<String>>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Actuator for RecordingActuator {
        fn chaos_type(&self) -> ChaosType {
            ChaosType::PodDelete
        }

        async fn actuate(
            &self,
            _config: &ExperimentConfig,
        ) -> ChaosResult<(Value, Option<RollbackHandle>)> {
            unreachable!("not exercised in this test")
        }

        async fn compensate(&self, handle: &RollbackHandle) -> ChaosResult<Value> {
            let label = handle.undo_state["label"].as_str().unwrap().to_string();
            if self.fail_on.as_deref() == Some(label.as_str()) {
                return Err(crate::error::ChaosError::Other(anyhow::anyhow!(
                    "compensate failed for {label}"
                )));
            }
            self.order.lock().unwrap().push(label.clone());
            Ok(json!({"undone": label}))
        }

        async fn get_steady_state(&self, _namespace: &str) -> ChaosResult<Value> {
            Ok(json!({}))
        }
    }

    fn handle(label: &str) -> RollbackHandle {
        RollbackHandle::new(ChaosType::PodDelete, label, json!({"label": label}))
    }

    #[tokio::test]
    async fn rollback_runs_in_lifo_order_and_continues_past_failure() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = ActuatorRegistry::new();
        registry.register(Arc::new(RecordingActuator {
            order: order.clone(),
            fail_on: Some("B".to_string()),
        }));
        let stack = RollbackStack::new(Arc::new(registry));

        stack.push("exp-1", handle("A")).await;
        stack.push("exp-1", handle("B")).await;
        stack.push("exp-1", handle("C")).await;

        let results = stack.rollback("exp-1").await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].description, "C");
        assert_eq!(results[0].status, "success");
        assert_eq!(results[1].description, "B");
        assert_eq!(results[1].status, "failed");
        assert_eq!(results[2].description, "A");
        assert_eq!(results[2].status, "success");

        // B failed, so only C and A actually ran their compensate.
        assert_eq!(*order.lock().unwrap(), vec!["C".to_string(), "A".to_string()]);
        assert_eq!(stack.get_stack_size("exp-1").await, 0);
    }

    #[tokio::test]
    async fn rollback_on_empty_stack_is_a_noop() {
        let registry = ActuatorRegistry::new();
        let stack = RollbackStack::new(Arc::new(registry));
        let results = stack.rollback("missing").await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn double_rollback_is_idempotent() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = ActuatorRegistry::new();
        registry.register(Arc::new(RecordingActuator {
            order: order.clone(),
            fail_on: None,
        }));
        let stack = RollbackStack::new(Arc::new(registry));

        stack.push("exp-1", handle("A")).await;
        let first = stack.rollback("exp-1").await;
        let second = stack.rollback("exp-1").await;

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
