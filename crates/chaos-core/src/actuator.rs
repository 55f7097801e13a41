use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ChaosError, ChaosResult};
use crate::experiment::{ChaosType, ExperimentConfig};
use crate::rollback::RollbackHandle;

/// An infrastructure driver that performs a chaos mutation and knows how to
/// compensate it. One actuator instance handles exactly one `ChaosType`;
/// `chaos-k8s` and `chaos-aws` each register a handful with the runner's
/// `ActuatorRegistry`.
///
/// Implementations are responsible for their own emergency-stop and
/// blast-radius checks -- the runner checks emergency stop once up front,
/// but the actuator is the last line of defense against a stale check
/// racing a `trigger()` mid-flight.
#[async_trait]
pub trait Actuator: Send + Sync {
    fn chaos_type(&self) -> ChaosType;

    /// Perform the mutation. Returns the injection result plus a rollback
    /// handle, unless `config.safety.dry_run` is set, in which case no
    /// mutation occurs and the handle is `None`.
    async fn actuate(&self, config: &ExperimentConfig)
        -> ChaosResult<(Value, Option<RollbackHandle>)>;

    /// Reverse a previously returned rollback handle. Must tolerate being
    /// invoked against state that has already drifted (e.g. starting an
    /// instance that is already running).
    async fn compensate(&self, handle: &RollbackHandle) -> ChaosResult<Value>;

    /// Quantitative steady-state snapshot used for the pre/post observation
    /// diff. Kubernetes actuators implement this against pod counts; AWS
    /// actuators that have no natural namespace notion can return `{}`.
    async fn get_steady_state(&self, namespace: &str) -> ChaosResult<Value>;
}

/// Maps `ChaosType` to the actuator that handles it.
#[derive(Default)]
pub struct ActuatorRegistry {
    actuators: HashMap<ChaosType, std::sync::Arc<dyn Actuator>>,
}

impl ActuatorRegistry {
    pub fn new() -> Self {
        Self {
            actuators: HashMap::new(),
        }
    }

    pub fn register(&mut self, actuator: std::sync::Arc<dyn Actuator>) {
        self.actuators.insert(actuator.chaos_type(), actuator);
    }

    pub fn get(&self, chaos_type: ChaosType) -> ChaosResult<&std::sync::Arc<dyn Actuator>> {
        self.actuators
            .get(&chaos_type)
            .ok_or_else(|| ChaosError::UnknownChaosType(chaos_type.to_string()))
    }

    pub async fn compensate(&self, handle: &RollbackHandle) -> ChaosResult<Value> {
        let actuator = self.get(handle.chaos_type)?;
        actuator.compensate(handle).await
    }
}
