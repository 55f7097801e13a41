use std::sync::Arc;

use async_trait::async_trait;

use crate::actuator::ActuatorRegistry;
use crate::emergency_stop::EmergencyStop;
use crate::error::{ChaosError, ChaosResult};
use crate::event::{EventSink, ExperimentEvent};
use crate::experiment::{ExperimentConfig, ExperimentPhase, ExperimentRecord, ExperimentStatus};
use crate::guardrails::{require_confirmation, with_timeout};
use crate::health_check::HealthCheckLoop;
use crate::probe::Probe;
use crate::rollback::RollbackStack;
use crate::snapshot::SnapshotStore;

/// Persists experiment records. Implemented by `chaos-store`; failure is
/// logged and non-fatal -- the returned `ExperimentResult` never depends on
/// a successful write.
#[async_trait]
pub trait ExperimentPersistence: Send + Sync {
    async fn save(&self, record: &ExperimentRecord) -> anyhow::Result<()>;
}

/// Fire-and-forget dispatch of a completed record to the AI analysis
/// service. Implemented by `chaos-llm`.
#[async_trait]
pub trait AnalysisDispatcher: Send + Sync {
    async fn analyze(&self, record: &ExperimentRecord);
}

/// Persists a structured AI analysis keyed by experiment id. Implemented by
/// `chaos-store`; `AnalysisDispatcher` impls hold one of these to save what
/// they produce, since `analyze` itself has no return value to persist.
#[async_trait]
pub trait AnalysisSink: Send + Sync {
    async fn save_analysis(&self, experiment_id: &str, analysis: &serde_json::Value) -> anyhow::Result<()>;
}

/// Ties C1-C5 together into the full experiment lifecycle described by the
/// runner algorithm: precondition check, allocate, steady state, snapshot,
/// optional health loop, inject, observe, terminus, with a failure path that
/// always drains the rollback stack before re-raising.
pub struct ExperimentRunner {
    emergency_stop: Arc<EmergencyStop>,
    rollback: Arc<RollbackStack>,
    snapshots: Arc<SnapshotStore>,
    actuators: Arc<ActuatorRegistry>,
    event_sinks: Vec<Arc<dyn EventSink>>,
    persistence: Option<Arc<dyn ExperimentPersistence>>,
    analysis: Option<Arc<dyn AnalysisDispatcher>>,
    probe_factory: Option<Arc<dyn Fn(&ExperimentConfig) -> Vec<Arc<dyn Probe>> + Send + Sync>>,
}

impl ExperimentRunner {
    pub fn new(
        emergency_stop: Arc<EmergencyStop>,
        rollback: Arc<RollbackStack>,
        snapshots: Arc<SnapshotStore>,
        actuators: Arc<ActuatorRegistry>,
    ) -> Self {
        Self {
            emergency_stop,
            rollback,
            snapshots,
            actuators,
            event_sinks: Vec::new(),
            persistence: None,
            analysis: None,
            probe_factory: None,
        }
    }

    pub fn add_event_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.event_sinks.push(sink);
    }

    pub fn set_persistence(&mut self, persistence: Arc<dyn ExperimentPersistence>) {
        self.persistence = Some(persistence);
    }

    /// Explicit rollback entry point for the `/rollback` HTTP route. Safe to
    /// call repeatedly: a second call against an already-drained stack
    /// returns an empty result set.
    pub async fn rollback(&self, experiment_id: &str) -> Vec<crate::rollback::ActionResult> {
        self.rollback.rollback(experiment_id).await
    }

    pub fn set_analysis(&mut self, analysis: Arc<dyn AnalysisDispatcher>) {
        self.analysis = Some(analysis);
    }

    /// Installs a factory turning `ProbeConfig` entries on a config into
    /// live `Probe` objects. `chaos-probes` supplies the concrete factory;
    /// keeping it a plain closure keeps chaos-core free of a dependency on
    /// the probe implementations themselves.
    pub fn set_probe_factory<F>(&mut self, factory: F)
    where
        F: Fn(&ExperimentConfig) -> Vec<Arc<dyn Probe>> + Send + Sync + 'static,
    {
        self.probe_factory = Some(Arc::new(factory));
    }

    async fn emit(&self, event: ExperimentEvent) {
        for sink in &self.event_sinks {
            sink.emit(event.clone()).await;
        }
    }

    fn allocate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    pub async fn run(&self, mut config: ExperimentConfig) -> ChaosResult<ExperimentRecord> {
        if self.emergency_stop.is_set() {
            return Err(ChaosError::EmergencyStopActive);
        }
        config.safety.normalize();

        if let (Some(namespace), Some(pattern)) =
            (config.target.namespace.as_deref(), config.safety.namespace_pattern.as_deref())
        {
            require_confirmation(namespace, pattern, config.safety.require_confirmation)?;
        }

        let id = Self::allocate_id();
        let id = if config.safety.dry_run {
            format!("dry-{id}")
        } else {
            id
        };
        let mut record = ExperimentRecord::new(id.clone(), config.clone());
        crate::metrics::ACTIVE_EXPERIMENTS.inc();

        self.emit(ExperimentEvent::Started {
            experiment_id: id.clone(),
            chaos_type: config.chaos_type,
            at: chrono::Utc::now(),
        })
        .await;

        let result = self.run_inner(&id, &config, &mut record).await;

        match result {
            Ok(()) => {
                record.status = ExperimentStatus::Completed;
                record.phase = ExperimentPhase::Rollback;
                record.completed_at = Some(chrono::Utc::now());
                self.emit(ExperimentEvent::Completed {
                    experiment_id: id.clone(),
                    status: record.status,
                    at: chrono::Utc::now(),
                })
                .await;
            }
            Err(e) => {
                record.status = ExperimentStatus::Failed;
                record.error = Some(e.to_string());
                record.completed_at = Some(chrono::Utc::now());
                self.emit(ExperimentEvent::Failed {
                    experiment_id: id.clone(),
                    error: e.to_string(),
                })
                .await;

                self.emit(ExperimentEvent::RollbackStarted {
                    experiment_id: id.clone(),
                })
                .await;
                let results = self.rollback.rollback(&id).await;
                for r in &results {
                    self.emit(ExperimentEvent::RollbackStepCompleted {
                        experiment_id: id.clone(),
                        description: r.description.clone(),
                        success: r.error.is_none(),
                    })
                    .await;
                }
                record.rollback_result = Some(serde_json::to_value(&results).unwrap_or_default());

                self.post_completion(&record).await;
                return Err(e);
            }
        }

        self.post_completion(&record).await;
        Ok(record)
    }

    async fn run_inner(
        &self,
        id: &str,
        config: &ExperimentConfig,
        record: &mut ExperimentRecord,
    ) -> ChaosResult<()> {
        // Steady state.
        if let Some(namespace) = config.target.namespace.as_deref() {
            let actuator = self.actuators.get(config.chaos_type)?;
            let steady_state = with_timeout(
                "get_steady_state",
                config.safety.timeout_seconds,
                actuator.get_steady_state(namespace),
            )
            .await?;
            record.steady_state = Some(steady_state);
        }

        // Pre-snapshot.
        if config.chaos_type.is_kubernetes() {
            self.snapshots.capture_k8s(id, &config.target).await;
        } else if let Some(resource_id) = config.target.resource_id.as_deref() {
            let resource_type = if matches!(
                config.chaos_type,
                crate::experiment::ChaosType::RdsFailover
            ) {
                "rds"
            } else {
                "ec2"
            };
            self.snapshots.capture_aws(id, resource_type, resource_id).await;
        }

        // Optional health loop, bound to continuous probes only.
        let mut health_loop = if let Some(factory) = &self.probe_factory {
            let probes = factory(config);
            let continuous: Vec<_> = probes
                .into_iter()
                .filter(|p| p.mode() == crate::experiment::ProbeMode::Continuous)
                .collect();
            if continuous.is_empty() {
                None
            } else {
                let mut loop_ = HealthCheckLoop::new(
                    id,
                    continuous,
                    config.safety.health_check_interval,
                    config.safety.health_check_failure_threshold,
                    self.rollback.clone(),
                );
                loop_.start();
                Some(loop_)
            }
        } else {
            None
        };

        record.phase = ExperimentPhase::Inject;
        self.emit(ExperimentEvent::PhaseChanged {
            experiment_id: id.to_string(),
            phase: record.phase,
        })
        .await;

        let actuator = self.actuators.get(config.chaos_type)?;
        let inject_result = tokio::select! {
            result = with_timeout("actuate", config.safety.timeout_seconds, actuator.actuate(config)) => result,
            _ = self.emergency_stop.wait() => {
                tracing::warn!(experiment_id = id, "emergency stop fired mid-injection, aborting");
                Err(ChaosError::EmergencyStopActive)
            }
        };

        let inject_result = match inject_result {
            Ok((value, handle)) => {
                if let Some(handle) = handle {
                    self.rollback.push(id, handle).await;
                }
                self.emit(ExperimentEvent::ActuatorInvoked {
                    experiment_id: id.to_string(),
                    chaos_type: config.chaos_type,
                    success: true,
                })
                .await;
                value
            }
            Err(e) => {
                self.emit(ExperimentEvent::ActuatorInvoked {
                    experiment_id: id.to_string(),
                    chaos_type: config.chaos_type,
                    success: false,
                })
                .await;
                if let Some(loop_) = &mut health_loop {
                    loop_.stop().await;
                }
                return Err(e);
            }
        };
        record.injection_result = Some(inject_result);

        // Observe.
        record.phase = ExperimentPhase::Observe;
        self.emit(ExperimentEvent::PhaseChanged {
            experiment_id: id.to_string(),
            phase: record.phase,
        })
        .await;

        if let Some(namespace) = config.target.namespace.as_deref() {
            let observations = actuator.get_steady_state(namespace).await.ok();
            record.observations = observations;
        }

        if let Some(mut loop_) = health_loop {
            loop_.stop().await;
        }

        Ok(())
    }

    async fn post_completion(&self, record: &ExperimentRecord) {
        crate::metrics::ACTIVE_EXPERIMENTS.dec();
        let duration = match (record.started_at, record.completed_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        };
        crate::metrics::EXPERIMENTS_TOTAL
            .with_label_values(&[record.config.chaos_type.as_str(), status_label(record.status)])
            .inc();
        crate::metrics::EXPERIMENT_DURATION_SECONDS
            .with_label_values(&[record.config.chaos_type.as_str()])
            .observe(duration);

        if let Some(persistence) = &self.persistence {
            if let Err(e) = persistence.save(record).await {
                tracing::warn!(experiment_id = %record.id, error = %e, "failed to persist experiment record");
            }
        }

        if let Some(analysis) = &self.analysis {
            analysis.analyze(record).await;
        }
    }
}

fn status_label(status: ExperimentStatus) -> &'static str {
    match status {
        ExperimentStatus::Pending => "pending",
        ExperimentStatus::Running => "running",
        ExperimentStatus::Completed => "completed",
        ExperimentStatus::Failed => "failed",
        ExperimentStatus::RolledBack => "rolled_back",
        ExperimentStatus::EmergencyStopped => "emergency_stopped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{ChaosType, SafetyConfig, TargetSelector};
    use crate::rollback::RollbackHandle;
    use std::collections::HashMap;

    struct StubActuator {
        chaos_type: ChaosType,
        fail: bool,
    }

    #[async_trait]
    impl crate::actuator::Actuator for StubActuator {
        fn chaos_type(&self) -> ChaosType {
            self.chaos_type
        }

        async fn actuate(
            &self,
            _config: &ExperimentConfig,
        ) -> ChaosResult<(serde_json::Value, Option<RollbackHandle>)> {
            if self.fail {
                return Err(ChaosError::ActuatorFailure {
                    chaos_type: self.chaos_type.to_string(),
                    source: anyhow::anyhow!("boom"),
                });
            }
            Ok((
                serde_json::json!({"deleted": 1}),
                Some(RollbackHandle::new(
                    self.chaos_type,
                    "recreate pod",
                    serde_json::json!({}),
                )),
            ))
        }

        async fn compensate(&self, _handle: &RollbackHandle) -> ChaosResult<serde_json::Value> {
            Ok(serde_json::json!({"restored": true}))
        }

        async fn get_steady_state(&self, _namespace: &str) -> ChaosResult<serde_json::Value> {
            Ok(serde_json::json!({"pods_total": 3, "pods_running": 3}))
        }
    }

    fn config(chaos_type: ChaosType) -> ExperimentConfig {
        ExperimentConfig {
            name: "test-experiment".to_string(),
            chaos_type,
            target: TargetSelector {
                namespace: Some("default".to_string()),
                labels: None,
                resource_id: None,
            },
            parameters: HashMap::new(),
            safety: SafetyConfig::default(),
            probes: Vec::new(),
            description: None,
        }
    }

    fn runner(fail: bool) -> ExperimentRunner {
        let mut registry = ActuatorRegistry::new();
        registry.register(Arc::new(StubActuator {
            chaos_type: ChaosType::PodDelete,
            fail,
        }));
        let registry = Arc::new(registry);
        let rollback = Arc::new(RollbackStack::new(registry.clone()));
        let snapshots = Arc::new(SnapshotStore::new(None, None));
        let emergency_stop = Arc::new(EmergencyStop::new());
        ExperimentRunner::new(emergency_stop, rollback, snapshots, registry)
    }

    #[tokio::test]
    async fn successful_run_completes_and_leaves_rollback_entry_pending() {
        let runner = runner(false);
        let record = runner.run(config(ChaosType::PodDelete)).await.unwrap();
        assert_eq!(record.status, ExperimentStatus::Completed);
        assert_eq!(runner.rollback.get_stack_size(&record.id).await, 1);
    }

    #[tokio::test]
    async fn failed_actuation_triggers_immediate_rollback_and_reraises() {
        let runner = runner(true);
        let err = runner.run(config(ChaosType::PodDelete)).await.unwrap_err();
        assert!(matches!(err, ChaosError::ActuatorFailure { .. }));
    }

    #[tokio::test]
    async fn emergency_stop_blocks_new_runs() {
        let runner = runner(false);
        runner.emergency_stop.trigger();
        let err = runner.run(config(ChaosType::PodDelete)).await.unwrap_err();
        assert!(matches!(err, ChaosError::EmergencyStopActive));
    }

    #[tokio::test]
    async fn dry_run_id_is_prefixed() {
        let mut cfg = config(ChaosType::PodDelete);
        cfg.safety.dry_run = true;
        let runner = runner(false);
        let record = runner.run(cfg).await.unwrap();
        assert!(record.id.starts_with("dry-"));
    }
}
