use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams, DeleteParams, ListParams};
use kube::Client;
use serde_json::{json, Value};

use chaos_core::actuator::Actuator;
use chaos_core::error::{ChaosError, ChaosResult};
use chaos_core::experiment::{ChaosType, ExperimentConfig};
use chaos_core::guardrails::validate_blast_radius;
use chaos_core::rollback::RollbackHandle;

/// Drives every Kubernetes chaos type in-place: pod deletion is a direct API
/// call; network/CPU/memory chaos exec a command into the target pod's
/// primary container rather than scheduling a dedicated stress sidecar pod,
/// since the target container's own network namespace and cgroup are what
/// the experiment cares about disturbing.
pub struct K8sActuator {
    client: Client,
    chaos_type: ChaosType,
}

impl K8sActuator {
    pub fn new(client: Client, chaos_type: ChaosType) -> Self {
        Self { client, chaos_type }
    }

    async fn exec_in_pods(
        &self,
        namespace: &str,
        pod_names: &[String],
        command: Vec<&str>,
    ) -> ChaosResult<()> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        for name in pod_names {
            let mut attached = pods
                .exec(
                    name,
                    command.clone(),
                    &AttachParams::default().stdout(true).stderr(true),
                )
                .await
                .map_err(|e| ChaosError::ActuatorFailure {
                    chaos_type: self.chaos_type.to_string(),
                    source: anyhow::anyhow!(e),
                })?;
            // Drain to completion; stress-ng/tc/pkill write nothing we need.
            if let Some(mut stdout) = attached.stdout() {
                use tokio::io::AsyncReadExt;
                let mut buf = Vec::new();
                let _ = stdout.read_to_end(&mut buf).await;
            }
            attached.join().await.map_err(|e| ChaosError::ActuatorFailure {
                chaos_type: self.chaos_type.to_string(),
                source: anyhow::anyhow!(e),
            })?;
        }
        Ok(())
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> ChaosResult<Vec<Pod>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut lp = ListParams::default();
        if !label_selector.is_empty() {
            lp = lp.labels(label_selector);
        }
        let list = pods.list(&lp).await.map_err(|e| ChaosError::ActuatorFailure {
            chaos_type: self.chaos_type.to_string(),
            source: anyhow::anyhow!(e),
        })?;
        Ok(list.items)
    }

    async fn running_pod_names(&self, namespace: &str, label_selector: &str) -> ChaosResult<Vec<String>> {
        let pods = self.list_pods(namespace, label_selector).await?;
        Ok(pods
            .into_iter()
            .filter(|p| {
                p.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running")
            })
            .filter_map(|p| p.metadata.name)
            .collect())
    }

    async fn pod_delete(&self, config: &ExperimentConfig) -> ChaosResult<(Value, Option<RollbackHandle>)> {
        let namespace = config
            .target
            .namespace
            .clone()
            .ok_or_else(|| ChaosError::InvalidConfig("pod_delete requires target.namespace".into()))?;
        let selector = config.target.label_selector();

        let matching = self.list_pods(&namespace, &selector).await?;
        let total = self.list_pods(&namespace, "").await?.len();

        if !validate_blast_radius(matching.len(), total, config.safety.max_blast_radius) {
            return Err(ChaosError::BlastRadiusExceeded {
                affected: matching.len(),
                total,
                max_ratio: config.safety.max_blast_radius,
            });
        }

        let pod_names: Vec<String> = matching.iter().filter_map(|p| p.metadata.name.clone()).collect();

        if config.safety.dry_run {
            return Ok((json!({"action": "pod_delete", "pods": pod_names, "dry_run": true}), None));
        }

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &namespace);
        let mut deleted = Vec::new();
        for pod in &matching {
            let Some(name) = pod.metadata.name.clone() else { continue };
            match pods.delete(&name, &DeleteParams::default()).await {
                Ok(_) => deleted.push(name),
                Err(e) => tracing::error!(pod = %name, error = %e, "failed to delete pod"),
            }
        }

        tracing::info!(namespace = %namespace, count = deleted.len(), "pods deleted");

        let handle = RollbackHandle::new(
            self.chaos_type,
            format!("verify {} deleted pods recover in {namespace}", deleted.len()),
            json!({"namespace": namespace, "deleted_pods": deleted}),
        );

        Ok((json!({"action": "pod_delete", "pods": pod_names}), Some(handle)))
    }

    async fn tc_chaos(
        &self,
        config: &ExperimentConfig,
        action: &'static str,
        inject_args: Vec<String>,
    ) -> ChaosResult<(Value, Option<RollbackHandle>)> {
        let namespace = config
            .target
            .namespace
            .clone()
            .ok_or_else(|| ChaosError::InvalidConfig(format!("{action} requires target.namespace")))?;
        let selector = config.target.label_selector();
        let pod_names = self.running_pod_names(&namespace, &selector).await?;

        if config.safety.dry_run {
            return Ok((json!({"action": action, "pods": pod_names, "dry_run": true}), None));
        }

        let args: Vec<&str> = inject_args.iter().map(String::as_str).collect();
        self.exec_in_pods(&namespace, &pod_names, args).await?;

        let handle = RollbackHandle::new(
            self.chaos_type,
            format!("remove tc qdisc from {} pods in {namespace}", pod_names.len()),
            json!({"namespace": namespace, "pods": pod_names}),
        );

        Ok((json!({"action": action, "pods": pod_names}), Some(handle)))
    }

    async fn tc_rollback(&self, handle: &RollbackHandle) -> ChaosResult<Value> {
        let namespace = handle.undo_state["namespace"].as_str().unwrap_or_default();
        let pod_names: Vec<String> = handle.undo_state["pods"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        self.exec_in_pods(namespace, &pod_names, vec!["tc", "qdisc", "del", "dev", "eth0", "root"])
            .await?;
        Ok(json!({"removed_qdisc": pod_names.len()}))
    }

    async fn stress_chaos(
        &self,
        config: &ExperimentConfig,
        action: &'static str,
        command: Vec<String>,
    ) -> ChaosResult<(Value, Option<RollbackHandle>)> {
        let namespace = config
            .target
            .namespace
            .clone()
            .ok_or_else(|| ChaosError::InvalidConfig(format!("{action} requires target.namespace")))?;
        let selector = config.target.label_selector();
        let pod_names = self.running_pod_names(&namespace, &selector).await?;

        if config.safety.dry_run {
            return Ok((json!({"action": action, "pods": pod_names, "dry_run": true}), None));
        }

        let args: Vec<&str> = command.iter().map(String::as_str).collect();
        self.exec_in_pods(&namespace, &pod_names, args).await?;

        let handle = RollbackHandle::new(
            self.chaos_type,
            format!("kill stress-ng on {} pods in {namespace}", pod_names.len()),
            json!({"namespace": namespace, "pods": pod_names}),
        );

        Ok((json!({"action": action, "pods": pod_names}), Some(handle)))
    }

    async fn stress_rollback(&self, handle: &RollbackHandle) -> ChaosResult<Value> {
        let namespace = handle.undo_state["namespace"].as_str().unwrap_or_default();
        let pod_names: Vec<String> = handle.undo_state["pods"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        self.exec_in_pods(namespace, &pod_names, vec!["pkill", "-f", "stress-ng"]).await?;
        Ok(json!({"killed_stress": pod_names.len()}))
    }
}

#[async_trait]
impl Actuator for K8sActuator {
    fn chaos_type(&self) -> ChaosType {
        self.chaos_type
    }

    async fn actuate(&self, config: &ExperimentConfig) -> ChaosResult<(Value, Option<RollbackHandle>)> {
        match self.chaos_type {
            ChaosType::PodDelete => self.pod_delete(config).await,
            ChaosType::NetworkLatency => {
                let latency_ms = config.parameter_u64("latency_ms", 100);
                self.tc_chaos(
                    config,
                    "network_latency",
                    vec![
                        "tc".into(), "qdisc".into(), "add".into(), "dev".into(), "eth0".into(),
                        "root".into(), "netem".into(), "delay".into(), format!("{latency_ms}ms"),
                    ],
                )
                .await
            }
            ChaosType::NetworkLoss => {
                let loss_percent = config.parameter_u64("loss_percent", 10);
                self.tc_chaos(
                    config,
                    "network_loss",
                    vec![
                        "tc".into(), "qdisc".into(), "add".into(), "dev".into(), "eth0".into(),
                        "root".into(), "netem".into(), "loss".into(), format!("{loss_percent}%"),
                    ],
                )
                .await
            }
            ChaosType::CpuStress => {
                let cores = config.parameter_u64("cores", 1);
                let duration = config.parameter_u64("duration_seconds", 30);
                self.stress_chaos(
                    config,
                    "cpu_stress",
                    vec![
                        "stress-ng".into(), "--cpu".into(), cores.to_string(),
                        "--timeout".into(), format!("{duration}s"), "--quiet".into(),
                    ],
                )
                .await
            }
            ChaosType::MemoryStress => {
                let workers = config.parameter_u64("workers", 1);
                let memory_bytes = config.parameter_str("memory_bytes", "256M");
                let duration = config.parameter_u64("duration_seconds", 30);
                self.stress_chaos(
                    config,
                    "memory_stress",
                    vec![
                        "stress-ng".into(), "--vm".into(), workers.to_string(),
                        "--vm-bytes".into(), memory_bytes, "--timeout".into(),
                        format!("{duration}s"), "--quiet".into(),
                    ],
                )
                .await
            }
            other => Err(ChaosError::UnknownChaosType(other.to_string())),
        }
    }

    async fn compensate(&self, handle: &RollbackHandle) -> ChaosResult<Value> {
        match self.chaos_type {
            ChaosType::PodDelete => {
                let namespace = handle.undo_state["namespace"].as_str().unwrap_or_default();
                let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                let _ = deployments.list(&ListParams::default()).await;
                Ok(json!({"verified": true}))
            }
            ChaosType::NetworkLatency | ChaosType::NetworkLoss => self.tc_rollback(handle).await,
            ChaosType::CpuStress | ChaosType::MemoryStress => self.stress_rollback(handle).await,
            other => Err(ChaosError::UnknownChaosType(other.to_string())),
        }
    }

    async fn get_steady_state(&self, namespace: &str) -> ChaosResult<Value> {
        let pods = self.list_pods(namespace, "").await?;
        let total = pods.len();
        let running = pods
            .iter()
            .filter(|p| p.status.as_ref().and_then(|s| s.phase.as_deref()) == Some("Running"))
            .count();
        let ratio = if total > 0 { running as f64 / total as f64 } else { 1.0 };
        Ok(json!({
            "namespace": namespace,
            "pods_total": total,
            "pods_running": running,
            "pods_healthy_ratio": ratio,
        }))
    }
}

/// Registers a `K8sActuator` per Kubernetes `ChaosType` sharing one client.
pub fn register_all(registry: &mut chaos_core::actuator::ActuatorRegistry, client: Client) {
    use std::sync::Arc;
    for chaos_type in [
        ChaosType::PodDelete,
        ChaosType::NetworkLatency,
        ChaosType::NetworkLoss,
        ChaosType::CpuStress,
        ChaosType::MemoryStress,
    ] {
        registry.register(Arc::new(K8sActuator::new(client.clone(), chaos_type)));
    }
}
