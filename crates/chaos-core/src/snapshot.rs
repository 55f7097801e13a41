use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::experiment::TargetSelector;
use crate::topology::{
    AwsSnapshot, DeploymentSnapshot, DriftAction, K8sSnapshot, PodSnapshot, ServiceSnapshot,
    Snapshot,
};

/// Read-only view onto a Kubernetes namespace, implemented by `chaos-k8s`'s
/// client wrapper. Kept separate from `Actuator` because snapshotting is a
/// cross-cutting concern shared by every k8s chaos type, not a per-type
/// mutation.
#[async_trait]
pub trait K8sInspector: Send + Sync {
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> anyhow::Result<Vec<PodSnapshot>>;
    async fn list_deployments(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> anyhow::Result<Vec<DeploymentSnapshot>>;
    async fn list_services(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> anyhow::Result<Vec<ServiceSnapshot>>;
}

/// Read-only view onto an AWS resource, implemented by `chaos-aws`.
#[async_trait]
pub trait AwsInspector: Send + Sync {
    async fn describe_ec2(&self, instance_id: &str) -> anyhow::Result<serde_json::Value>;
    async fn describe_rds(&self, cluster_id: &str) -> anyhow::Result<serde_json::Value>;
}

/// Persists a captured snapshot to an external store (`chaos-store`). Kept
/// separate from the in-memory map in `SnapshotStore`, which remains the
/// source of truth for `restore_from_snapshot` within a process lifetime --
/// persistence failure here is logged and never propagated.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn persist(&self, experiment_id: &str, snapshot: &Snapshot) -> anyhow::Result<()>;
}

/// Keeps one snapshot per experiment id. Capture never fails the caller --
/// on actuator/API error it logs a warning and returns a snapshot with empty
/// resource lists, since a missing baseline must not block an experiment
/// that is otherwise authorized to run.
pub struct SnapshotStore {
    snapshots: RwLock<HashMap<String, Snapshot>>,
    k8s: Option<Arc<dyn K8sInspector>>,
    aws: Option<Arc<dyn AwsInspector>>,
    sink: Option<Arc<dyn SnapshotSink>>,
}

impl SnapshotStore {
    pub fn new(k8s: Option<Arc<dyn K8sInspector>>, aws: Option<Arc<dyn AwsInspector>>) -> Self {
        Self {
            snapshots: RwLock::new(HashMap::new()),
            k8s,
            aws,
            sink: None,
        }
    }

    pub fn set_sink(&mut self, sink: Arc<dyn SnapshotSink>) {
        self.sink = Some(sink);
    }

    async fn persist(&self, id: &str, snapshot: &Snapshot) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.persist(id, snapshot).await {
                tracing::warn!(experiment_id = id, error = %e, "failed to persist snapshot");
            }
        }
    }

    pub async fn capture_k8s(&self, id: &str, target: &TargetSelector) -> Snapshot {
        let namespace = target.namespace.clone().unwrap_or_default();
        let selector = target.label_selector();

        let (pods, deployments, services) = match &self.k8s {
            Some(inspector) => {
                let pods = inspector
                    .list_pods(&namespace, &selector)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(experiment_id = id, error = %e, "snapshot: pod listing failed, degrading");
                        Vec::new()
                    });
                let deployments = inspector
                    .list_deployments(&namespace, &selector)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(experiment_id = id, error = %e, "snapshot: deployment listing failed, degrading");
                        Vec::new()
                    });
                let services = inspector
                    .list_services(&namespace, &selector)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(experiment_id = id, error = %e, "snapshot: service listing failed, degrading");
                        Vec::new()
                    });
                (pods, deployments, services)
            }
            None => {
                tracing::warn!(experiment_id = id, "snapshot: no k8s inspector configured, degrading");
                (Vec::new(), Vec::new(), Vec::new())
            }
        };

        let snapshot = Snapshot::Kubernetes(K8sSnapshot {
            namespace,
            labels: target.labels.clone().unwrap_or_default(),
            captured_at: Utc::now(),
            pods,
            deployments,
            services,
        });
        self.snapshots
            .write()
            .await
            .insert(id.to_string(), snapshot.clone());
        self.persist(id, &snapshot).await;
        snapshot
    }

    pub async fn capture_aws(&self, id: &str, resource_type: &str, resource_id: &str) -> Snapshot {
        let state = match &self.aws {
            Some(inspector) => {
                let result = match resource_type {
                    "rds" => inspector.describe_rds(resource_id).await,
                    _ => inspector.describe_ec2(resource_id).await,
                };
                result.unwrap_or_else(|e| {
                    tracing::warn!(experiment_id = id, error = %e, "snapshot: aws describe failed, degrading");
                    serde_json::Value::Null
                })
            }
            None => {
                tracing::warn!(experiment_id = id, "snapshot: no aws inspector configured, degrading");
                serde_json::Value::Null
            }
        };

        let snapshot = Snapshot::Aws(AwsSnapshot {
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            captured_at: Utc::now(),
            state,
        });
        self.snapshots
            .write()
            .await
            .insert(id.to_string(), snapshot.clone());
        self.persist(id, &snapshot).await;
        snapshot
    }

    pub async fn get(&self, id: &str) -> Option<Snapshot> {
        self.snapshots.read().await.get(id).cloned()
    }

    /// Advisory drift check. Returns `None` if no snapshot was ever taken
    /// for `id`. Never recreates or restarts anything -- that remains the
    /// Actuator's job via `RollbackStack`.
    pub async fn restore_from_snapshot(&self, id: &str) -> Option<Vec<DriftAction>> {
        let snapshot = self.snapshots.read().await.get(id).cloned()?;
        match snapshot {
            Snapshot::Kubernetes(snap) => {
                let Some(inspector) = &self.k8s else {
                    return Some(Vec::new());
                };
                let selector = super::experiment::TargetSelector {
                    namespace: Some(snap.namespace.clone()),
                    labels: Some(snap.labels.clone()),
                    resource_id: None,
                }
                .label_selector();
                let current = inspector
                    .list_pods(&snap.namespace, &selector)
                    .await
                    .unwrap_or_default();
                let current_names: std::collections::HashSet<_> =
                    current.iter().map(|p| p.name.clone()).collect();
                let actions = snap
                    .pods
                    .iter()
                    .filter(|p| !current_names.contains(&p.name))
                    .map(|p| DriftAction::PodMissing {
                        name: p.name.clone(),
                        status: "detected".to_string(),
                    })
                    .collect();
                Some(actions)
            }
            Snapshot::Aws(snap) => {
                let Some(inspector) = &self.aws else {
                    return Some(Vec::new());
                };
                let current = match snap.resource_type.as_str() {
                    "rds" => inspector.describe_rds(&snap.resource_id).await,
                    _ => inspector.describe_ec2(&snap.resource_id).await,
                }
                .ok()?;
                let snapshot_state = snap
                    .state
                    .get("state")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let current_state = current
                    .get("state")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                if snapshot_state != current_state {
                    Some(vec![DriftAction::StateDrift {
                        instance_id: snap.resource_id.clone(),
                        snapshot_state,
                        current_state,
                    }])
                } else {
                    Some(Vec::new())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyK8s;

    #[async_trait]
    impl K8sInspector for EmptyK8s {
        async fn list_pods(&self, _ns: &str, _sel: &str) -> anyhow::Result<Vec<PodSnapshot>> {
            Ok(Vec::new())
        }
        async fn list_deployments(
            &self,
            _ns: &str,
            _sel: &str,
        ) -> anyhow::Result<Vec<DeploymentSnapshot>> {
            Ok(Vec::new())
        }
        async fn list_services(&self, _ns: &str, _sel: &str) -> anyhow::Result<Vec<ServiceSnapshot>> {
            Ok(Vec::new())
        }
    }

    struct FailingK8s;

    #[async_trait]
    impl K8sInspector for FailingK8s {
        async fn list_pods(&self, _ns: &str, _sel: &str) -> anyhow::Result<Vec<PodSnapshot>> {
            anyhow::bail!("api unreachable")
        }
        async fn list_deployments(
            &self,
            _ns: &str,
            _sel: &str,
        ) -> anyhow::Result<Vec<DeploymentSnapshot>> {
            anyhow::bail!("api unreachable")
        }
        async fn list_services(&self, _ns: &str, _sel: &str) -> anyhow::Result<Vec<ServiceSnapshot>> {
            anyhow::bail!("api unreachable")
        }
    }

    fn target() -> TargetSelector {
        TargetSelector {
            namespace: Some("default".to_string()),
            labels: None,
            resource_id: None,
        }
    }

    #[tokio::test]
    async fn capture_degrades_gracefully_on_inspector_failure() {
        let store = SnapshotStore::new(Some(Arc::new(FailingK8s)), None);
        let snapshot = store.capture_k8s("exp-1", &target()).await;
        match snapshot {
            Snapshot::Kubernetes(s) => assert!(s.pods.is_empty()),
            _ => panic!("expected kubernetes snapshot"),
        }
    }

    #[tokio::test]
    async fn restore_detects_missing_pod() {
        let store = SnapshotStore::new(Some(Arc::new(EmptyK8s)), None);
        {
            let mut snaps = store.snapshots.write().await;
            snaps.insert(
                "exp-2".to_string(),
                Snapshot::Kubernetes(K8sSnapshot {
                    namespace: "default".to_string(),
                    labels: HashMap::new(),
                    captured_at: Utc::now(),
                    pods: vec![PodSnapshot {
                        name: "nginx-abc".to_string(),
                        namespace: "default".to_string(),
                        labels: HashMap::new(),
                        phase: "Running".to_string(),
                        containers: Vec::new(),
                        node_name: None,
                    }],
                    deployments: Vec::new(),
                    services: Vec::new(),
                }),
            );
        }
        let actions = store.restore_from_snapshot("exp-2").await.unwrap();
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], DriftAction::PodMissing { name, .. } if name == "nginx-abc"));
    }

    #[tokio::test]
    async fn restore_on_unknown_id_returns_none() {
        let store = SnapshotStore::new(None, None);
        assert!(store.restore_from_snapshot("missing").await.is_none());
    }
}
