use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of resource a `TopologyNode` represents, spanning both the k8s and
/// aws actuator families so `/api/topology/combined` can merge graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Pod,
    Service,
    Deployment,
    Node,
    Namespace,
    Ec2,
    Rds,
    Vpc,
    Subnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyNode {
    pub id: String,
    pub name: String,
    pub resource_type: ResourceType,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default = "default_unknown_health")]
    pub health: HealthStatus,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn default_unknown_health() -> HealthStatus {
    HealthStatus::Unknown
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyEdge {
    pub source: String,
    pub target: String,
    #[serde(default = "default_relation")]
    pub relation: String,
}

fn default_relation() -> String {
    "connects_to".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfraTopology {
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
    #[serde(default)]
    pub edges: Vec<TopologyEdge>,
}

impl InfraTopology {
    pub fn merge(mut self, other: InfraTopology) -> Self {
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
        self
    }
}

/// Read-only topology discovery, implemented per-provider by `chaos-k8s` and
/// `chaos-aws`. Kept distinct from `K8sInspector`/`AwsInspector` (used for
/// snapshotting) since topology discovery serves a different read path --
/// the `/api/topology` HTTP surface rather than pre-experiment baselines.
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    async fn get_topology(&self) -> anyhow::Result<InfraTopology>;
}

/// A snapshot of one resource's observable shape, keyed by experiment. The
/// `k8s`/`aws` split mirrors the two actuator families -- a single
/// experiment only ever captures one kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snapshot {
    Kubernetes(K8sSnapshot),
    Aws(AwsSnapshot),
}

impl Snapshot {
    pub fn captured_at(&self) -> DateTime<Utc> {
        match self {
            Snapshot::Kubernetes(s) => s.captured_at,
            Snapshot::Aws(s) => s.captured_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct K8sSnapshot {
    pub namespace: String,
    pub labels: std::collections::HashMap<String, String>,
    pub captured_at: DateTime<Utc>,
    pub pods: Vec<PodSnapshot>,
    pub deployments: Vec<DeploymentSnapshot>,
    pub services: Vec<ServiceSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodSnapshot {
    pub name: String,
    pub namespace: String,
    pub labels: std::collections::HashMap<String, String>,
    pub phase: String,
    pub containers: Vec<ContainerSnapshot>,
    pub node_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub name: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSnapshot {
    pub name: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub selector: std::collections::HashMap<String, String>,
    pub labels: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub name: String,
    pub service_type: String,
    pub cluster_ip: Option<String>,
    pub ports: Vec<ServicePort>,
    pub labels: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePort {
    pub port: i32,
    pub target_port: String,
    pub protocol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsSnapshot {
    pub resource_type: String,
    pub resource_id: String,
    pub captured_at: DateTime<Utc>,
    pub state: serde_json::Value,
}

/// Drift detected between a snapshot and current observed state. Advisory
/// only: detecting drift never recreates or restarts anything, see
/// `SnapshotStore::restore_from_snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DriftAction {
    PodMissing {
        name: String,
        status: String,
    },
    StateDrift {
        instance_id: String,
        snapshot_state: String,
        current_state: String,
    },
}
