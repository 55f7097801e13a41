use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{Api, Client};

use chaos_core::topology::{HealthStatus, InfraTopology, ResourceType, TopologyEdge, TopologyNode, TopologyProvider};

pub struct KubeTopologyProvider {
    client: Client,
    namespace: String,
}

impl KubeTopologyProvider {
    pub fn new(client: Client, namespace: String) -> Self {
        Self { client, namespace }
    }
}

#[async_trait]
impl TopologyProvider for KubeTopologyProvider {
    async fn get_topology(&self) -> anyhow::Result<InfraTopology> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let services: Api<Service> = Api::namespaced(self.client.clone(), &self.namespace);

        let deployment_list = deployments.list(&Default::default()).await?.items;
        let pod_list = pods.list(&Default::default()).await?.items;
        let service_list = services.list(&Default::default()).await?.items;

        let mut nodes = Vec::new();
        let mut edges = Vec::new();

        for dep in &deployment_list {
            let name = dep.metadata.name.clone().unwrap_or_default();
            let status = dep.status.clone().unwrap_or_default();
            let health = if status.ready_replicas == status.replicas {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            };
            nodes.push(TopologyNode {
                id: format!("deploy/{name}"),
                name: name.clone(),
                resource_type: ResourceType::Deployment,
                namespace: Some(self.namespace.clone()),
                labels: dep.metadata.labels.clone().unwrap_or_default(),
                health,
                metadata: serde_json::json!({
                    "replicas": status.replicas,
                    "ready_replicas": status.ready_replicas,
                }),
            });
        }

        for pod in &pod_list {
            let name = pod.metadata.name.clone().unwrap_or_default();
            let pod_id = format!("pod/{name}");
            let phase = pod
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            let health = match phase.as_str() {
                "Running" => HealthStatus::Healthy,
                "Failed" => HealthStatus::Unhealthy,
                _ => HealthStatus::Unknown,
            };
            nodes.push(TopologyNode {
                id: pod_id.clone(),
                name: name.clone(),
                resource_type: ResourceType::Pod,
                namespace: Some(self.namespace.clone()),
                labels: pod.metadata.labels.clone().unwrap_or_default(),
                health,
                metadata: serde_json::json!({ "phase": phase }),
            });

            let owned_by_replicaset = pod
                .metadata
                .owner_references
                .iter()
                .flatten()
                .any(|owner| owner.kind == "ReplicaSet");
            if owned_by_replicaset {
                for dep in &deployment_list {
                    let dep_name = dep.metadata.name.clone().unwrap_or_default();
                    if name.starts_with(&dep_name) {
                        edges.push(TopologyEdge {
                            source: format!("deploy/{dep_name}"),
                            target: pod_id.clone(),
                            relation: "manages".to_string(),
                        });
                    }
                }
            }
        }

        for svc in &service_list {
            let name = svc.metadata.name.clone().unwrap_or_default();
            nodes.push(TopologyNode {
                id: format!("svc/{name}"),
                name: name.clone(),
                resource_type: ResourceType::Service,
                namespace: Some(self.namespace.clone()),
                labels: svc.metadata.labels.clone().unwrap_or_default(),
                health: HealthStatus::Healthy,
                metadata: serde_json::Value::Null,
            });
        }

        Ok(InfraTopology { nodes, edges })
    }
}
