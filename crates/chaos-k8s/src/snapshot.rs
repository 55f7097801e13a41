use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{Api, ListParams};
use kube::Client;

use chaos_core::snapshot::K8sInspector;
use chaos_core::topology::{ContainerSnapshot, DeploymentSnapshot, PodSnapshot, ServicePort, ServiceSnapshot};

pub struct KubeInspector {
    client: Client,
}

impl KubeInspector {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn list_params(label_selector: &str) -> ListParams {
        let mut lp = ListParams::default();
        if !label_selector.is_empty() {
            lp = lp.labels(label_selector);
        }
        lp
    }
}

#[async_trait]
impl K8sInspector for KubeInspector {
    async fn list_pods(&self, namespace: &str, label_selector: &str) -> anyhow::Result<Vec<PodSnapshot>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&Self::list_params(label_selector)).await?;
        Ok(list
            .items
            .into_iter()
            .map(|p| PodSnapshot {
                name: p.metadata.name.unwrap_or_default(),
                namespace: p.metadata.namespace.unwrap_or_else(|| namespace.to_string()),
                labels: p.metadata.labels.unwrap_or_default().into_iter().collect(),
                phase: p
                    .status
                    .as_ref()
                    .and_then(|s| s.phase.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                containers: p
                    .spec
                    .as_ref()
                    .map(|s| {
                        s.containers
                            .iter()
                            .map(|c| ContainerSnapshot {
                                name: c.name.clone(),
                                image: c.image.clone().unwrap_or_default(),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                node_name: p.spec.as_ref().and_then(|s| s.node_name.clone()),
            })
            .collect())
    }

    async fn list_deployments(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> anyhow::Result<Vec<DeploymentSnapshot>> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&Self::list_params(label_selector)).await?;
        Ok(list
            .items
            .into_iter()
            .map(|d| DeploymentSnapshot {
                name: d.metadata.name.unwrap_or_default(),
                replicas: d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0),
                ready_replicas: d.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0),
                selector: d
                    .spec
                    .as_ref()
                    .and_then(|s| s.selector.match_labels.clone())
                    .unwrap_or_default()
                    .into_iter()
                    .collect(),
                labels: d.metadata.labels.unwrap_or_default().into_iter().collect(),
            })
            .collect())
    }

    async fn list_services(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> anyhow::Result<Vec<ServiceSnapshot>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&Self::list_params(label_selector)).await?;
        Ok(list
            .items
            .into_iter()
            .map(|s| {
                let spec = s.spec.unwrap_or_default();
                ServiceSnapshot {
                    name: s.metadata.name.unwrap_or_default(),
                    service_type: spec.type_.unwrap_or_else(|| "ClusterIP".to_string()),
                    cluster_ip: spec.cluster_ip.clone(),
                    ports: spec
                        .ports
                        .unwrap_or_default()
                        .into_iter()
                        .map(|p| ServicePort {
                            port: p.port,
                            target_port: p
                                .target_port
                                .map(|tp| format!("{tp:?}"))
                                .unwrap_or_default(),
                            protocol: p.protocol.unwrap_or_else(|| "TCP".to_string()),
                        })
                        .collect(),
                    labels: s.metadata.labels.unwrap_or_default().into_iter().collect(),
                }
            })
            .collect())
    }
}
