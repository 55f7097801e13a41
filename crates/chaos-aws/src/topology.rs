use async_trait::async_trait;
use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_rds::Client as RdsClient;

use chaos_core::topology::{HealthStatus, InfraTopology, ResourceType, TopologyEdge, TopologyNode, TopologyProvider};

pub struct AwsTopologyProvider {
    ec2: Ec2Client,
    rds: RdsClient,
}

impl AwsTopologyProvider {
    pub fn new(ec2: Ec2Client, rds: RdsClient) -> Self {
        Self { ec2, rds }
    }
}

#[async_trait]
impl TopologyProvider for AwsTopologyProvider {
    async fn get_topology(&self) -> anyhow::Result<InfraTopology> {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();

        let reservations = self.ec2.describe_instances().send().await?;
        for reservation in reservations.reservations() {
            for instance in reservation.instances() {
                let Some(instance_id) = instance.instance_id() else { continue };
                let tags: std::collections::HashMap<String, String> = instance
                    .tags()
                    .iter()
                    .filter_map(|t| Some((t.key()?.to_string(), t.value().unwrap_or_default().to_string())))
                    .collect();
                let state = instance
                    .state()
                    .and_then(|s| s.name())
                    .map(|n| n.as_str())
                    .unwrap_or("unknown");
                let health = match state {
                    "running" => HealthStatus::Healthy,
                    "stopped" => HealthStatus::Unhealthy,
                    _ => HealthStatus::Unknown,
                };
                let name = tags.get("Name").cloned().unwrap_or_else(|| instance_id.to_string());

                nodes.push(TopologyNode {
                    id: instance_id.to_string(),
                    name,
                    resource_type: ResourceType::Ec2,
                    namespace: None,
                    labels: tags,
                    health,
                    metadata: serde_json::json!({
                        "state": state,
                        "instance_type": instance.instance_type().map(|t| t.as_str()),
                    }),
                });

                if let Some(vpc_id) = instance.vpc_id() {
                    edges.push(TopologyEdge {
                        source: vpc_id.to_string(),
                        target: instance_id.to_string(),
                        relation: "contains".to_string(),
                    });
                }
            }
        }

        let clusters = self.rds.describe_db_clusters().send().await?;
        for cluster in clusters.db_clusters() {
            let Some(cluster_id) = cluster.db_cluster_identifier() else { continue };
            let health = if cluster.status() == Some("available") {
                HealthStatus::Healthy
            } else {
                HealthStatus::Degraded
            };
            nodes.push(TopologyNode {
                id: cluster_id.to_string(),
                name: cluster_id.to_string(),
                resource_type: ResourceType::Rds,
                namespace: None,
                labels: std::collections::HashMap::new(),
                health,
                metadata: serde_json::json!({
                    "engine": cluster.engine(),
                    "status": cluster.status(),
                }),
            });
        }

        Ok(InfraTopology { nodes, edges })
    }
}
