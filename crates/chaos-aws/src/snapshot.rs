use async_trait::async_trait;
use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_rds::Client as RdsClient;
use serde_json::json;

use chaos_core::snapshot::AwsInspector;

pub struct Ec2RdsInspector {
    ec2: Ec2Client,
    rds: RdsClient,
}

impl Ec2RdsInspector {
    pub fn new(ec2: Ec2Client, rds: RdsClient) -> Self {
        Self { ec2, rds }
    }
}

#[async_trait]
impl AwsInspector for Ec2RdsInspector {
    async fn describe_ec2(&self, instance_id: &str) -> anyhow::Result<serde_json::Value> {
        let resp = self
            .ec2
            .describe_instances()
            .instance_ids(instance_id)
            .send()
            .await?;

        let instance = resp
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .next()
            .ok_or_else(|| anyhow::anyhow!("instance {instance_id} not found"))?;

        let tags: std::collections::HashMap<String, String> = instance
            .tags()
            .iter()
            .filter_map(|t| Some((t.key()?.to_string(), t.value().unwrap_or_default().to_string())))
            .collect();
        let security_groups: Vec<String> = instance
            .security_groups()
            .iter()
            .filter_map(|g| g.group_id().map(str::to_string))
            .collect();

        Ok(json!({
            "instance_id": instance.instance_id().unwrap_or_default(),
            "instance_type": instance.instance_type().map(|t| t.as_str()).unwrap_or_default(),
            "state": instance.state().and_then(|s| s.name()).map(|n| n.as_str()).unwrap_or_default(),
            "vpc_id": instance.vpc_id().unwrap_or_default(),
            "subnet_id": instance.subnet_id().unwrap_or_default(),
            "security_groups": security_groups,
            "tags": tags,
        }))
    }

    async fn describe_rds(&self, cluster_id: &str) -> anyhow::Result<serde_json::Value> {
        let resp = self
            .rds
            .describe_db_clusters()
            .db_cluster_identifier(cluster_id)
            .send()
            .await?;

        let cluster = resp
            .db_clusters()
            .first()
            .ok_or_else(|| anyhow::anyhow!("db cluster {cluster_id} not found"))?;

        let members: Vec<serde_json::Value> = cluster
            .db_cluster_members()
            .iter()
            .map(|m| {
                json!({
                    "instance_id": m.db_instance_identifier().unwrap_or_default(),
                    "is_writer": m.is_cluster_writer(),
                })
            })
            .collect();

        Ok(json!({
            "cluster_id": cluster.db_cluster_identifier().unwrap_or_default(),
            "status": cluster.status().unwrap_or_default(),
            "engine": cluster.engine().unwrap_or_default(),
            "engine_version": cluster.engine_version().unwrap_or_default(),
            "endpoint": cluster.endpoint().unwrap_or_default(),
            "reader_endpoint": cluster.reader_endpoint().unwrap_or_default(),
            "members": members,
        }))
    }
}
