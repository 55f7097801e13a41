use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_rds::Client as RdsClient;
use serde_json::{json, Value};

use chaos_core::actuator::Actuator;
use chaos_core::error::{ChaosError, ChaosResult};
use chaos_core::experiment::{ChaosType, ExperimentConfig};
use chaos_core::rollback::RollbackHandle;

/// Drives EC2/RDS chaos via the AWS SDK. One instance handles exactly one
/// `ChaosType`; `register_all` wires up the three AWS variants sharing a
/// pair of clients, mirroring `chaos-k8s`'s `K8sActuator::register_all`.
pub struct AwsActuator {
    ec2: Ec2Client,
    rds: RdsClient,
    chaos_type: ChaosType,
}

impl AwsActuator {
    pub fn new(ec2: Ec2Client, rds: RdsClient, chaos_type: ChaosType) -> Self {
        Self { ec2, rds, chaos_type }
    }

    fn instance_ids(config: &ExperimentConfig) -> Vec<String> {
        config
            .parameters
            .get("instance_ids")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default()
    }

    async fn ec2_stop(&self, config: &ExperimentConfig) -> ChaosResult<(Value, Option<RollbackHandle>)> {
        let instance_ids = Self::instance_ids(config);
        if instance_ids.is_empty() {
            return Err(ChaosError::InvalidConfig(
                "ec2_stop requires parameters.instance_ids".into(),
            ));
        }

        if config.safety.dry_run {
            return Ok((
                json!({"action": "ec2_stop", "instance_ids": instance_ids, "dry_run": true}),
                None,
            ));
        }

        self.ec2
            .stop_instances()
            .set_instance_ids(Some(instance_ids.clone()))
            .send()
            .await
            .map_err(|e| ChaosError::ActuatorFailure {
                chaos_type: self.chaos_type.to_string(),
                source: anyhow::anyhow!(e),
            })?;

        tracing::info!(?instance_ids, "stopped EC2 instances");

        let handle = RollbackHandle::new(
            self.chaos_type,
            format!("start {} EC2 instance(s)", instance_ids.len()),
            json!({"instance_ids": instance_ids}),
        );

        Ok((json!({"action": "ec2_stop", "instance_ids": instance_ids}), Some(handle)))
    }

    async fn ec2_start_rollback(&self, handle: &RollbackHandle) -> ChaosResult<Value> {
        let instance_ids: Vec<String> = handle.undo_state["instance_ids"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();

        // Idempotent: starting an already-running instance succeeds as a no-op.
        self.ec2
            .start_instances()
            .set_instance_ids(Some(instance_ids.clone()))
            .send()
            .await
            .map_err(|e| ChaosError::ActuatorFailure {
                chaos_type: self.chaos_type.to_string(),
                source: anyhow::anyhow!(e),
            })?;

        Ok(json!({"started": instance_ids}))
    }

    async fn rds_failover(&self, config: &ExperimentConfig) -> ChaosResult<(Value, Option<RollbackHandle>)> {
        let cluster_id = config.parameter_str("db_cluster_id", "");
        if cluster_id.is_empty() {
            return Err(ChaosError::InvalidConfig(
                "rds_failover requires parameters.db_cluster_id".into(),
            ));
        }

        if config.safety.dry_run {
            return Ok((
                json!({"action": "rds_failover", "db_cluster_id": cluster_id, "dry_run": true}),
                None,
            ));
        }

        self.rds
            .failover_db_cluster()
            .db_cluster_identifier(&cluster_id)
            .send()
            .await
            .map_err(|e| ChaosError::ActuatorFailure {
                chaos_type: self.chaos_type.to_string(),
                source: anyhow::anyhow!(e),
            })?;

        tracing::info!(cluster_id = %cluster_id, "triggered RDS failover");

        // RDS failover is self-healing; the handle exists so the stack has
        // something to report, not because there is work to undo.
        let handle = RollbackHandle::new(
            self.chaos_type,
            format!("rds cluster {cluster_id} self-heals after failover"),
            json!({"db_cluster_id": cluster_id}),
        );

        Ok((json!({"action": "rds_failover", "db_cluster_id": cluster_id}), Some(handle)))
    }

    async fn rds_failover_rollback(&self, handle: &RollbackHandle) -> ChaosResult<Value> {
        let cluster_id = handle.undo_state["db_cluster_id"].as_str().unwrap_or_default();
        Ok(json!({"note": "rds failover is self-healing", "db_cluster_id": cluster_id}))
    }

    async fn route_blackhole(&self, config: &ExperimentConfig) -> ChaosResult<(Value, Option<RollbackHandle>)> {
        let route_table_id = config.parameter_str("route_table_id", "");
        let destination_cidr = config.parameter_str("destination_cidr", "");
        if route_table_id.is_empty() || destination_cidr.is_empty() {
            return Err(ChaosError::InvalidConfig(
                "route_blackhole requires parameters.route_table_id and destination_cidr".into(),
            ));
        }

        if config.safety.dry_run {
            return Ok((
                json!({
                    "action": "route_blackhole",
                    "route_table_id": route_table_id,
                    "destination_cidr": destination_cidr,
                    "dry_run": true,
                }),
                None,
            ));
        }

        let tables = self
            .ec2
            .describe_route_tables()
            .route_table_ids(&route_table_id)
            .send()
            .await
            .map_err(|e| ChaosError::ActuatorFailure {
                chaos_type: self.chaos_type.to_string(),
                source: anyhow::anyhow!(e),
            })?;

        let original_gateway_id = tables
            .route_tables()
            .first()
            .and_then(|t| {
                t.routes()
                    .iter()
                    .find(|r| r.destination_cidr_block() == Some(destination_cidr.as_str()))
            })
            .and_then(|r| r.gateway_id())
            .map(str::to_string);

        self.ec2
            .delete_route()
            .route_table_id(&route_table_id)
            .destination_cidr_block(&destination_cidr)
            .send()
            .await
            .ok();

        // Points at a gateway id that cannot resolve, which AWS surfaces as
        // route state "blackhole".
        self.ec2
            .create_route()
            .route_table_id(&route_table_id)
            .destination_cidr_block(&destination_cidr)
            .gateway_id("igw-00000000000000000")
            .send()
            .await
            .map_err(|e| ChaosError::ActuatorFailure {
                chaos_type: self.chaos_type.to_string(),
                source: anyhow::anyhow!(e),
            })?;

        tracing::info!(route_table_id = %route_table_id, destination_cidr = %destination_cidr, "created blackhole route");

        let handle = RollbackHandle::new(
            self.chaos_type,
            format!("restore route {destination_cidr} in {route_table_id}"),
            json!({
                "route_table_id": route_table_id,
                "destination_cidr": destination_cidr,
                "original_gateway_id": original_gateway_id,
            }),
        );

        Ok((
            json!({"action": "route_blackhole", "route_table_id": route_table_id, "destination_cidr": destination_cidr}),
            Some(handle),
        ))
    }

    async fn route_blackhole_rollback(&self, handle: &RollbackHandle) -> ChaosResult<Value> {
        let route_table_id = handle.undo_state["route_table_id"].as_str().unwrap_or_default();
        let destination_cidr = handle.undo_state["destination_cidr"].as_str().unwrap_or_default();
        let original_gateway_id = handle.undo_state["original_gateway_id"].as_str();

        self.ec2
            .delete_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .send()
            .await
            .map_err(|e| ChaosError::ActuatorFailure {
                chaos_type: self.chaos_type.to_string(),
                source: anyhow::anyhow!(e),
            })?;

        if let Some(gateway_id) = original_gateway_id {
            self.ec2
                .create_route()
                .route_table_id(route_table_id)
                .destination_cidr_block(destination_cidr)
                .gateway_id(gateway_id)
                .send()
                .await
                .map_err(|e| ChaosError::ActuatorFailure {
                    chaos_type: self.chaos_type.to_string(),
                    source: anyhow::anyhow!(e),
                })?;
        }

        Ok(json!({"restored": destination_cidr}))
    }
}

#[async_trait::async_trait]
impl Actuator for AwsActuator {
    fn chaos_type(&self) -> ChaosType {
        self.chaos_type
    }

    async fn actuate(&self, config: &ExperimentConfig) -> ChaosResult<(Value, Option<RollbackHandle>)> {
        match self.chaos_type {
            ChaosType::Ec2Stop => self.ec2_stop(config).await,
            ChaosType::RdsFailover => self.rds_failover(config).await,
            ChaosType::RouteBlackhole => self.route_blackhole(config).await,
            other => Err(ChaosError::UnknownChaosType(other.to_string())),
        }
    }

    async fn compensate(&self, handle: &RollbackHandle) -> ChaosResult<Value> {
        match self.chaos_type {
            ChaosType::Ec2Stop => self.ec2_start_rollback(handle).await,
            ChaosType::RdsFailover => self.rds_failover_rollback(handle).await,
            ChaosType::RouteBlackhole => self.route_blackhole_rollback(handle).await,
            other => Err(ChaosError::UnknownChaosType(other.to_string())),
        }
    }

    /// AWS chaos types have no natural namespace notion to sample a
    /// pods-healthy ratio from; the runner's steady-state phase is a no-op
    /// for them in practice since `ExperimentConfig.target.namespace` is
    /// never set for AWS targets, but the trait still requires an impl.
    async fn get_steady_state(&self, _namespace: &str) -> ChaosResult<Value> {
        Ok(json!({}))
    }
}

/// Registers an `AwsActuator` per AWS `ChaosType` sharing one client pair.
pub fn register_all(registry: &mut chaos_core::actuator::ActuatorRegistry, ec2: Ec2Client, rds: RdsClient) {
    use std::sync::Arc;
    for chaos_type in [ChaosType::Ec2Stop, ChaosType::RdsFailover, ChaosType::RouteBlackhole] {
        registry.register(Arc::new(AwsActuator::new(ec2.clone(), rds.clone(), chaos_type)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_core::experiment::{SafetyConfig, TargetSelector};
    use std::collections::HashMap;

    fn test_clients() -> (Ec2Client, RdsClient) {
        let conf = aws_sdk_ec2::Config::builder()
            .behavior_version(aws_sdk_ec2::config::BehaviorVersion::latest())
            .region(aws_sdk_ec2::config::Region::new("us-east-1"))
            .credentials_provider(aws_sdk_ec2::config::Credentials::new(
                "test", "test", None, None, "test",
            ))
            .build();
        let ec2 = Ec2Client::from_conf(conf);
        let conf = aws_sdk_rds::Config::builder()
            .behavior_version(aws_sdk_rds::config::BehaviorVersion::latest())
            .region(aws_sdk_rds::config::Region::new("us-east-1"))
            .credentials_provider(aws_sdk_rds::config::Credentials::new(
                "test", "test", None, None, "test",
            ))
            .build();
        let rds = RdsClient::from_conf(conf);
        (ec2, rds)
    }

    fn config(chaos_type: ChaosType, params: HashMap<String, Value>) -> ExperimentConfig {
        ExperimentConfig {
            name: "aws-test".to_string(),
            chaos_type,
            target: TargetSelector::default(),
            parameters: params,
            safety: SafetyConfig { dry_run: true, ..SafetyConfig::default() },
            probes: Vec::new(),
            description: None,
        }
    }

    #[tokio::test]
    async fn ec2_stop_dry_run_performs_no_mutation_and_pushes_no_handle() {
        let (ec2, rds) = test_clients();
        let actuator = AwsActuator::new(ec2, rds, ChaosType::Ec2Stop);
        let mut params = HashMap::new();
        params.insert("instance_ids".to_string(), json!(["i-0123456789abcdef0"]));
        let (result, handle) = actuator.actuate(&config(ChaosType::Ec2Stop, params)).await.unwrap();
        assert_eq!(result["dry_run"], json!(true));
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn ec2_stop_without_instance_ids_is_invalid_config() {
        let (ec2, rds) = test_clients();
        let actuator = AwsActuator::new(ec2, rds, ChaosType::Ec2Stop);
        let err = actuator.actuate(&config(ChaosType::Ec2Stop, HashMap::new())).await.unwrap_err();
        assert!(matches!(err, ChaosError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn route_blackhole_dry_run_requires_table_and_cidr() {
        let (ec2, rds) = test_clients();
        let actuator = AwsActuator::new(ec2, rds, ChaosType::RouteBlackhole);
        let mut params = HashMap::new();
        params.insert("route_table_id".to_string(), json!("rtb-0123456789abcdef0"));
        params.insert("destination_cidr".to_string(), json!("10.0.0.0/16"));
        let (result, handle) = actuator
            .actuate(&config(ChaosType::RouteBlackhole, params))
            .await
            .unwrap();
        assert_eq!(result["dry_run"], json!(true));
        assert!(handle.is_none());
    }
}
