use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use serde_json::{json, Value};

use chaos_core::experiment::ProbeMode;
use chaos_core::probe::{Probe, ProbeResult};

/// Checks a Kubernetes resource's condition: deployment readiness, or a
/// pod's phase, optionally against an explicit expected value.
pub struct K8sProbe {
    name: String,
    mode: ProbeMode,
    client: Client,
    namespace: String,
    resource_kind: String,
    resource_name: String,
    condition: String,
    expected_value: Option<Value>,
}

impl K8sProbe {
    pub fn new(
        name: String,
        mode: ProbeMode,
        client: Client,
        namespace: String,
        resource_kind: String,
        resource_name: String,
        condition: String,
        expected_value: Option<Value>,
    ) -> Self {
        Self {
            name,
            mode,
            client,
            namespace,
            resource_kind,
            resource_name,
            condition,
            expected_value,
        }
    }

    async fn check_deployment(&self) -> anyhow::Result<(bool, Value)> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &self.namespace);
        let deployment = api.get(&self.resource_name).await?;
        let status = deployment.status.unwrap_or_default();
        let desired = deployment
            .spec
            .and_then(|s| s.replicas)
            .unwrap_or(1);
        let ready = status.ready_replicas.unwrap_or(0);

        let passed = match self.condition.as_str() {
            "ready" => ready >= desired,
            _ => ready >= desired,
        };

        Ok((
            passed,
            json!({
                "kind": "deployment",
                "name": self.resource_name,
                "desired_replicas": desired,
                "ready_replicas": ready,
            }),
        ))
    }

    async fn check_pod(&self) -> anyhow::Result<(bool, Value)> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), &self.namespace);
        let pod = api.get(&self.resource_name).await?;
        let phase = pod
            .status
            .and_then(|s| s.phase)
            .unwrap_or_else(|| "Unknown".to_string());

        let passed = match &self.expected_value {
            Some(Value::String(expected)) => &phase == expected,
            _ => phase == "Running",
        };

        Ok((
            passed,
            json!({
                "kind": "pod",
                "name": self.resource_name,
                "phase": phase,
            }),
        ))
    }
}

#[async_trait]
impl Probe for K8sProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe_type(&self) -> &'static str {
        "k8s"
    }

    fn mode(&self) -> ProbeMode {
        self.mode
    }

    async fn execute(&self) -> anyhow::Result<ProbeResult> {
        let (passed, mut detail) = match self.resource_kind.as_str() {
            "pod" => self.check_pod().await?,
            _ => self.check_deployment().await?,
        };
        detail["condition"] = json!(self.condition);

        Ok(if passed {
            ProbeResult::pass(&self.name, "k8s", self.mode, detail)
        } else {
            ProbeResult::fail(&self.name, "k8s", self.mode, detail)
        })
    }
}
