pub mod cmd;
pub mod http;
pub mod k8s;
pub mod prometheus;

use std::sync::Arc;

use chaos_core::experiment::ProbeConfig;
use chaos_core::probe::Probe;

use cmd::CmdProbe;
use http::HttpProbe;
use k8s::K8sProbe;
use prometheus::PromProbe;

/// Builds the concrete probe for a config entry. The k8s client is optional
/// because experiments that never reference a `ProbeConfig::K8s` probe
/// shouldn't need one.
pub fn build_probe(config: &ProbeConfig, k8s_client: Option<kube::Client>) -> anyhow::Result<Arc<dyn Probe>> {
    match config {
        ProbeConfig::Http {
            name,
            mode,
            url,
            expected_status,
            timeout_seconds,
            body_pattern,
            method,
            headers,
        } => {
            let probe = HttpProbe::new(
                name.clone(),
                *mode,
                url.clone(),
                *expected_status,
                *timeout_seconds,
                body_pattern.clone(),
                method.clone(),
                headers.clone(),
            )?;
            Ok(Arc::new(probe))
        }
        ProbeConfig::Cmd {
            name,
            mode,
            command,
            expected_exit_code,
            output_contains,
            timeout_seconds,
        } => Ok(Arc::new(CmdProbe::new(
            name.clone(),
            *mode,
            command.clone(),
            *expected_exit_code,
            output_contains.clone(),
            *timeout_seconds,
        ))),
        ProbeConfig::K8s {
            name,
            mode,
            namespace,
            resource_kind,
            resource_name,
            condition,
            expected_value,
        } => {
            let client = k8s_client
                .ok_or_else(|| anyhow::anyhow!("k8s probe '{name}' requires a kubernetes client"))?;
            Ok(Arc::new(K8sProbe::new(
                name.clone(),
                *mode,
                client,
                namespace.clone(),
                resource_kind.clone(),
                resource_name.clone(),
                condition.clone(),
                expected_value.clone(),
            )))
        }
        ProbeConfig::Prometheus {
            name,
            mode,
            endpoint,
            query,
            comparator,
            threshold,
            timeout_seconds,
        } => Ok(Arc::new(PromProbe::new(
            name.clone(),
            *mode,
            endpoint.clone(),
            query.clone(),
            comparator.clone(),
            *threshold,
            *timeout_seconds,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_core::experiment::ProbeMode;

    #[test]
    fn build_probe_rejects_k8s_without_client() {
        let config = ProbeConfig::K8s {
            name: "ready".to_string(),
            mode: ProbeMode::Eot,
            namespace: "default".to_string(),
            resource_kind: "deployment".to_string(),
            resource_name: "web".to_string(),
            condition: "ready".to_string(),
            expected_value: None,
        };
        assert!(build_probe(&config, None).is_err());
    }

    #[test]
    fn build_probe_builds_http_without_client() {
        let config = ProbeConfig::Http {
            name: "health".to_string(),
            mode: ProbeMode::Sot,
            url: "http://localhost/health".to_string(),
            expected_status: 200,
            timeout_seconds: 5.0,
            body_pattern: None,
            method: "GET".to_string(),
            headers: Default::default(),
        };
        assert!(build_probe(&config, None).is_ok());
    }
}
