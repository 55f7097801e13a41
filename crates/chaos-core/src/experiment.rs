use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Which infrastructure chaos a config targets. Tagged so that a statically
/// typed `Actuator` lookup (k8s vs. aws) and serialization stay in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChaosType {
    PodDelete,
    NetworkLatency,
    NetworkLoss,
    CpuStress,
    MemoryStress,
    Ec2Stop,
    RdsFailover,
    RouteBlackhole,
}

impl ChaosType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PodDelete => "pod_delete",
            Self::NetworkLatency => "network_latency",
            Self::NetworkLoss => "network_loss",
            Self::CpuStress => "cpu_stress",
            Self::MemoryStress => "memory_stress",
            Self::Ec2Stop => "ec2_stop",
            Self::RdsFailover => "rds_failover",
            Self::RouteBlackhole => "route_blackhole",
        }
    }

    pub fn is_kubernetes(&self) -> bool {
        matches!(
            self,
            Self::PodDelete
                | Self::NetworkLatency
                | Self::NetworkLoss
                | Self::CpuStress
                | Self::MemoryStress
        )
    }

    pub fn is_aws(&self) -> bool {
        !self.is_kubernetes()
    }
}

impl fmt::Display for ChaosType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target resource selector: a namespace/label pair for Kubernetes, or a
/// bare resource_id for AWS.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetSelector {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default)]
    pub resource_id: Option<String>,
}

impl TargetSelector {
    /// Render `labels` as a Kubernetes label selector string, e.g. "app=web,tier=backend".
    pub fn label_selector(&self) -> String {
        self.labels
            .as_ref()
            .map(|labels| {
                labels
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
    #[serde(default)]
    pub require_confirmation: bool,
    #[serde(default = "default_max_blast_radius")]
    pub max_blast_radius: f64,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub namespace_pattern: Option<String>,
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval: u32,
    #[serde(default = "default_health_check_failure_threshold")]
    pub health_check_failure_threshold: u32,
}

fn default_timeout_seconds() -> u32 {
    30
}
fn default_max_blast_radius() -> f64 {
    0.3
}
fn default_health_check_interval() -> u32 {
    10
}
fn default_health_check_failure_threshold() -> u32 {
    3
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            require_confirmation: false,
            max_blast_radius: default_max_blast_radius(),
            dry_run: false,
            namespace_pattern: None,
            health_check_interval: default_health_check_interval(),
            health_check_failure_threshold: default_health_check_failure_threshold(),
        }
    }
}

impl SafetyConfig {
    /// Clamp all bounded fields in place. Called once by the runner before
    /// a config is used, so malformed YAML/JSON never propagates out-of-range
    /// values into the rest of the system.
    pub fn normalize(&mut self) {
        self.timeout_seconds = self.timeout_seconds.clamp(1, 120);
        self.max_blast_radius = self.max_blast_radius.clamp(0.0, 1.0);
        self.health_check_interval = self.health_check_interval.clamp(1, 60);
        self.health_check_failure_threshold = self.health_check_failure_threshold.clamp(1, 10);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMode {
    Sot,
    Eot,
    Continuous,
    OnChaos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeConfig {
    Http {
        name: String,
        mode: ProbeMode,
        url: String,
        #[serde(default = "default_expected_status")]
        expected_status: u16,
        #[serde(default = "default_http_timeout")]
        timeout_seconds: f64,
        #[serde(default)]
        body_pattern: Option<String>,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    Cmd {
        name: String,
        mode: ProbeMode,
        command: String,
        #[serde(default)]
        expected_exit_code: i32,
        #[serde(default)]
        output_contains: Option<String>,
        #[serde(default = "default_cmd_timeout")]
        timeout_seconds: f64,
    },
    K8s {
        name: String,
        mode: ProbeMode,
        #[serde(default = "default_namespace")]
        namespace: String,
        #[serde(default = "default_resource_kind")]
        resource_kind: String,
        #[serde(default)]
        resource_name: String,
        #[serde(default = "default_condition")]
        condition: String,
        #[serde(default)]
        expected_value: Option<Value>,
    },
    Prometheus {
        name: String,
        mode: ProbeMode,
        endpoint: String,
        query: String,
        #[serde(default = "default_comparator")]
        comparator: String,
        #[serde(default)]
        threshold: f64,
        #[serde(default = "default_http_timeout")]
        timeout_seconds: f64,
    },
}

impl ProbeConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Http { name, .. }
            | Self::Cmd { name, .. }
            | Self::K8s { name, .. }
            | Self::Prometheus { name, .. } => name,
        }
    }

    pub fn mode(&self) -> ProbeMode {
        match self {
            Self::Http { mode, .. }
            | Self::Cmd { mode, .. }
            | Self::K8s { mode, .. }
            | Self::Prometheus { mode, .. } => *mode,
        }
    }
}

fn default_expected_status() -> u16 {
    200
}
fn default_http_timeout() -> f64 {
    5.0
}
fn default_cmd_timeout() -> f64 {
    10.0
}
fn default_method() -> String {
    "GET".to_string()
}
fn default_namespace() -> String {
    "default".to_string()
}
fn default_resource_kind() -> String {
    "deployment".to_string()
}
fn default_condition() -> String {
    "ready".to_string()
}
fn default_comparator() -> String {
    ">".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    pub chaos_type: ChaosType,
    #[serde(default)]
    pub target: TargetSelector,
    #[serde(default)]
    pub parameters: HashMap<String, Value>,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExperimentConfig {
    pub fn parameter_u64(&self, key: &str, default: u64) -> u64 {
        self.parameters
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or(default)
    }

    pub fn parameter_str(&self, key: &str, default: &str) -> String {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentPhase {
    SteadyState,
    Hypothesis,
    Inject,
    Observe,
    Rollback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Pending,
    Running,
    Completed,
    Failed,
    RolledBack,
    EmergencyStopped,
}

/// Persisted/returned experiment record. This is the shape that crosses the
/// HTTP boundary and is stored via `chaos-store`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRecord {
    pub id: String,
    pub config: ExperimentConfig,
    pub status: ExperimentStatus,
    pub phase: ExperimentPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub steady_state: Option<Value>,
    pub hypothesis: Option<String>,
    pub injection_result: Option<Value>,
    pub observations: Option<Value>,
    pub rollback_result: Option<Value>,
    pub error: Option<String>,
    pub ai_insights: Option<Value>,
}

impl ExperimentRecord {
    pub fn new(id: String, config: ExperimentConfig) -> Self {
        Self {
            id,
            config,
            status: ExperimentStatus::Running,
            phase: ExperimentPhase::SteadyState,
            started_at: Some(Utc::now()),
            completed_at: None,
            steady_state: None,
            hypothesis: None,
            injection_result: None,
            observations: None,
            rollback_result: None,
            error: None,
            ai_insights: None,
        }
    }
}
