use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::experiment::ProbeMode;

/// Result of a single probe execution. Never carries a panic or bubbled
/// error past `safe_execute` -- failures are encoded in `passed`/`error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub probe_name: String,
    pub probe_type: String,
    pub mode: ProbeMode,
    pub passed: bool,
    #[serde(default)]
    pub detail: Value,
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

impl ProbeResult {
    pub fn pass(probe_name: &str, probe_type: &str, mode: ProbeMode, detail: Value) -> Self {
        Self {
            probe_name: probe_name.to_string(),
            probe_type: probe_type.to_string(),
            mode,
            passed: true,
            detail,
            error: None,
            executed_at: Utc::now(),
        }
    }

    pub fn fail(probe_name: &str, probe_type: &str, mode: ProbeMode, detail: Value) -> Self {
        Self {
            probe_name: probe_name.to_string(),
            probe_type: probe_type.to_string(),
            mode,
            passed: false,
            detail,
            error: None,
            executed_at: Utc::now(),
        }
    }

    pub fn errored(probe_name: &str, probe_type: &str, mode: ProbeMode, error: impl ToString) -> Self {
        Self {
            probe_name: probe_name.to_string(),
            probe_type: probe_type.to_string(),
            mode,
            passed: false,
            detail: Value::Null,
            error: Some(error.to_string()),
            executed_at: Utc::now(),
        }
    }
}

/// A resilience probe. `execute` may fail; `safe_execute` never does --
/// errors are captured into a failing `ProbeResult` so the health-check loop
/// and SOT/EOT checks never have to handle a probe exception directly.
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;
    fn probe_type(&self) -> &'static str;
    fn mode(&self) -> ProbeMode;

    async fn execute(&self) -> anyhow::Result<ProbeResult>;

    async fn safe_execute(&self) -> ProbeResult {
        let result = match self.execute().await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(probe = self.name(), error = %e, "probe failed");
                ProbeResult::errored(self.name(), self.probe_type(), self.mode(), e)
            }
        };
        crate::metrics::PROBE_RESULTS_TOTAL
            .with_label_values(&[self.probe_type(), if result.passed { "true" } else { "false" }])
            .inc();
        result
    }
}
