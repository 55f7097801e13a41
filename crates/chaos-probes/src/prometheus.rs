use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use chaos_core::experiment::ProbeMode;
use chaos_core::probe::{Probe, ProbeResult};

/// Evaluates an instant PromQL query against a threshold.
pub struct PromProbe {
    name: String,
    mode: ProbeMode,
    endpoint: String,
    query: String,
    comparator: String,
    threshold: f64,
    timeout: Duration,
    client: reqwest::Client,
}

impl PromProbe {
    pub fn new(
        name: String,
        mode: ProbeMode,
        endpoint: String,
        query: String,
        comparator: String,
        threshold: f64,
        timeout_seconds: f64,
    ) -> Self {
        Self {
            name,
            mode,
            endpoint,
            query,
            comparator,
            threshold,
            timeout: Duration::from_secs_f64(timeout_seconds),
            client: reqwest::Client::new(),
        }
    }

    fn compare(&self, value: f64) -> bool {
        match self.comparator.as_str() {
            ">" => value > self.threshold,
            ">=" => value >= self.threshold,
            "<" => value < self.threshold,
            "<=" => value <= self.threshold,
            "==" => (value - self.threshold).abs() < f64::EPSILON,
            "!=" => (value - self.threshold).abs() >= f64::EPSILON,
            _ => false,
        }
    }
}

#[async_trait]
impl Probe for PromProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe_type(&self) -> &'static str {
        "prometheus"
    }

    fn mode(&self) -> ProbeMode {
        self.mode
    }

    async fn execute(&self) -> anyhow::Result<ProbeResult> {
        let url = format!("{}/api/v1/query", self.endpoint.trim_end_matches('/'));
        let response: serde_json::Value = self
            .client
            .get(&url)
            .query(&[("query", self.query.as_str())])
            .timeout(self.timeout)
            .send()
            .await?
            .json()
            .await?;

        let result = response["data"]["result"]
            .as_array()
            .and_then(|arr| arr.first())
            .ok_or_else(|| anyhow::anyhow!("prometheus query returned no series: {}", self.query))?;

        let value_str = result["value"][1]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("malformed prometheus response"))?;
        let value: f64 = value_str.parse()?;

        let passed = self.compare(value);
        let detail = json!({
            "query": self.query,
            "value": value,
            "comparator": self.comparator,
            "threshold": self.threshold,
        });

        Ok(if passed {
            ProbeResult::pass(&self.name, "prometheus", self.mode, detail)
        } else {
            ProbeResult::fail(&self.name, "prometheus", self.mode, detail)
        })
    }
}
