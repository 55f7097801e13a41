use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

use chaos_core::experiment::ProbeMode;
use chaos_core::probe::{Probe, ProbeResult};

/// HTTP endpoint health check: validates response status and, optionally,
/// that the body matches a regex pattern.
pub struct HttpProbe {
    name: String,
    mode: ProbeMode,
    url: String,
    expected_status: u16,
    timeout: Duration,
    body_pattern: Option<regex::Regex>,
    method: reqwest::Method,
    headers: HashMap<String, String>,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(
        name: String,
        mode: ProbeMode,
        url: String,
        expected_status: u16,
        timeout_seconds: f64,
        body_pattern: Option<String>,
        method: String,
        headers: HashMap<String, String>,
    ) -> anyhow::Result<Self> {
        let body_pattern = body_pattern.map(|p| regex::Regex::new(&p)).transpose()?;
        let method = method.parse().unwrap_or(reqwest::Method::GET);
        Ok(Self {
            name,
            mode,
            url,
            expected_status,
            timeout: Duration::from_secs_f64(timeout_seconds),
            body_pattern,
            method,
            headers,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe_type(&self) -> &'static str {
        "http"
    }

    fn mode(&self) -> ProbeMode {
        self.mode
    }

    async fn execute(&self) -> anyhow::Result<ProbeResult> {
        let mut builder = self.client.request(self.method.clone(), &self.url).timeout(self.timeout);
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }

        let start = std::time::Instant::now();
        let response = builder.send().await?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = response.status().as_u16();
        let status_ok = status == self.expected_status;

        let body_ok = if let (true, Some(pattern)) = (status_ok, &self.body_pattern) {
            let body = response.text().await.unwrap_or_default();
            pattern.is_match(&body)
        } else {
            true
        };

        let passed = status_ok && body_ok;
        let detail = json!({
            "url": self.url,
            "status_code": status,
            "expected_status": self.expected_status,
            "body_match": body_ok,
            "response_time_ms": elapsed_ms,
        });

        Ok(if passed {
            ProbeResult::pass(&self.name, "http", self.mode, detail)
        } else {
            ProbeResult::fail(&self.name, "http", self.mode, detail)
        })
    }
}
