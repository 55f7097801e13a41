use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tokio::process::Command;

use chaos_core::experiment::ProbeMode;
use chaos_core::probe::{Probe, ProbeResult};

/// Runs a shell command and checks its exit code and, optionally, that
/// stdout contains a substring.
pub struct CmdProbe {
    name: String,
    mode: ProbeMode,
    command: String,
    expected_exit_code: i32,
    output_contains: Option<String>,
    timeout: Duration,
}

impl CmdProbe {
    pub fn new(
        name: String,
        mode: ProbeMode,
        command: String,
        expected_exit_code: i32,
        output_contains: Option<String>,
        timeout_seconds: f64,
    ) -> Self {
        Self {
            name,
            mode,
            command,
            expected_exit_code,
            output_contains,
            timeout: Duration::from_secs_f64(timeout_seconds),
        }
    }
}

#[async_trait]
impl Probe for CmdProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe_type(&self) -> &'static str {
        "cmd"
    }

    fn mode(&self) -> ProbeMode {
        self.mode
    }

    async fn execute(&self) -> anyhow::Result<ProbeResult> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new("sh").arg("-c").arg(&self.command).output(),
        )
        .await??;

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let exit_ok = exit_code == self.expected_exit_code;
        let output_ok = self
            .output_contains
            .as_ref()
            .map(|needle| stdout.contains(needle.as_str()))
            .unwrap_or(true);

        let passed = exit_ok && output_ok;
        let detail = json!({
            "command": self.command,
            "exit_code": exit_code,
            "expected_exit_code": self.expected_exit_code,
            "output_match": output_ok,
            "stdout": stdout,
            "stderr": stderr,
        });

        Ok(if passed {
            ProbeResult::pass(&self.name, "cmd", self.mode, detail)
        } else {
            ProbeResult::fail(&self.name, "cmd", self.mode, detail)
        })
    }
}
