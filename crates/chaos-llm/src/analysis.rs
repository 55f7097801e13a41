use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chaos_core::experiment::ExperimentRecord;
use chaos_core::runner::{AnalysisDispatcher, AnalysisSink};

use crate::client::AnalysisClient;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub action: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub description: String,
}

fn default_priority() -> String {
    "medium".to_string()
}

/// Structured assessment of a completed experiment: severity (SEV1-SEV4),
/// root cause, confidence, remediation recommendations and an overall
/// resilience score out of 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub severity: String,
    pub root_cause: String,
    pub confidence: f64,
    #[serde(default)]
    pub recommendations: Vec<RecommendedAction>,
    pub resilience_score: f64,
}

/// Dispatches a completed experiment record to the remote analysis service
/// and persists whatever it returns through an `AnalysisSink`. `analyze`
/// never propagates errors -- a failed dispatch is logged and the experiment
/// record is otherwise unaffected.
pub struct RemoteAnalysisDispatcher {
    client: AnalysisClient,
    sink: Option<Arc<dyn AnalysisSink>>,
}

impl RemoteAnalysisDispatcher {
    pub fn new(client: AnalysisClient) -> Self {
        Self { client, sink: None }
    }

    pub fn with_sink(client: AnalysisClient, sink: Arc<dyn AnalysisSink>) -> Self {
        Self {
            client,
            sink: Some(sink),
        }
    }

    async fn run_analysis(&self, record: &ExperimentRecord) -> anyhow::Result<AnalysisResult> {
        self.client.post_json("analyze", record).await
    }
}

#[async_trait]
impl AnalysisDispatcher for RemoteAnalysisDispatcher {
    async fn analyze(&self, record: &ExperimentRecord) {
        let analysis = match self.run_analysis(record).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(experiment_id = %record.id, error = %e, "ai analysis dispatch failed");
                return;
            }
        };

        let Some(sink) = &self.sink else { return };
        let value = match serde_json::to_value(&analysis) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(experiment_id = %record.id, error = %e, "failed to serialize ai analysis");
                return;
            }
        };
        if let Err(e) = sink.save_analysis(&record.id, &value).await {
            tracing::warn!(experiment_id = %record.id, error = %e, "failed to persist ai analysis");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_core::experiment::{ChaosType, ExperimentConfig, SafetyConfig, TargetSelector};

    fn record() -> ExperimentRecord {
        ExperimentRecord::new(
            "abc12345".to_string(),
            ExperimentConfig {
                name: "pod-kill".to_string(),
                chaos_type: ChaosType::PodDelete,
                target: TargetSelector {
                    namespace: Some("default".to_string()),
                    labels: None,
                    resource_id: None,
                },
                parameters: Default::default(),
                safety: SafetyConfig::default(),
                probes: vec![],
                description: None,
            },
        )
    }

    #[test]
    fn analysis_result_deserializes_from_minimal_json() {
        let json = r#"{"severity":"SEV3","root_cause":"pod restart latency","confidence":0.8,"resilience_score":72.5}"#;
        let result: AnalysisResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.severity, "SEV3");
        assert!(result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn analyze_swallows_client_errors() {
        let client = AnalysisClient::new("http://127.0.0.1:1".to_string(), Some("test-key".to_string()));
        let dispatcher = RemoteAnalysisDispatcher::new(client);
        // No service listening on that port; the POST will fail to connect,
        // and `analyze` must not panic or propagate that failure.
        dispatcher.analyze(&record()).await;
    }
}
