use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;

use chaos_core::experiment::{ExperimentConfig, ExperimentRecord, ExperimentStatus};
use chaos_core::probe::ProbeResult;
use chaos_core::runner::{AnalysisSink, ExperimentPersistence};
use chaos_core::snapshot::SnapshotSink;
use chaos_core::topology::Snapshot;

/// SQLite-backed store for experiment records, snapshots, probe results and
/// AI analyses. Implements the persistence seams `chaos-core` defines so the
/// runner and health-check loop stay storage-agnostic.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_experiment(&self, id: &str) -> anyhow::Result<Option<ExperimentRecord>> {
        let row = sqlx::query_as::<_, ExperimentRow>(
            r#"SELECT id, config, status, phase, started_at, completed_at, steady_state,
                      hypothesis, injection_result, observations, rollback_result, error, ai_insights
               FROM experiments WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    pub async fn list_experiments(&self, limit: i64) -> anyhow::Result<Vec<ExperimentRecord>> {
        let rows = sqlx::query_as::<_, ExperimentRow>(
            r#"SELECT id, config, status, phase, started_at, completed_at, steady_state,
                      hypothesis, injection_result, observations, rollback_result, error, ai_insights
               FROM experiments ORDER BY started_at DESC LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn record_probe_result(&self, experiment_id: &str, result: &ProbeResult) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO probe_results (experiment_id, probe_type, mode, result, passed, executed_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(experiment_id)
        .bind(&result.probe_type)
        .bind(serde_json::to_string(&result.mode)?)
        .bind(serde_json::to_string(result)?)
        .bind(result.passed)
        .bind(result.executed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_analysis_result(
        &self,
        experiment_id: &str,
        severity: &str,
        root_cause: &str,
        confidence: f64,
        recommendations: &Value,
        resilience_score: Option<f64>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO analysis_results
                   (experiment_id, severity, root_cause, confidence, recommendations, resilience_score)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(experiment_id)
        .bind(severity)
        .bind(root_cause)
        .bind(confidence)
        .bind(serde_json::to_string(recommendations)?)
        .bind(resilience_score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ExperimentPersistence for SqliteStore {
    async fn save(&self, record: &ExperimentRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO experiments
                   (id, config, status, phase, started_at, completed_at, steady_state, hypothesis,
                    injection_result, observations, rollback_result, error, ai_insights)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   status = excluded.status,
                   phase = excluded.phase,
                   completed_at = excluded.completed_at,
                   steady_state = excluded.steady_state,
                   hypothesis = excluded.hypothesis,
                   injection_result = excluded.injection_result,
                   observations = excluded.observations,
                   rollback_result = excluded.rollback_result,
                   error = excluded.error,
                   ai_insights = excluded.ai_insights"#,
        )
        .bind(&record.id)
        .bind(serde_json::to_string(&record.config)?)
        .bind(serde_json::to_string(&record.status)?.trim_matches('"').to_string())
        .bind(serde_json::to_string(&record.phase)?.trim_matches('"').to_string())
        .bind(record.started_at)
        .bind(record.completed_at)
        .bind(record.steady_state.as_ref().map(serde_json::to_string).transpose()?)
        .bind(&record.hypothesis)
        .bind(record.injection_result.as_ref().map(serde_json::to_string).transpose()?)
        .bind(record.observations.as_ref().map(serde_json::to_string).transpose()?)
        .bind(record.rollback_result.as_ref().map(serde_json::to_string).transpose()?)
        .bind(&record.error)
        .bind(record.ai_insights.as_ref().map(serde_json::to_string).transpose()?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotSink for SqliteStore {
    async fn persist(&self, experiment_id: &str, snapshot: &Snapshot) -> anyhow::Result<()> {
        let (kind, namespace) = match snapshot {
            Snapshot::Kubernetes(s) => ("kubernetes", Some(s.namespace.clone())),
            Snapshot::Aws(_) => ("aws", None),
        };

        sqlx::query(
            r#"INSERT INTO snapshots (experiment_id, type, namespace, data, captured_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(experiment_id)
        .bind(kind)
        .bind(namespace)
        .bind(serde_json::to_string(snapshot)?)
        .bind(snapshot.captured_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AnalysisSink for SqliteStore {
    async fn save_analysis(&self, experiment_id: &str, analysis: &Value) -> anyhow::Result<()> {
        let severity = analysis["severity"].as_str().unwrap_or("sev4").to_string();
        let root_cause = analysis["root_cause"].as_str().unwrap_or_default().to_string();
        let confidence = analysis["confidence"].as_f64().unwrap_or(0.0);
        let resilience_score = analysis["resilience_score"].as_f64();
        let recommendations = analysis
            .get("recommendations")
            .cloned()
            .unwrap_or_else(|| Value::Array(vec![]));

        self.record_analysis_result(
            experiment_id,
            &severity,
            &root_cause,
            confidence,
            &recommendations,
            resilience_score,
        )
        .await?;

        sqlx::query("UPDATE experiments SET ai_insights = ? WHERE id = ?")
            .bind(serde_json::to_string(analysis)?)
            .bind(experiment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ExperimentRow {
    id: String,
    config: String,
    status: String,
    phase: String,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    steady_state: Option<String>,
    hypothesis: Option<String>,
    injection_result: Option<String>,
    observations: Option<String>,
    rollback_result: Option<String>,
    error: Option<String>,
    ai_insights: Option<String>,
}

impl TryFrom<ExperimentRow> for ExperimentRecord {
    type Error = anyhow::Error;

    fn try_from(row: ExperimentRow) -> Result<Self, Self::Error> {
        Ok(ExperimentRecord {
            id: row.id,
            config: serde_json::from_str::<ExperimentConfig>(&row.config)?,
            status: serde_json::from_value(Value::String(row.status))?,
            phase: serde_json::from_value(Value::String(row.phase))?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            steady_state: row.steady_state.map(|s| serde_json::from_str(&s)).transpose()?,
            hypothesis: row.hypothesis,
            injection_result: row.injection_result.map(|s| serde_json::from_str(&s)).transpose()?,
            observations: row.observations.map(|s| serde_json::from_str(&s)).transpose()?,
            rollback_result: row.rollback_result.map(|s| serde_json::from_str(&s)).transpose()?,
            error: row.error,
            ai_insights: row.ai_insights.map(|s| serde_json::from_str(&s)).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_core::experiment::{ChaosType, ExperimentConfig, SafetyConfig, TargetSelector};

    async fn test_store() -> SqliteStore {
        let pool = crate::create_pool("sqlite::memory:").await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn test_config() -> ExperimentConfig {
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
        }
    }

    #[tokio::test]
    async fn save_then_get_roundtrips() {
        let store = test_store().await;
        let record = ExperimentRecord::new("abc12345".to_string(), test_config());
        store.save(&record).await.unwrap();

        let loaded = store.get_experiment("abc12345").await.unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.status, record.status);
        assert_eq!(loaded.config.name, "pod-kill");
    }

    #[tokio::test]
    async fn save_upserts_on_conflict() {
        let store = test_store().await;
        let mut record = ExperimentRecord::new("dup00001".to_string(), test_config());
        store.save(&record).await.unwrap();

        record.status = ExperimentStatus::Completed;
        record.error = Some("none".to_string());
        store.save(&record).await.unwrap();

        let loaded = store.get_experiment("dup00001").await.unwrap().unwrap();
        assert_eq!(loaded.status, ExperimentStatus::Completed);
        assert_eq!(loaded.error.as_deref(), Some("none"));
    }

    #[tokio::test]
    async fn get_missing_experiment_returns_none() {
        let store = test_store().await;
        assert!(store.get_experiment("missing1").await.unwrap().is_none());
    }
}
