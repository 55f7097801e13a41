use clap::Args;
use serde_json::{json, Value};

use crate::client::ApiClient;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Experiment id to show the AI analysis for
    pub id: String,
}

/// There is no dedicated analysis endpoint: the AI insight is embedded in
/// the experiment record once `AnalysisDispatcher` has run, so this fetches
/// the record and surfaces just that field.
pub async fn execute(client: &ApiClient, args: AnalyzeArgs) -> anyhow::Result<Value> {
    let record = client.get(&format!("/api/chaos/experiments/{}", args.id)).await?;
    match record.get("ai_insights") {
        Some(Value::Null) | None => Ok(json!({
            "experiment_id": args.id,
            "ai_insights": null,
            "note": "no analysis recorded for this experiment yet",
        })),
        Some(insights) => Ok(json!({ "experiment_id": args.id, "ai_insights": insights })),
    }
}
