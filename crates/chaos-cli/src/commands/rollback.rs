use clap::Args;
use serde_json::Value;

use crate::client::ApiClient;

#[derive(Args)]
pub struct RollbackArgs {
    /// Experiment id to roll back
    pub id: String,
}

pub async fn execute(client: &ApiClient, args: RollbackArgs) -> anyhow::Result<Value> {
    client
        .post(&format!("/api/chaos/experiments/{}/rollback", args.id), None)
        .await
}
