use clap::Args;
use serde_json::Value;

use crate::client::ApiClient;

#[derive(Args)]
pub struct StatusArgs {
    /// Show a single experiment instead of listing recent ones
    #[arg(long)]
    pub id: Option<String>,
}

pub async fn execute(client: &ApiClient, args: StatusArgs) -> anyhow::Result<Value> {
    match args.id {
        Some(id) => client.get(&format!("/api/chaos/experiments/{id}")).await,
        None => client.get("/api/chaos/experiments").await,
    }
}
