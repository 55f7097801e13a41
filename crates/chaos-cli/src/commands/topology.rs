use clap::Args;
use serde_json::Value;

use crate::client::ApiClient;

#[derive(Args)]
pub struct TopologyArgs {
    /// Which topology provider to query
    #[arg(long, default_value = "combined", value_parser = ["k8s", "aws", "combined"])]
    pub provider: String,
}

pub async fn execute(client: &ApiClient, args: TopologyArgs) -> anyhow::Result<Value> {
    client.get(&format!("/api/topology/{}", args.provider)).await
}
