use std::path::PathBuf;

use clap::Args;
use serde_json::Value;

use chaos_core::experiment::ExperimentConfig;

use crate::client::ApiClient;

#[derive(Args)]
pub struct RunArgs {
    /// Path to the experiment config file (YAML or JSON)
    pub config: PathBuf,
    /// Submit to `/api/chaos/dry-run` instead of `/api/chaos/experiments`
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(client: &ApiClient, args: RunArgs) -> anyhow::Result<Value> {
    let contents = std::fs::read_to_string(&args.config)?;
    let config: ExperimentConfig = serde_yaml::from_str(&contents)?;
    let body = serde_json::to_value(&config)?;

    let path = if args.dry_run {
        "/api/chaos/dry-run"
    } else {
        "/api/chaos/experiments"
    };
    client.post(path, Some(&body)).await
}
