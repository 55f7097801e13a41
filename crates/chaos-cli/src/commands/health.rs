use serde_json::Value;

use crate::client::ApiClient;

pub async fn execute(client: &ApiClient) -> anyhow::Result<Value> {
    client.get("/health").await
}
