use serde::de::DeserializeOwned;
use serde::Serialize;

/// Thin client for the external AI analysis service: POSTs a JSON body to a
/// configured endpoint and deserializes the response. The service itself is
/// a separate process outside this repo's core -- this crate only knows its
/// wire contract (POST experiment record in, structured analysis out).
pub struct AnalysisClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl AnalysisClient {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    pub async fn post_json<T, R>(&self, path: &str, body: &T) -> anyhow::Result<R>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut request = self.http.post(&url).json(body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("analysis service error ({status}): {body}");
        }
        Ok(response.json::<R>().await?)
    }
}
