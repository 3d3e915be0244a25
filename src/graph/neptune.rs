use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error, info};

use super::{GraphQuery, Row};
use crate::config::NeptuneConfig;

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenCypher-over-HTTP client for a Neptune-compatible endpoint
pub struct NeptuneClient {
    client: reqwest::Client,
    base_url: String,
}

impl NeptuneClient {
    pub fn new(config: &NeptuneConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(QUERY_TIMEOUT)
            .build()
            .context("Failed to create graph HTTP client")?;
        Ok(Self::with_client(client, config.base_url()))
    }

    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        info!("Using OpenCypher endpoint at {}/openCypher", base_url);
        Self { client, base_url }
    }
}

/// Neptune wraps rows in `{"results": [...]}`; anything else is treated as a single row
fn rows_from_response(body: Value) -> Result<Vec<Row>> {
    let results = match body {
        Value::Object(mut map) if map.contains_key("results") => map
            .remove("results")
            .unwrap_or(Value::Null),
        other => other,
    };

    match results {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row),
                other => Err(anyhow!("Unexpected row in query results: {}", other)),
            })
            .collect(),
        Value::Object(row) => Ok(vec![row]),
        Value::Null => Ok(Vec::new()),
        other => Err(anyhow!("Unexpected query results: {}", other)),
    }
}

#[async_trait]
impl GraphQuery for NeptuneClient {
    async fn execute_query(&self, query: &str, parameters: Value) -> Result<Vec<Row>> {
        debug!(query = %query.trim(), parameters = %parameters, "Executing OpenCypher query");

        let url = format!("{}/openCypher", self.base_url);
        let payload = json!({ "query": query, "parameters": parameters });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send graph query: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Graph query failed");
            return Err(anyhow!("Graph query failed with status: {}", status));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse graph query response: {}", e))?;

        let rows = rows_from_response(body)?;
        info!("Query returned {} results", rows.len());
        Ok(rows)
    }

    fn endpoint(&self) -> String {
        self.base_url.clone()
    }
}
