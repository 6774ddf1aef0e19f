use crate::record::LogRecord;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Payload of `GET /api/getInfo`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub node_version: String,
    #[serde(default)]
    pub student: Student,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub group: String,
}

/// A full dashboard load: the logs and the info panel, fetched together.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub logs: Vec<LogRecord>,
    pub info: ServerInfo,
}

pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_logs(&self) -> Result<Vec<LogRecord>> {
        let url = format!("{}/api/logs", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?
            .error_for_status()?;

        let logs: Vec<LogRecord> = response
            .json()
            .await
            .context("Malformed logs payload")?;
        log::debug!("fetched {} log records from {}", logs.len(), url);
        Ok(logs)
    }

    pub async fn fetch_info(&self) -> Result<ServerInfo> {
        let url = format!("{}/api/getInfo", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?
            .error_for_status()?;

        response.json().await.context("Malformed info payload")
    }

    /// Fetches logs, then info. Either failing fails the whole load, there is
    /// no partial result.
    pub async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let logs = self.fetch_logs().await?;
        let info = self.fetch_info().await?;
        Ok(Snapshot { logs, info })
    }
}
