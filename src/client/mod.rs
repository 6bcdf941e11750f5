use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::credentials::CredentialSource;
use crate::display::Renderer;

mod response;

pub use response::{QueryResult, ResultShape};

pub const DEFAULT_BASE_URL: &str = "https://logfire-api.pydantic.dev";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const QUERY_PATH: &str = "/v1/query";

/// Failures that are reported to the user without aborting the program.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Status {status}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Runs one SQL statement and prints whatever comes back.
///
/// `Ok(None)` means the query failed in a way that was already reported to
/// `out`. `Err` is reserved for failures that should end the process.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(
        &self,
        sql: &str,
        show_full: bool,
        out: &mut (dyn Write + Send),
    ) -> Result<Option<QueryResult>>;
}

pub struct LogfireClient {
    client: Client,
    endpoint: Url,
    credentials: Box<dyn CredentialSource>,
    renderer: Renderer,
}

impl LogfireClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Box<dyn CredentialSource>,
        renderer: Renderer,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint = format!("{}{}", base_url.trim_end_matches('/'), QUERY_PATH);
        let endpoint =
            Url::parse(&endpoint).with_context(|| format!("Invalid API url: {}", base_url))?;

        Ok(Self {
            client,
            endpoint,
            credentials,
            renderer,
        })
    }

    pub async fn fetch(&self, token: &str, sql: &str) -> Result<QueryResult, QueryError> {
        log::debug!("GET {} ({} bytes of SQL)", self.endpoint, sql.len());

        let response = self
            .client
            .get(self.endpoint.clone())
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json")
            .query(&[("sql", sql)])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::debug!("query rejected with {}", status);
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let result = QueryResult::from_value(serde_json::from_slice(&body)?);
        log::debug!(
            "query returned {} bytes, {} columns",
            body.len(),
            result.columns().len()
        );

        Ok(result)
    }
}

#[async_trait]
impl QueryExecutor for LogfireClient {
    async fn execute(
        &self,
        sql: &str,
        show_full: bool,
        out: &mut (dyn Write + Send),
    ) -> Result<Option<QueryResult>> {
        let token = self.credentials.load()?;

        writeln!(out, "Querying: {}", self.endpoint)?;
        writeln!(out, "SQL: {}\n", sql)?;

        match self.fetch(&token, sql).await {
            Ok(result) => {
                self.renderer.render(&result, show_full, out)?;
                Ok(Some(result))
            }
            Err(QueryError::Status { status, body }) => {
                log::warn!("Logfire answered with status {}", status);
                self.renderer.error(&format!("Status {}", status), out)?;
                writeln!(out, "{}", body)?;
                Ok(None)
            }
            Err(e) => {
                log::warn!("query failed: {}", e);
                self.renderer.error(&e.to_string(), out)?;
                Ok(None)
            }
        }
    }
}
