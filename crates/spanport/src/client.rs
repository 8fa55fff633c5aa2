//! Cloud trace backend client.
//!
//! The service is a trait so delivery channels can run against an
//! in-memory double; the production implementation owns its HTTP client
//! instead of going through process-wide state.

use crate::convert::TraceBatch;
use crate::error::DeliveryError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Backend capability behind the cloud delivery channels.
#[async_trait]
pub trait TraceService: Send + Sync {
    /// Upload a batch of trace containers in one insert call.
    async fn patch_traces(&self, batch: TraceBatch) -> Result<(), DeliveryError>;
}

/// Connection settings for the hosted trace API.
#[derive(Debug, Clone)]
pub struct TraceServiceConfig {
    /// Base URL of the trace API.
    pub endpoint: String,
    /// Project the traces belong to.
    pub project_id: String,
    /// Bearer token attached to every request, when set.
    pub credentials_token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for TraceServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloudtrace.googleapis.com".to_string(),
            project_id: String::new(),
            credentials_token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl TraceServiceConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_credentials_token(mut self, token: impl Into<String>) -> Self {
        self.credentials_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP implementation of [`TraceService`] with an owned client.
pub struct HttpTraceService {
    config: TraceServiceConfig,
    client: reqwest::Client,
}

impl HttpTraceService {
    pub fn new(config: TraceServiceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/projects/{}/traces",
            self.config.endpoint.trim_end_matches('/'),
            self.config.project_id
        )
    }
}

#[async_trait]
impl TraceService for HttpTraceService {
    async fn patch_traces(&self, batch: TraceBatch) -> Result<(), DeliveryError> {
        let url = self.url();
        let mut request = self
            .client
            .patch(&url)
            .json(&batch)
            .timeout(self.config.timeout);
        if let Some(token) = &self.config.credentials_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(DeliveryError::Backend(response.status()));
        }

        debug!(url = %url, traces = batch.traces.len(), "patched traces");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint_and_project() {
        let service = HttpTraceService::new(
            TraceServiceConfig::new("proj-1").with_endpoint("https://trace.local/"),
        );
        assert_eq!(service.url(), "https://trace.local/v1/projects/proj-1/traces");
    }
}
