//! HTTP client for the remote template store
//!
//! Speaks the store's JSON API: camelCase records wrapped in a
//! `{success, data, message}` envelope. Reads are retried on transient
//! failures; writes go out exactly once.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::model::{GlobalConfig, PromptTemplate, TemplateId, TemplatePayload, TemplateType};
use crate::store::TemplateStore;

/// Upper bound on a single retry delay
const MAX_BACKOFF_MS: u64 = 30_000;

/// Response wrapper used by every store endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default = "Option::default")]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Template store reached over HTTP
pub struct HttpTemplateStore {
    base_url: String,
    http: Client,
    timeout: Duration,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl HttpTemplateStore {
    /// Create a new client from configuration
    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        debug!(?config, "from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(StoreError::Network)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout)
        } else {
            StoreError::Network(e)
        }
    }

    /// Send one request and unwrap the envelope
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, StoreError> {
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "send: non-success status");
            let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
                .ok()
                .and_then(|env| env.message)
                .unwrap_or(text);
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        // 204 No Content and other bare acknowledgements
        if text.trim().is_empty() {
            debug!(status = status.as_u16(), "send: empty success body");
            return Ok(None);
        }

        let envelope: Envelope<T> = serde_json::from_str(&text)?;
        if !envelope.success {
            debug!(status = status.as_u16(), "send: envelope reports failure");
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: envelope.message.unwrap_or_else(|| "request failed".to_string()),
            });
        }

        Ok(envelope.data)
    }

    /// Delay before retry `attempt` (1-based): doubles each time, capped
    fn backoff_ms(&self, attempt: u32) -> u64 {
        self.retry_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
            .min(MAX_BACKOFF_MS)
    }

    /// Send an idempotent request, retrying transient failures with backoff
    async fn send_with_retry<T, F>(&self, build: F) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.backoff_ms(attempt);
                warn!(attempt, backoff_ms = backoff, "send_with_retry: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match self.send(build()).await {
                Ok(data) => return Ok(data),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    debug!(attempt, error = %e, "send_with_retry: retryable error");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| StoreError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

fn require<T>(data: Option<T>, operation: &str) -> Result<T, StoreError> {
    data.ok_or_else(|| StoreError::InvalidResponse(format!("{} response carried no data", operation)))
}

#[async_trait]
impl TemplateStore for HttpTemplateStore {
    async fn list_templates(&self, template_type: TemplateType) -> Result<Vec<PromptTemplate>, StoreError> {
        debug!(%template_type, "list_templates: called");
        let url = self.url("/prompt-templates");
        let data: Option<Vec<PromptTemplate>> = self
            .send_with_retry(|| self.http.get(&url).query(&[("type", template_type.as_str())]))
            .await?;
        // An empty section may come back as `data: null`
        Ok(data.unwrap_or_default())
    }

    async fn create_template(&self, payload: TemplatePayload) -> Result<PromptTemplate, StoreError> {
        debug!(name = %payload.name, template_type = %payload.template_type, "create_template: called");
        let request = self.http.post(self.url("/prompt-templates")).json(&payload);
        let created: PromptTemplate = require(self.send(request).await?, "create")?;
        info!(id = %created.id, "Created prompt template");
        Ok(created)
    }

    async fn update_template(&self, id: &TemplateId, payload: TemplatePayload) -> Result<PromptTemplate, StoreError> {
        debug!(%id, name = %payload.name, "update_template: called");
        let request = self
            .http
            .put(self.url(&format!("/prompt-templates/{}", id)))
            .json(&payload);
        let updated: PromptTemplate = require(self.send(request).await?, "update")?;
        info!(%id, "Updated prompt template");
        Ok(updated)
    }

    async fn copy_template(&self, id: &TemplateId) -> Result<PromptTemplate, StoreError> {
        debug!(%id, "copy_template: called");
        let request = self.http.post(self.url(&format!("/prompt-templates/{}/copy", id)));
        let copied: PromptTemplate = require(self.send(request).await?, "copy")?;
        info!(source = %id, id = %copied.id, "Copied prompt template");
        Ok(copied)
    }

    async fn delete_template(&self, id: &TemplateId) -> Result<(), StoreError> {
        debug!(%id, "delete_template: called");
        let request = self.http.delete(self.url(&format!("/prompt-templates/{}", id)));
        let _: Option<serde_json::Value> = self.send(request).await?;
        info!(%id, "Deleted prompt template");
        Ok(())
    }

    async fn get_global_config(&self) -> Result<GlobalConfig, StoreError> {
        debug!("get_global_config: called");
        let url = self.url("/global-config");
        let data: Option<GlobalConfig> = self.send_with_retry(|| self.http.get(&url)).await?;
        Ok(data.unwrap_or_default())
    }

    async fn set_global_config(&self, config: GlobalConfig) -> Result<GlobalConfig, StoreError> {
        debug!(?config, "set_global_config: called");
        let request = self.http.put(self.url("/global-config")).json(&config);
        let data: Option<GlobalConfig> = self.send(request).await?;
        // Some deployments acknowledge without echoing the config back
        Ok(data.unwrap_or(config))
    }
}
