//! REST-backed identity provider adapter.
//!
//! Talks to a provider exposing widget, delivery, and confirmation endpoints
//! over JSON. Widget events are not available over plain REST; the adapter
//! drops the event sender, and challenge expiry surfaces when the provider
//! rejects a stale code at confirmation time.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info_span, Instrument};
use url::Url;

use super::identity::{
    ChallengeKind, ChallengeWidget, IdentityProvider, ProviderError, WidgetConfig,
};

const API_KEY_HEADER: &str = "X-Presenza-Api-Key";

#[derive(Clone)]
pub struct HttpIdentityProvider {
    base_url: String,
    api_key: SecretString,
    client: Client,
}

impl HttpIdentityProvider {
    /// Build the adapter, validating the base URL up front.
    ///
    /// # Errors
    /// Returns `MissingConfig` if the URL is empty or unparsable, or if the
    /// API key is empty.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, ProviderError> {
        if api_key.expose_secret().is_empty() {
            return Err(ProviderError::MissingConfig("provider API key".to_string()));
        }
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .map_err(|err| ProviderError::Network(err.to_string()))?;
        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post(&self, path: &str, body: Value) -> Result<reqwest::Response, ProviderError> {
        let url = self.endpoint(path);
        let span = info_span!("provider.request", http.method = "POST", url = %url);
        self.client
            .post(&url)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&body)
            .send()
            .instrument(span)
            .await
            .map_err(|err| ProviderError::Network(err.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create_verifier(
        &self,
        container_id: &str,
        config: WidgetConfig,
    ) -> Result<Arc<dyn ChallengeWidget>, ProviderError> {
        // No push channel over REST; confirm-time rejection covers expiry.
        drop(config.events);
        Ok(Arc::new(HttpWidget {
            provider: self.clone(),
            container_id: container_id.to_string(),
            size: config.size.as_str(),
            widget_id: Mutex::new(None),
        }))
    }

    async fn send_code(
        &self,
        identifier: &str,
        kind: ChallengeKind,
        widget_id: Option<&str>,
    ) -> Result<(), ProviderError> {
        let response = self
            .post(
                "/v1/challenges",
                json!({
                    "identifier": identifier,
                    "type": kind.as_str(),
                    "widget_id": widget_id,
                }),
            )
            .await?;
        expect_success(response).await
    }

    async fn confirm_code(
        &self,
        identifier: &str,
        code: &str,
        kind: ChallengeKind,
    ) -> Result<(), ProviderError> {
        let response = self
            .post(
                "/v1/challenges/confirm",
                json!({
                    "identifier": identifier,
                    "code": code,
                    "type": kind.as_str(),
                }),
            )
            .await?;
        expect_success(response).await
    }
}

struct HttpWidget {
    provider: HttpIdentityProvider,
    container_id: String,
    size: &'static str,
    widget_id: Mutex<Option<String>>,
}

#[async_trait]
impl ChallengeWidget for HttpWidget {
    async fn render(&self) -> Result<String, ProviderError> {
        let response = self
            .provider
            .post(
                "/v1/widgets",
                json!({
                    "container_id": self.container_id,
                    "size": self.size,
                }),
            )
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Err(ProviderError::AlreadyRendered(self.container_id.clone()));
        }
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| ProviderError::Network(err.to_string()))?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        let widget_id = body
            .get("widget_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProviderError::Rejected("provider response missing widget_id".to_string())
            })?
            .to_string();
        *self.widget_id.lock().await = Some(widget_id.clone());
        debug!(widget_id = %widget_id, container = %self.container_id, "widget rendered");
        Ok(widget_id)
    }

    async fn clear(&self) -> Result<(), ProviderError> {
        let Some(widget_id) = self.widget_id.lock().await.take() else {
            // Never rendered, nothing to clear remotely.
            return Ok(());
        };
        let response = self
            .provider
            .post("/v1/widgets/clear", json!({ "widget_id": widget_id }))
            .await?;
        expect_success(response).await
    }
}

fn normalize_base_url(base_url: &str) -> Result<String, ProviderError> {
    if base_url.trim().is_empty() {
        return Err(ProviderError::MissingConfig(
            "provider base URL".to_string(),
        ));
    }
    let parsed = Url::parse(base_url)
        .map_err(|err| ProviderError::MissingConfig(format!("provider base URL: {err}")))?;
    if parsed.host_str().is_none() {
        return Err(ProviderError::MissingConfig(
            "provider base URL: no host".to_string(),
        ));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Extract the provider's own failure message from a JSON error body.
fn provider_error_message(body: &Value) -> &str {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn rejection(status: StatusCode, body: &Value) -> ProviderError {
    let message = provider_error_message(body);
    if message.is_empty() {
        ProviderError::Rejected(format!("provider returned {status}"))
    } else {
        ProviderError::Rejected(format!("{status} - {message}"))
    }
}

async fn expect_success(response: reqwest::Response) -> Result<(), ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body: Value = response.json().await.unwrap_or(Value::Null);
    Err(rejection(status, &body))
}
