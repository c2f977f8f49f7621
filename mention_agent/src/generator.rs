// HTTP adapters for the content generator and the reply sink.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use std::time::Duration;

use mention_core::generate::{ContentGenerator, GeneratedContent, ReplyPayload, Responder};
use mention_core::{Error, Result};

pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    target_id: &'a str,
    payload: &'a ReplyPayload,
}

fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
        .build()
        .map_err(|e| Error::Other(e.into()))
}

/// Posts `{text}` to the generation service and reads back `{ticker, name, description}`.
#[derive(Debug, Clone)]
pub struct HttpContentGenerator {
    client: Client,
    url: Url,
    api_key: String,
}

impl HttpContentGenerator {
    pub fn new(url: Url, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    async fn generate(&self, text: &str) -> Result<GeneratedContent> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_key)
            .json(&GenerateRequest { text })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Generation(e.to_string()))?;

        let mut content: GeneratedContent = response
            .json()
            .await
            .map_err(|e| Error::Generation(format!("invalid response: {}", e)))?;
        content.ticker = content.ticker.trim().trim_start_matches('$').to_uppercase();
        if content.ticker.is_empty() || content.name.trim().is_empty() {
            return Err(Error::Generation("empty ticker or name".to_string()));
        }
        Ok(content)
    }
}

/// Posts `{targetId, payload}` to a webhook that publishes the reply.
#[derive(Debug, Clone)]
pub struct WebhookResponder {
    client: Client,
    url: Url,
}

impl WebhookResponder {
    pub fn new(url: Url) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            url,
        })
    }
}

#[async_trait]
impl Responder for WebhookResponder {
    async fn respond(&self, target_id: &str, payload: &ReplyPayload) -> Result<()> {
        self.client
            .post(self.url.clone())
            .json(&ReplyRequest { target_id, payload })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Respond(e.to_string()))?;
        tracing::info!("Reply sent for mention {}", target_id);
        Ok(())
    }
}

/// Used when no webhook is configured.
#[derive(Debug, Clone, Default)]
pub struct LogResponder;

#[async_trait]
impl Responder for LogResponder {
    async fn respond(&self, target_id: &str, payload: &ReplyPayload) -> Result<()> {
        tracing::info!(
            "Reply to @{} ({}): ${} {} - {}",
            payload.author_handle,
            target_id,
            payload.content.ticker,
            payload.content.name,
            payload.content.description
        );
        Ok(())
    }
}
