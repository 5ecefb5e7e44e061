use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::dispatch::RequestDescriptor;
use crate::error::ConsoleError;
use crate::message::{messages_from_reply, Message};

/// Reply of `/connect`
#[derive(Debug, Deserialize)]
pub struct ConnectReply {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Effective configuration echoed by the backend
    #[serde(default, rename = "CONFIG")]
    pub config: Option<Value>,
}

/// Reply of `/generate`
#[derive(Debug, Deserialize)]
pub struct GenerateReply {
    pub completion: String,
}

/// Status-only replies such as `/new_interaction`
#[derive(Debug, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Decode a reply into one of the typed shapes above
pub fn decode<T: serde::de::DeserializeOwned>(
    path: &'static str,
    reply: Value,
) -> Result<T, ConsoleError> {
    serde_json::from_value(reply).map_err(|e| ConsoleError::Decode {
        path,
        reason: e.to_string(),
    })
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request and return its JSON reply (`Null` for an empty body).
    pub async fn send(&self, request: &RequestDescriptor) -> Result<Value, ConsoleError> {
        let path = request.path();
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "issuing request");

        let mut builder = self.client.request(request.method(), &url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| ConsoleError::Transport { path, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConsoleError::Status { path, status, body });
        }

        let text = response
            .text()
            .await
            .map_err(|source| ConsoleError::Transport { path, source })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ConsoleError::Decode {
            path,
            reason: e.to_string(),
        })
    }

    /// Issue a request whose reply carries messages
    pub async fn messages(&self, request: &RequestDescriptor) -> Result<Vec<Message>, ConsoleError> {
        let reply = self.send(request).await?;
        Ok(messages_from_reply(&reply))
    }
}
