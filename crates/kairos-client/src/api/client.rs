//! HTTP plumbing shared by every resource

use arc_swap::ArcSwapOption;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

pub struct ApiClient {
    base_url: String,
    http_client: Client,
    token: ArcSwapOption<String>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            http_client,
            token: ArcSwapOption::new(config.token.clone().map(Arc::new)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: Option<String>) {
        self.token.store(token.map(Arc::new));
    }

    pub fn has_token(&self) -> bool {
        self.token.load().is_some()
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http_client.request(method, self.url(path));
        match self.token.load_full() {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.send(Method::GET, path, self.request(Method::GET, path).query(query)).await?;
        Self::decode(response).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T> {
        let mut builder = self.request(Method::POST, path).query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = self.send(Method::POST, path, builder).await?;
        Self::decode(response).await
    }

    /// POST whose response body carries nothing we need.
    pub(crate) async fn post_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let builder = self.request(Method::POST, path).json(body);
        self.send(Method::POST, path, builder).await?;
        Ok(())
    }

    pub(crate) async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let builder = self.request(Method::PATCH, path).json(body);
        let response = self.send(Method::PATCH, path, builder).await?;
        Self::decode(response).await
    }

    pub(crate) async fn patch_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let builder = self.request(Method::PATCH, path).json(body);
        self.send(Method::PATCH, path, builder).await?;
        Ok(())
    }

    pub(crate) async fn delete_unit(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await.map_err(|e| {
            warn!("{} {} failed without a response: {}", method, path, e);
            ClientError::Transport(e)
        })?;

        let status = response.status();
        debug!("{} {} -> {}", method, path, status.as_u16());

        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("{} {} -> {}: error body unreadable: {}", method, path, status.as_u16(), e);
                String::new()
            }
        };
        Err(ClientError::Server {
            status: status.as_u16(),
            detail: extract_detail(&body),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await?;
        // Some endpoints answer "no such thing" with an empty 200.
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        Ok(serde_json::from_str(body)?)
    }
}

/// Pull a readable message out of an error body: the `detail` field of a
/// JSON object when it is a string, otherwise the first `msg` of a
/// validation error list, otherwise the raw text.
pub(crate) fn extract_detail(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return Some(detail.clone()),
            Some(serde_json::Value::Array(items)) => {
                if let Some(msg) = items.iter().find_map(|item| item.get("msg").and_then(|m| m.as_str())) {
                    return Some(msg.to_string());
                }
            }
            _ => {}
        }
    }

    Some(trimmed.to_string())
}

/// Percent-encode one path segment.
pub(crate) fn seg(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}
