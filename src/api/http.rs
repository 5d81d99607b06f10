//! HTTP implementation of [`PoolClient`] on top of reqwest

use crate::api::models::{
    ApiResponse, FetchRequest, ProxyQuery, ProxySnapshot, RotationMode, RotationModeRequest,
    ServerStatus, StartServiceRequest,
};
use crate::api::PoolClient;
use crate::proxy::ProxyRecord;
use crate::Result;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default base URL of the pool API
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000/api";

/// Default timeout for API requests in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Pool client speaking JSON over HTTP
#[derive(Debug, Clone)]
pub struct HttpPoolClient {
    client: Client,
    base_url: String,
}

impl HttpPoolClient {
    /// Create a client for `base_url` with the given request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(anyhow!("request timeout must be greater than zero"));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and decode the response envelope
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<ApiResponse<T>> {
        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", path))?;

        let status = response.status();
        debug!(path, %status, "pool API responded");
        if !status.is_success() {
            return Err(anyhow!("{} returned HTTP status: {}", path, status));
        }

        response
            .json::<ApiResponse<T>>()
            .await
            .with_context(|| format!("malformed response from {}", path))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        self.send(self.client.get(self.endpoint(path)), path).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        self.send(self.client.post(self.endpoint(path)), path).await
    }

    /// POST a JSON body and keep only the backend message
    async fn post_json<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        let request = self.client.post(self.endpoint(path)).json(body);
        let (message, _) = self
            .send::<serde_json::Value>(request, path)
            .await?
            .into_result()?;
        Ok(message)
    }
}

#[async_trait]
impl PoolClient for HttpPoolClient {
    async fn fetch_proxies(&self, query: &ProxyQuery) -> Result<ProxySnapshot> {
        let request = self.client.get(self.endpoint("proxies")).query(query);
        self.send::<ProxySnapshot>(request, "proxies")
            .await?
            .into_data()
    }

    async fn start_service(&self, request: &StartServiceRequest) -> Result<String> {
        self.post_json("server/start", request).await
    }

    async fn stop_service(&self) -> Result<String> {
        let (message, _) = self
            .post::<serde_json::Value>("server/stop")
            .await?
            .into_result()?;
        Ok(message)
    }

    async fn server_status(&self) -> Result<ServerStatus> {
        self.get::<ServerStatus>("server/status").await?.into_data()
    }

    async fn rotate(&self) -> Result<Option<ProxyRecord>> {
        let (_, data) = self.post::<ProxyRecord>("proxy/rotate").await?.into_result()?;
        Ok(data)
    }

    async fn fetch_logs(&self) -> Result<Vec<String>> {
        let (_, data) = self.get::<Vec<String>>("proxy/logs").await?.into_result()?;
        Ok(data.unwrap_or_default())
    }

    async fn trigger_fetch(&self, request: &FetchRequest) -> Result<String> {
        self.post_json("proxy/fetch", request).await
    }

    async fn set_rotation_mode(&self, mode: RotationMode) -> Result<String> {
        self.post_json("server/set_rotation_mode", &RotationModeRequest::from(mode))
            .await
    }

    async fn remove_proxy(&self, address: &str) -> Result<String> {
        let path = format!("proxy/{}", address);
        let request = self.client.delete(self.endpoint(&path));
        let (message, _) = self
            .send::<serde_json::Value>(request, &path)
            .await?
            .into_result()?;
        Ok(message)
    }
}
