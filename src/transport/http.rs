//! `reqwest`-backed transport.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::ProjectionTransport;
use crate::config::Config;
use crate::error::{ProjectorError, Result, TransportError};
use crate::protocol::{
    ProjectionRequest, ProjectionResponse, QueryRequest, QueryResponse, RetrainRequest,
    SpriteRequest, AL_TRAIN, QUERY, SPRITE, UPDATE_PROJECTION,
};

/// JSON-over-HTTP transport.
///
/// Every request uses the configured timeout. Non-2xx responses become
/// [`TransportError::Status`]; nothing is retried.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a transport for `config.server_url`.
    ///
    /// # Errors
    ///
    /// Returns `ProjectorError::Config` if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ProjectorError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> std::result::Result<R, TransportError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        debug!(endpoint = path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::request(path, e))?;
        decode(path, response).await
    }
}

async fn decode<R: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> std::result::Result<R, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::status(path, status.as_u16()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| TransportError::request(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| TransportError::decode(path, e))
}

#[async_trait]
impl ProjectionTransport for HttpTransport {
    async fn update_projection(
        &self,
        request: &ProjectionRequest,
    ) -> std::result::Result<ProjectionResponse, TransportError> {
        self.post(UPDATE_PROJECTION, request).await
    }

    async fn query(
        &self,
        request: &QueryRequest,
    ) -> std::result::Result<QueryResponse, TransportError> {
        self.post(QUERY, request).await
    }

    async fn al_train(
        &self,
        request: &RetrainRequest,
    ) -> std::result::Result<ProjectionResponse, TransportError> {
        self.post(AL_TRAIN, request).await
    }

    async fn sprite(
        &self,
        request: &SpriteRequest,
    ) -> std::result::Result<serde_json::Value, TransportError> {
        debug!(endpoint = SPRITE, index = request.index, "GET");
        let response = self
            .client
            .get(self.url(SPRITE))
            .query(request)
            .send()
            .await
            .map_err(|e| TransportError::request(SPRITE, e))?;
        decode(SPRITE, response).await
    }
}
