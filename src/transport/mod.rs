//! Transport seam between the engine and the projection server.
//!
//! The [`Projector`](crate::Projector) never talks HTTP directly; it calls a
//! [`ProjectionTransport`]. The default implementation is
//! [`HttpTransport`] (feature `http`). Tests and embedders can supply their
//! own, for example an in-memory server.
//!
//! # Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use embedscope::transport::ProjectionTransport;
//! use embedscope::protocol::*;
//! use embedscope::TransportError;
//!
//! struct Recorded { payload: ProjectionResponse }
//!
//! #[async_trait]
//! impl ProjectionTransport for Recorded {
//!     async fn update_projection(&self, _: &ProjectionRequest)
//!         -> Result<ProjectionResponse, TransportError> {
//!         Ok(self.payload.clone())
//!     }
//!     // ...
//! }
//! ```

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::protocol::{
    ProjectionRequest, ProjectionResponse, QueryRequest, QueryResponse, RetrainRequest,
    SpriteRequest,
};

/// Client side of the four server endpoints.
///
/// Implementations must be thread-safe; the projector calls them without
/// holding any engine lock. A response is returned as decoded, without any
/// schema check: validation happens in the engine.
#[async_trait]
pub trait ProjectionTransport: Send + Sync {
    /// `POST /updateProjection`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request fails, the server answers
    /// with a non-success status, or the body cannot be decoded.
    async fn update_projection(
        &self,
        request: &ProjectionRequest,
    ) -> Result<ProjectionResponse, TransportError>;

    /// `POST /query`.
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, TransportError>;

    /// `POST /al_train`.
    async fn al_train(&self, request: &RetrainRequest)
        -> Result<ProjectionResponse, TransportError>;

    /// `GET /sprite`. The payload is opaque to the engine.
    async fn sprite(&self, request: &SpriteRequest) -> Result<serde_json::Value, TransportError>;
}

#[async_trait]
impl<T: ProjectionTransport + ?Sized> ProjectionTransport for Arc<T> {
    async fn update_projection(
        &self,
        request: &ProjectionRequest,
    ) -> Result<ProjectionResponse, TransportError> {
        (**self).update_projection(request).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, TransportError> {
        (**self).query(request).await
    }

    async fn al_train(
        &self,
        request: &RetrainRequest,
    ) -> Result<ProjectionResponse, TransportError> {
        (**self).al_train(request).await
    }

    async fn sprite(&self, request: &SpriteRequest) -> Result<serde_json::Value, TransportError> {
        (**self).sprite(request).await
    }
}
