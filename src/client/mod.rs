//! Design Service boundary
//!
//! `DesignService` is the only way the wizard talks to the outside world.
//! `HttpDesignService` implements it over reqwest; tests plug in
//! in-process doubles.

mod http;

use async_trait::async_trait;
use thiserror::Error;

use design_service_types::{
    CatalogRecord, GenerateRequest, GenerateResponse, PublishBatchRequest, PublishBatchResponse,
    PublishPayload, PublishResponse, TweakRequest, TweakResponse,
};

pub use http::HttpDesignService;

/// Classified Design Service failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Request timed out")]
    Timeout,

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Design service is unreachable")]
    NetworkUnreachable,

    /// Request rejected before it was sent
    #[error("Invalid request: {0}")]
    ClientError(String),

    #[error("Unexpected response: {0}")]
    Unknown(String),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Timeout => "timeout",
            ServiceError::ServerError { .. } => "server_error",
            ServiceError::NetworkUnreachable => "network_unreachable",
            ServiceError::ClientError(_) => "client_error",
            ServiceError::Unknown(_) => "unknown",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[async_trait]
pub trait DesignService: Send + Sync {
    /// Flat catalog rows.
    async fn fetch_catalog(&self) -> ServiceResult<Vec<CatalogRecord>>;

    async fn generate(&self, request: &GenerateRequest) -> ServiceResult<GenerateResponse>;

    async fn tweak(&self, request: &TweakRequest) -> ServiceResult<TweakResponse>;

    /// Publish one design. `success: false` in the body is reported as an error.
    async fn publish(&self, payload: &PublishPayload) -> ServiceResult<PublishResponse>;

    /// Publish several designs in one call; per-item outcome is in the body.
    async fn publish_batch(
        &self,
        request: &PublishBatchRequest,
    ) -> ServiceResult<PublishBatchResponse>;
}
