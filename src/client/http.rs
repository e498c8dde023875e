//! HTTP implementation of the Design Service

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use design_service_types::{
    CatalogRecord, CatalogResponse, GenerateRequest, GenerateResponse, PublishBatchRequest,
    PublishBatchResponse, PublishPayload, PublishResponse, ServiceErrorBody, TweakRequest,
    TweakResponse,
};

use super::{DesignService, ServiceError, ServiceResult};
use crate::config::{EndpointConfig, ServiceConfig};

pub struct HttpDesignService {
    client: Client,
    base_url: String,
    endpoints: EndpointConfig,
    api_key: Option<String>,
}

impl HttpDesignService {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceError::ClientError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ServiceResult<T> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request.send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Design service returned an error status");
            return Err(ServiceError::ServerError {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let bytes = response.bytes().await.map_err(classify)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::Unknown(format!("undecodable response body: {}", e)))
    }
}

/// Map a transport error onto the service taxonomy.
fn classify(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Timeout
    } else if err.is_connect() || err.is_request() {
        ServiceError::NetworkUnreachable
    } else if let Some(status) = err.status() {
        ServiceError::ServerError {
            status: status.as_u16(),
            message: err.to_string(),
        }
    } else {
        ServiceError::Unknown(err.to_string())
    }
}

/// Human-readable message from an error body: its `message`/`error` field,
/// else the raw text, else the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Some(description) = serde_json::from_str::<ServiceErrorBody>(body)
        .ok()
        .as_ref()
        .and_then(ServiceErrorBody::description)
    {
        return description.to_string();
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status.canonical_reason().unwrap_or("error").to_string()
}

#[async_trait]
impl DesignService for HttpDesignService {
    async fn fetch_catalog(&self) -> ServiceResult<Vec<CatalogRecord>> {
        let request = self.client.get(self.url(&self.endpoints.catalog));
        let response: CatalogResponse = self.send(request).await?;
        Ok(response.into_records())
    }

    async fn generate(&self, request: &GenerateRequest) -> ServiceResult<GenerateResponse> {
        tracing::info!(brand = %request.brand, base_designs = request.num_base_designs, "Requesting design generation");
        let request = self
            .client
            .post(self.url(&self.endpoints.generate))
            .json(request);
        self.send(request).await
    }

    async fn tweak(&self, request: &TweakRequest) -> ServiceResult<TweakResponse> {
        let request = self.client.post(self.url(&self.endpoints.tweak)).json(request);
        self.send(request).await
    }

    async fn publish(&self, payload: &PublishPayload) -> ServiceResult<PublishResponse> {
        let request = self
            .client
            .post(self.url(&self.endpoints.publish))
            .json(payload);
        let response: PublishResponse = self.send(request).await?;
        if response.success == Some(false) {
            return Err(ServiceError::ServerError {
                status: StatusCode::OK.as_u16(),
                message: response
                    .message
                    .unwrap_or_else(|| "publish was rejected".to_string()),
            });
        }
        Ok(response)
    }

    async fn publish_batch(
        &self,
        request: &PublishBatchRequest,
    ) -> ServiceResult<PublishBatchResponse> {
        let request = self
            .client
            .post(self.url(&self.endpoints.publish_batch))
            .json(request);
        self.send(request).await
    }
}

impl std::fmt::Debug for HttpDesignService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDesignService")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.api_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_body_fields() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, r#"{"error": "model overloaded"}"#),
            "model overloaded"
        );
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error": "bad", "message": "brand is required"}"#
            ),
            "brand is required"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, " upstream died "), "upstream died");
        assert_eq!(
            error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
            "Service Unavailable"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = ServiceConfig {
            base_url: "http://designs.local:8000/".into(),
            ..ServiceConfig::default()
        };
        let service = HttpDesignService::new(&config).unwrap();
        assert_eq!(
            service.url(&service.endpoints.generate),
            "http://designs.local:8000/db/generate-design"
        );
    }
}
