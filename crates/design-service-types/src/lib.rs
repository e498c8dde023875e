//! Design Service wire types
//!
//! This crate is the SINGLE SOURCE OF TRUTH for every type crossing the
//! Design Service HTTP boundary.
//!
//! ## Boundaries
//!
//! ```text
//! ┌──────────────────┐         ┌──────────────────┐
//! │  design-wizard   │  JSON   │  Design Service  │
//! │  (orchestrator)  │ ◄─────► │  (/db/*)         │
//! └──────────────────┘         └──────────────────┘
//! ```
//!
//! ## Rules
//!
//! 1. Requests are strict: camelCase, no optional noise (`skip_serializing_if`)
//! 2. Responses are lenient: every field defaults, historical names are aliases
//! 3. No behaviour here beyond (de)serialization helpers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// CATALOG
// ============================================================================

/// One flat row of the catalog (`GET /db/maintenance`).
///
/// Field names follow the current service naming; the `U_` prefixed names
/// from older deployments are accepted as aliases. Any dimension may be
/// missing or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    #[serde(
        rename = "Brand",
        alias = "U_Brand",
        alias = "brand",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub brand: Option<String>,

    #[serde(
        rename = "Category",
        alias = "U_Category",
        alias = "category",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,

    #[serde(
        rename = "Department",
        alias = "U_Department",
        alias = "department",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub department: Option<String>,

    #[serde(
        rename = "SubDepartment",
        alias = "U_SubDepartment",
        alias = "subDepartment",
        alias = "sub_department",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sub_department: Option<String>,

    #[serde(
        rename = "BrandDescription",
        alias = "U_BrandDescription",
        alias = "Description",
        alias = "brandDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub brand_description: Option<String>,
}

impl CatalogRecord {
    /// Convenience constructor for a fully populated row.
    pub fn new(
        brand: impl Into<String>,
        category: impl Into<String>,
        department: impl Into<String>,
        sub_department: impl Into<String>,
    ) -> Self {
        Self {
            brand: Some(brand.into()),
            category: Some(category.into()),
            department: Some(department.into()),
            sub_department: Some(sub_department.into()),
            brand_description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.brand_description = Some(description.into());
        self
    }
}

/// Body of `GET /db/maintenance`: a bare array, or wrapped in `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogResponse {
    Records(Vec<CatalogRecord>),
    Wrapped { data: Vec<CatalogRecord> },
}

impl CatalogResponse {
    pub fn into_records(self) -> Vec<CatalogRecord> {
        match self {
            CatalogResponse::Records(records) | CatalogResponse::Wrapped { data: records } => {
                records
            }
        }
    }
}

// ============================================================================
// GENERATE
// ============================================================================

/// Body of `POST /db/generate-design`.
///
/// Skipped dimensions are sent as the literal `"Any"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Target release date, `YYYY-MM-DD`
    pub date: String,
    pub brand: String,
    pub category: String,
    pub department: String,
    pub sub_department: String,
    pub num_base_designs: u32,
    pub num_variations_per_base: u32,
    /// Stored description of the brand (empty when the brand is `Any`)
    #[serde(default)]
    pub brand_description: String,
}

/// Response of `POST /db/generate-design`.
///
/// The service has shipped several shapes over time; exactly one of
/// `designs`, `images`, `image_url` or `image_urls` is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    /// Explicit grouping, one entry per base design
    #[serde(
        default,
        alias = "groupedImages",
        alias = "baseDesigns",
        skip_serializing_if = "Option::is_none"
    )]
    pub designs: Option<Vec<RawDesignGroup>>,

    /// Flat artifact list, optionally tagged with a base-design index
    #[serde(
        default,
        alias = "variations",
        alias = "artifacts",
        skip_serializing_if = "Option::is_none"
    )]
    pub images: Option<Vec<RawArtifact>>,

    /// Legacy single-image response
    #[serde(
        default,
        alias = "url",
        alias = "image_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,

    /// Legacy multi-image response (bare URLs)
    #[serde(
        default,
        alias = "image_urls",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_urls: Option<Vec<String>>,

    /// Selection fields as resolved by the service (may differ from the request)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GenerationMetadata>,
}

/// An artifact as the service sends it: either a bare URL or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawArtifact {
    Url(String),
    Detailed(ArtifactRecord),
}

impl RawArtifact {
    pub fn url(&self) -> &str {
        match self {
            RawArtifact::Url(url) => url,
            RawArtifact::Detailed(record) => &record.url,
        }
    }

    /// Base-design tag, when the service grouped its output
    pub fn base_design(&self) -> Option<u32> {
        match self {
            RawArtifact::Url(_) => None,
            RawArtifact::Detailed(record) => record.base_design,
        }
    }
}

/// Detailed artifact object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRecord {
    #[serde(alias = "imageUrl", alias = "image_url")]
    pub url: String,

    #[serde(
        default,
        alias = "baseDesignIndex",
        alias = "base_design",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_design: Option<u32>,

    #[serde(
        default,
        alias = "variationNumber",
        alias = "variationIndex",
        skip_serializing_if = "Option::is_none"
    )]
    pub variation: Option<u32>,

    #[serde(
        default,
        alias = "dominant_color",
        skip_serializing_if = "Option::is_none"
    )]
    pub dominant_color: Option<String>,

    /// Anything else the service attached (prompt, seed, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One explicit base-design group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDesignGroup {
    #[serde(
        default,
        alias = "baseDesignIndex",
        alias = "index",
        skip_serializing_if = "Option::is_none"
    )]
    pub base_design: Option<u32>,

    #[serde(default, alias = "images")]
    pub variations: Vec<RawArtifact>,
}

/// Selection echo returned with a generate response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_department: Option<String>,
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// TWEAK
// ============================================================================

/// Body of `POST /db/tweak-design`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweakRequest {
    pub image_url: String,
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_design: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweakResponse {
    #[serde(
        default,
        alias = "imageUrl",
        alias = "url",
        skip_serializing_if = "Option::is_none"
    )]
    pub tweaked_image_url: Option<String>,
}

// ============================================================================
// PUBLISH
// ============================================================================

/// One design as submitted to the publish endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishPayload {
    pub image_url: String,
    pub brand: String,
    pub category: String,
    pub department: String,
    pub sub_department: String,
    pub release_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_design: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    /// Absent means the service did not say otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `POST /db/add-to-lark/batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishBatchRequest {
    pub variations: Vec<PublishPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishBatchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(default)]
    pub results: Vec<BatchItemResult>,
    #[serde(default)]
    pub errors: Vec<BatchItemError>,
}

/// Per-item outcome in a batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(
        default,
        alias = "url",
        alias = "image_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    pub success: bool,
    #[serde(default, alias = "message", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-item error. Older deployments send bare strings, which cannot be
/// attributed to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItemError {
    Message(String),
    Detailed {
        #[serde(default)]
        index: Option<usize>,
        #[serde(default, alias = "imageUrl", alias = "url")]
        image_url: Option<String>,
        #[serde(default, alias = "message")]
        error: Option<String>,
    },
}

impl BatchItemError {
    pub fn index(&self) -> Option<usize> {
        match self {
            BatchItemError::Message(_) => None,
            BatchItemError::Detailed { index, .. } => *index,
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            BatchItemError::Message(_) => None,
            BatchItemError::Detailed { image_url, .. } => image_url.as_deref(),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            BatchItemError::Message(message) => Some(message),
            BatchItemError::Detailed { error, .. } => error.as_deref(),
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Error body the service returns with non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ServiceErrorBody {
    /// Best human-readable description, if any.
    pub fn description(&self) -> Option<&str> {
        self.message.as_deref().or(self.error.as_deref())
    }
}
