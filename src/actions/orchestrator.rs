//! Action orchestrator
//!
//! Runs generate, edit and publish against the Design Service and feeds the
//! results back into the conversation.
//!
//! ## Call shape
//!
//! ```text
//! lock conversation ─► validate, build request, take ticket ─► unlock
//!        │
//!        ▼
//! service call (bounded by the action deadline)
//!        │
//!        ▼
//! lock conversation ─► apply result if the ticket is still current ─► unlock
//! ```
//!
//! The conversation lock is never held across a service call. Publish
//! successes are recorded even when the ticket went stale, since the
//! service has already accepted them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use design_service_types::{
    GenerateRequest, GenerationMetadata, PublishBatchRequest, PublishPayload, TweakRequest,
};

use super::error::{failure_message, ActionError};
use super::normalize::normalize_generate_response;
use super::publish::{canonical_key, resolve_batch_outcome, BatchReport, PublishState};
use crate::catalog::CatalogService;
use crate::client::{DesignService, ServiceError, ServiceResult};
use crate::conversation::{ActionFamily, Conversation, Dimension, Selection};
use crate::design::{artifact_count, ArtifactLocation, DesignArtifact};
use crate::script::DESIGN_ERROR_NODE;

/// What an action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Generated { artifacts: usize },
    Edited { old_url: String, new_url: String },
    Published { url: String },
    PublishedBatch(BatchReport),
    /// The service call failed; one bot entry was recorded
    Failed(ServiceError),
    /// The conversation moved on before the result arrived
    Discarded,
}

pub struct ActionOrchestrator {
    service: Arc<dyn DesignService>,
    conversation: Arc<Mutex<Conversation>>,
    catalog: Arc<CatalogService>,
    publish_state: RwLock<PublishState>,
    /// Metadata of the last successful generate, tagged with its session epoch
    last_metadata: Mutex<Option<(u64, GenerationMetadata)>>,
    deadline: Duration,
}

impl ActionOrchestrator {
    pub fn new(
        service: Arc<dyn DesignService>,
        conversation: Arc<Mutex<Conversation>>,
        catalog: Arc<CatalogService>,
        deadline: Duration,
    ) -> Self {
        Self {
            service,
            conversation,
            catalog,
            publish_state: RwLock::new(PublishState::new()),
            last_metadata: Mutex::new(None),
            deadline,
        }
    }

    pub async fn publish_state(&self) -> PublishState {
        self.publish_state.read().await.clone()
    }

    pub async fn is_published(&self, url: &str) -> bool {
        self.publish_state.read().await.is_published(url)
    }

    async fn bounded<T>(&self, call: impl Future<Output = ServiceResult<T>>) -> ServiceResult<T> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(deadline_secs = self.deadline.as_secs(), "Action deadline exceeded");
                Err(ServiceError::Timeout)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Generate
    // -----------------------------------------------------------------------

    /// Generate designs for the current selection.
    pub async fn generate(&self) -> Result<ActionOutcome, ActionError> {
        let snapshot = self.catalog.current().await;

        let (ticket, request) = {
            let mut conv = self.conversation.lock().await;
            let request = build_generate_request(conv.selection(), |brand| {
                snapshot.index.brand_description(brand).map(String::from)
            });
            let ticket = conv.begin_action(ActionFamily::Generate)?;

            match request {
                Ok(request) => (ticket, request),
                Err(err) => {
                    tracing::warn!(error = %err, "Generate requested with incomplete selection");
                    conv.apply_failure(
                        &ticket,
                        failure_message(ActionFamily::Generate, &err),
                        Some(DESIGN_ERROR_NODE),
                    );
                    return Ok(ActionOutcome::Failed(err));
                }
            }
        };

        tracing::info!(
            brand = %request.brand,
            category = %request.category,
            base_designs = request.num_base_designs,
            variations = request.num_variations_per_base,
            "Generating designs"
        );

        let result = self
            .bounded(self.service.generate(&request))
            .await
            .and_then(|response| {
                let designs = normalize_generate_response(&response);
                if designs.is_empty() {
                    Err(ServiceError::Unknown("the response contained no designs".into()))
                } else {
                    Ok((designs, response.metadata.unwrap_or_default()))
                }
            });

        let mut conv = self.conversation.lock().await;
        match result {
            Ok((designs, metadata)) => {
                let artifacts = artifact_count(&designs);
                if !conv.apply_generation(&ticket, designs) {
                    return Ok(ActionOutcome::Discarded);
                }
                *self.last_metadata.lock().await = Some((ticket.session_epoch, metadata));
                tracing::info!(artifacts, "Designs generated");
                Ok(ActionOutcome::Generated { artifacts })
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind(), "Generate failed");
                let message = failure_message(ActionFamily::Generate, &err);
                if conv.apply_failure(&ticket, message, Some(DESIGN_ERROR_NODE)) {
                    Ok(ActionOutcome::Failed(err))
                } else {
                    Ok(ActionOutcome::Discarded)
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Edit
    // -----------------------------------------------------------------------

    /// Apply free-text edit instructions to a generated artifact.
    pub async fn edit(
        &self,
        url: &str,
        instructions: &str,
        hint: Option<ArtifactLocation>,
    ) -> Result<ActionOutcome, ActionError> {
        let (ticket, artifact) = {
            let mut conv = self.conversation.lock().await;
            let artifact = conv
                .find_artifact(url, hint)
                .cloned()
                .ok_or_else(|| ActionError::ArtifactNotFound(url.to_string()))?;
            let ticket = conv.begin_action(ActionFamily::Edit)?;

            if instructions.trim().is_empty() {
                let err = ServiceError::ClientError("edit instructions are empty".into());
                conv.apply_failure(&ticket, failure_message(ActionFamily::Edit, &err), None);
                return Ok(ActionOutcome::Failed(err));
            }
            (ticket, artifact)
        };

        let request = TweakRequest {
            image_url: artifact.url.clone(),
            instruction: instructions.trim().to_string(),
            base_design: artifact.base_design_index,
            variation: artifact.variation_index,
        };

        let result = self
            .bounded(self.service.tweak(&request))
            .await
            .and_then(|response| {
                response
                    .tweaked_image_url
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| ServiceError::Unknown("no edited image was returned".into()))
            });

        let mut conv = self.conversation.lock().await;
        match result {
            Ok(new_url) => {
                let location = hint.or_else(|| artifact.location());
                if !conv.apply_edit(&ticket, &artifact.url, &new_url, location) {
                    return Ok(ActionOutcome::Discarded);
                }
                tracing::info!(old = %artifact.url, new = %new_url, "Design edited");
                Ok(ActionOutcome::Edited {
                    old_url: artifact.url,
                    new_url,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind(), "Edit failed");
                let message = failure_message(ActionFamily::Edit, &err);
                if conv.apply_failure(&ticket, message, None) {
                    Ok(ActionOutcome::Failed(err))
                } else {
                    Ok(ActionOutcome::Discarded)
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Publish
    // -----------------------------------------------------------------------

    /// Publish one artifact. Already-published artifacts are rejected
    /// without a network call.
    pub async fn publish_one(&self, url: &str) -> Result<ActionOutcome, ActionError> {
        if self.is_published(url).await {
            return Err(ActionError::AlreadyPublished(url.to_string()));
        }
        let metadata = self.last_metadata.lock().await.clone();

        let (ticket, payload) = {
            let mut conv = self.conversation.lock().await;
            let artifact = conv
                .find_artifact(url, None)
                .cloned()
                .ok_or_else(|| ActionError::ArtifactNotFound(url.to_string()))?;
            let fields = PublishFields::resolve(&conv, metadata.as_ref());
            let ticket = conv.begin_action(ActionFamily::Publish)?;
            (ticket, fields.payload(&artifact))
        };

        let result = self.bounded(self.service.publish(&payload)).await;

        match result {
            Ok(_) => {
                self.publish_state.write().await.mark_published(&payload.image_url);
                tracing::info!(url = %payload.image_url, "Design added to Lark");
                self.conversation.lock().await.release(&ticket);
                Ok(ActionOutcome::Published {
                    url: payload.image_url,
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind(), "Publish failed");
                let message = failure_message(ActionFamily::Publish, &err);
                if self.conversation.lock().await.apply_failure(&ticket, message, None) {
                    Ok(ActionOutcome::Failed(err))
                } else {
                    Ok(ActionOutcome::Discarded)
                }
            }
        }
    }

    /// Publish several artifacts in one batch call.
    pub async fn publish_many(
        &self,
        artifacts: &[DesignArtifact],
    ) -> Result<ActionOutcome, ActionError> {
        let (remaining, skipped, duplicates) = {
            let state = self.publish_state.read().await;
            let mut seen = std::collections::HashSet::new();
            let mut remaining = Vec::new();
            let (mut skipped, mut duplicates) = (0, 0);
            for artifact in artifacts {
                if state.is_published(&artifact.url) {
                    skipped += 1;
                } else if seen.insert(canonical_key(&artifact.url)) {
                    remaining.push(artifact);
                } else {
                    duplicates += 1;
                }
            }
            (remaining, skipped, duplicates)
        };
        if remaining.is_empty() {
            return Err(ActionError::NothingToPublish);
        }

        let metadata = self.last_metadata.lock().await.clone();
        let (ticket, payloads) = {
            let mut conv = self.conversation.lock().await;
            let fields = PublishFields::resolve(&conv, metadata.as_ref());
            let payloads: Vec<PublishPayload> =
                remaining.iter().map(|a| fields.payload(a)).collect();
            let ticket = conv.begin_action(ActionFamily::Publish)?;
            (ticket, payloads)
        };

        tracing::info!(
            count = payloads.len(),
            skipped,
            duplicates,
            "Adding designs to Lark"
        );
        let request = PublishBatchRequest {
            variations: payloads,
        };
        let result = self.bounded(self.service.publish_batch(&request)).await;

        match result {
            Ok(response) => {
                let mut report = resolve_batch_outcome(&request.variations, &response);
                report.skipped_already_published = skipped;
                report.skipped_duplicates = duplicates;
                {
                    let mut state = self.publish_state.write().await;
                    for url in &report.newly_published {
                        state.mark_published(url);
                    }
                }

                tracing::info!(
                    submitted = report.submitted,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    "Batch publish finished"
                );

                let mut conv = self.conversation.lock().await;
                if report.failed > 0 {
                    conv.apply_failure(&ticket, report.summary(), None);
                } else {
                    conv.release(&ticket);
                }
                Ok(ActionOutcome::PublishedBatch(report))
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = err.kind(), "Batch publish failed");
                let message = failure_message(ActionFamily::Publish, &err);
                if self.conversation.lock().await.apply_failure(&ticket, message, None) {
                    Ok(ActionOutcome::Failed(err))
                } else {
                    Ok(ActionOutcome::Discarded)
                }
            }
        }
    }

    /// Publish every artifact of the newest design set that is not yet
    /// published.
    pub async fn publish_all_available(&self) -> Result<ActionOutcome, ActionError> {
        let artifacts: Vec<DesignArtifact> = {
            let conv = self.conversation.lock().await;
            conv.latest_designs()
                .iter()
                .flat_map(|d| d.variations.iter().cloned())
                .collect()
        };
        if artifacts.is_empty() {
            return Err(ActionError::NoArtifactSelected);
        }
        self.publish_many(&artifacts).await
    }
}

impl std::fmt::Debug for ActionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionOrchestrator")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Request building
// ---------------------------------------------------------------------------

/// Build the generate request. Fails with `ClientError` naming the missing
/// fields when the selection is incomplete.
fn build_generate_request(
    selection: &Selection,
    brand_description: impl Fn(&str) -> Option<String>,
) -> Result<GenerateRequest, ServiceError> {
    let missing = selection.missing_fields();
    let incomplete = || ServiceError::ClientError(format!("missing {}", missing.join(", ")));
    if !missing.is_empty() {
        return Err(incomplete());
    }
    let (Some(date), Some(num_base_designs), Some(num_variations_per_base)) = (
        selection.date,
        selection.num_base_designs,
        selection.num_variations_per_base,
    ) else {
        return Err(incomplete());
    };

    let brand = selection.dimension_label(Dimension::Brand).to_string();
    let description = selection
        .brand
        .as_ref()
        .and_then(|b| b.as_specific())
        .and_then(|b| brand_description(b))
        .unwrap_or_default();

    Ok(GenerateRequest {
        date: date.format("%Y-%m-%d").to_string(),
        brand,
        category: selection.dimension_label(Dimension::Category).to_string(),
        department: selection.dimension_label(Dimension::Department).to_string(),
        sub_department: selection.dimension_label(Dimension::SubDepartment).to_string(),
        num_base_designs,
        num_variations_per_base,
        brand_description: description,
    })
}

/// Catalog fields of a publish payload: last generate metadata first, live
/// selection as fallback, field by field.
struct PublishFields {
    brand: String,
    category: String,
    department: String,
    sub_department: String,
    release_date: String,
}

impl PublishFields {
    fn resolve(conv: &Conversation, metadata: Option<&(u64, GenerationMetadata)>) -> Self {
        let metadata = metadata
            .filter(|(epoch, _)| *epoch == conv.session_epoch())
            .map(|(_, m)| m);
        let selection = conv.selection();

        let pick = |echoed: Option<&String>, dimension: Dimension| {
            echoed
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| selection.dimension_label(dimension))
                .to_string()
        };

        Self {
            brand: pick(metadata.and_then(|m| m.brand.as_ref()), Dimension::Brand),
            category: pick(metadata.and_then(|m| m.category.as_ref()), Dimension::Category),
            department: pick(metadata.and_then(|m| m.department.as_ref()), Dimension::Department),
            sub_department: pick(
                metadata.and_then(|m| m.sub_department.as_ref()),
                Dimension::SubDepartment,
            ),
            release_date: metadata
                .and_then(|m| m.release_date.clone())
                .filter(|d| !d.trim().is_empty())
                .or_else(|| selection.date.map(|d| d.format("%Y-%m-%d").to_string()))
                .unwrap_or_default(),
        }
    }

    fn payload(&self, artifact: &DesignArtifact) -> PublishPayload {
        PublishPayload {
            image_url: artifact.url.clone(),
            brand: self.brand.clone(),
            category: self.category.clone(),
            department: self.department.clone(),
            sub_department: self.sub_department.clone(),
            release_date: self.release_date.clone(),
            dominant_color: artifact.dominant_color.clone(),
            base_design: artifact.base_design_index,
            variation: artifact.variation_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::DimensionValue;
    use chrono::NaiveDate;

    fn complete_selection() -> Selection {
        let mut selection = Selection::new();
        selection.date = NaiveDate::from_ymd_opt(2030, 3, 1);
        selection.set_dimension(Dimension::Brand, DimensionValue::value("Nike"));
        selection.set_dimension(Dimension::Category, DimensionValue::Any);
        selection.set_dimension(Dimension::Department, DimensionValue::value("Men"));
        selection.set_dimension(Dimension::SubDepartment, DimensionValue::Any);
        selection.num_base_designs = Some(3);
        selection.num_variations_per_base = Some(2);
        selection
    }

    #[test]
    fn test_generate_request_uses_any_and_description() {
        let request = build_generate_request(&complete_selection(), |brand| {
            (brand == "Nike").then(|| "Sportswear".to_string())
        })
        .unwrap();

        assert_eq!(request.date, "2030-03-01");
        assert_eq!(request.category, "Any");
        assert_eq!(request.sub_department, "Any");
        assert_eq!(request.brand_description, "Sportswear");
    }

    #[test]
    fn test_generate_request_any_brand_has_empty_description() {
        let mut selection = complete_selection();
        selection.set_dimension(Dimension::Brand, DimensionValue::Any);
        let request =
            build_generate_request(&selection, |_| Some("should not be used".into())).unwrap();
        assert_eq!(request.brand, "Any");
        assert_eq!(request.brand_description, "");
    }

    #[test]
    fn test_incomplete_selection_is_client_error() {
        let mut selection = complete_selection();
        selection.department = None;
        let err = build_generate_request(&selection, |_| None).unwrap_err();
        assert_eq!(err, ServiceError::ClientError("missing department".into()));
    }
}
