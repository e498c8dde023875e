//! Shared test doubles for the integration tests
//!
//! `MockDesignService` answers every call in-process. Responses can be
//! scripted per call; otherwise it produces plausible defaults (a full grid
//! of tagged images for generate, every item accepted for publish).

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::Notify;

use design_service_types::{
    BatchItemResult, CatalogRecord, GenerateRequest, GenerateResponse, GenerationMetadata,
    PublishBatchRequest, PublishBatchResponse, PublishPayload, PublishResponse, RawArtifact,
    TweakRequest, TweakResponse,
};
use design_wizard::client::{DesignService, ServiceError, ServiceResult};
use design_wizard::{CatalogService, WizardConfig, WizardSession};

/// How a scripted generate call behaves.
pub enum GenerateScript {
    Respond(ServiceResult<GenerateResponse>),
    /// Never completes
    Hang,
}

#[derive(Default)]
pub struct MockDesignService {
    catalog: Mutex<VecDeque<ServiceResult<Vec<CatalogRecord>>>>,
    default_catalog: Mutex<Vec<CatalogRecord>>,
    generate: Mutex<VecDeque<GenerateScript>>,
    tweak: Mutex<VecDeque<ServiceResult<TweakResponse>>>,
    batch: Mutex<VecDeque<ServiceResult<PublishBatchResponse>>>,
    failing_publish_urls: Mutex<HashSet<String>>,

    /// Held by the next generate call until notified
    pub generate_gate: Mutex<Option<Arc<Notify>>>,
    pub generate_started: Notify,

    pub catalog_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub tweak_calls: AtomicUsize,
    pub publish_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,

    pub generate_requests: Mutex<Vec<GenerateRequest>>,
    pub tweak_requests: Mutex<Vec<TweakRequest>>,
    pub published: Mutex<Vec<PublishPayload>>,
    pub batches: Mutex<Vec<PublishBatchRequest>>,
}

impl MockDesignService {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        let mock = Self::default();
        *mock.default_catalog.lock().unwrap() = records;
        mock
    }

    pub fn push_catalog(&self, result: ServiceResult<Vec<CatalogRecord>>) {
        self.catalog.lock().unwrap().push_back(result);
    }

    pub fn set_catalog(&self, records: Vec<CatalogRecord>) {
        *self.default_catalog.lock().unwrap() = records;
    }

    pub fn push_generate(&self, script: GenerateScript) {
        self.generate.lock().unwrap().push_back(script);
    }

    pub fn push_tweak(&self, result: ServiceResult<TweakResponse>) {
        self.tweak.lock().unwrap().push_back(result);
    }

    pub fn push_batch(&self, result: ServiceResult<PublishBatchResponse>) {
        self.batch.lock().unwrap().push_back(result);
    }

    pub fn fail_publish_of(&self, url: &str) {
        self.failing_publish_urls.lock().unwrap().insert(url.to_string());
    }

    /// Make the next generate call wait until the returned handle is notified.
    pub fn gate_next_generate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.generate_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Grid of tagged images for a request, unique per call.
pub fn grid_response(call: usize, bases: u32, variations: u32) -> GenerateResponse {
    let images = (1..=bases)
        .flat_map(|b| {
            (1..=variations).map(move |v| {
                RawArtifact::Detailed(design_service_types::ArtifactRecord {
                    url: format!("https://cdn.example.com/designs/{call}/{b}-{v}.png?sig=s{call}"),
                    base_design: Some(b),
                    variation: Some(v),
                    dominant_color: Some("#AA3300".into()),
                    extra: Default::default(),
                })
            })
        })
        .collect();

    GenerateResponse {
        images: Some(images),
        ..Default::default()
    }
}

#[async_trait]
impl DesignService for MockDesignService {
    async fn fetch_catalog(&self) -> ServiceResult<Vec<CatalogRecord>> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.catalog.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(self.default_catalog.lock().unwrap().clone()))
    }

    async fn generate(&self, request: &GenerateRequest) -> ServiceResult<GenerateResponse> {
        let call = self.generate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.generate_requests.lock().unwrap().push(request.clone());
        self.generate_started.notify_one();

        let gate = self.generate_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let scripted = self.generate.lock().unwrap().pop_front();
        match scripted {
            Some(GenerateScript::Respond(result)) => result,
            Some(GenerateScript::Hang) => std::future::pending().await,
            None => {
                let mut response = grid_response(
                    call,
                    request.num_base_designs,
                    request.num_variations_per_base,
                );
                response.metadata = Some(GenerationMetadata {
                    brand: Some(request.brand.clone()),
                    category: Some(request.category.clone()),
                    department: Some(request.department.clone()),
                    sub_department: Some(request.sub_department.clone()),
                    release_date: Some(request.date.clone()),
                    extra: Default::default(),
                });
                Ok(response)
            }
        }
    }

    async fn tweak(&self, request: &TweakRequest) -> ServiceResult<TweakResponse> {
        let call = self.tweak_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.tweak_requests.lock().unwrap().push(request.clone());
        let scripted = self.tweak.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(TweakResponse {
                tweaked_image_url: Some(format!(
                    "https://cdn.example.com/tweaks/{call}.png?sig=t{call}"
                )),
            })
        })
    }

    async fn publish(&self, payload: &PublishPayload) -> ServiceResult<PublishResponse> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_publish_urls
            .lock()
            .unwrap()
            .contains(&payload.image_url)
        {
            return Err(ServiceError::ServerError {
                status: 500,
                message: "lark unavailable".into(),
            });
        }
        self.published.lock().unwrap().push(payload.clone());
        Ok(PublishResponse {
            success: Some(true),
            message: None,
        })
    }

    async fn publish_batch(
        &self,
        request: &PublishBatchRequest,
    ) -> ServiceResult<PublishBatchResponse> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(request.clone());
        let scripted = self.batch.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(PublishBatchResponse {
                succeeded: Some(request.variations.len()),
                failed: Some(0),
                results: request
                    .variations
                    .iter()
                    .enumerate()
                    .map(|(i, _)| BatchItemResult {
                        index: Some(i),
                        image_url: None,
                        success: true,
                        error: None,
                    })
                    .collect(),
                errors: Vec::new(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn fashion_catalog() -> Vec<CatalogRecord> {
    vec![
        CatalogRecord::new("Nike", "T-Shirt", "Men", "Casual")
            .with_description("Athletic apparel and footwear"),
        CatalogRecord::new("Zara", "Dress", "Ladies", "Formal")
            .with_description("Fast fashion retailer"),
    ]
}

/// A date the engine will accept as not in the past.
pub fn future_date() -> NaiveDate {
    Utc::now().date_naive() + Duration::days(30)
}

pub struct Harness {
    pub mock: Arc<MockDesignService>,
    pub catalog: Arc<CatalogService>,
    pub session: Arc<WizardSession>,
}

pub async fn harness(records: Vec<CatalogRecord>) -> Harness {
    harness_with(records, WizardConfig::default()).await
}

pub async fn harness_with(records: Vec<CatalogRecord>, config: WizardConfig) -> Harness {
    let mock = Arc::new(MockDesignService::new(records));
    let service: Arc<dyn DesignService> = mock.clone();
    let catalog = Arc::new(CatalogService::new(service.clone(), config.script.clone()).unwrap());
    catalog.load().await.unwrap();
    let session = Arc::new(WizardSession::new(catalog.clone(), service, &config).await);
    Harness {
        mock,
        catalog,
        session,
    }
}

impl Harness {
    pub async fn node(&self) -> String {
        self.session.view().await.unwrap().node.node_id
    }

    pub async fn options(&self) -> Vec<String> {
        self.session
            .view()
            .await
            .unwrap()
            .node
            .options
            .into_iter()
            .map(|o| o.text)
            .collect()
    }

    pub async fn choose(&self, text: &str) -> design_wizard::StepOutcome {
        let node = self.node().await;
        self.session.choose_option(&node, text).await.unwrap()
    }

    /// Walk brand → sub-department by label, then answer date and counts,
    /// ending on the result node.
    pub async fn walk_to_result(&self, path: [&str; 4], designs: u32, variations: u32) {
        for step in path {
            self.choose(step).await;
        }
        self.session.submit_date(future_date()).await.unwrap();
        self.session.submit_number(designs).await.unwrap();
        self.session.submit_number(variations).await.unwrap();
    }

    /// Walk to the result node and generate.
    pub async fn generated(&self, designs: u32, variations: u32) {
        self.walk_to_result(["Nike", "T-Shirt", "Men", "Casual"], designs, variations)
            .await;
        self.choose("Generate Design").await;
    }
}
