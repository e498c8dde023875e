//! Catalog snapshot ownership
//!
//! `CatalogService` owns the current index and the dialog graph generated
//! from it. A reload builds a complete new snapshot off to the side and
//! swaps it in with one write; readers holding the previous `Arc` keep a
//! consistent view until they drop it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use super::CatalogIndex;
use crate::client::{DesignService, ServiceError};
use crate::config::ScriptConfig;
use crate::script::{ScriptError, ScriptGraph};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to fetch catalog: {0}")]
    Fetch(#[from] ServiceError),

    #[error("Failed to build dialog graph: {0}")]
    Graph(#[from] ScriptError),
}

/// Immutable catalog state at one point in time.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub index: CatalogIndex,
    pub graph: Arc<ScriptGraph>,
    pub loaded_at: DateTime<Utc>,
    pub record_count: usize,
}

impl CatalogSnapshot {
    pub fn build(
        index: CatalogIndex,
        record_count: usize,
        script: &ScriptConfig,
    ) -> Result<Self, ScriptError> {
        let graph = ScriptGraph::generate(&index, script)?;
        Ok(Self {
            index,
            graph: Arc::new(graph),
            loaded_at: Utc::now(),
            record_count,
        })
    }
}

pub struct CatalogService {
    service: Arc<dyn DesignService>,
    script: ScriptConfig,
    current: RwLock<Arc<CatalogSnapshot>>,
}

impl CatalogService {
    /// Create a service holding an empty snapshot. Call [`load`](Self::load)
    /// to fetch the real catalog.
    pub fn new(service: Arc<dyn DesignService>, script: ScriptConfig) -> Result<Self, CatalogError> {
        let empty = CatalogSnapshot::build(CatalogIndex::default(), 0, &script)?;
        Ok(Self {
            service,
            script,
            current: RwLock::new(Arc::new(empty)),
        })
    }

    pub fn script_config(&self) -> &ScriptConfig {
        &self.script
    }

    /// Fetch the catalog and swap in a fresh snapshot.
    ///
    /// On failure the previous snapshot stays current.
    pub async fn load(&self) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        let records = match self.service.fetch_catalog().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "Catalog fetch failed, keeping previous snapshot");
                return Err(e.into());
            }
        };

        let index = CatalogIndex::from_records(&records);
        let snapshot = Arc::new(CatalogSnapshot::build(index, records.len(), &self.script)?);

        tracing::info!(
            records = snapshot.record_count,
            brands = snapshot.index.brand_count(),
            nodes = snapshot.graph.len(),
            "Catalog loaded"
        );

        *self.current.write().await = snapshot.clone();
        Ok(snapshot)
    }

    pub async fn current(&self) -> Arc<CatalogSnapshot> {
        self.current.read().await.clone()
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("script", &self.script)
            .finish_non_exhaustive()
    }
}
