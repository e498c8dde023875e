//! Design Wizard - catalog-driven conversation engine
//!
//! Walks a user through brand → category → department → sub-department,
//! collects a release date and design/variation counts, then drives
//! generate / edit / publish actions against the Design Service.
//!
//! ## Call chain
//!
//! ```text
//! DesignService::fetch_catalog ─► CatalogIndex ─► ScriptGraph
//!                                                     │
//!            user intent ─► WizardSession ─► Conversation (state machine)
//!                                 │                   ▲
//!                                 ▼                   │ ticketed results
//!                          ActionOrchestrator ────────┘
//!                                 │
//!                                 ▼
//!                           DesignService
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use design_wizard::{CatalogService, HttpDesignService, WizardConfig, WizardSession};
//!
//! # async fn run() -> Result<(), design_wizard::WizardError> {
//! let config = WizardConfig::from_env()?;
//! let service = Arc::new(HttpDesignService::new(&config.service)?);
//! let catalog = Arc::new(CatalogService::new(service.clone(), config.script.clone())?);
//! catalog.load().await?;
//!
//! let session = WizardSession::new(catalog, service, &config).await;
//! let view = session.view().await?;
//! println!("{:?}", view.node.message);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Configuration (YAML + environment overrides)
pub mod config;

// Catalog snapshot: flat records -> nested index, owned by CatalogService
pub mod catalog;

// Dialog graph generated from a catalog snapshot
pub mod script;

// Generated artifacts and their grouping
pub mod design;

// Conversation state machine: selection, history, transitions
pub mod conversation;

// Design Service boundary (trait + HTTP implementation)
pub mod client;

// Side-effecting actions: generate, edit, publish
pub mod actions;

// Presentation-facing facade
pub mod session;

pub use actions::{ActionOrchestrator, ActionOutcome, BatchReport, PublishState};
pub use catalog::{CatalogIndex, CatalogService, CatalogSnapshot};
pub use client::{DesignService, HttpDesignService, ServiceError};
pub use config::WizardConfig;
pub use conversation::{Conversation, HistoryEntry, NodeView, Selection, Transition};
pub use design::{ArtifactLocation, Design, DesignArtifact};
pub use error::{WizardError, WizardResult};
pub use script::{ScriptGraph, ScriptNode};
pub use session::{SessionView, StepOutcome, WizardSession};
