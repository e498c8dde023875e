//! Presentation-facing session facade
//!
//! One `WizardSession` per user conversation. It owns the conversation and
//! the orchestrator, turns user intents into engine transitions and runs
//! the dispatched actions. Presentation code only sees views and outcomes.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::actions::{ActionError, ActionOrchestrator, ActionOutcome, PublishState};
use crate::catalog::CatalogService;
use crate::client::DesignService;
use crate::config::WizardConfig;
use crate::conversation::{Conversation, HistoryEntry, NodeView, Selection, Transition};
use crate::design::{DesignArtifact, ViewedArtifact};
use crate::error::WizardResult;
use crate::script::SilentAction;

/// Everything a front end needs to render the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub node: NodeView,
    pub history: Vec<HistoryEntry>,
    pub selection: Selection,
    pub viewed: Option<ViewedArtifact>,
}

/// Result of one user intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced { from: String, to: String },
    Reset,
    /// Silent action ignored while another one is in flight
    Ignored,
    Action(ActionOutcome),
}

impl From<Transition> for StepOutcome {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::Advanced { from, to } => StepOutcome::Advanced { from, to },
            Transition::Reset => StepOutcome::Reset,
            Transition::Ignored | Transition::Dispatch(_) => StepOutcome::Ignored,
        }
    }
}

pub struct WizardSession {
    catalog: Arc<CatalogService>,
    conversation: Arc<Mutex<Conversation>>,
    orchestrator: ActionOrchestrator,
}

impl WizardSession {
    /// Start a conversation on the catalog's current snapshot.
    pub async fn new(
        catalog: Arc<CatalogService>,
        service: Arc<dyn DesignService>,
        config: &WizardConfig,
    ) -> Self {
        let snapshot = catalog.current().await;
        let conversation = Arc::new(Mutex::new(Conversation::new(snapshot.graph.clone())));
        let orchestrator = ActionOrchestrator::new(
            service,
            conversation.clone(),
            catalog.clone(),
            config.service.action_deadline(),
        );

        tracing::info!(nodes = snapshot.graph.len(), "Wizard session started");
        Self {
            catalog,
            conversation,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &ActionOrchestrator {
        &self.orchestrator
    }

    pub async fn view(&self) -> WizardResult<SessionView> {
        let conv = self.conversation.lock().await;
        Ok(SessionView {
            node: conv.view()?,
            history: conv.history().entries().to_vec(),
            selection: conv.selection().clone(),
            viewed: conv.viewed().cloned(),
        })
    }

    /// Click an option. Silent actions run to completion before returning.
    pub async fn choose_option(&self, node_id: &str, text: &str) -> WizardResult<StepOutcome> {
        let transition = self.conversation.lock().await.choose_option(node_id, text)?;

        let action = match transition {
            Transition::Dispatch(action) => action,
            other => return Ok(other.into()),
        };

        let outcome = match action {
            SilentAction::Generate | SilentAction::GenerateAgain => {
                self.orchestrator.generate().await?
            }
            SilentAction::PublishOne => return self.request_publish().await,
            SilentAction::PublishMany => return self.request_publish_all().await,
            SilentAction::StartNewSearch => return Ok(StepOutcome::Reset),
        };
        Ok(StepOutcome::Action(outcome))
    }

    pub async fn submit_date(&self, date: NaiveDate) -> WizardResult<StepOutcome> {
        let transition = self.conversation.lock().await.submit_date(date)?;
        Ok(transition.into())
    }

    pub async fn submit_number(&self, value: u32) -> WizardResult<StepOutcome> {
        let transition = self.conversation.lock().await.submit_number(value)?;
        Ok(transition.into())
    }

    /// Edit the currently viewed artifact.
    pub async fn request_edit(&self, instructions: &str) -> WizardResult<StepOutcome> {
        let viewed = self.viewed().await?;
        let outcome = self
            .orchestrator
            .edit(&viewed.url, instructions, Some(viewed.location))
            .await?;
        Ok(StepOutcome::Action(outcome))
    }

    /// Publish the currently viewed artifact.
    pub async fn request_publish(&self) -> WizardResult<StepOutcome> {
        let viewed = self.viewed().await?;
        let outcome = self.orchestrator.publish_one(&viewed.url).await?;
        Ok(StepOutcome::Action(outcome))
    }

    /// Publish the given artifacts of the conversation in one batch.
    pub async fn request_publish_many(&self, urls: &[String]) -> WizardResult<StepOutcome> {
        let artifacts: Vec<DesignArtifact> = {
            let conv = self.conversation.lock().await;
            urls.iter()
                .map(|url| {
                    conv.find_artifact(url, None)
                        .cloned()
                        .ok_or_else(|| ActionError::ArtifactNotFound(url.clone()))
                })
                .collect::<Result<_, _>>()?
        };
        let outcome = self.orchestrator.publish_many(&artifacts).await?;
        Ok(StepOutcome::Action(outcome))
    }

    /// Publish every unpublished artifact of the newest design set.
    pub async fn request_publish_all(&self) -> WizardResult<StepOutcome> {
        let outcome = self.orchestrator.publish_all_available().await?;
        Ok(StepOutcome::Action(outcome))
    }

    pub async fn view_artifact(&self, base: u32, variation: u32) -> WizardResult<ViewedArtifact> {
        let mut conv = self.conversation.lock().await;
        Ok(conv.view_artifact(base, variation)?.clone())
    }

    /// Reload the catalog and move the conversation onto the new graph.
    /// Returns whether the conversation had to restart.
    pub async fn refresh_catalog(&self) -> WizardResult<bool> {
        let snapshot = self.catalog.load().await?;
        let reset = self
            .conversation
            .lock()
            .await
            .replace_graph(snapshot.graph.clone());
        Ok(reset)
    }

    pub async fn publish_state(&self) -> PublishState {
        self.orchestrator.publish_state().await
    }

    async fn viewed(&self) -> Result<ViewedArtifact, ActionError> {
        self.conversation
            .lock()
            .await
            .viewed()
            .cloned()
            .ok_or(ActionError::NoArtifactSelected)
    }
}

impl std::fmt::Debug for WizardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardSession")
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}
