//! Conversation state machine
//!
//! ## States
//!
//! ```text
//! graph node ids ──choose_option / submit_*──► graph node ids
//!        │
//!        └── silent action ──► Busy(family) ──ticketed result──► Idle
//! ```
//!
//! - Navigation is always local and synchronous.
//! - A silent action (generate, publish) is handed to the orchestrator,
//!   which takes a ticket with [`Conversation::begin_action`] and applies
//!   the result through one of the `apply_*` methods.
//! - Every result is checked against the ticket; a reset or a newer
//!   generate in between makes it stale and it is dropped.
//! - Rejected inputs leave every field untouched.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::history::History;
use super::selection::Selection;
use crate::design::{ArtifactLocation, Design, DesignArtifact, ViewedArtifact};
use crate::script::{
    NodeKind, RenderedMessage, ScriptGraph, ScriptNode, SilentAction, DESIGN_COMPLETE_NODE,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Stale input for node '{got}', conversation is at '{expected}'")]
    StaleNode { expected: String, got: String },

    #[error("Node '{node}' has no option '{option}'")]
    UnknownOption { node: String, option: String },

    #[error("Node '{node}' is a {actual} step, not a {expected} step")]
    WrongNodeKind {
        node: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{value} is outside the allowed range {min}..={max}")]
    OutOfRange { value: u32, min: u32, max: u32 },

    #[error("Release date {date} is before today ({today})")]
    DateInPast { date: NaiveDate, today: NaiveDate },

    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    #[error("A {0} action is already in progress")]
    ActionInFlight(ActionFamily),

    #[error("No artifact at base design {base}, variation {variation}")]
    NoSuchArtifact { base: u32, variation: u32 },
}

// ---------------------------------------------------------------------------
// Phase and tickets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFamily {
    Generate,
    Edit,
    Publish,
}

impl std::fmt::Display for ActionFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ActionFamily::Generate => "generate",
            ActionFamily::Edit => "edit",
            ActionFamily::Publish => "publish",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "family", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Busy(ActionFamily),
}

/// Proof that an action was started in a particular conversation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTicket {
    pub family: ActionFamily,
    pub session_epoch: u64,
    pub generation_seq: u64,
}

/// Result of `choose_option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Moved to another node; two history entries were appended
    Advanced { from: String, to: String },
    /// Hand the action to the orchestrator; nothing changed yet
    Dispatch(SilentAction),
    /// Silent action clicked while another action is in flight
    Ignored,
    /// Start new search was applied
    Reset,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub text: String,
    pub enabled: bool,
}

/// Render-ready description of the current node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub node_id: String,
    pub kind: NodeKind,
    pub message: RenderedMessage,
    pub options: Vec<OptionView>,
    pub phase: Phase,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Conversation {
    graph: Arc<ScriptGraph>,
    current: String,
    selection: Selection,
    history: History,
    viewed: Option<ViewedArtifact>,
    in_flight: Option<ActionTicket>,
    session_epoch: u64,
    generation_seq: u64,
}

impl Conversation {
    pub fn new(graph: Arc<ScriptGraph>) -> Self {
        Self {
            current: graph.root().to_string(),
            graph,
            selection: Selection::new(),
            history: History::new(),
            viewed: None,
            in_flight: None,
            session_epoch: 0,
            generation_seq: 0,
        }
    }

    pub fn current_node_id(&self) -> &str {
        &self.current
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn viewed(&self) -> Option<&ViewedArtifact> {
        self.viewed.as_ref()
    }

    pub fn graph(&self) -> &Arc<ScriptGraph> {
        &self.graph
    }

    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    pub fn phase(&self) -> Phase {
        match self.in_flight {
            Some(ticket) => Phase::Busy(ticket.family),
            None => Phase::Idle,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    fn current_node(&self) -> Result<&ScriptNode, ConversationError> {
        self.graph
            .get(&self.current)
            .ok_or_else(|| ConversationError::UnknownNode(self.current.clone()))
    }

    fn ensure_current(&self, node_id: &str) -> Result<(), ConversationError> {
        if node_id != self.current {
            return Err(ConversationError::StaleNode {
                expected: self.current.clone(),
                got: node_id.to_string(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // User input
    // -----------------------------------------------------------------------

    /// Apply a click on option `text` of node `node_id`.
    pub fn choose_option(
        &mut self,
        node_id: &str,
        text: &str,
    ) -> Result<Transition, ConversationError> {
        self.ensure_current(node_id)?;

        let node = self.current_node()?;
        if matches!(node.kind, NodeKind::DatePick | NodeKind::NumberInput { .. }) {
            return Err(ConversationError::WrongNodeKind {
                node: node.id.clone(),
                expected: "choice",
                actual: node.kind.name(),
            });
        }
        let option = node
            .option(text)
            .ok_or_else(|| ConversationError::UnknownOption {
                node: node.id.clone(),
                option: text.to_string(),
            })?;

        if let Some(action) = option.action {
            return Ok(match action {
                SilentAction::StartNewSearch => {
                    self.start_new_search();
                    Transition::Reset
                }
                _ if self.is_busy() => {
                    tracing::debug!(action = ?action, "Ignoring action while another is in flight");
                    Transition::Ignored
                }
                _ => Transition::Dispatch(action),
            });
        }

        let mut selection = self.selection.clone();
        if !option.is_back() {
            if let Some(effect) = &option.effect {
                selection.set_dimension(effect.dimension, effect.value.clone());
            }
        }

        let next = option.next.resolve(&selection);
        if !self.graph.contains(&next) {
            return Err(ConversationError::UnknownNode(next));
        }

        let message = node.message.render(&self.selection);
        self.history.push_bot_message(message);
        self.history.push_user_text(text);
        self.selection = selection;
        let from = std::mem::replace(&mut self.current, next.clone());

        tracing::debug!(from = %from, to = %next, option = %text, "Option chosen");
        Ok(Transition::Advanced { from, to: next })
    }

    /// Answer the current date step. Dates before today are rejected.
    pub fn submit_date(&mut self, date: NaiveDate) -> Result<Transition, ConversationError> {
        let node = self.current_node()?;
        if node.kind != NodeKind::DatePick {
            return Err(ConversationError::WrongNodeKind {
                node: node.id.clone(),
                expected: "date_pick",
                actual: node.kind.name(),
            });
        }

        let today = Utc::now().date_naive();
        if date < today {
            return Err(ConversationError::DateInPast { date, today });
        }

        let mut selection = self.selection.clone();
        selection.date = Some(date);
        self.advance_input(selection, date.format("%Y-%m-%d").to_string())
    }

    /// Answer the current number step.
    pub fn submit_number(&mut self, value: u32) -> Result<Transition, ConversationError> {
        let node = self.current_node()?;
        let NodeKind::NumberInput { field, min, max, .. } = node.kind else {
            return Err(ConversationError::WrongNodeKind {
                node: node.id.clone(),
                expected: "number_input",
                actual: node.kind.name(),
            });
        };

        if value < min || value > max {
            return Err(ConversationError::OutOfRange { value, min, max });
        }

        let mut selection = self.selection.clone();
        selection.set_numeric(field, value);
        self.advance_input(selection, value.to_string())
    }

    /// Commit a single-field step: one bot/user pair, then the fixed successor.
    fn advance_input(
        &mut self,
        selection: Selection,
        answer: String,
    ) -> Result<Transition, ConversationError> {
        let node = self.current_node()?;
        let next = node
            .next
            .as_ref()
            .map(|n| n.resolve(&selection))
            .ok_or_else(|| ConversationError::UnknownNode(format!("{}.next", node.id)))?;
        if !self.graph.contains(&next) {
            return Err(ConversationError::UnknownNode(next));
        }

        let message = node.message.render(&self.selection);
        self.history.push_bot_message(message);
        self.history.push_user_text(answer);
        self.selection = selection;
        let from = std::mem::replace(&mut self.current, next.clone());

        tracing::debug!(from = %from, to = %next, "Input accepted");
        Ok(Transition::Advanced { from, to: next })
    }

    /// Reset selection, history and the viewed pointer, and invalidate any
    /// outstanding action.
    pub fn start_new_search(&mut self) {
        self.session_epoch += 1;
        self.selection = Selection::new();
        self.history.clear();
        self.viewed = None;
        self.in_flight = None;
        self.current = self.graph.root().to_string();
        tracing::info!(epoch = self.session_epoch, "New search started");
    }

    /// Install a regenerated graph. Falls back to a new search when the
    /// current node no longer exists. Returns whether a reset happened.
    pub fn replace_graph(&mut self, graph: Arc<ScriptGraph>) -> bool {
        self.graph = graph;
        if self.graph.contains(&self.current) {
            return false;
        }
        tracing::info!(node = %self.current, "Current node vanished after catalog reload");
        self.start_new_search();
        true
    }

    /// Point the viewer at another artifact of the newest design set.
    pub fn view_artifact(
        &mut self,
        base: u32,
        variation: u32,
    ) -> Result<&ViewedArtifact, ConversationError> {
        let location = ArtifactLocation::new(base, variation);
        let url = self
            .history
            .latest_designs()
            .into_iter()
            .flatten()
            .flat_map(|d| d.variations.iter())
            .find(|a| a.location() == Some(location))
            .map(|a| a.url.clone())
            .ok_or(ConversationError::NoSuchArtifact { base, variation })?;

        Ok(&*self.viewed.insert(ViewedArtifact { url, location }))
    }

    pub fn find_artifact(
        &self,
        url: &str,
        hint: Option<ArtifactLocation>,
    ) -> Option<&DesignArtifact> {
        self.history.find_artifact(url, hint)
    }

    pub fn latest_designs(&self) -> &[Design] {
        self.history.latest_designs().unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Mark an action as in flight. Fails when one already is.
    pub fn begin_action(&mut self, family: ActionFamily) -> Result<ActionTicket, ConversationError> {
        if let Some(ticket) = self.in_flight {
            return Err(ConversationError::ActionInFlight(ticket.family));
        }
        if family == ActionFamily::Generate {
            self.generation_seq += 1;
        }
        let ticket = ActionTicket {
            family,
            session_epoch: self.session_epoch,
            generation_seq: self.generation_seq,
        };
        self.in_flight = Some(ticket);
        Ok(ticket)
    }

    /// Whether results of `ticket` may still be applied.
    pub fn is_current(&self, ticket: &ActionTicket) -> bool {
        ticket.session_epoch == self.session_epoch
            && ticket.generation_seq == self.generation_seq
            && self.in_flight.as_ref() == Some(ticket)
    }

    /// Clear the in-flight marker without recording anything.
    pub fn release(&mut self, ticket: &ActionTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Record a successful generate: one image-set entry, first artifact
    /// viewed, move to `design_complete`.
    pub fn apply_generation(&mut self, ticket: &ActionTicket, designs: Vec<Design>) -> bool {
        if !self.release(ticket) {
            tracing::debug!(epoch = ticket.session_epoch, "Discarding stale generate result");
            return false;
        }

        self.viewed = designs
            .first()
            .and_then(|d| d.variations.first())
            .and_then(|a| {
                Some(ViewedArtifact {
                    url: a.url.clone(),
                    location: a.location()?,
                })
            });
        self.history.push_designs(designs);
        self.current = DESIGN_COMPLETE_NODE.to_string();
        true
    }

    /// Record a failed (or noteworthy) outcome as one bot entry, optionally
    /// moving to `next`.
    pub fn apply_failure(
        &mut self,
        ticket: &ActionTicket,
        message: impl Into<String>,
        next: Option<&str>,
    ) -> bool {
        if !self.release(ticket) {
            tracing::debug!(family = %ticket.family, "Discarding stale action result");
            return false;
        }
        self.history.push_bot_text(message);
        if let Some(next) = next.filter(|n| self.graph.contains(n)) {
            self.current = next.to_string();
        }
        true
    }

    /// Swap an edited artifact's URL in place. The viewed pointer follows
    /// when it was on the edited artifact.
    pub fn apply_edit(
        &mut self,
        ticket: &ActionTicket,
        old_url: &str,
        new_url: &str,
        hint: Option<ArtifactLocation>,
    ) -> bool {
        if !self.release(ticket) {
            tracing::debug!("Discarding stale edit result");
            return false;
        }

        let Some(location) = self
            .history
            .replace_artifact_url(old_url, new_url, hint)
            .map(|a| a.location())
        else {
            tracing::warn!(url = %old_url, "Edited artifact no longer in history");
            return false;
        };

        if let Some(viewed) = self.viewed.as_mut() {
            let same_slot = location.map_or(true, |l| l == viewed.location);
            if viewed.url == old_url && same_slot {
                viewed.url = new_url.to_string();
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // View
    // -----------------------------------------------------------------------

    pub fn view(&self) -> Result<NodeView, ConversationError> {
        let node = self.current_node()?;
        let busy = self.is_busy();
        let options = node
            .options
            .iter()
            .map(|o| OptionView {
                text: o.text.clone(),
                enabled: !busy
                    || o.action.is_none()
                    || o.action == Some(SilentAction::StartNewSearch),
            })
            .collect();

        Ok(NodeView {
            node_id: node.id.clone(),
            kind: node.kind.clone(),
            message: node.message.render(&self.selection),
            options,
            phase: self.phase(),
        })
    }
}
