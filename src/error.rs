//! Error handling for the design wizard
//!
//! Each module owns a `thiserror` enum describing its own failure modes.
//! `WizardError` aggregates them for callers that cross module boundaries
//! (the session facade and the CLI).

use thiserror::Error;

use crate::actions::ActionError;
use crate::catalog::CatalogError;
use crate::client::ServiceError;
use crate::config::ConfigError;
use crate::conversation::ConversationError;
use crate::script::ScriptError;

/// Main error type for the wizard
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Design service error: {0}")]
    Service(#[from] ServiceError),
}

impl WizardError {
    /// Whether this error is a local precondition rejection that left all
    /// state untouched (the user can simply try something else).
    pub fn is_rejection(&self) -> bool {
        match self {
            WizardError::Conversation(ConversationError::UnknownNode(_)) => false,
            WizardError::Conversation(_) | WizardError::Action(_) => true,
            _ => false,
        }
    }
}


/// Result type alias for wizard operations
pub type WizardResult<T> = Result<T, WizardError>;
