//! Action errors and user-facing failure messages

use thiserror::Error;

use crate::client::ServiceError;
use crate::conversation::{ActionFamily, ConversationError};

/// Local rejection of an action request. Nothing was sent and no state
/// changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error("'{0}' has already been added to Lark")]
    AlreadyPublished(String),

    #[error("All selected designs have already been added to Lark")]
    NothingToPublish,

    #[error("No generated design with URL '{0}'")]
    ArtifactNotFound(String),

    #[error("No design is selected")]
    NoArtifactSelected,
}

/// Bot message recorded for a failed action.
pub fn failure_message(family: ActionFamily, err: &ServiceError) -> String {
    let prefix = match family {
        ActionFamily::Generate => "Sorry, I couldn't generate the designs.",
        ActionFamily::Edit => "Sorry, I couldn't apply that edit.",
        ActionFamily::Publish => "Sorry, I couldn't add that to Lark.",
    };

    let detail = match err {
        ServiceError::Timeout => {
            "The request timed out. The design service may be busy, please try again in a moment."
                .to_string()
        }
        ServiceError::ServerError { status, message } => {
            format!("The design service reported an error ({}): {}", status, message)
        }
        ServiceError::NetworkUnreachable => {
            "The design service could not be reached. Please check your connection.".to_string()
        }
        ServiceError::ClientError(reason) => format!("The request was invalid: {}.", reason),
        ServiceError::Unknown(reason) => format!("Something unexpected happened: {}.", reason),
    };

    format!("{} {}", prefix, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_mentions_timeout() {
        let message = failure_message(ActionFamily::Generate, &ServiceError::Timeout);
        assert!(message.contains("timed out"));
    }

    #[test]
    fn test_server_error_message_carries_details() {
        let message = failure_message(
            ActionFamily::Publish,
            &ServiceError::ServerError {
                status: 502,
                message: "lark unavailable".into(),
            },
        );
        assert!(message.starts_with("Sorry, I couldn't add that to Lark."));
        assert!(message.contains("502"));
        assert!(message.contains("lark unavailable"));
    }

    #[test]
    fn test_messages_differ_per_kind() {
        let errors = [
            ServiceError::Timeout,
            ServiceError::NetworkUnreachable,
            ServiceError::ClientError("x".into()),
            ServiceError::Unknown("x".into()),
        ];
        let messages: std::collections::HashSet<String> = errors
            .iter()
            .map(|e| failure_message(ActionFamily::Edit, e))
            .collect();
        assert_eq!(messages.len(), errors.len());
    }
}
