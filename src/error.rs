//! Error types for the dialogue engine
//!
//! Collaborator services return `anyhow::Result`; their failures are wrapped
//! in [`DialogueError::Collaborator`] so the state machine can turn them into
//! an error display without losing the source chain.

use thiserror::Error;

/// Main error type of the engine.
#[derive(Error, Debug)]
pub enum DialogueError {
    /// Blank identifiers, unsupported locales and similar caller mistakes.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session '{session_id}' has expired or does not exist")]
    SessionExpired { session_id: String },

    #[error("Session '{session_id}' already exists")]
    DuplicateSession { session_id: String },

    #[error("Unknown event '{0}'")]
    UnknownEvent(String),

    #[error("Could not instantiate state machine: {0}")]
    StateMachineInstantiation(String),

    #[error("No transition from state {state} on event {event}")]
    IllegalTransition { state: String, event: String },

    #[error("State machine execution failed in state {state}: {message}")]
    StateMachineExecution { state: String, message: String },

    #[error("{service} failed: {source}")]
    Collaborator {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DialogueError {
    pub fn collaborator(service: &'static str, source: anyhow::Error) -> Self {
        DialogueError::Collaborator { service, source }
    }

    /// Resource key of the error display shown for this error.
    pub fn message_key(&self) -> &'static str {
        match self {
            DialogueError::InvalidArgument(_) => "errorInvalidArgument",
            DialogueError::SessionExpired { .. } => "errorSessionExpired",
            DialogueError::DuplicateSession { .. } => "errorDuplicateSession",
            DialogueError::UnknownEvent(_) => "errorUnknownEvent",
            DialogueError::StateMachineInstantiation(_) => "errorInstantiation",
            DialogueError::IllegalTransition { .. }
            | DialogueError::StateMachineExecution { .. } => "errorExecution",
            DialogueError::Collaborator { service, .. } => match *service {
                "query executor" => "errorExecuteQuery",
                "annotator" => "errorAnnotation",
                _ => "errorLoadData",
            },
            DialogueError::Config(_) => "errorConfiguration",
        }
    }
}

/// Convenient Result alias.
pub type Result<T> = std::result::Result<T, DialogueError>;
