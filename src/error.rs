use thiserror::Error;
use uuid::Uuid;

pub type EngineResult<T> = Result<T, EngineError>;

/// Engine failures. All variants are terminal for the current call; nothing
/// here is retried automatically, and the messages are surfaced to end users
/// largely unmodified.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "ambiguous workflow configuration: {candidates} active templates match \
         department {department_id}, document type {document_type:?} at the \
         {tier} tier; deactivate all but one before creating files"
    )]
    ConfigurationConflict {
        department_id: Uuid,
        document_type: Option<String>,
        tier: String,
        candidates: usize,
    },

    #[error(
        "no workflow configured for department {department_id}, document type \
         {document_type:?}: checked department+document-type, department \
         default, and global default tiers"
    )]
    NoWorkflowConfigured {
        department_id: Uuid,
        document_type: Option<String>,
    },

    #[error("action {action} is not allowed while the file is in state {state}")]
    IllegalTransition { action: String, state: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("unknown workflow action: {0}")]
    UnknownAction(String),

    #[error("storage error: {0}")]
    Storage(diesel::result::Error),

    #[error("database pool error: {0}")]
    Pool(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<diesel::result::Error> for EngineError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => EngineError::NotFound("record".to_string()),
            other => EngineError::Storage(other),
        }
    }
}
