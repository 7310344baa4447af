use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowCanvasError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Workflow structure error: {0}")]
    Structure(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Load error: {0}")]
    Load(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl FlowCanvasError {
    /// Text shown to the user in form errors and notifications.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Auth(message) | Self::NotFound(message) => {
                message.clone()
            }
            Self::Http(message) => message.clone(),
            Self::Structure(_) => "Unable to add step here".to_string(),
            Self::Storage(_) => "Error saving workflow".to_string(),
            Self::Load(_) | Self::Io(_) => "Failed to load workflow".to_string(),
        }
    }

    /// Marks a storage failure as having happened while reading.
    pub fn while_loading(self) -> Self {
        match self {
            Self::Storage(message) => Self::Load(message),
            other => other,
        }
    }
}

impl From<rusqlite::Error> for FlowCanvasError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<std::io::Error> for FlowCanvasError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

pub type CommandResult<T> = Result<T, FlowCanvasError>;
