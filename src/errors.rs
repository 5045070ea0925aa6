use std::result::Result as StdResult;

use thiserror::Error;

/// Unified error type for the wizard core, storage and configuration layers.
///
/// Step validation failures are deliberately absent: they are ordinary
/// return values of the navigation API, see [`crate::wizard::StepOutcome`].
#[derive(Debug, Error)]
pub enum WishError {
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Wizard not found: {0}")]
    WizardNotFound(String),
    #[error("Draft not found: {0}")]
    DraftNotFound(String),
    #[error("Wizard session is closed")]
    SessionClosed,
    #[error("Wizard requires at least one step")]
    EmptyWizard,
}

pub type Result<T> = StdResult<T, WishError>;

/// User-facing CLI error wrapper.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] WishError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<std::io::Error> for WishError {
    fn from(err: std::io::Error) -> Self {
        WishError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for WishError {
    fn from(err: serde_json::Error) -> Self {
        WishError::StorageError(err.to_string())
    }
}

impl From<dialoguer::Error> for CliError {
    fn from(err: dialoguer::Error) -> Self {
        CliError::Command(err.to_string())
    }
}
