use thiserror::Error;

use crate::devices::SourceKind;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Food not found: {0}")]
    NotFound(String),

    #[error("Duplicate food id: {0}")]
    DuplicateId(String),

    #[error("Invalid nutrition facts for {0}")]
    InvalidFacts(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Invalid image handle")]
    InvalidInput,

    #[error("Catalog is empty")]
    EmptyCatalog,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Meal history is corrupt: {0}")]
    StorageCorrupt(#[from] serde_json::Error),

    #[error("Meal history could not be read: {0:#}")]
    StorageReadFailed(anyhow::Error),

    #[error("Meal history could not be written: {0:#}")]
    StorageWriteFailed(anyhow::Error),
}

/// Failures that end a capture/pick session early.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Access to the {0} was denied")]
    PermissionDenied(SourceKind),

    #[error("Failed to take picture: {0:#}")]
    CaptureFailed(anyhow::Error),

    #[error("Failed to pick image: {0:#}")]
    PickFailed(anyhow::Error),

    #[error(transparent)]
    Classify(#[from] ClassifyError),
}

impl SessionError {
    pub fn acquisition(kind: SourceKind, err: anyhow::Error) -> Self {
        match kind {
            SourceKind::Camera => SessionError::CaptureFailed(err),
            SourceKind::Library => SessionError::PickFailed(err),
        }
    }
}
