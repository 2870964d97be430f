use reqwest::StatusCode;

use crate::mood_entry::EntryId;

/// Input rejected before anything in the store changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("entry text is empty")]
    EmptyText,

    #[error("no mood selected")]
    MissingMood,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("no entry with id {0}")]
    NotFound(EntryId),
}

/// Writing the slot failed. The in-memory collection is still correct.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to write entries: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode entries: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification sink answered {0}")]
    Status(StatusCode),
}
