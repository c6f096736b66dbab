//! Errors local to the Store layer.
//!
//! Kept separate from the crate-wide [`crate::error::Error`] the same way
//! the teacher splits `storage::error::StorageError` out from its top-level
//! error enum: `LockBusy` is an internal control-flow signal that
//! `QueueService::claim_next` consumes and must never bubble up to a CLI
//! caller (spec §7, "Propagation policy").

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// Non-blocking lock acquisition failed. Never surfaced to the user.
    #[error("lock busy: {0}")]
    LockBusy(String),
}
