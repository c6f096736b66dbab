//! Crate-wide error taxonomy.
//!
//! Mirrors the split the teacher crate uses between a narrow, layer-local
//! error type (here `StoreError`, see [`crate::store::StoreError`]) and a
//! single error enum that reaches the CLI boundary.

use thiserror::Error;

/// Errors surfaced to CLI callers and worker loops.
#[derive(Error, Debug)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
