//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent documents the assigner cannot work on.
/// The assignment itself never fails; only loading a document can.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}
