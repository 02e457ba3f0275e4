//! # AppError
//!
//! Centralized error handling for the lost & found board.
//! Form problems stay typed so they can be shown per field; collaborator
//! failures are relayed as-is.

use thiserror::Error;

use crate::codec::DecodeError;
use crate::validation::ValidationErrors;

/// The primary error type for all lf-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Report not found (e.g., deleted by its owner in the meantime)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Draft rejected by the validator
    #[error("validation error: {0}")]
    Validation(#[from] ValidationErrors),

    /// No one is signed in
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Sign-up or sign-in input rejected (e.g., password too short)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists (e.g., an account for that email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Signed in, but not the owner
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A stored document does not match the report schema
    #[error("malformed document: {0}")]
    Decode(#[from] DecodeError),

    /// Opaque failure from an identity, collection or blob collaborator
    #[error("collaborator failure: {0}")]
    Collaborator(#[from] anyhow::Error),
}

/// A specialized Result type for lost & found logic.
pub type Result<T> = std::result::Result<T, AppError>;
