//! Error types for the sync layer.

use planwheel_schedule::ConstraintError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("no save callback registered")]
    NoCallback,

    #[error("another save is already in progress")]
    InProgress,

    #[error("save callback failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}
