use thiserror::Error;

use crate::domain::LedgerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// Unregistered names dropped from an expense that could not be split.
    pub fn skipped_participants(&self) -> &[String] {
        match self {
            AppError::Ledger(LedgerError::EmptySplitSet { skipped }) => skipped,
            _ => &[],
        }
    }
}
