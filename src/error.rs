use teloxide::dispatching::dialogue::InMemStorageError;
use thiserror::Error;

use crate::database::connection::RepositoryError;

/// Failures of a quiz step. The session is left as it was before the step.
#[derive(Debug, Error)]
pub enum QuizError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("session storage failed: {0}")]
    Storage(#[from] InMemStorageError),
}
