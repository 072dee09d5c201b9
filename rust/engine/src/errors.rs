use crate::slot::{PlayerId, Position};
use thiserror::Error;

/// Every way a board operation can fail.
///
/// `Format`, `EmptySpace`, `Controlled`, `NoFirstSelection` and `Cancelled`
/// are ordinary outcomes of a player's request. `InvariantViolation` means the
/// board itself is inconsistent and must never be swallowed by callers.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Invalid board definition: {0}")]
    Format(String),
    #[error("No card at {0}")]
    EmptySpace(Position),
    #[error("Card at {0} is controlled by a player")]
    Controlled(Position),
    #[error("Player {0} has no first card selected")]
    NoFirstSelection(PlayerId),
    #[error("Wait for card was cancelled")]
    Cancelled,
    #[error("Board invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Failed to read board file: {0}")]
    Io(#[from] std::io::Error),
}

impl BoardError {
    /// True for failures caused by the request itself rather than by the
    /// board or its environment.
    pub fn is_rule_violation(&self) -> bool {
        matches!(
            self,
            BoardError::EmptySpace(_)
                | BoardError::Controlled(_)
                | BoardError::NoFirstSelection(_)
                | BoardError::Cancelled
        )
    }
}
