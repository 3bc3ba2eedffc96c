//! Failures of a running session.
//!
//! None of these are recoverable: each one means the synchronization
//! protocol broke an invariant, and the session is abandoned.

use thiserror::Error;

use crate::registry::{BoatId, VisitorId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{boat} is not part of this session")]
    UnknownBoat { boat: BoatId },

    #[error("{boat} crossed its handoff barrier without an assigned visitor")]
    MissingAssignment { boat: BoatId },

    #[error("{boat} was assigned {assigned} but crossed its handoff with {partner:?}")]
    HandoffMismatch {
        boat: BoatId,
        assigned: VisitorId,
        partner: Option<VisitorId>,
    },

    #[error("{visitor} is already recorded against {boat}")]
    DuplicateClaim { visitor: VisitorId, boat: BoatId },

    #[error("served counter reached {served} with only {visitors} visitors")]
    ServedOverflow { served: usize, visitors: usize },

    #[error("expected exactly one boat at the completion gate, saw {count}")]
    CompletionGate { count: usize },

    #[error("{actor} task failed: {reason}")]
    ActorFailed { actor: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SessionError>;
