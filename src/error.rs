use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "error", content = "detail", rename_all = "snake_case")]
pub enum GameError {
    #[error("action is not allowed during the current phase")]
    IllegalActionPhase,
    #[error("unknown participant: {0}")]
    UnknownActor(String),
    #[error("unknown target: {0}")]
    UnknownTarget(String),
    #[error("participant {0} has been eliminated")]
    DeadActor(String),
    #[error("target {0} has been eliminated")]
    DeadTarget(String),
    #[error("target {0} cannot be chosen for this action")]
    IllegalTarget(String),
    #[error("participant {0} does not hold this capability")]
    CapabilityNotHeld(String),
    #[error("participant {0} has already used their single-use ability")]
    AbilityAlreadyUsed(String),
    #[error("not enough participants: {found} joined, {required} required")]
    InsufficientPlayers { found: usize, required: usize },
    #[error("the lobby is full ({0} participants)")]
    GameFull(usize),
    #[error("participant {0} has already joined")]
    AlreadyJoined(String),
    #[error("operation is not allowed in the current phase")]
    WrongPhase,
    #[error("no match is in progress")]
    NoActiveMatch,
    #[error("roles have already been assigned")]
    AlreadyAssigned,
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

impl GameError {
    /// Invariant violations never reach a participant; they indicate a
    /// scheduler bug and are logged by the caller.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GameError::AlreadyAssigned | GameError::UnknownRole(_))
    }
}
