//! Entity resolution failures. None of these are fatal: every caller falls
//! back to the host's own movement code.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampFixError {
    /// The pawn has no controller, so there is no player slot to key on.
    #[error("movement service has no player controller")]
    NoController,

    #[error("player slot {slot} out of range (table holds {max})")]
    SlotOutOfRange { slot: usize, max: usize },

    #[error("player pawn is not alive")]
    NotAlive,

    #[error("ramp fix disabled by rampfix_enable")]
    Disabled,
}
