//! Errors returned by [`crate::ChatHandle`].

use pomochat_core::SessionError;
use thiserror::Error;

/// Errors from the UI command surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The session rejected or failed the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Both participants are the same user.
    #[error("cannot open a chat with yourself")]
    SelfChat,

    /// The runtime loop is no longer running.
    #[error("chat runtime has stopped")]
    RuntimeStopped,
}

impl ChatError {
    /// The underlying session error, if any.
    pub fn session(&self) -> Option<&SessionError> {
        match self {
            Self::Session(error) => Some(error),
            Self::SelfChat | Self::RuntimeStopped => None,
        }
    }
}
