//! Commands sent from a [`crate::ChatHandle`] to the runtime.

use pomochat_core::{ParticipantId, RoomId, SessionError};
use tokio::sync::oneshot;

/// Reply channel for a command.
pub(crate) type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Requests processed by the runtime loop, one at a time.
#[derive(Debug)]
pub(crate) enum Command {
    /// Open a conversation. Replies once the attempt opens or fails.
    Connect { current: ParticipantId, target: ParticipantId, reply: Reply<RoomId> },

    /// Send a message on the open conversation.
    Send { body: String, reply: Reply<()> },

    /// Leave the conversation.
    Disconnect { reply: Reply<()> },

    /// Change the remote participant.
    UpdateTarget { target: ParticipantId, reply: Reply<()> },

    /// Clear the surfaced error.
    ClearError { reply: Reply<()> },

    /// Close everything and stop the loop.
    Shutdown { reply: oneshot::Sender<()> },
}
