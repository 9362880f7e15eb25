//! UI-facing command surface.

use pomochat_core::{ChatSnapshot, ParticipantId, RoomId, SessionError};
use tokio::sync::{mpsc, oneshot, watch};

use crate::{ChatError, command::Command};

/// Cloneable handle for issuing chat commands and observing state.
///
/// Commands are queued to the [`crate::Runtime`] and processed in order.
/// Every method fails with `ChatError::RuntimeStopped` once the runtime has
/// exited.
#[derive(Debug, Clone)]
pub struct ChatHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<ChatSnapshot>,
}

impl ChatHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<Command>,
        snapshots: watch::Receiver<ChatSnapshot>,
    ) -> Self {
        Self { commands, snapshots }
    }

    /// Open a conversation between `current` and `target`.
    ///
    /// Resolves with the room id once the connection opens.
    ///
    /// # Errors
    ///
    /// - `ChatError::SelfChat` if both identifiers are equal
    /// - `ChatError::Session` with `EmptyParticipant` if either is empty
    /// - `ChatError::Session` with `Busy`, `ConnectFailure` or `Cancelled`
    ///   from the session
    pub async fn connect_to_user_chat(
        &self,
        current: &str,
        target: &str,
    ) -> Result<RoomId, ChatError> {
        let current = ParticipantId::new(current)?;
        let target = ParticipantId::new(target)?;
        if current == target {
            return Err(ChatError::SelfChat);
        }

        self.request(|reply| Command::Connect { current, target, reply }).await
    }

    /// Send `body` on the open conversation.
    ///
    /// Success means the payload was handed to the transport. The message
    /// appears in the room when the endpoint echoes it.
    pub async fn send_chat_message(&self, body: &str) -> Result<(), ChatError> {
        let body = body.to_string();
        self.request(|reply| Command::Send { body, reply }).await
    }

    /// Leave the conversation. Succeeds when there is nothing to leave.
    pub async fn disconnect_chat(&self) -> Result<(), ChatError> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    /// Address later messages to `target`.
    pub async fn update_target_user_id(&self, target: &str) -> Result<(), ChatError> {
        let target = ParticipantId::new(target)?;
        self.request(|reply| Command::UpdateTarget { target, reply }).await
    }

    /// Clear the surfaced error.
    pub async fn clear_chat_error(&self) -> Result<(), ChatError> {
        self.request(|reply| Command::ClearError { reply }).await
    }

    /// Stop the runtime, closing any open connection.
    pub async fn shutdown(&self) -> Result<(), ChatError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Shutdown { reply })
            .await
            .map_err(|_| ChatError::RuntimeStopped)?;
        rx.await.map_err(|_| ChatError::RuntimeStopped)
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshots.clone()
    }

    /// Latest published state.
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshots.borrow().clone()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, SessionError>>) -> Command,
    ) -> Result<T, ChatError> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(build(reply)).await.map_err(|_| ChatError::RuntimeStopped)?;

        let result = rx.await.map_err(|_| ChatError::RuntimeStopped)?;
        Ok(result?)
    }
}
