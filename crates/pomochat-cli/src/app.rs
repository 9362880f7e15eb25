//! Interactive loop: reads input lines, issues chat commands and prints
//! session snapshots as they change.

use std::{future::Future, io, pin::Pin, time::Duration};

use pomochat_app::{ChatError, ChatHandle, ChatSnapshot, RoomId, SessionError};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::watch,
    time::Instant,
};

use crate::{
    input::{self, HELP, InputCommand},
    render::Printer,
};

/// Default time an error stays on screen.
pub const DEFAULT_ERROR_TTL: Duration = Duration::from_secs(5);

/// Front-end settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Local user id.
    pub user: String,
    /// Peer to open a conversation with on startup.
    pub peer: Option<String>,
    /// How long a surfaced error is shown before it is cleared.
    pub error_ttl: Duration,
}

impl AppConfig {
    /// Settings for `user` with no startup peer and the default error TTL.
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into(), peer: None, error_ttl: DEFAULT_ERROR_TTL }
    }
}

/// Connect request in flight. Polled by the main loop so input keeps
/// flowing while the connection opens.
type PendingConnect = Pin<Box<dyn Future<Output = Result<RoomId, ChatError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct App<W: io::Write> {
    handle: ChatHandle,
    config: AppConfig,
    printer: Printer<W>,
    snapshots: watch::Receiver<ChatSnapshot>,
    shown_error: Option<SessionError>,
    error_deadline: Option<Instant>,
    pending_connect: Option<PendingConnect>,
}

/// Run the front-end until `/quit`, end of input, or the runtime stops.
///
/// The runtime behind `handle` is shut down on exit.
///
/// # Errors
///
/// Returns an error if reading input or writing output fails.
pub async fn run<R, W>(handle: ChatHandle, config: AppConfig, input: R, out: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: io::Write,
{
    let snapshots = handle.subscribe();
    let mut app = App {
        handle,
        config,
        printer: Printer::new(out),
        snapshots,
        shown_error: None,
        error_deadline: None,
        pending_connect: None,
    };

    app.refresh()?;
    if let Some(peer) = app.config.peer.clone() {
        app.open(peer).await?;
    }

    let mut lines = input.lines();
    loop {
        let deadline = app.error_deadline;
        tokio::select! {
            biased;

            changed = app.snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                app.refresh()?;
            },

            result = connecting(&mut app.pending_connect) => {
                app.pending_connect = None;
                if let Ok(room) = &result {
                    tracing::info!(%room, "conversation open");
                }
                if app.report(result)? == Flow::Quit {
                    break;
                }
            },

            () = expire(deadline) => {
                app.error_deadline = None;
                let result = app.handle.clear_chat_error().await;
                if app.report(result)? == Flow::Quit {
                    break;
                }
            },

            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if app.dispatch(input::parse(&line)).await? == Flow::Quit {
                    break;
                }
            },
        }
    }

    tracing::debug!("front-end exiting");
    match app.handle.shutdown().await {
        Ok(()) | Err(ChatError::RuntimeStopped) => {},
        Err(error) => tracing::warn!(%error, "shutdown failed"),
    }
    Ok(())
}

impl<W: io::Write> App<W> {
    async fn dispatch(&mut self, command: InputCommand) -> io::Result<Flow> {
        match command {
            InputCommand::Send(body) => {
                let result = self.handle.send_chat_message(&body).await;
                self.report(result)
            },
            InputCommand::Peer(peer) => self.open(peer).await,
            InputCommand::Leave => {
                let result = self.handle.disconnect_chat().await;
                self.report(result)
            },
            InputCommand::Clear => {
                self.error_deadline = None;
                let result = self.handle.clear_chat_error().await;
                self.report(result)
            },
            InputCommand::Help => {
                self.printer.notice(HELP)?;
                Ok(Flow::Continue)
            },
            InputCommand::Quit => Ok(Flow::Quit),
            InputCommand::Unknown(command) => {
                self.printer.notice(&format!("unknown command {command}; /help lists commands"))?;
                Ok(Flow::Continue)
            },
            InputCommand::Empty => Ok(Flow::Continue),
        }
    }

    /// Leave any current conversation and start opening one with `peer`.
    ///
    /// Returns once the request is queued; the outcome arrives through the
    /// main loop, so `/leave` can cancel an open that never completes.
    async fn open(&mut self, peer: String) -> io::Result<Flow> {
        if peer == self.config.user {
            return self.report::<()>(Err(ChatError::SelfChat));
        }

        // Idle disconnect is a no-op; otherwise it cancels or closes
        let result = self.handle.disconnect_chat().await;
        if self.report(result)? == Flow::Quit {
            return Ok(Flow::Quit);
        }

        let handle = self.handle.clone();
        let user = self.config.user.clone();
        self.pending_connect =
            Some(Box::pin(async move { handle.connect_to_user_chat(&user, &peer).await }));
        Ok(Flow::Continue)
    }

    /// Print the latest snapshot and track error expiry.
    fn refresh(&mut self) -> io::Result<()> {
        let snapshot = self.snapshots.borrow_and_update().clone();
        if snapshot.error != self.shown_error {
            self.error_deadline =
                snapshot.error.as_ref().map(|_| Instant::now() + self.config.error_ttl);
            self.shown_error.clone_from(&snapshot.error);
        }
        self.printer.render(&snapshot)
    }

    /// Surface command failures the session does not keep in its state.
    fn report<T>(&mut self, result: Result<T, ChatError>) -> io::Result<Flow> {
        match result {
            Ok(_) => Ok(Flow::Continue),
            Err(ChatError::RuntimeStopped) => {
                self.printer.notice("!! chat runtime stopped")?;
                Ok(Flow::Quit)
            },
            Err(error @ (ChatError::SelfChat | ChatError::Session(SessionError::EmptyParticipant))) => {
                self.printer.notice(&format!("!! {error}"))?;
                Ok(Flow::Continue)
            },
            // Shown through the snapshot
            Err(ChatError::Session(_)) => Ok(Flow::Continue),
        }
    }
}

async fn connecting(pending: &mut Option<PendingConnect>) -> Result<RoomId, ChatError> {
    match pending {
        Some(connect) => connect.await,
        None => std::future::pending().await,
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
