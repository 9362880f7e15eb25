//! Event loop driving a [`ChatSession`].
//!
//! The runtime owns the session and every open [`Link`]. It serializes
//! commands from [`ChatHandle`]s and notifications from transports into one
//! sequence, feeds them to the session and executes the resulting actions.
//! After each state change the latest [`ChatSnapshot`] is published.

use std::collections::HashMap;

use pomochat_core::{
    ChatSession, ChatSnapshot, Environment, Generation, RoomId, SessionAction, SessionConfig,
    SessionError, TransportEvent,
};
use tokio::sync::{mpsc, watch};

use crate::{
    ChatHandle,
    command::{Command, Reply},
    transport::{EventSink, Link, Transport},
};

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of the command queue shared by all handles.
    pub command_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { command_buffer: 32 }
    }
}

/// Generic runtime that drives a [`ChatSession`] over a [`Transport`].
///
/// # Type Parameters
///
/// - `T`: Connection factory (WebSocket in production, hub in simulation)
/// - `E`: Clock for outbound timestamps
pub struct Runtime<T, E>
where
    T: Transport,
    E: Environment,
{
    session: ChatSession<E>,
    transport: T,
    links: HashMap<Generation, T::Link>,
    pending_connects: HashMap<Generation, Reply<RoomId>>,
    commands: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<(Generation, TransportEvent)>,
    events_rx: mpsc::UnboundedReceiver<(Generation, TransportEvent)>,
    snapshots: watch::Sender<ChatSnapshot>,
}

impl<T, E> Runtime<T, E>
where
    T: Transport,
    E: Environment,
{
    /// Create a runtime and a handle for talking to it.
    ///
    /// Nothing happens until [`Runtime::run`] is polled.
    pub fn new(
        transport: T,
        env: E,
        session_config: SessionConfig,
        config: RuntimeConfig,
    ) -> (Self, ChatHandle) {
        let session = ChatSession::new(env, session_config);
        let (commands_tx, commands) = mpsc::channel(config.command_buffer.max(1));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots, snapshots_rx) = watch::channel(session.snapshot());

        let runtime = Self {
            session,
            transport,
            links: HashMap::new(),
            pending_connects: HashMap::new(),
            commands,
            events_tx,
            events_rx,
            snapshots,
        };

        (runtime, ChatHandle::new(commands_tx, snapshots_rx))
    }

    /// Run the event loop until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        tracing::debug!("chat runtime started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.shutdown();
                        let _ = reply.send(());
                        break;
                    },
                    Some(command) => self.handle_command(command),
                    None => {
                        self.shutdown();
                        break;
                    },
                },
                Some((generation, event)) = self.events_rx.recv() => {
                    let actions = self.session.handle_transport(generation, event);
                    self.execute(actions);
                },
            }
        }

        tracing::debug!("chat runtime stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { current, target, reply } => {
                match self.session.connect(current, target) {
                    Ok(actions) => {
                        if let Some(generation) = self.session.state().generation() {
                            self.pending_connects.insert(generation, reply);
                        }
                        self.execute(actions);
                    },
                    Err(error) => {
                        self.publish();
                        let _ = reply.send(Err(error));
                    },
                }
            },

            Command::Send { body, reply } => {
                let result = match self.session.send(&body) {
                    Ok(actions) => self.execute(actions).map_or(Ok(()), Err),
                    Err(error) => {
                        self.publish();
                        Err(error)
                    },
                };
                let _ = reply.send(result);
            },

            Command::Disconnect { reply } => {
                let actions = self.session.disconnect();
                self.execute(actions);
                let _ = reply.send(Ok(()));
            },

            Command::UpdateTarget { target, reply } => {
                let actions = self.session.set_target_user_id(target);
                self.execute(actions);
                let _ = reply.send(Ok(()));
            },

            Command::ClearError { reply } => {
                let actions = self.session.clear_error();
                self.execute(actions);
                let _ = reply.send(Ok(()));
            },

            // Handled by the loop
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            },
        }
    }

    /// Execute session actions, including any produced while executing.
    ///
    /// Returns the first write failure, if any.
    fn execute(&mut self, actions: Vec<SessionAction>) -> Option<SessionError> {
        let mut pending = actions;
        let mut write_failure = None;
        let mut outcomes = Vec::new();

        while !pending.is_empty() {
            for action in std::mem::take(&mut pending) {
                match action {
                    SessionAction::Open { generation, url } => {
                        let sink = EventSink::new(generation, self.events_tx.clone());
                        let link = self.transport.open(&url, sink);
                        self.links.insert(generation, link);
                    },

                    SessionAction::Send { generation, payload } => {
                        let result = match self.links.get_mut(&generation) {
                            Some(link) => link.send(payload).map_err(|e| e.to_string()),
                            None => Err("transport is not open".to_string()),
                        };

                        if let Err(message) = result {
                            write_failure.get_or_insert(SessionError::SendFailure {
                                reason: message.clone(),
                            });
                            pending.extend(
                                self.session
                                    .handle_transport(generation, TransportEvent::SendFailed {
                                        message,
                                    }),
                            );
                        }
                    },

                    SessionAction::Close { generation, code, reason } => {
                        if let Some(mut link) = self.links.remove(&generation) {
                            link.close(code, &reason);
                        }
                    },

                    SessionAction::Release { generation } => {
                        self.links.remove(&generation);
                    },

                    SessionAction::Connected { generation, room_id } => {
                        if let Some(reply) = self.pending_connects.remove(&generation) {
                            outcomes.push((reply, Ok(room_id)));
                        }
                    },

                    SessionAction::ConnectFailed { generation, error } => {
                        if let Some(reply) = self.pending_connects.remove(&generation) {
                            outcomes.push((reply, Err(error)));
                        }
                    },

                    SessionAction::Render => self.publish(),
                }
            }
        }

        // Resolve connects after the snapshot is published
        for (reply, outcome) in outcomes {
            let _ = reply.send(outcome);
        }

        write_failure
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }

    fn shutdown(&mut self) {
        let actions = self.session.disconnect();
        self.execute(actions);

        for (generation, mut link) in self.links.drain() {
            tracing::debug!(%generation, "closing leftover transport");
            let config = self.session.config();
            link.close(config.close_code, &config.close_reason);
        }

        for (_, reply) in self.pending_connects.drain() {
            let _ = reply.send(Err(SessionError::Cancelled));
        }
    }

    /// Session driven by this runtime.
    pub fn session(&self) -> &ChatSession<E> {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use pomochat_core::{ParticipantId, config::DEFAULT_ENDPOINT};
    use url::Url;

    use super::*;
    use crate::LinkError;

    #[derive(Clone)]
    struct FixedEnv;

    impl Environment for FixedEnv {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        }
    }

    /// Transport whose links fail every write and never open.
    struct DeadTransport;

    struct DeadLink;

    impl Link for DeadLink {
        fn send(&mut self, _payload: String) -> Result<(), LinkError> {
            Err(LinkError::Closed)
        }

        fn close(&mut self, _code: u16, _reason: &str) {}
    }

    impl Transport for DeadTransport {
        type Link = DeadLink;

        fn open(&mut self, _url: &Url, _sink: EventSink) -> DeadLink {
            DeadLink
        }
    }

    fn id(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn runtime() -> Runtime<DeadTransport, FixedEnv> {
        let config = SessionConfig::new(DEFAULT_ENDPOINT).unwrap();
        Runtime::new(DeadTransport, FixedEnv, config, RuntimeConfig::default()).0
    }

    #[test]
    fn open_action_registers_link() {
        let mut runtime = runtime();
        let actions = runtime.session.connect(id("alice"), id("bob")).unwrap();

        runtime.execute(actions);

        assert_eq!(runtime.links.len(), 1);
        assert!(runtime.snapshots.borrow().is_connecting);
    }

    #[test]
    fn failed_write_is_fed_back_as_send_failure() {
        let mut runtime = runtime();
        let actions = runtime.session.connect(id("alice"), id("bob")).unwrap();
        runtime.execute(actions);
        let generation = runtime.session.state().generation().unwrap();
        let actions = runtime.session.handle_transport(generation, TransportEvent::Opened);
        runtime.execute(actions);

        let actions = runtime.session.send("hello").unwrap();
        let failure = runtime.execute(actions);

        assert!(matches!(failure, Some(SessionError::SendFailure { .. })));
        assert!(runtime.session.is_connected());
        assert!(matches!(runtime.snapshots.borrow().error, Some(SessionError::SendFailure { .. })));
    }

    #[test]
    fn close_removes_link() {
        let mut runtime = runtime();
        let actions = runtime.session.connect(id("alice"), id("bob")).unwrap();
        runtime.execute(actions);

        let actions = runtime.session.disconnect();
        runtime.execute(actions);

        assert!(runtime.links.is_empty());
        assert!(!runtime.snapshots.borrow().is_connecting);
    }
}
