//! Terminal rendering of session snapshots.
//!
//! Output is append-only: each snapshot prints only what changed since the
//! previous one (status, new messages, new error).

use std::io::{self, Write};

use chrono::DateTime;
use pomochat_core::{ChatSnapshot, Generation, Message, RoomId, SessionError};

/// Incremental snapshot printer.
pub struct Printer<W: Write> {
    out: W,
    room: Option<(RoomId, Option<Generation>)>,
    printed: usize,
    status: Option<String>,
    error: Option<SessionError>,
}

impl<W: Write> Printer<W> {
    /// Printer writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out, room: None, printed: 0, status: None, error: None }
    }

    /// Print whatever changed since the last call.
    pub fn render(&mut self, snapshot: &ChatSnapshot) -> io::Result<()> {
        let status = status_line(snapshot);
        if self.status.as_ref() != Some(&status) {
            writeln!(self.out, "-- {status}")?;
            self.status = Some(status);
        }

        let room_key = snapshot.active_room.as_ref().map(|room| (room.id.clone(), snapshot.transport));
        if room_key != self.room {
            self.room = room_key;
            self.printed = 0;
        }

        if let Some(room) = &snapshot.active_room {
            for message in room.messages.iter().skip(self.printed) {
                writeln!(self.out, "{}", format_message(message))?;
            }
            self.printed = room.messages.len();
        }

        if snapshot.error != self.error {
            if let Some(error) = &snapshot.error {
                writeln!(self.out, "!! {error}")?;
            }
            self.error.clone_from(&snapshot.error);
        }

        self.out.flush()
    }

    /// Print a line that is not part of the session state.
    pub fn notice(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// One-line connection summary.
pub fn status_line(snapshot: &ChatSnapshot) -> String {
    let peer = snapshot
        .target_user_id
        .as_ref()
        .map_or_else(|| "?".to_string(), ToString::to_string);

    match (&snapshot.active_room, snapshot.is_connecting) {
        (Some(room), _) => format!("connected to {peer} in room {}", room.id),
        (None, true) => format!("connecting to {peer}..."),
        (None, false) => "not connected".to_string(),
    }
}

/// Render a message as `[HH:MM:SS] sender: body`.
///
/// The time prefix is omitted when the message has no parseable timestamp.
/// Endpoint notices are shown as `* body`.
pub fn format_message(message: &Message) -> String {
    let time = message
        .timestamp
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| format!("[{}] ", t.format("%H:%M:%S")))
        .unwrap_or_default();

    if message.is_system() {
        format!("{time}* {}", message.body)
    } else {
        format!("{time}{}: {}", message.sender_id, message.body)
    }
}
