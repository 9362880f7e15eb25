//! Transport backed by the in-process hub.

use pomochat_app::{EventSink, Link, LinkError, Transport};
use url::Url;

use crate::sim_hub::{ConnectionId, SimHub};

/// Opens connections on a [`SimHub`].
#[derive(Debug, Clone)]
pub struct SimTransport {
    hub: SimHub,
}

impl SimTransport {
    /// Transport connecting to `hub`.
    pub fn new(hub: SimHub) -> Self {
        Self { hub }
    }
}

impl Transport for SimTransport {
    type Link = SimLink;

    fn open(&mut self, url: &Url, sink: EventSink) -> SimLink {
        let id = self.hub.connect(url, sink);
        SimLink { hub: self.hub.clone(), id }
    }
}

/// One connection on a [`SimHub`].
///
/// A refused open yields a link with no connection; writes to it fail.
#[derive(Debug)]
pub struct SimLink {
    hub: SimHub,
    id: Option<ConnectionId>,
}

impl Link for SimLink {
    fn send(&mut self, payload: String) -> Result<(), LinkError> {
        match self.id {
            Some(id) => self.hub.receive(id, &payload),
            None => Err(LinkError::Closed),
        }
    }

    fn close(&mut self, code: u16, reason: &str) {
        if let Some(id) = self.id.take() {
            self.hub.close(id, code, reason);
        }
    }
}
