//! Per-connection message loop.
//!
//! A session reads one text message at a time, answers it completely, then
//! reads the next. Requests that cannot be decoded or that fail are logged
//! and get no reply; only a closed transport ends the loop.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::NoteService;
use crate::error::{NoteError, NoteResult};
use crate::protocol::{Envelope, Reply, Request, Response};

/// The note service shared by every open session.
pub type SharedService = Arc<Mutex<NoteService>>;

/// The peer went away while a reply was being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transport closed")]
pub struct TransportClosed;

/// A full-duplex, in-order text channel.
pub trait Transport: Send {
    /// Waits for the next text message. `None` means the peer disconnected.
    fn recv(&mut self) -> impl Future<Output = Option<String>> + Send;

    /// Sends one text message.
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), TransportClosed>> + Send;
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closed,
}

/// Per-session behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Push a `GET_BACK` with the recent notes as soon as the session opens.
    pub snapshot_on_connect: bool,
}

/// One client connection bound to the shared note service.
pub struct Session<T: Transport> {
    transport: T,
    service: SharedService,
    options: SessionOptions,
    state: SessionState,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, service: SharedService, options: SessionOptions) -> Self {
        Self {
            transport,
            service,
            options,
            state: SessionState::Connecting,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Consumes the session, handing back its transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Runs the session until the transport closes.
    ///
    /// Returns the session in its `Closed` state.
    pub async fn run(mut self) -> Self {
        self.state = SessionState::Open;
        tracing::debug!("Session open");

        if self.options.snapshot_on_connect {
            let snapshot = Envelope {
                request_id: None,
                request: Request::List,
            };
            if let Some(reply) = respond(&self.service, snapshot) {
                if self.transport.send(reply).await.is_err() {
                    return self.close();
                }
            }
        }

        while let Some(text) = self.transport.recv().await {
            let Some(reply) = handle_message(&self.service, &text) else {
                continue;
            };
            if self.transport.send(reply).await.is_err() {
                break;
            }
        }

        self.close()
    }

    fn close(mut self) -> Self {
        self.state = SessionState::Closed;
        tracing::debug!("Session closed");
        self
    }
}

/// Decodes, executes and encodes one message.
///
/// Returns `None` when no reply should be sent.
pub fn handle_message(service: &SharedService, text: &str) -> Option<String> {
    match Envelope::decode(text) {
        Ok(envelope) => respond(service, envelope),
        Err(err) => {
            tracing::warn!(error = %err, "Dropping unroutable message");
            None
        }
    }
}

fn respond(service: &SharedService, envelope: Envelope) -> Option<String> {
    let method = envelope.request.method();

    let response = match execute(service, envelope.request) {
        Ok(response) => response,
        Err(NoteError::Storage(err)) => {
            tracing::error!(method, error = %err, "Request failed in storage");
            return None;
        }
        Err(err) => {
            tracing::warn!(method, error = %err, "Dropping rejected request");
            return None;
        }
    };

    match Reply::new(response, envelope.request_id).encode() {
        Ok(text) => {
            tracing::debug!(method, "Replied");
            Some(text)
        }
        Err(err) => {
            tracing::error!(method, error = %err, "Failed to encode reply");
            None
        }
    }
}

/// Runs a request to completion under the service lock.
///
/// The lock is never held across an await, so a request is never abandoned
/// half way through its storage writes. A request that panicked has had its
/// transaction rolled back on unwind, so a poisoned lock is taken over.
fn execute(service: &SharedService, request: Request) -> NoteResult<Response> {
    let service = service.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Recovering note service after a panicked request");
        PoisonError::into_inner(poisoned)
    });
    service.handle(request)
}
