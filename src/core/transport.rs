//! Request/response multiplexing over one connection
//!
//! Every request gets the next id and a pending reply. Incoming frames whose
//! id matches a pending request resolve it and go no further; every other
//! frame comes back to the caller as an [`Event`] for dispatch.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use super::protocol::{ProtocolError, Request, RequestFrame, ResponseFrame};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("not connected")]
    NotConnected,

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to send frame: {0}")]
    Channel(#[source] io::Error),

    #[error("connection closed before the reply arrived")]
    Closed,
}

/// The bidirectional message channel to the server
pub trait Channel {
    fn send(&mut self, frame: &str) -> io::Result<()>;
}

/// A correlated reply: the tag and everything after it
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub tag: String,
    pub args: Vec<Value>,
}

/// An uncorrelated, server-pushed message
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub tag: String,
    pub args: Vec<Value>,
}

/// Resolves exactly once with the reply to one request
#[derive(Debug)]
pub struct PendingReply {
    id: u64,
    rx: oneshot::Receiver<Reply>,
}

impl PendingReply {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Take the reply if it has arrived, without waiting.
    pub fn try_take(&mut self) -> Result<Option<Reply>, TransportError> {
        self.rx.try_recv().map_err(|_| TransportError::Closed)
    }
}

impl Future for PendingReply {
    type Output = Result<Reply, TransportError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|reply| reply.map_err(|_| TransportError::Closed))
    }
}

/// Owns the connection and the table of outstanding requests
pub struct Transport<C> {
    channel: Option<C>,
    next_id: u64,
    pending: HashMap<u64, oneshot::Sender<Reply>>,
}

impl<C: Channel> Default for Transport<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Channel> Transport<C> {
    pub fn new() -> Self {
        Self {
            channel: None,
            next_id: 0,
            pending: HashMap::new(),
        }
    }

    pub fn connect(&mut self, channel: C) {
        self.channel = Some(channel);
    }

    /// Drop the channel. Outstanding replies resolve with `Closed`.
    pub fn disconnect(&mut self) -> Option<C> {
        self.pending.clear();
        self.channel.take()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Send a request and return its pending reply.
    ///
    /// Fails immediately when no channel is connected; nothing is queued.
    pub fn request(&mut self, request: Request) -> Result<PendingReply, TransportError> {
        let channel = self.channel.as_mut().ok_or(TransportError::NotConnected)?;

        let id = self.next_id;
        self.next_id += 1;

        let frame = RequestFrame {
            id,
            request: request.payload(),
        };
        let text = serde_json::to_string(&frame).map_err(TransportError::Encode)?;
        channel.send(&text).map_err(TransportError::Channel)?;
        trace!(id, kind = ?request.kind(), frame = %text, "sent");

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        Ok(PendingReply { id, rx })
    }

    /// Handle one incoming frame.
    ///
    /// A frame answering a pending request resolves it and yields `None`;
    /// anything else is returned as an event.
    pub fn receive(&mut self, text: &str) -> Result<Option<Event>, ProtocolError> {
        let frame = ResponseFrame::parse(text)?;
        let id = frame.id;
        // A matched request is settled even when its reply is malformed
        let pending = id.and_then(|id| self.pending.remove(&id));
        let (tag, args) = frame.into_message()?;

        if let Some(tx) = pending {
            trace!(?id, %tag, "resolved");
            if tx.send(Reply { tag, args }).is_err() {
                debug!(?id, "reply dropped, nobody waiting");
            }
            return Ok(None);
        }

        Ok(Some(Event { tag, args }))
    }
}
