//! Bridge between per-connection network tasks and the tick loop.
//!
//! Network tasks push [`NetEvent`]s into a bounded [`tokio::sync::mpsc`]
//! channel; the tick loop drains everything pending with [`drain_events`]
//! before running any sync-dependent logic.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::messages::Message;

/// Unique identifier for a connection within one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Atomic generator for monotonically increasing [`ConnectionId`]s.
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Return the next unique [`ConnectionId`].
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// Payload-free tag of a [`Message`], for logging and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Welcome,
    FullSync,
    DeltaSync,
    BiomeFlagSync,
    PlayerLeft,
}

impl Message {
    /// Extract the kind from a message without consuming it.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Welcome(_) => MessageKind::Welcome,
            Message::FullSync(_) => MessageKind::FullSync,
            Message::DeltaSync(_) => MessageKind::DeltaSync,
            Message::BiomeFlagSync(_) => MessageKind::BiomeFlagSync,
            Message::PlayerLeft(_) => MessageKind::PlayerLeft,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound handle
// ---------------------------------------------------------------------------

/// Why a message could not be queued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("outbound queue of {0} is full")]
    Full(ConnectionId),
    #[error("{0} is closed")]
    Closed(ConnectionId),
}

/// Tick-side handle for queueing messages to one connection's writer task.
/// Dropping every clone closes the connection's write side.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<Message>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<Message>) -> Self {
        Self { id, outbound }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues `msg` without blocking. Messages queued through one handle are
    /// written in queue order.
    pub fn send(&self, msg: Message) -> Result<(), SendError> {
        self.outbound.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full(self.id),
            mpsc::error::TrySendError::Closed(_) => SendError::Closed(self.id),
        })
    }
}

// ---------------------------------------------------------------------------
// Event channel
// ---------------------------------------------------------------------------

/// Something that happened on the I/O side since the last drain.
#[derive(Debug)]
pub enum NetEvent {
    /// A connection was established.
    Connected(ConnectionHandle),
    /// A complete message arrived.
    Received {
        connection: ConnectionId,
        message: Message,
    },
    /// The connection's reader stopped.
    Disconnected(ConnectionId),
}

/// Create a channel pair for passing events from network tasks to the tick
/// loop.
pub fn event_channel(buffer: usize) -> (mpsc::Sender<NetEvent>, mpsc::Receiver<NetEvent>) {
    mpsc::channel(buffer.max(1))
}

/// Takes every event currently queued, in arrival order, without waiting.
pub fn drain_events(receiver: &mut mpsc::Receiver<NetEvent>) -> Vec<NetEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}
