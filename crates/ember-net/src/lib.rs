//! Sync networking: wire messages, length-prefixed framing, per-connection
//! tasks, and the channel that hands received messages to the tick loop.

pub mod connection;
pub mod framing;
pub mod messages;
pub mod routing;

pub use connection::{ConnectionConfig, connect, serve, spawn_connection};
pub use framing::{FrameConfig, FrameError, read_frame, read_message, write_frame, write_message};
pub use messages::{
    BiomeFlagSync, DeltaSync, FieldUpdate, FullSync, Message, MessageError, PROTOCOL_VERSION,
    PlayerLeft, Welcome, deserialize_message, serialize_message,
};
pub use routing::{
    ConnectionHandle, ConnectionId, IdGenerator, MessageKind, NetEvent, SendError, drain_events,
    event_channel,
};
