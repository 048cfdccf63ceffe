//! Errors raised while applying sync traffic or queueing saves.
//!
//! None of these end a session. The session loop logs them and moves on.

use ember_net::{ConnectionId, MessageKind};
use ember_state::{PersistenceError, PlayerIndex, UnknownZoneBits};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The message names a player with no mirror here, typically one that
    /// left while the message was in flight.
    #[error("no mirror for player {0}")]
    UnknownPlayer(PlayerIndex),

    /// A connection sent sync data for a player it does not own.
    #[error("{connection} does not own player {player}")]
    NotOwner {
        connection: ConnectionId,
        player: PlayerIndex,
    },

    /// Sync data from a connection that has not been assigned a slot.
    #[error("{0} has no player slot")]
    UnknownConnection(ConnectionId),

    /// Every player slot is taken.
    #[error("all {0} player slots are in use")]
    SessionFull(u32),

    /// This side never accepts this kind of message.
    #[error("unexpected {0:?} message")]
    Unexpected(MessageKind),

    #[error(transparent)]
    ZoneBits(#[from] UnknownZoneBits),

    #[error("save queue is full")]
    SaveQueueFull,

    #[error("save queue is closed")]
    SaveQueueClosed,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
