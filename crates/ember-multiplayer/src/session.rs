//! Sync sessions on both ends of a connection.
//!
//! A [`ClientSession`] owns exactly one player's [`ExtensionState`]. Each
//! tick it checkpoints before gameplay runs and diffs after, turning the
//! changes into [`DeltaSync`] / [`BiomeFlagSync`] messages. Everyone else
//! sees that player only as a [`Mirror`](crate::Mirror).
//!
//! A [`ServerSession`] assigns each connection one player slot, accepts sync
//! traffic only for that slot, applies it to its own mirror and relays it to
//! every other connection. Ordering relies on each connection's queue being
//! FIFO: a joiner's [`FullSync`] is relayed before any delta it sends after.

use std::collections::BTreeMap;

use ember_net::{
    BiomeFlagSync, ConnectionHandle, ConnectionId, DeltaSync, FullSync, Message, NetEvent,
    PlayerLeft, Welcome,
};
use ember_state::{ChangedFields, CloneDiffer, ExtensionState, PlayerIndex};

use crate::error::SyncError;
use crate::replication::MirrorTable;

// ---------------------------------------------------------------------------
// ClientSession
// ---------------------------------------------------------------------------

/// The owning side of one player.
pub struct ClientSession {
    player: Option<PlayerIndex>,
    state: ExtensionState,
    differ: CloneDiffer,
    mirrors: MirrorTable,
}

impl ClientSession {
    /// Wraps a loaded (or fresh) state. No messages flow until the server's
    /// [`Welcome`] assigns a slot.
    pub fn new(state: ExtensionState) -> Self {
        Self {
            player: None,
            state,
            differ: CloneDiffer::new(),
            mirrors: MirrorTable::new(),
        }
    }

    /// Slot assigned by the server, once welcomed.
    pub fn player(&self) -> Option<PlayerIndex> {
        self.player
    }

    pub fn state(&self) -> &ExtensionState {
        &self.state
    }

    /// The owned state. Mutate only between [`begin_tick`](Self::begin_tick)
    /// and [`end_tick`](Self::end_tick), or the change is reported a tick
    /// late.
    pub fn state_mut(&mut self) -> &mut ExtensionState {
        &mut self.state
    }

    pub fn mirrors(&self) -> &MirrorTable {
        &self.mirrors
    }

    /// Checkpoints the replicated subset before any gameplay mutation.
    pub fn begin_tick(&mut self) {
        self.differ.checkpoint(&self.state);
    }

    /// Diffs against the tick's checkpoint and returns the messages to send.
    pub fn end_tick(&mut self) -> Vec<Message> {
        let changed = self.differ.diff(&self.state);
        let Some(player) = self.player else {
            return Vec::new();
        };
        sync_messages(player, changed, &self.state)
    }

    /// Applies one message from the server. Returns replies to send back.
    pub fn handle(&mut self, message: Message) -> Result<Vec<Message>, SyncError> {
        match message {
            Message::Welcome(Welcome { player }) => {
                tracing::info!(%player, "joined session");
                self.player = Some(player);
                let full = FullSync::from_fields(player, &self.state.replicated());
                Ok(vec![Message::FullSync(full)])
            }
            msg if Some(msg.player()) == self.player => {
                tracing::debug!(kind = ?msg.kind(), "ignoring sync about own player");
                Ok(Vec::new())
            }
            Message::FullSync(msg) => {
                self.mirrors.apply_full(&msg)?;
                Ok(Vec::new())
            }
            Message::DeltaSync(msg) => {
                self.mirrors.apply_delta(&msg)?;
                Ok(Vec::new())
            }
            Message::BiomeFlagSync(msg) => {
                if self.mirrors.apply_biome(&msg)? {
                    tracing::trace!(player = %msg.player, "biome transition");
                }
                Ok(Vec::new())
            }
            Message::PlayerLeft(PlayerLeft { player }) => {
                self.mirrors.remove(player);
                Ok(Vec::new())
            }
        }
    }

    /// Applies a drained batch of network events. Errors are logged and the
    /// offending message dropped.
    pub fn process_events(&mut self, events: Vec<NetEvent>) -> Vec<Message> {
        let mut replies = Vec::new();
        for event in events {
            match event {
                NetEvent::Received { message, .. } => {
                    let kind = message.kind();
                    match self.handle(message) {
                        Ok(mut out) => replies.append(&mut out),
                        Err(e) => tracing::warn!(?kind, error = %e, "dropped sync message"),
                    }
                }
                NetEvent::Connected(handle) => {
                    tracing::debug!(connection = %handle.id(), "link up");
                }
                NetEvent::Disconnected(connection) => {
                    tracing::warn!(%connection, "lost server link");
                }
            }
        }
        replies
    }
}

/// Messages describing `changed` for `player`. Scalars go out as one delta,
/// zones as one packed byte.
pub fn sync_messages(
    player: PlayerIndex,
    changed: ChangedFields,
    state: &ExtensionState,
) -> Vec<Message> {
    let mut out = Vec::new();
    let current = state.replicated();
    if let Some(delta) = DeltaSync::from_changes(player, changed, &current) {
        out.push(Message::DeltaSync(delta));
    }
    if changed.contains(ChangedFields::ZONES) {
        out.push(Message::BiomeFlagSync(BiomeFlagSync::new(
            player,
            current.zones,
        )));
    }
    out
}

// ---------------------------------------------------------------------------
// ServerSession
// ---------------------------------------------------------------------------

struct Seat {
    player: PlayerIndex,
    handle: ConnectionHandle,
}

/// The relaying authority.
pub struct ServerSession {
    max_players: u32,
    seats: BTreeMap<ConnectionId, Seat>,
    mirrors: MirrorTable,
}

impl ServerSession {
    /// `max_players` is clamped to the 256 indices a [`PlayerIndex`] can hold.
    pub fn new(max_players: u32) -> Self {
        Self {
            max_players: max_players.min(256),
            seats: BTreeMap::new(),
            mirrors: MirrorTable::new(),
        }
    }

    pub fn mirrors(&self) -> &MirrorTable {
        &self.mirrors
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    /// Slot owned by `connection`.
    pub fn owner_of(&self, connection: ConnectionId) -> Option<PlayerIndex> {
        self.seats.get(&connection).map(|s| s.player)
    }

    /// Seats a new connection in the lowest free slot, welcomes it, and sends
    /// it a snapshot of every player already present.
    pub fn connect(&mut self, handle: ConnectionHandle) -> Result<PlayerIndex, SyncError> {
        let player = self.free_slot().ok_or(SyncError::SessionFull(self.max_players))?;
        let connection = handle.id();

        send(&handle, Message::Welcome(Welcome { player }));
        for snapshot in self.mirrors.snapshots() {
            send(&handle, Message::FullSync(snapshot));
        }

        self.seats.insert(connection, Seat { player, handle });
        tracing::info!(%connection, %player, "player seated");
        Ok(player)
    }

    /// Frees the connection's slot, drops its mirror and tells everyone else.
    pub fn disconnect(&mut self, connection: ConnectionId) {
        let Some(seat) = self.seats.remove(&connection) else {
            return;
        };
        self.mirrors.remove(seat.player);
        self.broadcast_except(
            connection,
            &Message::PlayerLeft(PlayerLeft {
                player: seat.player,
            }),
        );
        tracing::info!(%connection, player = %seat.player, "player left");
    }

    /// Applies a client's sync message to its mirror and relays it.
    pub fn handle(&mut self, connection: ConnectionId, message: Message) -> Result<(), SyncError> {
        let owned = self
            .owner_of(connection)
            .ok_or(SyncError::UnknownConnection(connection))?;
        let player = message.player();
        if player != owned {
            return Err(SyncError::NotOwner { connection, player });
        }

        match &message {
            Message::FullSync(msg) => self.mirrors.apply_full(msg)?,
            Message::DeltaSync(msg) => self.mirrors.apply_delta(msg)?,
            Message::BiomeFlagSync(msg) => {
                self.mirrors.apply_biome(msg)?;
            }
            Message::Welcome(_) | Message::PlayerLeft(_) => {
                return Err(SyncError::Unexpected(message.kind()));
            }
        }
        self.broadcast_except(connection, &message);
        Ok(())
    }

    /// Applies a drained batch of network events. Sync errors are logged and
    /// the offending message dropped; a full session closes the newcomer.
    pub fn process_events(&mut self, events: Vec<NetEvent>) {
        for event in events {
            match event {
                NetEvent::Connected(handle) => {
                    let connection = handle.id();
                    if let Err(e) = self.connect(handle) {
                        tracing::warn!(%connection, error = %e, "rejecting connection");
                    }
                }
                NetEvent::Received {
                    connection,
                    message,
                } => {
                    let kind = message.kind();
                    if let Err(e) = self.handle(connection, message) {
                        tracing::warn!(%connection, ?kind, error = %e, "dropped sync message");
                    }
                }
                NetEvent::Disconnected(connection) => self.disconnect(connection),
            }
        }
    }

    fn free_slot(&self) -> Option<PlayerIndex> {
        let taken: Vec<PlayerIndex> = self.seats.values().map(|s| s.player).collect();
        (0..self.max_players)
            .filter_map(|i| u8::try_from(i).ok().map(PlayerIndex))
            .find(|p| !taken.contains(p))
    }

    fn broadcast_except(&self, origin: ConnectionId, message: &Message) {
        for (connection, seat) in &self.seats {
            if *connection != origin {
                send(&seat.handle, message.clone());
            }
        }
    }
}

fn send(handle: &ConnectionHandle, message: Message) {
    if let Err(e) = handle.send(message) {
        tracing::warn!(error = %e, "outbound message dropped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
