//! Player-state sync sessions for Ember.
//!
//! Connects the wire protocol in `ember-net` to the per-player state in
//! `ember-state`: an owning [`ClientSession`] per player, a relaying
//! [`ServerSession`], read-only [`Mirror`]s of remote players, and the
//! background [`SaveQueue`].

pub mod error;
pub mod replication;
pub mod save_queue;
pub mod session;

pub use error::SyncError;
pub use replication::{Mirror, MirrorTable};
pub use save_queue::{Autosave, SaveQueue, SaveRequest, load_or_default};
pub use session::{ClientSession, ServerSession, sync_messages};
