//! Per-player extension state: the record itself, its persisted subset and
//! save codec, the replicated subset with checkpoint/diff, and packed zone
//! flags.
//!
//! An [`ExtensionState`] is owned by exactly one process (the owning
//! connection). Other processes only ever see the replicated subset, as
//! [`ReplicatedFields`] values delivered by the sync protocol.

pub mod checkpoint;
pub mod extension;
pub mod persistence;
pub mod store;
pub mod zones;

pub use checkpoint::{ChangedFields, Checkpoint, CloneDiffer, ReplicatedFields};
pub use extension::{
    CostumeFlags, Effects, ExtensionState, LIFE_PER_CRYSTAL, LocalTimers, MAX_LIFE_CRYSTALS,
    PlayerIndex,
};
pub use persistence::{
    PersistedFields, PersistenceCodec, PersistenceError, SCHEMA_VERSION, SaveTag, TagValue,
};
pub use store::{
    SAVE_EXTENSION, decode_save, encode_save, load_save_file, quarantine_save_file, save_path,
    write_save_file,
};
pub use zones::{GROVE_TILE_THRESHOLD, UnknownZoneBits, ZoneFlags, ZoneSurvey};
