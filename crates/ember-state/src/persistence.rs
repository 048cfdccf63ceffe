//! Versioned key-value save codec for the persisted subset of
//! [`ExtensionState`].
//!
//! A [`SaveTag`] maps stable string keys to typed primitives. Loading never
//! partially populates state: every key is decoded (absent keys resolve to
//! the documented defaults of [`PersistedFields`]) before anything is
//! returned, and a wrongly-typed value fails the whole load.
//!
//! Saves older than the key-value format are a fixed-order little-endian
//! stream that starts with an `i32` format version; see
//! [`PersistenceCodec::load_legacy`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extension::ExtensionState;

/// Current schema version written under [`KEY_SCHEMA`].
///
/// History: 1 = `score` + `lifeCrystals`; 2 = adds `partyMode`.
pub const SCHEMA_VERSION: i32 = 2;

/// Highest format version the legacy stream loader understands.
pub const LEGACY_FORMAT_VERSION: i32 = 0;

pub const KEY_SCHEMA: &str = "schema";
pub const KEY_SCORE: &str = "score";
pub const KEY_LIFE_CRYSTALS: &str = "lifeCrystals";
pub const KEY_PARTY_MODE: &str = "partyMode";

// ---------------------------------------------------------------------------
// Tag values
// ---------------------------------------------------------------------------

/// A typed primitive stored under a save key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Int(i32),
    Bool(bool),
    Float(f32),
}

impl TagValue {
    fn kind(&self) -> &'static str {
        match self {
            TagValue::Int(_) => "int",
            TagValue::Bool(_) => "bool",
            TagValue::Float(_) => "float",
        }
    }
}

impl From<i32> for TagValue {
    fn from(v: i32) -> Self {
        TagValue::Int(v)
    }
}

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        TagValue::Bool(v)
    }
}

impl From<f32> for TagValue {
    fn from(v: f32) -> Self {
        TagValue::Float(v)
    }
}

/// Mapping from stable key to typed value. Ordered so that encoded saves are
/// byte-for-byte reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveTag(BTreeMap<String, TagValue>);

impl SaveTag {
    /// Creates an empty tag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<TagValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Raw lookup.
    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.0.get(key)
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<TagValue> {
        self.0.remove(key)
    }

    /// Integer under `key`; `Ok(None)` if absent.
    pub fn get_int(&self, key: &str) -> Result<Option<i32>, PersistenceError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(TagValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(PersistenceError::type_mismatch(key, "int", other)),
        }
    }

    /// Boolean under `key`; `Ok(None)` if absent.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, PersistenceError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(TagValue::Bool(v)) => Ok(Some(*v)),
            Some(other) => Err(PersistenceError::type_mismatch(key, "bool", other)),
        }
    }

    /// Float under `key`; `Ok(None)` if absent.
    pub fn get_float(&self, key: &str) -> Result<Option<f32>, PersistenceError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(TagValue::Float(v)) => Ok(Some(*v)),
            Some(other) => Err(PersistenceError::type_mismatch(key, "float", other)),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a save could not be loaded or written.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// A key holds a value of the wrong primitive type.
    #[error("key `{key}` holds {found}, expected {expected}")]
    TypeMismatch {
        /// Offending key.
        key: String,
        /// Expected primitive kind.
        expected: &'static str,
        /// Primitive kind found.
        found: &'static str,
    },

    /// The save was written by a newer schema than this build knows.
    #[error("save schema {found} is newer than max supported {max_supported}")]
    SchemaTooNew {
        /// Schema tag found in the save.
        found: i32,
        /// Highest schema this build reads.
        max_supported: i32,
    },

    /// The legacy stream carries a format version this loader cannot read.
    #[error("legacy save format {0} is not supported")]
    UnsupportedLegacyVersion(i32),

    /// The legacy stream ended before all fixed fields were read.
    #[error("legacy save truncated: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required for the next field.
        needed: usize,
        /// Bytes remaining.
        available: usize,
    },

    /// The save file header is present but of an unknown file version.
    #[error("save file version {0} is not supported")]
    UnsupportedFileVersion(u8),

    /// Decompression or deserialization of a save file failed.
    #[error("malformed save: {0}")]
    Malformed(String),

    /// I/O error reading or writing a save file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PersistenceError {
    fn type_mismatch(key: &str, expected: &'static str, found: &TagValue) -> Self {
        PersistenceError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: found.kind(),
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted fields
// ---------------------------------------------------------------------------

/// The persisted subset of [`ExtensionState`].
///
/// `Default` is the documented value for every absent key: score 0, no life
/// crystals, party mode off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistedFields {
    pub score: i32,
    pub life_crystals: i32,
    pub party_mode: bool,
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Save/load between [`ExtensionState`] and [`SaveTag`].
pub struct PersistenceCodec;

impl PersistenceCodec {
    /// Snapshot of the persisted subset, tagged with [`SCHEMA_VERSION`].
    pub fn save(state: &ExtensionState) -> SaveTag {
        let fields = state.persisted();
        let mut tag = SaveTag::new();
        tag.set(KEY_SCHEMA, SCHEMA_VERSION);
        tag.set(KEY_SCORE, fields.score);
        tag.set(KEY_LIFE_CRYSTALS, fields.life_crystals);
        tag.set(KEY_PARTY_MODE, fields.party_mode);
        tag
    }

    /// Decodes every persisted key, substituting defaults for absent ones.
    ///
    /// # Errors
    ///
    /// [`PersistenceError::TypeMismatch`] for a wrongly-typed value and
    /// [`PersistenceError::SchemaTooNew`] for a save from a newer build.
    pub fn load(tag: &SaveTag) -> Result<PersistedFields, PersistenceError> {
        // Saves from before the schema tag are schema 1.
        let schema = tag.get_int(KEY_SCHEMA)?.unwrap_or(1);
        if schema > SCHEMA_VERSION {
            return Err(PersistenceError::SchemaTooNew {
                found: schema,
                max_supported: SCHEMA_VERSION,
            });
        }

        let defaults = PersistedFields::default();
        let score = tag.get_int(KEY_SCORE)?.unwrap_or(defaults.score);
        let life_crystals = tag
            .get_int(KEY_LIFE_CRYSTALS)?
            .unwrap_or(defaults.life_crystals);
        let party_mode = tag
            .get_bool(KEY_PARTY_MODE)?
            .unwrap_or(defaults.party_mode);

        Ok(PersistedFields {
            score,
            life_crystals,
            party_mode,
        })
    }

    /// Loads `tag` into `state`. On error `state` is left untouched.
    pub fn load_into(tag: &SaveTag, state: &mut ExtensionState) -> Result<(), PersistenceError> {
        let fields = Self::load(tag)?;
        state.restore(&fields);
        Ok(())
    }

    /// Reads a pre-key-value save: `i32` format version, then `i32` score,
    /// both little-endian. Fields the legacy format never stored take their
    /// defaults.
    pub fn load_legacy(bytes: &[u8]) -> Result<PersistedFields, PersistenceError> {
        let mut reader = LegacyReader { bytes };
        let version = reader.read_i32()?;
        if version > LEGACY_FORMAT_VERSION || version < 0 {
            return Err(PersistenceError::UnsupportedLegacyVersion(version));
        }
        let score = reader.read_i32()?;
        Ok(PersistedFields {
            score,
            ..PersistedFields::default()
        })
    }

    /// Writes the legacy stream. Only used to produce fixtures for the
    /// legacy loader.
    pub fn encode_legacy(score: i32) -> Vec<u8> {
        let mut out = Vec::with_capacity(8);
        out.extend_from_slice(&LEGACY_FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&score.to_le_bytes());
        out
    }
}

struct LegacyReader<'a> {
    bytes: &'a [u8],
}

impl LegacyReader<'_> {
    fn read_i32(&mut self) -> Result<i32, PersistenceError> {
        let Some((head, rest)) = self.bytes.split_first_chunk::<4>() else {
            return Err(PersistenceError::Truncated {
                needed: 4,
                available: self.bytes.len(),
            });
        };
        self.bytes = rest;
        Ok(i32::from_le_bytes(*head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_state() -> ExtensionState {
        let mut state = ExtensionState::new();
        state.score = 1234;
        state.life_crystals = 7;
        state.party_mode = true;
        state
    }


    #[test]
    fn test_save_writes_schema_tag() {
        let tag = PersistenceCodec::save(&ExtensionState::new());
        assert_eq!(tag.get_int(KEY_SCHEMA).unwrap(), Some(SCHEMA_VERSION));
        assert_eq!(tag.len(), 4);
    }

    #[test]
    fn test_missing_key_uses_default() {
        let mut tag = PersistenceCodec::save(&sample_state());
        tag.remove(KEY_PARTY_MODE);
        let loaded = PersistenceCodec::load(&tag).unwrap();
        assert!(!loaded.party_mode);
        assert_eq!(loaded.score, 1234);
    }

    #[test]
    fn test_empty_tag_yields_all_defaults() {
        let loaded = PersistenceCodec::load(&SaveTag::new()).unwrap();
        assert_eq!(loaded, PersistedFields::default());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let mut tag = SaveTag::new();
        tag.set(KEY_SCORE, 5);
        tag.set(KEY_LIFE_CRYSTALS, true);
        let err = PersistenceCodec::load(&tag).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::TypeMismatch { ref key, expected: "int", found: "bool" }
                if key == KEY_LIFE_CRYSTALS
        ));
    }

    #[test]
    fn test_failed_load_leaves_state_untouched() {
        let mut state = sample_state();
        let before = state.clone();
        let mut tag = SaveTag::new();
        tag.set(KEY_SCORE, 1);
        tag.set(KEY_PARTY_MODE, 0.5f32);
        assert!(PersistenceCodec::load_into(&tag, &mut state).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_newer_schema_rejected() {
        let mut tag = SaveTag::new();
        tag.set(KEY_SCHEMA, SCHEMA_VERSION + 1);
        assert!(matches!(
            PersistenceCodec::load(&tag),
            Err(PersistenceError::SchemaTooNew { .. })
        ));
    }

    #[test]
    fn test_out_of_range_crystals_load_as_stored() {
        let mut tag = SaveTag::new();
        tag.set(KEY_LIFE_CRYSTALS, 99);
        assert_eq!(PersistenceCodec::load(&tag).unwrap().life_crystals, 99);
    }

    #[test]
    fn test_legacy_stream_loads_score() {
        let bytes = PersistenceCodec::encode_legacy(42);
        let loaded = PersistenceCodec::load_legacy(&bytes).unwrap();
        assert_eq!(loaded.score, 42);
        assert_eq!(loaded.life_crystals, 0);
        assert!(!loaded.party_mode);
    }

    #[test]
    fn test_legacy_truncated_stream_is_error() {
        let bytes = PersistenceCodec::encode_legacy(42);
        assert!(matches!(
            PersistenceCodec::load_legacy(&bytes[..6]),
            Err(PersistenceError::Truncated {
                needed: 4,
                available: 2
            })
        ));
    }

    #[test]
    fn test_legacy_unknown_version_is_error() {
        let mut bytes = PersistenceCodec::encode_legacy(1);
        bytes[..4].copy_from_slice(&3i32.to_le_bytes());
        assert!(matches!(
            PersistenceCodec::load_legacy(&bytes),
            Err(PersistenceError::UnsupportedLegacyVersion(3))
        ));
    }

    proptest! {
        #[test]
        fn prop_load_reproduces_saved_fields(
            score in any::<i32>(),
            life_crystals in any::<i32>(),
            party_mode in any::<bool>(),
        ) {
            let mut state = ExtensionState::new();
            state.score = score;
            state.life_crystals = life_crystals;
            state.party_mode = party_mode;

            let loaded = PersistenceCodec::load(&PersistenceCodec::save(&state)).unwrap();
            prop_assert_eq!(loaded, state.persisted());

            let mut restored = ExtensionState::new();
            PersistenceCodec::load_into(&PersistenceCodec::save(&state), &mut restored).unwrap();
            prop_assert_eq!(restored, state);
        }
    }
}
