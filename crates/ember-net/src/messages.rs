//! Sync message types and serialization.
//!
//! All messages are serialized with [`postcard`] and prefixed with a protocol
//! version byte. The postcard variant index of [`Message`] is the
//! message-kind discriminant. Every player-scoped message carries the
//! [`PlayerIndex`] it describes so receivers can route it to a mirror.

use ember_state::{ChangedFields, PlayerIndex, ReplicatedFields, UnknownZoneBits, ZoneFlags};
use serde::{Deserialize, Serialize};

/// Current wire-protocol version. Prepended to every serialized message.
pub const PROTOCOL_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Top-level enum
// ---------------------------------------------------------------------------

/// Top-level sync message. The enum discriminant is the type tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Message {
    /// Server tells a new connection which player slot it owns.
    Welcome(Welcome),
    /// Complete replicated subset of one player.
    FullSync(FullSync),
    /// Changed scalar fields of one player.
    DeltaSync(DeltaSync),
    /// Packed zone flags of one player.
    BiomeFlagSync(BiomeFlagSync),
    /// A player left the session; receivers drop its mirror.
    PlayerLeft(PlayerLeft),
}

impl Message {
    /// The player a message describes.
    pub fn player(&self) -> PlayerIndex {
        match self {
            Message::Welcome(m) => m.player,
            Message::FullSync(m) => m.player,
            Message::DeltaSync(m) => m.player,
            Message::BiomeFlagSync(m) => m.player,
            Message::PlayerLeft(m) => m.player,
        }
    }
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// Slot assignment sent by the server right after accept.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Welcome {
    /// Slot the receiving connection owns.
    pub player: PlayerIndex,
}

/// Full replicated snapshot. Field order on the wire is fixed by the struct
/// order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FullSync {
    pub player: PlayerIndex,
    pub life_crystals: i32,
    pub party_mode: bool,
    pub hero_lives: i32,
    /// Packed [`ZoneFlags`] byte.
    pub zones: u8,
}

impl FullSync {
    /// Builds a snapshot message for `player`.
    pub fn from_fields(player: PlayerIndex, fields: &ReplicatedFields) -> Self {
        Self {
            player,
            life_crystals: fields.life_crystals,
            party_mode: fields.party_mode,
            hero_lives: fields.hero_lives,
            zones: fields.zones.encode(),
        }
    }

    /// The carried replicated subset. Fails on a zone byte with unused bits.
    pub fn to_fields(&self) -> Result<ReplicatedFields, UnknownZoneBits> {
        Ok(ReplicatedFields {
            life_crystals: self.life_crystals,
            party_mode: self.party_mode,
            hero_lives: self.hero_lives,
            zones: ZoneFlags::decode(self.zones)?,
        })
    }
}

/// One changed scalar field, tagged by its stable identifier (the variant).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FieldUpdate {
    LifeCrystals(i32),
    PartyMode(bool),
    HeroLives(i32),
}

impl FieldUpdate {
    /// The replicated field this update writes.
    pub fn field(&self) -> ChangedFields {
        match self {
            FieldUpdate::LifeCrystals(_) => ChangedFields::LIFE_CRYSTALS,
            FieldUpdate::PartyMode(_) => ChangedFields::PARTY_MODE,
            FieldUpdate::HeroLives(_) => ChangedFields::HERO_LIVES,
        }
    }

    /// Writes the update into `fields`.
    pub fn apply_to(&self, fields: &mut ReplicatedFields) {
        match *self {
            FieldUpdate::LifeCrystals(v) => fields.life_crystals = v,
            FieldUpdate::PartyMode(v) => fields.party_mode = v,
            FieldUpdate::HeroLives(v) => fields.hero_lives = v,
        }
    }
}

/// Changed scalar fields of one player. Zones never travel here; they use
/// [`BiomeFlagSync`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeltaSync {
    pub player: PlayerIndex,
    pub fields: Vec<FieldUpdate>,
}

impl DeltaSync {
    /// Builds a delta carrying the scalar members of `changed`, read from
    /// `current`. Returns `None` if no scalar field changed.
    pub fn from_changes(
        player: PlayerIndex,
        changed: ChangedFields,
        current: &ReplicatedFields,
    ) -> Option<Self> {
        let mut fields = Vec::new();
        if changed.contains(ChangedFields::LIFE_CRYSTALS) {
            fields.push(FieldUpdate::LifeCrystals(current.life_crystals));
        }
        if changed.contains(ChangedFields::PARTY_MODE) {
            fields.push(FieldUpdate::PartyMode(current.party_mode));
        }
        if changed.contains(ChangedFields::HERO_LIVES) {
            fields.push(FieldUpdate::HeroLives(current.hero_lives));
        }
        if fields.is_empty() {
            None
        } else {
            Some(Self { player, fields })
        }
    }
}

/// Packed zone-flag byte of one player.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BiomeFlagSync {
    pub player: PlayerIndex,
    pub flags: u8,
}

impl BiomeFlagSync {
    pub fn new(player: PlayerIndex, zones: ZoneFlags) -> Self {
        Self {
            player,
            flags: zones.encode(),
        }
    }
}

/// Departure notice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerLeft {
    pub player: PlayerIndex,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during message deserialization.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The payload was empty (no version byte).
    #[error("empty payload")]
    EmptyPayload,

    /// The protocol version byte did not match [`PROTOCOL_VERSION`].
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// Postcard serialization or deserialization failed.
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Serialize a [`Message`] into a versioned binary payload.
///
/// Wire format: `[version: u8] [postcard-encoded Message]`
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>, MessageError> {
    let body = postcard::to_allocvec(msg)?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(PROTOCOL_VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Deserialize a versioned binary payload into a [`Message`].
pub fn deserialize_message(data: &[u8]) -> Result<Message, MessageError> {
    let (&version, body) = data.split_first().ok_or(MessageError::EmptyPayload)?;
    if version != PROTOCOL_VERSION {
        return Err(MessageError::UnsupportedVersion(version));
    }
    Ok(postcard::from_bytes(body)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fields() -> ReplicatedFields {
        ReplicatedFields {
            life_crystals: 4,
            party_mode: true,
            hero_lives: 2,
            zones: ZoneFlags::GROVE | ZoneFlags::PURITY_ARENA,
        }
    }

    #[test]
    fn test_full_sync_carries_every_field() {
        let msg = FullSync::from_fields(PlayerIndex(3), &sample_fields());
        assert_eq!(msg.zones, 0b101);
        assert_eq!(msg.to_fields().unwrap(), sample_fields());
    }

    #[test]
    fn test_full_sync_with_unused_zone_bits_is_rejected() {
        let mut msg = FullSync::from_fields(PlayerIndex(0), &sample_fields());
        msg.zones = 0x80;
        assert_eq!(msg.to_fields(), Err(UnknownZoneBits(0x80)));
    }

    #[test]
    fn test_delta_contains_only_changed_scalars() {
        let delta = DeltaSync::from_changes(
            PlayerIndex(1),
            ChangedFields::HERO_LIVES | ChangedFields::ZONES,
            &sample_fields(),
        )
        .unwrap();
        assert_eq!(delta.fields, vec![FieldUpdate::HeroLives(2)]);
    }

    #[test]
    fn test_zone_only_change_produces_no_delta() {
        assert!(
            DeltaSync::from_changes(PlayerIndex(1), ChangedFields::ZONES, &sample_fields())
                .is_none()
        );
    }

    #[test]
    fn test_field_update_applies_independently() {
        let mut fields = ReplicatedFields::default();
        FieldUpdate::PartyMode(true).apply_to(&mut fields);
        FieldUpdate::LifeCrystals(7).apply_to(&mut fields);
        assert!(fields.party_mode);
        assert_eq!(fields.life_crystals, 7);
        assert_eq!(fields.hero_lives, 0);
    }

    #[test]
    fn test_kind_discriminant_leads_the_body() {
        let msg = Message::BiomeFlagSync(BiomeFlagSync::new(PlayerIndex(9), ZoneFlags::GROVE));
        let bytes = serialize_message(&msg).unwrap();
        assert_eq!(bytes, vec![PROTOCOL_VERSION, 3, 9, 1]);
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = Message::DeltaSync(DeltaSync {
            player: PlayerIndex(2),
            fields: vec![FieldUpdate::PartyMode(false), FieldUpdate::HeroLives(0)],
        });
        let bytes = serialize_message(&msg).unwrap();
        assert_eq!(deserialize_message(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_message_player() {
        let msg = Message::PlayerLeft(PlayerLeft {
            player: PlayerIndex(5),
        });
        assert_eq!(msg.player(), PlayerIndex(5));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let msg = Message::Welcome(Welcome {
            player: PlayerIndex(0),
        });
        let mut bytes = serialize_message(&msg).unwrap();
        bytes[0] = 255;
        assert!(matches!(
            deserialize_message(&bytes),
            Err(MessageError::UnsupportedVersion(255))
        ));
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(
            deserialize_message(&[]),
            Err(MessageError::EmptyPayload)
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(matches!(
            deserialize_message(&[PROTOCOL_VERSION, 0x7F, 0]),
            Err(MessageError::Postcard(_))
        ));
    }
}
