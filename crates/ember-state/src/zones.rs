//! Zone-membership flags packed into a single byte.
//!
//! Zones are re-evaluated every tick, so they travel as one byte with a bit
//! per flag instead of a tagged field list. Bits not assigned to a flag are
//! always zero on the wire.

use crate::extension::ExtensionState;

bitflags::bitflags! {
    /// Boolean zone memberships for one player.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ZoneFlags: u8 {
        /// Standing in the grove biome.
        const GROVE = 1 << 0;
        /// Within range of an active void monolith.
        const VOID_MONOLITH = 1 << 1;
        /// Inside the purity adversary's arena.
        const PURITY_ARENA = 1 << 2;
    }
}

/// Grove tiles that must surround a player for [`ZoneFlags::GROVE`].
pub const GROVE_TILE_THRESHOLD: u32 = 50;

/// A decoded zone byte set bits that no flag owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("zone byte {0:#010b} sets unused bits")]
pub struct UnknownZoneBits(pub u8);

impl ZoneFlags {
    /// Packs the flags into their wire byte.
    pub fn encode(self) -> u8 {
        self.bits()
    }

    /// Unpacks a wire byte. Rejects bytes with unused bits set.
    pub fn decode(byte: u8) -> Result<Self, UnknownZoneBits> {
        Self::from_bits(byte).ok_or(UnknownZoneBits(byte))
    }
}

/// Environment facts the base simulation gathered around a player this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneSurvey {
    /// Grove tiles counted near the player.
    pub grove_tiles: u32,
    /// A void monolith is active nearby.
    pub near_void_monolith: bool,
    /// The player stands inside the adversary arena.
    pub in_purity_arena: bool,
}

/// Recomputes a player's zone flags from this tick's survey.
pub fn update_zones(state: &mut ExtensionState, survey: &ZoneSurvey) {
    let mut zones = ZoneFlags::empty();
    zones.set(ZoneFlags::GROVE, survey.grove_tiles > GROVE_TILE_THRESHOLD);
    zones.set(ZoneFlags::VOID_MONOLITH, survey.near_void_monolith);
    zones.set(ZoneFlags::PURITY_ARENA, survey.in_purity_arena);
    state.zones = zones;
}

/// `true` only when every tracked flag matches exactly. Gates biome
/// transition visuals on the receiving side.
pub fn custom_biomes_match(a: ZoneFlags, b: ZoneFlags) -> bool {
    ZoneFlags::all()
        .iter()
        .all(|flag| a.contains(flag) == b.contains(flag))
}

/// Copies zone membership from one record to another.
pub fn copy_custom_biomes_to(from: &ExtensionState, to: &mut ExtensionState) {
    to.zones = from.zones;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_unused_bits_are_zero() {
        assert_eq!(ZoneFlags::all().encode() & 0b1111_1000, 0);
    }

    #[test]
    fn test_decode_rejects_unused_bits() {
        assert_eq!(ZoneFlags::decode(0b1000_0001), Err(UnknownZoneBits(0b1000_0001)));
    }

    #[test]
    fn test_every_representable_combination_roundtrips() {
        for byte in 0..=ZoneFlags::all().bits() {
            let flags = ZoneFlags::from_bits_truncate(byte);
            assert_eq!(ZoneFlags::decode(flags.encode()), Ok(flags));
        }
    }

    #[test]
    fn test_grove_threshold_is_exclusive() {
        let mut state = ExtensionState::new();
        update_zones(
            &mut state,
            &ZoneSurvey {
                grove_tiles: GROVE_TILE_THRESHOLD,
                ..Default::default()
            },
        );
        assert!(!state.zones.contains(ZoneFlags::GROVE));

        update_zones(
            &mut state,
            &ZoneSurvey {
                grove_tiles: GROVE_TILE_THRESHOLD + 1,
                near_void_monolith: true,
                ..Default::default()
            },
        );
        assert_eq!(state.zones, ZoneFlags::GROVE | ZoneFlags::VOID_MONOLITH);
    }

    #[test]
    fn test_copy_custom_biomes() {
        let mut from = ExtensionState::new();
        from.zones = ZoneFlags::PURITY_ARENA;
        let mut to = ExtensionState::new();
        copy_custom_biomes_to(&from, &mut to);
        assert!(custom_biomes_match(from.zones, to.zones));
    }

    proptest! {
        #[test]
        fn prop_match_is_exact_equality(a in 0u8..8, b in 0u8..8) {
            let a = ZoneFlags::from_bits_truncate(a);
            let b = ZoneFlags::from_bits_truncate(b);
            prop_assert_eq!(custom_biomes_match(a, b), a == b);
        }
    }
}
