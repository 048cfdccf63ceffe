//! The mutable per-player extension record.
//!
//! Fields fall into three lifecycles:
//!
//! - **Persisted** (`score`, `life_crystals`, `party_mode`): loaded at session
//!   start, written at checkpoints through [`crate::PersistenceCodec`].
//! - **Replicated** (`life_crystals`, `party_mode`, `hero_lives`, `zones`):
//!   written only by the owning process, mirrored elsewhere via sync.
//! - **Ephemeral** ([`Effects`]): recomputed each tick after
//!   [`ExtensionState::reset_effects`], never saved or sent.
//!
//! [`LocalTimers`] are process-local countdowns; they are neither saved nor
//! sent either, but unlike effects they survive the reset pass.

use bevy_ecs::component::Component;
use serde::{Deserialize, Serialize};

use crate::checkpoint::ReplicatedFields;
use crate::persistence::PersistedFields;
use crate::zones::ZoneFlags;

/// Maximum number of life crystals a player can consume.
pub const MAX_LIFE_CRYSTALS: i32 = 10;

/// Maximum capacity granted per consumed life crystal.
pub const LIFE_PER_CRYSTAL: i32 = 2;

// ---------------------------------------------------------------------------
// PlayerIndex
// ---------------------------------------------------------------------------

/// Slot index of a player within a shared session. Every sync message carries
/// one so receivers can route it to the right mirror.
#[derive(
    Component, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct PlayerIndex(pub u8);

impl std::fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Ephemeral effects
// ---------------------------------------------------------------------------

/// Costume accessory toggles. `accessory_previous` carries last tick's
/// `accessory` across the reset pass so equip transitions can be observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CostumeFlags {
    pub accessory_previous: bool,
    /// Worn in a functional accessory slot.
    pub accessory: bool,
    /// Player chose to hide the costume.
    pub hide_vanity: bool,
    /// Worn in a vanity slot.
    pub force_vanity: bool,
    /// Costume buff active.
    pub power: bool,
}

impl CostumeFlags {
    /// Whether the costume replaces the player's appearance this tick.
    pub fn visible(&self) -> bool {
        (self.power || self.force_vanity) && !self.hide_vanity
    }

    /// `true` on the first tick after the accessory was taken off.
    pub fn just_removed(&self) -> bool {
        self.accessory_previous && !self.accessory
    }
}

/// Per-tick derived effects. Equipment, buffs, and damage-override sources
/// set these during the tick; [`ExtensionState::reset_effects`] clears them
/// before the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    /// Ethereal flames debuff: drains life regen.
    pub ethereal_flames: bool,
    /// Element shield accessory equipped.
    pub element_shield: bool,
    /// Fixed damage override for the next hit (0 = unset).
    pub constant_damage: i32,
    /// Fraction of max capacity dealt by the next hit (0.0 = unset).
    pub percent_damage: f32,
    /// Defense-scaling factor for the next hit.
    pub defense_scaling: Option<f32>,
    /// Healing is inverted into damage.
    pub bad_heal: bool,
    /// Stacks of holy burn; each drains 120 regen.
    pub heal_hurt: i32,
    /// All equipment effects suppressed.
    pub nullified: bool,
    pub costume: CostumeFlags,
}

impl Effects {
    /// `true` if any PreDamage override input is set.
    pub fn has_damage_override(&self) -> bool {
        self.constant_damage > 0 || self.percent_damage > 0.0 || self.defense_scaling.is_some()
    }

    /// Clears the three PreDamage override inputs.
    pub fn clear_damage_overrides(&mut self) {
        self.constant_damage = 0;
        self.percent_damage = 0.0;
        self.defense_scaling = None;
    }
}

// ---------------------------------------------------------------------------
// Local timers
// ---------------------------------------------------------------------------

/// Process-local countdowns and counters, in ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalTimers {
    /// Active element-shield orbs.
    pub shield_orbs: i32,
    /// Ticks until the next orb decays.
    pub shield_timer: i32,
    /// Orbit phase of the shield orbs, `0..300`.
    pub shield_orbit: i32,
    /// Remaining lock-on indicator time.
    pub lock_time: i32,
    /// Remaining revive visual time.
    pub revive_time: i32,
    /// Cooldown before the arena debuff may be applied again.
    pub purity_debuff_cooldown: i32,
}

// ---------------------------------------------------------------------------
// ExtensionState
// ---------------------------------------------------------------------------

/// Extension record for one player on its owning process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtensionState {
    /// Persisted score.
    pub score: i32,
    /// Consumed life crystals. [`Self::consume_life_crystal`] stops at
    /// [`MAX_LIFE_CRYSTALS`]; loads restore whatever was saved. Persisted and
    /// replicated.
    pub life_crystals: i32,
    /// Cosmetic party toggle chosen from the UI. Persisted and replicated.
    pub party_mode: bool,
    /// Remaining revives in the current arena fight. Replicated.
    pub hero_lives: i32,
    /// Zone membership. Replicated as a packed byte.
    pub zones: ZoneFlags,
    /// Ephemeral per-tick effects.
    pub effects: Effects,
    /// Local countdowns.
    pub timers: LocalTimers,
    resolving_hit: bool,
}

impl ExtensionState {
    /// Creates a state with every field at its documented default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state from a restored persistence baseline.
    pub fn from_persisted(fields: &PersistedFields) -> Self {
        let mut state = Self::default();
        state.restore(fields);
        state
    }

    /// Overwrites the persisted subset; other fields are untouched.
    pub fn restore(&mut self, fields: &PersistedFields) {
        self.score = fields.score;
        self.life_crystals = fields.life_crystals;
        self.party_mode = fields.party_mode;
    }

    /// Extracts the persisted subset.
    pub fn persisted(&self) -> PersistedFields {
        PersistedFields {
            score: self.score,
            life_crystals: self.life_crystals,
            party_mode: self.party_mode,
        }
    }

    /// Extracts the replicated subset by value.
    pub fn replicated(&self) -> ReplicatedFields {
        ReplicatedFields {
            life_crystals: self.life_crystals,
            party_mode: self.party_mode,
            hero_lives: self.hero_lives,
            zones: self.zones,
        }
    }

    /// Clears every ephemeral effect ahead of a new tick and returns the
    /// max-capacity bonus granted by consumed life crystals, which the caller
    /// adds to the base entity.
    pub fn reset_effects(&mut self) -> i32 {
        let previous_accessory = self.effects.costume.accessory;
        self.effects = Effects::default();
        self.effects.costume.accessory_previous = previous_accessory;
        self.life_crystals * LIFE_PER_CRYSTAL
    }

    /// Consumes one life crystal. Returns `false` once the cap is reached.
    pub fn consume_life_crystal(&mut self) -> bool {
        if self.life_crystals >= MAX_LIFE_CRYSTALS {
            return false;
        }
        self.life_crystals += 1;
        true
    }

    /// Marks the start of a hit resolution. Returns `false` if one is
    /// already in progress for this player.
    pub fn begin_hit(&mut self) -> bool {
        if self.resolving_hit {
            return false;
        }
        self.resolving_hit = true;
        true
    }

    /// Marks the end of a hit resolution.
    pub fn end_hit(&mut self) {
        self.resolving_hit = false;
    }

    /// `true` while a hit is being resolved.
    pub fn is_resolving_hit(&self) -> bool {
        self.resolving_hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_effects_and_returns_bonus() {
        let mut state = ExtensionState::new();
        state.life_crystals = 4;
        state.effects.ethereal_flames = true;
        state.effects.constant_damage = 30;
        state.effects.defense_scaling = Some(0.5);
        state.effects.costume.accessory = true;

        let bonus = state.reset_effects();

        assert_eq!(bonus, 8);
        assert!(!state.effects.ethereal_flames);
        assert!(!state.effects.has_damage_override());
        assert!(state.effects.costume.accessory_previous);
        assert!(!state.effects.costume.accessory);
    }

    #[test]
    fn test_costume_visibility_and_removal() {
        let mut state = ExtensionState::new();
        state.effects.costume.accessory = true;
        state.effects.costume.power = true;
        assert!(state.effects.costume.visible());
        state.effects.costume.hide_vanity = true;
        assert!(!state.effects.costume.visible());

        state.reset_effects();
        assert!(state.effects.costume.just_removed());
        state.effects.costume.accessory = true;
        assert!(!state.effects.costume.just_removed());
        state.reset_effects();
        state.reset_effects();
        assert!(!state.effects.costume.just_removed());
    }

    #[test]
    fn test_reset_keeps_replicated_and_timers() {
        let mut state = ExtensionState::new();
        state.hero_lives = 2;
        state.party_mode = true;
        state.zones = ZoneFlags::GROVE;
        state.timers.revive_time = 30;

        state.reset_effects();

        assert_eq!(state.hero_lives, 2);
        assert!(state.party_mode);
        assert_eq!(state.zones, ZoneFlags::GROVE);
        assert_eq!(state.timers.revive_time, 30);
    }

    #[test]
    fn test_life_crystals_capped() {
        let mut state = ExtensionState::new();
        for _ in 0..MAX_LIFE_CRYSTALS {
            assert!(state.consume_life_crystal());
        }
        assert!(!state.consume_life_crystal());
        assert_eq!(state.life_crystals, MAX_LIFE_CRYSTALS);
    }

    #[test]
    fn test_hit_guard_rejects_nested_hit() {
        let mut state = ExtensionState::new();
        assert!(state.begin_hit());
        assert!(!state.begin_hit());
        state.end_hit();
        assert!(state.begin_hit());
    }

    #[test]
    fn test_persisted_roundtrip_through_state() {
        let fields = PersistedFields {
            score: 77,
            life_crystals: 3,
            party_mode: true,
        };
        let state = ExtensionState::from_persisted(&fields);
        assert_eq!(state.persisted(), fields);
        assert_eq!(state.hero_lives, 0);
    }

    #[test]
    fn test_player_index_display() {
        assert_eq!(PlayerIndex(7).to_string(), "#7");
    }
}
