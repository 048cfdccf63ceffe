//! Boundary to the base simulation.
//!
//! The combat pipeline and effect passes only touch the base entity and the
//! arena adversary through these traits. Movement, status ticking, collision
//! and attack selection stay on the other side.

use glam::Vec2;

use crate::context::DeathReason;

/// Timed status effects this crate asks the base simulation to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEffect {
    /// Arena tier marker for one remaining revive.
    HeroOne,
    HeroTwo,
    HeroThree,
    Darkness,
    Cursed,
    Confused,
    Slow,
    Silenced,
    /// Heals hurt instead; the arena's fallback debuff.
    Undead,
    /// Costume accessory buff, refreshed while worn near town.
    Costume,
}

/// The base simulation entity a player's extension state is layered onto.
pub trait CombatEntity {
    /// Effective maximum capacity after all bonuses this tick.
    fn life_max(&self) -> i32;
    fn life(&self) -> i32;
    fn set_life(&mut self, life: i32);
    /// Adds to this tick's maximum capacity.
    fn add_life_max(&mut self, bonus: i32);
    fn defense(&self) -> i32;

    fn life_regen(&self) -> i32;
    fn set_life_regen(&mut self, regen: i32);
    /// Restarts the regen warm-up counter.
    fn reset_regen_time(&mut self);

    fn add_status(&mut self, status: StatusEffect, ticks: i32);
    /// Whether `status` would be rejected by [`Self::add_status`].
    fn is_immune_to(&self, status: StatusEffect) -> bool;
    /// Grants hit immunity, including every per-source hurt cooldown.
    fn grant_immunity(&mut self, ticks: i32);
    /// Whether an accessory extends immunity windows.
    fn has_long_invincibility(&self) -> bool;
    /// Shows a heal number above the entity.
    fn heal_effect(&mut self, amount: i32);

    /// Top-left corner.
    fn position(&self) -> Vec2;
    fn size(&self) -> Vec2;
    /// Moves the entity and tells every other participant.
    fn teleport(&mut self, to: Vec2);

    /// Whether at least one town resident is nearby.
    fn near_town(&self) -> bool;

    /// Whether the element shield item sits in an accessory slot.
    fn has_shield_item(&self) -> bool;
    /// Spawns shield orb number `slot` orbiting the entity.
    fn spawn_shield_orb(&mut self, slot: i32);
    /// Strips every equipment effect for this tick.
    fn suppress_equipment(&mut self);

    /// Base defense formula, used when no override claimed the hit.
    fn mitigate(&self, raw: i32) -> i32;
    /// Runs the base death handling.
    fn kill(&mut self, reason: &DeathReason);
}

/// The arena adversary whose attack choice players can influence.
pub trait Adversary {
    /// Arena center in world coordinates.
    fn arena_center(&self) -> Vec2;
    /// Half width and half height of the arena.
    fn arena_half_extents(&self) -> Vec2;
    /// Category of the attack in progress, if any.
    fn current_attack(&self) -> Option<usize>;
    fn attack_weight(&self, category: usize) -> i32;
    fn set_attack_weight(&mut self, category: usize, weight: i32);
}
